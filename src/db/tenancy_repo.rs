// src/db/tenancy_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{unique_violation_constraint, AppError},
    models::tenancy::Tenant,
};

// A tabela tenants não tem RLS: é ela que resolve o slug antes de existir escopo.
#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, AppError> {
        let tenant = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tenant)
    }

    pub async fn find_by_id(&self, tenant_id: Uuid) -> Result<Option<Tenant>, AppError> {
        let tenant = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tenant)
    }

    /// Cria uma nova loja. Slug duplicado vira erro de conflito.
    pub async fn create_tenant<'e, E>(
        &self,
        executor: E,
        slug: &str,
        name: &str,
    ) -> Result<Tenant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO tenants (slug, name)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(slug)
        .bind(name)
        .fetch_one(executor)
        .await
        .map_err(|e| match unique_violation_constraint(&e) {
            Some(_) => AppError::SlugAlreadyExists(slug.to_string()),
            None => e.into(),
        })
    }

    pub async fn rename<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        name: &str,
    ) -> Result<Option<Tenant>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tenant = sqlx::query_as::<_, Tenant>(
            "UPDATE tenants SET name = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(name)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;

        Ok(tenant)
    }

    pub async fn set_active<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        is_active: bool,
    ) -> Result<Option<Tenant>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tenant = sqlx::query_as::<_, Tenant>(
            "UPDATE tenants SET is_active = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(is_active)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;

        Ok(tenant)
    }
}
