// src/services/tenancy_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::TenantRepository,
    models::tenancy::{is_valid_slug, Tenant},
};

#[derive(Clone)]
pub struct TenantService {
    tenant_repo: TenantRepository,
    pool: PgPool,
}

impl TenantService {
    pub fn new(tenant_repo: TenantRepository, pool: PgPool) -> Self {
        Self { tenant_repo, pool }
    }

    /// Resolve o slug da URL/cabeçalho. Loja inativa ainda resolve: quem barra é a autenticação.
    pub async fn resolve_slug(&self, slug: &str) -> Result<Tenant, AppError> {
        self.tenant_repo
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::TenantNotFound(slug.to_string()))
    }

    /// Vitrine pública: loja inativa não existe para o público.
    pub async fn storefront(&self, slug: &str) -> Result<Tenant, AppError> {
        let tenant = self.resolve_slug(slug).await?;
        if !tenant.is_active {
            return Err(AppError::TenantNotFound(slug.to_string()));
        }
        Ok(tenant)
    }

    pub async fn get(&self, tenant_id: Uuid) -> Result<Tenant, AppError> {
        self.tenant_repo
            .find_by_id(tenant_id)
            .await?
            .ok_or_else(|| AppError::TenantNotFound(tenant_id.to_string()))
    }

    pub async fn rename(&self, tenant_id: Uuid, name: &str) -> Result<Tenant, AppError> {
        let tenant = self
            .tenant_repo
            .rename(&self.pool, tenant_id, name.trim())
            .await?
            .ok_or_else(|| AppError::TenantNotFound(tenant_id.to_string()))?;

        tracing::info!(tenant_id = %tenant_id, "Loja renomeada");
        Ok(tenant)
    }

    // --- PROVISIONAMENTO ---

    pub async fn provision(&self, slug: &str, name: &str) -> Result<Tenant, AppError> {
        let slug = slug.trim();
        if !is_valid_slug(slug) {
            return Err(AppError::InvalidInput("slug".to_string()));
        }

        let tenant = self.tenant_repo.create_tenant(&self.pool, slug, name.trim()).await?;
        tracing::info!(tenant_id = %tenant.id, slug = %tenant.slug, "Loja criada");
        Ok(tenant)
    }

    /// Exclusão lógica: os dados ficam, mas tokens da loja deixam de valer.
    pub async fn deactivate(&self, tenant_id: Uuid) -> Result<Tenant, AppError> {
        let tenant = self
            .tenant_repo
            .set_active(&self.pool, tenant_id, false)
            .await?
            .ok_or_else(|| AppError::TenantNotFound(tenant_id.to_string()))?;

        tracing::info!(tenant_id = %tenant_id, "Loja desativada");
        Ok(tenant)
    }
}
