// src/db/user_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::{Role, User},
};

const USER_COLUMNS: &str = r#"
    id, tenant_id, email, password_hash, full_name, phone, role, is_active, created_at, updated_at
"#;

// O repositório de usuários, responsável por todas as interações com a tabela 'users'.
// Toda consulta recebe o tenant_id: não existe busca "global" de usuário.
#[derive(Clone, Default)]
pub struct UserRepository;

impl UserRepository {
    pub fn new() -> Self {
        Self
    }

    // Busca um usuário pelo seu ID, dentro da loja
    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND tenant_id = $2"
        ))
        .bind(user_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        role: Option<Role>,
    ) -> Result<Vec<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE tenant_id = $1 AND ($2::user_role IS NULL OR role = $2)
            ORDER BY full_name ASC
            "#
        ))
        .bind(tenant_id)
        .bind(role)
        .fetch_all(executor)
        .await?;

        Ok(users)
    }

    pub async fn update_role<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET role = $1, updated_at = NOW()
            WHERE id = $2 AND tenant_id = $3
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(role)
        .bind(user_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    // Exclusão lógica: o usuário continua referenciado pelos pedidos
    pub async fn set_active<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        user_id: Uuid,
        is_active: bool,
    ) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET is_active = $1, updated_at = NOW()
            WHERE id = $2 AND tenant_id = $3
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(is_active)
        .bind(user_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }
}
