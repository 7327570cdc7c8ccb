// src/services/user_service.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::ensure_same_tenant, error::AppError},
    db::UserRepository,
    models::auth::{Role, User},
};

#[derive(Clone)]
pub struct UserService {
    repo: UserRepository,
}

impl UserService {
    pub fn new(repo: UserRepository) -> Self {
        Self { repo }
    }

    pub async fn list_users<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        role: Option<Role>,
    ) -> Result<Vec<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list(executor, tenant_id, role).await
    }

    /// O admin não mexe no próprio papel: evita uma loja sem nenhum admin.
    pub async fn change_role<'e, E>(
        &self,
        executor: E,
        actor: &User,
        user_id: Uuid,
        role: Role,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        ensure_not_self(actor, user_id)?;

        let user = self.repo.update_role(executor, actor.tenant_id, user_id, role).await?;
        let user = ensure_same_tenant(user, actor.tenant_id).ok_or(AppError::UserNotFound)?;

        tracing::info!(tenant_id = %actor.tenant_id, user_id = %user_id, role = ?role, "Papel alterado");
        Ok(user)
    }

    pub async fn deactivate_user<'e, E>(
        &self,
        executor: E,
        actor: &User,
        user_id: Uuid,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        ensure_not_self(actor, user_id)?;

        let user = self.repo.set_active(executor, actor.tenant_id, user_id, false).await?;
        let user = ensure_same_tenant(user, actor.tenant_id).ok_or(AppError::UserNotFound)?;

        tracing::info!(tenant_id = %actor.tenant_id, user_id = %user_id, "Usuário desativado");
        Ok(user)
    }
}

fn ensure_not_self(actor: &User, target: Uuid) -> Result<(), AppError> {
    if actor.id == target {
        return Err(AppError::CannotModifySelf);
    }
    Ok(())
}
