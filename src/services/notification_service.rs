// src/services/notification_service.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::ensure_same_tenant, error::AppError},
    db::NotificationRepository,
    models::{auth::User, notifications::Notification},
};

// Leitura das notificações do próprio usuário. A criação acontece dentro das
// transações de pedido (ver OrderService).
#[derive(Clone)]
pub struct NotificationService {
    repo: NotificationRepository,
}

impl NotificationService {
    pub fn new(repo: NotificationRepository) -> Self {
        Self { repo }
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        user: &User,
        unread_only: bool,
    ) -> Result<Vec<Notification>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list_for_user(executor, user.tenant_id, user.id, unread_only).await
    }

    pub async fn count_unread<'e, E>(&self, executor: E, user: &User) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.count_unread(executor, user.tenant_id, user.id).await
    }

    pub async fn mark_read<'e, E>(
        &self,
        executor: E,
        user: &User,
        notification_id: Uuid,
    ) -> Result<Notification, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let notification = self
            .repo
            .mark_read(executor, user.tenant_id, user.id, notification_id)
            .await?;
        ensure_same_tenant(notification, user.tenant_id).ok_or(AppError::NotificationNotFound)
    }

    pub async fn mark_all_read<'e, E>(&self, executor: E, user: &User) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.mark_all_read(executor, user.tenant_id, user.id).await
    }
}
