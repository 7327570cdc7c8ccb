// src/db/notification_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::notifications::Notification,
};

// Limite fixo da listagem: o painel só mostra as mais recentes.
const LIST_LIMIT: i64 = 100;

#[derive(Clone, Default)]
pub struct NotificationRepository;

impl NotificationRepository {
    pub fn new() -> Self {
        Self
    }

    /// Uma notificação para cada admin/funcionário ativo da loja. Devolve quantas foram criadas.
    #[allow(clippy::too_many_arguments)]
    pub async fn notify_staff<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        title: &str,
        message: &str,
        reference_id: Option<Uuid>,
        reference_type: Option<&str>,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (tenant_id, user_id, title, message, reference_id, reference_type)
            SELECT $1, u.id, $2, $3, $4, $5
            FROM users u
            WHERE u.tenant_id = $1
              AND u.is_active
              AND u.role IN ('admin', 'employee')
            "#,
        )
        .bind(tenant_id)
        .bind(title)
        .bind(message)
        .bind(reference_id)
        .bind(reference_type)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn notify_user<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        user_id: Uuid,
        title: &str,
        message: &str,
        reference_id: Option<Uuid>,
        reference_type: Option<&str>,
    ) -> Result<Notification, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (tenant_id, user_id, title, message, reference_id, reference_type)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(title)
        .bind(message)
        .bind(reference_id)
        .bind(reference_type)
        .fetch_one(executor)
        .await?;

        Ok(notification)
    }

    pub async fn list_for_user<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        user_id: Uuid,
        unread_only: bool,
    ) -> Result<Vec<Notification>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE tenant_id = $1 AND user_id = $2 AND (NOT $3 OR NOT is_read)
            ORDER BY created_at DESC
            LIMIT $4
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .bind(unread_only)
        .bind(LIST_LIMIT)
        .fetch_all(executor)
        .await?;

        Ok(notifications)
    }

    pub async fn count_unread<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE tenant_id = $1 AND user_id = $2 AND NOT is_read",
        )
        .bind(tenant_id)
        .bind(user_id)
        .fetch_one(executor)
        .await?;

        Ok(count)
    }

    /// `None` quando a notificação não existe ou é de outro usuário.
    pub async fn mark_read<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> Result<Option<Notification>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications SET is_read = TRUE
            WHERE id = $1 AND tenant_id = $2 AND user_id = $3
            RETURNING *
            "#,
        )
        .bind(notification_id)
        .bind(tenant_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(notification)
    }

    pub async fn mark_all_read<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE tenant_id = $1 AND user_id = $2 AND NOT is_read",
        )
        .bind(tenant_id)
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
