// src/models/notifications.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "Nuevo pedido PED-20250314-0007")]
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub reference_id: Option<Uuid>,
    #[schema(example = "ORDER")]
    pub reference_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Tipo de referência gravado junto com a notificação
pub const REFERENCE_ORDER: &str = "ORDER";

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    pub unread: i64,
}
