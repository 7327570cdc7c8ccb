// src/models/orders.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::catalog::not_negative;

// --- Status do Pedido ---
// O contrato da API é o nome (PENDING, CANCELLED...). O número só existe no banco,
// e o mapeamento abaixo é fixo: nunca renumerar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[repr(i16)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending = 1,
    Confirmed = 2,
    InProcess = 3,
    Ready = 4,
    Shipped = 5,
    Completed = 6,
    Cancelled = 7,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::InProcess,
        OrderStatus::Ready,
        OrderStatus::Shipped,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn id(self) -> i16 {
        self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }

    pub fn code(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::InProcess => "IN_PROCESS",
            OrderStatus::Ready => "READY",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Completado e Cancelado não saem mais do lugar.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;

        match (self, next) {
            (Pending, Confirmed) => true,
            (Confirmed, InProcess) => true,
            (InProcess, Ready) => true,
            (Ready, Shipped) => true,
            (Shipped, Completed) => true,

            (Pending | Confirmed | InProcess, Cancelled) => true,

            _ => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Aceita o código ("IN_PROCESS", "in-process") ou o id numérico da tabela ("3").
impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if let Ok(id) = raw.parse::<i16>() {
            return Self::from_id(id).ok_or_else(|| raw.to_string());
        }

        let normalized = raw.to_ascii_uppercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|s| s.code() == normalized)
            .ok_or_else(|| raw.to_string())
    }
}

// --- Linha da tabela order_statuses ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusInfo {
    #[schema(example = 1)]
    pub id: i16,
    #[schema(example = "PENDING")]
    pub code: String,
    #[schema(example = "Pendiente")]
    pub name: String,
    pub description: String,
}

// --- Pedido ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    #[schema(example = "PED-20250314-0007")]
    pub order_number: String,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub user_id: Option<Uuid>,
    #[sqlx(rename = "status_id")]
    pub status: OrderStatus,
    #[schema(example = "2500.00")]
    pub total: Decimal,
    #[schema(example = "efectivo")]
    pub payment_method: String,
    #[schema(example = "retiro")]
    pub delivery_method: String,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    #[schema(example = 3)]
    pub quantity: i32,
    #[schema(example = "500.00")]
    pub unit_price: Decimal,
    #[schema(example = "1500.00")]
    pub subtotal: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusHistory {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub order_id: Uuid,
    #[sqlx(rename = "previous_status_id")]
    pub previous_status: Option<OrderStatus>,
    #[sqlx(rename = "new_status_id")]
    pub new_status: OrderStatus,
    pub changed_by: Option<Uuid>,
    pub note: Option<String>,
    pub changed_at: DateTime<Utc>,
}

// Linha da listagem: pedido + nome do cliente
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub order: Order,
    pub customer_name: String,
    pub item_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub header: Order,
    pub customer_name: String,
    pub customer_email: String,
    pub items: Vec<OrderItem>,
    pub history: Vec<OrderStatusHistory>,
}

/// Uma linha já precificada pelo servidor, pronta para gravar.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

/// Dados completos de um pedido novo, depois de validados e precificados.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub user_id: Option<Uuid>,
    pub total: Decimal,
    pub payment_method: String,
    pub delivery_method: String,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
    pub idempotency_key: Option<String>,
}

/// PED-YYYYMMDD-NNNN. Acima de 9999 no mesmo dia o número só ganha dígitos.
pub fn format_order_number(day: NaiveDate, sequence: i32) -> String {
    format!("PED-{}-{:04}", day.format("%Y%m%d"), sequence)
}

// =============================================================================
//  ENTRADA
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLinePayload {
    pub product_id: Uuid,

    #[validate(range(min = 1, max = 1_000_000, message = "range"))]
    #[schema(example = 2)]
    pub quantity: i32,

    /// Só funcionários podem informar um preço diferente do catálogo.
    #[validate(custom(function = "not_negative"))]
    #[schema(example = "1000.00")]
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
    /// Obrigatório para funcionários; clientes compram para si mesmos.
    pub customer_id: Option<Uuid>,

    #[validate(length(min = 1, message = "empty_order"), nested)]
    pub items: Vec<OrderLinePayload>,

    /// Total esperado pelo cliente; se vier, precisa bater com o calculado.
    #[validate(custom(function = "not_negative"))]
    #[schema(example = "2500.00")]
    pub total: Option<Decimal>,

    #[validate(length(min = 1, max = 50, message = "required"))]
    #[schema(example = "efectivo")]
    pub payment_method: String,

    #[validate(length(min = 1, max = 50, message = "required"))]
    #[schema(example = "retiro")]
    pub delivery_method: String,

    #[validate(length(max = 500, message = "too_long"))]
    pub delivery_address: Option<String>,

    #[validate(length(max = 1000, message = "too_long"))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStatusPayload {
    /// Nome do status (PENDING, CONFIRMED, ...) ou o id numérico.
    #[schema(example = "CONFIRMED")]
    pub status: String,

    #[validate(length(max = 500, message = "too_long"))]
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderPayload {
    #[validate(length(max = 500, message = "too_long"))]
    #[schema(example = "El cliente ya no lo necesita")]
    pub reason: Option<String>,
}

/// Filtros da listagem de pedidos.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    /// Nome ou id do status
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
