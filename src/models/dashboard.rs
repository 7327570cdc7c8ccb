// src/models/dashboard.rs

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::models::orders::OrderStatus;

// 1. Os cards do topo
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_orders: i64,
    pub orders_today: i64,
    pub revenue: Decimal,       // Soma dos pedidos não cancelados
    pub revenue_today: Decimal,
    pub active_products: i64,
    pub low_stock_products: i64, // stock <= min_stock
    pub active_customers: i64,
    pub orders_by_status: Vec<StatusCount>,
    pub top_products: Vec<TopProductEntry>,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    #[sqlx(rename = "status_id")]
    pub status: OrderStatus,
    pub count: i64,
}

// 2. Curva ABC (Top Produtos)
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopProductEntry {
    pub product_name: String,
    pub total_quantity: i64,
    pub total_revenue: Decimal,
}
