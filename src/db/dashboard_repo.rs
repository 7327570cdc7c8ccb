// src/db/dashboard_repo.rs

use rust_decimal::Decimal;
use sqlx::{Acquire, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        dashboard::{DashboardMetrics, StatusCount, TopProductEntry},
        orders::OrderStatus,
    },
};

const TOP_PRODUCTS_LIMIT: i64 = 5;

#[derive(Clone, Default)]
pub struct DashboardRepository;

impl DashboardRepository {
    pub fn new() -> Self {
        Self
    }

    /// Todos os números do painel, lidos dentro de uma única transação.
    pub async fn get_metrics<'a, A>(
        &self,
        executor: A,
        tenant_id: Uuid,
    ) -> Result<DashboardMetrics, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        // A. Pedidos e faturamento (cancelados não contam como receita)
        let (total_orders, orders_today, revenue, revenue_today) =
            sqlx::query_as::<_, (i64, i64, Decimal, Decimal)>(
                r#"
                SELECT
                    COUNT(*),
                    COUNT(*) FILTER (WHERE created_at::date = CURRENT_DATE),
                    COALESCE(SUM(total) FILTER (WHERE status_id <> $2), 0),
                    COALESCE(SUM(total) FILTER (WHERE status_id <> $2 AND created_at::date = CURRENT_DATE), 0)
                FROM orders
                WHERE tenant_id = $1
                "#,
            )
            .bind(tenant_id)
            .bind(OrderStatus::Cancelled)
            .fetch_one(&mut *tx)
            .await?;

        // B. Catálogo
        let (active_products, low_stock_products) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE stock <= min_stock)
            FROM products
            WHERE tenant_id = $1 AND is_active
            "#,
        )
        .bind(tenant_id)
        .fetch_one(&mut *tx)
        .await?;

        // C. Clientes
        let active_customers = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE tenant_id = $1 AND role = 'customer' AND is_active",
        )
        .bind(tenant_id)
        .fetch_one(&mut *tx)
        .await?;

        // D. Distribuição por status
        let orders_by_status = sqlx::query_as::<_, StatusCount>(
            r#"
            SELECT status_id, COUNT(*) AS count
            FROM orders
            WHERE tenant_id = $1
            GROUP BY status_id
            ORDER BY status_id ASC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&mut *tx)
        .await?;

        // E. Mais vendidos por quantidade
        let top_products = sqlx::query_as::<_, TopProductEntry>(
            r#"
            SELECT
                i.product_name,
                SUM(i.quantity)::bigint AS total_quantity,
                SUM(i.subtotal) AS total_revenue
            FROM order_items i
            JOIN orders o ON o.id = i.order_id
            WHERE i.tenant_id = $1 AND o.status_id <> $2
            GROUP BY i.product_id, i.product_name
            ORDER BY total_quantity DESC, total_revenue DESC
            LIMIT $3
            "#,
        )
        .bind(tenant_id)
        .bind(OrderStatus::Cancelled)
        .bind(TOP_PRODUCTS_LIMIT)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(DashboardMetrics {
            total_orders,
            orders_today,
            revenue,
            revenue_today,
            active_products,
            low_stock_products,
            active_customers,
            orders_by_status,
            top_products,
        })
    }
}
