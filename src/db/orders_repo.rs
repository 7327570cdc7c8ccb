// src/db/orders_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{unique_violation_constraint, AppError},
    models::orders::{
        NewOrder, Order, OrderItem, OrderStatus, OrderStatusHistory, OrderStatusInfo, OrderSummary,
        PricedLine,
    },
};

const IDEMPOTENCY_CONSTRAINT: &str = "orders_idempotency_key_unique";

#[derive(Clone, Default)]
pub struct OrdersRepository;

impl OrdersRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  NUMERAÇÃO
    // =========================================================================

    /// Próximo valor do contador do dia. O upsert trava a linha do dia até o commit,
    /// então chame o mais tarde possível dentro da transação.
    pub async fn next_order_sequence<'e, E>(
        &self,
        executor: E,
        day: NaiveDate,
    ) -> Result<i32, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let value = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO order_number_sequences (day, last_value)
            VALUES ($1, 1)
            ON CONFLICT (day) DO UPDATE
                SET last_value = order_number_sequences.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(day)
        .fetch_one(executor)
        .await?;

        Ok(value)
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    pub async fn insert_order<'e, E>(&self, executor: E, new: &NewOrder) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (
                order_number, tenant_id, customer_id, user_id, status_id, total,
                payment_method, delivery_method, delivery_address, notes, idempotency_key
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(&new.order_number)
        .bind(new.tenant_id)
        .bind(new.customer_id)
        .bind(new.user_id)
        .bind(OrderStatus::Pending)
        .bind(new.total)
        .bind(&new.payment_method)
        .bind(&new.delivery_method)
        .bind(&new.delivery_address)
        .bind(&new.notes)
        .bind(&new.idempotency_key)
        .fetch_one(executor)
        .await
        .map_err(|e| match unique_violation_constraint(&e).as_deref() {
            Some(IDEMPOTENCY_CONSTRAINT) => AppError::DuplicateIdempotencyKey,
            _ => e.into(),
        })
    }

    pub async fn insert_item<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
        line: &PricedLine,
    ) -> Result<OrderItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, OrderItem>(
            r#"
            INSERT INTO order_items (
                tenant_id, order_id, product_id, product_name, quantity, unit_price, subtotal
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(order_id)
        .bind(line.product_id)
        .bind(&line.product_name)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.subtotal)
        .fetch_one(executor)
        .await?;

        Ok(item)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_history<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
        previous: Option<OrderStatus>,
        new_status: OrderStatus,
        changed_by: Option<Uuid>,
        note: Option<&str>,
    ) -> Result<OrderStatusHistory, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entry = sqlx::query_as::<_, OrderStatusHistory>(
            r#"
            INSERT INTO order_status_history (
                tenant_id, order_id, previous_status_id, new_status_id, changed_by, note
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(order_id)
        .bind(previous)
        .bind(new_status)
        .bind(changed_by)
        .bind(note)
        .fetch_one(executor)
        .await?;

        Ok(entry)
    }

    /// Grava o novo status; `closed_at` é preenchido ao entrar num estado terminal.
    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET status_id = $1,
                updated_at = NOW(),
                closed_at = CASE WHEN $2 THEN NOW() ELSE closed_at END
            WHERE id = $3 AND tenant_id = $4
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(status.is_terminal())
        .bind(order_id)
        .bind(tenant_id)
        .fetch_one(executor)
        .await?;

        Ok(order)
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> Result<Option<Order>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE id = $1 AND tenant_id = $2",
        )
        .bind(order_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;

        Ok(order)
    }

    /// Igual a `find_by_id`, mas segura a linha até o fim da transação.
    pub async fn lock_by_id<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> Result<Option<Order>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
        )
        .bind(order_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;

        Ok(order)
    }

    pub async fn find_by_idempotency_key<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        key: &str,
    ) -> Result<Option<Order>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE tenant_id = $1 AND idempotency_key = $2",
        )
        .bind(tenant_id)
        .bind(key)
        .fetch_optional(executor)
        .await?;

        Ok(order)
    }

    /// Listagem paginada, mais recentes primeiro. `customer_id` restringe aos pedidos do cliente.
    pub async fn list<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        customer_id: Option<Uuid>,
        status: Option<OrderStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<OrderSummary>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let orders = sqlx::query_as::<_, OrderSummary>(
            r#"
            SELECT
                o.*,
                u.full_name AS customer_name,
                (SELECT COUNT(*) FROM order_items i WHERE i.order_id = o.id) AS item_count
            FROM orders o
            JOIN users u ON u.id = o.customer_id
            WHERE o.tenant_id = $1
              AND ($2::uuid IS NULL OR o.customer_id = $2)
              AND ($3::smallint IS NULL OR o.status_id = $3)
            ORDER BY o.created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(tenant_id)
        .bind(customer_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;

        Ok(orders)
    }

    pub async fn list_items<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> Result<Vec<OrderItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT * FROM order_items
            WHERE order_id = $1 AND tenant_id = $2
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(order_id)
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;

        Ok(items)
    }

    pub async fn list_history<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        order_id: Uuid,
    ) -> Result<Vec<OrderStatusHistory>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let history = sqlx::query_as::<_, OrderStatusHistory>(
            r#"
            SELECT * FROM order_status_history
            WHERE order_id = $1 AND tenant_id = $2
            ORDER BY changed_at ASC, id ASC
            "#,
        )
        .bind(order_id)
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;

        Ok(history)
    }

    // Tabela de referência, igual para todas as lojas
    pub async fn list_statuses<'e, E>(&self, executor: E) -> Result<Vec<OrderStatusInfo>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let statuses = sqlx::query_as::<_, OrderStatusInfo>(
            "SELECT id, code, name, description FROM order_statuses ORDER BY id ASC",
        )
        .fetch_all(executor)
        .await?;

        Ok(statuses)
    }
}
