// src/services/order_service.rs

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::ensure_same_tenant,
        error::AppError,
        i18n::{I18nStore, DEFAULT_LANG},
    },
    db::{CatalogRepository, NotificationRepository, OrdersRepository, UserRepository},
    models::{
        auth::{Capability, Role, User},
        catalog::{max_money, Product, MAX_LINE_QUANTITY},
        notifications::REFERENCE_ORDER,
        orders::{
            format_order_number, CreateOrderPayload, NewOrder, Order, OrderDetail, OrderLinePayload,
            OrderStatus, OrderStatusInfo, OrderSummary, PricedLine,
        },
    },
};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Resultado da criação: pedido novo (201) ou o mesmo pedido de uma chave repetida (200).
#[derive(Debug)]
pub enum OrderCreation {
    Created(OrderDetail),
    Replayed(OrderDetail),
}

#[derive(Clone)]
pub struct OrderService {
    orders_repo: OrdersRepository,
    catalog_repo: CatalogRepository,
    user_repo: UserRepository,
    notification_repo: NotificationRepository,
    i18n: Arc<I18nStore>,
}

impl OrderService {
    pub fn new(
        orders_repo: OrdersRepository,
        catalog_repo: CatalogRepository,
        user_repo: UserRepository,
        notification_repo: NotificationRepository,
        i18n: Arc<I18nStore>,
    ) -> Self {
        Self { orders_repo, catalog_repo, user_repo, notification_repo, i18n }
    }

    // =========================================================================
    //  CRIAÇÃO
    // =========================================================================

    #[tracing::instrument(
        skip(self, conn, actor, payload),
        fields(tenant_id = %actor.tenant_id, actor_id = %actor.id)
    )]
    pub async fn create_order(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        payload: &CreateOrderPayload,
        idempotency_key: Option<&str>,
    ) -> Result<OrderCreation, AppError> {
        let tenant_id = actor.tenant_id;

        if !actor.role.can(Capability::PlaceOrder) {
            return Err(AppError::PermissionDenied(Capability::PlaceOrder));
        }

        let customer = self.resolve_customer(&mut *conn, actor, payload.customer_id).await?;

        // 1. Chave repetida: devolve o pedido existente, sem efeito colateral
        if let Some(key) = idempotency_key {
            if let Some(existing) = self.orders_repo.find_by_idempotency_key(&mut *conn, tenant_id, key).await? {
                return self.replay(conn, existing, &customer).await;
            }
        }

        match self.insert_order_tx(&mut *conn, actor, &customer, payload, idempotency_key).await {
            Ok(detail) => Ok(OrderCreation::Created(detail)),
            // Outra requisição com a mesma chave gravou primeiro; a nossa transação já foi desfeita.
            Err(AppError::DuplicateIdempotencyKey) => {
                let key = idempotency_key.unwrap_or_default();
                let existing = self
                    .orders_repo
                    .find_by_idempotency_key(&mut *conn, tenant_id, key)
                    .await?
                    .ok_or(AppError::IdempotencyKeyReused)?;
                self.replay(conn, existing, &customer).await
            }
            Err(e) => Err(e),
        }
    }

    async fn insert_order_tx(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        customer: &User,
        payload: &CreateOrderPayload,
        idempotency_key: Option<&str>,
    ) -> Result<OrderDetail, AppError> {
        let tenant_id = actor.tenant_id;
        let mut tx = sqlx::Acquire::begin(conn).await?;

        // 2. Precificação no servidor
        let ids: Vec<Uuid> = payload.items.iter().map(|l| l.product_id).collect();
        let products: HashMap<Uuid, Product> = self
            .catalog_repo
            .find_products_by_ids(&mut *tx, tenant_id, &ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let lines = price_lines(actor.role, &payload.items, &products)?;
        let total = order_total(&lines)?;
        check_client_total(total, payload.total)?;

        // 3. Baixa de estoque, sempre na mesma ordem (ids crescentes)
        for (product_id, quantity) in stock_demand(&lines)? {
            let updated = self
                .catalog_repo
                .decrement_stock(&mut *tx, tenant_id, product_id, quantity)
                .await?;

            if updated.is_none() {
                let current = self.catalog_repo.find_product(&mut *tx, tenant_id, product_id).await?;
                return Err(match current {
                    Some(p) if p.is_active => {
                        tracing::warn!(product_id = %p.id, available = p.stock, requested = quantity, "Estoque insuficiente");
                        AppError::InsufficientStock { product: p.name, available: p.stock, requested: quantity }
                    }
                    _ => AppError::ProductNotFound(product_id),
                });
            }
        }

        // 4. Número do pedido por último: a linha do contador fica travada o mínimo possível
        let today = Utc::now().date_naive();
        let sequence = self.orders_repo.next_order_sequence(&mut *tx, today).await?;

        let new_order = NewOrder {
            order_number: format_order_number(today, sequence),
            tenant_id,
            customer_id: customer.id,
            user_id: Some(actor.id),
            total,
            payment_method: payload.payment_method.trim().to_string(),
            delivery_method: payload.delivery_method.trim().to_string(),
            delivery_address: payload.delivery_address.clone(),
            notes: payload.notes.clone(),
            idempotency_key: idempotency_key.map(str::to_string),
        };

        let order = self.orders_repo.insert_order(&mut *tx, &new_order).await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            items.push(self.orders_repo.insert_item(&mut *tx, tenant_id, order.id, line).await?);
        }

        let initial = self
            .orders_repo
            .insert_history(&mut *tx, tenant_id, order.id, None, OrderStatus::Pending, Some(actor.id), None)
            .await?;

        // 5. Avisa a equipe da loja
        let params = [
            ("order", order.order_number.clone()),
            ("customer", customer.full_name.clone()),
            ("total", order.total.to_string()),
        ];
        let title = self.i18n.translate(DEFAULT_LANG, "notification.new_order.title", &params);
        let message = self.i18n.translate(DEFAULT_LANG, "notification.new_order.message", &params);
        self.notification_repo
            .notify_staff(&mut *tx, tenant_id, &title, &message, Some(order.id), Some(REFERENCE_ORDER))
            .await?;

        tx.commit().await?;

        tracing::info!(order_id = %order.id, order_number = %order.order_number, total = %order.total, "Pedido criado");

        Ok(OrderDetail {
            header: order,
            customer_name: customer.full_name.clone(),
            customer_email: customer.email.clone(),
            items,
            history: vec![initial],
        })
    }

    async fn replay(
        &self,
        conn: &mut PgConnection,
        existing: Order,
        customer: &User,
    ) -> Result<OrderCreation, AppError> {
        if existing.customer_id != customer.id {
            tracing::warn!(order_id = %existing.id, "Chave de idempotência reutilizada por outro cliente");
            return Err(AppError::IdempotencyKeyReused);
        }
        tracing::info!(order_id = %existing.id, "Repetição idempotente, devolvendo pedido existente");
        let detail = self.load_detail(conn, existing).await?;
        Ok(OrderCreation::Replayed(detail))
    }

    /// Cliente compra para si mesmo; funcionário precisa indicar um cliente ativo da loja.
    async fn resolve_customer(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        requested: Option<Uuid>,
    ) -> Result<User, AppError> {
        if actor.role == Role::Customer {
            return match requested {
                Some(id) if id != actor.id => Err(AppError::Forbidden),
                _ => Ok(actor.clone()),
            };
        }

        let customer_id = requested
            .ok_or_else(|| AppError::InvalidInput("customerId".to_string()))?;

        let customer = self
            .user_repo
            .find_by_id(&mut *conn, actor.tenant_id, customer_id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        if !customer.is_active {
            return Err(AppError::UserInactive);
        }
        if customer.role != Role::Customer {
            return Err(AppError::InvalidInput("customerId".to_string()));
        }
        Ok(customer)
    }

    // =========================================================================
    //  TRANSIÇÕES
    // =========================================================================

    #[tracing::instrument(
        skip(self, conn, actor, note),
        fields(tenant_id = %actor.tenant_id, actor_id = %actor.id)
    )]
    pub async fn transition_order(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        order_id: Uuid,
        target: OrderStatus,
        note: Option<&str>,
    ) -> Result<Order, AppError> {
        let mut tx = sqlx::Acquire::begin(conn).await?;

        let order = self.lock_visible_order(&mut *tx, actor, order_id).await?;

        if !actor.role.can(Capability::ChangeOrderStatus) {
            return Err(AppError::PermissionDenied(Capability::ChangeOrderStatus));
        }

        let updated = self.apply_transition(&mut *tx, actor, &order, target, note).await?;
        tx.commit().await?;

        tracing::info!(order_id = %order.id, from = %order.status, to = %target, "Status do pedido alterado");
        Ok(updated)
    }

    /// Funcionários cancelam qualquer pedido da loja; o cliente só o próprio e só enquanto PENDING.
    #[tracing::instrument(
        skip(self, conn, actor, reason),
        fields(tenant_id = %actor.tenant_id, actor_id = %actor.id)
    )]
    pub async fn cancel_order(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        order_id: Uuid,
        reason: Option<&str>,
    ) -> Result<Order, AppError> {
        let mut tx = sqlx::Acquire::begin(conn).await?;

        let order = self.lock_visible_order(&mut *tx, actor, order_id).await?;
        ensure_can_cancel(actor, &order)?;

        let updated = self
            .apply_transition(&mut *tx, actor, &order, OrderStatus::Cancelled, reason)
            .await?;

        if actor.role == Role::Customer {
            let params = [
                ("order", order.order_number.clone()),
                ("customer", actor.full_name.clone()),
            ];
            let title = self.i18n.translate(DEFAULT_LANG, "notification.order_cancelled.title", &params);
            let message = self.i18n.translate(DEFAULT_LANG, "notification.order_cancelled.message", &params);
            self.notification_repo
                .notify_staff(&mut *tx, actor.tenant_id, &title, &message, Some(order.id), Some(REFERENCE_ORDER))
                .await?;
        }

        tx.commit().await?;

        tracing::info!(order_id = %order.id, from = %order.status, "Pedido cancelado");
        Ok(updated)
    }

    // Trava a linha do pedido; pedido de outra loja, ou de outro cliente, é "não encontrado".
    async fn lock_visible_order(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        order_id: Uuid,
    ) -> Result<Order, AppError> {
        let order = self.orders_repo.lock_by_id(&mut *conn, actor.tenant_id, order_id).await?;
        let order = ensure_same_tenant(order, actor.tenant_id).ok_or(AppError::OrderNotFound)?;

        if !can_see_order(actor, &order) {
            return Err(AppError::OrderNotFound);
        }
        Ok(order)
    }

    async fn apply_transition(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        order: &Order,
        target: OrderStatus,
        note: Option<&str>,
    ) -> Result<Order, AppError> {
        check_transition(order.status, target).inspect_err(|e| {
            tracing::warn!(order_id = %order.id, from = %order.status, to = %target, "Transição rejeitada: {}", e);
        })?;

        let tenant_id = actor.tenant_id;
        let updated = self.orders_repo.update_status(&mut *conn, tenant_id, order.id, target).await?;

        self.orders_repo
            .insert_history(&mut *conn, tenant_id, order.id, Some(order.status), target, Some(actor.id), note)
            .await?;

        // Compensação: devolve exatamente o que foi baixado na criação
        if target == OrderStatus::Cancelled {
            let items = self.orders_repo.list_items(&mut *conn, tenant_id, order.id).await?;
            let restock = merge_quantities(items.iter().map(|i| (i.product_id, i.quantity)))?;
            for (product_id, quantity) in restock {
                self.catalog_repo
                    .apply_stock_delta(&mut *conn, tenant_id, product_id, quantity, i32::MAX)
                    .await?
                    .ok_or(AppError::ProductNotFound(product_id))?;
            }
        }

        let params = [
            ("order", order.order_number.clone()),
            ("from", order.status.to_string()),
            ("to", target.to_string()),
        ];
        let title = self.i18n.translate(DEFAULT_LANG, "notification.status_changed.title", &params);
        let message = self.i18n.translate(DEFAULT_LANG, "notification.status_changed.message", &params);
        self.notification_repo
            .notify_user(&mut *conn, tenant_id, order.customer_id, &title, &message, Some(order.id), Some(REFERENCE_ORDER))
            .await?;

        Ok(updated)
    }

    // =========================================================================
    //  CONSULTAS
    // =========================================================================

    pub async fn list_orders<'e, E>(
        &self,
        executor: E,
        actor: &User,
        status: Option<OrderStatus>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<OrderSummary>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Cliente só enxerga os próprios pedidos
        let customer_filter = if actor.role.can(Capability::ViewAllOrders) {
            None
        } else {
            Some(actor.id)
        };
        let (limit, offset) = page_bounds(limit, offset);

        self.orders_repo
            .list(executor, actor.tenant_id, customer_filter, status, limit, offset)
            .await
    }

    pub async fn get_order_detail(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        order_id: Uuid,
    ) -> Result<OrderDetail, AppError> {
        let order = self.orders_repo.find_by_id(&mut *conn, actor.tenant_id, order_id).await?;
        let order = ensure_same_tenant(order, actor.tenant_id).ok_or(AppError::OrderNotFound)?;

        if !can_see_order(actor, &order) {
            return Err(AppError::OrderNotFound);
        }

        self.load_detail(conn, order).await
    }

    async fn load_detail(&self, conn: &mut PgConnection, order: Order) -> Result<OrderDetail, AppError> {
        let tenant_id = order.tenant_id;
        let customer = self
            .user_repo
            .find_by_id(&mut *conn, tenant_id, order.customer_id)
            .await?
            .ok_or(AppError::UserNotFound)?;
        let items = self.orders_repo.list_items(&mut *conn, tenant_id, order.id).await?;
        let history = self.orders_repo.list_history(&mut *conn, tenant_id, order.id).await?;

        Ok(OrderDetail {
            header: order,
            customer_name: customer.full_name,
            customer_email: customer.email,
            items,
            history,
        })
    }

    pub async fn list_statuses<'e, E>(&self, executor: E) -> Result<Vec<OrderStatusInfo>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.orders_repo.list_statuses(executor).await
    }
}

// =============================================================================
//  REGRAS PURAS
// =============================================================================

/// Precifica as linhas contra o catálogo. Cliente paga sempre o preço de tabela;
/// funcionário pode sobrescrever o preço unitário.
pub fn price_lines(
    role: Role,
    lines: &[OrderLinePayload],
    catalog: &HashMap<Uuid, Product>,
) -> Result<Vec<PricedLine>, AppError> {
    lines
        .iter()
        .map(|line| {
            let product = catalog
                .get(&line.product_id)
                .filter(|p| p.is_active)
                .ok_or(AppError::ProductNotFound(line.product_id))?;

            if !(1..=MAX_LINE_QUANTITY).contains(&line.quantity) {
                return Err(AppError::InvalidInput("quantity".to_string()));
            }

            let unit_price = match line.unit_price {
                Some(price) if price != product.price => {
                    if !role.is_staff() {
                        return Err(AppError::PriceMismatch {
                            product_id: product.id,
                            catalog_price: product.price,
                        });
                    }
                    if (price.is_sign_negative() && !price.is_zero()) || price > max_money() {
                        return Err(AppError::InvalidInput("unitPrice".to_string()));
                    }
                    price.round_dp(2)
                }
                _ => product.price,
            };

            let subtotal = unit_price
                .checked_mul(Decimal::from(line.quantity))
                .filter(|s| *s <= max_money())
                .ok_or_else(|| AppError::InvalidInput("quantity".to_string()))?;

            Ok(PricedLine {
                product_id: product.id,
                product_name: product.name.clone(),
                quantity: line.quantity,
                unit_price,
                subtotal,
            })
        })
        .collect()
}

/// Soma dos subtotais; acima do que a coluna comporta é entrada inválida.
pub fn order_total(lines: &[PricedLine]) -> Result<Decimal, AppError> {
    lines
        .iter()
        .try_fold(Decimal::ZERO, |acc, l| acc.checked_add(l.subtotal))
        .filter(|total| *total <= max_money())
        .ok_or_else(|| AppError::InvalidInput("total".to_string()))
}

/// O total informado pelo cliente é só conferência: o valor gravado é sempre o calculado.
pub fn check_client_total(computed: Decimal, client_total: Option<Decimal>) -> Result<(), AppError> {
    match client_total {
        Some(received) if received != computed => Err(AppError::OrderTotalMismatch {
            expected: computed,
            received,
        }),
        _ => Ok(()),
    }
}

/// Quantidade por produto (linhas repetidas somadas), em ordem crescente de id.
pub fn stock_demand(lines: &[PricedLine]) -> Result<BTreeMap<Uuid, i32>, AppError> {
    merge_quantities(lines.iter().map(|l| (l.product_id, l.quantity)))
}

// Soma com verificação: um total que não cabe em i32 é rejeitado, nunca truncado.
fn merge_quantities(
    entries: impl IntoIterator<Item = (Uuid, i32)>,
) -> Result<BTreeMap<Uuid, i32>, AppError> {
    let mut merged: BTreeMap<Uuid, i32> = BTreeMap::new();
    for (product_id, quantity) in entries {
        let slot = merged.entry(product_id).or_insert(0);
        *slot = slot
            .checked_add(quantity)
            .filter(|q| *q > 0)
            .ok_or_else(|| AppError::InvalidInput("quantity".to_string()))?;
    }
    Ok(merged)
}

pub fn check_transition(from: OrderStatus, to: OrderStatus) -> Result<(), AppError> {
    if from.is_terminal() {
        return Err(AppError::OrderAlreadyFinalized(from));
    }
    if !from.can_transition_to(to) {
        return Err(AppError::InvalidStatusTransition { from, to });
    }
    Ok(())
}

fn can_see_order(actor: &User, order: &Order) -> bool {
    actor.role.can(Capability::ViewAllOrders) || order.customer_id == actor.id
}

pub fn ensure_can_cancel(actor: &User, order: &Order) -> Result<(), AppError> {
    if actor.role.can(Capability::ChangeOrderStatus) {
        return Ok(());
    }
    if !actor.role.can(Capability::CancelOwnOrder) || order.customer_id != actor.id {
        return Err(AppError::PermissionDenied(Capability::CancelOwnOrder));
    }
    if order.status != OrderStatus::Pending {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn page_bounds(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn product(price: Decimal, stock: i32) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            category_id: None,
            name: "Yerba Mate 1kg".into(),
            description: None,
            barcode: None,
            price,
            stock,
            min_stock: 0,
            image_url: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn user(role: Role) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            email: "cliente@example.com".into(),
            password_hash: String::new(),
            full_name: "Cliente".into(),
            phone: None,
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn order_of(customer: &User, status: OrderStatus) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(),
            order_number: "PED-20250314-0001".into(),
            tenant_id: customer.tenant_id,
            customer_id: customer.id,
            user_id: Some(customer.id),
            status,
            total: dec!(10.00),
            payment_method: "efectivo".into(),
            delivery_method: "retiro".into(),
            delivery_address: None,
            notes: None,
            idempotency_key: None,
            created_at: now,
            updated_at: now,
            closed_at: None,
        }
    }

    fn line(product_id: Uuid, quantity: i32, unit_price: Option<Decimal>) -> OrderLinePayload {
        OrderLinePayload { product_id, quantity, unit_price }
    }

    fn catalog(products: &[&Product]) -> HashMap<Uuid, Product> {
        products.iter().map(|p| (p.id, (*p).clone())).collect()
    }

    #[test]
    fn total_is_the_sum_of_subtotals() {
        let a = product(dec!(1000), 10);
        let b = product(dec!(500), 10);
        let lines = price_lines(
            Role::Customer,
            &[line(a.id, 1, None), line(b.id, 3, None)],
            &catalog(&[&a, &b]),
        )
        .unwrap();

        assert_eq!(lines[0].subtotal, dec!(1000));
        assert_eq!(lines[1].subtotal, dec!(1500));
        assert_eq!(order_total(&lines).unwrap(), dec!(2500));
        assert!(check_client_total(dec!(2500), Some(dec!(2500.00))).is_ok());
        assert!(check_client_total(dec!(2500), None).is_ok());
    }

    #[test]
    fn client_total_that_differs_is_rejected() {
        let err = check_client_total(dec!(2500), Some(dec!(2400))).unwrap_err();
        assert!(matches!(
            err,
            AppError::OrderTotalMismatch { expected, received } if expected == dec!(2500) && received == dec!(2400)
        ));
    }

    #[test]
    fn customer_cannot_choose_the_price() {
        let a = product(dec!(1000), 10);
        let err = price_lines(Role::Customer, &[line(a.id, 1, Some(dec!(1)))], &catalog(&[&a])).unwrap_err();
        assert!(matches!(err, AppError::PriceMismatch { .. }));

        // Informar o próprio preço de tabela é aceito
        let ok = price_lines(Role::Customer, &[line(a.id, 1, Some(dec!(1000.00)))], &catalog(&[&a])).unwrap();
        assert_eq!(ok[0].unit_price, dec!(1000));
    }

    #[test]
    fn staff_may_override_the_price() {
        let a = product(dec!(1000), 10);
        let lines = price_lines(Role::Employee, &[line(a.id, 2, Some(dec!(900)))], &catalog(&[&a])).unwrap();
        assert_eq!(lines[0].unit_price, dec!(900));
        assert_eq!(lines[0].subtotal, dec!(1800));
    }

    #[test]
    fn unknown_or_inactive_products_are_not_found() {
        let mut inactive = product(dec!(10), 10);
        inactive.is_active = false;
        let missing = Uuid::new_v4();

        let err = price_lines(Role::Admin, &[line(missing, 1, None)], &catalog(&[])).unwrap_err();
        assert!(matches!(err, AppError::ProductNotFound(id) if id == missing));

        let err = price_lines(Role::Admin, &[line(inactive.id, 1, None)], &catalog(&[&inactive])).unwrap_err();
        assert!(matches!(err, AppError::ProductNotFound(_)));
    }

    #[test]
    fn repeated_products_are_merged_and_sorted_for_locking() {
        let a = product(dec!(1), 10);
        let b = product(dec!(2), 10);
        let lines = price_lines(
            Role::Admin,
            &[line(b.id, 1, None), line(a.id, 2, None), line(b.id, 4, None)],
            &catalog(&[&a, &b]),
        )
        .unwrap();

        let demand: Vec<(Uuid, i32)> = stock_demand(&lines).unwrap().into_iter().collect();
        assert_eq!(demand.len(), 2);
        assert!(demand[0].0 < demand[1].0);
        assert_eq!(demand.iter().find(|(id, _)| *id == b.id).unwrap().1, 5);
        assert_eq!(demand.iter().find(|(id, _)| *id == a.id).unwrap().1, 2);
    }

    #[test]
    fn repeated_huge_lines_never_wrap_around() {
        let a = product(dec!(0.01), 5);
        let huge = PricedLine {
            product_id: a.id,
            product_name: a.name.clone(),
            quantity: 2_000_000_000,
            unit_price: dec!(0.01),
            subtotal: dec!(20000000),
        };
        let err = stock_demand(&[huge.clone(), huge]).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(field) if field == "quantity"));

        // Acima do limite por linha nem chega à soma
        let err = price_lines(Role::Customer, &[line(a.id, 2_000_000_000, None)], &catalog(&[&a])).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(field) if field == "quantity"));

        let merged = merge_quantities([(a.id, 3), (a.id, 4)]).unwrap();
        assert_eq!(merged[&a.id], 7);
    }

    #[test]
    fn staff_price_override_cannot_overflow() {
        let a = product(dec!(1000), 10);

        let err = price_lines(Role::Employee, &[line(a.id, 3, Some(Decimal::MAX))], &catalog(&[&a])).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(field) if field == "unitPrice"));

        let err = price_lines(Role::Employee, &[line(a.id, 1, Some(dec!(10000000000)))], &catalog(&[&a])).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(field) if field == "unitPrice"));

        // Preço válido, mas o subtotal não cabe na coluna
        let err = price_lines(
            Role::Employee,
            &[line(a.id, 1_000_000, Some(dec!(9999999999.99)))],
            &catalog(&[&a]),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(field) if field == "quantity"));

        let ok = price_lines(Role::Employee, &[line(a.id, 1, Some(dec!(9999999999.99)))], &catalog(&[&a])).unwrap();
        assert_eq!(ok[0].subtotal, dec!(9999999999.99));
    }

    #[test]
    fn total_above_the_column_limit_is_rejected() {
        let a = product(dec!(1), 10);
        let big = PricedLine {
            product_id: a.id,
            product_name: a.name.clone(),
            quantity: 1,
            unit_price: dec!(9999999999.99),
            subtotal: dec!(9999999999.99),
        };
        let err = order_total(&[big.clone(), big]).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(field) if field == "total"));
    }

    #[test]
    fn terminal_orders_reject_every_transition() {
        for target in OrderStatus::ALL {
            assert!(matches!(
                check_transition(OrderStatus::Completed, target),
                Err(AppError::OrderAlreadyFinalized(OrderStatus::Completed))
            ));
            assert!(matches!(
                check_transition(OrderStatus::Cancelled, target),
                Err(AppError::OrderAlreadyFinalized(OrderStatus::Cancelled))
            ));
        }
        assert!(matches!(
            check_transition(OrderStatus::Ready, OrderStatus::Cancelled),
            Err(AppError::InvalidStatusTransition { .. })
        ));
        assert!(matches!(
            check_transition(OrderStatus::Pending, OrderStatus::Pending),
            Err(AppError::InvalidStatusTransition { .. })
        ));
        assert!(check_transition(OrderStatus::Pending, OrderStatus::Cancelled).is_ok());
    }

    #[test]
    fn customer_cancels_only_own_pending_orders() {
        let customer = user(Role::Customer);
        let mut other = user(Role::Customer);
        other.tenant_id = customer.tenant_id;

        assert!(ensure_can_cancel(&customer, &order_of(&customer, OrderStatus::Pending)).is_ok());
        assert!(matches!(
            ensure_can_cancel(&customer, &order_of(&customer, OrderStatus::Confirmed)),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            ensure_can_cancel(&customer, &order_of(&other, OrderStatus::Pending)),
            Err(AppError::PermissionDenied(_))
        ));

        let employee = user(Role::Employee);
        assert!(ensure_can_cancel(&employee, &order_of(&customer, OrderStatus::InProcess)).is_ok());
    }

    #[test]
    fn page_bounds_are_clamped() {
        assert_eq!(page_bounds(None, None), (DEFAULT_PAGE_SIZE, 0));
        assert_eq!(page_bounds(Some(10_000), Some(-5)), (MAX_PAGE_SIZE, 0));
        assert_eq!(page_bounds(Some(0), Some(20)), (1, 20));
    }
}
