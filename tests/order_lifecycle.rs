// Ciclo de vida do pedido contra um Postgres real.
// Ignorados por padrão: TEST_DATABASE_URL=postgres://... cargo test -- --ignored

mod common;

use axum::http::StatusCode;
use rust_decimal_macros::dec;
use serde_json::json;
use smartpyme_backend::{
    common::{db_utils::scoped_connection, error::AppError},
    models::{
        auth::{Role, User},
        orders::{CreateOrderPayload, OrderLinePayload, OrderStatus},
    },
    services::order_service::OrderCreation,
};
use uuid::Uuid;

use common::{authed, TestApp};

fn payload(items: &[(Uuid, i32)]) -> CreateOrderPayload {
    CreateOrderPayload {
        customer_id: None,
        items: items
            .iter()
            .map(|&(product_id, quantity)| OrderLinePayload { product_id, quantity, unit_price: None })
            .collect(),
        total: None,
        payment_method: "efectivo".into(),
        delivery_method: "retiro".into(),
        delivery_address: None,
        notes: None,
    }
}

async fn place(app: &TestApp, actor: &User, payload: &CreateOrderPayload, key: Option<&str>) -> Result<OrderCreation, AppError> {
    let mut conn = scoped_connection(&app.state.db_pool, actor.tenant_id, Some(actor.id))
        .await
        .expect("scoped conn");
    app.state.order_service.create_order(&mut conn, actor, payload, key).await
}

fn created(result: Result<OrderCreation, AppError>) -> smartpyme_backend::models::orders::OrderDetail {
    match result.expect("create order") {
        OrderCreation::Created(detail) => detail,
        OrderCreation::Replayed(_) => panic!("esperava um pedido novo"),
    }
}

#[tokio::test]
#[ignore]
async fn create_prices_on_server_and_decrements_stock() {
    let app = TestApp::new().await;
    let tenant = app.tenant().await;
    let customer = app.user(tenant.id, Role::Customer).await;
    let _admin = app.user(tenant.id, Role::Admin).await;
    let yerba = app.product(tenant.id, "Yerba", dec!(1000), 10).await;
    let azucar = app.product(tenant.id, "Azúcar", dec!(500), 10).await;

    let mut order = payload(&[(yerba.id, 1), (azucar.id, 3)]);
    order.total = Some(dec!(2500));
    let detail = created(place(&app, &customer, &order, None).await);

    assert_eq!(detail.header.total, dec!(2500));
    assert_eq!(detail.header.status, OrderStatus::Pending);
    assert!(detail.header.order_number.starts_with("PED-"));
    assert_eq!(detail.items.len(), 2);
    assert_eq!(detail.history.len(), 1);
    assert_eq!(detail.history[0].previous_status, None);
    assert_eq!(app.stock_of(tenant.id, yerba.id).await, 9);
    assert_eq!(app.stock_of(tenant.id, azucar.id).await, 7);
}

#[tokio::test]
#[ignore]
async fn insufficient_stock_rolls_back_every_line() {
    let app = TestApp::new().await;
    let tenant = app.tenant().await;
    let customer = app.user(tenant.id, Role::Customer).await;
    let yerba = app.product(tenant.id, "Yerba", dec!(1000), 10).await;
    let azucar = app.product(tenant.id, "Azúcar", dec!(500), 1).await;

    let result = place(&app, &customer, &payload(&[(yerba.id, 2), (azucar.id, 2)]), None).await;

    assert!(matches!(result, Err(AppError::InsufficientStock { available: 1, requested: 2, .. })));
    assert_eq!(app.stock_of(tenant.id, yerba.id).await, 10);
    assert_eq!(app.stock_of(tenant.id, azucar.id).await, 1);
}

#[tokio::test]
#[ignore]
async fn cancel_restores_stock_and_records_history() {
    let app = TestApp::new().await;
    let tenant = app.tenant().await;
    let customer = app.user(tenant.id, Role::Customer).await;
    let employee = app.user(tenant.id, Role::Employee).await;
    let yerba = app.product(tenant.id, "Yerba", dec!(1000), 5).await;

    let detail = created(place(&app, &customer, &payload(&[(yerba.id, 2), (yerba.id, 1)]), None).await);
    assert_eq!(app.stock_of(tenant.id, yerba.id).await, 2);

    let mut conn = scoped_connection(&app.state.db_pool, tenant.id, Some(employee.id)).await.unwrap();
    app.state
        .order_service
        .transition_order(&mut conn, &employee, detail.header.id, OrderStatus::Confirmed, None)
        .await
        .unwrap();
    let cancelled = app.state
        .order_service
        .cancel_order(&mut conn, &employee, detail.header.id, Some("sin stock en depósito"))
        .await
        .unwrap();

    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert!(cancelled.closed_at.is_some());
    assert_eq!(app.stock_of(tenant.id, yerba.id).await, 5);

    let full = app.state.order_service.get_order_detail(&mut conn, &employee, detail.header.id).await.unwrap();
    let statuses: Vec<OrderStatus> = full.history.iter().map(|h| h.new_status).collect();
    assert_eq!(statuses, vec![OrderStatus::Pending, OrderStatus::Confirmed, OrderStatus::Cancelled]);
}

#[tokio::test]
#[ignore]
async fn completed_orders_are_final() {
    let app = TestApp::new().await;
    let tenant = app.tenant().await;
    let customer = app.user(tenant.id, Role::Customer).await;
    let admin = app.user(tenant.id, Role::Admin).await;
    let yerba = app.product(tenant.id, "Yerba", dec!(1000), 5).await;

    let detail = created(place(&app, &customer, &payload(&[(yerba.id, 1)]), None).await);
    let mut conn = scoped_connection(&app.state.db_pool, tenant.id, Some(admin.id)).await.unwrap();

    for next in [
        OrderStatus::Confirmed,
        OrderStatus::InProcess,
        OrderStatus::Ready,
        OrderStatus::Shipped,
        OrderStatus::Completed,
    ] {
        app.state
            .order_service
            .transition_order(&mut conn, &admin, detail.header.id, next, None)
            .await
            .unwrap();
    }

    let err = app.state
        .order_service
        .cancel_order(&mut conn, &admin, detail.header.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::OrderAlreadyFinalized(OrderStatus::Completed)));
    assert_eq!(app.stock_of(tenant.id, yerba.id).await, 4);
}

#[tokio::test]
#[ignore]
async fn concurrent_orders_never_oversell() {
    let app = TestApp::new().await;
    let tenant = app.tenant().await;
    let customer = app.user(tenant.id, Role::Customer).await;
    let yerba = app.product(tenant.id, "Yerba", dec!(1000), 5).await;

    let mut tasks = Vec::new();
    for _ in 0..12 {
        let state = app.state.clone();
        let customer = customer.clone();
        let order = payload(&[(yerba.id, 1)]);
        tasks.push(tokio::spawn(async move {
            let mut conn = scoped_connection(&state.db_pool, customer.tenant_id, Some(customer.id))
                .await
                .expect("scoped conn");
            state.order_service.create_order(&mut conn, &customer, &order, None).await
        }));
    }

    let mut ok = 0;
    let mut rejected = 0;
    for task in tasks {
        match task.await.expect("join") {
            Ok(_) => ok += 1,
            Err(AppError::InsufficientStock { .. }) => rejected += 1,
            Err(other) => panic!("erro inesperado: {other:?}"),
        }
    }

    assert_eq!(ok, 5);
    assert_eq!(rejected, 7);
    assert_eq!(app.stock_of(tenant.id, yerba.id).await, 0);
}

#[tokio::test]
#[ignore]
async fn repeated_idempotency_key_replays_the_same_order() {
    let app = TestApp::new().await;
    let tenant = app.tenant().await;
    let customer = app.user(tenant.id, Role::Customer).await;
    let other = app.user(tenant.id, Role::Customer).await;
    let yerba = app.product(tenant.id, "Yerba", dec!(1000), 5).await;
    let order = payload(&[(yerba.id, 2)]);

    let first = created(place(&app, &customer, &order, Some("checkout-42")).await);
    let second = place(&app, &customer, &order, Some("checkout-42")).await.unwrap();

    match second {
        OrderCreation::Replayed(detail) => assert_eq!(detail.header.id, first.header.id),
        OrderCreation::Created(_) => panic!("a chave repetida não pode criar outro pedido"),
    }
    assert_eq!(app.stock_of(tenant.id, yerba.id).await, 3);

    let stolen = place(&app, &other, &order, Some("checkout-42")).await;
    assert!(matches!(stolen, Err(AppError::IdempotencyKeyReused)));
}

// --- Pela API ---

#[tokio::test]
#[ignore]
async fn http_create_then_replay_answers_201_then_200() {
    let app = TestApp::new().await;
    let tenant = app.tenant().await;
    let customer = app.user(tenant.id, Role::Customer).await;
    let yerba = app.product(tenant.id, "Yerba", dec!(1000), 5).await;
    let body = json!({
        "items": [{ "productId": yerba.id, "quantity": 1 }],
        "total": 1000,
        "paymentMethod": "efectivo",
        "deliveryMethod": "retiro"
    });

    let mut request = authed("POST", "/api/pedidos", &customer, Some(body.clone()));
    request.headers_mut().insert("idempotency-key", "http-1".parse().unwrap());
    let (status, created) = app.request(request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["success"], true);

    let mut request = authed("POST", "/api/pedidos", &customer, Some(body));
    request.headers_mut().insert("idempotency-key", "http-1".parse().unwrap());
    let (status, replayed) = app.request(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replayed["data"]["id"], created["data"]["id"]);
}

#[tokio::test]
#[ignore]
async fn http_tenant_isolation() {
    let app = TestApp::new().await;
    let tienda_a = app.tenant().await;
    let tienda_b = app.tenant().await;
    let customer_a = app.user(tienda_a.id, Role::Customer).await;
    let admin_b = app.user(tienda_b.id, Role::Admin).await;
    let yerba = app.product(tienda_a.id, "Yerba", dec!(1000), 5).await;

    let detail = created(place(&app, &customer_a, &payload(&[(yerba.id, 1)]), None).await);

    // Pedido de outra loja é simplesmente "não encontrado"
    let uri = format!("/api/pedidos/{}/detalle", detail.header.id);
    let (status, body) = app.request(authed("GET", &uri, &admin_b, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    // Escrita também: cancelar ou mudar status de pedido alheio não toca em nada
    let uri = format!("/api/pedidos/{}/cancelar", detail.header.id);
    let (status, _) = app.request(authed("POST", &uri, &admin_b, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/api/pedidos/{}/cambiar-estado", detail.header.id);
    let (status, _) = app
        .request(authed("POST", &uri, &admin_b, Some(json!({ "status": "CONFIRMED" }))))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(app.stock_of(tienda_a.id, yerba.id).await, 4);
    let uri = format!("/api/pedidos/{}/detalle", detail.header.id);
    let (status, body) = app.request(authed("GET", &uri, &customer_a, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "PENDING");
    assert_eq!(body["data"]["history"].as_array().map(Vec::len), Some(1));

    // Outro cliente da mesma loja também não enxerga o pedido
    let other_customer = app.user(tienda_a.id, Role::Customer).await;
    let (status, _) = app.request(authed("GET", &uri, &other_customer, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/api/pedidos/{}/cancelar", detail.header.id);
    let (status, _) = app.request(authed("POST", &uri, &other_customer, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.stock_of(tienda_a.id, yerba.id).await, 4);

    // Token da loja B pedindo a loja A pelo slug
    let uri = format!("/api/tienda/{}/pedidos", tienda_a.slug);
    let (status, _) = app.request(authed("GET", &uri, &admin_b, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Sem token
    let request = axum::http::Request::builder()
        .uri("/api/pedidos")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, _) = app.request(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn http_customer_cannot_change_status() {
    let app = TestApp::new().await;
    let tenant = app.tenant().await;
    let customer = app.user(tenant.id, Role::Customer).await;
    let yerba = app.product(tenant.id, "Yerba", dec!(1000), 5).await;
    let detail = created(place(&app, &customer, &payload(&[(yerba.id, 1)]), None).await);

    let uri = format!("/api/pedidos/{}/cambiar-estado", detail.header.id);
    let (status, _) = app
        .request(authed("POST", &uri, &customer, Some(json!({ "status": "CONFIRMED" }))))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(authed("POST", &uri, &customer, Some(json!({ "status": "VOLANDO" }))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // O próprio cliente pode cancelar enquanto PENDING
    let uri = format!("/api/pedidos/{}/cancelar", detail.header.id);
    let (status, body) = app.request(authed("POST", &uri, &customer, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "CANCELLED");
}

#[tokio::test]
#[ignore]
async fn http_oversized_quantities_and_prices_are_rejected() {
    let app = TestApp::new().await;
    let tenant = app.tenant().await;
    let customer = app.user(tenant.id, Role::Customer).await;
    let employee = app.user(tenant.id, Role::Employee).await;
    let yerba = app.product(tenant.id, "Yerba", dec!(0.01), 5).await;

    // Duas linhas enormes do mesmo produto: nada de estoque "criado"
    let body = json!({
        "items": [
            { "productId": yerba.id, "quantity": 2_000_000_000 },
            { "productId": yerba.id, "quantity": 2_000_000_000 }
        ],
        "paymentMethod": "efectivo",
        "deliveryMethod": "retiro"
    });
    let (status, body) = app.request(authed("POST", "/api/pedidos", &customer, Some(body))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(app.stock_of(tenant.id, yerba.id).await, 5);

    // Preço de funcionário acima do que a coluna comporta
    let body = json!({
        "customerId": customer.id,
        "items": [{ "productId": yerba.id, "quantity": 3, "unitPrice": 1e28 }],
        "paymentMethod": "efectivo",
        "deliveryMethod": "retiro"
    });
    let (status, _) = app.request(authed("POST", "/api/pedidos", &employee, Some(body))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.stock_of(tenant.id, yerba.id).await, 5);
}

#[tokio::test]
#[ignore]
async fn http_stock_adjustment_stays_in_range() {
    let app = TestApp::new().await;
    let tenant = app.tenant().await;
    let admin = app.user(tenant.id, Role::Admin).await;
    let arroz = app.product(tenant.id, "Arroz", dec!(800), 999_999_999).await;
    let uri = format!("/api/productos/{}/stock", arroz.id);

    let (status, _) = app.request(authed("POST", &uri, &admin, Some(json!({ "delta": i32::MAX })))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Dentro do limite do payload, mas passaria do estoque máximo
    let (status, _) = app.request(authed("POST", &uri, &admin, Some(json!({ "delta": 1_000_000 })))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.stock_of(tenant.id, arroz.id).await, 999_999_999);

    let (status, body) = app.request(authed("POST", &uri, &admin, Some(json!({ "delta": 1 })))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stock"], 1_000_000_000);
}
