// Harness compartilhado pelos testes de integração.
// Requer Postgres: TEST_DATABASE_URL=postgres://... cargo test -- --ignored
#![allow(dead_code)]

use std::collections::HashMap;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use rust_decimal::Decimal;
use serde_json::Value;
use smartpyme_backend::{
    app,
    common::db_utils::scoped_connection,
    config::{connect_pool, AppState, Config},
    models::{
        auth::{Claims, Role, User},
        catalog::Product,
        tenancy::Tenant,
    },
};
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";
pub const PROVISIONING_KEY: &str = "chave-de-teste";

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        let url = std::env::var("TEST_DATABASE_URL")
            .expect("TEST_DATABASE_URL precisa apontar para um Postgres de teste");

        let vars: HashMap<&str, String> = HashMap::from([
            ("DATABASE_URL", url),
            ("JWT_SECRET", JWT_SECRET.to_string()),
            ("DB_MAX_CONNECTIONS", "30".to_string()),
            ("DB_ACQUIRE_TIMEOUT_SECS", "10".to_string()),
            ("PROVISIONING_KEY", PROVISIONING_KEY.to_string()),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).cloned()).expect("config");

        let pool = connect_pool(&config).await.expect("db connect");
        sqlx::migrate!().run(&pool).await.expect("migrations");

        let state = AppState::build(pool, config).expect("app state");
        let router = app(state.clone());
        Self { state, router }
    }

    // --- Dados de apoio (cada teste cria a própria loja) ---

    pub async fn tenant(&self) -> Tenant {
        let slug = format!("loja-{}", &Uuid::new_v4().simple().to_string()[..12]);
        sqlx::query_as::<_, Tenant>(
            "INSERT INTO tenants (slug, name) VALUES ($1, $2) RETURNING *",
        )
        .bind(&slug)
        .bind(format!("Tienda {slug}"))
        .fetch_one(&self.state.db_pool)
        .await
        .expect("insert tenant")
    }

    pub async fn user(&self, tenant_id: Uuid, role: Role) -> User {
        let mut conn = scoped_connection(&self.state.db_pool, tenant_id, None)
            .await
            .expect("scoped conn");
        let email = format!("{}@test.local", Uuid::new_v4().simple());
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (tenant_id, email, password_hash, full_name, role)
            VALUES ($1, $2, 'x', $3, $4)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(&email)
        .bind(format!("Usuario {role:?}"))
        .bind(role)
        .fetch_one(&mut *conn)
        .await
        .expect("insert user")
    }

    pub async fn product(&self, tenant_id: Uuid, name: &str, price: Decimal, stock: i32) -> Product {
        let mut conn = scoped_connection(&self.state.db_pool, tenant_id, None)
            .await
            .expect("scoped conn");
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (tenant_id, name, price, stock, min_stock)
            VALUES ($1, $2, $3, $4, 2)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(name)
        .bind(price)
        .bind(stock)
        .fetch_one(&mut *conn)
        .await
        .expect("insert product")
    }

    pub async fn stock_of(&self, tenant_id: Uuid, product_id: Uuid) -> i32 {
        let mut conn = scoped_connection(&self.state.db_pool, tenant_id, None)
            .await
            .expect("scoped conn");
        sqlx::query_scalar::<_, i32>("SELECT stock FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_one(&mut *conn)
            .await
            .expect("stock")
    }

    // --- HTTP ---

    pub async fn request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.expect("router");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }
}

/// Token como o serviço de identidade emitiria.
pub fn token_for(user: &User) -> String {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id,
        tenant_id: user.tenant_id,
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(1)).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_ref()))
        .expect("encode token")
}

pub fn authed(method: &str, uri: &str, user: &User, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token_for(user)));

    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}
