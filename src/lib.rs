// src/lib.rs

use axum::{
    http::HeaderValue,
    middleware as axum_middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::middleware::{auth::auth_guard, tenancy::tenant_guard};

/// Rotas que exigem token. Montadas em /api e de novo em /api/tienda/{slug}.
fn authenticated_routes(app_state: &AppState) -> Router<AppState> {
    let order_routes = Router::new()
        .route("/"
               ,post(handlers::orders::create_order)
               .get(handlers::orders::list_orders)
        )
        .route("/estados", get(handlers::orders::list_statuses))
        .route("/{id}/detalle", get(handlers::orders::get_order_detail))
        .route("/{id}/cambiar-estado", post(handlers::orders::change_status))
        .route("/{id}/cancelar", post(handlers::orders::cancel_order));

    let product_routes = Router::new()
        .route("/"
               ,post(handlers::catalog::create_product)
               .get(handlers::catalog::list_products)
        )
        .route("/stock-bajo", get(handlers::catalog::list_low_stock))
        .route("/{id}"
               ,get(handlers::catalog::get_product)
               .put(handlers::catalog::update_product)
               .delete(handlers::catalog::deactivate_product)
        )
        .route("/{id}/stock", post(handlers::catalog::adjust_stock));

    let category_routes = Router::new()
        .route("/"
               ,post(handlers::catalog::create_category)
               .get(handlers::catalog::list_categories)
        )
        .route("/{id}"
               ,put(handlers::catalog::update_category)
               .delete(handlers::catalog::deactivate_category)
        );

    let notification_routes = Router::new()
        .route("/", get(handlers::notifications::list_notifications))
        .route("/no-leidas", get(handlers::notifications::unread_count))
        .route("/leer-todas", post(handlers::notifications::mark_all_read))
        .route("/{id}/leida", patch(handlers::notifications::mark_read));

    let user_routes = Router::new()
        .route("/", get(handlers::users::list_users))
        .route("/me", get(handlers::users::get_me))
        .route("/{id}", delete(handlers::users::deactivate_user))
        .route("/{id}/role", put(handlers::users::change_role));

    Router::new()
        .nest("/pedidos", order_routes)
        .nest("/productos", product_routes)
        .nest("/categorias", category_routes)
        .nest("/notificaciones", notification_routes)
        .nest("/users", user_routes)
        .route("/dashboard/metricas", get(handlers::dashboard::get_metrics))
        .route("/tenant"
               ,get(handlers::tenancy::get_tenant)
               .put(handlers::tenancy::rename_tenant)
        )
        // A última camada roda primeiro: auth, depois a loja
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ))
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/catalogo/{slug}", get(handlers::catalog::get_storefront))
        .route("/catalogo/{slug}/productos", get(handlers::catalog::list_storefront_products))
        .route("/catalogo/{slug}/categorias", get(handlers::catalog::list_storefront_categories))
        .route("/provisioning/tenants", post(handlers::tenancy::provision_tenant))
        .route("/provisioning/tenants/{id}", delete(handlers::tenancy::deactivate_tenant))
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    match origin {
        None => CorsLayer::permissive(),
        Some(raw) => match raw.parse::<HeaderValue>() {
            Ok(origin) => CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any),
            Err(_) => {
                tracing::warn!("CORS_ORIGIN inválido ({}), CORS desabilitado", raw);
                CorsLayer::new()
            }
        },
    }
}

/// O router completo da aplicação, já com o estado.
pub fn app(app_state: AppState) -> Router {
    let api = public_routes()
        .merge(authenticated_routes(&app_state))
        .nest("/tienda/{slug}", authenticated_routes(&app_state));

    let cors = cors_layer(app_state.config.cors_origin.as_deref());

    Router::new()
        .nest("/api", api)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}
