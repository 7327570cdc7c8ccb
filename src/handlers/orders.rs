// src/handlers/orders.rs

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::{
        db_utils::get_rls_connection,
        error::{ApiError, AppError},
        response::ApiResponse,
    },
    config::AppState,
    handlers::ResourceId,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermPlaceOrder, RequirePermission},
        tenancy::TenantContext,
    },
    models::orders::{
        CancelOrderPayload, ChangeStatusPayload, CreateOrderPayload, Order, OrderDetail,
        OrderListQuery, OrderStatus, OrderStatusInfo, OrderSummary,
    },
    services::order_service::OrderCreation,
};

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";
const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

/// Lê o cabeçalho Idempotency-Key. Vazio ou ausente = sem chave.
pub fn idempotency_key(headers: &HeaderMap) -> Result<Option<String>, AppError> {
    let Some(value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };

    let key = value
        .to_str()
        .map_err(|_| AppError::InvalidInput("Idempotency-Key".to_string()))?
        .trim();

    if key.is_empty() {
        return Ok(None);
    }
    if key.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return Err(AppError::InvalidInput("Idempotency-Key".to_string()));
    }
    Ok(Some(key.to_string()))
}

// POST /api/pedidos
#[utoipa::path(
    post,
    path = "/api/pedidos",
    tag = "Pedidos",
    request_body = CreateOrderPayload,
    responses(
        (status = 201, description = "Pedido criado", body = OrderDetail),
        (status = 200, description = "Chave repetida: o pedido já existente", body = OrderDetail),
        (status = 400, description = "Itens inválidos ou total divergente"),
        (status = 409, description = "Estoque insuficiente ou chave usada por outro cliente")
    ),
    params(
        ("Idempotency-Key" = Option<String>, Header, description = "Chave para repetir a criação sem duplicar"),
        ("x-tenant-id" = Option<uuid::Uuid>, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _perm: RequirePermission<PermPlaceOrder>,
    headers: HeaderMap,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let key = idempotency_key(&headers).map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let created = app_state
        .order_service
        .create_order(&mut *rls_conn, &user.0, &payload, key.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let (status, detail) = match created {
        OrderCreation::Created(detail) => (StatusCode::CREATED, detail),
        OrderCreation::Replayed(detail) => (StatusCode::OK, detail),
    };

    Ok((status, Json(ApiResponse::ok(detail))))
}

// GET /api/pedidos
#[utoipa::path(
    get,
    path = "/api/pedidos",
    tag = "Pedidos",
    responses(
        (status = 200, description = "Pedidos (o cliente só vê os próprios)", body = [OrderSummary]),
        (status = 400, description = "Status desconhecido")
    ),
    params(OrderListQuery),
    security(("api_jwt" = []))
)]
pub async fn list_orders(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Query(query): Query<OrderListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()
        .map_err(|raw| AppError::UnknownOrderStatus(raw).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let orders = app_state
        .order_service
        .list_orders(&mut *rls_conn, &user.0, status, query.limit, query.offset)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(orders)))
}

// GET /api/pedidos/estados
#[utoipa::path(
    get,
    path = "/api/pedidos/estados",
    tag = "Pedidos",
    responses((status = 200, description = "Catálogo de status", body = [OrderStatusInfo])),
    security(("api_jwt" = []))
)]
pub async fn list_statuses(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let statuses = app_state
        .order_service
        .list_statuses(&mut *rls_conn)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(statuses)))
}

// GET /api/pedidos/{id}/detalle
#[utoipa::path(
    get,
    path = "/api/pedidos/{id}/detalle",
    tag = "Pedidos",
    responses(
        (status = 200, description = "Pedido com itens e histórico", body = OrderDetail),
        (status = 404, description = "Pedido não encontrado")
    ),
    params(("id" = uuid::Uuid, Path, description = "ID do Pedido")),
    security(("api_jwt" = []))
)]
pub async fn get_order_detail(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(ResourceId { id }): Path<ResourceId>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let detail = app_state
        .order_service
        .get_order_detail(&mut *rls_conn, &user.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(detail)))
}

// POST /api/pedidos/{id}/cambiar-estado
#[utoipa::path(
    post,
    path = "/api/pedidos/{id}/cambiar-estado",
    tag = "Pedidos",
    request_body = ChangeStatusPayload,
    responses(
        (status = 200, description = "Status alterado", body = Order),
        (status = 400, description = "Status desconhecido"),
        (status = 403, description = "Papel sem permissão"),
        (status = 409, description = "Transição inválida ou pedido finalizado")
    ),
    params(("id" = uuid::Uuid, Path, description = "ID do Pedido")),
    security(("api_jwt" = []))
)]
pub async fn change_status(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(ResourceId { id }): Path<ResourceId>,
    Json(payload): Json<ChangeStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let target: OrderStatus = payload
        .status
        .parse()
        .map_err(|raw| AppError::UnknownOrderStatus(raw).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    // Cancelar por aqui segue as mesmas regras do endpoint de cancelamento
    let order = if target == OrderStatus::Cancelled {
        app_state
            .order_service
            .cancel_order(&mut *rls_conn, &user.0, id, payload.note.as_deref())
            .await
    } else {
        app_state
            .order_service
            .transition_order(&mut *rls_conn, &user.0, id, target, payload.note.as_deref())
            .await
    }
    .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(order)))
}

// POST /api/pedidos/{id}/cancelar
#[utoipa::path(
    post,
    path = "/api/pedidos/{id}/cancelar",
    tag = "Pedidos",
    request_body(content = CancelOrderPayload, description = "Corpo opcional com o motivo"),
    responses(
        (status = 200, description = "Pedido cancelado e estoque devolvido", body = Order),
        (status = 403, description = "Cliente tentando cancelar pedido já confirmado"),
        (status = 409, description = "Pedido já finalizado")
    ),
    params(("id" = uuid::Uuid, Path, description = "ID do Pedido")),
    security(("api_jwt" = []))
)]
pub async fn cancel_order(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(ResourceId { id }): Path<ResourceId>,
    payload: Option<Json<CancelOrderPayload>>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let order = app_state
        .order_service
        .cancel_order(&mut *rls_conn, &user.0, id, payload.reason.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(order)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn missing_or_blank_key_means_no_idempotency() {
        assert_eq!(idempotency_key(&HeaderMap::new()).unwrap(), None);

        let mut headers = HeaderMap::new();
        headers.insert(IDEMPOTENCY_KEY_HEADER, HeaderValue::from_static("   "));
        assert_eq!(idempotency_key(&headers).unwrap(), None);
    }

    #[test]
    fn key_is_trimmed() {
        let mut headers = HeaderMap::new();
        headers.insert(IDEMPOTENCY_KEY_HEADER, HeaderValue::from_static(" pedido-123 "));
        assert_eq!(idempotency_key(&headers).unwrap().as_deref(), Some("pedido-123"));
    }

    #[test]
    fn oversized_key_is_rejected() {
        let mut headers = HeaderMap::new();
        let long = "k".repeat(MAX_IDEMPOTENCY_KEY_LEN + 1);
        headers.insert(IDEMPOTENCY_KEY_HEADER, HeaderValue::from_str(&long).unwrap());
        assert!(matches!(idempotency_key(&headers), Err(AppError::InvalidInput(_))));
    }
}
