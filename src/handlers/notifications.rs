// src/handlers/notifications.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    common::{db_utils::get_rls_connection, error::ApiError, response::ApiResponse},
    config::AppState,
    handlers::ResourceId,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermReadNotifications, RequirePermission},
        tenancy::TenantContext,
    },
    models::notifications::{Notification, UnreadCount},
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
}

// GET /api/notificaciones
#[utoipa::path(
    get,
    path = "/api/notificaciones",
    tag = "Notificaciones",
    responses((status = 200, description = "Notificações do usuário (até 100)", body = [Notification])),
    params(NotificationQuery),
    security(("api_jwt" = []))
)]
pub async fn list_notifications(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _perm: RequirePermission<PermReadNotifications>,
    Query(query): Query<NotificationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let notifications = app_state
        .notification_service
        .list(&mut *rls_conn, &user.0, query.unread_only)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(notifications)))
}

// GET /api/notificaciones/no-leidas
#[utoipa::path(
    get,
    path = "/api/notificaciones/no-leidas",
    tag = "Notificaciones",
    responses((status = 200, description = "Contador de não lidas", body = UnreadCount)),
    security(("api_jwt" = []))
)]
pub async fn unread_count(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _perm: RequirePermission<PermReadNotifications>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let unread = app_state
        .notification_service
        .count_unread(&mut *rls_conn, &user.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(UnreadCount { unread })))
}

// PATCH /api/notificaciones/{id}/leida
#[utoipa::path(
    patch,
    path = "/api/notificaciones/{id}/leida",
    tag = "Notificaciones",
    responses(
        (status = 200, description = "Marcada como lida", body = Notification),
        (status = 404, description = "Notificação não encontrada")
    ),
    params(("id" = uuid::Uuid, Path, description = "ID da Notificação")),
    security(("api_jwt" = []))
)]
pub async fn mark_read(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _perm: RequirePermission<PermReadNotifications>,
    Path(ResourceId { id }): Path<ResourceId>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let notification = app_state
        .notification_service
        .mark_read(&mut *rls_conn, &user.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(notification)))
}

// POST /api/notificaciones/leer-todas
#[utoipa::path(
    post,
    path = "/api/notificaciones/leer-todas",
    tag = "Notificaciones",
    responses((status = 200, description = "Todas marcadas como lidas")),
    security(("api_jwt" = []))
)]
pub async fn mark_all_read(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _perm: RequirePermission<PermReadNotifications>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let updated = app_state
        .notification_service
        .mark_all_read(&mut *rls_conn, &user.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let message = app_state.i18n_store.translate(
        &locale.0,
        "notification.all_read",
        &[("count", updated.to_string())],
    );
    Ok(Json(ApiResponse::message(message)))
}
