// src/handlers/dashboard.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::{db_utils::get_rls_connection, error::ApiError, response::ApiResponse},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermViewDashboard, RequirePermission},
        tenancy::TenantContext,
    },
    models::dashboard::DashboardMetrics,
};

// GET /api/dashboard/metricas
#[utoipa::path(
    get,
    path = "/api/dashboard/metricas",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Pedidos, faturamento, estoque e ranking da loja", body = DashboardMetrics),
        (status = 401, description = "Não autorizado"),
        (status = 403, description = "Sem acesso ao painel")
    ),
    params(
        ("x-tenant-id" = Option<uuid::Uuid>, Header, description = "ID da Loja")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_metrics(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _perm: RequirePermission<PermViewDashboard>,
) -> Result<impl IntoResponse, ApiError> {

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let metrics = app_state.dashboard_service
        .get_metrics(&mut *rls_conn, tenant.0)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(ApiResponse::ok(metrics))))
}
