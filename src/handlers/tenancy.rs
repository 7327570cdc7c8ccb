// src/handlers/tenancy.rs

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        response::ApiResponse,
    },
    config::AppState,
    handlers::ResourceId,
    middleware::{
        i18n::Locale,
        rbac::{PermManageTenant, RequirePermission},
        tenancy::TenantContext,
    },
    models::tenancy::Tenant,
};

pub const PROVISIONING_KEY_HEADER: &str = "x-provisioning-key";

// ---
// 1. "Payloads"
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RenameTenantPayload {
    #[validate(length(min = 1, max = 150, message = "required"))]
    #[schema(example = "Almacén Don Pepe")]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ProvisionTenantPayload {
    #[validate(length(min = 2, max = 63, message = "invalid_slug"))]
    #[schema(example = "almacen-don-pepe")]
    pub slug: String,
    #[validate(length(min = 1, max = 150, message = "required"))]
    pub name: String,
}

/// Sem chave configurada as rotas "não existem"; chave errada é 403.
pub fn check_provisioning_key(configured: Option<&str>, sent: Option<&str>) -> Result<(), AppError> {
    let Some(expected) = configured else {
        return Err(AppError::NotFound);
    };
    match sent {
        Some(key) if key == expected => Ok(()),
        _ => Err(AppError::Forbidden),
    }
}

fn provisioning_guard(app_state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let sent = headers.get(PROVISIONING_KEY_HEADER).and_then(|v| v.to_str().ok());
    check_provisioning_key(app_state.config.provisioning_key.as_deref(), sent).inspect_err(|e| {
        if matches!(e, AppError::Forbidden) {
            tracing::warn!("Tentativa de provisionamento com chave inválida");
        }
    })
}

// ---
// 2. A loja do próprio token
// ---

// GET /api/tenant
#[utoipa::path(
    get,
    path = "/api/tenant",
    tag = "Tienda",
    responses((status = 200, description = "A loja do token", body = Tenant)),
    security(("api_jwt" = []))
)]
pub async fn get_tenant(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = app_state
        .tenant_service
        .get(tenant.0)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(tenant)))
}

// PUT /api/tenant
#[utoipa::path(
    put,
    path = "/api/tenant",
    tag = "Tienda",
    request_body = RenameTenantPayload,
    responses(
        (status = 200, description = "Loja renomeada", body = Tenant),
        (status = 403, description = "Apenas o admin da loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn rename_tenant(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _perm: RequirePermission<PermManageTenant>,
    Json(payload): Json<RenameTenantPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let renamed = app_state
        .tenant_service
        .rename(tenant.0, &payload.name)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(renamed)))
}

// ---
// 3. Provisionamento (operadores da plataforma)
// ---

// POST /api/provisioning/tenants
#[utoipa::path(
    post,
    path = "/api/provisioning/tenants",
    tag = "Provisioning",
    request_body = ProvisionTenantPayload,
    responses(
        (status = 201, description = "Loja criada", body = Tenant),
        (status = 403, description = "Chave de provisionamento inválida"),
        (status = 409, description = "Slug já existe")
    ),
    params(("x-provisioning-key" = String, Header, description = "Chave da plataforma"))
)]
pub async fn provision_tenant(
    State(app_state): State<AppState>,
    locale: Locale,
    headers: HeaderMap,
    Json(payload): Json<ProvisionTenantPayload>,
) -> Result<impl IntoResponse, ApiError> {
    provisioning_guard(&app_state, &headers)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let new_tenant = app_state
        .tenant_service
        .provision(&payload.slug, &payload.name)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(new_tenant))))
}

// DELETE /api/provisioning/tenants/{id}
#[utoipa::path(
    delete,
    path = "/api/provisioning/tenants/{id}",
    tag = "Provisioning",
    responses(
        (status = 200, description = "Loja desativada", body = Tenant),
        (status = 404, description = "Loja não encontrada")
    ),
    params(
        ("id" = uuid::Uuid, Path, description = "ID da Loja"),
        ("x-provisioning-key" = String, Header, description = "Chave da plataforma")
    )
)]
pub async fn deactivate_tenant(
    State(app_state): State<AppState>,
    locale: Locale,
    headers: HeaderMap,
    Path(ResourceId { id }): Path<ResourceId>,
) -> Result<impl IntoResponse, ApiError> {
    provisioning_guard(&app_state, &headers)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let tenant = app_state
        .tenant_service
        .deactivate(id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(tenant)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_key_hides_the_routes() {
        assert!(matches!(check_provisioning_key(None, Some("x")), Err(AppError::NotFound)));
    }

    #[test]
    fn wrong_or_missing_key_is_forbidden() {
        assert!(matches!(check_provisioning_key(Some("k"), None), Err(AppError::Forbidden)));
        assert!(matches!(check_provisioning_key(Some("k"), Some("j")), Err(AppError::Forbidden)));
        assert!(check_provisioning_key(Some("k"), Some("k")).is_ok());
    }
}
