// src/handlers/users.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    common::{db_utils::get_rls_connection, error::ApiError, response::ApiResponse},
    config::AppState,
    handlers::ResourceId,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermManageUsers, RequirePermission},
        tenancy::TenantContext,
    },
    models::auth::{Role, User},
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    /// ADMIN, EMPLOYEE ou CUSTOMER
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeRolePayload {
    pub role: Role,
}

// Handler da rota protegida /me
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Usuarios",
    responses((status = 200, description = "O usuário do token", body = User)),
    security(("api_jwt" = []))
)]
pub async fn get_me(AuthenticatedUser(user): AuthenticatedUser) -> Json<ApiResponse<User>> {
    Json(ApiResponse::ok(user))
}

// GET /api/users
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Usuarios",
    responses((status = 200, description = "Usuários da loja", body = [User])),
    params(UserListQuery),
    security(("api_jwt" = []))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _perm: RequirePermission<PermManageUsers>,
    Query(query): Query<UserListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let users = app_state
        .user_service
        .list_users(&mut *rls_conn, tenant.0, query.role)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(users)))
}

// PUT /api/users/{id}/role
#[utoipa::path(
    put,
    path = "/api/users/{id}/role",
    tag = "Usuarios",
    request_body = ChangeRolePayload,
    responses(
        (status = 200, description = "Papel alterado", body = User),
        (status = 404, description = "Usuário não encontrado"),
        (status = 409, description = "Não é possível alterar o próprio papel")
    ),
    params(("id" = uuid::Uuid, Path, description = "ID do Usuário")),
    security(("api_jwt" = []))
)]
pub async fn change_role(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _perm: RequirePermission<PermManageUsers>,
    Path(ResourceId { id }): Path<ResourceId>,
    Json(payload): Json<ChangeRolePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let updated = app_state
        .user_service
        .change_role(&mut *rls_conn, &user.0, id, payload.role)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(updated)))
}

// DELETE /api/users/{id}
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "Usuarios",
    responses(
        (status = 200, description = "Usuário desativado", body = User),
        (status = 409, description = "Não é possível desativar a si mesmo")
    ),
    params(("id" = uuid::Uuid, Path, description = "ID do Usuário")),
    security(("api_jwt" = []))
)]
pub async fn deactivate_user(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _perm: RequirePermission<PermManageUsers>,
    Path(ResourceId { id }): Path<ResourceId>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let updated = app_state
        .user_service
        .deactivate_user(&mut *rls_conn, &user.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(updated)))
}
