// src/handlers/catalog.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::{
        db_utils::{get_rls_connection, scoped_connection},
        error::{ApiError, AppError},
        response::ApiResponse,
    },
    config::AppState,
    handlers::ResourceId,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermAdjustStock, PermManageCatalog, RequirePermission},
        tenancy::TenantContext,
    },
    models::{
        auth::Capability,
        catalog::{
            AdjustStockPayload, Category, CreateCategoryPayload, CreateProductPayload, NewProduct,
            Product, ProductChanges, ProductFilter, StockLevel, UpdateCategoryPayload,
            UpdateProductPayload,
        },
        tenancy::Tenant,
    },
};

// =============================================================================
//  1. VITRINE PÚBLICA
// =============================================================================

// GET /api/catalogo/{slug}
#[utoipa::path(
    get,
    path = "/api/catalogo/{slug}",
    tag = "Catalogo",
    responses(
        (status = 200, description = "Dados públicos da loja", body = Tenant),
        (status = 404, description = "Loja inexistente ou inativa")
    ),
    params(("slug" = String, Path, description = "Slug da loja"))
)]
pub async fn get_storefront(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = app_state
        .tenant_service
        .storefront(&slug)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(tenant)))
}

// GET /api/catalogo/{slug}/productos
#[utoipa::path(
    get,
    path = "/api/catalogo/{slug}/productos",
    tag = "Catalogo",
    responses((status = 200, description = "Produtos ativos da loja", body = [Product])),
    params(("slug" = String, Path, description = "Slug da loja"), ProductFilter)
)]
pub async fn list_storefront_products(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(slug): Path<String>,
    Query(filter): Query<ProductFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = app_state
        .tenant_service
        .storefront(&slug)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    // Sem usuário: a conexão fica presa só à loja
    let mut conn = scoped_connection(&app_state.db_pool, tenant.id, None)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let products = app_state
        .catalog_service
        .list_storefront_products(&mut *conn, tenant.id, filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(products)))
}

// GET /api/catalogo/{slug}/categorias
#[utoipa::path(
    get,
    path = "/api/catalogo/{slug}/categorias",
    tag = "Catalogo",
    responses((status = 200, description = "Categorias ativas da loja", body = [Category])),
    params(("slug" = String, Path, description = "Slug da loja"))
)]
pub async fn list_storefront_categories(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = app_state
        .tenant_service
        .storefront(&slug)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut conn = scoped_connection(&app_state.db_pool, tenant.id, None)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let categories = app_state
        .catalog_service
        .list_storefront_categories(&mut *conn, tenant.id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(categories)))
}

// =============================================================================
//  2. PRODUTOS (painel)
// =============================================================================

// GET /api/productos
#[utoipa::path(
    get,
    path = "/api/productos",
    tag = "Productos",
    responses((status = 200, description = "Produtos da loja", body = [Product])),
    params(ProductFilter, ("x-tenant-id" = Option<uuid::Uuid>, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Query(mut filter): Query<ProductFilter>,
) -> Result<impl IntoResponse, ApiError> {
    // Inativos só para quem administra o catálogo
    if !user.0.role.can(Capability::ManageCatalog) {
        filter.include_inactive = false;
    }

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let products = app_state
        .catalog_service
        .list_products(&mut *rls_conn, tenant.0, &filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(products)))
}

// GET /api/productos/stock-bajo
#[utoipa::path(
    get,
    path = "/api/productos/stock-bajo",
    tag = "Productos",
    responses((status = 200, description = "Produtos com estoque <= mínimo", body = [Product])),
    security(("api_jwt" = []))
)]
pub async fn list_low_stock(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _perm: RequirePermission<PermAdjustStock>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let products = app_state
        .catalog_service
        .list_low_stock(&mut *rls_conn, tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(products)))
}

// GET /api/productos/{id}
#[utoipa::path(
    get,
    path = "/api/productos/{id}",
    tag = "Productos",
    responses(
        (status = 200, description = "Produto", body = Product),
        (status = 404, description = "Produto não encontrado")
    ),
    params(("id" = uuid::Uuid, Path, description = "ID do Produto")),
    security(("api_jwt" = []))
)]
pub async fn get_product(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(ResourceId { id }): Path<ResourceId>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let product = app_state
        .catalog_service
        .get_product(&mut *rls_conn, tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(product)))
}

// POST /api/productos
#[utoipa::path(
    post,
    path = "/api/productos",
    tag = "Productos",
    request_body = CreateProductPayload,
    responses(
        (status = 201, description = "Produto criado", body = Product),
        (status = 409, description = "Código de barras já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _perm: RequirePermission<PermManageCatalog>,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let product = app_state
        .catalog_service
        .create_product(&mut *rls_conn, tenant.0, &NewProduct::from(payload))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(product))))
}

// PUT /api/productos/{id}
#[utoipa::path(
    put,
    path = "/api/productos/{id}",
    tag = "Productos",
    request_body = UpdateProductPayload,
    responses((status = 200, description = "Produto atualizado", body = Product)),
    params(("id" = uuid::Uuid, Path, description = "ID do Produto")),
    security(("api_jwt" = []))
)]
pub async fn update_product(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _perm: RequirePermission<PermManageCatalog>,
    Path(ResourceId { id }): Path<ResourceId>,
    Json(payload): Json<UpdateProductPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let product = app_state
        .catalog_service
        .update_product(&mut *rls_conn, tenant.0, id, &ProductChanges::from(payload))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(product)))
}

// DELETE /api/productos/{id}
#[utoipa::path(
    delete,
    path = "/api/productos/{id}",
    tag = "Productos",
    responses((status = 200, description = "Produto desativado", body = Product)),
    params(("id" = uuid::Uuid, Path, description = "ID do Produto")),
    security(("api_jwt" = []))
)]
pub async fn deactivate_product(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _perm: RequirePermission<PermManageCatalog>,
    Path(ResourceId { id }): Path<ResourceId>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let product = app_state
        .catalog_service
        .deactivate_product(&mut *rls_conn, tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(product)))
}

// POST /api/productos/{id}/stock
#[utoipa::path(
    post,
    path = "/api/productos/{id}/stock",
    tag = "Productos",
    request_body = AdjustStockPayload,
    responses(
        (status = 200, description = "Estoque ajustado", body = StockLevel),
        (status = 409, description = "O ajuste deixaria o estoque negativo")
    ),
    params(("id" = uuid::Uuid, Path, description = "ID do Produto")),
    security(("api_jwt" = []))
)]
pub async fn adjust_stock(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _perm: RequirePermission<PermAdjustStock>,
    Path(ResourceId { id }): Path<ResourceId>,
    Json(payload): Json<AdjustStockPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let level = app_state
        .catalog_service
        .adjust_stock(&mut *rls_conn, tenant.0, id, payload.delta, payload.reason.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(level)))
}

// =============================================================================
//  3. CATEGORIAS (painel)
// =============================================================================

// GET /api/categorias
#[utoipa::path(
    get,
    path = "/api/categorias",
    tag = "Categorias",
    responses((status = 200, description = "Todas as categorias da loja", body = [Category])),
    security(("api_jwt" = []))
)]
pub async fn list_categories(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let categories = if user.0.role.can(Capability::ManageCatalog) {
        app_state.catalog_service.list_categories(&mut *rls_conn, tenant.0).await
    } else {
        app_state.catalog_service.list_storefront_categories(&mut *rls_conn, tenant.0).await
    }
    .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(categories)))
}

// POST /api/categorias
#[utoipa::path(
    post,
    path = "/api/categorias",
    tag = "Categorias",
    request_body = CreateCategoryPayload,
    responses(
        (status = 201, description = "Categoria criada", body = Category),
        (status = 409, description = "Nome já usado na loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_category(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _perm: RequirePermission<PermManageCatalog>,
    Json(payload): Json<CreateCategoryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let category = app_state
        .catalog_service
        .create_category(&mut *rls_conn, tenant.0, &payload.name, payload.description.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(category))))
}

// PUT /api/categorias/{id}
#[utoipa::path(
    put,
    path = "/api/categorias/{id}",
    tag = "Categorias",
    request_body = UpdateCategoryPayload,
    responses((status = 200, description = "Categoria atualizada", body = Category)),
    params(("id" = uuid::Uuid, Path, description = "ID da Categoria")),
    security(("api_jwt" = []))
)]
pub async fn update_category(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _perm: RequirePermission<PermManageCatalog>,
    Path(ResourceId { id }): Path<ResourceId>,
    Json(payload): Json<UpdateCategoryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let category = app_state
        .catalog_service
        .update_category(
            &mut *rls_conn,
            tenant.0,
            id,
            payload.name.as_deref(),
            payload.description.as_deref(),
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(category)))
}

// DELETE /api/categorias/{id}
#[utoipa::path(
    delete,
    path = "/api/categorias/{id}",
    tag = "Categorias",
    responses((status = 200, description = "Categoria desativada", body = Category)),
    params(("id" = uuid::Uuid, Path, description = "ID da Categoria")),
    security(("api_jwt" = []))
)]
pub async fn deactivate_category(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _perm: RequirePermission<PermManageCatalog>,
    Path(ResourceId { id }): Path<ResourceId>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let category = app_state
        .catalog_service
        .deactivate_category(&mut *rls_conn, tenant.0, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(category)))
}
