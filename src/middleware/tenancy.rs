// src/middleware/tenancy.rs

use axum::{
    extract::{FromRef, FromRequestParts, RawPathParams, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::tenancy::is_valid_slug,
};

// Cabeçalhos aceitos para indicar a loja
pub const TENANT_ID_HEADER: &str = "x-tenant-id";
pub const TENANT_SLUG_HEADER: &str = "x-tenant-slug";

// Nome do parâmetro de rota em /api/tienda/{slug}/...
const SLUG_PARAM: &str = "slug";

// A loja já conferida contra o token. Só existe depois do tenant_guard.
#[derive(Debug, Clone, Copy)]
pub struct TenantContext(pub Uuid);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestedTenant {
    Id(Uuid),
    Slug(String),
}

/// Qual loja a requisição pede: slug na URL, depois x-tenant-id, depois x-tenant-slug.
/// `None` quando nada foi informado (vale a loja do token).
pub fn requested_tenant(
    headers: &HeaderMap,
    path_slug: Option<&str>,
) -> Result<Option<RequestedTenant>, AppError> {
    if let Some(slug) = path_slug {
        return Ok(Some(RequestedTenant::Slug(slug.to_string())));
    }

    if let Some(value) = headers.get(TENANT_ID_HEADER) {
        let id = value
            .to_str()
            .ok()
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .ok_or(AppError::InvalidTenantHeader)?;
        return Ok(Some(RequestedTenant::Id(id)));
    }

    if let Some(value) = headers.get(TENANT_SLUG_HEADER) {
        let slug = value
            .to_str()
            .ok()
            .map(str::trim)
            .filter(|s| is_valid_slug(s))
            .ok_or(AppError::InvalidTenantHeader)?;
        return Ok(Some(RequestedTenant::Slug(slug.to_string())));
    }

    Ok(None)
}

/// A loja pedida precisa ser a do token.
pub fn check_tenant(principal: Uuid, requested: Option<Uuid>) -> Result<Uuid, AppError> {
    match requested {
        Some(id) if id != principal => Err(AppError::TenantMismatch),
        _ => Ok(principal),
    }
}

// Roda depois do auth_guard (route_layer), para enxergar o {slug} da rota.
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    path: Result<RawPathParams, axum::extract::rejection::RawPathParamsRejection>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .cloned()
        .ok_or_else(|| to_api(AppError::InvalidToken))?;

    let path_slug = path.ok().and_then(|params| {
        params
            .iter()
            .find(|(name, _)| *name == SLUG_PARAM)
            .map(|(_, value)| value.to_string())
    });

    let requested = requested_tenant(request.headers(), path_slug.as_deref()).map_err(to_api)?;

    let requested_id = match requested {
        None => None,
        Some(RequestedTenant::Id(id)) => Some(id),
        Some(RequestedTenant::Slug(slug)) => Some(
            app_state
                .tenant_service
                .resolve_slug(&slug)
                .await
                .map_err(to_api)?
                .id,
        ),
    };

    let tenant_id = check_tenant(user.0.tenant_id, requested_id).map_err(|e| {
        tracing::warn!(user_id = %user.0.id, token_tenant = %user.0.tenant_id, "Acesso a outra loja negado");
        to_api(e)
    })?;

    request.extensions_mut().insert(TenantContext(tenant_id));
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ctx) = parts.extensions.get::<TenantContext>() {
            return Ok(*ctx);
        }

        let app_state = AppState::from_ref(state);
        let Ok(locale) = Locale::from_request_parts(parts, state).await;
        Err(AppError::InvalidTenantHeader.to_api_error(&locale, &app_state.i18n_store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn path_slug_wins_over_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        let requested = requested_tenant(&headers, Some("almacen")).unwrap();
        assert_eq!(requested, Some(RequestedTenant::Slug("almacen".into())));
    }

    #[test]
    fn tenant_id_header_before_slug_header() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        headers.insert(TENANT_SLUG_HEADER, HeaderValue::from_static("almacen"));
        assert_eq!(requested_tenant(&headers, None).unwrap(), Some(RequestedTenant::Id(id)));

        let mut headers = HeaderMap::new();
        headers.insert(TENANT_SLUG_HEADER, HeaderValue::from_static("almacen"));
        assert_eq!(
            requested_tenant(&headers, None).unwrap(),
            Some(RequestedTenant::Slug("almacen".into()))
        );
    }

    #[test]
    fn invalid_headers_are_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_ID_HEADER, HeaderValue::from_static("123"));
        assert!(matches!(requested_tenant(&headers, None), Err(AppError::InvalidTenantHeader)));

        let mut headers = HeaderMap::new();
        headers.insert(TENANT_SLUG_HEADER, HeaderValue::from_static("No Slug"));
        assert!(matches!(requested_tenant(&headers, None), Err(AppError::InvalidTenantHeader)));
    }

    #[test]
    fn nothing_requested_means_token_tenant() {
        assert_eq!(requested_tenant(&HeaderMap::new(), None).unwrap(), None);
        let principal = Uuid::new_v4();
        assert_eq!(check_tenant(principal, None).unwrap(), principal);
        assert_eq!(check_tenant(principal, Some(principal)).unwrap(), principal);
    }

    #[test]
    fn another_tenant_is_forbidden() {
        let err = check_tenant(Uuid::new_v4(), Some(Uuid::new_v4())).unwrap_err();
        assert!(matches!(err, AppError::TenantMismatch));
    }
}
