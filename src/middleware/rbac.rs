// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::Capability,
};

/// 1. O Trait que define o que é uma Permissão
pub trait PermissionDef: Send + Sync + 'static {
    fn capability() -> Capability;
}

/// 2. O Extractor (Guardião)
pub struct RequirePermission<T>(pub PhantomData<T>);

// 3. A checagem é só a tabela do papel: nada de banco
impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        let required = T::capability();

        if user.0.role.can(required) {
            return Ok(RequirePermission(PhantomData));
        }

        tracing::warn!(user_id = %user.0.id, role = ?user.0.role, capability = ?required, "Permissão negada");

        let app_state = AppState::from_ref(state);
        let Ok(locale) = Locale::from_request_parts(parts, state).await;
        Err(AppError::PermissionDenied(required).to_api_error(&locale, &app_state.i18n_store))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

macro_rules! permission {
    ($($name:ident => $cap:ident),+ $(,)?) => {
        $(
            pub struct $name;
            impl PermissionDef for $name {
                fn capability() -> Capability { Capability::$cap }
            }
        )+
    };
}

permission! {
    PermManageCatalog => ManageCatalog,
    PermAdjustStock => AdjustStock,
    PermPlaceOrder => PlaceOrder,
    PermViewDashboard => ViewDashboard,
    PermManageUsers => ManageUsers,
    PermManageTenant => ManageTenant,
    PermReadNotifications => ReadNotifications,
}
