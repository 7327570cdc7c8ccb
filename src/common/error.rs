use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    common::i18n::I18nStore,
    middleware::i18n::Locale,
    models::{auth::Capability, orders::OrderStatus},
};

// O erro de domínio. Repositórios e serviços só conhecem este tipo;
// a tradução para HTTP acontece num único lugar (`to_api_error`).
#[derive(Debug, Error)]
pub enum AppError {
    // --- 400 ---
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Entrada inválida: {0}")]
    InvalidInput(String),

    #[error("Status de pedido desconhecido: {0}")]
    UnknownOrderStatus(String),

    #[error("Total informado {received} difere do calculado {expected}")]
    OrderTotalMismatch { expected: Decimal, received: Decimal },

    #[error("Preço do produto {product_id} difere do catálogo ({catalog_price})")]
    PriceMismatch { product_id: Uuid, catalog_price: Decimal },

    #[error("Cabeçalho de loja inválido")]
    InvalidTenantHeader,

    // --- 401 ---
    #[error("Token inválido")]
    InvalidToken,

    // --- 403 ---
    #[error("Permissão ausente: {0:?}")]
    PermissionDenied(Capability),

    #[error("O token não pertence à loja solicitada")]
    TenantMismatch,

    #[error("Loja inativa")]
    TenantInactive,

    #[error("Usuário inativo")]
    UserInactive,

    #[error("Ação não permitida")]
    Forbidden,

    // --- 404 ---
    #[error("Loja não encontrada: {0}")]
    TenantNotFound(String),

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Pedido não encontrado")]
    OrderNotFound,

    #[error("Produto não encontrado: {0}")]
    ProductNotFound(Uuid),

    #[error("Categoria não encontrada")]
    CategoryNotFound,

    #[error("Notificação não encontrada")]
    NotificationNotFound,

    #[error("Recurso não encontrado")]
    NotFound,

    // --- 409 ---
    #[error("Estoque insuficiente para {product}: disponível {available}, solicitado {requested}")]
    InsufficientStock { product: String, available: i32, requested: i32 },

    #[error("Pedido já finalizado ({0})")]
    OrderAlreadyFinalized(OrderStatus),

    #[error("Transição inválida de {from} para {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("Chave de idempotência já usada")]
    IdempotencyKeyReused,

    // Interno: outra requisição gravou a mesma chave primeiro.
    #[error("Chave de idempotência duplicada")]
    DuplicateIdempotencyKey,

    #[error("Slug já existe: {0}")]
    SlugAlreadyExists(String),

    #[error("Categoria já existe: {0}")]
    CategoryNameAlreadyExists(String),

    #[error("Código de barras já existe: {0}")]
    BarcodeAlreadyExists(String),

    #[error("Não é possível alterar o próprio usuário")]
    CannotModifySelf,

    // --- 500 ---
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidInput(_)
            | AppError::UnknownOrderStatus(_)
            | AppError::OrderTotalMismatch { .. }
            | AppError::PriceMismatch { .. }
            | AppError::InvalidTenantHeader => StatusCode::BAD_REQUEST,

            AppError::InvalidToken => StatusCode::UNAUTHORIZED,

            AppError::PermissionDenied(_)
            | AppError::TenantMismatch
            | AppError::TenantInactive
            | AppError::UserInactive
            | AppError::Forbidden => StatusCode::FORBIDDEN,

            AppError::TenantNotFound(_)
            | AppError::UserNotFound
            | AppError::OrderNotFound
            | AppError::ProductNotFound(_)
            | AppError::CategoryNotFound
            | AppError::NotificationNotFound
            | AppError::NotFound => StatusCode::NOT_FOUND,

            AppError::InsufficientStock { .. }
            | AppError::OrderAlreadyFinalized(_)
            | AppError::InvalidStatusTransition { .. }
            | AppError::IdempotencyKeyReused
            | AppError::DuplicateIdempotencyKey
            | AppError::SlugAlreadyExists(_)
            | AppError::CategoryNameAlreadyExists(_)
            | AppError::BarcodeAlreadyExists(_)
            | AppError::CannotModifySelf => StatusCode::CONFLICT,

            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Chave da mensagem no catálogo de traduções.
    pub fn message_key(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "error.validation",
            AppError::InvalidInput(_) => "error.invalid_input",
            AppError::UnknownOrderStatus(_) => "error.unknown_status",
            AppError::OrderTotalMismatch { .. } => "error.total_mismatch",
            AppError::PriceMismatch { .. } => "error.price_mismatch",
            AppError::InvalidTenantHeader => "error.invalid_tenant_header",
            AppError::InvalidToken => "error.invalid_token",
            AppError::PermissionDenied(_) => "error.permission_denied",
            AppError::TenantMismatch => "error.tenant_mismatch",
            AppError::TenantInactive => "error.tenant_inactive",
            AppError::UserInactive => "error.user_inactive",
            AppError::Forbidden => "error.forbidden",
            AppError::TenantNotFound(_) => "error.tenant_not_found",
            AppError::UserNotFound => "error.user_not_found",
            AppError::OrderNotFound => "error.order_not_found",
            AppError::ProductNotFound(_) => "error.product_not_found",
            AppError::CategoryNotFound => "error.category_not_found",
            AppError::NotificationNotFound => "error.notification_not_found",
            AppError::NotFound => "error.not_found",
            AppError::InsufficientStock { .. } => "error.insufficient_stock",
            AppError::OrderAlreadyFinalized(_) => "error.order_finalized",
            AppError::InvalidStatusTransition { .. } => "error.invalid_transition",
            AppError::IdempotencyKeyReused | AppError::DuplicateIdempotencyKey => {
                "error.idempotency_key_reused"
            }
            AppError::SlugAlreadyExists(_) => "error.slug_exists",
            AppError::CategoryNameAlreadyExists(_) => "error.category_exists",
            AppError::BarcodeAlreadyExists(_) => "error.barcode_exists",
            AppError::CannotModifySelf => "error.cannot_modify_self",
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => "error.internal",
        }
    }

    /// Valores interpolados na mensagem traduzida ({nome}).
    fn message_params(&self) -> Vec<(&'static str, String)> {
        match self {
            AppError::InvalidInput(detail) => vec![("detail", detail.clone())],
            AppError::UnknownOrderStatus(status) => vec![("status", status.clone())],
            AppError::OrderTotalMismatch { expected, received } => vec![
                ("expected", expected.to_string()),
                ("received", received.to_string()),
            ],
            AppError::PriceMismatch { product_id, catalog_price } => vec![
                ("product", product_id.to_string()),
                ("price", catalog_price.to_string()),
            ],
            AppError::PermissionDenied(cap) => vec![("capability", format!("{cap:?}"))],
            AppError::TenantNotFound(tenant) => vec![("tenant", tenant.clone())],
            AppError::ProductNotFound(id) => vec![("product", id.to_string())],
            AppError::InsufficientStock { product, available, requested } => vec![
                ("product", product.clone()),
                ("available", available.to_string()),
                ("requested", requested.to_string()),
            ],
            AppError::OrderAlreadyFinalized(status) => vec![("status", status.to_string())],
            AppError::InvalidStatusTransition { from, to } => {
                vec![("from", from.to_string()), ("to", to.to_string())]
            }
            AppError::SlugAlreadyExists(v)
            | AppError::CategoryNameAlreadyExists(v)
            | AppError::BarcodeAlreadyExists(v) => vec![("value", v.clone())],
            _ => Vec::new(),
        }
    }

    /// Converte o erro de domínio na resposta HTTP, já traduzida.
    pub fn to_api_error(self, locale: &Locale, store: &I18nStore) -> ApiError {
        let status = self.status();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            // O detalhe vai para o log, nunca para o cliente.
            tracing::error!("Erro Interno do Servidor: {:?}", self);
        }

        let message = store.translate(&locale.0, self.message_key(), &self.message_params());

        let details = match &self {
            AppError::ValidationError(errors) => {
                let mut fields = Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<Value> = field_errors
                        .iter()
                        .map(|e| {
                            let key = e.message.as_deref().unwrap_or(e.code.as_ref());
                            Value::String(store.translate(&locale.0, &format!("validation.{key}"), &[]))
                        })
                        .collect();
                    fields.insert(field.to_string(), Value::Array(messages));
                }
                Some(Value::Object(fields))
            }
            _ => None,
        };

        ApiError { status, message, details }
    }
}

/// Erros de unicidade do Postgres, identificados pelo nome da constraint.
pub fn unique_violation_constraint(e: &sqlx::Error) -> Option<String> {
    if let sqlx::Error::Database(db_err) = e {
        if db_err.is_unique_violation() {
            return Some(db_err.constraint().unwrap_or_default().to_string());
        }
    }
    None
}

// O erro já pronto para sair pela API
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "success": false,
            "message": self.message,
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> I18nStore {
        I18nStore::load().unwrap()
    }

    #[test]
    fn taxonomy_maps_to_http_status() {
        assert_eq!(AppError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::TenantMismatch.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::OrderNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::OrderAlreadyFinalized(OrderStatus::Completed).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::UnknownOrderStatus("X".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InsufficientStock { product: "Yerba".into(), available: 0, requested: 1 }.status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn database_errors_do_not_leak() {
        let err = AppError::DatabaseError(sqlx::Error::Protocol("relation \"orders\" is broken".into()));
        let api = err.to_api_error(&Locale("es".into()), &store());
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.message.contains("orders"));
    }

    #[test]
    fn messages_are_interpolated_and_localized() {
        let err = AppError::InsufficientStock { product: "Yerba".into(), available: 2, requested: 3 };
        let api = err.to_api_error(&Locale("en".into()), &store());
        assert!(api.message.contains("Yerba"));
        assert!(api.message.contains('2'));
        assert!(api.message.contains('3'));
    }

    #[test]
    fn validation_errors_carry_field_details() {
        let mut errors = validator::ValidationErrors::new();
        let mut e = validator::ValidationError::new("length");
        e.message = Some("required".into());
        errors.add("name", e);

        let api = AppError::ValidationError(errors).to_api_error(&Locale("es".into()), &store());
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        let details = api.details.unwrap();
        assert!(details.get("name").is_some());
    }
}
