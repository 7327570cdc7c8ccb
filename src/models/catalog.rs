// src/models/catalog.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// --- Categorias ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Bebidas")]
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Produtos ---
// O estoque vive no próprio produto (uma loja = um depósito).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub category_id: Option<Uuid>,
    #[schema(example = "Yerba Mate 1kg")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "7790387000152")]
    pub barcode: Option<String>,
    #[schema(example = "1000.00")]
    pub price: Decimal,
    #[schema(example = 25)]
    pub stock: i32,
    #[schema(example = 5)]
    pub min_stock: i32,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }
}

/// Filtros da vitrine e da listagem do painel.
#[derive(Debug, Default, Clone, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    /// Busca por nome ou código de barras
    pub search: Option<String>,
    /// Inclui produtos desativados (só no painel)
    #[serde(default)]
    pub include_inactive: bool,
}

/// Dados de um produto novo, já validados.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub barcode: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub min_stock: i32,
    pub image_url: Option<String>,
}

/// Alteração parcial: `None` mantém o valor atual.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub category_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub barcode: Option<String>,
    pub price: Option<Decimal>,
    pub min_stock: Option<i32>,
    pub image_url: Option<String>,
}

// Limites de entrada. Os valores monetários são NUMERIC(12,2) no banco.
pub const MAX_STOCK: i32 = 1_000_000_000;
pub const MAX_LINE_QUANTITY: i32 = 1_000_000;
pub const MAX_STOCK_DELTA: i32 = 1_000_000;

/// 9.999.999.999,99
pub fn max_money() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

/// Validador compartilhado para valores monetários.
pub fn not_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("not_negative"));
    }
    if *value > max_money() {
        return Err(ValidationError::new("too_large"));
    }
    Ok(())
}

// =============================================================================
//  ENTRADA (painel)
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryPayload {
    #[validate(length(min = 1, max = 100, message = "required"))]
    #[schema(example = "Bebidas")]
    pub name: String,
    #[validate(length(max = 500, message = "too_long"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryPayload {
    #[validate(length(min = 1, max = 100, message = "required"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "too_long"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200, message = "required"))]
    #[schema(example = "Yerba Mate 1kg")]
    pub name: String,
    #[validate(length(max = 2000, message = "too_long"))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 64, message = "length"))]
    pub barcode: Option<String>,
    #[validate(custom(function = "not_negative"))]
    #[schema(example = "1000.00")]
    pub price: Decimal,
    #[validate(range(min = 0, max = 1_000_000_000, message = "range"))]
    #[serde(default)]
    pub stock: i32,
    #[validate(range(min = 0, max = 1_000_000_000, message = "range"))]
    #[serde(default)]
    pub min_stock: i32,
    #[validate(length(max = 500, message = "too_long"))]
    pub image_url: Option<String>,
}

impl From<CreateProductPayload> for NewProduct {
    fn from(p: CreateProductPayload) -> Self {
        Self {
            category_id: p.category_id,
            name: p.name.trim().to_string(),
            description: p.description,
            barcode: p.barcode,
            price: p.price,
            stock: p.stock,
            min_stock: p.min_stock,
            image_url: p.image_url,
        }
    }
}

/// Estoque não muda por aqui: use o ajuste de estoque.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductPayload {
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200, message = "required"))]
    pub name: Option<String>,
    #[validate(length(max = 2000, message = "too_long"))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 64, message = "length"))]
    pub barcode: Option<String>,
    #[validate(custom(function = "not_negative"))]
    pub price: Option<Decimal>,
    #[validate(range(min = 0, max = 1_000_000_000, message = "range"))]
    pub min_stock: Option<i32>,
    #[validate(length(max = 500, message = "too_long"))]
    pub image_url: Option<String>,
}

impl From<UpdateProductPayload> for ProductChanges {
    fn from(p: UpdateProductPayload) -> Self {
        Self {
            category_id: p.category_id,
            name: p.name.map(|n| n.trim().to_string()),
            description: p.description,
            barcode: p.barcode,
            price: p.price,
            min_stock: p.min_stock,
            image_url: p.image_url,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockPayload {
    /// Positivo repõe, negativo baixa (perda, quebra, inventário).
    #[validate(range(min = -1_000_000, max = 1_000_000, message = "range"))]
    #[schema(example = 10)]
    pub delta: i32,
    #[validate(length(max = 500, message = "too_long"))]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    pub product_id: Uuid,
    pub stock: i32,
    pub low_stock: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn negative_money_is_rejected() {
        assert!(not_negative(&dec!(0)).is_ok());
        assert!(not_negative(&dec!(10.50)).is_ok());
        assert!(not_negative(&dec!(-0.01)).is_err());
        assert!(not_negative(&dec!(9999999999.99)).is_ok());
        assert!(not_negative(&dec!(10000000000)).is_err());
        assert!(not_negative(&Decimal::MAX).is_err());
    }

    #[test]
    fn product_payload_is_validated() {
        let payload = CreateProductPayload {
            category_id: None,
            name: "".into(),
            description: None,
            barcode: None,
            price: dec!(-1),
            stock: -2,
            min_stock: 0,
            image_url: None,
        };
        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("price"));
        assert!(fields.contains_key("stock"));
    }

    #[test]
    fn stock_and_adjustments_are_bounded() {
        let payload = CreateProductPayload {
            category_id: None,
            name: "Arroz 1kg".into(),
            description: None,
            barcode: None,
            price: dec!(800),
            stock: i32::MAX,
            min_stock: 0,
            image_url: None,
        };
        assert!(payload.validate().unwrap_err().field_errors().contains_key("stock"));

        let adjust = AdjustStockPayload { delta: i32::MAX, reason: None };
        assert!(adjust.validate().unwrap_err().field_errors().contains_key("delta"));

        let adjust = AdjustStockPayload { delta: -MAX_STOCK_DELTA, reason: None };
        assert!(adjust.validate().is_ok());
    }
}
