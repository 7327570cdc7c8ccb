// src/models/tenancy.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ---
// Tenant (A "Loja")
// ---
// Raiz de todo o escopo: todas as outras tabelas carregam tenant_id.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    #[schema(example = "almacen-don-pepe")]
    pub slug: String,
    #[schema(example = "Almacén Don Pepe")]
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Slug: minúsculas, dígitos e hífens, sem hífen nas pontas, 2 a 63 caracteres.
pub fn is_valid_slug(s: &str) -> bool {
    let len = s.len();
    (2..=63).contains(&len)
        && s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !s.starts_with('-')
        && !s.ends_with('-')
        && !s.contains("--")
}

#[cfg(test)]
mod tests {
    use super::is_valid_slug;

    #[test]
    fn accepts_simple_slugs() {
        assert!(is_valid_slug("ferreteria-central"));
        assert!(is_valid_slug("tienda42"));
        assert!(is_valid_slug("ab"));
    }

    #[test]
    fn rejects_bad_slugs() {
        assert!(!is_valid_slug("a"));
        assert!(!is_valid_slug("-tienda"));
        assert!(!is_valid_slug("tienda-"));
        assert!(!is_valid_slug("Tienda"));
        assert!(!is_valid_slug("tienda--dos"));
        assert!(!is_valid_slug("tienda dos"));
        assert!(!is_valid_slug(&"a".repeat(64)));
    }
}
