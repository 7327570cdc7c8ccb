// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use crate::common::i18n::DEFAULT_LANG;

// Idiomas com catálogo em locales/
const SUPPORTED: &[&str] = &["es", "pt", "en"];

// Idioma da resposta, negociado pelo Accept-Language
#[derive(Debug, Clone)]
pub struct Locale(pub String);

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let lang = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .map(negotiate)
            .unwrap_or_else(|| DEFAULT_LANG.to_string());

        Ok(Locale(lang))
    }
}

/// Primeiro idioma suportado, em ordem de preferência. "pt-BR" -> "pt".
pub fn negotiate(header: &str) -> String {
    accept_language::parse(header)
        .iter()
        .filter_map(|tag| tag.split('-').next())
        .map(str::to_ascii_lowercase)
        .find(|lang| SUPPORTED.contains(&lang.as_str()))
        .unwrap_or_else(|| DEFAULT_LANG.to_string())
}

#[cfg(test)]
mod tests {
    use super::negotiate;

    #[test]
    fn picks_first_supported_language() {
        assert_eq!(negotiate("pt-BR,pt;q=0.9"), "pt");
        assert_eq!(negotiate("fr-FR, en;q=0.5"), "en");
        assert_eq!(negotiate("de"), "es");
        assert_eq!(negotiate(""), "es");
    }
}
