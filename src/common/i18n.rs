// src/common/i18n.rs

use std::collections::HashMap;

use anyhow::Context;

pub const DEFAULT_LANG: &str = "es";

// Catálogos embutidos no binário (locales/*.json)
const CATALOGS: &[(&str, &str)] = &[
    ("es", include_str!("../../locales/es.json")),
    ("pt", include_str!("../../locales/pt.json")),
    ("en", include_str!("../../locales/en.json")),
];

/// Mensagens traduzidas, indexadas por idioma e chave.
#[derive(Debug, Clone)]
pub struct I18nStore {
    catalogs: HashMap<String, HashMap<String, String>>,
}

impl I18nStore {
    pub fn load() -> anyhow::Result<Self> {
        let mut catalogs = HashMap::new();
        for (lang, raw) in CATALOGS {
            let messages: HashMap<String, String> = serde_json::from_str(raw)
                .with_context(|| format!("catálogo de idioma inválido: {lang}"))?;
            catalogs.insert(lang.to_string(), messages);
        }
        Ok(Self { catalogs })
    }

    pub fn supports(&self, lang: &str) -> bool {
        self.catalogs.contains_key(lang)
    }

    /// Busca no idioma pedido, depois no padrão; se nada achar devolve a própria chave.
    pub fn translate(&self, lang: &str, key: &str, params: &[(&str, String)]) -> String {
        let template = self
            .lookup(lang, key)
            .or_else(|| self.lookup(DEFAULT_LANG, key))
            .unwrap_or(key);

        params.iter().fold(template.to_string(), |acc, (name, value)| {
            acc.replace(&format!("{{{name}}}"), value)
        })
    }

    fn lookup(&self, lang: &str, key: &str) -> Option<&str> {
        self.catalogs.get(lang)?.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_catalogs_have_the_same_keys() {
        let store = I18nStore::load().unwrap();
        let base = &store.catalogs[DEFAULT_LANG];
        for (lang, catalog) in &store.catalogs {
            for key in base.keys() {
                assert!(catalog.contains_key(key), "{lang} sem a chave {key}");
            }
        }
    }

    #[test]
    fn falls_back_to_default_language_then_key() {
        let store = I18nStore::load().unwrap();
        let es = store.translate("es", "error.order_not_found", &[]);
        assert_eq!(store.translate("fr", "error.order_not_found", &[]), es);
        assert_eq!(store.translate("es", "no.existe", &[]), "no.existe");
    }

    #[test]
    fn interpolates_params() {
        let store = I18nStore::load().unwrap();
        let msg = store.translate("es", "error.tenant_not_found", &[("tenant", "mi-tienda".into())]);
        assert!(msg.contains("mi-tienda"));
    }
}
