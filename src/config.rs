// src/config.rs

use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::{db_utils::reset_scope, i18n::I18nStore},
    db::{
        CatalogRepository, DashboardRepository, NotificationRepository, OrdersRepository,
        TenantRepository, UserRepository,
    },
    services::{
        auth::AuthService, catalog_service::CatalogService, dashboard_service::DashboardService,
        notification_service::NotificationService, order_service::OrderService,
        tenancy_service::TenantService, user_service::UserService,
    },
};

const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 3;

// Configuração lida do ambiente (.env em desenvolvimento)
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: SocketAddr,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    /// Sem chave, as rotas de provisionamento respondem 404.
    pub provisioning_key: Option<String>,
    pub cors_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{key} deve ser definida"))
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let server_addr = optional("SERVER_ADDR")
            .unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string())
            .parse()
            .context("SERVER_ADDR inválido")?;

        let db_max_connections = match optional("DB_MAX_CONNECTIONS") {
            Some(v) => v.parse().context("DB_MAX_CONNECTIONS inválido")?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let acquire_secs = match optional("DB_ACQUIRE_TIMEOUT_SECS") {
            Some(v) => v.parse().context("DB_ACQUIRE_TIMEOUT_SECS inválido")?,
            None => DEFAULT_ACQUIRE_TIMEOUT_SECS,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            server_addr,
            db_max_connections,
            db_acquire_timeout: Duration::from_secs(acquire_secs),
            provisioning_key: optional("PROVISIONING_KEY"),
            cors_origin: optional("CORS_ORIGIN"),
        })
    }
}

/// Pool com limpeza de escopo: toda conexão devolvida perde `app.tenant_id`.
pub async fn connect_pool(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(config.db_acquire_timeout)
        .after_release(|conn, _meta| {
            Box::pin(async move {
                match reset_scope(conn).await {
                    Ok(()) => Ok(true),
                    Err(e) => {
                        // Descarta a conexão em vez de devolvê-la com escopo de outra loja
                        tracing::warn!("Falha ao limpar escopo da conexão: {:?}", e);
                        Ok(false)
                    }
                }
            })
        })
        .connect(&config.database_url)
        .await
        .context("Falha ao conectar ao banco de dados")?;

    Ok(pool)
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
    pub i18n_store: Arc<I18nStore>,
    pub auth_service: AuthService,
    pub tenant_service: TenantService,
    pub user_service: UserService,
    pub catalog_service: CatalogService,
    pub order_service: OrderService,
    pub notification_service: NotificationService,
    pub dashboard_service: DashboardService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let db_pool = connect_pool(&config).await?;
        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
        Self::build(db_pool, config)
    }

    // --- Monta o gráfico de dependências ---
    pub fn build(db_pool: PgPool, config: Config) -> anyhow::Result<Self> {
        let i18n_store = Arc::new(I18nStore::load()?);

        let user_repo = UserRepository::new();
        let tenant_repo = TenantRepository::new(db_pool.clone());
        let catalog_repo = CatalogRepository::new();
        let orders_repo = OrdersRepository::new();
        let notification_repo = NotificationRepository::new();

        let auth_service = AuthService::new(
            user_repo.clone(),
            tenant_repo.clone(),
            config.jwt_secret.clone(),
            db_pool.clone(),
        );
        let tenant_service = TenantService::new(tenant_repo, db_pool.clone());
        let user_service = UserService::new(user_repo.clone());
        let catalog_service = CatalogService::new(catalog_repo.clone());
        let order_service = OrderService::new(
            orders_repo,
            catalog_repo,
            user_repo,
            notification_repo.clone(),
            i18n_store.clone(),
        );
        let notification_service = NotificationService::new(notification_repo);
        let dashboard_service = DashboardService::new(DashboardRepository::new());

        Ok(Self {
            db_pool,
            config: Arc::new(config),
            i18n_store,
            auth_service,
            tenant_service,
            user_service,
            catalog_service,
            order_service,
            notification_service,
            dashboard_service,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_to_optional_values() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/smartpyme"),
            ("JWT_SECRET", "s3cr3t"),
        ]))
        .unwrap();

        assert_eq!(config.server_addr.to_string(), DEFAULT_SERVER_ADDR);
        assert_eq!(config.db_max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.db_acquire_timeout, Duration::from_secs(3));
        assert!(config.provisioning_key.is_none());
    }

    #[test]
    fn required_values_must_be_present() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://x")])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn invalid_numbers_are_startup_errors() {
        let result = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "s"),
            ("DB_MAX_CONNECTIONS", "muitas"),
        ]));
        assert!(result.is_err());
    }
}
