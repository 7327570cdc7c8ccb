use sqlx::{pool::PoolConnection, PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::config::AppState;
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::tenancy::TenantContext;
use crate::models::{
    auth::User,
    catalog::{Category, Product},
    notifications::Notification,
    orders::Order,
};

// ---
// Helper RLS: A "Chave" para o Banco de Dados
// ---
/// Adquire uma conexão da pool já presa à loja da requisição.
pub(crate) async fn get_rls_connection(
    app_state: &AppState,
    tenant_ctx: &TenantContext,
    user: &AuthenticatedUser,
) -> Result<PoolConnection<Postgres>, AppError> {
    scoped_connection(&app_state.db_pool, tenant_ctx.0, Some(user.0.id)).await
}

/// Define `app.tenant_id` / `app.user_id` na sessão. As políticas RLS das tabelas
/// escopadas só enxergam linhas dessa loja. A pool limpa as variáveis quando a
/// conexão volta (ver `reset_scope`).
pub async fn scoped_connection(
    pool: &PgPool,
    tenant_id: Uuid,
    user_id: Option<Uuid>,
) -> Result<PoolConnection<Postgres>, AppError> {
    let mut conn = pool.acquire().await?;

    sqlx::query("SELECT set_config('app.tenant_id', $1, false), set_config('app.user_id', $2, false)")
        .bind(tenant_id.to_string())
        .bind(user_id.map(|id| id.to_string()).unwrap_or_default())
        .execute(&mut *conn)
        .await?;

    Ok(conn)
}

/// Chamado pela pool no `after_release`: nenhuma conexão volta com escopo de loja.
pub async fn reset_scope(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT set_config('app.tenant_id', '', false), set_config('app.user_id', '', false)")
        .execute(conn)
        .await?;
    Ok(())
}

// ---
// Guarda de escopo para linhas buscadas por id
// ---
pub trait TenantScoped {
    fn tenant_id(&self) -> Uuid;
}

/// Só devolve a linha se ela pertence à loja de quem pediu. Linha de outra loja
/// vira "não encontrado", igual a uma linha inexistente.
pub fn ensure_same_tenant<T: TenantScoped>(row: Option<T>, tenant_id: Uuid) -> Option<T> {
    row.filter(|r| r.tenant_id() == tenant_id)
}

macro_rules! tenant_scoped {
    ($($ty:ty),+ $(,)?) => {
        $(impl TenantScoped for $ty {
            fn tenant_id(&self) -> Uuid {
                self.tenant_id
            }
        })+
    };
}

tenant_scoped!(User, Category, Product, Order, Notification);

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        tenant: Uuid,
    }

    impl TenantScoped for Row {
        fn tenant_id(&self) -> Uuid {
            self.tenant
        }
    }

    #[test]
    fn row_of_another_tenant_is_hidden() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(ensure_same_tenant(Some(Row { tenant: a }), a).is_some());
        assert!(ensure_same_tenant(Some(Row { tenant: b }), a).is_none());
        assert!(ensure_same_tenant::<Row>(None, a).is_none());
    }
}
