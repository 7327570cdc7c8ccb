// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,

        // --- Vitrine pública ---
        handlers::catalog::get_storefront,
        handlers::catalog::list_storefront_products,
        handlers::catalog::list_storefront_categories,

        // --- Produtos ---
        handlers::catalog::list_products,
        handlers::catalog::list_low_stock,
        handlers::catalog::get_product,
        handlers::catalog::create_product,
        handlers::catalog::update_product,
        handlers::catalog::deactivate_product,
        handlers::catalog::adjust_stock,

        // --- Categorias ---
        handlers::catalog::list_categories,
        handlers::catalog::create_category,
        handlers::catalog::update_category,
        handlers::catalog::deactivate_category,

        // --- Pedidos ---
        handlers::orders::create_order,
        handlers::orders::list_orders,
        handlers::orders::list_statuses,
        handlers::orders::get_order_detail,
        handlers::orders::change_status,
        handlers::orders::cancel_order,

        // --- Notificações ---
        handlers::notifications::list_notifications,
        handlers::notifications::unread_count,
        handlers::notifications::mark_read,
        handlers::notifications::mark_all_read,

        // --- Dashboard ---
        handlers::dashboard::get_metrics,

        // --- Usuários ---
        handlers::users::get_me,
        handlers::users::list_users,
        handlers::users::change_role,
        handlers::users::deactivate_user,

        // --- Loja ---
        handlers::tenancy::get_tenant,
        handlers::tenancy::rename_tenant,
        handlers::tenancy::provision_tenant,
        handlers::tenancy::deactivate_tenant,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::Role,
            models::auth::Capability,
            models::auth::User,
            handlers::users::ChangeRolePayload,

            // --- Tenancy ---
            models::tenancy::Tenant,
            handlers::tenancy::RenameTenantPayload,
            handlers::tenancy::ProvisionTenantPayload,

            // --- Catálogo ---
            models::catalog::Category,
            models::catalog::Product,
            models::catalog::StockLevel,
            models::catalog::CreateCategoryPayload,
            models::catalog::UpdateCategoryPayload,
            models::catalog::CreateProductPayload,
            models::catalog::UpdateProductPayload,
            models::catalog::AdjustStockPayload,

            // --- Pedidos ---
            models::orders::OrderStatus,
            models::orders::OrderStatusInfo,
            models::orders::Order,
            models::orders::OrderItem,
            models::orders::OrderStatusHistory,
            models::orders::OrderSummary,
            models::orders::OrderDetail,
            models::orders::OrderLinePayload,
            models::orders::CreateOrderPayload,
            models::orders::ChangeStatusPayload,
            models::orders::CancelOrderPayload,

            // --- Notificações ---
            models::notifications::Notification,
            models::notifications::UnreadCount,

            // --- Dashboard ---
            models::dashboard::DashboardMetrics,
            models::dashboard::StatusCount,
            models::dashboard::TopProductEntry,
        )
    ),
    tags(
        (name = "Health", description = "Verificação do servidor"),
        (name = "Catalogo", description = "Vitrine pública da loja"),
        (name = "Productos", description = "Produtos e estoque"),
        (name = "Categorias", description = "Categorias do catálogo"),
        (name = "Pedidos", description = "Criação, consulta e ciclo de vida dos pedidos"),
        (name = "Notificaciones", description = "Avisos internos do usuário"),
        (name = "Dashboard", description = "Indicadores da loja"),
        (name = "Usuarios", description = "Usuários e papéis"),
        (name = "Tienda", description = "Dados da loja do token"),
        (name = "Provisioning", description = "Criação e desativação de lojas (plataforma)")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_order_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/pedidos"));
        assert!(doc.paths.paths.contains_key("/api/pedidos/{id}/cambiar-estado"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_jwt"));
    }

    #[test]
    fn path_ids_are_documented_as_uuids() {
        let doc = serde_json::to_value(ApiDoc::openapi()).expect("json");
        let params = &doc["paths"]["/api/pedidos/{id}/detalle"]["get"]["parameters"];
        let id = params
            .as_array()
            .and_then(|ps| ps.iter().find(|p| p["name"] == "id"))
            .expect("id param");
        assert_eq!(id["in"], "path");
        assert_eq!(id["schema"]["format"], "uuid");
    }
}
