// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// ---
// Papel do usuário (substitui os antigos 1/2/3)
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")] // Banco
#[serde(rename_all = "SCREAMING_SNAKE_CASE")] // JSON
pub enum Role {
    Admin,
    Employee,
    Customer,
}

/// Ações que um papel pode executar dentro da sua loja.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    ViewCatalog,
    ManageCatalog,
    AdjustStock,
    PlaceOrder,
    ViewAllOrders,
    ChangeOrderStatus,
    CancelOwnOrder,
    ViewDashboard,
    ManageUsers,
    ManageTenant,
    ReadNotifications,
}

const ADMIN_CAPABILITIES: &[Capability] = &[
    Capability::ViewCatalog,
    Capability::ManageCatalog,
    Capability::AdjustStock,
    Capability::PlaceOrder,
    Capability::ViewAllOrders,
    Capability::ChangeOrderStatus,
    Capability::CancelOwnOrder,
    Capability::ViewDashboard,
    Capability::ManageUsers,
    Capability::ManageTenant,
    Capability::ReadNotifications,
];

const EMPLOYEE_CAPABILITIES: &[Capability] = &[
    Capability::ViewCatalog,
    Capability::AdjustStock,
    Capability::PlaceOrder,
    Capability::ViewAllOrders,
    Capability::ChangeOrderStatus,
    Capability::CancelOwnOrder,
    Capability::ViewDashboard,
    Capability::ReadNotifications,
];

const CUSTOMER_CAPABILITIES: &[Capability] = &[
    Capability::ViewCatalog,
    Capability::PlaceOrder,
    Capability::CancelOwnOrder,
    Capability::ReadNotifications,
];

impl Role {
    /// A tabela de permissões de cada papel.
    pub fn capabilities(self) -> &'static [Capability] {
        match self {
            Role::Admin => ADMIN_CAPABILITIES,
            Role::Employee => EMPLOYEE_CAPABILITIES,
            Role::Customer => CUSTOMER_CAPABILITIES,
        }
    }

    pub fn can(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Admin e funcionário operam a loja; cliente só compra.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Admin | Role::Employee)
    }
}

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub password_hash: String,

    pub full_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Estrutura de dados ("claims") dentro do JWT emitido pelo serviço de identidade
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,       // Subject (ID do usuário)
    pub tenant_id: Uuid, // Loja à qual o token pertence
    pub exp: usize,      // Expiration time
    pub iat: usize,      // Issued At
}
