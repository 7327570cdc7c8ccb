pub mod auth;
pub mod catalog_service;
pub mod dashboard_service;
pub mod notification_service;
pub mod order_service;
pub mod tenancy_service;
pub mod user_service;
