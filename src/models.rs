pub mod auth;
pub mod catalog;
pub mod dashboard;
pub mod notifications;
pub mod orders;
pub mod tenancy;
