// src/handlers.rs

use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::common::response::ApiResponse;

pub mod catalog;
pub mod dashboard;
pub mod notifications;
pub mod orders;
pub mod tenancy;
pub mod users;

// Rotas aninhadas em /api/tienda/{slug} trazem dois parâmetros;
// a struct pega só o {id} e ignora o slug.
#[derive(Debug, Deserialize)]
pub struct ResourceId {
    pub id: Uuid,
}

// GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses((status = 200, description = "Servidor no ar"))
)]
pub async fn health() -> Json<ApiResponse<()>> {
    Json(ApiResponse::message("OK"))
}
