// src/services/dashboard_service.rs

use sqlx::{Acquire, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::DashboardRepository,
    models::dashboard::DashboardMetrics,
};

#[derive(Clone)]
pub struct DashboardService {
    repo: DashboardRepository,
}

impl DashboardService {
    pub fn new(repo: DashboardRepository) -> Self {
        Self { repo }
    }

    pub async fn get_metrics<'a, A>(&self, executor: A, tenant_id: Uuid) -> Result<DashboardMetrics, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        self.repo.get_metrics(executor, tenant_id).await
    }
}
