// src/services/catalog_service.rs

use sqlx::{Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::ensure_same_tenant, error::AppError},
    db::CatalogRepository,
    models::catalog::{
        Category, NewProduct, Product, ProductChanges, ProductFilter, StockLevel, MAX_STOCK,
        MAX_STOCK_DELTA,
    },
};

#[derive(Clone)]
pub struct CatalogService {
    repo: CatalogRepository,
}

impl CatalogService {
    pub fn new(repo: CatalogRepository) -> Self {
        Self { repo }
    }

    // --- VITRINE (pública) ---

    /// Só produtos ativos, independente do filtro recebido.
    pub async fn list_storefront_products<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        mut filter: ProductFilter,
    ) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        filter.include_inactive = false;
        self.repo.list_products(executor, tenant_id, &filter).await
    }

    pub async fn list_storefront_categories<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<Vec<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list_categories(executor, tenant_id, false).await
    }

    // --- CATEGORIAS ---

    pub async fn list_categories<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<Vec<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list_categories(executor, tenant_id, true).await
    }

    pub async fn create_category<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Category, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let category = self.repo.create_category(executor, tenant_id, name.trim(), description).await?;
        tracing::info!(tenant_id = %tenant_id, category_id = %category.id, "Categoria criada");
        Ok(category)
    }

    pub async fn update_category<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        category_id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Category, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let category = self
            .repo
            .update_category(executor, tenant_id, category_id, name.map(str::trim), description)
            .await?;
        ensure_same_tenant(category, tenant_id).ok_or(AppError::CategoryNotFound)
    }

    pub async fn deactivate_category<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        category_id: Uuid,
    ) -> Result<Category, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let category = self.repo.set_category_active(executor, tenant_id, category_id, false).await?;
        ensure_same_tenant(category, tenant_id).ok_or(AppError::CategoryNotFound)
    }

    // --- PRODUTOS ---

    pub async fn list_products<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        filter: &ProductFilter,
    ) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list_products(executor, tenant_id, filter).await
    }

    pub async fn get_product<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = self.repo.find_product(executor, tenant_id, product_id).await?;
        ensure_same_tenant(product, tenant_id).ok_or(AppError::ProductNotFound(product_id))
    }

    pub async fn create_product(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        new: &NewProduct,
    ) -> Result<Product, AppError> {
        if let Some(category_id) = new.category_id {
            self.ensure_category(&mut *conn, tenant_id, category_id).await?;
        }

        let product = self.repo.create_product(&mut *conn, tenant_id, new).await?;
        tracing::info!(tenant_id = %tenant_id, product_id = %product.id, "Produto criado");
        Ok(product)
    }

    pub async fn update_product(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        product_id: Uuid,
        changes: &ProductChanges,
    ) -> Result<Product, AppError> {
        if let Some(category_id) = changes.category_id {
            self.ensure_category(&mut *conn, tenant_id, category_id).await?;
        }

        let product = self.repo.update_product(&mut *conn, tenant_id, product_id, changes).await?;
        ensure_same_tenant(product, tenant_id).ok_or(AppError::ProductNotFound(product_id))
    }

    pub async fn deactivate_product<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = self.repo.set_product_active(executor, tenant_id, product_id, false).await?;
        let product = ensure_same_tenant(product, tenant_id).ok_or(AppError::ProductNotFound(product_id))?;
        tracing::info!(tenant_id = %tenant_id, product_id = %product_id, "Produto desativado");
        Ok(product)
    }

    // --- ESTOQUE ---

    /// Ajuste manual com o mesmo UPDATE condicional da venda; nunca deixa o estoque negativo.
    #[tracing::instrument(skip(self, conn, reason))]
    pub async fn adjust_stock(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        product_id: Uuid,
        delta: i32,
        reason: Option<&str>,
    ) -> Result<StockLevel, AppError> {
        if !(-MAX_STOCK_DELTA..=MAX_STOCK_DELTA).contains(&delta) {
            return Err(AppError::InvalidInput("delta".to_string()));
        }

        let updated = self
            .repo
            .apply_stock_delta(&mut *conn, tenant_id, product_id, delta, MAX_STOCK)
            .await?;

        let Some(stock) = updated else {
            let product = self.repo.find_product(&mut *conn, tenant_id, product_id).await?;
            let product = ensure_same_tenant(product, tenant_id).ok_or(AppError::ProductNotFound(product_id))?;
            if delta > 0 {
                tracing::warn!(available = product.stock, delta, "Ajuste passaria do estoque máximo");
                return Err(AppError::InvalidInput("delta".to_string()));
            }
            tracing::warn!(available = product.stock, delta, "Ajuste deixaria o estoque negativo");
            return Err(AppError::InsufficientStock {
                product: product.name,
                available: product.stock,
                requested: delta.saturating_neg(),
            });
        };

        let product = self.get_product(&mut *conn, tenant_id, product_id).await?;
        tracing::info!(stock, reason = reason.unwrap_or_default(), "Estoque ajustado");

        Ok(StockLevel {
            product_id,
            stock,
            low_stock: product.is_low_stock(),
        })
    }

    pub async fn list_low_stock<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list_low_stock(executor, tenant_id).await
    }

    async fn ensure_category(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        category_id: Uuid,
    ) -> Result<(), AppError> {
        let category = self.repo.find_category(conn, tenant_id, category_id).await?;
        ensure_same_tenant(category, tenant_id)
            .filter(|c| c.is_active)
            .map(|_| ())
            .ok_or(AppError::CategoryNotFound)
    }
}
