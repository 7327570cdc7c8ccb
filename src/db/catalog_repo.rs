// src/db/catalog_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{unique_violation_constraint, AppError},
    models::catalog::{Category, NewProduct, Product, ProductChanges, ProductFilter},
};

#[derive(Clone, Default)]
pub struct CatalogRepository;

impl CatalogRepository {
    pub fn new() -> Self {
        Self
    }

    // ---
    // Categorias
    // ---

    pub async fn list_categories<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        include_inactive: bool,
    ) -> Result<Vec<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT * FROM categories
            WHERE tenant_id = $1 AND ($2 OR is_active)
            ORDER BY name ASC
            "#,
        )
        .bind(tenant_id)
        .bind(include_inactive)
        .fetch_all(executor)
        .await?;

        Ok(categories)
    }

    pub async fn find_category<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        category_id: Uuid,
    ) -> Result<Option<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let category = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE id = $1 AND tenant_id = $2",
        )
        .bind(category_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;

        Ok(category)
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
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (tenant_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(name)
        .bind(description)
        .fetch_one(executor)
        .await
        .map_err(|e| match unique_violation_constraint(&e) {
            Some(_) => AppError::CategoryNameAlreadyExists(name.to_string()),
            None => e.into(),
        })
    }

    pub async fn update_category<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        category_id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
            SET name = COALESCE($1, name),
                description = COALESCE($2, description),
                updated_at = NOW()
            WHERE id = $3 AND tenant_id = $4
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(category_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await
        .map_err(|e| match unique_violation_constraint(&e) {
            Some(_) => AppError::CategoryNameAlreadyExists(name.unwrap_or_default().to_string()),
            None => e.into(),
        })
    }

    pub async fn set_category_active<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        category_id: Uuid,
        is_active: bool,
    ) -> Result<Option<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let category = sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories SET is_active = $1, updated_at = NOW()
            WHERE id = $2 AND tenant_id = $3
            RETURNING *
            "#,
        )
        .bind(is_active)
        .bind(category_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;

        Ok(category)
    }

    // ---
    // Produtos
    // ---

    pub async fn list_products<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        filter: &ProductFilter,
    ) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"));

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE tenant_id = $1
              AND ($2 OR is_active)
              AND ($3::uuid IS NULL OR category_id = $3)
              AND ($4::text IS NULL OR name ILIKE $4 OR barcode ILIKE $4)
            ORDER BY name ASC
            "#,
        )
        .bind(tenant_id)
        .bind(filter.include_inactive)
        .bind(filter.category_id)
        .bind(search)
        .fetch_all(executor)
        .await?;

        Ok(products)
    }

    pub async fn find_product<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE id = $1 AND tenant_id = $2",
        )
        .bind(product_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;

        Ok(product)
    }

    /// Carrega vários produtos da loja de uma vez (ids de outra loja simplesmente não voltam).
    pub async fn find_products_by_ids<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_ids: &[Uuid],
    ) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE tenant_id = $1 AND id = ANY($2)",
        )
        .bind(tenant_id)
        .bind(product_ids)
        .fetch_all(executor)
        .await?;

        Ok(products)
    }

    pub async fn list_low_stock<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE tenant_id = $1 AND is_active AND stock <= min_stock
            ORDER BY stock ASC, name ASC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;

        Ok(products)
    }

    pub async fn create_product<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        new: &NewProduct,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (
                tenant_id, category_id, name, description, barcode,
                price, stock, min_stock, image_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(new.category_id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.barcode)
        .bind(new.price)
        .bind(new.stock)
        .bind(new.min_stock)
        .bind(&new.image_url)
        .fetch_one(executor)
        .await
        .map_err(|e| match unique_violation_constraint(&e) {
            Some(_) => AppError::BarcodeAlreadyExists(new.barcode.clone().unwrap_or_default()),
            None => e.into(),
        })
    }

    pub async fn update_product<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
        changes: &ProductChanges,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET category_id = COALESCE($1, category_id),
                name        = COALESCE($2, name),
                description = COALESCE($3, description),
                barcode     = COALESCE($4, barcode),
                price       = COALESCE($5, price),
                min_stock   = COALESCE($6, min_stock),
                image_url   = COALESCE($7, image_url),
                updated_at  = NOW()
            WHERE id = $8 AND tenant_id = $9
            RETURNING *
            "#,
        )
        .bind(changes.category_id)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(&changes.barcode)
        .bind(changes.price)
        .bind(changes.min_stock)
        .bind(&changes.image_url)
        .bind(product_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await
        .map_err(|e| match unique_violation_constraint(&e) {
            Some(_) => AppError::BarcodeAlreadyExists(changes.barcode.clone().unwrap_or_default()),
            None => e.into(),
        })
    }

    pub async fn set_product_active<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
        is_active: bool,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET is_active = $1, updated_at = NOW()
            WHERE id = $2 AND tenant_id = $3
            RETURNING *
            "#,
        )
        .bind(is_active)
        .bind(product_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;

        Ok(product)
    }

    // ---
    // Estoque
    // ---
    // Sempre um UPDATE condicional e atômico: nunca "lê, calcula e grava".
    // `None` significa que a condição falhou (estoque insuficiente ou produto fora da loja).

    /// Soma `delta` (positivo ou negativo) ao estoque, desde que o resultado fique
    /// entre 0 e `ceiling`. A conta é feita em bigint para nunca estourar o int4.
    pub async fn apply_stock_delta<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
        delta: i32,
        ceiling: i32,
    ) -> Result<Option<i32>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let new_stock = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE products
            SET stock = stock + $1, updated_at = NOW()
            WHERE id = $2 AND tenant_id = $3
              AND stock::bigint + $1 BETWEEN 0 AND $4
            RETURNING stock
            "#,
        )
        .bind(delta)
        .bind(product_id)
        .bind(tenant_id)
        .bind(ceiling)
        .fetch_optional(executor)
        .await?;

        Ok(new_stock)
    }

    /// Baixa de venda: só produtos ativos.
    pub async fn decrement_stock<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<Option<i32>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let new_stock = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE products
            SET stock = stock - $1, updated_at = NOW()
            WHERE id = $2 AND tenant_id = $3 AND is_active AND stock >= $1
            RETURNING stock
            "#,
        )
        .bind(quantity)
        .bind(product_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;

        Ok(new_stock)
    }
}
