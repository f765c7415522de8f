use sqlx::PgPool;

use crate::db::queries_product;
use crate::models::{Product, ProductInput};
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::validator::validate_product_input;

/// 商品 CRUD
pub struct ProductService {
    pool: PgPool,
}

fn not_found(id: i64) -> ServiceError {
    ServiceError::NotFound(format!("Product {} not found", id))
}

impl ProductService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> ServiceResult<Vec<Product>> {
        Ok(queries_product::list_products(&self.pool).await?)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Product> {
        queries_product::get_product(&self.pool, id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn create(&self, input: &ProductInput) -> ServiceResult<Product> {
        let product = validate_product_input(input)?;
        let created = queries_product::insert_product(&self.pool, &product).await?;
        tracing::info!("Product {} created", created.id);
        Ok(created)
    }

    /// 整体更新
    pub async fn update(&self, id: i64, input: &ProductInput) -> ServiceResult<Product> {
        let product = validate_product_input(input)?;
        queries_product::update_product(&self.pool, id, &product)
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<Product> {
        let deleted = queries_product::delete_product(&self.pool, id)
            .await?
            .ok_or_else(|| not_found(id))?;
        tracing::info!("Product {} deleted", id);
        Ok(deleted)
    }
}
