use crate::models::{NewProduct, Product};
use sqlx::{PgExecutor, PgPool};

/// 查询全部商品
pub async fn list_products(pool: &PgPool) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, qty, total_cogs, total_price, created_at, updated_at
        FROM products
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
}

/// 按ID查询商品
pub async fn get_product<'e, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, qty, total_cogs, total_price, created_at, updated_at
        FROM products
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// 插入商品
pub async fn insert_product<'e, E: PgExecutor<'e>>(
    executor: E,
    product: &NewProduct,
) -> Result<Product, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products (name, qty, total_cogs, total_price, created_at, updated_at)
        VALUES ($1, $2, $3, $4, now(), now())
        RETURNING id, name, qty, total_cogs, total_price, created_at, updated_at
        "#,
    )
    .bind(&product.name)
    .bind(product.qty)
    .bind(&product.total_cogs)
    .bind(&product.total_price)
    .fetch_one(executor)
    .await
}

/// 整体更新商品
pub async fn update_product<'e, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
    product: &NewProduct,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        r#"
        UPDATE products
        SET name = $2, qty = $3, total_cogs = $4, total_price = $5, updated_at = now()
        WHERE id = $1
        RETURNING id, name, qty, total_cogs, total_price, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(&product.name)
    .bind(product.qty)
    .bind(&product.total_cogs)
    .bind(&product.total_price)
    .fetch_optional(executor)
    .await
}

/// 删除商品
pub async fn delete_product<'e, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        r#"
        DELETE FROM products
        WHERE id = $1
        RETURNING id, name, qty, total_cogs, total_price, created_at, updated_at
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// 返回给定ID中实际存在的商品ID
pub async fn existing_product_ids<'e, E: PgExecutor<'e>>(
    executor: E,
    ids: &[i64],
) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT id
        FROM products
        WHERE id = ANY($1)
        "#,
    )
    .bind(ids)
    .fetch_all(executor)
    .await
}
