use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 商品表 (products)
///
/// 在本系统中一条 Product 即一条明细行，而不是商品目录里的 SKU。
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub qty: i32,
    pub total_cogs: BigDecimal,
    pub total_price: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// 单行利润 = total_price - total_cogs (不乘数量)
    pub fn profit(&self) -> BigDecimal {
        &self.total_price - &self.total_cogs
    }
}

/// 关联查询结果: 带发票ID的商品行
#[derive(Debug, Clone, FromRow)]
pub struct LinkedProduct {
    pub invoice_id: i64,
    #[sqlx(flatten)]
    pub product: Product,
}

/// 创建/更新商品的请求体 (未校验)
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: Option<String>,
    pub qty: Option<i64>,
    pub total_cogs: Option<BigDecimal>,
    pub total_price: Option<BigDecimal>,
}

/// 校验通过、待写入的商品
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProduct {
    pub name: String,
    pub qty: i32,
    pub total_cogs: BigDecimal,
    pub total_price: BigDecimal,
}
