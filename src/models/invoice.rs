use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use thiserror::Error;

use super::product::Product;

/// 付款方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentType {
    Cash,
    Credit,
}

#[derive(Debug, Error)]
#[error("unknown payment type: {0}")]
pub struct UnknownPaymentType(pub String);

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Cash => "CASH",
            PaymentType::Credit => "CREDIT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CASH" => Some(PaymentType::Cash),
            "CREDIT" => Some(PaymentType::Credit),
            _ => None,
        }
    }
}

impl TryFrom<String> for PaymentType {
    type Error = UnknownPaymentType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PaymentType::parse(&value).ok_or(UnknownPaymentType(value))
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 发票主表 (invoices)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub invoice_no: String,
    pub invoice_date: DateTime<Utc>,
    pub customer_name: String,
    pub salesperson: String,
    #[sqlx(try_from = "String")]
    pub payment_type: PaymentType,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 发票-商品关联表 (invoice_has_products)
///
/// 只负责把发票和商品行连起来；数量/成本/售价都在 Product 上。
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct InvoiceHasProduct {
    pub id: i64,
    pub invoice_id: i64,
    pub product_id: i64,
}

/// 发票及其所有商品
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceWithProducts {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub products: Vec<Product>,
}

impl InvoiceWithProducts {
    pub fn is_cash(&self) -> bool {
        self.invoice.payment_type == PaymentType::Cash
    }
}

/// 校验通过、待写入的发票头
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvoice {
    pub invoice_no: String,
    pub invoice_date: DateTime<Utc>,
    pub customer_name: String,
    pub salesperson: String,
    pub payment_type: PaymentType,
    pub notes: Option<String>,
}

/// 请求体中的商品引用
#[derive(Debug, Clone, Deserialize)]
pub struct ProductRef {
    pub product_id: i64,
}

/// 创建/更新发票的请求体 (未校验)
///
/// payment_type 保留为字符串，由校验器给出字段级错误而不是反序列化失败。
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceInput {
    pub invoice_no: Option<String>,
    pub customer_name: Option<String>,
    pub salesperson: Option<String>,
    pub payment_type: Option<String>,
    pub notes: Option<String>,
    pub products: Option<Vec<ProductRef>>,
}

/// 校验通过的发票请求
#[derive(Debug, Clone, PartialEq)]
pub struct ValidInvoiceInput {
    pub invoice_no: String,
    pub customer_name: String,
    pub salesperson: String,
    pub payment_type: PaymentType,
    pub notes: Option<String>,
    pub product_ids: Vec<i64>,
}
