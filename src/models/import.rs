use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 表格中的原始一行: 列名 -> 单元格文本
pub type RawRow = HashMap<String, String>;

/// 系统级错误使用的发票号
pub const SYSTEM_INVOICE_NO: &str = "System";

/// 校验通过的发票行
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceRow {
    pub invoice_no: String,
    pub customer_name: String,
    pub salesperson: String,
    pub notes: Option<String>,
}

/// 校验通过的明细行
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRow {
    pub invoice_no: String,
    pub item: String,
    pub quantity: i32,
    pub total_cogs: BigDecimal,
    pub total_price: BigDecimal,
}

/// 单张发票（或孤立明细组）的导入错误
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportError {
    pub invoice_no: String,
    pub errors: Vec<String>,
}

/// 导入结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ImportError>>,
    pub imported_count: usize,
}

impl ImportResult {
    /// 存储不可用、表格无法解析等致命错误
    pub fn system_failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: "Import failed".to_string(),
            errors: Some(vec![ImportError {
                invoice_no: SYSTEM_INVOICE_NO.to_string(),
                errors: vec![message.into()],
            }]),
            imported_count: 0,
        }
    }

    pub fn is_system_failure(&self) -> bool {
        self.errors
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|e| e.invoice_no == SYSTEM_INVOICE_NO)
    }

    pub fn error_for(&self, invoice_no: &str) -> Option<&ImportError> {
        self.errors
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|e| e.invoice_no == invoice_no)
    }
}
