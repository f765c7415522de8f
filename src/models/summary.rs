use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use super::invoice::InvoiceWithProducts;

/// 批量汇总 (列表页)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceSummary {
    pub total_profit: BigDecimal,
    pub total_cash_transactions: i64,
}

/// 单张发票汇总 (详情页)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDetailSummary {
    pub total_profit: BigDecimal,
    pub is_cash_transaction: bool,
}

/// 分页信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PaginationMeta {
    pub fn new(total: i64, page: i64, limit: i64) -> Self {
        let total_pages = if limit > 0 {
            total / limit + i64::from(total % limit != 0)
        } else {
            0
        };
        Self {
            total,
            page,
            limit,
            total_pages,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }
}

/// 分页发票列表 + 汇总
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedInvoices {
    pub data: Vec<InvoiceWithProducts>,
    pub meta: PaginationMeta,
    pub summary: InvoiceSummary,
}

/// 发票详情 + 汇总
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: InvoiceWithProducts,
    pub summary: InvoiceDetailSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_meta_rounds_pages_up() {
        let meta = PaginationMeta::new(21, 1, 10);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next_page);
        assert!(!meta.has_prev_page);
    }

    #[test]
    fn pagination_meta_last_page() {
        let meta = PaginationMeta::new(20, 2, 10);
        assert_eq!(meta.total_pages, 2);
        assert!(!meta.has_next_page);
        assert!(meta.has_prev_page);
    }

    #[test]
    fn pagination_meta_huge_limit_does_not_overflow() {
        let meta = PaginationMeta::new(5, 1, i64::MAX);
        assert_eq!(meta.total_pages, 1);
        assert!(!meta.has_next_page);
    }

    #[test]
    fn pagination_meta_empty_table() {
        let meta = PaginationMeta::new(0, 1, 10);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_next_page);
    }
}
