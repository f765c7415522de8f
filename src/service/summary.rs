use bigdecimal::{BigDecimal, Zero};

use crate::models::{InvoiceDetailSummary, InvoiceSummary, InvoiceWithProducts};

/// 单张发票利润: Σ(total_price - total_cogs)
///
/// 数量不参与计算，与历史数据口径保持一致。
pub fn invoice_profit(invoice: &InvoiceWithProducts) -> BigDecimal {
    invoice
        .products
        .iter()
        .fold(BigDecimal::zero(), |acc, p| acc + p.profit())
}

/// 批量汇总: 总利润 + 现金交易笔数
pub fn summarize_batch(invoices: &[InvoiceWithProducts]) -> InvoiceSummary {
    let mut total_profit = BigDecimal::zero();
    let mut total_cash_transactions = 0i64;
    for invoice in invoices {
        total_profit += invoice_profit(invoice);
        if invoice.is_cash() {
            total_cash_transactions += 1;
        }
    }
    InvoiceSummary {
        total_profit,
        total_cash_transactions,
    }
}

/// 单张发票汇总
pub fn summarize_one(invoice: &InvoiceWithProducts) -> InvoiceDetailSummary {
    InvoiceDetailSummary {
        total_profit: invoice_profit(invoice),
        is_cash_transaction: invoice.is_cash(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Invoice, PaymentType, Product};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn product(qty: i32, cogs: &str, price: &str) -> Product {
        Product {
            id: 1,
            name: "Line item".into(),
            qty,
            total_cogs: BigDecimal::from_str(cogs).unwrap(),
            total_price: BigDecimal::from_str(price).unwrap(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn invoice(payment_type: PaymentType, products: Vec<Product>) -> InvoiceWithProducts {
        InvoiceWithProducts {
            invoice: Invoice {
                id: 1,
                invoice_no: "INV-1".into(),
                invoice_date: Utc::now(),
                customer_name: "Jo".into(),
                salesperson: "Al".into(),
                payment_type,
                notes: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            products,
        }
    }

    #[test]
    fn profit_ignores_quantity() {
        for qty in [1, 3, 1000] {
            let summary = summarize_one(&invoice(PaymentType::Cash, vec![product(qty, "100", "150")]));
            assert_eq!(summary.total_profit, BigDecimal::from(50));
            assert!(summary.is_cash_transaction);
        }
    }

    #[test]
    fn credit_invoice_is_not_cash() {
        let summary = summarize_one(&invoice(PaymentType::Credit, vec![]));
        assert_eq!(summary.total_profit, BigDecimal::zero());
        assert!(!summary.is_cash_transaction);
    }

    #[test]
    fn batch_sums_profit_and_counts_cash() {
        let invoices = vec![
            invoice(
                PaymentType::Cash,
                vec![product(2, "10.50", "20"), product(1, "5", "4.25")],
            ),
            invoice(PaymentType::Credit, vec![product(1, "100", "150")]),
            invoice(PaymentType::Cash, vec![]),
        ];
        let summary = summarize_batch(&invoices);
        assert_eq!(summary.total_profit, BigDecimal::from_str("58.75").unwrap());
        assert_eq!(summary.total_cash_transactions, 2);
    }

    #[test]
    fn empty_batch_is_zero() {
        let summary = summarize_batch(&[]);
        assert_eq!(summary.total_profit, BigDecimal::zero());
        assert_eq!(summary.total_cash_transactions, 0);
    }
}
