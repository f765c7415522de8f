use indexmap::IndexMap;

use crate::models::ProductRow;

/// 按发票号分组明细行
///
/// 单次遍历；组内保持输入顺序，组间按发票号首次出现的顺序。
pub fn group_by_invoice(rows: Vec<ProductRow>) -> IndexMap<String, Vec<ProductRow>> {
    let mut groups: IndexMap<String, Vec<ProductRow>> = IndexMap::new();
    for row in rows {
        groups.entry(row.invoice_no.clone()).or_default().push(row);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use pretty_assertions::assert_eq;

    fn row(invoice_no: &str, item: &str) -> ProductRow {
        ProductRow {
            invoice_no: invoice_no.to_string(),
            item: item.to_string(),
            quantity: 1,
            total_cogs: BigDecimal::from(1),
            total_price: BigDecimal::from(2),
        }
    }

    fn items(rows: &[ProductRow]) -> Vec<&str> {
        rows.iter().map(|r| r.item.as_str()).collect()
    }

    #[test]
    fn preserves_order_within_groups() {
        let groups = group_by_invoice(vec![row("A", "x"), row("B", "y"), row("A", "z")]);

        assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(items(&groups["A"]), vec!["x", "z"]);
        assert_eq!(items(&groups["B"]), vec!["y"]);
    }

    #[test]
    fn empty_input_gives_no_groups() {
        assert!(group_by_invoice(Vec::new()).is_empty());
    }
}
