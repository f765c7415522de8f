use crate::models::RawRow;

/// 清洗原始行: 空字符串单元格视为缺失字段
///
/// 表格里的空单元格会被解析为 ""，直接校验会让可选字段（如 notes）
/// 触发最小长度规则，所以这里把它们整列移除。
pub fn clean_row(row: RawRow) -> RawRow {
    row.into_iter().filter(|(_, value)| !value.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn drops_empty_values() {
        let cleaned = clean_row(row(&[("invoice_no", "INV-1"), ("notes", "")]));
        assert_eq!(cleaned.get("invoice_no").map(String::as_str), Some("INV-1"));
        assert!(!cleaned.contains_key("notes"));
    }

    #[test]
    fn keeps_whitespace_values() {
        let cleaned = clean_row(row(&[("notes", " ")]));
        assert_eq!(cleaned.get("notes").map(String::as_str), Some(" "));
    }

    #[test]
    fn empty_row_stays_empty() {
        assert!(clean_row(RawRow::new()).is_empty());
    }
}
