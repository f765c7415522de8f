use csv::ReaderBuilder;

use crate::models::RawRow;

/// 规范化表头: 去空白、小写、空格/连字符转下划线
///
/// "Invoice No" -> "invoice_no", "Total-COGS" -> "total_cogs"
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// 读取一张表（CSV 文本）为原始行
///
/// 单元格原样保留（空单元格为 ""，由 RowCleaner 处理）；整行为空的记录跳过。
pub fn read_sheet(text: &str) -> Result<Vec<RawRow>, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(normalize_header).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, cell)| (header.clone(), cell.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalizes_spreadsheet_headers() {
        assert_eq!(normalize_header(" Invoice No "), "invoice_no");
        assert_eq!(normalize_header("Total-COGS"), "total_cogs");
        assert_eq!(normalize_header("customer_name"), "customer_name");
    }

    #[test]
    fn reads_rows_keyed_by_header() {
        let rows = read_sheet(
            "Invoice No,Customer Name,Salesperson,Notes\n\
             INV-1,Jo,Al,\n\
             ,,,\n\
             INV-2,Mary,Bob,Paid early\n",
        )
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["invoice_no"], "INV-1");
        assert_eq!(rows[0]["notes"], "");
        assert_eq!(rows[1]["notes"], "Paid early");
    }

    #[test]
    fn short_records_are_tolerated() {
        let rows = read_sheet("invoice_no,item,quantity\nINV-1,Coffee beans\n").unwrap();
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].contains_key("quantity"));
    }
}
