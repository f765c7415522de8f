use crate::api::response::success;
use crate::db::PgImportStore;
use crate::models::{ImportResult, InvoiceInput, ProductInput, RawRow};
use crate::service::validator::ValidationErrors;
use crate::service::{InvoiceImporter, InvoiceService, ProductService, ServiceResult};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

pub type Importer = InvoiceImporter<PgImportStore>;

/// 发票列表查询参数（非法数字按默认值处理）
#[derive(Debug, Deserialize)]
pub struct ListInvoicesQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub date: Option<String>,
}

/// 请求体: 两张表的行（JSON 对象）
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub invoices: Vec<Map<String, Value>>,
    #[serde(default)]
    pub products: Vec<Map<String, Value>>,
}

/// 请求体: 两张表的 CSV 文本
#[derive(Debug, Deserialize)]
pub struct CsvImportRequest {
    pub invoices_csv: String,
    pub products_csv: String,
}

/// JSON 对象 -> 原始行；标量转为文本，null 视为缺失
pub fn raw_row(object: Map<String, Value>) -> RawRow {
    object
        .into_iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::Null => return None,
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => other.to_string(),
            };
            Some((key, text))
        })
        .collect()
}

fn parse_or(value: Option<&str>, default: i64) -> i64 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn list_products(State(service): State<Arc<ProductService>>) -> ServiceResult<Response> {
    let products = service.list().await?;
    Ok(success(StatusCode::OK, products, "Products fetched successfully"))
}

pub async fn get_product(
    State(service): State<Arc<ProductService>>,
    Path(id): Path<i64>,
) -> ServiceResult<Response> {
    let product = service.get(id).await?;
    Ok(success(StatusCode::OK, product, "Product fetched successfully"))
}

pub async fn create_product(
    State(service): State<Arc<ProductService>>,
    Json(input): Json<ProductInput>,
) -> ServiceResult<Response> {
    let product = service.create(&input).await?;
    Ok(success(StatusCode::CREATED, product, "Product created successfully"))
}

pub async fn update_product(
    State(service): State<Arc<ProductService>>,
    Path(id): Path<i64>,
    Json(input): Json<ProductInput>,
) -> ServiceResult<Response> {
    let product = service.update(id, &input).await?;
    Ok(success(StatusCode::OK, product, "Product updated successfully"))
}

pub async fn delete_product(
    State(service): State<Arc<ProductService>>,
    Path(id): Path<i64>,
) -> ServiceResult<Response> {
    let product = service.delete(id).await?;
    Ok(success(StatusCode::OK, product, "Product deleted successfully"))
}

pub async fn list_invoices(
    State(service): State<Arc<InvoiceService>>,
    Query(query): Query<ListInvoicesQuery>,
) -> ServiceResult<Response> {
    let page = parse_or(query.page.as_deref(), 1);
    let limit = parse_or(query.limit.as_deref(), 10);
    let date = match query.date.as_deref().filter(|d| !d.is_empty()) {
        None => None,
        Some(d) => Some(
            NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map_err(|_| ValidationErrors::single("date", "Date must be in YYYY-MM-DD format"))?,
        ),
    };

    let result = service.list_paginated(page, limit, date).await?;
    Ok(success(StatusCode::OK, result, "Invoices fetched successfully"))
}

pub async fn get_invoice(
    State(service): State<Arc<InvoiceService>>,
    Path(id): Path<i64>,
) -> ServiceResult<Response> {
    let invoice = service.get(id).await?;
    Ok(success(StatusCode::OK, invoice, "Invoice fetched successfully"))
}

pub async fn create_invoice(
    State(service): State<Arc<InvoiceService>>,
    Json(input): Json<InvoiceInput>,
) -> ServiceResult<Response> {
    let invoice = service.create(&input).await?;
    Ok(success(StatusCode::CREATED, invoice, "Invoice created successfully"))
}

pub async fn update_invoice(
    State(service): State<Arc<InvoiceService>>,
    Path(id): Path<i64>,
    Json(input): Json<InvoiceInput>,
) -> ServiceResult<Response> {
    let invoice = service.update(id, &input).await?;
    Ok(success(StatusCode::OK, invoice, "Invoice updated successfully"))
}

pub async fn delete_invoice(
    State(service): State<Arc<InvoiceService>>,
    Path(id): Path<i64>,
) -> ServiceResult<Response> {
    let invoice = service.delete(id).await?;
    Ok(success(StatusCode::OK, invoice, "Invoice deleted successfully"))
}

/// 导入结果: 行级失败仍返回 200，系统级失败返回 500
fn import_response(result: ImportResult) -> Response {
    let status = if result.is_system_failure() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    (status, Json(result)).into_response()
}

/// 批量导入（JSON 行）
pub async fn import_invoices(
    State(importer): State<Arc<Importer>>,
    Json(req): Json<ImportRequest>,
) -> Response {
    let invoice_rows = req.invoices.into_iter().map(raw_row).collect();
    let product_rows = req.products.into_iter().map(raw_row).collect();
    import_response(importer.import(invoice_rows, product_rows).await)
}

/// 批量导入（CSV 表）
pub async fn import_invoices_csv(
    State(importer): State<Arc<Importer>>,
    Json(req): Json<CsvImportRequest>,
) -> Response {
    import_response(importer.import_csv(&req.invoices_csv, &req.products_csv).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_cells_become_text() {
        let Value::Object(object) = json!({
            "invoice_no": "INV-1",
            "quantity": 3,
            "total_price": 12.5,
            "notes": null,
        }) else {
            panic!("expected object");
        };

        let row = raw_row(object);
        assert_eq!(row["invoice_no"], "INV-1");
        assert_eq!(row["quantity"], "3");
        assert_eq!(row["total_price"], "12.5");
        assert!(!row.contains_key("notes"));
    }

    #[test]
    fn bad_paging_numbers_fall_back_to_defaults() {
        assert_eq!(parse_or(Some("abc"), 1), 1);
        assert_eq!(parse_or(Some(" 3 "), 1), 3);
        assert_eq!(parse_or(None, 10), 10);
    }

    #[test]
    fn system_failure_maps_to_500() {
        let response = import_response(ImportResult::system_failure("db down"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let partial = ImportResult {
            success: false,
            message: "No invoices were imported, 1 invoice numbers failed".into(),
            errors: None,
            imported_count: 0,
        };
        assert_eq!(import_response(partial).status(), StatusCode::OK);
    }
}
