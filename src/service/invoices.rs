use chrono::{NaiveDate, TimeZone, Utc};
use sqlx::{PgExecutor, PgPool};
use std::collections::{HashMap, HashSet};

use crate::db::{queries, queries_product, DateRange};
use crate::models::{
    Invoice, InvoiceDetail, InvoiceInput, InvoiceWithProducts, NewInvoice, PaginatedInvoices,
    PaginationMeta, ValidInvoiceInput,
};
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::summary::{summarize_batch, summarize_one};
use crate::service::validator::{validate_invoice_input, FieldError, ValidationErrors};

const UNIQUE_INVOICE_NO: &str = "Invoice number must be unique";

/// 每页条数上限
pub const MAX_PAGE_LIMIT: i64 = 100;
/// 页码上限
pub const MAX_PAGE: i64 = 1_000_000;

/// 发票 CRUD + 读取时汇总
pub struct InvoiceService {
    pool: PgPool,
}

fn not_found(id: i64) -> ServiceError {
    ServiceError::NotFound(format!("Invoice {} not found", id))
}

/// 某一天 [00:00, 次日00:00) 的 UTC 区间
pub fn day_range(date: Option<NaiveDate>) -> DateRange {
    let Some(date) = date else {
        return DateRange::default();
    };
    let start = |d: NaiveDate| d.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt));
    DateRange {
        from: start(date),
        to: date.succ_opt().and_then(start),
    }
}

/// 规范化分页参数，返回 (page, limit, offset)
pub fn page_window(page: i64, limit: i64) -> (i64, i64, i64) {
    let page = page.clamp(1, MAX_PAGE);
    let limit = limit.clamp(1, MAX_PAGE_LIMIT);
    (page, limit, (page - 1) * limit)
}

/// 唯一约束冲突（并发写入同一发票号）转为字段错误
fn map_unique_violation(e: sqlx::Error) -> ServiceError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return ValidationErrors::single("invoice_no", UNIQUE_INVOICE_NO).into();
        }
    }
    e.into()
}

/// 为发票批量挂上商品（一次查询）
async fn with_products<'e, E: PgExecutor<'e>>(
    executor: E,
    invoices: Vec<Invoice>,
) -> Result<Vec<InvoiceWithProducts>, sqlx::Error> {
    if invoices.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = invoices.iter().map(|i| i.id).collect();
    let linked = queries::list_products_for_invoices(executor, &ids).await?;

    let mut by_invoice: HashMap<i64, Vec<_>> = HashMap::new();
    for row in linked {
        by_invoice.entry(row.invoice_id).or_default().push(row.product);
    }

    Ok(invoices
        .into_iter()
        .map(|invoice| {
            let products = by_invoice.remove(&invoice.id).unwrap_or_default();
            InvoiceWithProducts { invoice, products }
        })
        .collect())
}

/// 单张发票挂上商品
async fn with_products_one<'e, E: PgExecutor<'e>>(
    executor: E,
    invoice: Invoice,
) -> Result<InvoiceWithProducts, sqlx::Error> {
    let linked = queries::list_products_for_invoices(executor, &[invoice.id]).await?;
    Ok(InvoiceWithProducts {
        invoice,
        products: linked.into_iter().map(|row| row.product).collect(),
    })
}

impl InvoiceService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 分页列表；summary 覆盖过滤条件下的全部发票，而不只是当前页
    pub async fn list_paginated(
        &self,
        page: i64,
        limit: i64,
        date: Option<NaiveDate>,
    ) -> ServiceResult<PaginatedInvoices> {
        let (page, limit, offset) = page_window(page, limit);
        let range = day_range(date);

        let total = queries::count_invoices(&self.pool, range).await?;
        let page_rows = queries::list_invoices(&self.pool, range, limit, offset).await?;
        let data = with_products(&self.pool, page_rows).await?;

        let all_rows = queries::list_all_invoices(&self.pool, range).await?;
        let summary = summarize_batch(&with_products(&self.pool, all_rows).await?);

        Ok(PaginatedInvoices {
            data,
            meta: PaginationMeta::new(total, page, limit),
            summary,
        })
    }

    pub async fn get(&self, id: i64) -> ServiceResult<InvoiceDetail> {
        let invoice = queries::get_invoice(&self.pool, id)
            .await?
            .ok_or_else(|| not_found(id))?;
        let invoice = with_products_one(&self.pool, invoice).await?;
        let summary = summarize_one(&invoice);
        Ok(InvoiceDetail { invoice, summary })
    }

    /// 创建发票并关联已有商品
    pub async fn create(&self, input: &InvoiceInput) -> ServiceResult<InvoiceWithProducts> {
        let valid = validate_invoice_input(input, true)?;
        self.check_storable(&valid, None).await?;

        let new_invoice = NewInvoice {
            invoice_no: valid.invoice_no.clone(),
            invoice_date: Utc::now(),
            customer_name: valid.customer_name.clone(),
            salesperson: valid.salesperson.clone(),
            payment_type: valid.payment_type,
            notes: valid.notes.clone(),
        };

        let mut tx = self.pool.begin().await?;
        let invoice = queries::insert_invoice(&mut *tx, &new_invoice)
            .await
            .map_err(map_unique_violation)?;
        queries::link_products(&mut *tx, invoice.id, &valid.product_ids).await?;
        let created = with_products_one(&mut *tx, invoice).await?;
        tx.commit().await?;

        tracing::info!("Invoice {} created (id={})", created.invoice.invoice_no, created.invoice.id);
        Ok(created)
    }

    /// 更新发票: 删除全部关联后按请求重建
    pub async fn update(&self, id: i64, input: &InvoiceInput) -> ServiceResult<InvoiceWithProducts> {
        if queries::get_invoice(&self.pool, id).await?.is_none() {
            return Err(not_found(id));
        }
        let valid = validate_invoice_input(input, false)?;
        self.check_storable(&valid, Some(id)).await?;

        let mut tx = self.pool.begin().await?;
        queries::delete_links(&mut *tx, id).await?;
        let invoice = queries::update_invoice(&mut *tx, id, &valid)
            .await
            .map_err(map_unique_violation)?
            .ok_or_else(|| not_found(id))?;
        queries::link_products(&mut *tx, id, &valid.product_ids).await?;
        let updated = with_products_one(&mut *tx, invoice).await?;
        tx.commit().await?;

        tracing::info!("Invoice {} updated", id);
        Ok(updated)
    }

    /// 删除发票: 先删关联，再删发票
    pub async fn delete(&self, id: i64) -> ServiceResult<InvoiceWithProducts> {
        let mut tx = self.pool.begin().await?;
        let invoice = queries::get_invoice(&mut *tx, id)
            .await?
            .ok_or_else(|| not_found(id))?;
        let snapshot = with_products_one(&mut *tx, invoice).await?;

        queries::delete_links(&mut *tx, id).await?;
        queries::delete_invoice(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!("Invoice {} deleted", id);
        Ok(snapshot)
    }

    /// 第二阶段校验: 发票号唯一、商品存在
    async fn check_storable(&self, valid: &ValidInvoiceInput, exclude_id: Option<i64>) -> ServiceResult<()> {
        let mut errors = Vec::new();

        if queries::invoice_no_taken(&self.pool, &valid.invoice_no, exclude_id).await? {
            errors.push(FieldError {
                field: "invoice_no".into(),
                message: UNIQUE_INVOICE_NO.into(),
            });
        }

        if !valid.product_ids.is_empty() {
            let found: HashSet<i64> = queries_product::existing_product_ids(&self.pool, &valid.product_ids)
                .await?
                .into_iter()
                .collect();
            for (idx, product_id) in valid.product_ids.iter().enumerate() {
                if !found.contains(product_id) {
                    errors.push(FieldError {
                        field: format!("products.{}.product_id", idx),
                        message: format!("Product {} not found", product_id),
                    });
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(errors).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_range_covers_one_utc_day() {
        let range = day_range(NaiveDate::from_ymd_opt(2024, 2, 28));
        assert_eq!(range.from.unwrap().to_rfc3339(), "2024-02-28T00:00:00+00:00");
        assert_eq!(range.to.unwrap().to_rfc3339(), "2024-02-29T00:00:00+00:00");
    }

    #[test]
    fn page_window_clamps_extreme_values() {
        assert_eq!(page_window(1, i64::MAX), (1, MAX_PAGE_LIMIT, 0));
        assert_eq!(page_window(i64::MAX, i64::MAX), (MAX_PAGE, MAX_PAGE_LIMIT, (MAX_PAGE - 1) * MAX_PAGE_LIMIT));
        assert_eq!(page_window(0, -5), (1, 1, 0));
        assert_eq!(page_window(3, 10), (3, 10, 20));
    }

    #[test]
    fn no_date_means_no_bounds() {
        let range = day_range(None);
        assert!(range.from.is_none());
        assert!(range.to.is_none());
    }
}
