use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::db::ImportStore;
use crate::models::{
    ImportError, ImportResult, InvoiceRow, NewInvoice, NewProduct, PaymentType, ProductRow,
    RawRow,
};
use crate::service::cleaner::clean_row;
use crate::service::dedupe::DuplicateChecker;
use crate::service::grouper::group_by_invoice;
use crate::service::sheet::read_sheet;
use crate::service::validator::{validate_invoice_row, validate_product_row};

/// 导入发票的付款方式固定为现金，表格中的 payment_type 列不生效
pub const IMPORTED_PAYMENT_TYPE: PaymentType = PaymentType::Cash;

/// 发票号缺失的行归到此键下
const UNKNOWN_INVOICE_NO: &str = "Unknown";

/// 按发票号归并的错误列表（保持首次出现顺序）
#[derive(Debug, Default)]
struct ErrorLog {
    entries: IndexMap<String, Vec<String>>,
}

impl ErrorLog {
    fn push(&mut self, invoice_no: &str, message: impl Into<String>) {
        self.entries
            .entry(invoice_no.to_string())
            .or_default()
            .push(message.into());
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn into_errors(self) -> Option<Vec<ImportError>> {
        if self.entries.is_empty() {
            return None;
        }
        Some(
            self.entries
                .into_iter()
                .map(|(invoice_no, errors)| ImportError { invoice_no, errors })
                .collect(),
        )
    }
}

/// 通过校验的发票行，以及表格中出现过的所有发票号
struct CollectedInvoices {
    valid: IndexMap<String, InvoiceRow>,
    seen: HashSet<String>,
}

/// 通过校验的明细行，以及含有非法明细的发票号
struct CollectedProducts {
    valid: Vec<ProductRow>,
    tainted: HashSet<String>,
}

/// 待写入的一张发票
struct PendingInvoice {
    invoice: NewInvoice,
    products: Vec<NewProduct>,
}

/// 发票导入编排
///
/// 清洗 -> 校验 -> 分组 -> 查重 -> 事务写入 -> 结果汇总。
/// 行级问题全部记录在 `ImportResult.errors` 中；存储故障、表格无法解析、
/// 超时则整体失败，返回一条 `System` 错误且不提交任何写入。
pub struct InvoiceImporter<S> {
    store: S,
    timeout: Duration,
}

impl<S: ImportStore> InvoiceImporter<S> {
    pub fn new(store: S, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// 导入两张已解析的表: 发票表、明细表
    pub async fn import(&self, invoice_rows: Vec<RawRow>, product_rows: Vec<RawRow>) -> ImportResult {
        let start_time = Instant::now();
        tracing::info!(
            "[Import] 开始导入: {} 条发票行, {} 条明细行",
            invoice_rows.len(),
            product_rows.len()
        );

        let outcome = tokio::time::timeout(self.timeout, self.run(invoice_rows, product_rows)).await;
        match outcome {
            Ok(Ok(result)) => {
                tracing::info!(
                    "[Import] 导入完成: 成功 {} 张, 失败 {} 个发票号, 耗时: {:?}",
                    result.imported_count,
                    result.errors.as_ref().map_or(0, Vec::len),
                    start_time.elapsed()
                );
                result
            }
            Ok(Err(e)) => {
                tracing::error!("[Import] 存储错误, 事务已回滚: {:?}", e);
                ImportResult::system_failure(e.to_string())
            }
            Err(_) => {
                tracing::error!("[Import] 导入超时 (>{:?}), 事务已回滚", self.timeout);
                ImportResult::system_failure(format!("Import timed out after {:?}", self.timeout))
            }
        }
    }

    /// 从两段 CSV 文本导入
    pub async fn import_csv(&self, invoices_csv: &str, products_csv: &str) -> ImportResult {
        let invoice_rows = match read_sheet(invoices_csv) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("[Import] 发票表解析失败: {}", e);
                return ImportResult::system_failure(format!("Invoice sheet could not be parsed: {}", e));
            }
        };
        let product_rows = match read_sheet(products_csv) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("[Import] 明细表解析失败: {}", e);
                return ImportResult::system_failure(format!("Product sheet could not be parsed: {}", e));
            }
        };
        self.import(invoice_rows, product_rows).await
    }

    async fn run(&self, invoice_rows: Vec<RawRow>, product_rows: Vec<RawRow>) -> Result<ImportResult, sqlx::Error> {
        let mut errors = ErrorLog::default();

        // Phase 1: 发票行清洗 + 校验
        let invoices = collect_invoices(invoice_rows, &mut errors);

        // Phase 2: 明细行清洗 + 校验
        let products = collect_products(product_rows, &mut errors);

        // Phase 3: 分组；没有对应发票行的明细组为孤立组
        let mut groups = group_by_invoice(products.valid);
        groups.retain(|invoice_no, rows| {
            if invoices.valid.contains_key(invoice_no) {
                return true;
            }
            // 发票行本身校验失败时已记录过错误，这里只丢弃明细
            if !invoices.seen.contains(invoice_no) {
                errors.push(
                    invoice_no,
                    format!("No invoice row found for {} product row(s)", rows.len()),
                );
            }
            false
        });

        // Phase 4: 批量查重
        let existing = DuplicateChecker::new(&self.store)
            .find_existing(invoices.valid.keys())
            .await?;

        // Phase 5: 确定待写入集合（不允许无明细的发票）
        let now = Utc::now();
        let mut pending = Vec::with_capacity(invoices.valid.len());
        for (invoice_no, row) in invoices.valid {
            if existing.contains(&invoice_no) {
                errors.push(&invoice_no, already_exists(&invoice_no));
                continue;
            }
            if products.tainted.contains(&invoice_no) {
                errors.push(&invoice_no, "Invoice skipped because some products are invalid");
                continue;
            }
            let rows = groups.shift_remove(&invoice_no).unwrap_or_default();
            if rows.is_empty() {
                errors.push(&invoice_no, "Invoice has no valid products");
                continue;
            }
            pending.push(to_pending(row, rows, now));
        }

        // Phase 6: 事务写入
        let imported_count = if pending.is_empty() {
            0
        } else {
            self.persist(&pending, &mut errors).await?
        };

        let message = if errors.is_empty() {
            format!("Successfully imported {} invoices", imported_count)
        } else if imported_count > 0 {
            format!(
                "Imported {} invoices, {} invoice numbers failed",
                imported_count,
                errors.len()
            )
        } else {
            format!("No invoices were imported, {} invoice numbers failed", errors.len())
        };

        Ok(ImportResult {
            success: errors.is_empty(),
            message,
            errors: errors.into_errors(),
            imported_count,
        })
    }

    /// 在同一事务中写入全部发票；返回实际写入的张数
    ///
    /// 每张发票写入前复查发票号，被并发写入抢占的转为错误并跳过，不中断事务。
    async fn persist(&self, pending: &[PendingInvoice], errors: &mut ErrorLog) -> Result<usize, sqlx::Error> {
        let execute_start = Instant::now();
        let mut tx = self.store.begin().await?;
        let mut imported = 0usize;

        for p in pending {
            let invoice_no = &p.invoice.invoice_no;
            if tx.invoice_no_exists(invoice_no).await? {
                tracing::warn!("[Import] 发票号 {} 在查重后被写入, 跳过", invoice_no);
                errors.push(invoice_no, already_exists(invoice_no));
                continue;
            }
            match tx.create_invoice_with_products(&p.invoice, &p.products).await? {
                Some(_) => imported += 1,
                None => {
                    tracing::warn!("[Import] 发票号 {} 写入时冲突, 跳过", invoice_no);
                    errors.push(invoice_no, already_exists(invoice_no));
                }
            }
        }

        tx.commit().await?;
        tracing::debug!(
            "[Import] 事务提交: {} 张发票, 耗时: {:?}",
            imported,
            execute_start.elapsed()
        );
        Ok(imported)
    }
}

fn already_exists(invoice_no: &str) -> String {
    format!("Invoice number {} already exists", invoice_no)
}

fn collect_invoices(rows: Vec<RawRow>, errors: &mut ErrorLog) -> CollectedInvoices {
    let mut valid: IndexMap<String, InvoiceRow> = IndexMap::new();
    let mut seen = HashSet::new();

    for (idx, raw) in rows.into_iter().enumerate() {
        let row_no = idx + 1;
        let row = clean_row(raw);
        let key = row
            .get("invoice_no")
            .cloned()
            .unwrap_or_else(|| UNKNOWN_INVOICE_NO.to_string());
        seen.insert(key.clone());

        match validate_invoice_row(&row) {
            Ok(invoice) => {
                if valid.contains_key(&invoice.invoice_no) {
                    errors.push(
                        &key,
                        format!("Row {}: Duplicate invoice number in import file", row_no),
                    );
                    continue;
                }
                valid.insert(invoice.invoice_no.clone(), invoice);
            }
            Err(e) => {
                tracing::warn!("[Import] 发票行 {} ({}) 校验失败: {}", row_no, key, e);
                for field_error in &e.0 {
                    errors.push(&key, format!("Row {}: {}", row_no, field_error));
                }
            }
        }
    }

    CollectedInvoices { valid, seen }
}

fn collect_products(rows: Vec<RawRow>, errors: &mut ErrorLog) -> CollectedProducts {
    let mut valid = Vec::with_capacity(rows.len());
    let mut tainted = HashSet::new();

    for (idx, raw) in rows.into_iter().enumerate() {
        let row_no = idx + 1;
        let row = clean_row(raw);
        match validate_product_row(&row) {
            Ok(product) => valid.push(product),
            Err(e) => {
                let key = row
                    .get("invoice_no")
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_INVOICE_NO.to_string());
                tracing::warn!("[Import] 明细行 {} ({}) 校验失败: {}", row_no, key, e);
                for field_error in &e.0 {
                    errors.push(&key, format!("Product row {}: {}", row_no, field_error));
                }
                tainted.insert(key);
            }
        }
    }

    CollectedProducts { valid, tainted }
}

fn to_pending(row: InvoiceRow, products: Vec<ProductRow>, now: DateTime<Utc>) -> PendingInvoice {
    PendingInvoice {
        invoice: NewInvoice {
            invoice_no: row.invoice_no,
            invoice_date: now,
            customer_name: row.customer_name,
            salesperson: row.salesperson,
            payment_type: IMPORTED_PAYMENT_TYPE,
            notes: row.notes,
        },
        products: products
            .into_iter()
            .map(|p| NewProduct {
                name: p.item,
                qty: p.quantity,
                total_cogs: p.total_cogs,
                total_price: p.total_price,
            })
            .collect(),
    }
}
