use crate::models::{Invoice, InvoiceHasProduct, LinkedProduct, NewInvoice, ValidInvoiceInput};
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, Postgres, QueryBuilder};

/// 发票日期过滤区间 [from, to)，两端都可缺省
#[derive(Debug, Clone, Copy, Default)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// 统计发票数量
pub async fn count_invoices<'e, E: PgExecutor<'e>>(
    executor: E,
    range: DateRange,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT count(*)
        FROM invoices
        WHERE ($1::timestamptz IS NULL OR invoice_date >= $1)
          AND ($2::timestamptz IS NULL OR invoice_date < $2)
        "#,
    )
    .bind(range.from)
    .bind(range.to)
    .fetch_one(executor)
    .await
}

/// 分页查询发票 (按ID降序)
pub async fn list_invoices<'e, E: PgExecutor<'e>>(
    executor: E,
    range: DateRange,
    limit: i64,
    offset: i64,
) -> Result<Vec<Invoice>, sqlx::Error> {
    sqlx::query_as::<_, Invoice>(
        r#"
        SELECT id, invoice_no, invoice_date, customer_name, salesperson,
               payment_type, notes, created_at, updated_at
        FROM invoices
        WHERE ($1::timestamptz IS NULL OR invoice_date >= $1)
          AND ($2::timestamptz IS NULL OR invoice_date < $2)
        ORDER BY id DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(range.from)
    .bind(range.to)
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await
}

/// 查询过滤条件下的全部发票 (用于汇总)
pub async fn list_all_invoices<'e, E: PgExecutor<'e>>(
    executor: E,
    range: DateRange,
) -> Result<Vec<Invoice>, sqlx::Error> {
    sqlx::query_as::<_, Invoice>(
        r#"
        SELECT id, invoice_no, invoice_date, customer_name, salesperson,
               payment_type, notes, created_at, updated_at
        FROM invoices
        WHERE ($1::timestamptz IS NULL OR invoice_date >= $1)
          AND ($2::timestamptz IS NULL OR invoice_date < $2)
        ORDER BY id DESC
        "#,
    )
    .bind(range.from)
    .bind(range.to)
    .fetch_all(executor)
    .await
}

/// 按ID查询发票
pub async fn get_invoice<'e, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
) -> Result<Option<Invoice>, sqlx::Error> {
    sqlx::query_as::<_, Invoice>(
        r#"
        SELECT id, invoice_no, invoice_date, customer_name, salesperson,
               payment_type, notes, created_at, updated_at
        FROM invoices
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// 按发票号查询发票
pub async fn find_invoice_by_no<'e, E: PgExecutor<'e>>(
    executor: E,
    invoice_no: &str,
) -> Result<Option<Invoice>, sqlx::Error> {
    sqlx::query_as::<_, Invoice>(
        r#"
        SELECT id, invoice_no, invoice_date, customer_name, salesperson,
               payment_type, notes, created_at, updated_at
        FROM invoices
        WHERE invoice_no = $1
        "#,
    )
    .bind(invoice_no)
    .fetch_optional(executor)
    .await
}

/// 发票号是否已被其他发票占用（更新时排除自身）
pub async fn invoice_no_taken<'e, E: PgExecutor<'e>>(
    executor: E,
    invoice_no: &str,
    exclude_id: Option<i64>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM invoices
            WHERE invoice_no = $1
              AND ($2::bigint IS NULL OR id <> $2)
        )
        "#,
    )
    .bind(invoice_no)
    .bind(exclude_id)
    .fetch_one(executor)
    .await
}

/// 批量查询已存在的发票号（一次查询，避免 N+1）
pub async fn find_invoice_nos_in<'e, E: PgExecutor<'e>>(
    executor: E,
    invoice_nos: &[String],
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT invoice_no
        FROM invoices
        WHERE invoice_no = ANY($1)
        "#,
    )
    .bind(invoice_nos)
    .fetch_all(executor)
    .await
}

/// 插入发票
pub async fn insert_invoice<'e, E: PgExecutor<'e>>(
    executor: E,
    invoice: &NewInvoice,
) -> Result<Invoice, sqlx::Error> {
    sqlx::query_as::<_, Invoice>(
        r#"
        INSERT INTO invoices (invoice_no, invoice_date, customer_name, salesperson,
                              payment_type, notes, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, now(), now())
        RETURNING id, invoice_no, invoice_date, customer_name, salesperson,
                  payment_type, notes, created_at, updated_at
        "#,
    )
    .bind(&invoice.invoice_no)
    .bind(invoice.invoice_date)
    .bind(&invoice.customer_name)
    .bind(&invoice.salesperson)
    .bind(invoice.payment_type.as_str())
    .bind(&invoice.notes)
    .fetch_one(executor)
    .await
}

/// 插入发票，发票号冲突时不插入并返回 None
///
/// 依赖 invoices.invoice_no 上的唯一约束；冲突不会使事务失效。
pub async fn insert_invoice_if_absent<'e, E: PgExecutor<'e>>(
    executor: E,
    invoice: &NewInvoice,
) -> Result<Option<Invoice>, sqlx::Error> {
    sqlx::query_as::<_, Invoice>(
        r#"
        INSERT INTO invoices (invoice_no, invoice_date, customer_name, salesperson,
                              payment_type, notes, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, now(), now())
        ON CONFLICT (invoice_no) DO NOTHING
        RETURNING id, invoice_no, invoice_date, customer_name, salesperson,
                  payment_type, notes, created_at, updated_at
        "#,
    )
    .bind(&invoice.invoice_no)
    .bind(invoice.invoice_date)
    .bind(&invoice.customer_name)
    .bind(&invoice.salesperson)
    .bind(invoice.payment_type.as_str())
    .bind(&invoice.notes)
    .fetch_optional(executor)
    .await
}

/// 更新发票头（不含关联）
pub async fn update_invoice<'e, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
    input: &ValidInvoiceInput,
) -> Result<Option<Invoice>, sqlx::Error> {
    sqlx::query_as::<_, Invoice>(
        r#"
        UPDATE invoices
        SET invoice_no = $2, customer_name = $3, salesperson = $4,
            payment_type = $5, notes = $6, updated_at = now()
        WHERE id = $1
        RETURNING id, invoice_no, invoice_date, customer_name, salesperson,
                  payment_type, notes, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(&input.invoice_no)
    .bind(&input.customer_name)
    .bind(&input.salesperson)
    .bind(input.payment_type.as_str())
    .bind(&input.notes)
    .fetch_optional(executor)
    .await
}

/// 删除发票头（调用方需先删除关联）
pub async fn delete_invoice<'e, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
) -> Result<Option<Invoice>, sqlx::Error> {
    sqlx::query_as::<_, Invoice>(
        r#"
        DELETE FROM invoices
        WHERE id = $1
        RETURNING id, invoice_no, invoice_date, customer_name, salesperson,
                  payment_type, notes, created_at, updated_at
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// 批量建立发票-商品关联
pub async fn link_products<'e, E: PgExecutor<'e>>(
    executor: E,
    invoice_id: i64,
    product_ids: &[i64],
) -> Result<Vec<InvoiceHasProduct>, sqlx::Error> {
    if product_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO invoice_has_products (invoice_id, product_id) ");
    query_builder.push_values(product_ids, |mut b, product_id| {
        b.push_bind(invoice_id).push_bind(*product_id);
    });
    query_builder.push(" RETURNING id, invoice_id, product_id");

    query_builder
        .build_query_as::<InvoiceHasProduct>()
        .fetch_all(executor)
        .await
}

/// 删除发票的全部关联
pub async fn delete_links<'e, E: PgExecutor<'e>>(
    executor: E,
    invoice_id: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM invoice_has_products WHERE invoice_id = $1")
        .bind(invoice_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// 查询多张发票关联的商品
pub async fn list_products_for_invoices<'e, E: PgExecutor<'e>>(
    executor: E,
    invoice_ids: &[i64],
) -> Result<Vec<LinkedProduct>, sqlx::Error> {
    sqlx::query_as::<_, LinkedProduct>(
        r#"
        SELECT ihp.invoice_id,
               p.id, p.name, p.qty, p.total_cogs, p.total_price,
               p.created_at, p.updated_at
        FROM invoice_has_products ihp
        INNER JOIN products p ON p.id = ihp.product_id
        WHERE ihp.invoice_id = ANY($1)
        ORDER BY ihp.invoice_id, ihp.id
        "#,
    )
    .bind(invoice_ids)
    .fetch_all(executor)
    .await
}
