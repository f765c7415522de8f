use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashSet;

use crate::db::{queries, queries_product};
use crate::models::{NewInvoice, NewProduct};

/// 导入所需的存储能力
///
/// 批量查重在事务外执行；写入全部在 `begin` 打开的同一事务内完成。
#[async_trait]
pub trait ImportStore: Send + Sync {
    /// 返回给定发票号中已经落库的那部分
    async fn existing_invoice_nos(&self, invoice_nos: &[String]) -> Result<HashSet<String>, sqlx::Error>;

    /// 打开一次导入的事务
    async fn begin(&self) -> Result<Box<dyn ImportTx>, sqlx::Error>;
}

/// 一次导入的事务。未调用 `commit` 即被丢弃时回滚。
#[async_trait]
pub trait ImportTx: Send {
    async fn invoice_no_exists(&mut self, invoice_no: &str) -> Result<bool, sqlx::Error>;

    /// 写入发票并为每条明细新建一条商品记录
    ///
    /// 发票号被并发写入占用时返回 `Ok(None)`，事务保持可用。
    async fn create_invoice_with_products(
        &mut self,
        invoice: &NewInvoice,
        products: &[NewProduct],
    ) -> Result<Option<i64>, sqlx::Error>;

    async fn commit(&mut self) -> Result<(), sqlx::Error>;
}

/// PostgreSQL 实现
#[derive(Clone)]
pub struct PgImportStore {
    pool: PgPool,
}

impl PgImportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImportStore for PgImportStore {
    async fn existing_invoice_nos(&self, invoice_nos: &[String]) -> Result<HashSet<String>, sqlx::Error> {
        if invoice_nos.is_empty() {
            return Ok(HashSet::new());
        }
        let found = queries::find_invoice_nos_in(&self.pool, invoice_nos).await?;
        Ok(found.into_iter().collect())
    }

    async fn begin(&self) -> Result<Box<dyn ImportTx>, sqlx::Error> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgImportTx { tx: Some(tx) }))
    }
}

struct PgImportTx {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgImportTx {
    fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>, sqlx::Error> {
        self.tx.as_mut().ok_or(sqlx::Error::PoolClosed)
    }
}

#[async_trait]
impl ImportTx for PgImportTx {
    async fn invoice_no_exists(&mut self, invoice_no: &str) -> Result<bool, sqlx::Error> {
        let tx = self.tx()?;
        let found = queries::find_invoice_by_no(&mut **tx, invoice_no).await?;
        Ok(found.is_some())
    }

    async fn create_invoice_with_products(
        &mut self,
        invoice: &NewInvoice,
        products: &[NewProduct],
    ) -> Result<Option<i64>, sqlx::Error> {
        let tx = self.tx()?;
        let Some(created) = queries::insert_invoice_if_absent(&mut **tx, invoice).await? else {
            return Ok(None);
        };

        let mut product_ids = Vec::with_capacity(products.len());
        for product in products {
            let row = queries_product::insert_product(&mut **tx, product).await?;
            product_ids.push(row.id);
        }
        queries::link_products(&mut **tx, created.id, &product_ids).await?;

        tracing::debug!(
            "发票 {} 写入完成, id={}, 明细 {} 条",
            created.invoice_no,
            created.id,
            product_ids.len()
        );
        Ok(Some(created.id))
    }

    async fn commit(&mut self) -> Result<(), sqlx::Error> {
        match self.tx.take() {
            Some(tx) => tx.commit().await,
            None => Err(sqlx::Error::PoolClosed),
        }
    }
}
