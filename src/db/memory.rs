//! 内存版 ImportStore，仅用于测试。

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::db::import_store::{ImportStore, ImportTx};
use crate::models::{NewInvoice, NewProduct};

#[derive(Debug, Clone)]
pub struct StoredInvoice {
    pub id: i64,
    pub invoice: NewInvoice,
    pub products: Vec<NewProduct>,
}

#[derive(Debug, Default)]
struct State {
    invoices: Vec<StoredInvoice>,
    next_id: i64,
    /// 批量查重时模拟存储不可用
    fail_lookup: bool,
    /// 写入该发票号时模拟存储故障
    fail_on_create: Option<String>,
    /// begin 时由"并发写入方"抢先落库的发票号
    race_inserts: Vec<String>,
    /// 事务内复查通过后、写入前被抢先落库的发票号
    race_on_create: Vec<String>,
}

impl State {
    fn contains(&self, invoice_no: &str) -> bool {
        self.invoices.iter().any(|i| i.invoice.invoice_no == invoice_no)
    }

    fn push(&mut self, invoice: NewInvoice, products: Vec<NewProduct>) -> i64 {
        self.next_id += 1;
        let id = self.next_id;
        self.invoices.push(StoredInvoice { id, invoice, products });
        id
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, invoice_nos: &[&str]) {
        let mut state = lock(&self.state);
        for no in invoice_nos {
            let invoice = seeded_invoice(no);
            state.push(invoice, Vec::new());
        }
    }

    pub fn fail_lookup(&self) {
        lock(&self.state).fail_lookup = true;
    }

    pub fn fail_on_create(&self, invoice_no: &str) {
        lock(&self.state).fail_on_create = Some(invoice_no.to_string());
    }

    pub fn race_insert_on_begin(&self, invoice_no: &str) {
        lock(&self.state).race_inserts.push(invoice_no.to_string());
    }

    pub fn race_insert_on_create(&self, invoice_no: &str) {
        lock(&self.state).race_on_create.push(invoice_no.to_string());
    }

    pub fn invoices(&self) -> Vec<StoredInvoice> {
        lock(&self.state).invoices.clone()
    }

    pub fn invoice_nos(&self) -> Vec<String> {
        self.invoices()
            .into_iter()
            .map(|i| i.invoice.invoice_no)
            .collect()
    }
}

fn seeded_invoice(invoice_no: &str) -> NewInvoice {
    NewInvoice {
        invoice_no: invoice_no.to_string(),
        invoice_date: chrono::Utc::now(),
        customer_name: "Existing".to_string(),
        salesperson: "Existing".to_string(),
        payment_type: crate::models::PaymentType::Credit,
        notes: None,
    }
}

#[async_trait]
impl ImportStore for MemoryStore {
    async fn existing_invoice_nos(&self, invoice_nos: &[String]) -> Result<HashSet<String>, sqlx::Error> {
        let state = lock(&self.state);
        if state.fail_lookup {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(invoice_nos
            .iter()
            .filter(|no| state.contains(no))
            .cloned()
            .collect())
    }

    async fn begin(&self) -> Result<Box<dyn ImportTx>, sqlx::Error> {
        let mut state = lock(&self.state);
        let racing = std::mem::take(&mut state.race_inserts);
        for no in racing {
            state.push(seeded_invoice(&no), Vec::new());
        }
        Ok(Box::new(MemoryTx {
            state: Arc::clone(&self.state),
            pending: Vec::new(),
        }))
    }
}

/// 写入先缓存在 pending，commit 时才对外可见
struct MemoryTx {
    state: Arc<Mutex<State>>,
    pending: Vec<(NewInvoice, Vec<NewProduct>)>,
}

impl MemoryTx {
    fn pending_contains(&self, invoice_no: &str) -> bool {
        self.pending.iter().any(|(i, _)| i.invoice_no == invoice_no)
    }
}

#[async_trait]
impl ImportTx for MemoryTx {
    async fn invoice_no_exists(&mut self, invoice_no: &str) -> Result<bool, sqlx::Error> {
        let committed = lock(&self.state).contains(invoice_no);
        Ok(committed || self.pending_contains(invoice_no))
    }

    async fn create_invoice_with_products(
        &mut self,
        invoice: &NewInvoice,
        products: &[NewProduct],
    ) -> Result<Option<i64>, sqlx::Error> {
        {
            let mut state = lock(&self.state);
            if let Some(pos) = state.race_on_create.iter().position(|no| *no == invoice.invoice_no) {
                let no = state.race_on_create.remove(pos);
                state.push(seeded_invoice(&no), Vec::new());
            }
            if state.fail_on_create.as_deref() == Some(invoice.invoice_no.as_str()) {
                return Err(sqlx::Error::PoolTimedOut);
            }
            if state.contains(&invoice.invoice_no) {
                return Ok(None);
            }
        }
        if self.pending_contains(&invoice.invoice_no) {
            return Ok(None);
        }
        self.pending.push((invoice.clone(), products.to_vec()));
        Ok(Some(self.pending.len() as i64))
    }

    async fn commit(&mut self) -> Result<(), sqlx::Error> {
        let mut state = lock(&self.state);
        for (invoice, products) in self.pending.drain(..) {
            state.push(invoice, products);
        }
        Ok(())
    }
}
