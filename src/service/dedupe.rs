use std::collections::HashSet;

use crate::db::ImportStore;

/// 批量查重: 一次查询返回已落库的发票号
///
/// 写入前的逐张复查在导入事务中进行（见 `InvoiceImporter`）。
pub struct DuplicateChecker<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: ImportStore + ?Sized> DuplicateChecker<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn find_existing<'n>(
        &self,
        invoice_nos: impl IntoIterator<Item = &'n String>,
    ) -> Result<HashSet<String>, sqlx::Error> {
        let distinct: Vec<String> = invoice_nos
            .into_iter()
            .cloned()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if distinct.is_empty() {
            return Ok(HashSet::new());
        }

        let existing = self.store.existing_invoice_nos(&distinct).await?;
        if !existing.is_empty() {
            tracing::info!(
                "[Import] 批量查重: {} 个发票号中 {} 个已存在",
                distinct.len(),
                existing.len()
            );
        }
        Ok(existing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;

    #[tokio::test]
    async fn returns_only_persisted_numbers() {
        let store = MemoryStore::new();
        store.seed(&["INV-1", "INV-3"]);
        let batch = vec!["INV-1".to_string(), "INV-2".to_string(), "INV-1".to_string()];

        let existing = DuplicateChecker::new(&store).find_existing(&batch).await.unwrap();

        assert_eq!(existing, HashSet::from(["INV-1".to_string()]));
    }

    #[tokio::test]
    async fn empty_batch_skips_lookup() {
        let store = MemoryStore::new();
        store.fail_lookup();

        let existing = DuplicateChecker::new(&store)
            .find_existing(&Vec::<String>::new())
            .await
            .unwrap();

        assert!(existing.is_empty());
    }

    #[tokio::test]
    async fn storage_failure_is_propagated() {
        let store = MemoryStore::new();
        store.fail_lookup();
        let batch = vec!["INV-1".to_string()];

        assert!(DuplicateChecker::new(&store).find_existing(&batch).await.is_err());
    }
}
