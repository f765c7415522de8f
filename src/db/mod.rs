pub mod import_store;
#[cfg(test)]
pub mod memory;
pub mod pool;
pub mod queries;
pub mod queries_product;

pub use import_store::{ImportStore, ImportTx, PgImportStore};
pub use pool::create_pool;
pub use queries::DateRange;
