pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod service;

pub use config::AppConfig;
pub use db::{create_pool, PgImportStore};
pub use service::{InvoiceImporter, InvoiceService, ProductService};
