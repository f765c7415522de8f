pub mod cleaner;
pub mod dedupe;
pub mod error;
pub mod grouper;
pub mod importer;
pub mod invoices;
pub mod products;
pub mod sheet;
pub mod summary;
pub mod validator;

pub use error::{ServiceError, ServiceResult};
pub use importer::{InvoiceImporter, IMPORTED_PAYMENT_TYPE};
pub use invoices::InvoiceService;
pub use products::ProductService;
