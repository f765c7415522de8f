pub mod import;
pub mod invoice;
pub mod product;
pub mod summary;

pub use import::{ImportError, ImportResult, InvoiceRow, ProductRow, RawRow, SYSTEM_INVOICE_NO};
pub use invoice::{
    Invoice, InvoiceHasProduct, InvoiceInput, InvoiceWithProducts, NewInvoice, PaymentType,
    ProductRef, ValidInvoiceInput,
};
pub use product::{LinkedProduct, NewProduct, Product, ProductInput};
pub use summary::{
    InvoiceDetail, InvoiceDetailSummary, InvoiceSummary, PaginatedInvoices, PaginationMeta,
};
