pub mod handlers;
pub mod response;

pub use handlers::*;
