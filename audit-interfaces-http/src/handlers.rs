pub mod audit_handlers;
pub mod ops_handlers;

pub use audit_handlers::*;
pub use ops_handlers::*;
