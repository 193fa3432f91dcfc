// Domain entities
pub mod anomaly;
pub mod config;
pub mod ledger;

pub use anomaly::*;
pub use config::*;
pub use ledger::*;
