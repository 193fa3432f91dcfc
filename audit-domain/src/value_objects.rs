// Domain value objects
pub mod anomaly_kind;
pub mod severity;
pub mod statuses;

pub use anomaly_kind::*;
pub use severity::*;
pub use statuses::*;
