// Domain services
// Pure audit computation: snapshot aggregation and the detector suite

pub mod aggregate;
pub mod detectors;
pub mod engine;

pub use aggregate::*;
pub use detectors::*;
pub use engine::*;
