pub mod anomaly_queries;
pub mod threshold_queries;
