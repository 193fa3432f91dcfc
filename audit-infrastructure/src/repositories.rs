pub mod clickhouse_repo;
pub mod threshold_files;

pub use clickhouse_repo::*;
pub use threshold_files::*;
