use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("bad request: {0}")]
    BadRequest(String),
    /// A ledger or anomaly store operation failed. Read failures abort the
    /// run; threshold-file failures abort the update.
    #[error("audit store error: {0}")]
    Store(#[source] anyhow::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
