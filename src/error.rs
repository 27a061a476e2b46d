use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("insufficient fee: paid {paid}, minimum is {minimum}")]
    InsufficientFee {
        paid: rust_decimal::Decimal,
        minimum: rust_decimal::Decimal,
    },
    #[error("duplicate request id {0}")]
    DuplicateRequest(String),
    #[error("unknown request id {0}")]
    UnknownRequest(String),
    #[error("request {0} was already fulfilled")]
    AlreadyFulfilled(String),
    #[error("timed out waiting for request {0}")]
    RequestTimeout(String),
    #[error("fee {fee} would overflow the treasury balance {balance}")]
    FeeOverflow {
        balance: rust_decimal::Decimal,
        fee: rust_decimal::Decimal,
    },
    #[error("{0} is not allowed to withdraw")]
    Unauthorized(String),
    #[error("oracle error: {0}")]
    Oracle(String),
    #[error("validation error: {0}")]
    ValidationError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
