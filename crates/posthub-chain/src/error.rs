use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    /// The node could not be reached or answered garbage.
    #[error("RPC transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("RPC endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("unexpected RPC response: {0}")]
    InvalidResponse(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("no signing key configured")]
    MissingSigner,

    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    #[error("no contract code at {0}")]
    NoContract(String),

    #[error("transaction {0} not confirmed after {1} attempts")]
    ReceiptTimeout(String, u32),

    #[error("ABI decode error: {0}")]
    Decode(String),
}

pub type ChainResult<T> = Result<T, ChainError>;
