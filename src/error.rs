use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LCD API responded with {status} for {url}")]
    Api { status: u16, url: String },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown chain ticker: {0}")]
    UnknownChain(String),

    #[error("Unknown export format: {0}")]
    UnknownFormat(String),

    #[error("Address {address} is not a valid {prefix} wallet address")]
    InvalidWallet { address: String, prefix: String },

    #[error("Transaction not found: {0}")]
    TxNotFound(String),

    #[error("Invalid timestamp {value}: {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("Malformed transaction {txid}: {reason}")]
    MalformedTx { txid: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
