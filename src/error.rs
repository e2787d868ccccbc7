use thiserror::Error;

#[derive(Error, Debug)]
pub enum VecGraphError {
    #[error("API request failed: {0}")]
    ApiRequest(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Graph database error: {0}")]
    Database(#[from] neo4rs::Error),

    #[error("Could not decode result row: {0}")]
    RowDecode(String),

    #[error("Unsupported query for this graph backend: {0}")]
    UnsupportedQuery(String),

    #[error("Invalid query parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, VecGraphError>;
