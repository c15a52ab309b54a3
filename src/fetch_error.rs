#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("File not found (404): {0}")]
    NotFound(String),
    #[error("Server error {status} while downloading {url}")]
    ServerError { status: u16, url: String },
    #[error("Unexpected HTTP status {status} while downloading {url}")]
    Status { status: u16, url: String },
}
