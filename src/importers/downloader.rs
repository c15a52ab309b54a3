use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::fetch_error::FetchError;

/// Some government hosts reject requests without a browser user agent
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Downloader for the spreadsheet and CSV sources.
///
/// Single attempt per call with a bounded timeout; retry policy belongs to
/// the caller.
#[derive(Clone)]
pub struct SourceDownloader {
    client: Client,
}

impl SourceDownloader {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// Download a payload, returning its raw bytes
    #[instrument(skip(self))]
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        info!("Downloading {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(url, e))?;

        let status = response.status();
        debug!("Received HTTP response with status: {}", status);

        if status.is_success() {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| request_error(url, e))?;
            debug!("Downloaded {url} ({} bytes)", bytes.len());
            Ok(bytes.to_vec())
        } else if status.as_u16() == 404 {
            Err(FetchError::NotFound(url.to_string()))
        } else if status.is_server_error() {
            Err(FetchError::ServerError {
                status: status.as_u16(),
                url: url.to_string(),
            })
        } else {
            Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            })
        }
    }
}

fn request_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else {
        FetchError::Request(error)
    }
}
