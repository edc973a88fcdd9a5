//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests, including:
//! - Building the shared HTTP client with the configured user agent and timeout
//! - GET requests returning a classified [`FetchResult`]
//! - Conversion of non-success results into errors for callers that need a body

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::ScoutError;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// The server answered with a non-success status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, body read failure)
    NetworkError {
        /// Error description
        error: String,
        /// Whether the request timed out
        timed_out: bool,
    },
}

impl FetchResult {
    /// Converts the result into `(final_url, body)` or an error naming `url`
    pub fn into_body(self, url: &str) -> Result<(String, String), ScoutError> {
        match self {
            Self::Success {
                final_url, body, ..
            } => Ok((final_url, body)),
            Self::HttpError { status_code } => Err(ScoutError::HttpStatus {
                url: url.to_string(),
                status: status_code,
            }),
            Self::NetworkError {
                timed_out: true, ..
            } => Err(ScoutError::Timeout {
                url: url.to_string(),
            }),
            Self::NetworkError { error, .. } => Err(ScoutError::Network {
                url: url.to_string(),
                message: error,
            }),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// Every request carries the configured user agent and the per-request
/// timeout, so one unresponsive site cannot stall a worker indefinitely.
///
/// # Example
///
/// ```no_run
/// use edition_scout::config::{CrawlerConfig, UserAgentConfig};
/// use edition_scout::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), &CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_secs(crawler.request_timeout_secs);

    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and classifies the outcome
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx | `Success` with the body |
/// | Any other status | `HttpError` |
/// | Timeout | `NetworkError { timed_out: true }` |
/// | Connection / body failure | `NetworkError { timed_out: false }` |
///
/// No retry happens here; retrying is the dispatcher's job.
pub async fn fetch_url(client: &Client, url: &str) -> FetchResult {
    tracing::debug!("GET {}", url);

    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return classify_error(e),
    };

    let status = response.status();
    let final_url = response.url().to_string();

    if !status.is_success() {
        if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!("Rate limited by {}", url);
        }
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    match response.text().await {
        Ok(body) => FetchResult::Success {
            final_url,
            status_code: status.as_u16(),
            body,
        },
        Err(e) => classify_error(e),
    }
}

fn classify_error(e: reqwest::Error) -> FetchResult {
    if e.is_timeout() {
        FetchResult::NetworkError {
            error: "Request timeout".to_string(),
            timed_out: true,
        }
    } else if e.is_connect() {
        FetchResult::NetworkError {
            error: format!("Connection failed: {}", e),
            timed_out: false,
        }
    } else {
        FetchResult::NetworkError {
            error: e.to_string(),
            timed_out: false,
        }
    }
}
