//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the mirror, including:
//! - Building the HTTP client with the configured user agent and timeout
//! - Manual redirect handling with loop detection
//! - Buffered page fetches and streamed resource fetches
//! - Error classification into per-URL failure reasons

use crate::state::FailureReason;
use reqwest::{header, redirect::Policy, Client, Response, StatusCode};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Maximum redirect hops followed for one request
pub const MAX_REDIRECTS: usize = 10;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Failure of a single fetch
///
/// Never retried: the caller records the URL as failed and moves on.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status}")]
    Http { status: u16 },

    #[error("{0}")]
    Network(#[from] reqwest::Error),

    #[error("{0}")]
    Redirect(String),
}

impl FetchError {
    /// Classifies the error for the URL's recorded resolution
    pub fn to_failure_reason(&self) -> FailureReason {
        match self {
            Self::Http { status } => FailureReason::Http(*status),
            Self::Network(e) => FailureReason::Network(describe_network_error(e)),
            Self::Redirect(msg) => FailureReason::Redirect(msg.clone()),
        }
    }
}

fn describe_network_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}

/// A successful (2xx) response whose body has not been read yet
#[derive(Debug)]
pub struct FetchedResponse {
    /// URL after following redirects
    pub final_url: Url,
    pub response: Response,
}

impl FetchedResponse {
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    /// Declared Content-Type, lowercased, without parameters
    pub fn content_type(&self) -> Option<String> {
        content_type_of(&self.response)
    }
}

/// A successful page fetch with its body buffered in memory
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub final_url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    /// Raw body bytes, saved to disk unchanged
    pub body: Vec<u8>,
}

impl FetchedPage {
    /// Lossy UTF-8 view of the body used for parsing
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn content_type_of(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            v.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
        .filter(|v| !v.is_empty())
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are disabled on the client so the [`Fetcher`] can observe every hop.
///
/// # Example
///
/// ```no_run
/// use site_mirror::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client("MirrorBot/1.0", Duration::from_secs(20)).unwrap();
/// ```
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Issues GET requests and follows redirects by hand
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds the client and wraps it
    pub fn from_settings(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(user_agent, timeout)?))
    }

    /// Fetches `url`, following up to [`MAX_REDIRECTS`] redirects
    ///
    /// # Request Flow
    ///
    /// 1. Send GET with redirects disabled
    /// 2. On 3xx, resolve `Location` against the current URL and repeat
    ///    - A hop to a different host is logged as a warning
    ///    - Revisiting a URL in the chain is a loop
    /// 3. Any terminal status outside 2xx is [`FetchError::Http`]
    ///
    /// The body is left unread so resources can be streamed to disk.
    pub async fn fetch(&self, url: &Url) -> Result<FetchedResponse, FetchError> {
        let mut current = url.clone();
        let mut visited: HashSet<Url> = HashSet::new();
        visited.insert(current.clone());

        for _ in 0..=MAX_REDIRECTS {
            let response = self.client.get(current.clone()).send().await?;
            let status = response.status();

            if status.is_redirection() {
                let next = redirect_target(&current, &response).ok_or(FetchError::Http {
                    status: status.as_u16(),
                })?;

                if next.host_str() != current.host_str() {
                    warn!("Redirect leaves host: {} -> {}", current, next);
                } else {
                    debug!("Redirect {} -> {}", current, next);
                }

                if !visited.insert(next.clone()) {
                    return Err(FetchError::Redirect(format!("redirect loop at {}", next)));
                }
                current = next;
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::Http {
                    status: status.as_u16(),
                });
            }

            return Ok(FetchedResponse {
                final_url: current,
                response,
            });
        }

        Err(FetchError::Redirect(format!(
            "more than {} redirects from {}",
            MAX_REDIRECTS, url
        )))
    }

    /// Fetches a page and buffers its body
    pub async fn fetch_page(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let fetched = self.fetch(url).await?;
        let status = fetched.status().as_u16();
        let content_type = fetched.content_type();
        let body = fetched.response.bytes().await?.to_vec();

        Ok(FetchedPage {
            final_url: fetched.final_url,
            status,
            content_type,
            body,
        })
    }
}

fn redirect_target(current: &Url, response: &Response) -> Option<Url> {
    let location = response
        .headers()
        .get(header::LOCATION)?
        .to_str()
        .ok()?
        .trim();
    if location.is_empty() {
        return None;
    }
    let mut next = current.join(location).ok()?;
    next.set_fragment(None);
    Some(next)
}
