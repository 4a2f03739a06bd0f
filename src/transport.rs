use async_trait::async_trait;
use reqwest::{Client, Url, header};
use std::time::Duration;

use crate::error::{ClientError, Result};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Raw reply from the scoring service. The status is informational only;
/// the body decides success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One POST of an already-encoded form body. Implementations return
/// [`ClientError::TransportFailure`] when no response was obtained.
#[async_trait]
pub trait ScoringTransport: Send + Sync {
    async fn post_form(&self, url: &Url, body: String) -> Result<TransportResponse>;
}

/// reqwest-backed transport.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// `timeout` of `None` leaves reqwest's defaults in place.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| ClientError::Config {
            message: format!("failed to build HTTP client: {}", e),
        })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ScoringTransport for HttpTransport {
    async fn post_form(&self, url: &Url, body: String) -> Result<TransportResponse> {
        let res = self
            .client
            .post(url.clone())
            .header(header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        let status = res.status().as_u16();
        let body = res.bytes().await?.to_vec();
        Ok(TransportResponse { status, body })
    }
}
