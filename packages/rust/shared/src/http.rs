//! Signed outbound requests and their classification.
//!
//! Every call to Smartlogic or PAC goes through [`send_signed`]: it sets the
//! credential, trace and content-type headers, executes the request and
//! decides success. A call succeeds only when the transport did not fail and
//! the remote status is at most 202; every other outcome becomes a
//! [`TopicAnnotatorError::RemoteWriteFailed`] carrying the response body.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use tracing::{debug, error};

use crate::config::HttpConfig;
use crate::error::{RemoteStatus, Result, TopicAnnotatorError};
use crate::types::TransactionId;

/// Header carrying PAC API keys.
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Header carrying the transaction id.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Highest remote status still treated as success.
pub const MAX_ACCEPTED_STATUS: u16 = 202;

/// User-Agent string for outbound requests.
const USER_AGENT: &str = concat!("TopicAnnotator/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Request description
// ---------------------------------------------------------------------------

/// How a request authenticates against the remote system.
#[derive(Debug, Clone, Copy)]
pub enum Credential<'a> {
    /// Sent as `X-Api-Key` (PAC).
    ApiKey(&'a str),
    /// Sent verbatim as `Authorization` (Smartlogic).
    Authorization(&'a str),
}

/// An encoded request body and its content type.
#[derive(Debug, Clone)]
pub struct Payload {
    content_type: &'static str,
    bytes: Vec<u8>,
}

impl Payload {
    /// Serialize `value` as JSON, labelled with `content_type`.
    pub fn json<T: Serialize>(content_type: &'static str, value: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| TopicAnnotatorError::Serialization(e.to_string()))?;
        Ok(Self {
            content_type,
            bytes,
        })
    }
}

/// A single outbound call.
#[derive(Debug)]
pub struct SignedRequest<'a> {
    pub method: Method,
    pub url: &'a str,
    pub credential: Credential<'a>,
    pub transaction_id: &'a TransactionId,
    /// Concept or content UUID the call is about, for diagnostics.
    pub subject: &'a str,
    pub body: Option<Payload>,
}

// ---------------------------------------------------------------------------
// Client and execution
// ---------------------------------------------------------------------------

/// Build the shared HTTP client.
///
/// Redirects are not followed: a 3xx answer is a failure like any other
/// status above 202.
pub fn build_client(config: &HttpConfig) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| TopicAnnotatorError::config(format!("failed to build HTTP client: {e}")))
}

/// Whether a remote status counts as success.
pub fn is_accepted(status: StatusCode) -> bool {
    status.as_u16() <= MAX_ACCEPTED_STATUS
}

/// Execute `request` and return the response body on success.
pub async fn send_signed(client: &Client, request: SignedRequest<'_>) -> Result<String> {
    let SignedRequest {
        method,
        url,
        credential,
        transaction_id,
        subject,
        body,
    } = request;

    let mut builder = client
        .request(method.clone(), url)
        .header(REQUEST_ID_HEADER, transaction_id.as_str());

    builder = match credential {
        Credential::ApiKey(key) => builder.header(API_KEY_HEADER, key),
        Credential::Authorization(value) => builder.header(AUTHORIZATION, value),
    };

    if let Some(payload) = body {
        builder = builder
            .header(CONTENT_TYPE, payload.content_type)
            .body(payload.bytes);
    }

    debug!(%method, url, %transaction_id, subject, "sending request");

    let response = match builder.send().await {
        Ok(response) => response,
        Err(e) => {
            let err =
                TopicAnnotatorError::remote(url, RemoteStatus::Transport(e.to_string()), subject, "");
            error!(uuid = subject, %transaction_id, error = %err, "request failed");
            return Err(err);
        }
    };

    let status = response.status();
    let text = response.text().await;

    if !is_accepted(status) {
        let body = text.unwrap_or_else(|e| format!("<unreadable body: {e}>"));
        let err =
            TopicAnnotatorError::remote(url, RemoteStatus::Http(status.as_u16()), subject, body);
        error!(uuid = subject, %transaction_id, status = status.as_u16(), error = %err, "request rejected");
        return Err(err);
    }

    debug!(url, status = status.as_u16(), "request accepted");

    text.map_err(|e| {
        TopicAnnotatorError::remote(
            url,
            RemoteStatus::Transport(format!("failed to read body: {e}")),
            subject,
            "",
        )
    })
}
