//! Inbound request handling: parameter extraction, component dispatch and
//! translation of results into HTTP responses.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{ALLOW, CONTENT_TYPE, HeaderValue};
use hyper::{Method, Response, StatusCode};
use serde::Serialize;
use tracing::{error, info};
use url::form_urlencoded;

use topic_annotator_shared::{AnnotationWriter, TopicAnnotatorError, TopicCreator};

use crate::metrics::HttpMetrics;

/// Content type of the `/__metrics` exposition.
const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Content type of every JSON response.
const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

pub const MISSING_PREF_LABEL: &str = "Missing or empty query parameter prefLabel.";
pub const MISSING_CONTENT_UUIDS: &str = "Missing or empty query parameter contentUUIDs.";
pub const MISSING_CONCEPT_UUID: &str = "Missing or empty query parameter conceptUUID.";

pub type HttpResponse = Response<Full<Bytes>>;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Identity reported by the operational endpoints.
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub system_code: String,
    pub name: String,
    pub description: String,
}

/// Everything a request handler needs; shared read-only across connections.
pub struct AppState {
    pub topics: Arc<dyn TopicCreator>,
    pub annotations: Arc<dyn AnnotationWriter>,
    pub info: ServiceInfo,
    pub metrics: HttpMetrics,
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct MessageBody<'a> {
    message: &'a str,
}

#[derive(Serialize)]
struct TopicCreatedBody<'a> {
    #[serde(rename = "conceptUUID")]
    concept_uuid: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthBody<'a> {
    schema_version: u32,
    system_code: &'a str,
    name: &'a str,
    description: &'a str,
    checks: Vec<serde_json::Value>,
    ok: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BuildInfoBody<'a> {
    version: &'a str,
    system_code: &'a str,
    name: &'a str,
}

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

/// Decoded query string keeping every value of repeated keys.
#[derive(Debug, Default)]
pub struct QueryParams(HashMap<String, Vec<String>>);

impl QueryParams {
    pub fn parse(query: Option<&str>) -> Self {
        let mut params: HashMap<String, Vec<String>> = HashMap::new();
        if let Some(q) = query {
            for (k, v) in form_urlencoded::parse(q.as_bytes()) {
                params.entry(k.into_owned()).or_default().push(v.into_owned());
            }
        }
        Self(params)
    }

    /// The first value of `key`, if present and non-empty.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Every non-empty value of `key`, in request order.
    pub fn all(&self, key: &str) -> Vec<String> {
        self.0
            .get(key)
            .map(|values| values.iter().filter(|v| !v.is_empty()).cloned().collect())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Dispatch a request to the matching handler and record it in the metrics.
pub async fn route(state: &AppState, method: &Method, path: &str, query: Option<&str>) -> HttpResponse {
    let start = Instant::now();
    let response = dispatch(state, method, path, query).await;
    state
        .metrics
        .observe(method.as_str(), path, response.status().as_u16(), start.elapsed());
    response
}

async fn dispatch(state: &AppState, method: &Method, path: &str, query: Option<&str>) -> HttpResponse {
    match (method, path) {
        (&Method::PUT, "/topic") => create_topic(state, &QueryParams::parse(query)).await,
        (&Method::PUT, "/annotations") => send_annotations(state, &QueryParams::parse(query)).await,
        (&Method::GET, "/__health") => health(&state.info),
        (&Method::GET, "/__gtg") => text_response(StatusCode::OK, "OK"),
        (&Method::GET, "/__build-info") => build_info(&state.info),
        (&Method::GET, "/__metrics") => metrics(&state.metrics),
        (_, "/topic" | "/annotations") => method_not_allowed("PUT"),
        (_, "/__health" | "/__gtg" | "/__build-info" | "/__metrics") => method_not_allowed("GET"),
        _ => json_message(StatusCode::NOT_FOUND, "Not found"),
    }
}

/// `PUT /topic?prefLabel=...`
async fn create_topic(state: &AppState, params: &QueryParams) -> HttpResponse {
    let Some(pref_label) = params.first("prefLabel") else {
        return bad_request(MISSING_PREF_LABEL);
    };

    match state.topics.create_topic(pref_label).await {
        Ok(concept_uuid) => {
            info!(%concept_uuid, pref_label, "topic created");
            json_response(
                StatusCode::OK,
                &TopicCreatedBody {
                    concept_uuid: &concept_uuid,
                },
            )
        }
        Err(e) => internal_error(&e),
    }
}

/// `PUT /annotations?conceptUUID=...&contentUUID=...&contentUUID=...`
async fn send_annotations(state: &AppState, params: &QueryParams) -> HttpResponse {
    let content_uuids = params.all("contentUUID");
    if content_uuids.is_empty() {
        return bad_request(MISSING_CONTENT_UUIDS);
    }
    let Some(concept_uuid) = params.first("conceptUUID") else {
        return bad_request(MISSING_CONCEPT_UUID);
    };

    match state
        .annotations
        .write_annotations(concept_uuid, &content_uuids)
        .await
    {
        Ok(()) => json_message(
            StatusCode::OK,
            &format!("Sent annotations to PAC for concept UUID: {concept_uuid}"),
        ),
        Err(e) => internal_error(&e),
    }
}

fn health(info: &ServiceInfo) -> HttpResponse {
    json_response(
        StatusCode::OK,
        &HealthBody {
            schema_version: 1,
            system_code: &info.system_code,
            name: &info.name,
            description: &info.description,
            checks: Vec::new(),
            ok: true,
        },
    )
}

fn build_info(info: &ServiceInfo) -> HttpResponse {
    json_response(
        StatusCode::OK,
        &BuildInfoBody {
            version: env!("CARGO_PKG_VERSION"),
            system_code: &info.system_code,
            name: &info.name,
        },
    )
}

fn metrics(metrics: &HttpMetrics) -> HttpResponse {
    match metrics.encode_text() {
        Ok(text) => Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, METRICS_CONTENT_TYPE)
            .body(Full::new(Bytes::from(text)))
            .unwrap_or_else(|_| Response::new(Full::new(Bytes::from_static(b"internal error")))),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            json_message(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn bad_request(message: &str) -> HttpResponse {
    json_message(StatusCode::BAD_REQUEST, message)
}

fn internal_error(err: &TopicAnnotatorError) -> HttpResponse {
    if err.is_bad_request() {
        return bad_request(&err.to_string());
    }
    error!(error = %err, "request failed");
    json_message(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
}

fn method_not_allowed(allow: &'static str) -> HttpResponse {
    let mut response = json_message(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static(allow));
    response
}

fn json_message(status: StatusCode, message: &str) -> HttpResponse {
    json_response(status, &MessageBody { message })
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> HttpResponse {
    let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{\"message\":\"serialize\"}".to_vec());
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from_static(b"{\"message\":\"internal\"}"))))
}

fn text_response(status: StatusCode, body: &'static str) -> HttpResponse {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from_static(b"internal error"))))
}
