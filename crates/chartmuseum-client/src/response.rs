//! Response decoding
//!
//! Every call goes through [`decode`], which classifies the status, turns
//! failures into [`ApiError`]s with a flattened message and, on success,
//! delivers the body to a [`Destination`].

use std::io::Write;

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{ApiError, ClientError, Result};
use crate::redact::sanitize_url;
use crate::request::json_kind;

/// Header the server uses to ask for a one-time password
pub const HEADER_OTP: &str = "X-ChartMuseum-OTP";

/// Decoded response metadata
#[derive(Debug, Clone)]
pub struct Response {
    pub method: Method,
    /// Sanitized request URL
    pub url: String,
    pub status: StatusCode,
    pub headers: HeaderMap,

    pub message: Option<String>,
    pub error: Option<String>,
    pub saved: Option<bool>,
    pub deleted: Option<bool>,
    pub healthy: Option<bool>,

    /// Body of a 202; the result is not available yet
    pub accepted_body: Option<Vec<u8>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EnvelopeFields {
    message: Option<String>,
    error: Option<String>,
    saved: Option<bool>,
    deleted: Option<bool>,
    healthy: Option<bool>,
}

impl Response {
    fn new(method: Method, url: String, status: StatusCode, headers: HeaderMap) -> Self {
        Self {
            method,
            url,
            status,
            headers,
            message: None,
            error: None,
            saved: None,
            deleted: None,
            healthy: None,
            accepted_body: None,
        }
    }

    /// Pick up the well-known fields when the body is a JSON object of that shape
    fn absorb(&mut self, body: &[u8]) {
        if !body.trim_ascii_start().starts_with(b"{") {
            return;
        }
        if let Ok(fields) = serde_json::from_slice::<EnvelopeFields>(body) {
            self.message = fields.message;
            self.error = fields.error;
            self.saved = fields.saved;
            self.deleted = fields.deleted;
            self.healthy = fields.healthy;
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted_body.is_some()
    }

    /// Fail with [`ClientError::Accepted`] when the server only scheduled the work
    pub fn ready(self) -> Result<Self> {
        match self.accepted_body {
            Some(body) => Err(ClientError::Accepted { body }),
            None => Ok(self),
        }
    }
}

/// Anything a JSON body can be decoded into
pub trait JsonTarget {
    fn decode_json(&mut self, body: &[u8]) -> serde_json::Result<()>;
}

impl<T: DeserializeOwned> JsonTarget for T {
    fn decode_json(&mut self, body: &[u8]) -> serde_json::Result<()> {
        *self = serde_json::from_slice(body)?;
        Ok(())
    }
}

/// Where a successful body goes
pub enum Destination<'a> {
    /// Read and drop the body, keeping envelope fields
    Discard,
    /// Copy the body verbatim, chunk by chunk
    ///
    /// Writes happen inline on the async task, so the sink must be cheap: an
    /// in-memory buffer or a local file, never a socket or a pipe.
    Raw(&'a mut (dyn Write + Send)),
    /// Decode the body as JSON; an empty body leaves the target untouched
    Json(&'a mut (dyn JsonTarget + Send)),
}

/// Result of an existence check
#[derive(Debug)]
pub enum Probe {
    Found(Response),
    Missing(ClientError),
}

impl Probe {
    pub fn exists(&self) -> bool {
        matches!(self, Probe::Found(_))
    }

    pub fn error(&self) -> Option<&ClientError> {
        match self {
            Probe::Found(_) => None,
            Probe::Missing(err) => Some(err),
        }
    }

    pub fn into_result(self) -> Result<Response> {
        match self {
            Probe::Found(response) => Ok(response),
            Probe::Missing(err) => Err(err),
        }
    }
}

impl From<Result<Response>> for Probe {
    fn from(result: Result<Response>) -> Self {
        match result {
            Ok(response) => Probe::Found(response),
            Err(err) => Probe::Missing(err),
        }
    }
}

/// Statuses treated as success
pub fn is_success(status: StatusCode) -> bool {
    matches!(status.as_u16(), 200 | 201 | 202 | 204 | 304)
}

/// Classify a response and deliver its body
pub async fn decode(
    method: &Method,
    mut response: reqwest::Response,
    destination: Destination<'_>,
) -> Result<Response> {
    let status = response.status();
    let url = sanitize_url(response.url());
    debug!(method = %method, url = %url, status = status.as_u16(), "Received response");

    let mut envelope = Response::new(method.clone(), url, status, response.headers().clone());

    if !is_success(status) {
        return Err(error_for(envelope, response).await);
    }

    if status == StatusCode::ACCEPTED {
        let body = read_body(&envelope, response).await?;
        envelope.absorb(&body);
        envelope.accepted_body = Some(body);
        return Ok(envelope);
    }

    match destination {
        Destination::Discard => {
            let body = read_body(&envelope, response).await?;
            envelope.absorb(&body);
        }
        Destination::Raw(writer) => {
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| read_error(&envelope, e))?
            {
                writer.write_all(&chunk)?;
            }
            writer.flush()?;
        }
        Destination::Json(target) => {
            let body = read_body(&envelope, response).await?;
            envelope.absorb(&body);
            if !body.trim_ascii().is_empty() {
                target.decode_json(&body).map_err(|e| ClientError::Decode {
                    url: envelope.url.clone(),
                    message: e.to_string(),
                })?;
            }
        }
    }

    Ok(envelope)
}

async fn error_for(envelope: Response, response: reqwest::Response) -> ClientError {
    let method = envelope.method.to_string();

    if envelope.status == StatusCode::UNAUTHORIZED && otp_required(&envelope.headers) {
        return ClientError::TwoFactorRequired {
            method,
            url: envelope.url,
        };
    }

    let body = match read_body(&envelope, response).await {
        Ok(body) => body,
        Err(err) => return err,
    };

    ClientError::Api(ApiError {
        method,
        url: envelope.url,
        status: envelope.status.as_u16(),
        message: flatten_error_body(&body),
        body,
    })
}

fn otp_required(headers: &HeaderMap) -> bool {
    headers
        .get(HEADER_OTP)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().starts_with("required"))
}

async fn read_body(envelope: &Response, response: reqwest::Response) -> Result<Vec<u8>> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| read_error(envelope, e))?;
    Ok(bytes.to_vec())
}

fn read_error(envelope: &Response, error: reqwest::Error) -> ClientError {
    ClientError::Network {
        method: envelope.method.to_string(),
        url: envelope.url.clone(),
        message: format!("failed to read response body: {}", error.without_url()),
    }
}

/// Human-readable message for an error body
pub fn flatten_error_body(body: &[u8]) -> String {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => flatten_error(&value),
        Err(_) => "failed to parse unknown error format".to_string(),
    }
}

/// Flatten a JSON error payload
///
/// Strings are used as is, arrays become `[a, b]`, and objects become sorted
/// `{key: value}` entries joined with `, `.
pub fn flatten_error(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(flatten_error).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Object(fields) => {
            let mut parts: Vec<String> = fields
                .iter()
                .map(|(key, value)| format!("{{{}: {}}}", key, flatten_error(value)))
                .collect();
            parts.sort();
            parts.join(", ")
        }
        other => format!("failed to parse unexpected error type: {}", json_kind(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_string() {
        insta::assert_snapshot!(flatten_error(&json!("chart not found")), @"chart not found");
    }

    #[test]
    fn test_flatten_object_sorted() {
        let value = json!({"error": "improper constraint: 10.0.0", "code": "E404"});
        insta::assert_snapshot!(
            flatten_error(&value),
            @"{code: E404}, {error: improper constraint: 10.0.0}"
        );
    }

    #[test]
    fn test_flatten_nested() {
        let value = json!({"errors": ["file exists", {"detail": "mysql-1.0.0.tgz"}]});
        insta::assert_snapshot!(
            flatten_error(&value),
            @"{errors: [file exists, {detail: mysql-1.0.0.tgz}]}"
        );
    }

    #[test]
    fn test_flatten_unexpected_kinds() {
        insta::assert_snapshot!(flatten_error(&json!(42)), @"failed to parse unexpected error type: number");
        insta::assert_snapshot!(flatten_error(&json!(true)), @"failed to parse unexpected error type: bool");
        insta::assert_snapshot!(flatten_error(&json!(null)), @"failed to parse unexpected error type: null");
    }

    #[test]
    fn test_flatten_non_json_body() {
        insta::assert_snapshot!(flatten_error_body(b"<html>502 Bad Gateway</html>"), @"failed to parse unknown error format");
        insta::assert_snapshot!(flatten_error_body(b""), @"failed to parse unknown error format");
    }

    #[test]
    fn test_success_statuses() {
        for code in [200, 201, 202, 204, 304] {
            assert!(is_success(StatusCode::from_u16(code).unwrap()), "{code}");
        }
        for code in [203, 206, 301, 400, 401, 404, 429, 500] {
            assert!(!is_success(StatusCode::from_u16(code).unwrap()), "{code}");
        }
    }

    #[test]
    fn test_json_target_replaces_value() {
        let mut target: Vec<String> = vec!["stale".to_string()];
        target.decode_json(br#"["mysql", "redis"]"#).unwrap();
        assert_eq!(target, vec!["mysql", "redis"]);
    }

    #[test]
    fn test_otp_header() {
        let mut headers = HeaderMap::new();
        assert!(!otp_required(&headers));
        headers.insert(HEADER_OTP, "required; sms".parse().unwrap());
        assert!(otp_required(&headers));
        headers.insert(HEADER_OTP, "optional".parse().unwrap());
        assert!(!otp_required(&headers));
    }

    #[test]
    fn test_absorb_envelope_fields() {
        let mut response = Response::new(
            Method::POST,
            "https://charts.example.com/api/test/charts".to_string(),
            StatusCode::CREATED,
            HeaderMap::new(),
        );
        response.absorb(br#"{"saved": true}"#);
        assert_eq!(response.saved, Some(true));
        assert_eq!(response.deleted, None);

        // Bodies of other shapes leave the envelope alone
        response.absorb(br#"[1, 2, 3]"#);
        assert_eq!(response.saved, Some(true));
    }

    #[test]
    fn test_ready_surfaces_accepted() {
        let mut response = Response::new(
            Method::GET,
            "https://charts.example.com/api/test/charts".to_string(),
            StatusCode::ACCEPTED,
            HeaderMap::new(),
        );
        response.accepted_body = Some(b"{}".to_vec());
        assert!(response.is_accepted());
        let err = response.ready().unwrap_err();
        assert!(err.is_accepted());
    }
}
