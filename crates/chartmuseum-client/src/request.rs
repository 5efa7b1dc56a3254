//! Request construction
//!
//! An [`ApiRequest`] is a fully resolved, replayable description of one API
//! call. The transport materializes it into a fresh `reqwest` request on every
//! attempt, so a file body is reopened and resent in full after a retry.

use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde_json::Value;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::cancel::CancelToken;
use crate::error::{ClientError, Result};
use crate::redact::sanitize_url;
use crate::sniff;

/// Media type accepted from the server
pub const MEDIA_TYPE: &str = "application/vnd.chartmuseum.v0+json";

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Request payload
#[derive(Debug, Clone, Default)]
pub enum Body {
    #[default]
    None,
    /// Sent as JSON, or as query parameters for GET and HEAD
    Json(Value),
    /// Streamed from disk
    File(PathBuf),
}

/// Per-request settings, applied in order
#[derive(Debug, Clone)]
pub enum RequestOption {
    Cancel(CancelToken),
    Timeout(Duration),
    ContentType(String),
    ContentLength(u64),
    Header(String, String),
}

#[derive(Debug, Clone)]
pub(crate) enum RequestBody {
    Empty,
    Bytes(Vec<u8>),
    File { path: PathBuf, len: u64 },
}

/// A resolved request, ready for dispatch
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub(crate) method: Method,
    pub(crate) url: Url,
    pub(crate) headers: HeaderMap,
    pub(crate) body: RequestBody,
    pub(crate) cancel: Option<CancelToken>,
    pub(crate) timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn cancel_token(&self) -> Option<&CancelToken> {
        self.cancel.as_ref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Path of the file streamed as body, if any
    pub fn file(&self) -> Option<&Path> {
        match &self.body {
            RequestBody::File { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Encoded body bytes for in-memory bodies
    pub fn body_bytes(&self) -> Option<&[u8]> {
        match &self.body {
            RequestBody::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Resolve `path` against `base` and build the request
pub(crate) fn build(
    base: &Url,
    user_agent: &str,
    method: Method,
    path: &str,
    body: Body,
    options: &[RequestOption],
) -> Result<ApiRequest> {
    if !base.path().ends_with('/') {
        return Err(ClientError::config(format!(
            "base URL must have a trailing slash, but {} does not",
            sanitize_url(base)
        )));
    }

    // A leading '/' would discard the base path prefix
    let mut url = base
        .join(path.trim_start_matches('/'))
        .map_err(|e| ClientError::InvalidBaseUrl {
            url: format!("{}{}", sanitize_url(base), path),
            reason: e.to_string(),
        })?;

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(MEDIA_TYPE));
    headers.insert(USER_AGENT, header_value(user_agent)?);

    let explicit_content_type = options
        .iter()
        .any(|o| matches!(o, RequestOption::ContentType(_)));

    let body = match body {
        Body::None => RequestBody::Empty,
        Body::Json(value) if method == Method::GET || method == Method::HEAD => {
            encode_query(&mut url, &value)?;
            RequestBody::Empty
        }
        Body::Json(value) => {
            let bytes = serde_json::to_vec(&value)?;
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
            headers.insert(CONTENT_LENGTH, HeaderValue::from(bytes.len() as u64));
            RequestBody::Bytes(bytes)
        }
        Body::File(path) => {
            let (len, sniffed) = inspect_file(&path, !explicit_content_type)?;
            if let Some(mime) = sniffed {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(mime));
            }
            headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
            RequestBody::File { path, len }
        }
    };

    let mut request = ApiRequest {
        method,
        url,
        headers,
        body,
        cancel: None,
        timeout: None,
    };

    for option in options {
        apply_option(&mut request, option)?;
    }

    Ok(request)
}

fn apply_option(request: &mut ApiRequest, option: &RequestOption) -> Result<()> {
    match option {
        RequestOption::Cancel(token) => request.cancel = Some(token.clone()),
        RequestOption::Timeout(timeout) => request.timeout = Some(*timeout),
        RequestOption::ContentType(value) => {
            request.headers.insert(CONTENT_TYPE, header_value(value)?);
        }
        RequestOption::ContentLength(len) => {
            request.headers.insert(CONTENT_LENGTH, HeaderValue::from(*len));
        }
        RequestOption::Header(name, value) => {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| ClientError::Encode {
                message: format!("invalid header name '{}': {}", name, e),
            })?;
            request.headers.insert(name, header_value(value)?);
        }
    }
    Ok(())
}

/// The value itself stays out of the error, it may be a credential
fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| ClientError::Encode {
        message: format!("invalid header value: {}", e),
    })
}

/// Check an upload source and optionally sniff its content type
fn inspect_file(path: &Path, sniff: bool) -> Result<(u64, Option<&'static str>)> {
    let unreadable = |source| ClientError::UnreadableFile {
        path: path.display().to_string(),
        source,
    };

    let metadata = std::fs::metadata(path).map_err(unreadable)?;
    if metadata.is_dir() {
        return Err(ClientError::NotAFile {
            path: path.display().to_string(),
        });
    }

    let mime = if sniff {
        let mut file = File::open(path).map_err(unreadable)?;
        Some(sniff::sniff_reader(&mut file).map_err(unreadable)?)
    } else {
        None
    };

    Ok((metadata.len(), mime))
}

/// Flatten a JSON object into query parameters
///
/// Arrays repeat the key, nulls are skipped, nested objects are sent as JSON.
fn encode_query(url: &mut Url, value: &Value) -> Result<()> {
    let fields = match value {
        Value::Null => return Ok(()),
        Value::Object(fields) => fields,
        other => {
            return Err(ClientError::Encode {
                message: format!("query parameters must be a JSON object, got {}", json_kind(other)),
            });
        }
    };

    let mut pairs = Vec::new();
    for (key, value) in fields {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                pairs.extend(items.iter().filter_map(query_value).map(|v| (key.as_str(), v)));
            }
            other => pairs.extend(query_value(other).map(|v| (key.as_str(), v))),
        }
    }

    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs);
    }
    Ok(())
}

fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
