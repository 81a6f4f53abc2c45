use std::fmt;
use std::time::Duration;

use serde::Deserialize;

/// Transport limits shared by every HTTP client in the pipeline.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

pub type RecordId = i64;

/// One item from the remote library, as served by ListData.svc.
///
/// `body` is only populated by the per-item endpoint; the collection
/// endpoint may omit it. `path` is the server-relative folder of the item
/// and is used by the image-library pool variant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContentRecord {
    #[serde(rename = "Id")]
    pub id: RecordId,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "ContentType")]
    pub content_type: String,
    #[serde(rename = "WikiContent", default)]
    pub body: Option<String>,
    #[serde(rename = "Path", default)]
    pub path: Option<String>,
}

/// Resolved image metadata: where it came from, what it is, and its
/// base64-encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub path: String,
    pub content_type: String,
    pub content_base64: String,
}

impl ImageDescriptor {
    /// Inline form suitable for an `<img src>` attribute.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.content_type, self.content_base64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Decode,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Decode => write!(f, "malformed payload"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
