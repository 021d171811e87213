use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};

/// How the host classified the response it received.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response with full access to status and body.
    #[default]
    Basic,
    Cors,
    /// Cross-origin no-cors response; status and body are hidden.
    Opaque,
    Error,
}

/// A response as seen by the router. Stored copies are immutable; a cache
/// update replaces the whole value.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub response_type: ResponseType,
    pub url: Option<String>,
}

impl FetchResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
            response_type: ResponseType::Basic,
            url: None,
        }
    }

    pub fn with_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn is_opaque(&self) -> bool {
        self.response_type == ResponseType::Opaque
    }
}
