//! Synthesized responses.
//!
//! The worker never builds responses by hand elsewhere; anything that is not
//! a network or stored response comes from here.

use bytes::Bytes;
use http::{header, HeaderValue, StatusCode};

use crate::fetch::{FetchResponse, ResponseType};

/// Standard content types
pub mod content_type {
    pub const TEXT_PLAIN: &str = "text/plain";
    pub const APPLICATION_JSON: &str = "application/json";
}

/// Body of the synthesized offline response
pub const OFFLINE_BODY: &str = "Offline";

pub struct ResponseBuilder;

impl ResponseBuilder {
    /// A response with an optional content type.
    pub fn with_body(status: StatusCode, body: Bytes, content_type: Option<&str>) -> FetchResponse {
        let mut response = FetchResponse::new(status, body).with_type(ResponseType::Basic);

        if let Some(ct) = content_type {
            match HeaderValue::from_str(ct) {
                Ok(header_value) => {
                    response.headers.insert(header::CONTENT_TYPE, header_value);
                }
                Err(e) => {
                    log::error!("Invalid content type '{}': {}", ct, e);
                }
            }
        }

        response
            .headers
            .insert(header::CONTENT_LENGTH, HeaderValue::from(response.body.len()));
        response
    }

    pub fn text(status: StatusCode, message: &str) -> FetchResponse {
        Self::with_body(
            status,
            Bytes::copy_from_slice(message.as_bytes()),
            Some(content_type::TEXT_PLAIN),
        )
    }

    /// `503 Service Unavailable` returned when neither the network nor the
    /// store can satisfy a request.
    pub fn offline() -> FetchResponse {
        Self::text(StatusCode::SERVICE_UNAVAILABLE, OFFLINE_BODY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_response() {
        let response = ResponseBuilder::offline();
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.status.canonical_reason(), Some("Service Unavailable"));
        assert_eq!(&response.body[..], b"Offline");
        assert_eq!(
            response.headers.get(header::CONTENT_TYPE).unwrap(),
            content_type::TEXT_PLAIN
        );
        assert_eq!(response.headers.get(header::CONTENT_LENGTH).unwrap(), "7");
    }
}
