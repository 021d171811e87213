//! Network access for real hosts.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;

use crate::{
    core::{Network, WorkerError, WorkerResult},
    fetch::{FetchRequest, FetchResponse, Origin, ResponseType},
};

/// `Network` backed by a `reqwest` client.
///
/// Responses from the configured origin are `basic`; anything else is
/// reported as `cors`. No timeout is applied; a hung request only holds up
/// its own response.
pub struct HttpNetwork {
    http: Client,
    origin: Origin,
}

impl HttpNetwork {
    pub fn new(origin: Origin) -> WorkerResult<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| WorkerError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, origin })
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &FetchRequest) -> WorkerResult<FetchResponse> {
        let response = self
            .http
            .request(request.method.clone(), request.url.to_string())
            .headers(request.headers.clone())
            .body(request.body.clone())
            .send()
            .await?;

        let status = response.status();
        let final_url = response.url().to_string();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        let response_type = if self.origin.contains(&final_url) {
            ResponseType::Basic
        } else {
            ResponseType::Cors
        };

        debug!(
            "fetched {} {} -> {} ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            body.len()
        );

        Ok(FetchResponse {
            status,
            headers,
            body,
            response_type,
            url: Some(final_url),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use http::StatusCode;

    use super::*;
    use crate::testing::init_logger;

    /// Serve one canned HTTP response on a loopback port.
    fn serve_once(reply: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                let _ = stream.write_all(reply.as_bytes());
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_fetch_same_origin_is_basic() {
        init_logger();
        let base = serve_once("HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok");
        let network = HttpNetwork::new(Origin::parse(&base).unwrap()).unwrap();

        let request = FetchRequest::get(&format!("{base}/app.js")).unwrap();
        let response = network.fetch(&request).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(&response.body[..], b"ok");
        assert_eq!(response.response_type, ResponseType::Basic);
    }

    #[tokio::test]
    async fn test_fetch_refused_connection_is_network_error() {
        init_logger();
        let addr = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let network = HttpNetwork::new(Origin::parse("https://app.test").unwrap()).unwrap();

        let request = FetchRequest::get(&format!("http://{addr}/app.js")).unwrap();
        let err = network.fetch(&request).await.unwrap_err();
        assert!(matches!(err, WorkerError::Network(_)));
    }
}
