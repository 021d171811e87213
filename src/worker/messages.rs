//! Messages exchanged with controlled pages.

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

/// Reply channel handed over with a message (the first transferred port).
pub type ReplyPort = UnboundedSender<WorkerMessage>;

/// Messages a page may post to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    SkipWaiting,
    GetVersion,
    WarmCache {
        #[serde(default)]
        urls: Vec<String>,
    },
}

impl ClientMessage {
    /// Parse posted data, `None` for anything unrecognised.
    pub fn parse(data: &serde_json::Value) -> Option<Self> {
        match serde_json::from_value(data.clone()) {
            Ok(message) => Some(message),
            Err(e) => {
                debug!("Unrecognised client message {data}: {e}");
                None
            }
        }
    }
}

/// Messages the worker posts to pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    VersionInfo {
        version: String,
        #[serde(rename = "cacheName")]
        cache_name: String,
    },
    SwUpdated {
        version: String,
    },
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_client_messages() {
        assert_eq!(
            ClientMessage::parse(&json!({"type": "SKIP_WAITING"})),
            Some(ClientMessage::SkipWaiting)
        );
        assert_eq!(
            ClientMessage::parse(&json!({"type": "GET_VERSION"})),
            Some(ClientMessage::GetVersion)
        );
        assert_eq!(
            ClientMessage::parse(&json!({"type": "WARM_CACHE", "urls": ["./a.css"]})),
            Some(ClientMessage::WarmCache {
                urls: vec!["./a.css".to_string()]
            })
        );
        assert_eq!(
            ClientMessage::parse(&json!({"type": "WARM_CACHE"})),
            Some(ClientMessage::WarmCache { urls: vec![] })
        );
    }

    #[test]
    fn test_parse_unknown_messages() {
        assert_eq!(ClientMessage::parse(&json!({"type": "PING"})), None);
        assert_eq!(ClientMessage::parse(&json!("SKIP_WAITING")), None);
        assert_eq!(ClientMessage::parse(&json!(null)), None);
    }

    #[test]
    fn test_worker_message_shape() {
        let info = WorkerMessage::VersionInfo {
            version: "1.2.0".to_string(),
            cache_name: "shell-v1".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            json!({"type": "VERSION_INFO", "version": "1.2.0", "cacheName": "shell-v1"})
        );

        let updated = WorkerMessage::SwUpdated {
            version: "1.2.0".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&updated).unwrap(),
            json!({"type": "SW_UPDATED", "version": "1.2.0"})
        );
    }
}
