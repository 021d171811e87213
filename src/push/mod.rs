//! Push subscription renewal.

use std::collections::BTreeMap;
use std::sync::Arc;

use http::{header, HeaderValue, Method};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    core::{Network, PushManager, WorkerError, WorkerResult},
    fetch::FetchRequest,
    utils::response::content_type,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionOptions {
    pub user_visible_only: bool,
    pub application_server_key: Option<String>,
}

impl Default for SubscriptionOptions {
    fn default() -> Self {
        Self {
            user_visible_only: true,
            application_server_key: None,
        }
    }
}

/// A push subscription, serialized the way the remote endpoint expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    pub endpoint: String,
    pub expiration_time: Option<u64>,
    #[serde(default)]
    pub keys: BTreeMap<String, String>,
    #[serde(skip)]
    pub options: SubscriptionOptions,
}

/// Re-subscribes when the host rotates or revokes a subscription and hands
/// the new one to the application server. Nothing is retried.
pub struct PushSubscriptionRenewer {
    endpoint: Option<String>,
    push_manager: Arc<dyn PushManager>,
    network: Arc<dyn Network>,
}

impl PushSubscriptionRenewer {
    pub fn new(
        endpoint: Option<String>,
        push_manager: Arc<dyn PushManager>,
        network: Arc<dyn Network>,
    ) -> Self {
        Self {
            endpoint,
            push_manager,
            network,
        }
    }

    pub async fn renew(&self, old: Option<&PushSubscription>) -> WorkerResult<PushSubscription> {
        let options = old.map(|s| s.options.clone()).unwrap_or_default();
        let subscription = self.push_manager.subscribe(&options).await?;
        info!("Push subscription renewed: {}", subscription.endpoint);

        match &self.endpoint {
            Some(endpoint) => self.forward(endpoint, &subscription).await?,
            None => warn!("No subscription endpoint configured, renewed subscription not forwarded"),
        }
        Ok(subscription)
    }

    async fn forward(&self, endpoint: &str, subscription: &PushSubscription) -> WorkerResult<()> {
        let body = serde_json::to_vec(subscription)?;
        let mut request = FetchRequest::new(Method::POST, endpoint)?.with_body(body);
        request.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(content_type::APPLICATION_JSON),
        );

        let response = self.network.fetch(&request).await?;
        if !response.status.is_success() {
            return Err(WorkerError::Http {
                url: endpoint.to_string(),
                status: response.status,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_json_shape() {
        let mut keys = BTreeMap::new();
        keys.insert("p256dh".to_string(), "key".to_string());
        keys.insert("auth".to_string(), "secret".to_string());
        let sub = PushSubscription {
            endpoint: "https://push.test/abc".to_string(),
            expiration_time: None,
            keys,
            options: SubscriptionOptions::default(),
        };

        let json = serde_json::to_value(&sub).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "endpoint": "https://push.test/abc",
                "expirationTime": null,
                "keys": {"auth": "secret", "p256dh": "key"}
            })
        );
    }
}
