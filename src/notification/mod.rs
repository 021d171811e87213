//! Push notification display and click handling.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    config::{self, Config},
    core::{ClientType, Clients, Notifier, WorkerResult},
    fetch::Origin,
};

pub const ACTION_VIEW: &str = "view";
pub const ACTION_DISMISS: &str = "dismiss";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    pub url: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOptions {
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
    pub tag: String,
    pub renotify: bool,
    pub require_interaction: bool,
}

/// Fields a push message may carry; anything missing falls back to the
/// configured defaults.
#[derive(Debug, Default, Deserialize)]
struct PushPayload {
    title: Option<String>,
    body: Option<String>,
    #[serde(alias = "iconRef")]
    icon: Option<String>,
    badge: Option<String>,
    url: Option<String>,
    actions: Option<Vec<NotificationAction>>,
}

fn parse_payload(data: Option<&[u8]>) -> PushPayload {
    let Some(data) = data else {
        return PushPayload::default();
    };
    match serde_json::from_slice::<PushPayload>(data) {
        Ok(payload) => payload,
        Err(e) => {
            info!("Push data is not a JSON object, using default notification: {e}");
            PushPayload::default()
        }
    }
}

/// Title and options for a push message.
pub fn build_notification(
    defaults: &config::Notification,
    data: Option<&[u8]>,
    timestamp: u64,
) -> (String, NotificationOptions) {
    let payload = parse_payload(data);

    let actions = payload.actions.unwrap_or_else(|| {
        vec![
            NotificationAction {
                action: ACTION_VIEW.to_string(),
                title: defaults.view_action_title.clone(),
            },
            NotificationAction {
                action: ACTION_DISMISS.to_string(),
                title: defaults.dismiss_action_title.clone(),
            },
        ]
    });

    let options = NotificationOptions {
        body: payload.body.unwrap_or_else(|| defaults.body.clone()),
        icon: payload.icon.unwrap_or_else(|| defaults.icon.clone()),
        badge: payload.badge.unwrap_or_else(|| defaults.badge.clone()),
        vibrate: vec![100, 50, 100],
        data: NotificationData {
            url: payload.url.unwrap_or_else(|| defaults.default_url.clone()),
            timestamp,
        },
        actions,
        tag: defaults.tag.clone(),
        renotify: true,
        require_interaction: true,
    };

    (payload.title.unwrap_or_else(|| defaults.title.clone()), options)
}

/// A click on a displayed notification, as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationClick {
    pub tag: String,
    /// Action button pressed, `None` for a click on the body
    pub action: Option<String>,
    pub data: Option<NotificationData>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Dismissed,
    Focused(String),
    Opened(String),
}

pub struct NotificationPresenter {
    config: Arc<Config>,
    origin: Origin,
    notifier: Arc<dyn Notifier>,
    clients: Arc<dyn Clients>,
}

impl NotificationPresenter {
    pub fn new(
        config: Arc<Config>,
        origin: Origin,
        notifier: Arc<dyn Notifier>,
        clients: Arc<dyn Clients>,
    ) -> Self {
        Self {
            config,
            origin,
            notifier,
            clients,
        }
    }

    pub async fn show_push(&self, data: Option<&[u8]>) -> WorkerResult<()> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let (title, options) = build_notification(&self.config.notification, data, timestamp);
        debug!("Showing notification '{title}'");
        self.notifier.show_notification(&title, &options).await
    }

    /// Close the notification, then focus an open page of the origin or open
    /// a new one.
    pub async fn handle_click(&self, click: &NotificationClick) -> WorkerResult<ClickOutcome> {
        if let Err(e) = self.notifier.close_notification(&click.tag).await {
            warn!("Failed to close notification {}: {}", click.tag, e);
        }

        if click.action.as_deref() == Some(ACTION_DISMISS) {
            return Ok(ClickOutcome::Dismissed);
        }

        let clients = self.clients.match_all(true).await?;
        let existing = clients
            .iter()
            .filter(|c| c.client_type == ClientType::Window)
            .find(|c| self.origin.contains(&c.url));
        if let Some(client) = existing {
            self.clients.focus(&client.id).await?;
            return Ok(ClickOutcome::Focused(client.id.clone()));
        }

        let target = click
            .data
            .as_ref()
            .map(|d| d.url.as_str())
            .unwrap_or(self.config.notification.default_url.as_str());
        let url = self.origin.resolve(target)?.to_string();
        self.clients.open_window(&url).await?;
        Ok(ClickOutcome::Opened(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_from_json_payload() {
        let defaults = config::Notification::default();
        let data = br#"{"title":"Due soon","body":"Report","url":"./tasks/1"}"#;
        let (title, options) = build_notification(&defaults, Some(data), 42);

        assert_eq!(title, "Due soon");
        assert_eq!(options.body, "Report");
        assert_eq!(options.icon, defaults.icon);
        assert_eq!(options.data.url, "./tasks/1");
        assert_eq!(options.data.timestamp, 42);
        assert_eq!(options.vibrate, vec![100, 50, 100]);
        assert_eq!(options.actions.len(), 2);
        assert_eq!(options.actions[0].action, ACTION_VIEW);
        assert!(options.renotify);
        assert!(options.require_interaction);
    }

    #[test]
    fn test_malformed_payload_uses_defaults() {
        let defaults = config::Notification::default();
        for data in [&b"not json at all"[..], &b"\"just a string\""[..], &b"[1,2]"[..]] {
            let (title, options) = build_notification(&defaults, Some(data), 0);
            assert_eq!(title, defaults.title);
            assert_eq!(options.body, defaults.body);
            assert_eq!(options.data.url, defaults.default_url);
        }
    }

    #[test]
    fn test_missing_payload_uses_defaults() {
        let defaults = config::Notification::default();
        let (title, options) = build_notification(&defaults, None, 0);
        assert_eq!(title, defaults.title);
        assert_eq!(options.tag, defaults.tag);
    }

    #[test]
    fn test_payload_actions_and_icon_ref() {
        let defaults = config::Notification::default();
        let data = br#"{"iconRef":"./alt.png","actions":[{"action":"open","title":"Open"}]}"#;
        let (_, options) = build_notification(&defaults, Some(data), 0);
        assert_eq!(options.icon, "./alt.png");
        assert_eq!(options.actions.len(), 1);
        assert_eq!(options.actions[0].action, "open");
    }
}
