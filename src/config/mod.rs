use std::collections::HashSet;
use std::fs;

use http::{StatusCode, Uri};
use log::{debug, trace};
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::{
    config_error,
    core::{WorkerError, WorkerResult},
    fetch::{Destination, Origin},
};

/// Immutable worker configuration.
///
/// Built once and shared as `Arc<Config>`; nothing in the crate reads store
/// names or the shell manifest from anywhere else.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "Config::validate_cache_names"))]
pub struct Config {
    #[validate(nested)]
    pub worker: Worker,

    #[validate(nested)]
    #[serde(default)]
    pub fetch: FetchPolicy,

    #[serde(default)]
    pub notification: Notification,

    #[serde(default)]
    pub push: Push,

    #[serde(default)]
    pub sync: SyncTags,

    pub log: Option<Log>,
}

// Config file load and validation
impl Config {
    pub fn load_from_yaml<P>(path: P) -> WorkerResult<Self>
    where
        P: AsRef<std::path::Path> + std::fmt::Display,
    {
        let conf_str = fs::read_to_string(&path)
            .map_err(|e| config_error!("Unable to read conf file from {}: {}", path, e))?;
        debug!("Conf file read from {path}");
        Self::from_yaml(&conf_str)
    }

    pub fn from_yaml(conf_str: &str) -> WorkerResult<Self> {
        trace!("Read conf file: {conf_str}");
        let conf: Config = serde_yaml::from_str(conf_str)
            .map_err(|e| config_error!("Unable to parse yaml conf: {}", e))?;

        trace!("Loaded conf: {conf:?}");

        conf.validate()
            .map_err(|e| WorkerError::Validation(format!("Conf file valid failed: {e}")))?;

        Ok(conf)
    }

    /// Minimal configuration for an origin, mostly useful in tests and for
    /// hosts that build configuration in code.
    pub fn for_origin(origin: &str, cache_name: &str, shell_assets: Vec<String>) -> Self {
        Config {
            worker: Worker {
                version: "0.0.0".to_string(),
                origin: origin.to_string(),
                cache_name: cache_name.to_string(),
                dynamic_cache_name: None,
                shell_assets,
                skip_waiting: true,
            },
            fetch: FetchPolicy::default(),
            notification: Notification::default(),
            push: Push::default(),
            sync: SyncTags::default(),
            log: None,
        }
    }

    pub fn to_yaml(&self) -> WorkerResult<String> {
        serde_yaml::to_string(self).map_err(|e| config_error!("Unable to render yaml: {}", e))
    }

    /// The origin the worker is registered for.
    pub fn origin(&self) -> WorkerResult<Origin> {
        Origin::parse(&self.worker.origin)
    }

    fn validate_cache_names(&self) -> Result<(), ValidationError> {
        if self.worker.dynamic_cache_name.as_deref() == Some(self.worker.cache_name.as_str()) {
            return Err(ValidationError::new("dynamic_cache_name_must_differ"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct Worker {
    #[validate(length(min = 1))]
    pub version: String,

    #[validate(custom(function = "validate_origin"))]
    pub origin: String,

    /// Name of the store treated as current
    #[validate(length(min = 1))]
    pub cache_name: String,

    /// Secondary store that survives activation cleanup
    #[validate(length(min = 1))]
    pub dynamic_cache_name: Option<String>,

    /// Root-relative paths cached at install time, in order
    #[validate(custom(function = "validate_shell_assets"))]
    #[serde(default)]
    pub shell_assets: Vec<String>,

    #[serde(default = "Worker::default_skip_waiting")]
    pub skip_waiting: bool,
}

impl Worker {
    fn default_skip_waiting() -> bool {
        true
    }
}

fn validate_origin(origin: &str) -> Result<(), ValidationError> {
    let uri: Uri = origin
        .parse()
        .map_err(|_| ValidationError::new("invalid_origin"))?;
    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        _ => return Err(ValidationError::new("origin_scheme_must_be_http")),
    }
    if uri.authority().is_none() {
        return Err(ValidationError::new("origin_authority_required"));
    }
    if !matches!(uri.path(), "" | "/") || uri.query().is_some() {
        return Err(ValidationError::new("origin_must_not_have_path"));
    }
    Ok(())
}

fn validate_shell_assets(assets: &[String]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for asset in assets {
        if asset.trim().is_empty() {
            return Err(ValidationError::new("empty_shell_asset"));
        }
        if !seen.insert(asset.as_str()) {
            let mut err = ValidationError::new("duplicate_shell_asset");
            err.add_param("asset".into(), &asset.to_string());
            return Err(err);
        }
    }
    Ok(())
}

/// How a class of request is satisfied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Network, then the stored copy on failure
    NetworkFirst,
    /// Stored copy now, refresh the store in the background
    StaleWhileRevalidate,
    /// Stored copy unconditionally, network and store on miss
    CacheFirst,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::NetworkFirst => "network_first",
            Strategy::StaleWhileRevalidate => "stale_while_revalidate",
            Strategy::CacheFirst => "cache_first",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct FetchPolicy {
    #[serde(default = "FetchPolicy::default_navigation_strategy")]
    pub navigation_strategy: Strategy,

    #[serde(default = "FetchPolicy::default_asset_strategy")]
    pub asset_strategy: Strategy,

    /// Destinations that get a cross-store lookup before giving up offline
    #[serde(default = "FetchPolicy::default_fallback_destinations")]
    pub fallback_destinations: Vec<Destination>,

    /// Paths always treated as navigations, whatever their destination
    #[serde(default = "FetchPolicy::default_navigation_paths")]
    pub navigation_paths: Vec<String>,

    #[serde(default = "FetchPolicy::default_cache_statuses")]
    #[validate(custom(function = "validate_statuses"))]
    pub cache_statuses: Vec<u16>,

    /// Path patterns that are never cached
    #[serde(default)]
    #[validate(custom(function = "validate_regexes"))]
    pub bypass_patterns: Vec<String>,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            navigation_strategy: Self::default_navigation_strategy(),
            asset_strategy: Self::default_asset_strategy(),
            fallback_destinations: Self::default_fallback_destinations(),
            navigation_paths: Self::default_navigation_paths(),
            cache_statuses: Self::default_cache_statuses(),
            bypass_patterns: Vec::new(),
        }
    }
}

impl FetchPolicy {
    fn default_navigation_strategy() -> Strategy {
        Strategy::NetworkFirst
    }

    fn default_asset_strategy() -> Strategy {
        Strategy::StaleWhileRevalidate
    }

    fn default_fallback_destinations() -> Vec<Destination> {
        vec![Destination::Script, Destination::Style]
    }

    fn default_navigation_paths() -> Vec<String> {
        vec!["/index.html".to_string()]
    }

    fn default_cache_statuses() -> Vec<u16> {
        vec![200]
    }

    pub fn is_cacheable_status(&self, status: StatusCode) -> bool {
        self.cache_statuses.contains(&status.as_u16())
    }

    /// Compile the bypass patterns. Validation guarantees they compile.
    pub fn compile_bypass(&self) -> WorkerResult<Vec<Regex>> {
        self.bypass_patterns
            .iter()
            .map(|p| Regex::new(p).map_err(|e| config_error!("Invalid bypass pattern {}: {}", p, e)))
            .collect()
    }
}

fn validate_statuses(statuses: &[u16]) -> Result<(), ValidationError> {
    if statuses.is_empty() {
        return Err(ValidationError::new("cache_statuses_required"));
    }
    for &status in statuses {
        if !(100..=599).contains(&status) {
            return Err(ValidationError::new("invalid_http_status"));
        }
    }
    Ok(())
}

fn validate_regexes(patterns: &[String]) -> Result<(), ValidationError> {
    for pattern in patterns {
        if Regex::new(pattern).is_err() {
            return Err(ValidationError::new("invalid_regex_pattern"));
        }
    }
    Ok(())
}

/// Default notification content, used for missing or malformed push data.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default = "Notification::default_title")]
    pub title: String,
    #[serde(default = "Notification::default_body")]
    pub body: String,
    #[serde(default = "Notification::default_icon")]
    pub icon: String,
    #[serde(default = "Notification::default_icon")]
    pub badge: String,
    /// Where a click lands when the payload carries no URL
    #[serde(default = "Notification::default_url")]
    pub default_url: String,
    #[serde(default = "Notification::default_tag")]
    pub tag: String,
    #[serde(default = "Notification::default_view_title")]
    pub view_action_title: String,
    #[serde(default = "Notification::default_dismiss_title")]
    pub dismiss_action_title: String,
}

impl Default for Notification {
    fn default() -> Self {
        Self {
            title: Self::default_title(),
            body: Self::default_body(),
            icon: Self::default_icon(),
            badge: Self::default_icon(),
            default_url: Self::default_url(),
            tag: Self::default_tag(),
            view_action_title: Self::default_view_title(),
            dismiss_action_title: Self::default_dismiss_title(),
        }
    }
}

impl Notification {
    fn default_title() -> String {
        "New notification".to_string()
    }

    fn default_body() -> String {
        "You have items that need attention".to_string()
    }

    fn default_icon() -> String {
        "./icon-192.png".to_string()
    }

    fn default_url() -> String {
        "./".to_string()
    }

    fn default_tag() -> String {
        "app-notification".to_string()
    }

    fn default_view_title() -> String {
        "View".to_string()
    }

    fn default_dismiss_title() -> String {
        "Dismiss".to_string()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Push {
    /// Endpoint receiving renewed subscriptions, absolute or a path on the origin
    pub subscription_endpoint: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncTags {
    #[serde(default = "SyncTags::default_background_tag")]
    pub background_sync_tag: String,
    #[serde(default = "SyncTags::default_periodic_tag")]
    pub periodic_sync_tag: String,
}

impl Default for SyncTags {
    fn default() -> Self {
        Self {
            background_sync_tag: Self::default_background_tag(),
            periodic_sync_tag: Self::default_periodic_tag(),
        }
    }
}

impl SyncTags {
    fn default_background_tag() -> String {
        "background-sync".to_string()
    }

    fn default_periodic_tag() -> String {
        "content-update".to_string()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Log {
    pub path: String,
}
