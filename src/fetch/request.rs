use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};
use serde::{Deserialize, Serialize};

use crate::core::{WorkerError, WorkerResult};

/// What the requesting page intends to do with the response.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Audio,
    Document,
    Embed,
    Font,
    Image,
    Manifest,
    Object,
    Report,
    Script,
    Style,
    Track,
    Video,
    Worker,
    #[default]
    #[serde(rename = "")]
    Empty,
}

impl Destination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Audio => "audio",
            Destination::Document => "document",
            Destination::Embed => "embed",
            Destination::Font => "font",
            Destination::Image => "image",
            Destination::Manifest => "manifest",
            Destination::Object => "object",
            Destination::Report => "report",
            Destination::Script => "script",
            Destination::Style => "style",
            Destination::Track => "track",
            Destination::Video => "video",
            Destination::Worker => "worker",
            Destination::Empty => "",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Destination {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dest = match s {
            "audio" => Destination::Audio,
            "document" => Destination::Document,
            "embed" => Destination::Embed,
            "font" => Destination::Font,
            "image" => Destination::Image,
            "manifest" => Destination::Manifest,
            "object" => Destination::Object,
            "report" => Destination::Report,
            "script" => Destination::Script,
            "style" => Destination::Style,
            "track" => Destination::Track,
            "video" => Destination::Video,
            "worker" => Destination::Worker,
            "" => Destination::Empty,
            other => {
                return Err(WorkerError::InvalidRequest(format!(
                    "unknown request destination '{other}'"
                )))
            }
        };
        Ok(dest)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    NoCors,
    #[default]
    Cors,
}

/// Scheme plus authority of an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    scheme: String,
    authority: String,
}

impl Origin {
    pub fn parse(input: &str) -> WorkerResult<Self> {
        let uri: Uri = input
            .parse()
            .map_err(|e| WorkerError::InvalidRequest(format!("invalid origin '{input}': {e}")))?;
        Self::of(&uri)
            .ok_or_else(|| WorkerError::InvalidRequest(format!("'{input}' is not an absolute URL")))
    }

    /// Origin of an absolute URI, `None` for relative references.
    pub fn of(uri: &Uri) -> Option<Self> {
        let scheme = uri.scheme_str()?;
        let authority = uri.authority()?;
        Some(Self {
            scheme: scheme.to_ascii_lowercase(),
            authority: authority.as_str().to_ascii_lowercase(),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Resolve a root-relative manifest path (`./`, `./index.html`, `/a.css`,
    /// `icon.png`) or pass an absolute URL through.
    pub fn resolve(&self, path: &str) -> WorkerResult<Uri> {
        if path.contains("://") {
            return path
                .parse()
                .map_err(|e| WorkerError::InvalidRequest(format!("invalid URL '{path}': {e}")));
        }

        let trimmed = path.strip_prefix('.').unwrap_or(path);
        let trimmed = trimmed.trim_start_matches('/');
        let url = format!("{self}/{trimmed}");
        url.parse()
            .map_err(|e| WorkerError::InvalidRequest(format!("invalid path '{path}': {e}")))
    }

    /// Whether the URL string lives under this origin.
    pub fn contains(&self, url: &str) -> bool {
        url.parse::<Uri>()
            .ok()
            .and_then(|uri| Origin::of(&uri))
            .is_some_and(|origin| origin == *self)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)
    }
}

/// Identity of a stored response. Only GET requests are ever keyed, so the
/// absolute URL is sufficient.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&Uri> for CacheKey {
    fn from(uri: &Uri) -> Self {
        CacheKey(uri.to_string())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A request intercepted from a controlled page.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Uri,
    pub destination: Destination,
    pub mode: RequestMode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FetchRequest {
    pub fn new(method: Method, url: &str) -> WorkerResult<Self> {
        let url: Uri = url
            .parse()
            .map_err(|e| WorkerError::InvalidRequest(format!("invalid URL '{url}': {e}")))?;
        if url.scheme().is_none() || url.authority().is_none() {
            return Err(WorkerError::InvalidRequest(format!(
                "request URL must be absolute, got '{url}'"
            )));
        }

        Ok(Self {
            method,
            url,
            destination: Destination::Empty,
            mode: RequestMode::Cors,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        })
    }

    pub fn get(url: &str) -> WorkerResult<Self> {
        Self::new(Method::GET, url)
    }

    /// A top-level document load.
    pub fn navigate(url: &str) -> WorkerResult<Self> {
        Ok(Self::get(url)?
            .with_destination(Destination::Document)
            .with_mode(RequestMode::Navigate))
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn origin(&self) -> Option<Origin> {
        Origin::of(&self.url)
    }

    pub fn is_same_origin(&self, origin: &Origin) -> bool {
        self.origin().is_some_and(|o| o == *origin)
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::from(&self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_manifest_paths() {
        let origin = Origin::parse("https://app.test").unwrap();
        assert_eq!(origin.resolve("./").unwrap().to_string(), "https://app.test/");
        assert_eq!(
            origin.resolve("./index.html").unwrap().to_string(),
            "https://app.test/index.html"
        );
        assert_eq!(
            origin.resolve("/css/app.css").unwrap().to_string(),
            "https://app.test/css/app.css"
        );
        assert_eq!(
            origin.resolve("icon-192.png").unwrap().to_string(),
            "https://app.test/icon-192.png"
        );
        assert_eq!(
            origin.resolve("https://cdn.test/x.js").unwrap().to_string(),
            "https://cdn.test/x.js"
        );
    }

    #[test]
    fn test_same_origin() {
        let origin = Origin::parse("https://app.test").unwrap();
        let req = FetchRequest::get("https://app.test/a.js").unwrap();
        assert!(req.is_same_origin(&origin));

        let req = FetchRequest::get("https://cdn.test/a.js").unwrap();
        assert!(!req.is_same_origin(&origin));

        // port is part of the origin
        let req = FetchRequest::get("https://app.test:8443/a.js").unwrap();
        assert!(!req.is_same_origin(&origin));

        assert!(origin.contains("https://APP.test/page"));
        assert!(!origin.contains("http://app.test/page"));
    }

    #[test]
    fn test_relative_request_rejected() {
        assert!(FetchRequest::get("/index.html").is_err());
    }

    #[test]
    fn test_destination_parse() {
        assert_eq!("script".parse::<Destination>().unwrap(), Destination::Script);
        assert_eq!("".parse::<Destination>().unwrap(), Destination::Empty);
        assert!("bogus".parse::<Destination>().is_err());

        let d: Destination = serde_yaml::from_str("style").unwrap();
        assert_eq!(d, Destination::Style);
    }

    #[test]
    fn test_cache_key_keeps_query() {
        let a = FetchRequest::get("https://app.test/a.js?v=1").unwrap();
        assert_eq!(a.cache_key().as_str(), "https://app.test/a.js?v=1");
    }
}
