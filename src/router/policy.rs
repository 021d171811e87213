//! Request classification and outcome types
//!
//! Everything in this module is free of I/O so the policy can be checked
//! without a store or a network.

use http::Method;
use regex::Regex;

use crate::{
    config::{FetchPolicy, Strategy},
    core::{WorkerError, WorkerResult},
    fetch::{Destination, FetchRequest, FetchResponse, Origin, RequestMode, ResponseType},
    utils::response::ResponseBuilder,
};

/// Why a request is left to the host untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassReason {
    NotGet,
    CrossOrigin,
    Pattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    Bypass(BypassReason),
    /// A document load
    Navigation,
    /// Any other same-origin GET
    Asset,
}

/// How an intercepted request ended up being satisfied.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Not intercepted; the host performs its default fetch
    Passthrough,
    /// Served from a store
    Cached(FetchResponse),
    /// Served from the network
    NetworkFresh(FetchResponse),
    /// Neither network nor store could answer
    Unavailable,
}

impl FetchOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchOutcome::Passthrough => "passthrough",
            FetchOutcome::Cached(_) => "cached",
            FetchOutcome::NetworkFresh(_) => "network",
            FetchOutcome::Unavailable => "unavailable",
        }
    }

    /// The response handed back to the page, `None` when the host should
    /// handle the request itself.
    pub fn into_response(self) -> Option<FetchResponse> {
        match self {
            FetchOutcome::Passthrough => None,
            FetchOutcome::Cached(response) | FetchOutcome::NetworkFresh(response) => Some(response),
            FetchOutcome::Unavailable => Some(ResponseBuilder::offline()),
        }
    }
}

pub fn classify(
    request: &FetchRequest,
    origin: &Origin,
    policy: &FetchPolicy,
    bypass: &[Regex],
) -> RequestClass {
    if request.method != Method::GET {
        return RequestClass::Bypass(BypassReason::NotGet);
    }
    if !request.is_same_origin(origin) {
        return RequestClass::Bypass(BypassReason::CrossOrigin);
    }

    let path = request.url.path();
    if bypass.iter().any(|re| re.is_match(path)) {
        return RequestClass::Bypass(BypassReason::Pattern);
    }

    let is_navigation = request.destination == Destination::Document
        || request.mode == RequestMode::Navigate
        || policy
            .navigation_paths
            .iter()
            .any(|p| path.ends_with(p.as_str()));
    if is_navigation {
        RequestClass::Navigation
    } else {
        RequestClass::Asset
    }
}

pub fn strategy_for(class: RequestClass, policy: &FetchPolicy) -> Option<Strategy> {
    match class {
        RequestClass::Bypass(_) => None,
        RequestClass::Navigation => Some(policy.navigation_strategy),
        RequestClass::Asset => Some(policy.asset_strategy),
    }
}

/// Whether a network response may be written to the store.
///
/// Cache-first only keeps same-origin, non-opaque responses; the other
/// strategies only look at the status.
pub fn is_storable(strategy: Strategy, response: &FetchResponse, policy: &FetchPolicy) -> bool {
    if !policy.is_cacheable_status(response.status) {
        return false;
    }
    match strategy {
        Strategy::CacheFirst => response.response_type == ResponseType::Basic,
        Strategy::NetworkFirst | Strategy::StaleWhileRevalidate => !response.is_opaque(),
    }
}

/// Outcome once the network failed and no entry exists in the current
/// stores. `fallback` is the result of the cross-store lookup, if one was
/// allowed for the request's destination.
pub fn failure_outcome(
    strategy: Strategy,
    error: WorkerError,
    fallback: Option<FetchResponse>,
) -> WorkerResult<FetchOutcome> {
    if let Some(response) = fallback {
        return Ok(FetchOutcome::Cached(response));
    }
    match strategy {
        Strategy::CacheFirst => Err(error),
        Strategy::NetworkFirst | Strategy::StaleWhileRevalidate => Ok(FetchOutcome::Unavailable),
    }
}
