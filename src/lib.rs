//! An offline caching agent for a single-page web app.
//!
//! It intercepts the page's requests and answers them from a versioned
//! store, the network, or both, and handles the surrounding worker events:
//! install, activation, messages, sync, push and notification clicks.

pub mod cache;
pub mod config;
pub mod core;
pub mod fetch;
pub mod logging;
pub mod metrics;
pub mod network;
pub mod notification;
pub mod push;
pub mod router;
pub mod sync;
pub mod utils;
pub mod worker;

#[cfg(test)]
mod testing;
