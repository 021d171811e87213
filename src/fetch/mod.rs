//! Request and response values exchanged between the host, the router and
//! the cache store.

pub mod request;
pub mod response;

pub use request::{CacheKey, Destination, FetchRequest, Origin, RequestMode};
pub use response::{FetchResponse, ResponseType};
