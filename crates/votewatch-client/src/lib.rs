//! Client side of the votewatch proxy.

pub mod proxy;

pub use proxy::{ClientError, DEFAULT_REQUEST_TIMEOUT, ProxyClient, UpstreamQuery};
