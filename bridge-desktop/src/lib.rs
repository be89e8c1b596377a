//! # Desktop Bridge Implementations
//!
//! Native implementations of the bridge traits for desktop platforms:
//!
//! - [`ReqwestHttpClient`] - HTTP transport with retry and exponential backoff
//! - [`TokioFileSystem`] - async file I/O over `tokio::fs`
//!
//! Hosts that cannot use these (tests, other platforms) inject their own
//! implementations of the `bridge-traits` contracts instead.

pub mod filesystem;
pub mod http;

pub use filesystem::TokioFileSystem;
pub use http::ReqwestHttpClient;
