//! # Host Bridge Traits
//!
//! External capabilities the sync engine consumes but does not implement.
//!
//! ## Overview
//!
//! This crate defines the contract between the sync engine and the resources
//! it reads and writes but does not own. Each trait represents a capability
//! with at least two real implementations: a production adapter and an
//! in-memory fake for tests.
//!
//! ## Traits
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - Async HTTP transport with retry support
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Local file I/O with atomic replace
//!
//! ### Remote store
//! - [`ObjectStore`](storage::ObjectStore) - Hierarchical object store: folder/file
//!   lookup, paginated listing, chunked resumable transfer
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Error Handling
//!
//! Local capabilities use [`BridgeError`](error::BridgeError). Remote store
//! operations use [`StoreError`](storage::StoreError), which carries the
//! transient-versus-fatal classification the engine's partial-failure policy
//! is built on. Expected absence (`find_*` misses) is `Ok(None)`, never an
//! error.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds so handles can be shared
//! across async tasks. Implementations must ensure thread safety.

pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use storage::{
    FileSystemAccess, NodeKind, NodePage, ObjectStore, ProgressFn, RemoteNode, StoreError,
    TransferProgress,
};
pub use time::{Clock, FixedClock, SystemClock};
