//! # Drive Object Store Provider
//!
//! Implements the [`ObjectStore`](bridge_traits::storage::ObjectStore) trait
//! for a Drive-style REST API v3:
//!
//! - Query-based folder and file lookup
//! - `pageToken` pagination
//! - Resumable chunked uploads (`uploadType=resumable`, `Content-Range`, `308`)
//! - Ranged chunked downloads (`Range: bytes=a-b`, `206`)
//! - Status-code classification into the `StoreError` taxonomy
//!
//! The connector receives an already-authenticated `HttpClient` plus an access
//! token; credential bootstrap is out of scope for this crate.

pub mod connector;
pub mod error;
pub mod types;

pub use connector::DriveConnector;
pub use error::{DriveError, Result};
