//! TokenGate library — token-gated read gateway for object storage.
//!
//! This crate provides the core components for running a read-only access
//! gateway in front of an object store: signed access-token verification,
//! HTTP conditional and byte-range request resolution, and response
//! assembly, plus pluggable storage backends.

use std::sync::Arc;

pub mod conditional;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod range;
pub mod server;
pub mod storage;
pub mod token;

use crate::config::Config;
use crate::storage::store::ObjectStore;
use crate::token::TokenVerifier;

/// Shared application state passed to all handlers via `axum::extract::State`.
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// Access-token verifier (public key material + expected audience).
    pub verifier: Arc<dyn TokenVerifier>,
    /// Object storage backend (local filesystem or in-memory).
    pub store: Arc<dyn ObjectStore>,
}
