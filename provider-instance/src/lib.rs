//! # Instance Provider
//!
//! Implements `InstanceClient` against the remote configuration-management
//! platform's REST table API.
//!
//! ## Overview
//!
//! This module provides:
//! - Paginated table reads with encoded-query filtering
//! - Display-value resolution for reference fields
//! - Update-set export download and parsing
//! - Credential injection (bearer token or basic auth) via `HttpClient`
//!
//! Requests are single-attempt; retry policy belongs to the job layer above.

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{Credentials, TableApiConnector};
pub use error::{InstanceApiError, Result};
