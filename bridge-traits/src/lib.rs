//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host
//! environment running the sync pipeline.
//!
//! ## Overview
//!
//! This crate defines the contract between the sync core and host-specific
//! plumbing. Each trait represents a capability the core requires but that is
//! implemented differently per host (local CLI, CI worker, hosted service).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations with credential injection and TLS
//! - [`InstanceClient`](instance::InstanceClient) - Paginated table reads from the remote instance
//!
//! ### Version control
//! - [`GitClient`](git::GitClient) - Branch switching, fetch, stage, commit, push
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type for
//! consistent error handling. Host implementations should:
//!
//! - Convert host-specific errors to `BridgeError`
//! - Provide actionable error messages
//! - Include error context (e.g., table names, git operation, HTTP status)
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent
//! usage across async tasks. Implementations must ensure thread safety.
//!
//! ## Examples
//!
//! ### Implementing HttpClient
//!
//! ```ignore
//! use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct MyHttpClient {
//!     client: reqwest::Client,
//! }
//!
//! #[async_trait]
//! impl HttpClient for MyHttpClient {
//!     async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
//!         // Implementation
//!         todo!()
//!     }
//! }
//! ```

pub mod error;
pub mod git;
pub mod http;
pub mod instance;

pub use error::BridgeError;

// Re-export commonly used types
pub use git::{GitClient, GitOperation};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use instance::{DisplayValue, InstanceClient, PageHandler, TableRequest};
