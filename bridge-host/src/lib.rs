//! # Host Bridge Implementations
//!
//! Concrete implementations of the bridge traits for native host processes
//! (local CLI, CI worker, hosted service):
//!
//! - [`ReqwestHttpClient`](http::ReqwestHttpClient) - HTTP via reqwest with
//!   connection pooling and TLS
//! - [`CommandGitClient`](git::CommandGitClient) - Git via the host's `git`
//!   binary
//! - [`logging`] - `tracing-subscriber` setup for host processes

pub mod git;
pub mod http;
pub mod logging;

pub use git::CommandGitClient;
pub use http::ReqwestHttpClient;
pub use logging::{init_logging, LogFormat, LoggingConfig};
