//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (e.g., `core-sync`, `core-payload`, `provider-instance`).
//! Host applications can depend on `appsync-workspace` and enable the
//! documented features without needing to wire each crate individually.
//!
//! ## Features
//!
//! - `instance-provider` (default): pulls in the Table-API connector crate so
//!   hosts get a working remote-instance client out of the box. Disable it
//!   when supplying a custom `InstanceClient` implementation.

pub use core_payload;
pub use core_sync;

#[cfg(feature = "instance-provider")]
pub use provider_instance;
