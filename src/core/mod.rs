//! # Shardlink Core
//!
//! Connection handling underneath the cluster router.
//!
//! ## Modules
//!
//! - [`connection`] - Framed connection over a byte stream
//! - [`multiplexed`] - Multiplexed connection for concurrent requests
//! - [`connector`] - Connection factory seam and the default TCP transport
//! - [`command`] - Command builders
//! - [`builder`] - Cluster client builder

pub use crate::proto::error::{Error, Result};

/// Cluster client builder configuration.
pub mod builder;
/// Command construction helpers.
pub mod command;
/// Low-level connection management.
pub mod connection;
/// Connection factories.
pub mod connector;
/// Multiplexing logic.
pub mod multiplexed;
