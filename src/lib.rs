//! # Shardlink
//!
//! Asynchronous Redis Cluster client with slot-based routing, topology
//! discovery and transparent MOVED/ASK redirect handling, built on
//! multiplexed connections.
//!
//! ## Layers
//!
//! - [`proto`] - RESP frames, encoder and incremental decoder
//! - [`core`] - Connections, multiplexing, connectors, commands, builder
//! - [`cluster`] - Slot hashing, topology, pooling and the redirect-following router
//!
//! ## Example
//!
//! ```no_run
//! use shardlink::ClusterClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ClusterClient::connect("redis://127.0.0.1:7000").await?;
//!     client.set("greeting", "hello").await?;
//!     let _ = client.get("greeting").await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod cluster;
pub mod core;
pub mod proto;

// Re-export high-level client types for convenience
pub use crate::cluster::{key_slot, ClusterClient, Node};
pub use crate::core::builder::{ClusterBuilder, ClusterOptions};
pub use crate::core::command::{Cmd, ToArg};
pub use crate::core::connector::{Connector, NodeConnection, TcpConnector};
pub use crate::core::{Error, Result};
pub use crate::proto::frame::Frame;
