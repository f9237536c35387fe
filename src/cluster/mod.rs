//! # Shardlink Cluster
//!
//! Redis Cluster support with automatic slot-based routing, topology discovery,
//! and redirect handling (MOVED/ASK).
//!
//! ## Features
//!
//! - **Slot-based routing**: Automatically routes commands to correct nodes
//! - **Topology discovery**: Uses CLUSTER SLOTS to map slots to nodes
//! - **Redirect handling**: Handles MOVED and ASK redirects transparently
//! - **Connection pooling**: One connection per node, shared by all commands
//! - **Hash tags**: Supports Redis hash tags `{...}` for multi-key operations
//!
//! ## Example
//!
//! ```no_run
//! # async fn example() -> shardlink::Result<()> {
//! use shardlink::ClusterClient;
//!
//! // Connect to Redis Cluster (comma-separated seed nodes)
//! let client = ClusterClient::connect("127.0.0.1:7000,127.0.0.1:7001").await?;
//!
//! // Commands are automatically routed to correct node
//! client.set("key", "value").await?;
//! let value = client.get("key").await?;
//! # Ok(())
//! # }
//! ```

mod client;
pub mod commands;
mod errors;
mod node;
mod pool;
mod slot;
pub mod topology;

pub use client::{ClusterClient, MAX_ATTEMPTS};
pub use node::{Node, NodeRegistry, DEFAULT_PORT};
pub use slot::{key_slot, SlotMap, SLOT_COUNT};
pub use topology::{ClusterTopology, SlotRange};
