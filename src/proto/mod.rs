//! # Shardlink Proto
//!
//! RESP (Redis Serialization Protocol) codec used to talk to cluster nodes.
//!
//! ## Modules
//!
//! - [`codec`] - Encoder and streaming decoder for RESP frames
//! - [`error`] - Error types shared by the whole crate
//! - [`frame`] - Frame types representing RESP data structures

pub mod codec;
/// Error types.
pub mod error;
pub mod frame;
