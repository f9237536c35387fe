//! Redis Cluster client implementation.
//!
//! This module provides a high-level client for Redis Cluster with automatic
//! slot-based routing, redirect handling, and topology management.

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn, Instrument, Span};

use super::commands::{asking, cluster_slots};
use super::errors::{parse_error_reply, ErrorReply};
use super::node::{Node, NodeRegistry};
use super::pool::ConnectionPool;
use super::slot::{key_slot, SlotMap};
use super::topology::ClusterTopology;
use crate::core::builder::ClusterOptions;
use crate::core::command::{self, Cmd, ToArg};
use crate::core::connector::{Connector, NodeConnection};
use crate::core::{Error, Result};
use crate::proto::frame::Frame;

/// Maximum number of attempts for one command, redirections included.
pub const MAX_ATTEMPTS: usize = 16;

/// Where the next attempt of a command goes.
#[derive(Debug)]
enum Target {
    /// The owner of the slot according to the slot table.
    Slot,
    /// Any startup node; used after a transport failure.
    Random,
    /// The node named by an `ASK` redirect, preceded by `ASKING`.
    Asking(Node),
}

/// Redis Cluster client.
///
/// Routes each command to the node owning its key's slot and follows
/// `MOVED` and `ASK` redirects. Cloning is cheap: clones share the slot
/// table, the startup nodes and the connection pool.
#[derive(Clone)]
pub struct ClusterClient {
    /// Nodes contacted for discovery and fallback routing
    startup_nodes: Arc<RwLock<NodeRegistry>>,
    /// Slot to owner table
    slots: Arc<RwLock<SlotMap>>,
    /// Connection pool for cluster nodes
    pool: Arc<ConnectionPool>,
    /// Factory for pooled and discovery connections
    connector: Arc<dyn Connector>,
    /// Set by MOVED, cleared by a successful discovery
    refresh_asap: Arc<AtomicBool>,
    /// True once a discovery has succeeded
    initialized: Arc<AtomicBool>,
    span: Span,
}

impl ClusterClient {
    /// Creates a client and runs the first topology discovery.
    ///
    /// The client is returned whether or not discovery succeeded; the
    /// outcome is logged and reported by [`slots_initialized`](Self::slots_initialized).
    /// Until a slot table is known every command goes to a random startup
    /// node and the cluster's redirects fill the table in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `startup_nodes` is empty or the
    /// queue size is 0.
    pub async fn new(startup_nodes: Vec<Node>, options: ClusterOptions) -> Result<Self> {
        if startup_nodes.is_empty() {
            return Err(Error::InvalidArgument {
                message: "at least one startup node is required".to_string(),
            });
        }
        options.validate()?;

        let connector = options.build_connector();
        let client = Self {
            startup_nodes: Arc::new(RwLock::new(NodeRegistry::new(startup_nodes))),
            slots: Arc::new(RwLock::new(SlotMap::new())),
            pool: Arc::new(ConnectionPool::new(connector.clone())),
            connector,
            refresh_asap: Arc::new(AtomicBool::new(false)),
            initialized: Arc::new(AtomicBool::new(false)),
            span: options.span,
        };

        // Failure is already logged; the client still routes through redirects.
        let _ = client.refresh_topology().await;
        Ok(client)
    }

    /// Connects to a Redis Cluster using seed nodes.
    ///
    /// # Arguments
    ///
    /// * `addresses` - Seed node addresses (e.g., "redis://127.0.0.1:7000,127.0.0.1:7001")
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for unparsable addresses and
    /// [`Error::TopologyUnavailable`] if no seed node returned the slot table.
    pub async fn connect(addresses: &str) -> Result<Self> {
        let nodes = addresses
            .split(',')
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
            .map(Node::parse)
            .collect::<Result<Vec<_>>>()?;

        let client = Self::new(nodes, ClusterOptions::default()).await?;
        if !client.slots_initialized() {
            return Err(Error::TopologyUnavailable);
        }
        Ok(client)
    }

    /// Reloads the slot table from the first startup node that answers
    /// `CLUSTER SLOTS`.
    ///
    /// On success the table is replaced, newly seen masters join the startup
    /// nodes, and the pending-refresh flag is cleared. On failure the
    /// previous table stays in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TopologyUnavailable`] if every startup node failed.
    pub async fn refresh_topology(&self) -> Result<()> {
        self.discover().instrument(self.span.clone()).await
    }

    async fn discover(&self) -> Result<()> {
        let candidates = self.startup_nodes.read().await.nodes().to_vec();

        for node in &candidates {
            let topology = match self.fetch_topology_from_node(node).await {
                Ok(topology) => topology,
                Err(e) => {
                    debug!(node = %node, error = %e, "topology query failed");
                    continue;
                }
            };

            self.slots.write().await.replace_with(topology.slot_map());
            let added = self.startup_nodes.write().await.merge(topology.nodes);
            self.refresh_asap.store(false, Ordering::SeqCst);
            self.initialized.store(true, Ordering::SeqCst);
            info!(
                node = %node,
                ranges = topology.slot_ranges.len(),
                new_nodes = added,
                "cluster topology loaded"
            );
            return Ok(());
        }

        warn!(
            candidates = candidates.len(),
            "no startup node returned the slot table"
        );
        Err(Error::TopologyUnavailable)
    }

    /// Queries one node over a connection of its own, outside the pool.
    async fn fetch_topology_from_node(&self, node: &Node) -> Result<ClusterTopology> {
        let conn = self.connector.connect(node).await?;
        let response = conn.send_command(cluster_slots().into_frame()).await?;

        let topology = ClusterTopology::from_cluster_slots(response, node)?;
        if topology.slot_ranges.is_empty() {
            return Err(Error::Protocol {
                message: "CLUSTER SLOTS returned no slot ranges".to_string(),
            });
        }
        Ok(topology)
    }

    /// Sends a command to the node owning its key and follows redirects.
    ///
    /// The key is the first argument after the command name.
    ///
    /// Error replies other than `MOVED` and `ASK` end the command and come
    /// back as `Ok(Frame::Error(..))`, not as `Err`: the caller receives the
    /// server's error text as the result value. The typed helpers such as
    /// [`get`](Self::get) turn those into [`Error::Server`].
    ///
    /// # Errors
    ///
    /// - [`Error::Parser`] if the command has no routable key (`INFO`,
    ///   `MULTI`, `EXEC`, `SLAVEOF`, `CONFIG`, `SHUTDOWN`, or no arguments);
    ///   nothing is sent
    /// - [`Error::TooManyRedirections`] once [`MAX_ATTEMPTS`] attempts were
    ///   redirected or failed in transport
    pub async fn send_command(&self, cmd: Cmd) -> Result<Frame> {
        self.route(cmd).instrument(self.span.clone()).await
    }

    async fn route(&self, cmd: Cmd) -> Result<Frame> {
        let slot = match cmd.routing_key() {
            Some(key) => key_slot(key),
            None => {
                return Err(Error::Parser {
                    message: format!("no way to dispatch {} to the cluster", cmd.name_lossy()),
                })
            }
        };
        let name = cmd.name_lossy();
        let frame = cmd.into_frame();

        let mut target = Target::Slot;
        let mut last_error = String::new();
        let mut attempts = 0;

        let result = loop {
            if attempts == MAX_ATTEMPTS {
                break Err(Error::TooManyRedirections {
                    attempts,
                    last_error,
                });
            }
            attempts += 1;

            // A pin applies to one attempt only.
            let current = mem::replace(&mut target, Target::Slot);
            trace!(command = %name, slot, attempt = attempts, route = ?current, "sending");

            let reply = match self.attempt(current, slot, frame.clone()).await {
                Ok(reply) => reply,
                Err(e) => {
                    debug!(command = %name, slot, error = %e, "attempt failed, trying a random node");
                    last_error = e.to_string();
                    target = Target::Random;
                    continue;
                }
            };

            let classified = match &reply {
                Frame::Error(text) => parse_error_reply(text),
                _ => break Ok(reply),
            };

            match classified {
                ErrorReply::Moved { slot: moved, node } => {
                    debug!(command = %name, slot = moved, node = %node, "MOVED");
                    last_error = format!("MOVED {} {}", moved, node);
                    self.slots.write().await.update_slot(moved, Arc::new(node));
                    self.refresh_asap.store(true, Ordering::SeqCst);
                }
                ErrorReply::Ask { slot: asked, node } => {
                    debug!(command = %name, slot = asked, node = %node, "ASK");
                    last_error = format!("ASK {} {}", asked, node);
                    target = Target::Asking(node);
                }
                ErrorReply::Other(text) => {
                    debug!(command = %name, error = %text, "server error reply");
                    break Ok(reply);
                }
            }
        };

        if let Err(e) = &result {
            warn!(command = %name, slot, error = %e, "command failed");
        }

        if self.refresh_asap.load(Ordering::SeqCst) {
            // Failure keeps the flag set for the next command.
            let _ = self.discover().await;
        }

        result
    }

    /// Runs one attempt against `target`.
    ///
    /// `Err` means the attempt failed without a usable reply; a rejected
    /// `ASKING` counts as such.
    async fn attempt(&self, target: Target, slot: u16, frame: Frame) -> Result<Frame> {
        match target {
            Target::Asking(node) => {
                let conn = self.pool.connection_for(&node).await?;
                let mut replies = conn
                    .send_pipeline(vec![asking().into_frame(), frame])
                    .await?
                    .into_iter();
                match (replies.next(), replies.next()) {
                    (Some(Frame::Error(e)), _) => Err(Error::Server {
                        message: String::from_utf8_lossy(&e).into_owned(),
                    }),
                    (Some(_), Some(reply)) => Ok(reply),
                    _ => Err(Error::Protocol {
                        message: "missing reply to ASKING".to_string(),
                    }),
                }
            }
            Target::Slot => {
                let owner = self.slots.read().await.lookup(slot);
                let conn = match owner {
                    Some(node) => self.pool.connection_for(&node).await?,
                    None => self.random_connection().await?,
                };
                conn.send_command(frame).await
            }
            Target::Random => {
                let conn = self.random_connection().await?;
                conn.send_command(frame).await
            }
        }
    }

    /// Picks a startup node at random and returns its pooled connection.
    async fn random_connection(&self) -> Result<Arc<dyn NodeConnection>> {
        let node = self
            .startup_nodes
            .read()
            .await
            .random()
            .cloned()
            .ok_or(Error::TopologyUnavailable)?;
        self.pool.connection_for(&node).await
    }

    /// Runs a command on a background task and hands its result to
    /// `continuation`.
    ///
    /// Dropping the returned handle does not cancel the command.
    pub fn spawn_command<F>(&self, cmd: Cmd, continuation: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<Frame>) + Send + 'static,
    {
        let client = self.clone();
        tokio::spawn(async move {
            let result = client.send_command(cmd).await;
            continuation(result);
        })
    }

    /// Returns true once a topology discovery has succeeded.
    pub fn slots_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Returns true if a `MOVED` was seen since the last successful discovery.
    pub fn refresh_pending(&self) -> bool {
        self.refresh_asap.load(Ordering::SeqCst)
    }

    /// Returns the current startup nodes, in order.
    pub async fn startup_nodes(&self) -> Vec<Node> {
        self.startup_nodes.read().await.nodes().to_vec()
    }

    /// Returns the number of known nodes in the cluster.
    pub async fn node_count(&self) -> usize {
        self.startup_nodes.read().await.len()
    }

    /// Returns the node the slot table assigns to `slot`.
    pub async fn node_for_slot(&self, slot: u16) -> Option<Node> {
        self.slots.read().await.lookup(slot).map(|node| (*node).clone())
    }

    /// Checks if the slot table covers all slots (0-16383).
    pub async fn is_fully_covered(&self) -> bool {
        self.slots.read().await.is_fully_covered()
    }

    /// Returns the number of pooled node connections.
    pub async fn connection_count(&self) -> usize {
        self.pool.len().await
    }

    /// Empties the slot table.
    ///
    /// Subsequent commands go to random nodes until redirects or the next
    /// discovery fill the table again.
    pub async fn flush_slots_cache(&self) {
        self.slots.write().await.flush();
        debug!(parent: &self.span, "slot table flushed");
    }

    /// Gets a string value from Redis.
    ///
    /// # Returns
    ///
    /// Returns the value if the key exists, or None if the key does not exist.
    pub async fn get(&self, key: impl ToArg) -> Result<Option<Bytes>> {
        let frame = self.send_command(command::get(key)).await?;
        command::frame_to_bytes(frame)
    }

    /// Sets a string value in Redis.
    pub async fn set(&self, key: impl ToArg, value: impl ToArg) -> Result<()> {
        let frame = self.send_command(command::set(key, value)).await?;
        command::parse_frame_response(frame)?;
        Ok(())
    }

    /// Deletes a key, returning the number of keys removed.
    pub async fn del(&self, key: impl ToArg) -> Result<i64> {
        let frame = self.send_command(command::del(key)).await?;
        command::frame_to_int(frame)
    }

    /// Checks if a key exists in Redis.
    pub async fn exists(&self, key: impl ToArg) -> Result<bool> {
        let frame = self.send_command(command::exists(key)).await?;
        command::frame_to_bool(frame)
    }

    /// Increments the integer stored at `key` and returns the new value.
    pub async fn incr(&self, key: impl ToArg) -> Result<i64> {
        let frame = self.send_command(command::incr(key)).await?;
        command::frame_to_int(frame)
    }

    /// Sets a timeout on `key`. Returns false if the key does not exist.
    pub async fn expire(&self, key: impl ToArg, seconds: u64) -> Result<bool> {
        let frame = self.send_command(command::expire(key, seconds)).await?;
        command::frame_to_bool(frame)
    }
}

impl std::fmt::Debug for ClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterClient")
            .field("connector", &self.connector)
            .field("initialized", &self.slots_initialized())
            .field("refresh_pending", &self.refresh_pending())
            .finish_non_exhaustive()
    }
}
