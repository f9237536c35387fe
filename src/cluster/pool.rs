//! Connection pooling for Redis Cluster nodes.
//!
//! One connection per node, created on first use through the client's
//! [`Connector`] and reused afterwards. The pool never evicts: recovering a
//! broken link is the connector's job.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::cluster::node::Node;
use crate::core::connector::{Connector, NodeConnection};
use crate::Result;

/// Connection pool for Redis Cluster nodes, keyed by node name.
pub(crate) struct ConnectionPool {
    connector: Arc<dyn Connector>,
    connections: RwLock<HashMap<String, Arc<dyn NodeConnection>>>,
}

impl ConnectionPool {
    /// Creates an empty pool that dials through `connector`.
    pub(crate) fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached connection to `node`, establishing it on first use.
    ///
    /// When two tasks race to open the same node, the first insertion wins
    /// and the other connection is dropped.
    pub(crate) async fn connection_for(&self, node: &Node) -> Result<Arc<dyn NodeConnection>> {
        if let Some(conn) = self.connections.read().await.get(node.name()) {
            return Ok(conn.clone());
        }

        // The lock is not held while dialing.
        let conn = self.connector.connect(node).await?;
        debug!(node = %node, "added connection to pool");

        let mut connections = self.connections.write().await;
        Ok(connections
            .entry(node.name().to_string())
            .or_insert(conn)
            .clone())
    }

    /// Returns the number of pooled connections.
    pub(crate) async fn len(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("connector", &self.connector)
            .finish_non_exhaustive()
    }
}
