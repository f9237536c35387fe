//! Cluster node identity and the startup node registry.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use rand::seq::SliceRandom;
use url::{Host, Url};

use crate::core::{Error, Result};

/// Port assumed when an address does not carry one.
pub const DEFAULT_PORT: u16 = 6379;

/// A member of the cluster, addressed by host and port.
///
/// A node's identity is its name, `host:port`. Two nodes with the same name
/// are the same node; the name is the key for connection caching and for
/// deduplicating the startup set.
#[derive(Debug, Clone)]
pub struct Node {
    host: String,
    port: u16,
    name: String,
}

impl Node {
    /// Creates a node from a host and a port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        let name = if host.contains(':') {
            format!("[{}]:{}", host, port)
        } else {
            format!("{}:{}", host, port)
        };
        Self { host, port, name }
    }

    /// Parses an address such as `10.0.0.1:7000`, `redis://cache.local:7000`
    /// or `[::1]:7000`.
    ///
    /// The port defaults to 6379 when absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for unparsable addresses and for
    /// schemes other than `redis://`.
    pub fn parse(address: &str) -> Result<Self> {
        let address = address.trim();
        let invalid = |message: String| Error::InvalidArgument { message };

        let url = if address.contains("://") {
            Url::parse(address)
        } else {
            Url::parse(&format!("redis://{}", address))
        }
        .map_err(|e| invalid(format!("invalid address {:?}: {}", address, e)))?;

        if url.scheme() != "redis" {
            return Err(invalid(format!(
                "invalid scheme {:?}, expected redis://",
                url.scheme()
            )));
        }

        let host = match url.host() {
            Some(Host::Ipv6(ip)) => ip.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Domain(domain)) => domain.to_string(),
            None => String::new(),
        };
        if host.is_empty() {
            return Err(invalid(format!("missing host in address {:?}", address)));
        }

        Ok(Self::new(host, url.port().unwrap_or(DEFAULT_PORT)))
    }

    /// Returns the host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the node name, `host:port`.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl FromStr for Node {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// The ordered set of nodes the client may contact for topology discovery
/// and fallback routing.
///
/// Nodes are deduplicated by name. The registry grows as discovery reveals
/// new nodes and never shrinks.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    nodes: Vec<Node>,
}

impl NodeRegistry {
    /// Creates a registry from the startup nodes, dropping duplicates.
    pub fn new(nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut registry = Self::default();
        registry.merge(nodes);
        registry
    }

    /// Appends the nodes not yet known, keeping the existing order.
    ///
    /// Returns the number of nodes added.
    pub fn merge(&mut self, nodes: impl IntoIterator<Item = Node>) -> usize {
        let before = self.nodes.len();
        for node in nodes {
            if !self.contains(&node) {
                self.nodes.push(node);
            }
        }
        self.nodes.len() - before
    }

    /// Returns true if a node with the same name is registered.
    pub fn contains(&self, node: &Node) -> bool {
        self.nodes.iter().any(|n| n == node)
    }

    /// Returns the registered nodes in order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns the number of registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if no node is registered.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Picks a node uniformly at random.
    pub fn random(&self) -> Option<&Node> {
        self.nodes.choose(&mut rand::thread_rng())
    }
}
