use std::sync::Arc;
use std::time::Duration;

use tracing::Span;

use crate::cluster::{ClusterClient, Node};
use crate::core::connector::{
    Connector, TcpConnector, DEFAULT_CONNECT_TIMEOUT, DEFAULT_QUEUE_SIZE,
    DEFAULT_RECONNECT_INTERVAL,
};
use crate::{Error, Result};

/// Options recognized by [`ClusterClient::new`].
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClusterOptions {
    /// Connection factory override. `None` uses [`TcpConnector`].
    pub connector: Option<Arc<dyn Connector>>,
    /// Time allowed for each TCP handshake (default connector only).
    pub connect_timeout: Duration,
    /// Minimum delay between reconnection attempts to one node (default connector only).
    pub reconnect_interval: Duration,
    /// Maximum number of pending requests per connection (default connector only).
    pub queue_size: usize,
    /// Span the client's routing and discovery events are recorded under.
    pub span: Span,
}

impl ClusterOptions {
    /// Rejects settings no connection could run with.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.queue_size == 0 {
            return Err(Error::InvalidArgument {
                message: "queue size must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn build_connector(&self) -> Arc<dyn Connector> {
        match &self.connector {
            Some(connector) => connector.clone(),
            None => Arc::new(TcpConnector::new(
                self.connect_timeout,
                self.reconnect_interval,
                self.queue_size,
            )),
        }
    }
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            connector: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            queue_size: DEFAULT_QUEUE_SIZE,
            span: Span::none(),
        }
    }
}

/// Builder for configuring and creating a [`ClusterClient`].
///
/// # Example
///
/// ```no_run
/// use shardlink::ClusterBuilder;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ClusterBuilder::new()
///     .node("127.0.0.1:7000")
///     .node("127.0.0.1:7001")
///     .reconnect_interval(Duration::from_millis(500))
///     .build()
///     .await?;
/// assert!(client.slots_initialized());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ClusterBuilder {
    addresses: Vec<String>,
    options: ClusterOptions,
}

impl ClusterBuilder {
    /// Creates a new [`ClusterBuilder`] instance.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds startup nodes.
    ///
    /// # Arguments
    ///
    /// * `address` - One address or a comma-separated list, `host:port` or `redis://host:port`
    #[inline]
    pub fn node(mut self, address: impl Into<String>) -> Self {
        self.addresses.push(address.into());
        self
    }

    /// Adds several startup nodes.
    #[inline]
    pub fn nodes<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.addresses.extend(addresses.into_iter().map(Into::into));
        self
    }

    /// Replaces the connection factory.
    ///
    /// The connect timeout, reconnect interval and queue size only apply to
    /// the default TCP connector.
    #[inline]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.options.connector = Some(connector);
        self
    }

    /// Sets the connection timeout.
    #[inline]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Sets the minimum delay between reconnection attempts to a node.
    #[inline]
    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.options.reconnect_interval = interval;
        self
    }

    /// Sets the maximum number of pending requests per connection.
    ///
    /// # Arguments
    ///
    /// * `size` - Maximum number of requests (default: 1024); `build` rejects 0
    #[inline]
    pub fn queue_size(mut self, size: usize) -> Self {
        self.options.queue_size = size;
        self
    }

    /// Records the client's events under `span`.
    #[inline]
    pub fn span(mut self, span: Span) -> Self {
        self.options.span = span;
        self
    }

    fn parse_nodes(&self) -> Result<Vec<Node>> {
        let nodes = self
            .addresses
            .iter()
            .flat_map(|list| list.split(','))
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
            .map(Node::parse)
            .collect::<Result<Vec<_>>>()?;

        if nodes.is_empty() {
            return Err(Error::InvalidArgument {
                message: "at least one startup node is required".to_string(),
            });
        }
        Ok(nodes)
    }

    /// Builds the [`ClusterClient`] and runs the first topology discovery.
    ///
    /// The client is returned even when no startup node answered; check
    /// [`ClusterClient::slots_initialized`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if no address is set, one cannot be
    /// parsed, or the queue size is 0.
    pub async fn build(self) -> Result<ClusterClient> {
        let nodes = self.parse_nodes()?;
        ClusterClient::new(nodes, self.options).await
    }
}
