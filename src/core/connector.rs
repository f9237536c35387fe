use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cluster::Node;
use crate::core::connection::Connection;
use crate::core::multiplexed::MultiplexedConnection;
use crate::proto::frame::Frame;
use crate::{Error, Result};

/// Default time allowed for establishing a TCP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
/// Default minimum delay between two reconnection attempts to the same node.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(1);
/// Default queue size for multiplexed connections.
pub const DEFAULT_QUEUE_SIZE: usize = 1024;

/// One duplex channel to one node.
///
/// Every call sends one request and resolves with exactly one reply. Error
/// replies from the server come back as `Ok(Frame::Error(..))`; `Err` is
/// reserved for transport failures.
pub trait NodeConnection: Send + Sync + fmt::Debug {
    /// Sends request frames back to back, with no other request in between,
    /// and waits for one reply per frame.
    fn send_pipeline(&self, frames: Vec<Frame>) -> BoxFuture<'_, Result<Vec<Frame>>>;

    /// Sends a request frame and waits for its reply.
    fn send_command(&self, frame: Frame) -> BoxFuture<'_, Result<Frame>> {
        async move {
            self.send_pipeline(vec![frame])
                .await?
                .pop()
                .ok_or_else(|| Error::Protocol {
                    message: "missing reply".to_string(),
                })
        }
        .boxed()
    }
}

/// Factory for node connections.
///
/// The cluster client never dials by itself: it asks its connector. The
/// connector owns reconnection policy and timers; the client only sees
/// success or failure of each request. Replace it to run the client over a
/// scripted transport in tests.
pub trait Connector: Send + Sync + fmt::Debug {
    /// Opens a connection to `node`.
    fn connect(&self, node: &Node) -> BoxFuture<'static, Result<Arc<dyn NodeConnection>>>;
}

impl NodeConnection for MultiplexedConnection {
    fn send_pipeline(&self, frames: Vec<Frame>) -> BoxFuture<'_, Result<Vec<Frame>>> {
        MultiplexedConnection::send_pipeline(self, frames).boxed()
    }

    fn send_command(&self, frame: Frame) -> BoxFuture<'_, Result<Frame>> {
        MultiplexedConnection::send_command(self, frame).boxed()
    }
}

/// The default connector: plain TCP with lazy reconnection.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    connect_timeout: Duration,
    reconnect_interval: Duration,
    queue_size: usize,
}

impl TcpConnector {
    /// Creates a connector.
    ///
    /// # Arguments
    ///
    /// * `connect_timeout` - Time allowed for each TCP handshake
    /// * `reconnect_interval` - Minimum delay between reconnection attempts to one node
    /// * `queue_size` - Maximum number of pending requests per connection
    pub fn new(connect_timeout: Duration, reconnect_interval: Duration, queue_size: usize) -> Self {
        Self {
            connect_timeout,
            reconnect_interval,
            queue_size,
        }
    }

    async fn dial(&self, node: &Node) -> Result<MultiplexedConnection> {
        let address = node.name().to_string();
        let connect = TcpStream::connect((node.host(), node.port()));
        let stream = match tokio::time::timeout(self.connect_timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(Error::Connect { address, source }),
            Err(_) => return Err(Error::Timeout { address }),
        };
        stream.set_nodelay(true)?;
        debug!(node = %node, "connected");
        Ok(MultiplexedConnection::new(
            Connection::new(stream),
            self.queue_size,
        ))
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new(
            DEFAULT_CONNECT_TIMEOUT,
            DEFAULT_RECONNECT_INTERVAL,
            DEFAULT_QUEUE_SIZE,
        )
    }
}

impl Connector for TcpConnector {
    fn connect(&self, node: &Node) -> BoxFuture<'static, Result<Arc<dyn NodeConnection>>> {
        let connector = self.clone();
        let node = node.clone();
        async move {
            let conn = connector.dial(&node).await?;
            let link = ReconnectingConnection {
                node,
                connector,
                state: Mutex::new(LinkState {
                    conn: Some(conn),
                    generation: 0,
                    last_dial: Instant::now(),
                }),
            };
            Ok(Arc::new(link) as Arc<dyn NodeConnection>)
        }
        .boxed()
    }
}

#[derive(Debug)]
struct LinkState {
    conn: Option<MultiplexedConnection>,
    generation: u64,
    last_dial: Instant,
}

/// A node connection that re-dials after transport failures.
///
/// A failed request drops the underlying socket. The next request dials
/// again, unless the previous dial happened less than the reconnect interval
/// ago, in which case it fails immediately.
#[derive(Debug)]
struct ReconnectingConnection {
    node: Node,
    connector: TcpConnector,
    state: Mutex<LinkState>,
}

impl ReconnectingConnection {
    async fn current(&self) -> Result<(MultiplexedConnection, u64)> {
        let mut state = self.state.lock().await;
        if let Some(conn) = state.conn.as_ref().filter(|c| !c.is_closed()) {
            return Ok((conn.clone(), state.generation));
        }

        if state.last_dial.elapsed() < self.connector.reconnect_interval {
            return Err(Error::Connect {
                address: self.node.name().to_string(),
                source: io::Error::new(io::ErrorKind::NotConnected, "waiting to reconnect"),
            });
        }

        debug!(node = %self.node, "reconnecting");
        state.last_dial = Instant::now();
        state.generation += 1;
        let conn = self.connector.dial(&self.node).await?;
        state.conn = Some(conn.clone());
        Ok((conn, state.generation))
    }

    async fn mark_broken(&self, generation: u64) {
        let mut state = self.state.lock().await;
        if state.generation == generation && state.conn.take().is_some() {
            warn!(node = %self.node, "connection lost");
        }
    }
}

impl NodeConnection for ReconnectingConnection {
    fn send_pipeline(&self, frames: Vec<Frame>) -> BoxFuture<'_, Result<Vec<Frame>>> {
        async move {
            let (conn, generation) = self.current().await?;
            let reply = conn.send_pipeline(frames).await;
            if matches!(&reply, Err(e) if e.is_transport()) {
                self.mark_broken(generation).await;
            }
            reply
        }
        .boxed()
    }
}
