use std::fmt;

use crate::core::connection::{Connection, ConnectionReader, ConnectionWriter};
use crate::proto::frame::Frame;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, instrument, trace};

type ReplyTx = oneshot::Sender<crate::Result<Vec<Frame>>>;

/// A batch of frames written back to back, answered by one reply per frame.
struct Request {
    frames: Vec<Frame>,
    response_tx: ReplyTx,
}

/// A handle to a multiplexed connection.
///
/// This handle is cheap to clone and can be shared across multiple tasks.
/// Requests are written in the order they are submitted and every request
/// gets exactly one reply, matched by order. Once the socket fails, every
/// pending and later request fails with [`Error::Io`](crate::Error::Io).
#[derive(Clone)]
pub struct MultiplexedConnection {
    sender: mpsc::Sender<Request>,
}

impl MultiplexedConnection {
    /// Creates a new multiplexed connection.
    ///
    /// # Arguments
    ///
    /// * `connection` - The underlying connection to multiplex.
    /// * `queue_size` - The maximum number of pending requests; 0 is treated as 1.
    pub fn new<S>(connection: Connection<S>, queue_size: usize) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (reader, writer) = connection.split();
        let queue_size = queue_size.max(1);
        let (request_tx, request_rx) = mpsc::channel(queue_size);
        let (waiter_tx, waiter_rx) = mpsc::channel(queue_size);

        tokio::spawn(async move {
            run_writer(writer, request_rx, waiter_tx).await;
        });

        tokio::spawn(async move {
            run_reader(reader, waiter_rx).await;
        });

        Self { sender: request_tx }
    }

    /// Sends a command to the server and awaits the response.
    pub async fn send_command(&self, frame: Frame) -> crate::Result<Frame> {
        self.send_pipeline(vec![frame])
            .await?
            .pop()
            .ok_or_else(crate::Error::connection_closed)
    }

    /// Sends several commands with no other request interleaved and awaits
    /// all their responses, in order.
    #[instrument(skip_all, fields(len = frames.len()), level = "trace")]
    pub async fn send_pipeline(&self, frames: Vec<Frame>) -> crate::Result<Vec<Frame>> {
        if frames.is_empty() {
            return Ok(Vec::new());
        }
        let (response_tx, response_rx) = oneshot::channel();
        let request = Request {
            frames,
            response_tx,
        };

        self.sender
            .send(request)
            .await
            .map_err(|_| crate::Error::connection_closed())?;

        response_rx
            .await
            .map_err(|_| crate::Error::connection_closed())?
    }

    /// Returns true once the background tasks have shut down.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl fmt::Debug for MultiplexedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiplexedConnection")
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

async fn run_writer<S>(
    mut writer: ConnectionWriter<S>,
    mut request_rx: mpsc::Receiver<Request>,
    waiter_tx: mpsc::Sender<(usize, ReplyTx)>,
) where
    S: AsyncRead + AsyncWrite,
{
    while let Some(req) = request_rx.recv().await {
        for frame in &req.frames {
            trace!(?frame, "sending frame");
            if let Err(e) = writer.write_frame(frame).await {
                error!(error = %e, "failed to write frame");
                let _ = req.response_tx.send(Err(crate::Error::Io { source: e }));
                return;
            }
        }

        // Reader task is gone: the reply can never be matched.
        if waiter_tx
            .send((req.frames.len(), req.response_tx))
            .await
            .is_err()
        {
            return;
        }
    }
    debug!("all handles dropped, writer stopping");
}

async fn run_reader<S>(
    mut reader: ConnectionReader<S>,
    mut waiter_rx: mpsc::Receiver<(usize, ReplyTx)>,
) where
    S: AsyncRead + AsyncWrite,
{
    while let Some((count, tx)) = waiter_rx.recv().await {
        let mut replies = Vec::with_capacity(count);
        while replies.len() < count {
            match reader.read_frame().await {
                Ok(frame) => {
                    trace!(?frame, "received frame");
                    replies.push(frame);
                }
                Err(e) => {
                    error!(error = %e, "failed to read frame");
                    let _ = tx.send(Err(e));
                    return;
                }
            }
        }
        let _ = tx.send(Ok(replies));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    async fn echo_server(stream: tokio::io::DuplexStream) {
        let mut conn = Connection::new(stream);
        while let Ok(frame) = conn.read_frame().await {
            let reply = match frame {
                Frame::Array(mut args) => args.pop().unwrap_or(Frame::Null),
                other => other,
            };
            if conn.write_frame(&reply).await.is_err() {
                return;
            }
        }
    }

    fn echo(arg: &'static str) -> Frame {
        Frame::Array(vec![
            Frame::BulkString(Some(Bytes::from("ECHO"))),
            Frame::BulkString(Some(Bytes::from(arg))),
        ])
    }

    #[tokio::test]
    async fn test_replies_match_requests() {
        let (client, server) = tokio::io::duplex(1024);
        tokio::spawn(echo_server(server));
        let conn = MultiplexedConnection::new(Connection::new(client), 16);

        let (a, b, c) = tokio::join!(
            conn.send_command(echo("a")),
            conn.send_command(echo("b")),
            conn.send_command(echo("c")),
        );
        assert_eq!(a.unwrap(), Frame::BulkString(Some(Bytes::from("a"))));
        assert_eq!(b.unwrap(), Frame::BulkString(Some(Bytes::from("b"))));
        assert_eq!(c.unwrap(), Frame::BulkString(Some(Bytes::from("c"))));
    }

    #[tokio::test]
    async fn test_pipeline_replies_in_order() {
        let (client, server) = tokio::io::duplex(1024);
        tokio::spawn(echo_server(server));
        let conn = MultiplexedConnection::new(Connection::new(client), 16);

        let (pipeline, single) = tokio::join!(
            conn.send_pipeline(vec![echo("x"), echo("y")]),
            conn.send_command(echo("z")),
        );
        assert_eq!(
            pipeline.unwrap(),
            vec![
                Frame::BulkString(Some(Bytes::from("x"))),
                Frame::BulkString(Some(Bytes::from("y"))),
            ]
        );
        assert_eq!(single.unwrap(), Frame::BulkString(Some(Bytes::from("z"))));
        assert!(conn.send_pipeline(Vec::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_closed_peer_is_a_transport_failure() {
        let (client, server) = tokio::io::duplex(1024);
        drop(server);
        let conn = MultiplexedConnection::new(Connection::new(client), 16);

        let err = conn.send_command(echo("a")).await.unwrap_err();
        assert!(err.is_transport());

        // The reader is gone: later requests fail too.
        let err = conn.send_command(echo("b")).await.unwrap_err();
        assert!(err.is_transport());
    }
}
