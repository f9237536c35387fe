use std::fmt;

use crate::proto::codec::{Decoder, Encoder};
use crate::proto::frame::Frame;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

const READ_CHUNK_SIZE: usize = 4096;

/// A connection to a cluster node.
///
/// This struct wraps an underlying stream (TCP, an in-memory duplex, etc.)
/// and handles RESP frame encoding and decoding.
///
/// # Example
///
/// ```no_run
/// use shardlink::core::connection::Connection;
/// use shardlink::proto::frame::Frame;
/// use tokio::net::TcpStream;
///
/// # async fn run() -> shardlink::Result<()> {
/// let stream = TcpStream::connect("127.0.0.1:7000").await?;
/// let mut conn = Connection::new(stream);
///
/// let cmd = Frame::Array(vec![Frame::BulkString(Some("PING".into()))]);
/// conn.write_frame(&cmd).await?;
/// let resp = conn.read_frame().await?;
/// println!("{:?}", resp);
/// # Ok(())
/// # }
/// ```
pub struct Connection<S> {
    stream: S,
    decoder: Decoder,
    encoder: Encoder,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection with the given stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            decoder: Decoder::new(),
            encoder: Encoder::new(),
        }
    }

    /// Writes a frame to the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the stream fails
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), std::io::Error> {
        write_frame_to(&mut self.stream, &mut self.encoder, frame).await
    }

    /// Reads a frame from the connection.
    ///
    /// Keeps reading until a complete frame is buffered; partial frames stay
    /// in the decoder between reads.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is closed or a protocol error occurs
    pub async fn read_frame(&mut self) -> crate::Result<Frame> {
        read_frame_from(&mut self.stream, &mut self.decoder).await
    }

    /// Splits the connection into independently owned read and write halves.
    ///
    /// Bytes already buffered in the decoder move to the reader.
    pub fn split(self) -> (ConnectionReader<S>, ConnectionWriter<S>) {
        let (read_half, write_half) = tokio::io::split(self.stream);
        (
            ConnectionReader {
                stream: read_half,
                decoder: self.decoder,
            },
            ConnectionWriter {
                stream: write_half,
                encoder: self.encoder,
            },
        )
    }
}

impl<S> fmt::Debug for Connection<S>
where
    S: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("stream", &self.stream)
            .field("buffered", &self.decoder.buffered())
            .finish()
    }
}

/// The reading half of a [`Connection`].
pub struct ConnectionReader<S> {
    stream: ReadHalf<S>,
    decoder: Decoder,
}

impl<S> ConnectionReader<S>
where
    S: AsyncRead + AsyncWrite,
{
    /// Reads the next complete frame.
    pub async fn read_frame(&mut self) -> crate::Result<Frame> {
        read_frame_from(&mut self.stream, &mut self.decoder).await
    }
}

/// The writing half of a [`Connection`].
pub struct ConnectionWriter<S> {
    stream: WriteHalf<S>,
    encoder: Encoder,
}

impl<S> ConnectionWriter<S>
where
    S: AsyncRead + AsyncWrite,
{
    /// Encodes and writes one frame.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), std::io::Error> {
        write_frame_to(&mut self.stream, &mut self.encoder, frame).await
    }
}

async fn write_frame_to<W>(
    stream: &mut W,
    encoder: &mut Encoder,
    frame: &Frame,
) -> Result<(), std::io::Error>
where
    W: AsyncWrite + Unpin,
{
    encoder.encode(frame);
    let data = encoder.take();
    stream.write_all(&data).await?;
    stream.flush().await
}

async fn read_frame_from<R>(stream: &mut R, decoder: &mut Decoder) -> crate::Result<Frame>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    loop {
        if let Some(frame) = decoder.decode()? {
            return Ok(frame);
        }
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Err(crate::Error::Protocol {
                message: if decoder.buffered() == 0 {
                    "connection closed".to_string()
                } else {
                    "connection closed in the middle of a frame".to_string()
                },
            });
        }
        decoder.append(&buf[..n]);
    }
}
