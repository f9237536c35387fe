use bytes::{Buf, BytesMut};

use crate::proto::error::DecodeError;
use crate::proto::frame::Frame;

const DEFAULT_MAX_FRAME_SIZE: usize = 512 * 1024 * 1024; // 512 MB default

/// Deepest array nesting accepted in a reply.
pub const MAX_NESTING_DEPTH: usize = 512;

/// A RESP decoder that converts bytes to [`Frame`] types.
///
/// The decoder handles streaming input and can decode frames incrementally.
/// Call [`append`](Decoder::append) to add data, then [`decode`](Decoder::decode)
/// to parse frames. Returns `Ok(None)` when more data is needed.
///
/// Elements of an array that arrive before the rest of the array are parsed
/// once and kept between calls, so the cost of a reply does not depend on
/// how it was split across reads. Arrays nested deeper than
/// [`MAX_NESTING_DEPTH`] are rejected.
///
/// # Example
///
/// ```
/// use shardlink::proto::codec::Decoder;
/// use shardlink::proto::frame::Frame;
///
/// let mut decoder = Decoder::new();
/// decoder.append(b"+OK\r\n");
/// let frame = decoder.decode().unwrap().unwrap();
/// assert_eq!(frame, Frame::SimpleString(b"OK".to_vec()));
/// ```
#[derive(Debug)]
pub struct Decoder {
    buf: BytesMut,
    max_frame_size: usize,
    /// Arrays still waiting for elements, outermost first.
    open: Vec<OpenArray>,
    /// Bytes of the frame in progress already taken out of `buf`.
    consumed: usize,
}

#[derive(Debug)]
struct OpenArray {
    remaining: usize,
    items: Vec<Frame>,
}

/// Outcome of parsing the element at the head of the buffer.
enum Step {
    Frame(Frame),
    /// An array header was read; its elements follow.
    Opened,
    Incomplete,
}

impl Decoder {
    /// Creates a new decoder with an empty buffer.
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Creates a new decoder with a custom maximum frame size.
    ///
    /// # Arguments
    ///
    /// * `max_frame_size` - Maximum size in bytes for a single frame
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_frame_size,
            open: Vec::new(),
            consumed: 0,
        }
    }

    /// Appends raw bytes to the internal buffer.
    ///
    /// Call this method when new data arrives from the network.
    pub fn append(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Returns the number of received bytes not yet returned as a frame,
    /// including the parsed part of a frame in progress.
    pub fn buffered(&self) -> usize {
        self.consumed + self.buf.len()
    }

    /// Attempts to decode a frame from the buffer.
    ///
    /// Returns `Ok(Some(Frame))` if a complete frame was decoded.
    /// Returns `Ok(None)` if more data is needed.
    /// Returns `Err(...)` if the data is malformed; the decoder is then in an
    /// unknown state and the connection should be dropped.
    pub fn decode(&mut self) -> Result<Option<Frame>, DecodeError> {
        loop {
            if self.buffered() > self.max_frame_size {
                return Err(DecodeError::new("buffer size exceeded maximum frame size"));
            }

            match self.step()? {
                Step::Incomplete => return Ok(None),
                Step::Opened => continue,
                Step::Frame(frame) => {
                    if let Some(frame) = self.complete(frame) {
                        self.consumed = 0;
                        return Ok(Some(frame));
                    }
                }
            }
        }
    }

    /// Adds a finished element to the innermost open array, closing every
    /// array it completes. Returns the top-level frame once there is one.
    fn complete(&mut self, mut frame: Frame) -> Option<Frame> {
        loop {
            let Some(array) = self.open.last_mut() else {
                return Some(frame);
            };
            array.items.push(frame);
            array.remaining -= 1;
            if array.remaining > 0 {
                return None;
            }
            let array = self.open.pop()?;
            frame = Frame::Array(array.items);
        }
    }

    /// Parses the element at the head of the buffer, consuming it only if
    /// it is complete.
    fn step(&mut self) -> Result<Step, DecodeError> {
        let Some(&kind) = self.buf.first() else {
            return Ok(Step::Incomplete);
        };
        let Some((line, next)) = read_line(&self.buf, 1) else {
            return Ok(Step::Incomplete);
        };

        match kind {
            b'+' => {
                let text = line.to_vec();
                self.take(next);
                Ok(Step::Frame(Frame::SimpleString(text)))
            }
            b'-' => {
                let text = line.to_vec();
                self.take(next);
                Ok(Step::Frame(Frame::Error(text)))
            }
            b':' => {
                let value = parse_number(line, "integer")?;
                self.take(next);
                Ok(Step::Frame(Frame::Integer(value)))
            }
            b'$' => {
                let len = parse_number(line, "bulk length")?;
                self.parse_bulk_string(len, next)
            }
            b'*' => {
                let len = parse_number(line, "array length")?;
                self.open_array(len, next)
            }
            other => Err(DecodeError::new(format!(
                "unknown frame type: {}",
                other as char
            ))),
        }
    }

    fn parse_bulk_string(&mut self, len: i64, header: usize) -> Result<Step, DecodeError> {
        if len == -1 {
            self.take(header);
            return Ok(Step::Frame(Frame::BulkString(None)));
        }
        if len < 0 {
            return Err(DecodeError::new(format!("invalid bulk length: {len}")));
        }

        let len = len as usize;
        if len > self.max_frame_size {
            return Err(DecodeError::new(
                "bulk string length exceeds maximum frame size",
            ));
        }

        let end = header + len;
        if self.buf.len() < end + 2 {
            return Ok(Step::Incomplete);
        }
        if &self.buf[end..end + 2] != b"\r\n" {
            return Err(DecodeError::new("bulk string is not terminated by CRLF"));
        }

        self.take(header);
        let data = self.buf.split_to(len).freeze();
        self.take(2);
        self.consumed += len;
        Ok(Step::Frame(Frame::BulkString(Some(data))))
    }

    fn open_array(&mut self, len: i64, header: usize) -> Result<Step, DecodeError> {
        if len == -1 {
            self.take(header);
            return Ok(Step::Frame(Frame::Null));
        }
        if len < 0 {
            return Err(DecodeError::new(format!("invalid array length: {len}")));
        }

        let len = len as usize;
        // Assume minimum 16 bytes per item
        if len > self.max_frame_size / 16 {
            return Err(DecodeError::new("array length exceeds reasonable maximum"));
        }

        self.take(header);
        if len == 0 {
            return Ok(Step::Frame(Frame::Array(Vec::new())));
        }
        if self.open.len() >= MAX_NESTING_DEPTH {
            return Err(DecodeError::new("array nesting too deep"));
        }
        self.open.push(OpenArray {
            remaining: len,
            items: Vec::with_capacity(len.min(1024)),
        });
        Ok(Step::Opened)
    }

    /// Drops `n` parsed bytes from the head of the buffer.
    fn take(&mut self, n: usize) {
        self.buf.advance(n);
        self.consumed += n;
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the line starting at `pos` (without CRLF) and the position after the CRLF.
fn read_line(buf: &[u8], pos: usize) -> Option<(&[u8], usize)> {
    let rest = buf.get(pos..)?;
    let offset = rest.windows(2).position(|w| w == b"\r\n")?;
    Some((&rest[..offset], pos + offset + 2))
}

fn parse_number(line: &[u8], what: &str) -> Result<i64, DecodeError> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            DecodeError::new(format!(
                "invalid {what}: {:?}",
                String::from_utf8_lossy(line)
            ))
        })
}
