use crate::proto::codec::encode_frame;
use crate::proto::frame::Frame;
use bytes::Bytes;

/// Commands that carry no key and therefore cannot be routed to a slot.
const UNROUTABLE_COMMANDS: &[&str] = &["info", "multi", "exec", "slaveof", "config", "shutdown"];

/// Conversion of a command argument into its wire representation.
///
/// Every argument travels as a bulk string: text and bytes are sent as-is,
/// numbers are sent as their decimal text (`1000000` becomes `"1000000"`).
pub trait ToArg {
    /// Converts the value into the bytes sent on the wire.
    fn to_arg(self) -> Bytes;
}

impl ToArg for Bytes {
    fn to_arg(self) -> Bytes {
        self
    }
}

impl ToArg for &str {
    fn to_arg(self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl ToArg for String {
    fn to_arg(self) -> Bytes {
        Bytes::from(self)
    }
}

impl ToArg for &String {
    fn to_arg(self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl ToArg for &[u8] {
    fn to_arg(self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl<const N: usize> ToArg for &[u8; N] {
    fn to_arg(self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl ToArg for Vec<u8> {
    fn to_arg(self) -> Bytes {
        Bytes::from(self)
    }
}

macro_rules! impl_to_arg_display {
    ($($ty:ty),*) => {
        $(
            impl ToArg for $ty {
                fn to_arg(self) -> Bytes {
                    Bytes::from(self.to_string())
                }
            }
        )*
    };
}

impl_to_arg_display!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

/// A command ready to be sent to a cluster node.
///
/// Commands are built using the builder pattern and converted to frames
/// for transmission over the connection. The command name is not checked
/// against any list: anything is forwarded and routed by its first argument.
///
/// # Example
///
/// ```
/// use shardlink::Cmd;
///
/// let cmd = Cmd::new("SET").arg("counter").arg(1_000_000);
/// assert_eq!(cmd.routing_key(), Some(&b"counter"[..]));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Cmd {
    args: Vec<Bytes>,
}

impl Cmd {
    /// Creates a new command with the given name.
    ///
    /// # Arguments
    ///
    /// * `name` - The command name (e.g., "GET", "SET", "DEL")
    #[inline]
    pub fn new(name: impl ToArg) -> Self {
        Self {
            args: vec![name.to_arg()],
        }
    }

    /// Appends an argument to the command.
    ///
    /// # Arguments
    ///
    /// * `arg` - The argument value
    #[inline]
    pub fn arg<T: ToArg>(mut self, arg: T) -> Self {
        self.args.push(arg.to_arg());
        self
    }

    /// Returns the command name as sent.
    #[inline]
    pub fn name(&self) -> &[u8] {
        &self.args[0]
    }

    /// Returns the arguments following the command name.
    #[inline]
    pub fn args(&self) -> &[Bytes] {
        &self.args[1..]
    }

    /// Returns the key used to pick the slot this command is routed to.
    ///
    /// This is the first argument after the command name. Commands that make
    /// no sense on a cluster (`INFO`, `MULTI`, `EXEC`, `SLAVEOF`, `CONFIG`,
    /// `SHUTDOWN`) and commands without arguments have no key. For commands
    /// whose first argument is not a key the guess may be wrong; the
    /// cluster's redirections then lead to the right node anyway.
    pub fn routing_key(&self) -> Option<&[u8]> {
        let name = String::from_utf8_lossy(self.name()).to_ascii_lowercase();
        if UNROUTABLE_COMMANDS.contains(&name.as_str()) {
            return None;
        }
        self.args().first().map(|key| key.as_ref())
    }

    /// Returns the command name for log output.
    pub(crate) fn name_lossy(&self) -> String {
        String::from_utf8_lossy(self.name()).into_owned()
    }

    /// Converts the command to a RESP Array frame without consuming it.
    #[inline]
    pub fn to_frame(&self) -> Frame {
        Frame::Array(
            self.args
                .iter()
                .map(|b| Frame::BulkString(Some(b.clone())))
                .collect(),
        )
    }

    /// Converts the command to a RESP Array frame.
    #[inline]
    pub fn into_frame(self) -> Frame {
        Frame::Array(
            self.args
                .into_iter()
                .map(|b| Frame::BulkString(Some(b)))
                .collect(),
        )
    }

    /// Encodes the command into its request bytes.
    pub fn encode(&self) -> Bytes {
        encode_frame(&self.to_frame())
    }
}

/// Creates a GET command.
#[inline]
pub fn get(key: impl ToArg) -> Cmd {
    Cmd::new("GET").arg(key)
}

/// Creates a SET command.
#[inline]
pub fn set(key: impl ToArg, value: impl ToArg) -> Cmd {
    Cmd::new("SET").arg(key).arg(value)
}

/// Creates a DEL command.
#[inline]
pub fn del(key: impl ToArg) -> Cmd {
    Cmd::new("DEL").arg(key)
}

/// Creates an EXISTS command.
#[inline]
pub fn exists(key: impl ToArg) -> Cmd {
    Cmd::new("EXISTS").arg(key)
}

/// Creates an INCR command.
#[inline]
pub fn incr(key: impl ToArg) -> Cmd {
    Cmd::new("INCR").arg(key)
}

/// Creates an EXPIRE command.
#[inline]
pub fn expire(key: impl ToArg, seconds: u64) -> Cmd {
    Cmd::new("EXPIRE").arg(key).arg(seconds)
}

fn server_error(e: &[u8]) -> crate::Error {
    crate::Error::Server {
        message: String::from_utf8_lossy(e).into_owned(),
    }
}

/// Parses a frame as a status response, turning error replies into errors.
#[inline]
pub fn parse_frame_response(frame: Frame) -> Result<Frame, crate::Error> {
    match frame {
        Frame::Error(e) => Err(server_error(&e)),
        _ => Ok(frame),
    }
}

/// Converts a frame to bytes.
#[inline]
pub fn frame_to_bytes(frame: Frame) -> Result<Option<Bytes>, crate::Error> {
    match frame {
        Frame::BulkString(b) => Ok(b),
        Frame::Null => Ok(None),
        Frame::Error(e) => Err(server_error(&e)),
        _ => Err(crate::Error::Protocol {
            message: "unexpected frame type".to_string(),
        }),
    }
}

/// Converts a frame to an integer.
#[inline]
pub fn frame_to_int(frame: Frame) -> Result<i64, crate::Error> {
    match frame {
        Frame::Integer(i) => Ok(i),
        Frame::Error(e) => Err(server_error(&e)),
        _ => Err(crate::Error::Protocol {
            message: "unexpected frame type".to_string(),
        }),
    }
}

/// Converts an integer reply to a boolean (`0` is false).
///
/// The codec never does this on its own; commands such as EXISTS opt in.
#[inline]
pub fn frame_to_bool(frame: Frame) -> Result<bool, crate::Error> {
    frame_to_int(frame).map(|i| i != 0)
}
