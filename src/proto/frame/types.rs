use bytes::Bytes;

/// A RESP (Redis Serialization Protocol) frame.
///
/// This enum represents the reply kinds a cluster node can send back:
/// - SimpleString: Status responses like "OK"
/// - Error: Error responses, `<CODE> <message>`
/// - Integer: Numeric responses (never coerced to booleans here)
/// - BulkString: Binary-safe payloads, `None` for the `$-1` nil bulk
/// - Array: Command arguments and multi-bulk responses
/// - Null: The `*-1` nil array
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Simple string (+OK).
    SimpleString(Vec<u8>),
    /// Error (-ERR).
    Error(Vec<u8>),
    /// Integer (:1000).
    Integer(i64),
    /// Bulk string ($6\r\nfoobar).
    BulkString(Option<Bytes>),
    /// Array (*2\r\n...).
    Array(Vec<Frame>),
    /// Null array (*-1).
    Null,
}

impl Frame {
    /// Converts the frame to a human-readable string representation.
    ///
    /// For complex frames like arrays, returns a formatted string representation.
    ///
    /// # Returns
    ///
    /// Some(String) if conversion succeeds, None for frames without string representation
    pub fn as_text(&self) -> Option<String> {
        match self {
            Frame::SimpleString(s) => String::from_utf8(s.clone()).ok(),
            Frame::Error(e) => String::from_utf8(e.clone()).ok(),
            Frame::Integer(i) => Some(i.to_string()),
            Frame::BulkString(b) => b.as_ref().map(|s| String::from_utf8_lossy(s).into_owned()),
            Frame::Array(a) => Some(format!(
                "[{}]",
                a.iter()
                    .map(|f| f.as_text().unwrap_or_else(|| "nil".to_string()))
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            Frame::Null => Some("nil".to_string()),
        }
    }

    /// Attempts to extract a bulk string from this frame.
    ///
    /// # Returns
    ///
    /// Some(Bytes) if this is a non-nil BulkString, None otherwise
    pub fn to_bulk_string(&self) -> Option<Bytes> {
        match self {
            Frame::BulkString(b) => b.clone(),
            _ => None,
        }
    }

    /// Attempts to extract an integer from this frame.
    pub fn to_int(&self) -> Option<i64> {
        match self {
            Frame::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns true for both nil kinds: the nil bulk and the nil array.
    pub fn is_nil(&self) -> bool {
        matches!(self, Frame::Null | Frame::BulkString(None))
    }

    /// Returns true if this frame is an error reply.
    pub fn is_error(&self) -> bool {
        matches!(self, Frame::Error(_))
    }

    /// Returns the code of an error reply, i.e. its first whitespace-delimited word.
    ///
    /// `-MOVED 3999 127.0.0.1:6381` has the code `MOVED`. Non-error frames
    /// have no code.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Frame::Error(e) => std::str::from_utf8(e)
                .ok()
                .and_then(|s| s.split_whitespace().next()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_as_text() {
        let frame = Frame::SimpleString(b"OK".to_vec());
        assert_eq!(frame.as_text(), Some("OK".to_string()));

        let frame = Frame::Integer(42);
        assert_eq!(frame.as_text(), Some("42".to_string()));

        let frame = Frame::Null;
        assert_eq!(frame.as_text(), Some("nil".to_string()));
    }

    #[test]
    fn test_frame_to_bulk_string() {
        let data: Bytes = "hello".into();
        let frame = Frame::BulkString(Some(data.clone()));
        assert_eq!(frame.to_bulk_string(), Some(data));

        let frame = Frame::Integer(42);
        assert_eq!(frame.to_bulk_string(), None);
    }

    #[test]
    fn test_frame_to_int() {
        assert_eq!(Frame::Integer(42).to_int(), Some(42));
        assert_eq!(Frame::Null.to_int(), None);
    }

    #[test]
    fn test_frame_is_nil() {
        assert!(Frame::Null.is_nil());
        assert!(Frame::BulkString(None).is_nil());
        assert!(!Frame::Integer(0).is_nil());
    }

    #[test]
    fn test_array_with_nil_to_text() {
        let frame = Frame::Array(vec![
            Frame::BulkString(Some(Bytes::from("a"))),
            Frame::BulkString(None),
            Frame::BulkString(Some(Bytes::from("foo"))),
        ]);
        assert_eq!(frame.as_text(), Some("[a, nil, foo]".to_string()));
    }

    #[test]
    fn test_error_code() {
        let frame = Frame::Error(b"MOVED 3999 127.0.0.1:6381".to_vec());
        assert!(frame.is_error());
        assert_eq!(frame.error_code(), Some("MOVED"));

        assert_eq!(Frame::Error(b"FAIL".to_vec()).error_code(), Some("FAIL"));
        assert_eq!(Frame::Error(Vec::new()).error_code(), None);
        assert_eq!(Frame::Integer(1).error_code(), None);
    }
}
