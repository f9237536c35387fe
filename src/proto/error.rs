use std::io;

use thiserror::Error;

/// Result type alias for shardlink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to a cluster.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// An IO error occurred on an established connection.
    #[error("IO error: {source}")]
    Io {
        /// The underlying IO error.
        #[from]
        source: io::Error,
    },

    /// A connection to a node could not be established.
    #[error("cannot connect to {address}: {source}")]
    Connect {
        /// Address of the node (host:port).
        address: String,
        /// The underlying IO error.
        source: io::Error,
    },

    /// Connecting to a node did not finish in time.
    #[error("timed out connecting to {address}")]
    Timeout {
        /// Address of the node (host:port).
        address: String,
    },

    /// A protocol error occurred: malformed frame or a stream closed mid-reply.
    #[error("protocol error: {message}")]
    Protocol {
        /// Description of the error.
        message: String,
    },

    /// The command cannot be dispatched to the cluster.
    ///
    /// Raised for commands without a routable key, such as `INFO` or `MULTI`.
    #[error("parser error: {message}")]
    Parser {
        /// Description of the error.
        message: String,
    },

    /// The server returned an error.
    #[error("server error: {message}")]
    Server {
        /// Error message from server.
        message: String,
    },

    /// Invalid argument provided.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of invalid argument.
        message: String,
    },

    /// The command kept being redirected until its attempt budget ran out.
    #[error("too many cluster redirections after {attempts} attempts (last error: {last_error})")]
    TooManyRedirections {
        /// Number of attempts made.
        attempts: usize,
        /// The last redirection or transport error observed.
        last_error: String,
    },

    /// No startup node answered the topology query.
    #[error("cluster topology unavailable: no startup node returned the slot table")]
    TopologyUnavailable,
}

impl Error {
    /// Returns true for failures of the transport rather than of the command.
    ///
    /// The router counts these as a failed attempt and moves on.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Io { .. } | Error::Connect { .. } | Error::Timeout { .. } | Error::Protocol { .. }
        )
    }

    pub(crate) fn connection_closed() -> Self {
        Error::Io {
            source: io::Error::new(io::ErrorKind::BrokenPipe, "connection closed"),
        }
    }
}

/// Error returned when frame decoding fails.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DecodeError {
    message: String,
}

impl DecodeError {
    /// Creates a new decode error with the given description.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<DecodeError> for Error {
    fn from(err: DecodeError) -> Self {
        Error::Protocol {
            message: err.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_io() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");
        let error = Error::Io { source: io_err };
        assert!(error.to_string().contains("IO error"));
    }

    #[test]
    fn test_error_display_protocol() {
        let error = Error::Protocol {
            message: "invalid frame".to_string(),
        };
        assert_eq!(error.to_string(), "protocol error: invalid frame");
    }

    #[test]
    fn test_error_display_parser() {
        let error = Error::Parser {
            message: "no key".to_string(),
        };
        assert_eq!(error.to_string(), "parser error: no key");
    }

    #[test]
    fn test_error_display_too_many_redirections() {
        let error = Error::TooManyRedirections {
            attempts: 16,
            last_error: "MOVED 1 10.0.0.1:7000".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "too many cluster redirections after 16 attempts (last error: MOVED 1 10.0.0.1:7000)"
        );
    }

    #[test]
    fn test_error_display_connect() {
        let error = Error::Connect {
            address: "10.0.0.1:7000".to_string(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert_eq!(error.to_string(), "cannot connect to 10.0.0.1:7000: refused");
    }

    #[test]
    fn test_is_transport() {
        assert!(Error::connection_closed().is_transport());
        assert!(Error::Timeout {
            address: "a:1".to_string()
        }
        .is_transport());
        assert!(!Error::Parser {
            message: String::new()
        }
        .is_transport());
        assert!(!Error::TopologyUnavailable.is_transport());
        assert!(!Error::Server {
            message: "ERR".to_string()
        }
        .is_transport());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::Other, "test");
        let error: Error = io_err.into();
        assert!(matches!(error, Error::Io { .. }));
    }

    #[test]
    fn test_error_from_decode() {
        let error: Error = DecodeError::new("bad frame").into();
        assert!(matches!(error, Error::Protocol { ref message } if message == "bad frame"));
    }
}
