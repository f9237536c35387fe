//! Parsing utilities for Redis Cluster error replies.
//!
//! Redis Cluster uses special error replies for redirects:
//! - `MOVED <slot> <host>:<port>` - Permanent redirect
//! - `ASK <slot> <host>:<port>` - Temporary redirect during migration
//!
//! Every other error reply, malformed redirects included, is passed through.

use crate::cluster::node::Node;

/// A classified error reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ErrorReply {
    /// The slot has a new owner.
    Moved { slot: u16, node: Node },
    /// The slot is being migrated; retry once on `node` after `ASKING`.
    Ask { slot: u16, node: Node },
    /// Any other error, with its full text.
    Other(String),
}

/// Classifies the text of an error reply.
///
/// # Arguments
///
/// * `error_msg` - The error message bytes without the leading `-` (e.g. b"MOVED 3999 127.0.0.1:7000")
pub(crate) fn parse_error_reply(error_msg: &[u8]) -> ErrorReply {
    let msg = String::from_utf8_lossy(error_msg);
    let msg = msg.trim();

    if let Some(stripped) = msg.strip_prefix("MOVED ") {
        if let Some((slot, node)) = parse_redirect(stripped) {
            return ErrorReply::Moved { slot, node };
        }
    }

    if let Some(stripped) = msg.strip_prefix("ASK ") {
        if let Some((slot, node)) = parse_redirect(stripped) {
            return ErrorReply::Ask { slot, node };
        }
    }

    ErrorReply::Other(msg.to_string())
}

/// Parses redirect arguments: "<slot> <host>:<port>"
fn parse_redirect(args: &str) -> Option<(u16, Node)> {
    let parts: Vec<&str> = args.split_whitespace().collect();
    if parts.len() != 2 {
        return None;
    }

    let slot: u16 = parts[0].parse().ok()?;
    if slot >= crate::cluster::SLOT_COUNT {
        return None;
    }
    let (host, port) = parts[1].rsplit_once(':')?;
    let port: u16 = port.parse().ok()?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return None;
    }

    Some((slot, Node::new(host, port)))
}
