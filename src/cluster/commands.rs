//! Redis Cluster command builders.
//!
//! Commands the router itself issues for topology discovery and redirect
//! handling.

use crate::core::command::Cmd;

/// Creates a CLUSTER SLOTS command.
///
/// Returns information about which cluster slots are mapped to which Redis instances.
/// This is the primary method for discovering cluster topology.
///
/// # Response Format
///
/// An array of `[start, end, [ip, port, id?], replicas...]` entries.
pub fn cluster_slots() -> Cmd {
    Cmd::new("CLUSTER").arg("SLOTS")
}

/// Creates an ASKING command.
///
/// Sent before retrying a command that received an ASK redirect. It only
/// affects the immediately following command on the same connection.
pub fn asking() -> Cmd {
    Cmd::new("ASKING")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::frame::Frame;
    use bytes::Bytes;

    #[test]
    fn test_cluster_slots_cmd() {
        let frame = cluster_slots().into_frame();

        if let Frame::Array(arr) = frame {
            assert_eq!(arr.len(), 2);
            assert_eq!(arr[0], Frame::BulkString(Some(Bytes::from("CLUSTER"))));
            assert_eq!(arr[1], Frame::BulkString(Some(Bytes::from("SLOTS"))));
        } else {
            panic!("Expected Array frame");
        }
    }

    #[test]
    fn test_asking_cmd() {
        assert_eq!(asking().encode(), Bytes::from_static(b"*1\r\n$6\r\nASKING\r\n"));
    }
}
