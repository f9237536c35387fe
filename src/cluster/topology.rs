//! Cluster topology data structures and the CLUSTER SLOTS parser.

use std::collections::HashMap;
use std::sync::Arc;

use crate::cluster::node::Node;
use crate::cluster::slot::{SlotMap, SLOT_COUNT};
use crate::core::{Error, Result};
use crate::proto::frame::Frame;

/// A range of hash slots assigned to a master.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRange {
    /// Start of the slot range (inclusive)
    pub start: u16,
    /// End of the slot range (inclusive)
    pub end: u16,
    /// Master node serving this slot range
    pub master: Node,
}

impl SlotRange {
    /// Returns true if the given slot is within this range.
    pub fn contains(&self, slot: u16) -> bool {
        slot >= self.start && slot <= self.end
    }

    /// Returns the number of slots in this range, 0 if `start > end`.
    pub fn len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        usize::from(self.end - self.start) + 1
    }

    /// Returns true if the range holds no slot.
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

/// Cluster topology as reported by one node.
#[derive(Debug, Clone, Default)]
pub struct ClusterTopology {
    /// Slot ranges in reply order
    pub slot_ranges: Vec<SlotRange>,
    /// Distinct masters in order of first appearance
    pub nodes: Vec<Node>,
}

impl ClusterTopology {
    /// Parses cluster topology from a CLUSTER SLOTS reply.
    ///
    /// # Arguments
    ///
    /// * `frame` - The reply to CLUSTER SLOTS
    /// * `contacted` - The node that produced the reply; an empty IP in a
    ///   node descriptor stands for this node's host
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if:
    /// - The frame is not an array
    /// - A slot bound is outside `[0, 16384)` or a range is reversed
    /// - A master descriptor is malformed
    ///
    /// Entries that are not arrays or have fewer than three elements are
    /// skipped.
    pub fn from_cluster_slots(frame: Frame, contacted: &Node) -> Result<Self> {
        let ranges = match frame {
            Frame::Array(arr) => arr,
            _ => return Err(protocol("CLUSTER SLOTS response must be an array")),
        };

        let mut topology = Self::default();
        for range_frame in ranges {
            let range_arr = match range_frame {
                Frame::Array(arr) if arr.len() >= 3 => arr,
                _ => continue,
            };

            let start = parse_slot(&range_arr[0])?;
            let end = parse_slot(&range_arr[1])?;
            if start > end {
                return Err(protocol(format!("invalid slot range {}-{}", start, end)));
            }

            let master = parse_node(&range_arr[2], contacted)?;
            if !topology.nodes.contains(&master) {
                topology.nodes.push(master.clone());
            }
            topology.slot_ranges.push(SlotRange { start, end, master });
        }

        Ok(topology)
    }

    /// Finds the master responsible for a given slot.
    pub fn master_for_slot(&self, slot: u16) -> Option<&Node> {
        self.slot_ranges
            .iter()
            .find(|range| range.contains(slot))
            .map(|range| &range.master)
    }

    /// Builds a fresh slot table from the ranges.
    ///
    /// Ranges owned by the same master share one node allocation.
    pub fn slot_map(&self) -> SlotMap {
        let mut shared: HashMap<&str, Arc<Node>> = HashMap::new();
        let mut map = SlotMap::new();
        for range in &self.slot_ranges {
            let node = shared
                .entry(range.master.name())
                .or_insert_with(|| Arc::new(range.master.clone()))
                .clone();
            map.assign_range(range.start, range.end, node);
        }
        map
    }
}

fn protocol(message: impl Into<String>) -> Error {
    Error::Protocol {
        message: message.into(),
    }
}

// Integers may come as integer replies or as bulk strings.
fn frame_int(frame: &Frame) -> Option<i64> {
    match frame {
        Frame::Integer(n) => Some(*n),
        Frame::BulkString(Some(data)) => std::str::from_utf8(data).ok()?.parse().ok(),
        _ => None,
    }
}

fn parse_slot(frame: &Frame) -> Result<u16> {
    match frame_int(frame) {
        Some(n) if (0..i64::from(SLOT_COUNT)).contains(&n) => Ok(n as u16),
        Some(n) => Err(protocol(format!("slot {} out of range", n))),
        None => Err(protocol("slot bound must be an integer")),
    }
}

fn parse_node(frame: &Frame, contacted: &Node) -> Result<Node> {
    let node_arr = match frame {
        Frame::Array(arr) if arr.len() >= 2 => arr,
        _ => return Err(protocol("node descriptor must be an array of at least 2 elements")),
    };

    let ip = match &node_arr[0] {
        Frame::BulkString(Some(data)) => String::from_utf8_lossy(data).into_owned(),
        Frame::SimpleString(data) => String::from_utf8_lossy(data).into_owned(),
        _ => return Err(protocol("node IP must be a string")),
    };
    let host = if ip.is_empty() {
        contacted.host().to_string()
    } else {
        ip
    };

    let port = frame_int(&node_arr[1])
        .and_then(|n| u16::try_from(n).ok())
        .ok_or_else(|| protocol("node port must be an integer in 0..65536"))?;

    Ok(Node::new(host, port))
}
