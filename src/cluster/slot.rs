//! Redis Cluster slot calculation and the slot table.
//!
//! Keys map to one of 16384 slots through CRC16 (XMODEM variant). The
//! [`SlotMap`] records which node owns each slot.

use std::sync::Arc;

use crc::{Crc, CRC_16_XMODEM};

use super::node::Node;

/// Number of hash slots in Redis Cluster.
pub const SLOT_COUNT: u16 = 16384;

/// CRC-16/XMODEM: polynomial 0x1021, init 0, no reflection.
const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Calculates the Redis Cluster slot for a given key.
///
/// If the key contains `{...}` with at least one byte between the braces,
/// only that content is hashed (hash tags).
///
/// # Examples
///
/// ```
/// use shardlink::key_slot;
///
/// assert_eq!(key_slot("foo"), 12182);
/// assert_eq!(key_slot("{user1000}.following"), key_slot("{user1000}.followers"));
/// assert_ne!(key_slot("user1000"), key_slot("user2000"));
/// ```
pub fn key_slot(key: impl AsRef<[u8]>) -> u16 {
    let hash_key = extract_hash_tag(key.as_ref());
    CRC16.checksum(hash_key) % SLOT_COUNT
}

/// Extracts the hash tag from a key.
///
/// - `{user1000}.following` → `user1000`
/// - `foo{bar}baz` → `bar`
/// - `foo{}{bar}` → whole key (the first tag is empty)
/// - `foo` → whole key
fn extract_hash_tag(key: &[u8]) -> &[u8] {
    if let Some(start) = key.iter().position(|&b| b == b'{') {
        if let Some(len) = key[start + 1..].iter().position(|&b| b == b'}') {
            if len > 0 {
                return &key[start + 1..start + 1 + len];
            }
        }
    }
    key
}

/// Fixed-size table mapping each slot to the node that owns it.
///
/// Entries are written two ways: [`assign_range`](Self::assign_range) while
/// building a table from discovery, and [`update_slot`](Self::update_slot)
/// for a single provisional correction after a `MOVED` reply. A discovered
/// table replaces the live one wholesale through
/// [`replace_with`](Self::replace_with).
#[derive(Debug, Clone)]
pub struct SlotMap {
    slots: Vec<Option<Arc<Node>>>,
}

impl SlotMap {
    /// Creates a table with every slot unowned.
    pub fn new() -> Self {
        Self {
            slots: vec![None; SLOT_COUNT as usize],
        }
    }

    /// Returns the owner of `slot`, or `None` if the slot is unowned or out of range.
    pub fn lookup(&self, slot: u16) -> Option<Arc<Node>> {
        self.slots.get(slot as usize).cloned().flatten()
    }

    /// Assigns every slot in the inclusive range `[start, end]` to `node`.
    ///
    /// Slots past the end of the table are ignored.
    pub fn assign_range(&mut self, start: u16, end: u16, node: Arc<Node>) {
        let end = end.min(SLOT_COUNT - 1);
        if start > end {
            return;
        }
        for entry in &mut self.slots[start as usize..=end as usize] {
            *entry = Some(node.clone());
        }
    }

    /// Points a single slot at `node`.
    pub fn update_slot(&mut self, slot: u16, node: Arc<Node>) {
        if let Some(entry) = self.slots.get_mut(slot as usize) {
            *entry = Some(node);
        }
    }

    /// Replaces the whole table with `other`.
    pub fn replace_with(&mut self, other: SlotMap) {
        *self = other;
    }

    /// Forgets every owner.
    pub fn flush(&mut self) {
        self.slots.iter_mut().for_each(|entry| *entry = None);
    }

    /// Returns true if no slot has an owner.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Returns true if every slot has an owner.
    pub fn is_fully_covered(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }
}

impl Default for SlotMap {
    fn default() -> Self {
        Self::new()
    }
}
