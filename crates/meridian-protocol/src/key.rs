// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Partition-encoded keys.
//!
//! A key is a signed 64-bit integer whose upper bits hold the id of the
//! partition that generated it: `partition_id << 51 | counter`. Any record
//! key can therefore be routed back to its owning partition.

use serde::{Deserialize, Serialize};

/// Identity of a state-bearing entity.
pub type Key = i64;

/// Key of records that do not refer to an entity (e.g. a fresh command).
pub const NO_KEY: Key = -1;

/// Number of low bits reserved for the per-partition counter.
pub const KEY_BITS: u32 = 51;

/// Largest partition id that fits the key layout.
pub const MAX_PARTITION_ID: u16 = 4095;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("partition id {0} is out of range 1..={MAX_PARTITION_ID}")]
    InvalidPartitionId(u32),
}

/// First key of the given partition's key space.
pub fn encode_partition_id(partition_id: u16, counter: i64) -> Key {
    ((partition_id as i64) << KEY_BITS) + counter
}

/// Partition id encoded in `key`.
pub fn decode_partition_id(key: Key) -> u16 {
    (key >> KEY_BITS) as u16
}

/// Deterministic per-partition key generator.
///
/// The generator is part of the materialized partition state: replaying the
/// same log yields the same next key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyGenerator {
    partition_id: u16,
    next: Key,
}

impl KeyGenerator {
    pub fn new(partition_id: u16) -> Result<Self, KeyError> {
        if partition_id == 0 || partition_id > MAX_PARTITION_ID {
            return Err(KeyError::InvalidPartitionId(partition_id as u32));
        }
        Ok(Self {
            partition_id,
            next: encode_partition_id(partition_id, 1),
        })
    }

    pub fn partition_id(&self) -> u16 {
        self.partition_id
    }

    pub fn next_key(&mut self) -> Key {
        let key = self.next;
        self.next += 1;
        key
    }

    /// Peeks at the key [`KeyGenerator::next_key`] would hand out.
    pub fn peek(&self) -> Key {
        self.next
    }

    /// Advances past `key` if it belongs to this partition and is not yet
    /// covered. Used when applying events during replay.
    pub fn observe(&mut self, key: Key) {
        if key > 0 && decode_partition_id(key) == self.partition_id && key >= self.next {
            self.next = key + 1;
        }
    }
}
