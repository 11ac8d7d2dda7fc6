// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Meridian Protocol
//!
//! Wire-level vocabulary of the partitioned record log:
//!
//! - [`Record`]: the log entry envelope (commands, events, rejections)
//! - [`Intent`]: the discriminated `(value type, intent)` pair of a record
//! - [`RecordValue`]: the typed payload of a record
//! - [`Key`] encoding: 64-bit keys carrying the owning partition id
//!
//! # Records
//!
//! Every log entry is a [`Record`]. Commands are requests to change state,
//! events describe state changes that happened, and command rejections
//! record that a command was refused. Follow-up events reference the command
//! that produced them through `source_position`.

pub mod intent;
pub mod key;
pub mod record;
pub mod value;

pub use intent::{
    IncidentIntent, Intent, JobIntent, MessageIntent, MessageSubscriptionIntent,
    ProcessEventIntent, ProcessInstanceIntent, ProcessInstanceMigrationIntent, ProcessIntent,
    ValueType,
};
pub use key::{
    KEY_BITS, Key, KeyError, KeyGenerator, MAX_PARTITION_ID, NO_KEY, decode_partition_id,
    encode_partition_id,
};
pub use meridian_model::DEFAULT_TENANT_ID;
pub use record::{
    Authorizations, Command, Record, RecordType, RejectionInfo, RejectionType, RequestMetadata,
};
pub use value::{
    IncidentRecord, JobRecord, MappingInstruction, MessageRecord, MessageSubscriptionRecord,
    ProcessEventRecord, ProcessInstanceMigrationRecord, ProcessInstanceRecord, RecordValue,
    Variables,
};
