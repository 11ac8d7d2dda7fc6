// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for meridian-engine.
//!
//! Two outcomes are distinguished:
//!
//! - [`Rejection`]: the command is refused. This is ordinary data that ends
//!   up as a `COMMAND_REJECTION` record and a rejection response.
//! - [`EngineError`]: a defect (corrupt payload, broken state invariant).
//!   Partition processing stops.

use meridian_protocol::{Intent, Key, KeyError, RecordType, RejectionType, ValueType};

/// Result type using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

/// Fatal errors that stop partition processing.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A record's payload does not belong to its intent's value type.
    #[error("record at position {position} has intent {intent} but carries a {value_type} value")]
    IntentValueMismatch {
        position: i64,
        intent: Intent,
        value_type: ValueType,
    },

    /// A record of the wrong type was handed to a component.
    #[error("expected {expected} record at position {position} but got {actual}")]
    UnexpectedRecordType {
        position: i64,
        expected: RecordType,
        actual: RecordType,
    },

    /// An active process instance refers to a definition that is not deployed.
    #[error("process definition with key '{key}' is referenced but not deployed")]
    MissingProcessDefinition { key: Key },

    /// An event refers to a message subscription that does not exist.
    #[error(
        "no message subscription for element instance '{element_instance_key}' and message '{message_name}'"
    )]
    MissingSubscription {
        element_instance_key: Key,
        message_name: String,
    },

    /// An event refers to an element instance that does not exist.
    #[error("no element instance with key '{key}'")]
    MissingElementInstance { key: Key },

    /// The partition stopped after an earlier fatal error.
    #[error("partition {partition_id} has failed and no longer processes records")]
    PartitionFailed { partition_id: u16 },

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A refused command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub rejection_type: RejectionType,
    pub reason: String,
}

impl Rejection {
    pub fn new(rejection_type: RejectionType, reason: impl Into<String>) -> Self {
        Self {
            rejection_type,
            reason: reason.into(),
        }
    }

    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::new(RejectionType::NotFound, reason)
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::new(RejectionType::InvalidState, reason)
    }

    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::new(RejectionType::InvalidArgument, reason)
    }

    pub fn already_exists(reason: impl Into<String>) -> Self {
        Self::new(RejectionType::AlreadyExists, reason)
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.rejection_type, self.reason)
    }
}

/// Outcome of a command processor that did not succeed.
#[derive(Debug)]
pub enum ProcessingError {
    Rejected(Rejection),
    Fatal(EngineError),
}

impl From<Rejection> for ProcessingError {
    fn from(rejection: Rejection) -> Self {
        ProcessingError::Rejected(rejection)
    }
}

impl From<EngineError> for ProcessingError {
    fn from(error: EngineError) -> Self {
        ProcessingError::Fatal(error)
    }
}
