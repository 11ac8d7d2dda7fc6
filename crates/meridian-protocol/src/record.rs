// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The log entry envelope.

use chrono::{DateTime, Utc};
use meridian_model::DEFAULT_TENANT_ID;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::intent::Intent;
use crate::key::{Key, NO_KEY};
use crate::value::RecordValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordType {
    Command,
    Event,
    CommandRejection,
}

/// Why a command was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionType {
    NotFound,
    InvalidState,
    InvalidArgument,
    AlreadyExists,
}

/// Identifies a client call waiting for a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMetadata {
    pub request_id: i64,
    pub request_stream_id: i32,
}

impl RequestMetadata {
    pub fn new(request_id: i64, request_stream_id: i32) -> Self {
        Self {
            request_id,
            request_stream_id,
        }
    }
}

/// Tenants the issuer of a command may act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorizations {
    pub authorized_tenant_ids: Vec<String>,
}

impl Default for Authorizations {
    fn default() -> Self {
        Self {
            authorized_tenant_ids: vec![DEFAULT_TENANT_ID.to_string()],
        }
    }
}

impl Authorizations {
    pub fn tenants<I, S>(tenants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            authorized_tenant_ids: tenants.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_authorized(&self, tenant_id: &str) -> bool {
        self.authorized_tenant_ids.iter().any(|t| t == tenant_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionInfo {
    pub rejection_type: RejectionType,
    pub reason: String,
}

/// One entry of a partition's log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub position: i64,
    /// Position of the command this record was produced for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_position: Option<i64>,
    pub key: Key,
    pub record_type: RecordType,
    pub intent: Intent,
    pub value: RecordValue,
    pub timestamp: DateTime<Utc>,
    pub partition_id: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<RejectionInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestMetadata>,
    #[serde(default)]
    pub authorizations: Authorizations,
}

impl Record {
    /// Whether the payload belongs to the intent's value type.
    pub fn intent_matches_value(&self) -> bool {
        self.intent.value_type() == self.value.value_type()
    }

    pub fn is_command(&self) -> bool {
        self.record_type == RecordType::Command
    }

    pub fn is_event(&self) -> bool {
        self.record_type == RecordType::Event
    }

    pub fn is_rejection(&self) -> bool {
        self.record_type == RecordType::CommandRejection
    }
}

/// A command submitted to a partition, before it is assigned a log position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    pub intent: Intent,
    pub value: RecordValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestMetadata>,
    #[serde(default)]
    pub authorizations: Authorizations,
}

impl Command {
    pub fn new(intent: impl Into<Intent>, value: impl Into<RecordValue>) -> Self {
        Self {
            key: None,
            intent: intent.into(),
            value: value.into(),
            request: None,
            authorizations: Authorizations::default(),
        }
    }

    pub fn with_key(mut self, key: Key) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_request(mut self, request_id: i64, request_stream_id: i32) -> Self {
        self.request = Some(RequestMetadata::new(request_id, request_stream_id));
        self
    }

    pub fn with_authorizations(mut self, authorizations: Authorizations) -> Self {
        self.authorizations = authorizations;
        self
    }

    /// Turns the command into a log record.
    pub fn into_record(self, position: i64, partition_id: u16, timestamp: DateTime<Utc>) -> Record {
        Record {
            position,
            source_position: None,
            key: self.key.unwrap_or(NO_KEY),
            record_type: RecordType::Command,
            intent: self.intent,
            value: self.value,
            timestamp,
            partition_id,
            rejection: None,
            request: self.request,
            authorizations: self.authorizations,
        }
    }
}
