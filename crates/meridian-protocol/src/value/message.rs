// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Message and message subscription payloads.

use meridian_model::DEFAULT_TENANT_ID;
use serde::{Deserialize, Serialize};

use super::Variables;
use crate::key::Key;
use crate::record::RequestMetadata;

fn default_tenant() -> String {
    DEFAULT_TENANT_ID.to_string()
}

/// A published message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub name: String,
    pub correlation_key: String,
    /// Optional de-duplication id, unique per name and correlation key while
    /// the message is buffered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Time to live in milliseconds. Zero or less means the message is not
    /// buffered.
    #[serde(default)]
    pub time_to_live: i64,
    #[serde(default)]
    pub variables: Variables,
    #[serde(default = "default_tenant")]
    pub tenant_id: String,
    /// Client call awaiting the correlation result, for synchronous
    /// correlation requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestMetadata>,
}

impl MessageRecord {
    pub fn new(name: impl Into<String>, correlation_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            correlation_key: correlation_key.into(),
            message_id: None,
            time_to_live: 0,
            variables: Variables::new(),
            tenant_id: default_tenant(),
            request: None,
        }
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    pub fn with_ttl(mut self, time_to_live_ms: i64) -> Self {
        self.time_to_live = time_to_live_ms;
        self
    }

    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    pub fn is_request_bound(&self) -> bool {
        self.request.is_some()
    }
}

/// A message subscription of a waiting element instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSubscriptionRecord {
    pub process_instance_key: Key,
    pub element_instance_key: Key,
    pub bpmn_process_id: String,
    /// Key of the message being correlated, set while correlating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_key: Option<Key>,
    pub message_name: String,
    pub correlation_key: String,
    #[serde(default = "interrupting_default")]
    pub interrupting: bool,
    #[serde(default)]
    pub variables: Variables,
    #[serde(default = "default_tenant")]
    pub tenant_id: String,
}

fn interrupting_default() -> bool {
    true
}

impl MessageSubscriptionRecord {
    pub fn new(
        process_instance_key: Key,
        element_instance_key: Key,
        bpmn_process_id: impl Into<String>,
        message_name: impl Into<String>,
        correlation_key: impl Into<String>,
    ) -> Self {
        Self {
            process_instance_key,
            element_instance_key,
            bpmn_process_id: bpmn_process_id.into(),
            message_key: None,
            message_name: message_name.into(),
            correlation_key: correlation_key.into(),
            interrupting: true,
            variables: Variables::new(),
            tenant_id: default_tenant(),
        }
    }

    pub fn non_interrupting(mut self) -> Self {
        self.interrupting = false;
        self
    }
}
