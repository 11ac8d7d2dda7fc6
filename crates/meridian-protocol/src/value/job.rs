// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Job and incident payloads.

use meridian_model::DEFAULT_TENANT_ID;
use serde::{Deserialize, Serialize};

use crate::key::Key;

fn default_tenant() -> String {
    DEFAULT_TENANT_ID.to_string()
}

/// A unit of work created for a service task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    #[serde(rename = "type")]
    pub job_type: String,
    pub element_id: String,
    pub element_instance_key: Key,
    pub process_instance_key: Key,
    pub process_definition_key: Key,
    pub bpmn_process_id: String,
    pub process_definition_version: i32,
    #[serde(default = "default_tenant")]
    pub tenant_id: String,
}

/// An incident raised on an element instance or one of its jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    pub error_type: String,
    #[serde(default)]
    pub error_message: String,
    pub element_instance_key: Key,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_key: Option<Key>,
    pub process_instance_key: Key,
    pub element_id: String,
}
