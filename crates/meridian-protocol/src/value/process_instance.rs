// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Process instance, migration and event trigger payloads.

use meridian_model::{BpmnElementType, DEFAULT_TENANT_ID};
use serde::{Deserialize, Serialize};

use super::Variables;
use crate::key::Key;

fn default_tenant() -> String {
    DEFAULT_TENANT_ID.to_string()
}

/// The state of one element instance of a process instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInstanceRecord {
    pub bpmn_process_id: String,
    pub version: i32,
    pub process_definition_key: Key,
    pub process_instance_key: Key,
    pub element_id: String,
    /// Key of the enclosing element instance. `None` for the root process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_scope_key: Option<Key>,
    pub bpmn_element_type: BpmnElementType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_process_instance_key: Option<Key>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_element_instance_key: Option<Key>,
    #[serde(default = "default_tenant")]
    pub tenant_id: String,
}

impl ProcessInstanceRecord {
    pub fn is_root(&self) -> bool {
        self.flow_scope_key.is_none()
    }
}

/// Maps an element of the source definition to one of the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingInstruction {
    pub source_element_id: String,
    pub target_element_id: String,
}

impl MappingInstruction {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source_element_id: source.into(),
            target_element_id: target.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInstanceMigrationRecord {
    pub process_instance_key: Key,
    pub target_process_definition_key: Key,
    #[serde(default)]
    pub mapping_instructions: Vec<MappingInstruction>,
}

/// A pending event trigger on an element scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessEventRecord {
    pub scope_key: Key,
    pub target_element_id: String,
    #[serde(default)]
    pub variables: Variables,
    pub process_definition_key: Key,
    pub process_instance_key: Key,
}
