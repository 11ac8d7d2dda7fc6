// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Preconditions of a process instance migration.
//!
//! Each check is a pure function over state views that either passes or
//! returns a [`MigrationFailure`] with a fully formatted reason. The
//! migration processor runs them in this order and stops at the first
//! failure:
//!
//! | # | Check | Rejection |
//! |---|-------|-----------|
//! | 1 | [`require_non_null_process_instance`] | `NOT_FOUND` |
//! | 2 | [`require_authorized_tenant`] | `NOT_FOUND` |
//! | 3 | [`require_null_parent`] | `INVALID_STATE` |
//! | 4 | [`require_non_null_target_process_definition`] | `NOT_FOUND` |
//! | 5 | [`require_non_duplicate_source_element_ids`] | `INVALID_ARGUMENT` |
//! | 6 | [`require_referred_elements_exist`] | `INVALID_ARGUMENT` |
//! | 7 | [`require_no_event_subprocess`] | `INVALID_STATE` |
//! | 8 | [`require_supported_element_type`] | `INVALID_STATE` |
//! | 9 | [`require_non_null_target_element_id`] | `INVALID_STATE` |
//! | 10 | [`require_no_incident`] | `INVALID_STATE` |
//! | 11 | [`require_same_element_type`] | `INVALID_STATE` |
//! | 12 | [`require_unchanged_flow_scope`] | `INVALID_STATE` |
//! | 13 | [`require_no_boundary_events_in_source`] | `INVALID_STATE` |
//! | 14 | [`require_no_boundary_events_in_target`] | `INVALID_STATE` |
//! | 15 | [`require_no_concurrent_command`] | `INVALID_STATE` |
//!
//! Checks 1 to 7 concern the instance as a whole; 8 to 15 run for every
//! active element instance.

use std::collections::{BTreeSet, HashMap};

use meridian_model::{DeployedProcess, ElementTypeSet};
use meridian_protocol::{Authorizations, Key, MappingInstruction, RejectionType};

use crate::error::{ProcessingError, Rejection};
use crate::state::{ElementInstance, EventScopeInstanceState, IncidentState};

/// A failed migration precondition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFailure {
    pub rejection_type: RejectionType,
    pub message: String,
}

impl MigrationFailure {
    fn not_found(message: String) -> Self {
        Self {
            rejection_type: RejectionType::NotFound,
            message,
        }
    }

    fn invalid_state(message: String) -> Self {
        Self {
            rejection_type: RejectionType::InvalidState,
            message,
        }
    }

    fn invalid_argument(message: String) -> Self {
        Self {
            rejection_type: RejectionType::InvalidArgument,
            message,
        }
    }
}

impl From<MigrationFailure> for Rejection {
    fn from(failure: MigrationFailure) -> Self {
        Rejection::new(failure.rejection_type, failure.message)
    }
}

impl From<MigrationFailure> for ProcessingError {
    fn from(failure: MigrationFailure) -> Self {
        ProcessingError::Rejected(failure.into())
    }
}

pub type CheckResult<T = ()> = Result<T, MigrationFailure>;

/// Source to target element ids of one migration.
///
/// Explicit mapping instructions take precedence. The root process element
/// maps implicitly to the root of the target process.
#[derive(Debug, Clone)]
pub struct ElementMapping<'a> {
    explicit: HashMap<&'a str, &'a str>,
    source_process_id: &'a str,
    target_process_id: &'a str,
}

impl<'a> ElementMapping<'a> {
    pub fn new(
        source: &'a DeployedProcess,
        target: &'a DeployedProcess,
        instructions: &'a [MappingInstruction],
    ) -> Self {
        Self {
            explicit: instructions
                .iter()
                .map(|i| (i.source_element_id.as_str(), i.target_element_id.as_str()))
                .collect(),
            source_process_id: source.bpmn_process_id(),
            target_process_id: target.bpmn_process_id(),
        }
    }

    /// Target of an explicit mapping instruction.
    pub fn explicit_target(&self, source_element_id: &str) -> Option<&'a str> {
        self.explicit.get(source_element_id).copied()
    }

    /// Target of `source_element_id`, including the implicit root mapping.
    pub fn target_of(&self, source_element_id: &str) -> Option<&'a str> {
        self.explicit_target(source_element_id).or_else(|| {
            (source_element_id == self.source_process_id).then_some(self.target_process_id)
        })
    }
}

// ============================================================================
// Process instance checks
// ============================================================================

fn process_instance_not_found(process_instance_key: Key) -> MigrationFailure {
    MigrationFailure::not_found(format!(
        "Expected to migrate process instance but no process instance found with key '{}'",
        process_instance_key
    ))
}

/// Check 1: the process instance exists.
pub fn require_non_null_process_instance(
    instance: Option<ElementInstance>,
    process_instance_key: Key,
) -> CheckResult<ElementInstance> {
    instance.ok_or_else(|| process_instance_not_found(process_instance_key))
}

/// Check 2: the requester may access the instance's tenant. Reported exactly
/// like a missing instance.
pub fn require_authorized_tenant(
    authorizations: &Authorizations,
    tenant_id: &str,
    process_instance_key: Key,
) -> CheckResult {
    if authorizations.is_authorized(tenant_id) {
        Ok(())
    } else {
        Err(process_instance_not_found(process_instance_key))
    }
}

/// Check 3: child process instances are not migrated on their own.
pub fn require_null_parent(
    parent_process_instance_key: Option<Key>,
    process_instance_key: Key,
) -> CheckResult {
    match parent_process_instance_key {
        None => Ok(()),
        Some(_) => Err(MigrationFailure::invalid_state(format!(
            "Expected to migrate process instance '{}' but process instance is a child process instance. Child process instances cannot be migrated.",
            process_instance_key
        ))),
    }
}

/// Check 4: the target process definition is deployed.
pub fn require_non_null_target_process_definition(
    target: Option<&DeployedProcess>,
    target_process_definition_key: Key,
    process_instance_key: Key,
) -> CheckResult<&DeployedProcess> {
    target.ok_or_else(|| {
        MigrationFailure::not_found(format!(
            "Expected to migrate process instance '{}' to process definition with key '{}' but no process definition found with this key",
            process_instance_key, target_process_definition_key
        ))
    })
}

/// Check 5: no source element id is mapped twice.
pub fn require_non_duplicate_source_element_ids(
    instructions: &[MappingInstruction],
    process_instance_key: Key,
) -> CheckResult {
    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();
    for instruction in instructions {
        if !seen.insert(instruction.source_element_id.as_str()) {
            duplicates.insert(instruction.source_element_id.as_str());
        }
    }

    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(MigrationFailure::invalid_argument(format!(
            "Expected to migrate process instance '{}' but the mapping instructions contain duplicate source element ids '{}'.",
            process_instance_key,
            format_list(duplicates)
        )))
    }
}

/// Check 6: every mapped element exists in its definition.
pub fn require_referred_elements_exist(
    source: &DeployedProcess,
    target: &DeployedProcess,
    instructions: &[MappingInstruction],
    process_instance_key: Key,
) -> CheckResult {
    for instruction in instructions {
        if source
            .get_element_by_id(&instruction.source_element_id)
            .is_none()
        {
            return Err(MigrationFailure::invalid_argument(format!(
                "Expected to migrate process instance '{}' but mapping instructions contain a non-existing source element id '{}'. Elements provided in mapping instructions must exist in the source process definition.",
                process_instance_key, instruction.source_element_id
            )));
        }
        if target
            .get_element_by_id(&instruction.target_element_id)
            .is_none()
        {
            return Err(MigrationFailure::invalid_argument(format!(
                "Expected to migrate process instance '{}' but mapping instructions contain a non-existing target element id '{}'. Elements provided in mapping instructions must exist in the target process definition.",
                process_instance_key, instruction.target_element_id
            )));
        }
    }
    Ok(())
}

/// Check 7: neither definition declares an event subprocess.
pub fn require_no_event_subprocess(
    source: &DeployedProcess,
    target: &DeployedProcess,
    process_instance_key: Key,
) -> CheckResult {
    if source.event_subprocesses().next().is_some() {
        return Err(MigrationFailure::invalid_state(format!(
            "Expected to migrate process instance '{}' but active process with id '{}' has an event subprocess. Process instances with event subprocesses cannot be migrated yet.",
            process_instance_key,
            source.bpmn_process_id()
        )));
    }
    if target.event_subprocesses().next().is_some() {
        return Err(MigrationFailure::invalid_state(format!(
            "Expected to migrate process instance '{}' but target process with id '{}' has an event subprocess. Target processes with event subprocesses cannot be migrated yet.",
            process_instance_key,
            target.bpmn_process_id()
        )));
    }
    Ok(())
}

// ============================================================================
// Element instance checks
// ============================================================================

/// Check 8: the active element has a migratable type.
pub fn require_supported_element_type(
    element: &ElementInstance,
    process_instance_key: Key,
) -> CheckResult {
    let element_type = element.value.bpmn_element_type;
    if ElementTypeSet::MIGRATABLE.contains(element_type) {
        Ok(())
    } else {
        Err(MigrationFailure::invalid_state(format!(
            "Expected to migrate process instance '{}' but active element with id '{}' has an unsupported type. The migration of a {} is not supported.",
            process_instance_key, element.value.element_id, element_type
        )))
    }
}

/// Check 9: the active element is mapped to a target element.
pub fn require_non_null_target_element_id<'a>(
    target_element_id: Option<&'a str>,
    process_instance_key: Key,
    source_element_id: &str,
) -> CheckResult<&'a str> {
    target_element_id.ok_or_else(|| {
        MigrationFailure::invalid_state(format!(
            "Expected to migrate process instance '{}' but no mapping instruction defined for active element with id '{}'. Elements cannot be migrated without a mapping.",
            process_instance_key, source_element_id
        ))
    })
}

/// Check 10: neither the element nor its job has an open incident.
pub fn require_no_incident(
    incidents: &dyn IncidentState,
    element: &ElementInstance,
    process_instance_key: Key,
) -> CheckResult {
    let has_incident = incidents
        .get_process_instance_incident_key(element.key)
        .is_some()
        || element
            .job_key
            .is_some_and(|job_key| incidents.get_job_incident_key(job_key).is_some());

    if has_incident {
        Err(MigrationFailure::invalid_state(format!(
            "Expected to migrate process instance '{}' but active element with id '{}' has an incident. Elements cannot be migrated with an incident yet. Please retry migration after resolving the incident.",
            process_instance_key, element.value.element_id
        )))
    } else {
        Ok(())
    }
}

/// Check 11: the target element has the same type as the source element.
pub fn require_same_element_type(
    target: &DeployedProcess,
    target_element_id: &str,
    element: &ElementInstance,
    process_instance_key: Key,
) -> CheckResult {
    let source_type = element.value.bpmn_element_type;
    let target_type = target
        .get_element_by_id(target_element_id)
        .map(|e| e.element_type);

    match target_type {
        Some(target_type) if target_type == source_type => Ok(()),
        other => Err(MigrationFailure::invalid_state(format!(
            "Expected to migrate process instance '{}' but active element with id '{}' and type '{}' is mapped to an element with id '{}' and different type '{}'. Elements must be mapped to elements of the same type.",
            process_instance_key,
            element.value.element_id,
            source_type,
            target_element_id,
            other.map_or_else(|| "UNSPECIFIED".to_string(), |t| t.to_string())
        ))),
    }
}

/// Check 12: the element stays in the same flow scope.
///
/// The expected target flow scope is the explicit mapping of the source flow
/// scope's element id, or that id itself when it is not mapped. The
/// comparison is on element ids only. `source_flow_scope` is the instance of
/// the enclosing element, `None` for the root process.
pub fn require_unchanged_flow_scope(
    source_flow_scope: Option<&ElementInstance>,
    element: &ElementInstance,
    target: &DeployedProcess,
    target_element_id: &str,
    mapping: &ElementMapping<'_>,
    process_instance_key: Key,
) -> CheckResult {
    let Some(source_flow_scope) = source_flow_scope else {
        return Ok(());
    };

    let source_scope_id = source_flow_scope.value.element_id.as_str();
    let expected = mapping
        .explicit_target(source_scope_id)
        .unwrap_or(source_scope_id);
    let actual = target
        .flow_scope_of(target_element_id)
        .map(|scope| scope.id.as_str());

    if actual == Some(expected) {
        Ok(())
    } else {
        Err(MigrationFailure::invalid_state(format!(
            "Expected to migrate process instance '{}' but the flow scope of active element with id '{}' is changed. The flow scope of the active element is expected to be '{}' but was '{}'. The flow scope of an element cannot be changed during migration yet.",
            process_instance_key,
            element.value.element_id,
            expected,
            actual.unwrap_or("")
        )))
    }
}

/// Check 13: the active element has no boundary events in the source definition.
pub fn require_no_boundary_events_in_source(
    source: &DeployedProcess,
    element: &ElementInstance,
    process_instance_key: Key,
) -> CheckResult {
    let event_types = boundary_event_types(source, &element.value.element_id);
    if event_types.is_empty() {
        Ok(())
    } else {
        Err(MigrationFailure::invalid_state(format!(
            "Expected to migrate process instance '{}' but active element with id '{}' has one or more boundary events of types '{}'. Migrating active elements with boundary events is not possible yet.",
            process_instance_key, element.value.element_id, event_types
        )))
    }
}

/// Check 14: the mapped target element has no boundary events.
pub fn require_no_boundary_events_in_target(
    target: &DeployedProcess,
    target_element_id: &str,
    element: &ElementInstance,
    process_instance_key: Key,
) -> CheckResult {
    let event_types = boundary_event_types(target, target_element_id);
    if event_types.is_empty() {
        Ok(())
    } else {
        Err(MigrationFailure::invalid_state(format!(
            "Expected to migrate process instance '{}' but active element with id '{}' is mapped to element with id '{}' that has one or more boundary events of types '{}'. Migrating target elements with boundary events is not possible yet.",
            process_instance_key, element.value.element_id, target_element_id, event_types
        )))
    }
}

/// Check 15: no command is concurrently in flight on the element.
///
/// A pending event trigger or a taken sequence flow whose target is not yet
/// activated means the element is mid-transition.
pub fn require_no_concurrent_command(
    event_scopes: &dyn EventScopeInstanceState,
    element: &ElementInstance,
    process_instance_key: Key,
) -> CheckResult {
    let busy = event_scopes.peek_event_trigger(element.key).is_some()
        || element.active_sequence_flows > 0;
    if busy {
        Err(MigrationFailure::invalid_state(format!(
            "Expected to migrate process instance '{}' but a concurrent command was executed on the process instance. The active element with id '{}' is not in a stable state. Please retry the migration.",
            process_instance_key, element.value.element_id
        )))
    } else {
        Ok(())
    }
}

/// Only activities carry boundary events; any other element has none.
fn boundary_event_types(process: &DeployedProcess, element_id: &str) -> String {
    let Some(activity) = process.get_activity_by_id(element_id) else {
        return String::new();
    };
    let types: BTreeSet<String> = process
        .boundary_events(&activity.id)
        .map(|event| {
            event
                .event_type
                .map_or_else(|| "UNSPECIFIED".to_string(), |t| t.to_string())
        })
        .collect();
    types.into_iter().collect::<Vec<_>>().join(", ")
}

fn format_list<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    format!("[{}]", items.into_iter().collect::<Vec<_>>().join(", "))
}
