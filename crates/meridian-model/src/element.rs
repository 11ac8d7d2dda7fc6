// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Element and event type vocabulary.

use serde::{Deserialize, Serialize};
use strum::Display;

/// The kind of an executable element in a deployed process.
///
/// The discriminant order is stable: [`ElementTypeSet`] uses it as the bit
/// index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum BpmnElementType {
    Process = 0,
    SubProcess,
    EventSubProcess,
    StartEvent,
    IntermediateCatchEvent,
    IntermediateThrowEvent,
    BoundaryEvent,
    EndEvent,
    ServiceTask,
    ReceiveTask,
    UserTask,
    ManualTask,
    Task,
    ExclusiveGateway,
    ParallelGateway,
    EventBasedGateway,
    InclusiveGateway,
    SequenceFlow,
    MultiInstanceBody,
    CallActivity,
    BusinessRuleTask,
    ScriptTask,
    SendTask,
}

impl BpmnElementType {
    /// Elements that may carry boundary events.
    pub fn is_activity(self) -> bool {
        matches!(
            self,
            BpmnElementType::SubProcess
                | BpmnElementType::ServiceTask
                | BpmnElementType::ReceiveTask
                | BpmnElementType::UserTask
                | BpmnElementType::ManualTask
                | BpmnElementType::Task
                | BpmnElementType::MultiInstanceBody
                | BpmnElementType::CallActivity
                | BpmnElementType::BusinessRuleTask
                | BpmnElementType::ScriptTask
                | BpmnElementType::SendTask
        )
    }

    /// Elements that own child elements (flow scopes).
    pub fn is_container(self) -> bool {
        matches!(
            self,
            BpmnElementType::Process
                | BpmnElementType::SubProcess
                | BpmnElementType::EventSubProcess
                | BpmnElementType::MultiInstanceBody
        )
    }
}

/// The trigger kind of an event element.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BpmnEventType {
    Timer,
    Message,
    Signal,
    Error,
    Escalation,
    Compensation,
    Conditional,
    Unspecified,
}

/// A compile-time set of [`BpmnElementType`]s backed by a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ElementTypeSet(u32);

impl ElementTypeSet {
    /// The empty set.
    pub const EMPTY: ElementTypeSet = ElementTypeSet(0);

    /// Element types an active element instance may have for its process
    /// instance to be migrated.
    pub const MIGRATABLE: ElementTypeSet =
        ElementTypeSet::of(&[BpmnElementType::Process, BpmnElementType::ServiceTask]);

    /// Builds a set from a slice of element types.
    pub const fn of(types: &[BpmnElementType]) -> ElementTypeSet {
        let mut bits = 0u32;
        let mut i = 0;
        while i < types.len() {
            bits |= 1 << (types[i] as u8);
            i += 1;
        }
        ElementTypeSet(bits)
    }

    pub const fn contains(self, element_type: BpmnElementType) -> bool {
        self.0 & (1 << (element_type as u8)) != 0
    }

    pub const fn with(self, element_type: BpmnElementType) -> ElementTypeSet {
        ElementTypeSet(self.0 | (1 << (element_type as u8)))
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migratable_set() {
        assert!(ElementTypeSet::MIGRATABLE.contains(BpmnElementType::Process));
        assert!(ElementTypeSet::MIGRATABLE.contains(BpmnElementType::ServiceTask));
        assert!(!ElementTypeSet::MIGRATABLE.contains(BpmnElementType::ExclusiveGateway));
        assert!(!ElementTypeSet::MIGRATABLE.contains(BpmnElementType::UserTask));
        assert!(!ElementTypeSet::MIGRATABLE.contains(BpmnElementType::SendTask));
    }

    #[test]
    fn test_set_with() {
        let set = ElementTypeSet::EMPTY.with(BpmnElementType::UserTask);
        assert!(!set.is_empty());
        assert!(set.contains(BpmnElementType::UserTask));
        assert!(!set.contains(BpmnElementType::Process));
    }

    #[test]
    fn test_display_matches_serde() {
        assert_eq!(BpmnElementType::ServiceTask.to_string(), "SERVICE_TASK");
        assert_eq!(
            serde_json::to_string(&BpmnElementType::ExclusiveGateway).unwrap(),
            "\"EXCLUSIVE_GATEWAY\""
        );
        assert_eq!(BpmnEventType::Timer.to_string(), "TIMER");
    }

    #[test]
    fn test_is_activity() {
        assert!(BpmnElementType::ServiceTask.is_activity());
        assert!(BpmnElementType::SubProcess.is_activity());
        assert!(!BpmnElementType::Process.is_activity());
        assert!(!BpmnElementType::ExclusiveGateway.is_activity());
    }
}
