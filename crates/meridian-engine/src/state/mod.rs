// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! State views over the materialized partition state.
//!
//! Processors only read state through these traits. The state itself is
//! mutated exclusively by the event appliers in [`applier`] when the
//! partition commits follow-up events, so every view a processor sees is
//! consistent with the log up to the previous command.

pub mod applier;
pub mod memory;

pub use self::applier::apply_event;
pub use self::memory::InMemoryState;

use chrono::{DateTime, Utc};
use meridian_model::DeployedProcess;
use meridian_protocol::{
    JobRecord, Key, MessageRecord, MessageSubscriptionRecord, ProcessInstanceRecord, Variables,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Stored entities
// ============================================================================

/// A buffered message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    /// Message key assigned on publish.
    pub key: Key,
    /// The published record, including its request binding.
    pub record: MessageRecord,
    /// Publish timestamp plus time to live.
    pub deadline: DateTime<Utc>,
}

/// An open message subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSubscription {
    /// Subscription key assigned on creation.
    pub key: Key,
    /// Latest subscription record (message key and variables set while correlating).
    pub record: MessageSubscriptionRecord,
    /// Whether a correlation is in flight.
    pub correlating: bool,
}

/// An active element instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInstance {
    /// Element instance key.
    pub key: Key,
    /// The process instance record of this element.
    pub value: ProcessInstanceRecord,
    /// Job created for this element, if any.
    pub job_key: Option<Key>,
    /// Sequence flows taken inside this scope whose target is not yet activated.
    pub active_sequence_flows: u32,
}

/// A pending event trigger on an element scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTrigger {
    /// Key of the triggering event.
    pub event_key: Key,
    /// Element to activate when the trigger is processed.
    pub element_id: String,
    /// Variables carried by the trigger.
    pub variables: Variables,
}

// ============================================================================
// Views
// ============================================================================

/// Buffered messages and their correlations.
pub trait MessageState {
    fn get_message(&self, key: Key) -> Option<StoredMessage>;

    /// Whether a message with this id is buffered for the name and correlation key.
    fn exist_message_id(&self, name: &str, correlation_key: &str, message_id: &str) -> bool;

    /// Visits buffered messages with the given name and correlation key in
    /// publish order. The visitor returns `false` to stop.
    fn visit_messages(
        &self,
        name: &str,
        correlation_key: &str,
        visitor: &mut dyn FnMut(&StoredMessage) -> bool,
    );

    /// Whether the message was already correlated to a process with this id.
    fn exist_message_correlation(&self, message_key: Key, bpmn_process_id: &str) -> bool;

    /// Keys of messages whose deadline is at or before `now`, in key order.
    fn due_messages(&self, now: DateTime<Utc>) -> Vec<Key>;
}

/// Open message subscriptions.
pub trait MessageSubscriptionState {
    fn get(&self, element_instance_key: Key, message_name: &str) -> Option<MessageSubscription>;

    /// Visits subscriptions with the given message name and correlation key in
    /// key order. The visitor returns `false` to stop.
    fn visit_subscriptions(
        &self,
        message_name: &str,
        correlation_key: &str,
        visitor: &mut dyn FnMut(&MessageSubscription) -> bool,
    );
}

pub trait ElementInstanceState {
    fn get_instance(&self, key: Key) -> Option<ElementInstance>;

    /// Direct children of the element instance, in key order.
    fn get_children(&self, key: Key) -> Vec<ElementInstance>;
}

pub trait IncidentState {
    /// Incident raised on the element instance itself.
    fn get_process_instance_incident_key(&self, element_instance_key: Key) -> Option<Key>;

    /// Incident raised on a job.
    fn get_job_incident_key(&self, job_key: Key) -> Option<Key>;
}

pub trait EventScopeInstanceState {
    /// Oldest pending event trigger of the scope, without consuming it.
    fn peek_event_trigger(&self, scope_key: Key) -> Option<EventTrigger>;
}

pub trait ProcessState {
    fn get_process_by_key(&self, key: Key) -> Option<&DeployedProcess>;
}

pub trait JobState {
    fn get_job(&self, key: Key) -> Option<JobRecord>;
}

/// All views a command processor may read.
pub trait ProcessingState {
    fn message_state(&self) -> &dyn MessageState;
    fn message_subscription_state(&self) -> &dyn MessageSubscriptionState;
    fn element_instance_state(&self) -> &dyn ElementInstanceState;
    fn incident_state(&self) -> &dyn IncidentState;
    fn event_scope_instance_state(&self) -> &dyn EventScopeInstanceState;
    fn process_state(&self) -> &dyn ProcessState;
    fn job_state(&self) -> &dyn JobState;
}
