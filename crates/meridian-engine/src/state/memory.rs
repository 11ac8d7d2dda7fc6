// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory materialized state of one partition.
//!
//! Ordered maps keep iteration deterministic (key order equals creation
//! order within a partition) and make snapshots byte-for-byte comparable.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use chrono::{DateTime, Utc};
use meridian_model::DeployedProcess;
use meridian_protocol::{JobRecord, Key, KeyError, KeyGenerator};
use serde::{Deserialize, Serialize};

use super::{
    ElementInstance, ElementInstanceState, EventScopeInstanceState, EventTrigger, IncidentState,
    JobState, MessageState, MessageSubscription, MessageSubscriptionState, ProcessState,
    ProcessingState, StoredMessage,
};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InMemoryState {
    pub(super) key_generator: KeyGenerator,
    pub(super) messages: BTreeMap<Key, StoredMessage>,
    /// Message key to the process ids it was correlated to.
    pub(super) message_correlations: BTreeMap<Key, BTreeSet<String>>,
    pub(super) subscriptions: BTreeMap<Key, MessageSubscription>,
    /// Element instance key to message name to subscription key.
    pub(super) subscriptions_by_element: BTreeMap<Key, BTreeMap<String, Key>>,
    pub(super) element_instances: BTreeMap<Key, ElementInstance>,
    pub(super) process_instance_incidents: BTreeMap<Key, Key>,
    pub(super) job_incidents: BTreeMap<Key, Key>,
    pub(super) event_triggers: BTreeMap<Key, VecDeque<EventTrigger>>,
    pub(super) processes: BTreeMap<Key, DeployedProcess>,
    pub(super) jobs: BTreeMap<Key, JobRecord>,
}

impl InMemoryState {
    pub fn new(partition_id: u16) -> std::result::Result<Self, KeyError> {
        Ok(Self {
            key_generator: KeyGenerator::new(partition_id)?,
            messages: BTreeMap::new(),
            message_correlations: BTreeMap::new(),
            subscriptions: BTreeMap::new(),
            subscriptions_by_element: BTreeMap::new(),
            element_instances: BTreeMap::new(),
            process_instance_incidents: BTreeMap::new(),
            job_incidents: BTreeMap::new(),
            event_triggers: BTreeMap::new(),
            processes: BTreeMap::new(),
            jobs: BTreeMap::new(),
        })
    }

    pub fn partition_id(&self) -> u16 {
        self.key_generator.partition_id()
    }

    /// Copy of the key generator; processors draw keys from the copy and the
    /// appliers advance the original when the events are committed.
    pub fn key_generator(&self) -> KeyGenerator {
        self.key_generator
    }

    /// Hands out a key for records produced outside the command processors.
    pub fn next_key(&mut self) -> Key {
        self.key_generator.next_key()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl MessageState for InMemoryState {
    fn get_message(&self, key: Key) -> Option<StoredMessage> {
        self.messages.get(&key).cloned()
    }

    fn exist_message_id(&self, name: &str, correlation_key: &str, message_id: &str) -> bool {
        self.messages.values().any(|m| {
            m.record.name == name
                && m.record.correlation_key == correlation_key
                && m.record.message_id.as_deref() == Some(message_id)
        })
    }

    fn visit_messages(
        &self,
        name: &str,
        correlation_key: &str,
        visitor: &mut dyn FnMut(&StoredMessage) -> bool,
    ) {
        for message in self.messages.values() {
            if message.record.name == name
                && message.record.correlation_key == correlation_key
                && !visitor(message)
            {
                break;
            }
        }
    }

    fn exist_message_correlation(&self, message_key: Key, bpmn_process_id: &str) -> bool {
        self.message_correlations
            .get(&message_key)
            .is_some_and(|ids| ids.contains(bpmn_process_id))
    }

    fn due_messages(&self, now: DateTime<Utc>) -> Vec<Key> {
        self.messages
            .values()
            .filter(|m| m.deadline <= now)
            .map(|m| m.key)
            .collect()
    }
}

impl MessageSubscriptionState for InMemoryState {
    fn get(&self, element_instance_key: Key, message_name: &str) -> Option<MessageSubscription> {
        self.subscriptions_by_element
            .get(&element_instance_key)
            .and_then(|by_name| by_name.get(message_name))
            .and_then(|key| self.subscriptions.get(key))
            .cloned()
    }

    fn visit_subscriptions(
        &self,
        message_name: &str,
        correlation_key: &str,
        visitor: &mut dyn FnMut(&MessageSubscription) -> bool,
    ) {
        for subscription in self.subscriptions.values() {
            if subscription.record.message_name == message_name
                && subscription.record.correlation_key == correlation_key
                && !visitor(subscription)
            {
                break;
            }
        }
    }
}

impl ElementInstanceState for InMemoryState {
    fn get_instance(&self, key: Key) -> Option<ElementInstance> {
        self.element_instances.get(&key).cloned()
    }

    fn get_children(&self, key: Key) -> Vec<ElementInstance> {
        self.element_instances
            .values()
            .filter(|e| e.value.flow_scope_key == Some(key))
            .cloned()
            .collect()
    }
}

impl IncidentState for InMemoryState {
    fn get_process_instance_incident_key(&self, element_instance_key: Key) -> Option<Key> {
        self.process_instance_incidents
            .get(&element_instance_key)
            .copied()
    }

    fn get_job_incident_key(&self, job_key: Key) -> Option<Key> {
        self.job_incidents.get(&job_key).copied()
    }
}

impl EventScopeInstanceState for InMemoryState {
    fn peek_event_trigger(&self, scope_key: Key) -> Option<EventTrigger> {
        self.event_triggers
            .get(&scope_key)
            .and_then(|triggers| triggers.front())
            .cloned()
    }
}

impl ProcessState for InMemoryState {
    fn get_process_by_key(&self, key: Key) -> Option<&DeployedProcess> {
        self.processes.get(&key)
    }
}

impl JobState for InMemoryState {
    fn get_job(&self, key: Key) -> Option<JobRecord> {
        self.jobs.get(&key).cloned()
    }
}

impl ProcessingState for InMemoryState {
    fn message_state(&self) -> &dyn MessageState {
        self
    }

    fn message_subscription_state(&self) -> &dyn MessageSubscriptionState {
        self
    }

    fn element_instance_state(&self) -> &dyn ElementInstanceState {
        self
    }

    fn incident_state(&self) -> &dyn IncidentState {
        self
    }

    fn event_scope_instance_state(&self) -> &dyn EventScopeInstanceState {
        self
    }

    fn process_state(&self) -> &dyn ProcessState {
        self
    }

    fn job_state(&self) -> &dyn JobState {
        self
    }
}
