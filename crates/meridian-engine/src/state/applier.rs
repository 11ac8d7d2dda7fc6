// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Event appliers.
//!
//! [`apply_event`] folds one committed event into the in-memory state. The
//! same function runs when a partition commits follow-up events and when it
//! replays an existing log, so the materialized state is a pure function of
//! the event sequence.

use chrono::{DateTime, TimeDelta, Utc};
use meridian_model::BpmnElementType;
use meridian_protocol::{
    IncidentIntent, Intent, JobIntent, MessageIntent, MessageSubscriptionIntent,
    ProcessEventIntent, ProcessInstanceIntent, ProcessIntent, Record, RecordType, RecordValue,
};
use tracing::trace;

use super::memory::InMemoryState;
use super::{ElementInstance, EventTrigger, MessageSubscription, StoredMessage};
use crate::error::{EngineError, Result};

/// Applies a committed event to the state.
pub fn apply_event(state: &mut InMemoryState, record: &Record) -> Result<()> {
    if record.record_type != RecordType::Event {
        return Err(EngineError::UnexpectedRecordType {
            position: record.position,
            expected: RecordType::Event,
            actual: record.record_type,
        });
    }

    trace!(position = record.position, key = record.key, intent = %record.intent, "Applying event");

    match (&record.intent, &record.value) {
        (Intent::Message(intent), RecordValue::Message(value)) => match intent {
            MessageIntent::Published => {
                let deadline = message_deadline(record.timestamp, value.time_to_live);
                state.messages.insert(
                    record.key,
                    StoredMessage {
                        key: record.key,
                        record: value.clone(),
                        deadline,
                    },
                );
            }
            MessageIntent::Expired => {
                state.messages.remove(&record.key);
                state.message_correlations.remove(&record.key);
            }
            _ => {}
        },

        (Intent::MessageSubscription(intent), RecordValue::MessageSubscription(value)) => {
            match intent {
                MessageSubscriptionIntent::Created => {
                    state.subscriptions.insert(
                        record.key,
                        MessageSubscription {
                            key: record.key,
                            record: value.clone(),
                            correlating: false,
                        },
                    );
                    state
                        .subscriptions_by_element
                        .entry(value.element_instance_key)
                        .or_default()
                        .insert(value.message_name.clone(), record.key);
                }
                MessageSubscriptionIntent::Correlating => {
                    let subscription = subscription_mut(state, record.key, value)?;
                    subscription.correlating = true;
                    subscription.record = value.clone();
                    if let Some(message_key) = value.message_key {
                        state
                            .message_correlations
                            .entry(message_key)
                            .or_default()
                            .insert(value.bpmn_process_id.clone());
                    }
                }
                MessageSubscriptionIntent::Correlated => {
                    let subscription = subscription_mut(state, record.key, value)?;
                    if subscription.record.interrupting {
                        remove_subscription(state, record.key);
                    } else {
                        subscription.correlating = false;
                        subscription.record = value.clone();
                    }
                }
                MessageSubscriptionIntent::Deleted => {
                    subscription_mut(state, record.key, value)?;
                    remove_subscription(state, record.key);
                }
                _ => {}
            }
        }

        (Intent::ProcessInstance(intent), RecordValue::ProcessInstance(value)) => match intent {
            ProcessInstanceIntent::ElementActivating => {
                let entered_by_sequence_flow = !matches!(
                    value.bpmn_element_type,
                    BpmnElementType::StartEvent | BpmnElementType::BoundaryEvent
                );
                if let Some(scope_key) = value.flow_scope_key {
                    let scope = state
                        .element_instances
                        .get_mut(&scope_key)
                        .ok_or(EngineError::MissingElementInstance { key: scope_key })?;
                    if entered_by_sequence_flow && scope.active_sequence_flows > 0 {
                        scope.active_sequence_flows -= 1;
                    }
                }
                state.element_instances.insert(
                    record.key,
                    ElementInstance {
                        key: record.key,
                        value: value.clone(),
                        job_key: None,
                        active_sequence_flows: 0,
                    },
                );
            }
            ProcessInstanceIntent::ElementCompleted | ProcessInstanceIntent::ElementTerminated => {
                state.element_instances.remove(&record.key);
                state.event_triggers.remove(&record.key);
                state.process_instance_incidents.remove(&record.key);
            }
            ProcessInstanceIntent::SequenceFlowTaken => {
                let scope_key = value
                    .flow_scope_key
                    .ok_or(EngineError::MissingElementInstance { key: record.key })?;
                let scope = state
                    .element_instances
                    .get_mut(&scope_key)
                    .ok_or(EngineError::MissingElementInstance { key: scope_key })?;
                scope.active_sequence_flows += 1;
            }
            ProcessInstanceIntent::ElementMigrated => {
                let instance = state
                    .element_instances
                    .get_mut(&record.key)
                    .ok_or(EngineError::MissingElementInstance { key: record.key })?;
                instance.value = value.clone();
            }
            ProcessInstanceIntent::ElementActivated | ProcessInstanceIntent::ElementCompleting => {}
        },

        (Intent::ProcessInstanceMigration(_), RecordValue::ProcessInstanceMigration(_)) => {}

        (Intent::Process(ProcessIntent::Created), RecordValue::Process(process)) => {
            state.processes.insert(record.key, process.clone());
        }

        (Intent::Job(intent), RecordValue::Job(value)) => match intent {
            JobIntent::Created => {
                state.jobs.insert(record.key, value.clone());
                if let Some(instance) = state.element_instances.get_mut(&value.element_instance_key)
                {
                    instance.job_key = Some(record.key);
                }
            }
            JobIntent::Migrated => {
                state.jobs.insert(record.key, value.clone());
            }
        },

        (Intent::Incident(intent), RecordValue::Incident(value)) => match (intent, value.job_key) {
            (IncidentIntent::Created, Some(job_key)) => {
                state.job_incidents.insert(job_key, record.key);
            }
            (IncidentIntent::Created, None) => {
                state
                    .process_instance_incidents
                    .insert(value.element_instance_key, record.key);
            }
            (IncidentIntent::Resolved, Some(job_key)) => {
                state.job_incidents.remove(&job_key);
            }
            (IncidentIntent::Resolved, None) => {
                state
                    .process_instance_incidents
                    .remove(&value.element_instance_key);
            }
        },

        (Intent::ProcessEvent(intent), RecordValue::ProcessEvent(value)) => match intent {
            ProcessEventIntent::Triggering => {
                state
                    .event_triggers
                    .entry(value.scope_key)
                    .or_default()
                    .push_back(EventTrigger {
                        event_key: record.key,
                        element_id: value.target_element_id.clone(),
                        variables: value.variables.clone(),
                    });
            }
            ProcessEventIntent::Triggered => {
                if let Some(triggers) = state.event_triggers.get_mut(&value.scope_key) {
                    triggers.pop_front();
                    if triggers.is_empty() {
                        state.event_triggers.remove(&value.scope_key);
                    }
                }
            }
        },

        (intent, value) => {
            return Err(EngineError::IntentValueMismatch {
                position: record.position,
                intent: *intent,
                value_type: value.value_type(),
            });
        }
    }

    state.key_generator.observe(record.key);
    Ok(())
}

fn subscription_mut<'a>(
    state: &'a mut InMemoryState,
    key: meridian_protocol::Key,
    value: &meridian_protocol::MessageSubscriptionRecord,
) -> Result<&'a mut MessageSubscription> {
    state
        .subscriptions
        .get_mut(&key)
        .ok_or_else(|| EngineError::MissingSubscription {
            element_instance_key: value.element_instance_key,
            message_name: value.message_name.clone(),
        })
}

fn remove_subscription(state: &mut InMemoryState, key: meridian_protocol::Key) {
    if let Some(subscription) = state.subscriptions.remove(&key) {
        let element_key = subscription.record.element_instance_key;
        if let Some(by_name) = state.subscriptions_by_element.get_mut(&element_key) {
            by_name.remove(&subscription.record.message_name);
            if by_name.is_empty() {
                state.subscriptions_by_element.remove(&element_key);
            }
        }
    }
}

/// Publish time plus TTL. A TTL beyond chrono's range never expires.
fn message_deadline(published: DateTime<Utc>, time_to_live_ms: i64) -> DateTime<Utc> {
    TimeDelta::try_milliseconds(time_to_live_ms)
        .and_then(|ttl| published.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
