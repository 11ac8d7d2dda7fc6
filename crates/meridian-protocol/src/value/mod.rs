// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Typed record payloads.

mod job;
mod message;
mod process_instance;

pub use job::{IncidentRecord, JobRecord};
pub use message::{MessageRecord, MessageSubscriptionRecord};
pub use process_instance::{
    MappingInstruction, ProcessEventRecord, ProcessInstanceMigrationRecord, ProcessInstanceRecord,
};

use meridian_model::DeployedProcess;
use serde::{Deserialize, Serialize};

use crate::intent::ValueType;

/// Opaque variables document carried by messages and triggers.
///
/// The record-processing core never inspects it; it is passed through from
/// the publisher to the correlated subscription.
pub type Variables = serde_json::Map<String, serde_json::Value>;

/// Payload of a record, discriminated by value type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordValue {
    Message(MessageRecord),
    MessageSubscription(MessageSubscriptionRecord),
    ProcessInstance(ProcessInstanceRecord),
    ProcessInstanceMigration(ProcessInstanceMigrationRecord),
    Job(JobRecord),
    Incident(IncidentRecord),
    Process(DeployedProcess),
    ProcessEvent(ProcessEventRecord),
}

impl RecordValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            RecordValue::Message(_) => ValueType::Message,
            RecordValue::MessageSubscription(_) => ValueType::MessageSubscription,
            RecordValue::ProcessInstance(_) => ValueType::ProcessInstance,
            RecordValue::ProcessInstanceMigration(_) => ValueType::ProcessInstanceMigration,
            RecordValue::Job(_) => ValueType::Job,
            RecordValue::Incident(_) => ValueType::Incident,
            RecordValue::Process(_) => ValueType::Process,
            RecordValue::ProcessEvent(_) => ValueType::ProcessEvent,
        }
    }
}

macro_rules! impl_as_value {
    ($($method:ident: $variant:ident => $target:ty),+ $(,)?) => {
        impl RecordValue {
            $(
                pub fn $method(&self) -> Option<&$target> {
                    match self {
                        RecordValue::$variant(value) => Some(value),
                        _ => None,
                    }
                }
            )+
        }
    };
}

impl_as_value!(
    as_message: Message => MessageRecord,
    as_message_subscription: MessageSubscription => MessageSubscriptionRecord,
    as_process_instance: ProcessInstance => ProcessInstanceRecord,
    as_process_instance_migration: ProcessInstanceMigration => ProcessInstanceMigrationRecord,
    as_job: Job => JobRecord,
    as_incident: Incident => IncidentRecord,
    as_process: Process => DeployedProcess,
    as_process_event: ProcessEvent => ProcessEventRecord,
);

macro_rules! impl_from_value {
    ($($source:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$source> for RecordValue {
                fn from(value: $source) -> Self {
                    RecordValue::$variant(value)
                }
            }
        )+
    };
}

impl_from_value!(
    MessageRecord => Message,
    MessageSubscriptionRecord => MessageSubscription,
    ProcessInstanceRecord => ProcessInstance,
    ProcessInstanceMigrationRecord => ProcessInstanceMigration,
    JobRecord => Job,
    IncidentRecord => Incident,
    DeployedProcess => Process,
    ProcessEventRecord => ProcessEvent,
);
