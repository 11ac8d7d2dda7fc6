// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Record intents.
//!
//! Each value type has its own intent enum. [`Intent`] wraps them so that a
//! record carries a single, discriminated `(value type, intent)` pair, which
//! is also the routing key of the command dispatcher.

use serde::{Deserialize, Serialize};
use strum::Display;

/// The kind of payload a record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    Message,
    MessageSubscription,
    ProcessInstance,
    ProcessInstanceMigration,
    Job,
    Incident,
    Process,
    ProcessEvent,
}

macro_rules! intent_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        #[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }
    };
}

intent_enum!(
    /// Intents of message records.
    MessageIntent {
        Publish,
        Published,
        Correlate,
        Expire,
        Expired,
    }
);

intent_enum!(
    /// Intents of message subscription records.
    MessageSubscriptionIntent {
        Create,
        Created,
        Correlating,
        Correlate,
        Correlated,
        Delete,
        Deleted,
    }
);

intent_enum!(
    ProcessInstanceIntent {
        ElementActivating,
        ElementActivated,
        ElementCompleting,
        ElementCompleted,
        ElementTerminated,
        SequenceFlowTaken,
        ElementMigrated,
    }
);

intent_enum!(ProcessInstanceMigrationIntent { Migrate, Migrated });

intent_enum!(JobIntent { Created, Migrated });

intent_enum!(IncidentIntent { Created, Resolved });

intent_enum!(ProcessIntent { Created });

intent_enum!(
    /// Event trigger lifecycle of an element scope.
    ProcessEventIntent { Triggering, Triggered }
);

/// A `(value type, intent)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "valueType", content = "intent", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Message(MessageIntent),
    MessageSubscription(MessageSubscriptionIntent),
    ProcessInstance(ProcessInstanceIntent),
    ProcessInstanceMigration(ProcessInstanceMigrationIntent),
    Job(JobIntent),
    Incident(IncidentIntent),
    Process(ProcessIntent),
    ProcessEvent(ProcessEventIntent),
}

impl Intent {
    pub fn value_type(&self) -> ValueType {
        match self {
            Intent::Message(_) => ValueType::Message,
            Intent::MessageSubscription(_) => ValueType::MessageSubscription,
            Intent::ProcessInstance(_) => ValueType::ProcessInstance,
            Intent::ProcessInstanceMigration(_) => ValueType::ProcessInstanceMigration,
            Intent::Job(_) => ValueType::Job,
            Intent::Incident(_) => ValueType::Incident,
            Intent::Process(_) => ValueType::Process,
            Intent::ProcessEvent(_) => ValueType::ProcessEvent,
        }
    }

    /// Whether records with this intent are commands rather than events.
    pub fn is_command(&self) -> bool {
        matches!(
            self,
            Intent::Message(
                MessageIntent::Publish | MessageIntent::Correlate | MessageIntent::Expire
            ) | Intent::MessageSubscription(
                MessageSubscriptionIntent::Create
                    | MessageSubscriptionIntent::Correlate
                    | MessageSubscriptionIntent::Delete
            ) | Intent::ProcessInstanceMigration(ProcessInstanceMigrationIntent::Migrate)
        )
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let intent = match self {
            Intent::Message(i) => i.to_string(),
            Intent::MessageSubscription(i) => i.to_string(),
            Intent::ProcessInstance(i) => i.to_string(),
            Intent::ProcessInstanceMigration(i) => i.to_string(),
            Intent::Job(i) => i.to_string(),
            Intent::Incident(i) => i.to_string(),
            Intent::Process(i) => i.to_string(),
            Intent::ProcessEvent(i) => i.to_string(),
        };
        write!(f, "{}:{}", self.value_type(), intent)
    }
}

macro_rules! impl_from_intent {
    ($($source:ident => $variant:ident),+ $(,)?) => {
        $(
            impl From<$source> for Intent {
                fn from(intent: $source) -> Self {
                    Intent::$variant(intent)
                }
            }
        )+
    };
}

impl_from_intent!(
    MessageIntent => Message,
    MessageSubscriptionIntent => MessageSubscription,
    ProcessInstanceIntent => ProcessInstance,
    ProcessInstanceMigrationIntent => ProcessInstanceMigration,
    JobIntent => Job,
    IncidentIntent => Incident,
    ProcessIntent => Process,
    ProcessEventIntent => ProcessEvent,
);
