// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Buffered effect writers handed to command processors.
//!
//! Nothing written here is visible until the partition commits the command.
//! A rejection discards every other buffered effect of the command.

use meridian_protocol::{
    Intent, Key, Record, RecordType, RecordValue, RejectionInfo, RequestMetadata,
};
use serde::Serialize;

use crate::error::Rejection;
use crate::sender::SubscriptionCommand;

/// A follow-up event awaiting commit.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowUpEvent {
    pub key: Key,
    pub intent: Intent,
    pub value: RecordValue,
}

/// Response for the client call that issued a command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientResponse {
    pub request: RequestMetadata,
    pub key: Key,
    pub record_type: RecordType,
    pub intent: Intent,
    pub value: RecordValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<RejectionInfo>,
}

/// Appends follow-up events tied to a state-bearing key.
#[derive(Debug, Default)]
pub struct StateWriter {
    events: Vec<FollowUpEvent>,
}

impl StateWriter {
    pub fn append_follow_up_event(
        &mut self,
        key: Key,
        intent: impl Into<Intent>,
        value: impl Into<RecordValue>,
    ) {
        self.events.push(FollowUpEvent {
            key,
            intent: intent.into(),
            value: value.into(),
        });
    }

    pub fn events(&self) -> &[FollowUpEvent] {
        &self.events
    }
}

/// Writes the client response of the current command.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    response: Option<ClientResponse>,
}

impl ResponseWriter {
    /// Responds to the request that issued `command`. Commands without a
    /// request binding get no response.
    pub fn write_event_on_command(
        &mut self,
        key: Key,
        intent: impl Into<Intent>,
        value: impl Into<RecordValue>,
        command: &Record,
    ) {
        if let Some(request) = command.request {
            self.write_response(key, intent, value, request);
        }
    }

    /// Responds to an explicit request, e.g. one stored with a message.
    pub fn write_response(
        &mut self,
        key: Key,
        intent: impl Into<Intent>,
        value: impl Into<RecordValue>,
        request: RequestMetadata,
    ) {
        self.response = Some(ClientResponse {
            request,
            key,
            record_type: RecordType::Event,
            intent: intent.into(),
            value: value.into(),
            rejection: None,
        });
    }

    pub fn response(&self) -> Option<&ClientResponse> {
        self.response.as_ref()
    }
}

/// Holds the rejection of the current command.
#[derive(Debug, Default)]
pub struct RejectionWriter {
    rejection: Option<Rejection>,
}

impl RejectionWriter {
    pub fn rejection(&self) -> Option<&Rejection> {
        self.rejection.as_ref()
    }
}

/// Cross-partition commands sent once the current command commits.
#[derive(Debug, Default)]
pub struct SideEffectWriter {
    commands: Vec<SubscriptionCommand>,
}

impl SideEffectWriter {
    pub fn send(&mut self, command: SubscriptionCommand) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[SubscriptionCommand] {
        &self.commands
    }
}

/// The effect writers of one command.
#[derive(Debug, Default)]
pub struct Writers {
    pub state: StateWriter,
    pub response: ResponseWriter,
    pub rejection: RejectionWriter,
    pub side_effects: SideEffectWriter,
}

impl Writers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects the command: buffered events, response and side effects are
    /// dropped.
    pub fn append_rejection(&mut self, rejection: Rejection) {
        self.state.events.clear();
        self.response.response = None;
        self.side_effects.commands.clear();
        self.rejection.rejection = Some(rejection);
    }

    /// Consumes the writers, yielding what the partition commits.
    pub fn into_parts(self) -> BufferedEffects {
        BufferedEffects {
            events: self.state.events,
            response: self.response.response,
            rejection: self.rejection.rejection,
            commands: self.side_effects.commands,
        }
    }
}

/// Everything a command produced.
#[derive(Debug, Default)]
pub struct BufferedEffects {
    pub events: Vec<FollowUpEvent>,
    pub response: Option<ClientResponse>,
    pub rejection: Option<Rejection>,
    pub commands: Vec<SubscriptionCommand>,
}
