// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! A single partition: record log, materialized state and command loop.
//!
//! [`Partition::process`] is the only entry point that changes the state.
//! One command is handled at a time:
//!
//! 1. the command is appended to the log with its position and timestamp;
//! 2. the dispatcher runs its processor against the current state;
//! 3. on success the buffered follow-up events are appended (pointing back
//!    to the command via `source_position`) and applied to the state, then
//!    the buffered subscription commands are sent;
//! 4. on rejection everything buffered is dropped and a `COMMAND_REJECTION`
//!    record is appended instead.
//!
//! A fatal [`EngineError`] marks the partition as failed; it refuses all
//! further work.
//!
//! Log timestamps never decrease. A timestamp earlier than the last logged
//! one is raised to it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use meridian_protocol::{
    Command, Intent, Key, MessageIntent, Record, RecordType, RecordValue, RejectionInfo,
};
use tracing::{debug, error, info, warn};

use crate::error::{EngineError, ProcessingError, Rejection, Result};
use crate::processing::{CommandDispatcher, ProcessingContext};
use crate::sender::SubscriptionCommandSender;
use crate::state::{InMemoryState, MessageState, apply_event};
use crate::writers::{ClientResponse, Writers};

/// Result of processing one command.
#[derive(Debug, Clone)]
pub struct ProcessedCommand {
    /// Log position assigned to the command.
    pub command_position: i64,
    /// Records appended after the command (follow-up events or the rejection).
    pub records: Vec<Record>,
    pub response: Option<ClientResponse>,
    pub rejection: Option<Rejection>,
}

impl ProcessedCommand {
    pub fn is_rejected(&self) -> bool {
        self.rejection.is_some()
    }

    /// Follow-up events with the given intent.
    pub fn events_with(&self, intent: impl Into<Intent>) -> Vec<&Record> {
        let intent = intent.into();
        self.records
            .iter()
            .filter(|r| r.record_type == RecordType::Event && r.intent == intent)
            .collect()
    }
}

pub struct Partition {
    partition_id: u16,
    state: InMemoryState,
    log: Vec<Record>,
    dispatcher: CommandDispatcher,
    sender: Arc<dyn SubscriptionCommandSender>,
    last_timestamp: Option<DateTime<Utc>>,
    failed: bool,
}

impl std::fmt::Debug for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Partition")
            .field("partition_id", &self.partition_id)
            .field("log_len", &self.log.len())
            .field("dispatcher", &self.dispatcher)
            .field("sender", &"...")
            .field("failed", &self.failed)
            .finish()
    }
}

impl Partition {
    /// Creates an empty partition with the engine processors registered.
    pub fn new(partition_id: u16, sender: Arc<dyn SubscriptionCommandSender>) -> Result<Self> {
        Ok(Self::with_state(InMemoryState::new(partition_id)?, sender))
    }

    /// Resumes from a state snapshot. The log starts empty.
    pub fn with_state(state: InMemoryState, sender: Arc<dyn SubscriptionCommandSender>) -> Self {
        Self {
            partition_id: state.partition_id(),
            state,
            log: Vec::new(),
            dispatcher: CommandDispatcher::with_engine_processors(),
            sender,
            last_timestamp: None,
            failed: false,
        }
    }

    /// Replaces the dispatcher.
    pub fn with_dispatcher(mut self, dispatcher: CommandDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn partition_id(&self) -> u16 {
        self.partition_id
    }

    pub fn state(&self) -> &InMemoryState {
        &self.state
    }

    pub fn log(&self) -> &[Record] {
        &self.log
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Hands out a key for records produced outside the command processors.
    pub fn next_key(&mut self) -> Key {
        self.state.next_key()
    }

    fn next_position(&self) -> i64 {
        self.log.last().map_or(1, |r| r.position + 1)
    }

    /// `now`, or the last logged timestamp if the clock stepped back.
    fn log_timestamp(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let timestamp = match self.last_timestamp {
            Some(last) if last > now => {
                debug!(%last, %now, "Clock behind the log, keeping last timestamp");
                last
            }
            _ => now,
        };
        self.last_timestamp = Some(timestamp);
        timestamp
    }

    fn ensure_running(&self) -> Result<()> {
        if self.failed {
            Err(EngineError::PartitionFailed {
                partition_id: self.partition_id,
            })
        } else {
            Ok(())
        }
    }

    fn fail(&mut self, err: EngineError) -> EngineError {
        error!(partition_id = self.partition_id, error = %err, "Partition processing failed");
        self.failed = true;
        err
    }

    /// Processes one command with the log-supplied `timestamp`.
    pub fn process(
        &mut self,
        command: Command,
        timestamp: DateTime<Utc>,
    ) -> Result<ProcessedCommand> {
        self.ensure_running()?;

        let timestamp = self.log_timestamp(timestamp);
        let position = self.next_position();
        let command = command.into_record(position, self.partition_id, timestamp);
        self.log.push(command.clone());

        if !command.intent_matches_value() {
            let err = EngineError::IntentValueMismatch {
                position,
                intent: command.intent,
                value_type: command.value.value_type(),
            };
            return Err(self.fail(err));
        }

        let mut writers = Writers::new();
        let mut keys = self.state.key_generator();
        let result = {
            let mut ctx = ProcessingContext {
                state: &self.state,
                writers: &mut writers,
                keys: &mut keys,
                timestamp,
            };
            self.dispatcher.dispatch(&command, &mut ctx)
        };

        match result {
            Ok(()) => {}
            Err(ProcessingError::Rejected(rejection)) => {
                debug!(
                    position,
                    intent = %command.intent,
                    rejection_type = %rejection.rejection_type,
                    reason = %rejection.reason,
                    "Command rejected"
                );
                writers.append_rejection(rejection);
            }
            Err(ProcessingError::Fatal(err)) => return Err(self.fail(err)),
        }

        let effects = writers.into_parts();
        let mut processed = ProcessedCommand {
            command_position: position,
            records: Vec::with_capacity(effects.events.len()),
            response: effects.response,
            rejection: effects.rejection,
        };

        if let Some(rejection) = &processed.rejection {
            let record = self.rejection_record(&command, rejection);
            processed.response = command.request.map(|request| ClientResponse {
                request,
                key: command.key,
                record_type: RecordType::CommandRejection,
                intent: command.intent,
                value: command.value.clone(),
                rejection: record.rejection.clone(),
            });
            self.log.push(record.clone());
            processed.records.push(record);
            return Ok(processed);
        }

        for event in effects.events {
            let record = Record {
                position: self.next_position(),
                source_position: Some(position),
                key: event.key,
                record_type: RecordType::Event,
                intent: event.intent,
                value: event.value,
                timestamp,
                partition_id: self.partition_id,
                rejection: None,
                request: None,
                authorizations: command.authorizations.clone(),
            };
            if let Err(err) = apply_event(&mut self.state, &record) {
                return Err(self.fail(err));
            }
            self.log.push(record.clone());
            processed.records.push(record);
        }

        for subscription_command in effects.commands {
            self.sender.send(subscription_command);
        }

        Ok(processed)
    }

    fn rejection_record(&self, command: &Record, rejection: &Rejection) -> Record {
        Record {
            position: self.next_position(),
            source_position: Some(command.position),
            key: command.key,
            record_type: RecordType::CommandRejection,
            intent: command.intent,
            value: command.value.clone(),
            timestamp: command.timestamp,
            partition_id: self.partition_id,
            rejection: Some(RejectionInfo {
                rejection_type: rejection.rejection_type,
                reason: rejection.reason.clone(),
            }),
            request: command.request,
            authorizations: command.authorizations.clone(),
        }
    }

    /// Appends and applies an event produced outside the command processors
    /// (deployments, element lifecycle, jobs, incidents, event triggers).
    pub fn write_event(
        &mut self,
        key: Key,
        intent: impl Into<Intent>,
        value: impl Into<RecordValue>,
        timestamp: DateTime<Utc>,
    ) -> Result<Record> {
        self.ensure_running()?;

        let timestamp = self.log_timestamp(timestamp);
        let record = Record {
            position: self.next_position(),
            source_position: None,
            key,
            record_type: RecordType::Event,
            intent: intent.into(),
            value: value.into(),
            timestamp,
            partition_id: self.partition_id,
            rejection: None,
            request: None,
            authorizations: Default::default(),
        };
        if let Err(err) = apply_event(&mut self.state, &record) {
            return Err(self.fail(err));
        }
        self.log.push(record.clone());
        Ok(record)
    }

    /// Rebuilds the state from an existing log. Only events are applied;
    /// commands and rejections are kept in the log as they are.
    pub fn replay(&mut self, records: impl IntoIterator<Item = Record>) -> Result<usize> {
        self.ensure_running()?;

        let mut applied = 0;
        for record in records {
            self.log_timestamp(record.timestamp);
            if record.record_type == RecordType::Event {
                if let Err(err) = apply_event(&mut self.state, &record) {
                    return Err(self.fail(err));
                }
                applied += 1;
            }
            self.log.push(record);
        }

        info!(partition_id = self.partition_id, applied, "Replay completed");
        Ok(applied)
    }

    /// Issues `MESSAGE:EXPIRE` for every message whose deadline is at or
    /// before `now`.
    pub fn expire_messages(&mut self, now: DateTime<Utc>) -> Result<Vec<ProcessedCommand>> {
        self.ensure_running()?;

        let now = self.log_timestamp(now);
        let due = self.state.due_messages(now);
        let mut processed = Vec::with_capacity(due.len());

        for key in due {
            let Some(message) = self.state.get_message(key) else {
                continue;
            };
            let result = self.process(
                Command::new(MessageIntent::Expire, message.record).with_key(key),
                now,
            )?;
            if result.is_rejected() {
                warn!(message_key = key, "Message expiry rejected");
            }
            processed.push(result);
        }

        if !processed.is_empty() {
            debug!(expired = processed.len(), "Expired messages");
        }
        Ok(processed)
    }
}
