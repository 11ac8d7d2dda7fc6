// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Routes commands to their processors.

use std::collections::HashMap;

use meridian_protocol::{
    Intent, MessageIntent, MessageSubscriptionIntent, ProcessInstanceMigrationIntent, Record,
};
use tracing::warn;

use super::message::{
    MessageExpireProcessor, MessagePublishProcessor, SubscriptionCorrelateProcessor,
    SubscriptionCreateProcessor, SubscriptionDeleteProcessor,
};
use super::migration::MigrationProcessor;
use super::{CommandProcessor, ProcessingContext};
use crate::error::ProcessingError;

/// Maps `(value type, intent)` pairs to processors.
pub struct CommandDispatcher {
    processors: HashMap<Intent, Box<dyn CommandProcessor>>,
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("intents", &self.processors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::with_engine_processors()
    }
}

impl CommandDispatcher {
    /// A dispatcher without any processor.
    pub fn empty() -> Self {
        Self {
            processors: HashMap::new(),
        }
    }

    /// A dispatcher with the message and migration processors registered.
    pub fn with_engine_processors() -> Self {
        Self::empty()
            .register(MessageIntent::Publish, MessagePublishProcessor::publish())
            .register(MessageIntent::Correlate, MessagePublishProcessor::correlate())
            .register(MessageIntent::Expire, MessageExpireProcessor)
            .register(MessageSubscriptionIntent::Create, SubscriptionCreateProcessor)
            .register(MessageSubscriptionIntent::Correlate, SubscriptionCorrelateProcessor)
            .register(MessageSubscriptionIntent::Delete, SubscriptionDeleteProcessor)
            .register(ProcessInstanceMigrationIntent::Migrate, MigrationProcessor)
    }

    /// Registers `processor` for `intent`, replacing any previous one.
    pub fn register(
        mut self,
        intent: impl Into<Intent>,
        processor: impl CommandProcessor + 'static,
    ) -> Self {
        self.processors.insert(intent.into(), Box::new(processor));
        self
    }

    pub fn handles(&self, intent: &Intent) -> bool {
        self.processors.contains_key(intent)
    }

    /// Hands the command to its processor. Commands without a processor are
    /// skipped.
    pub fn dispatch(
        &self,
        command: &Record,
        ctx: &mut ProcessingContext<'_>,
    ) -> Result<(), ProcessingError> {
        match self.processors.get(&command.intent) {
            Some(processor) => processor.process(command, ctx),
            None => {
                warn!(
                    position = command.position,
                    intent = %command.intent,
                    "No processor registered for command, skipping"
                );
                Ok(())
            }
        }
    }
}
