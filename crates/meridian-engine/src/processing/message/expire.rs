// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Expiring buffered messages.

use meridian_protocol::{MessageIntent, Record};
use tracing::{debug, instrument};

use crate::error::{ProcessingError, Rejection};
use crate::processing::{CommandProcessor, ProcessingContext, reject};

/// Handles `MESSAGE:EXPIRE` for the message identified by the command key.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageExpireProcessor;

impl CommandProcessor for MessageExpireProcessor {
    #[instrument(skip(self, command, ctx), fields(message_key = command.key))]
    fn process(
        &self,
        command: &Record,
        ctx: &mut ProcessingContext<'_>,
    ) -> Result<(), ProcessingError> {
        let Some(message) = ctx.state.message_state().get_message(command.key) else {
            return reject(Rejection::not_found(format!(
                "Expected to expire message with key '{}', but no such message found",
                command.key
            )));
        };

        ctx.writers
            .state
            .append_follow_up_event(message.key, MessageIntent::Expired, message.record);
        debug!("Message expired");
        Ok(())
    }
}
