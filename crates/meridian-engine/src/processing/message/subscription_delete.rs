// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Closing message subscriptions.

use meridian_protocol::{MessageSubscriptionIntent, Record};
use tracing::{debug, instrument};

use crate::error::{ProcessingError, Rejection};
use crate::processing::{CommandProcessor, ProcessingContext, reject, value_mismatch};
use crate::sender::SubscriptionCommand;

/// Handles `MESSAGE_SUBSCRIPTION:DELETE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubscriptionDeleteProcessor;

impl CommandProcessor for SubscriptionDeleteProcessor {
    #[instrument(skip(self, command, ctx), fields(position = command.position))]
    fn process(
        &self,
        command: &Record,
        ctx: &mut ProcessingContext<'_>,
    ) -> Result<(), ProcessingError> {
        let value = command
            .value
            .as_message_subscription()
            .ok_or_else(|| value_mismatch(command))?;

        let Some(subscription) = ctx
            .state
            .message_subscription_state()
            .get(value.element_instance_key, &value.message_name)
        else {
            return reject(Rejection::not_found(format!(
                "Expected to close message subscription for element with key '{}' and message name '{}', but no such message subscription exists",
                value.element_instance_key, value.message_name
            )));
        };

        ctx.writers
            .side_effects
            .send(SubscriptionCommand::close(&subscription.record));
        ctx.writers.state.append_follow_up_event(
            subscription.key,
            MessageSubscriptionIntent::Deleted,
            subscription.record,
        );
        debug!(subscription_key = subscription.key, "Message subscription closed");
        Ok(())
    }
}
