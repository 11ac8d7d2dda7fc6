// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Opening message subscriptions.

use meridian_protocol::{MessageSubscriptionIntent, Record};
use tracing::{debug, instrument};

use super::correlator::correlate_next_message;
use crate::error::{ProcessingError, Rejection};
use crate::processing::{CommandProcessor, ProcessingContext, reject, value_mismatch};
use crate::sender::SubscriptionCommand;

/// Handles `MESSAGE_SUBSCRIPTION:CREATE`.
///
/// Opens the subscription, confirms it to the process instance partition and
/// correlates the first buffered message, if any.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubscriptionCreateProcessor;

impl CommandProcessor for SubscriptionCreateProcessor {
    #[instrument(skip(self, command, ctx), fields(position = command.position))]
    fn process(
        &self,
        command: &Record,
        ctx: &mut ProcessingContext<'_>,
    ) -> Result<(), ProcessingError> {
        let subscription = command
            .value
            .as_message_subscription()
            .ok_or_else(|| value_mismatch(command))?;

        if ctx
            .state
            .message_subscription_state()
            .get(subscription.element_instance_key, &subscription.message_name)
            .is_some()
        {
            return reject(Rejection::invalid_state(format!(
                "Expected to open a new message subscription for element with key '{}' and message name '{}', but there is already a message subscription for that element key and message name opened",
                subscription.element_instance_key, subscription.message_name
            )));
        }

        let key = ctx.keys.next_key();
        ctx.writers.state.append_follow_up_event(
            key,
            MessageSubscriptionIntent::Created,
            subscription.clone(),
        );
        ctx.writers
            .side_effects
            .send(SubscriptionCommand::open(subscription));

        let correlated = correlate_next_message(ctx, key, subscription);
        debug!(subscription_key = key, correlated, "Message subscription opened");
        Ok(())
    }
}
