// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Completing a message correlation.
//!
//! The process instance partition answers a correlate command with
//! `MESSAGE_SUBSCRIPTION:CORRELATE` once the waiting element consumed the
//! message. This closes the round trip on the message partition:
//!
//! 1. the subscription must still exist, otherwise the command is rejected
//!    `NOT_FOUND` and nothing else happens;
//! 2. a request-bound message gets its deferred `PUBLISHED` response;
//! 3. `CORRELATED` is appended for the subscription;
//! 4. a non-interrupting subscription stays open and is offered the next
//!    buffered message.

use meridian_protocol::{MessageIntent, MessageSubscriptionIntent, Record};
use tracing::{debug, instrument};

use super::correlator::correlate_next_message;
use crate::error::{ProcessingError, Rejection};
use crate::processing::{CommandProcessor, ProcessingContext, reject, value_mismatch};

/// Handles `MESSAGE_SUBSCRIPTION:CORRELATE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubscriptionCorrelateProcessor;

impl CommandProcessor for SubscriptionCorrelateProcessor {
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
                "Expected to correlate subscription for element with key '{}' and message name '{}', but no such message subscription exists",
                value.element_instance_key, value.message_name
            )));
        };

        if let Some(message) = value
            .message_key
            .and_then(|key| ctx.state.message_state().get_message(key))
        {
            if let Some(request) = message.record.request {
                ctx.writers.response.write_response(
                    message.key,
                    MessageIntent::Published,
                    message.record,
                    request,
                );
            }
        }

        ctx.writers.state.append_follow_up_event(
            subscription.key,
            MessageSubscriptionIntent::Correlated,
            subscription.record.clone(),
        );

        if !subscription.record.interrupting {
            let correlated = correlate_next_message(ctx, subscription.key, &subscription.record);
            debug!(subscription_key = subscription.key, correlated, "Subscription re-armed");
        }
        Ok(())
    }
}
