// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Replays buffered messages to a subscription.

use meridian_protocol::{Key, MessageSubscriptionIntent, MessageSubscriptionRecord};
use tracing::debug;

use crate::processing::ProcessingContext;
use crate::sender::SubscriptionCommand;
use crate::state::StoredMessage;

/// Correlates the next buffered message matching the subscription.
///
/// Messages are visited in publish order. A message already correlated to a
/// process with the subscription's `bpmn_process_id`, or one past its
/// deadline, is skipped. For the first remaining message a `CORRELATING`
/// event is appended and the correlate command is sent to the process
/// instance partition.
///
/// Returns `true` if a message was found.
pub fn correlate_next_message(
    ctx: &mut ProcessingContext<'_>,
    subscription_key: Key,
    subscription: &MessageSubscriptionRecord,
) -> bool {
    let state = ctx.state;
    let now = ctx.timestamp;
    let mut next: Option<StoredMessage> = None;

    state.message_state().visit_messages(
        &subscription.message_name,
        &subscription.correlation_key,
        &mut |message| {
            let correlatable = message.record.tenant_id == subscription.tenant_id
                && message.deadline > now
                && !state
                    .message_state()
                    .exist_message_correlation(message.key, &subscription.bpmn_process_id);
            if correlatable {
                next = Some(message.clone());
            }
            !correlatable
        },
    );

    let Some(message) = next else {
        return false;
    };

    debug!(
        subscription_key,
        message_key = message.key,
        message_name = %subscription.message_name,
        "Correlating buffered message"
    );

    let mut correlating = subscription.clone();
    correlating.message_key = Some(message.key);
    correlating.variables = message.record.variables.clone();

    ctx.writers.side_effects.send(SubscriptionCommand::correlate(
        &correlating,
        message.key,
        message.record.variables,
    ));
    ctx.writers.state.append_follow_up_event(
        subscription_key,
        MessageSubscriptionIntent::Correlating,
        correlating,
    );
    true
}
