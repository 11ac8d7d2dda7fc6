// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Publishing messages.

use std::collections::HashSet;

use meridian_protocol::{
    Key, MessageIntent, MessageSubscriptionIntent, MessageSubscriptionRecord, Record,
};
use tracing::{debug, instrument};

use crate::error::{ProcessingError, Rejection};
use crate::processing::{CommandProcessor, ProcessingContext, reject, value_mismatch};
use crate::sender::SubscriptionCommand;

/// How the publisher waits for the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishMode {
    /// Respond as soon as the message is buffered.
    Publish,
    /// Respond once a subscription confirms the correlation; reject if no
    /// subscription matches.
    Correlate,
}

/// Handles `MESSAGE:PUBLISH` and `MESSAGE:CORRELATE`.
///
/// The message is buffered and correlated to every open subscription with
/// the same name and correlation key, at most once per process id.
#[derive(Debug, Clone, Copy)]
pub struct MessagePublishProcessor {
    mode: PublishMode,
}

impl MessagePublishProcessor {
    pub fn publish() -> Self {
        Self {
            mode: PublishMode::Publish,
        }
    }

    pub fn correlate() -> Self {
        Self {
            mode: PublishMode::Correlate,
        }
    }
}

impl CommandProcessor for MessagePublishProcessor {
    #[instrument(skip(self, command, ctx), fields(mode = ?self.mode, position = command.position))]
    fn process(
        &self,
        command: &Record,
        ctx: &mut ProcessingContext<'_>,
    ) -> Result<(), ProcessingError> {
        let message = command.value.as_message().ok_or_else(|| value_mismatch(command))?;

        if let Some(message_id) = message.message_id.as_deref().filter(|id| !id.is_empty()) {
            if ctx.state.message_state().exist_message_id(
                &message.name,
                &message.correlation_key,
                message_id,
            ) {
                return reject(Rejection::already_exists(format!(
                    "Expected to publish a new message with id '{}', but a message with that id was already published",
                    message_id
                )));
            }
        }

        let mut correlated_processes: HashSet<String> = HashSet::new();
        let mut targets: Vec<(Key, MessageSubscriptionRecord)> = Vec::new();
        ctx.state.message_subscription_state().visit_subscriptions(
            &message.name,
            &message.correlation_key,
            &mut |subscription| {
                if !subscription.correlating
                    && subscription.record.tenant_id == message.tenant_id
                    && correlated_processes.insert(subscription.record.bpmn_process_id.clone())
                {
                    targets.push((subscription.key, subscription.record.clone()));
                }
                true
            },
        );

        if self.mode == PublishMode::Correlate && targets.is_empty() {
            return reject(Rejection::not_found(format!(
                "Expected to find subscription for message with name '{}' and correlation key '{}', but none was found",
                message.name, message.correlation_key
            )));
        }

        let key = ctx.keys.next_key();
        let mut published = message.clone();
        published.request = match self.mode {
            PublishMode::Publish => None,
            PublishMode::Correlate => command.request,
        };

        ctx.writers
            .state
            .append_follow_up_event(key, MessageIntent::Published, published.clone());
        if self.mode == PublishMode::Publish {
            ctx.writers.response.write_event_on_command(
                key,
                MessageIntent::Published,
                published.clone(),
                command,
            );
        }

        for (subscription_key, subscription) in targets {
            let mut correlating = subscription;
            correlating.message_key = Some(key);
            correlating.variables = published.variables.clone();
            ctx.writers.side_effects.send(SubscriptionCommand::correlate(
                &correlating,
                key,
                published.variables.clone(),
            ));
            ctx.writers.state.append_follow_up_event(
                subscription_key,
                MessageSubscriptionIntent::Correlating,
                correlating,
            );
        }

        // A request-bound message must outlive the correlation round trip;
        // the TTL check removes it.
        if self.mode == PublishMode::Publish && published.time_to_live <= 0 {
            ctx.writers
                .state
                .append_follow_up_event(key, MessageIntent::Expired, published);
        }

        debug!(message_key = key, "Message published");
        Ok(())
    }
}
