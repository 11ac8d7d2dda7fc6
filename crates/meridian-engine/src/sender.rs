// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Cross-partition subscription commands.
//!
//! The partition that owns a message and the partition that owns the
//! waiting process instance are generally different. They coordinate by
//! sending asynchronous commands; sending never blocks and never fails the
//! sending command.

use meridian_protocol::{Key, Variables, decode_partition_id};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A command addressed to the partition of a process instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionCommand {
    /// A message was correlated to the subscription of an element instance.
    #[serde(rename_all = "camelCase")]
    CorrelateProcessMessageSubscription {
        partition_id: u16,
        process_instance_key: Key,
        element_instance_key: Key,
        bpmn_process_id: String,
        message_key: Key,
        message_name: String,
        correlation_key: String,
        variables: Variables,
    },
    /// The message partition confirmed opening the subscription.
    #[serde(rename_all = "camelCase")]
    OpenProcessMessageSubscription {
        partition_id: u16,
        process_instance_key: Key,
        element_instance_key: Key,
        message_name: String,
        interrupting: bool,
    },
    /// The message partition confirmed closing the subscription.
    #[serde(rename_all = "camelCase")]
    CloseProcessMessageSubscription {
        partition_id: u16,
        process_instance_key: Key,
        element_instance_key: Key,
        message_name: String,
    },
}

impl SubscriptionCommand {
    pub fn correlate(
        subscription: &meridian_protocol::MessageSubscriptionRecord,
        message_key: Key,
        variables: Variables,
    ) -> Self {
        SubscriptionCommand::CorrelateProcessMessageSubscription {
            partition_id: decode_partition_id(subscription.process_instance_key),
            process_instance_key: subscription.process_instance_key,
            element_instance_key: subscription.element_instance_key,
            bpmn_process_id: subscription.bpmn_process_id.clone(),
            message_key,
            message_name: subscription.message_name.clone(),
            correlation_key: subscription.correlation_key.clone(),
            variables,
        }
    }

    pub fn open(subscription: &meridian_protocol::MessageSubscriptionRecord) -> Self {
        SubscriptionCommand::OpenProcessMessageSubscription {
            partition_id: decode_partition_id(subscription.process_instance_key),
            process_instance_key: subscription.process_instance_key,
            element_instance_key: subscription.element_instance_key,
            message_name: subscription.message_name.clone(),
            interrupting: subscription.interrupting,
        }
    }

    pub fn close(subscription: &meridian_protocol::MessageSubscriptionRecord) -> Self {
        SubscriptionCommand::CloseProcessMessageSubscription {
            partition_id: decode_partition_id(subscription.process_instance_key),
            process_instance_key: subscription.process_instance_key,
            element_instance_key: subscription.element_instance_key,
            message_name: subscription.message_name.clone(),
        }
    }

    /// Partition the command is addressed to.
    pub fn partition_id(&self) -> u16 {
        match self {
            SubscriptionCommand::CorrelateProcessMessageSubscription { partition_id, .. }
            | SubscriptionCommand::OpenProcessMessageSubscription { partition_id, .. }
            | SubscriptionCommand::CloseProcessMessageSubscription { partition_id, .. } => {
                *partition_id
            }
        }
    }
}

/// Fire-and-forget delivery of subscription commands.
pub trait SubscriptionCommandSender: Send + Sync {
    fn send(&self, command: SubscriptionCommand);
}

/// Sender backed by an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelCommandSender {
    tx: mpsc::UnboundedSender<SubscriptionCommand>,
}

impl ChannelCommandSender {
    pub fn new(tx: mpsc::UnboundedSender<SubscriptionCommand>) -> Self {
        Self { tx }
    }

    /// Creates a sender together with the receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SubscriptionCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl SubscriptionCommandSender for ChannelCommandSender {
    fn send(&self, command: SubscriptionCommand) {
        debug!(partition_id = command.partition_id(), ?command, "Sending subscription command");
        if let Err(e) = self.tx.send(command) {
            warn!(command = ?e.0, "Subscription command receiver dropped, command lost");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_protocol::{MessageSubscriptionRecord, encode_partition_id};

    #[test]
    fn test_commands_route_to_process_instance_partition() {
        let pik = encode_partition_id(3, 17);
        let subscription = MessageSubscriptionRecord::new(pik, pik + 1, "p", "order", "1");

        assert_eq!(SubscriptionCommand::open(&subscription).partition_id(), 3);
        assert_eq!(SubscriptionCommand::close(&subscription).partition_id(), 3);
        assert_eq!(
            SubscriptionCommand::correlate(&subscription, 9, Variables::new()).partition_id(),
            3
        );
    }

    #[test]
    fn test_channel_sender_delivers() {
        let (sender, mut rx) = ChannelCommandSender::channel();
        let subscription = MessageSubscriptionRecord::new(1, 2, "p", "order", "1");
        sender.send(SubscriptionCommand::close(&subscription));
        assert_eq!(rx.try_recv().unwrap(), SubscriptionCommand::close(&subscription));
    }

    #[test]
    fn test_channel_sender_tolerates_dropped_receiver() {
        let (sender, rx) = ChannelCommandSender::channel();
        drop(rx);
        let subscription = MessageSubscriptionRecord::new(1, 2, "p", "order", "1");
        sender.send(SubscriptionCommand::close(&subscription));
    }
}
