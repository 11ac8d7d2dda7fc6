// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Message publish and subscription correlation through a partition.

mod common;

use common::{TestContext, message, published_key};
use meridian_engine::SubscriptionCommand;
use meridian_engine::state::{MessageState, MessageSubscriptionState};
use meridian_protocol::{
    Command, Intent, Key, MessageIntent, MessageSubscriptionIntent, MessageSubscriptionRecord,
    RejectionType,
};

fn subscription(ctx: &mut TestContext, bpmn_process_id: &str) -> MessageSubscriptionRecord {
    let process_instance_key = ctx.partition.next_key();
    let element_instance_key = ctx.partition.next_key();
    MessageSubscriptionRecord::new(
        process_instance_key,
        element_instance_key,
        bpmn_process_id,
        "order-paid",
        "order-42",
    )
}

fn correlated_message_keys(commands: &[SubscriptionCommand]) -> Vec<Key> {
    commands
        .iter()
        .filter_map(|c| match c {
            SubscriptionCommand::CorrelateProcessMessageSubscription { message_key, .. } => {
                Some(*message_key)
            }
            _ => None,
        })
        .collect()
}

// ============================================================================
// Subscription correlation
// ============================================================================

#[test]
fn test_non_interrupting_subscription_correlates_every_buffered_message() {
    let mut ctx = TestContext::new();
    let sub = subscription(&mut ctx, "order-process").non_interrupting();
    assert!(!ctx.open_subscription(sub.clone()).is_rejected());

    let first = published_key(&ctx.publish(message("order-paid", "order-42")));
    let second = published_key(&ctx.publish(message("order-paid", "order-42")));

    // Only the first publish reached the subscription; the second waited
    // until the subscription was free again.
    let outgoing = ctx.drain_outgoing();
    assert_eq!(correlated_message_keys(&outgoing), vec![first]);

    let confirmed = ctx.correlate_subscription(&sub, first);
    assert_eq!(confirmed.events_with(MessageSubscriptionIntent::Correlated).len(), 1);
    assert_eq!(confirmed.events_with(MessageSubscriptionIntent::Correlating).len(), 1);
    assert_eq!(correlated_message_keys(&ctx.drain_outgoing()), vec![second]);

    let confirmed = ctx.correlate_subscription(&sub, second);
    assert_eq!(confirmed.events_with(MessageSubscriptionIntent::Correlated).len(), 1);
    assert!(confirmed.events_with(MessageSubscriptionIntent::Correlating).is_empty());
    assert!(correlated_message_keys(&ctx.drain_outgoing()).is_empty());

    let open = ctx
        .partition
        .state()
        .get(sub.element_instance_key, "order-paid")
        .expect("non-interrupting subscription stays open");
    assert!(!open.correlating);
}

#[test]
fn test_interrupting_subscription_closes_after_first_correlation() {
    let mut ctx = TestContext::new();
    let sub = subscription(&mut ctx, "order-process");
    ctx.open_subscription(sub.clone());

    let first = published_key(&ctx.publish(message("order-paid", "order-42")));
    ctx.publish(message("order-paid", "order-42"));

    let confirmed = ctx.correlate_subscription(&sub, first);
    assert_eq!(confirmed.events_with(MessageSubscriptionIntent::Correlated).len(), 1);
    assert!(confirmed.events_with(MessageSubscriptionIntent::Correlating).is_empty());
    assert!(ctx.partition.state().get(sub.element_instance_key, "order-paid").is_none());

    let again = ctx.correlate_subscription(&sub, first);
    let rejection = again.rejection.expect("second correlation is rejected");
    assert_eq!(rejection.rejection_type, RejectionType::NotFound);
}

#[test]
fn test_correlating_missing_subscription_is_rejected_without_effects() {
    let mut ctx = TestContext::new();
    let sub = subscription(&mut ctx, "order-process");

    let processed = ctx.correlate_subscription(&sub, 1);

    let rejection = processed.rejection.clone().expect("rejected");
    assert_eq!(rejection.rejection_type, RejectionType::NotFound);
    assert_eq!(
        rejection.reason,
        format!(
            "Expected to correlate subscription for element with key '{}' and message name 'order-paid', but no such message subscription exists",
            sub.element_instance_key
        )
    );
    assert_eq!(processed.records.iter().filter(|r| r.is_rejection()).count(), 1);
    assert!(processed.records.iter().all(|r| !r.is_event()));
    assert!(processed.response.is_none());
    assert!(ctx.drain_outgoing().is_empty());
}

// ============================================================================
// Client responses
// ============================================================================

#[test]
fn test_request_bound_message_is_answered_on_correlation() {
    let mut ctx = TestContext::new();
    let sub = subscription(&mut ctx, "order-process");
    ctx.open_subscription(sub.clone());

    let correlate = ctx.process(
        Command::new(MessageIntent::Correlate, message("order-paid", "order-42"))
            .with_request(7, 3),
    );
    assert!(!correlate.is_rejected());
    assert!(correlate.response.is_none(), "client waits for the correlation");
    let message_key = published_key(&correlate);

    let confirmed = ctx.correlate_subscription(&sub, message_key);
    let response = confirmed.response.expect("response for the waiting client");
    assert_eq!(response.key, message_key);
    assert_eq!(response.intent, Intent::from(MessageIntent::Published));
    assert_eq!(response.request.request_id, 7);
    assert_eq!(response.request.request_stream_id, 3);
}

#[test]
fn test_published_message_is_not_answered_on_correlation() {
    let mut ctx = TestContext::new();
    let sub = subscription(&mut ctx, "order-process");
    ctx.open_subscription(sub.clone());

    let published = ctx.process(
        Command::new(MessageIntent::Publish, message("order-paid", "order-42")).with_request(7, 3),
    );
    assert!(published.response.is_some(), "publish is answered immediately");

    let confirmed = ctx.correlate_subscription(&sub, published_key(&published));
    assert!(confirmed.response.is_none());
}

#[test]
fn test_correlate_message_without_subscription_is_rejected() {
    let mut ctx = TestContext::new();

    let processed = ctx.process(
        Command::new(MessageIntent::Correlate, message("order-paid", "order-42"))
            .with_request(1, 1),
    );

    let rejection = processed.rejection.expect("rejected");
    assert_eq!(rejection.rejection_type, RejectionType::NotFound);
    assert_eq!(
        rejection.reason,
        "Expected to find subscription for message with name 'order-paid' and correlation key 'order-42', but none was found"
    );
    assert_eq!(ctx.partition.state().message_count(), 0);
}

// ============================================================================
// Publish
// ============================================================================

#[test]
fn test_duplicate_message_id_is_rejected() {
    let mut ctx = TestContext::new();
    ctx.publish(message("order-paid", "order-42").with_message_id("payment-1"));

    let duplicate = ctx.publish(message("order-paid", "order-42").with_message_id("payment-1"));

    let rejection = duplicate.rejection.expect("rejected");
    assert_eq!(rejection.rejection_type, RejectionType::AlreadyExists);
    assert_eq!(ctx.partition.state().message_count(), 1);

    // The id is scoped to name and correlation key.
    let other = ctx.publish(message("order-paid", "order-43").with_message_id("payment-1"));
    assert!(!other.is_rejected());
}

#[test]
fn test_publish_correlates_once_per_process_id() {
    let mut ctx = TestContext::new();
    let first = subscription(&mut ctx, "order-process");
    let same_process = subscription(&mut ctx, "order-process");
    let other_process = subscription(&mut ctx, "billing-process");
    for sub in [&first, &same_process, &other_process] {
        ctx.open_subscription(sub.clone());
    }
    ctx.drain_outgoing();

    let published = ctx.publish(message("order-paid", "order-42"));

    let correlating = published.events_with(MessageSubscriptionIntent::Correlating);
    assert_eq!(correlating.len(), 2);
    let targeted: Vec<Key> = correlating
        .iter()
        .filter_map(|r| r.value.as_message_subscription())
        .map(|s| s.element_instance_key)
        .collect();
    assert!(targeted.contains(&first.element_instance_key));
    assert!(targeted.contains(&other_process.element_instance_key));
    assert_eq!(correlated_message_keys(&ctx.drain_outgoing()).len(), 2);
}

#[test]
fn test_message_with_unbounded_ttl_stays_buffered() {
    let mut ctx = TestContext::new();

    let published = ctx.publish(message("order-paid", "order-42").with_ttl(i64::MAX));
    assert!(!published.is_rejected());
    assert!(published.events_with(MessageIntent::Expired).is_empty());
    let message_key = published_key(&published);
    assert_eq!(ctx.partition.state().message_count(), 1);

    ctx.advance(365 * 24 * 60 * 60 * 1000);
    assert!(ctx.partition.expire_messages(ctx.clock).expect("expire").is_empty());

    let sub = subscription(&mut ctx, "order-process");
    let opened = ctx.open_subscription(sub);
    let correlating = opened.events_with(MessageSubscriptionIntent::Correlating);
    assert_eq!(correlating.len(), 1);
    assert_eq!(
        correlating[0].value.as_message_subscription().and_then(|s| s.message_key),
        Some(message_key)
    );
}

#[test]
fn test_message_without_ttl_expires_immediately() {
    let mut ctx = TestContext::new();

    let published = ctx.publish(message("order-paid", "order-42").with_ttl(0));

    assert_eq!(published.events_with(MessageIntent::Published).len(), 1);
    assert_eq!(published.events_with(MessageIntent::Expired).len(), 1);
    assert_eq!(ctx.partition.state().message_count(), 0);
}

#[test]
fn test_expired_message_is_not_correlated() {
    let mut ctx = TestContext::new();
    ctx.publish(message("order-paid", "order-42"));
    ctx.advance(common::MESSAGE_TTL_MS);

    let expired = ctx.partition.expire_messages(ctx.clock).expect("expire");
    assert_eq!(expired.len(), 1);
    assert_eq!(ctx.partition.state().message_count(), 0);

    let sub = subscription(&mut ctx, "order-process");
    let opened = ctx.open_subscription(sub);
    assert!(opened.events_with(MessageSubscriptionIntent::Correlating).is_empty());
}

#[test]
fn test_expire_unknown_message_is_rejected() {
    let mut ctx = TestContext::new();

    let processed = ctx.process(
        Command::new(MessageIntent::Expire, message("order-paid", "order-42")).with_key(99),
    );

    let rejection = processed.rejection.expect("rejected");
    assert_eq!(rejection.rejection_type, RejectionType::NotFound);
    assert_eq!(
        rejection.reason,
        "Expected to expire message with key '99', but no such message found"
    );
}

// ============================================================================
// Subscription lifecycle
// ============================================================================

#[test]
fn test_opening_subscription_correlates_buffered_message() {
    let mut ctx = TestContext::new();
    let message_key = published_key(&ctx.publish(message("order-paid", "order-42")));
    let sub = subscription(&mut ctx, "order-process");

    let opened = ctx.open_subscription(sub.clone());

    assert_eq!(opened.events_with(MessageSubscriptionIntent::Created).len(), 1);
    let correlating = opened.events_with(MessageSubscriptionIntent::Correlating);
    assert_eq!(correlating.len(), 1);
    assert_eq!(
        correlating[0].value.as_message_subscription().and_then(|s| s.message_key),
        Some(message_key)
    );

    let outgoing = ctx.drain_outgoing();
    assert!(matches!(
        outgoing[0],
        SubscriptionCommand::OpenProcessMessageSubscription { interrupting: true, .. }
    ));
    assert_eq!(correlated_message_keys(&outgoing), vec![message_key]);
    assert!(
        ctx.partition
            .state()
            .exist_message_correlation(message_key, "order-process")
    );
}

#[test]
fn test_opening_duplicate_subscription_is_rejected() {
    let mut ctx = TestContext::new();
    let sub = subscription(&mut ctx, "order-process");
    ctx.open_subscription(sub.clone());

    let duplicate = ctx.open_subscription(sub);

    let rejection = duplicate.rejection.expect("rejected");
    assert_eq!(rejection.rejection_type, RejectionType::InvalidState);
    assert_eq!(ctx.partition.state().subscription_count(), 1);
}

#[test]
fn test_deleting_subscription_sends_close() {
    let mut ctx = TestContext::new();
    let sub = subscription(&mut ctx, "order-process");
    ctx.open_subscription(sub.clone());
    ctx.drain_outgoing();

    let deleted = ctx.process(Command::new(MessageSubscriptionIntent::Delete, sub.clone()));

    assert_eq!(deleted.events_with(MessageSubscriptionIntent::Deleted).len(), 1);
    assert_eq!(ctx.partition.state().subscription_count(), 0);
    let outgoing = ctx.drain_outgoing();
    assert_eq!(outgoing.len(), 1);
    assert!(matches!(
        &outgoing[0],
        SubscriptionCommand::CloseProcessMessageSubscription { element_instance_key, .. }
            if *element_instance_key == sub.element_instance_key
    ));

    let again = ctx.process(Command::new(MessageSubscriptionIntent::Delete, sub));
    assert_eq!(
        again.rejection.map(|r| r.rejection_type),
        Some(RejectionType::NotFound)
    );
}
