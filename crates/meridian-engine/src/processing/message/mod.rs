// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Message and message subscription processors.
//!
//! | Command | Processor |
//! |---------|-----------|
//! | `MESSAGE:PUBLISH` | [`MessagePublishProcessor::publish`] |
//! | `MESSAGE:CORRELATE` | [`MessagePublishProcessor::correlate`] |
//! | `MESSAGE:EXPIRE` | [`MessageExpireProcessor`] |
//! | `MESSAGE_SUBSCRIPTION:CREATE` | [`SubscriptionCreateProcessor`] |
//! | `MESSAGE_SUBSCRIPTION:CORRELATE` | [`SubscriptionCorrelateProcessor`] |
//! | `MESSAGE_SUBSCRIPTION:DELETE` | [`SubscriptionDeleteProcessor`] |

pub mod correlator;
mod expire;
mod publish;
mod subscription_correlate;
mod subscription_create;
mod subscription_delete;

pub use correlator::correlate_next_message;
pub use expire::MessageExpireProcessor;
pub use publish::{MessagePublishProcessor, PublishMode};
pub use subscription_correlate::SubscriptionCorrelateProcessor;
pub use subscription_create::SubscriptionCreateProcessor;
pub use subscription_delete::SubscriptionDeleteProcessor;
