// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Meridian Engine - Record-Processing Core
//!
//! This crate is the deterministic state machine of one partition of the
//! process engine. It consumes commands in log order, reads materialized
//! state, and emits follow-up events, rejections and client responses.
//!
//! # Architecture
//!
//! ```text
//!              commands (log order)
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │               Partition                 │
//! │  log ─► CommandDispatcher ─► processor  │
//! │              │          reads ▲         │
//! │              ▼                │         │
//! │       buffered Writers   State views    │
//! │              │                ▲         │
//! │   commit ────┴──► appliers ───┘         │
//! └─────────────────────────────────────────┘
//!        │                 │
//!        ▼                 ▼
//!  client responses   SubscriptionCommandSender
//!                     (other partitions)
//! ```
//!
//! # Processors
//!
//! | Command | Effect |
//! |---------|--------|
//! | `MESSAGE:PUBLISH` | Buffer a message and correlate it to open subscriptions |
//! | `MESSAGE:CORRELATE` | Like publish, but respond only once a subscription consumed it |
//! | `MESSAGE:EXPIRE` | Remove a buffered message |
//! | `MESSAGE_SUBSCRIPTION:CREATE` | Open a subscription, replay buffered messages |
//! | `MESSAGE_SUBSCRIPTION:CORRELATE` | Complete a correlation, re-arm non-interrupting subscriptions |
//! | `MESSAGE_SUBSCRIPTION:DELETE` | Close a subscription |
//! | `PROCESS_INSTANCE_MIGRATION:MIGRATE` | Validate and migrate a running instance |
//!
//! # Determinism
//!
//! Processors never read the wall clock; they only see the log-supplied
//! timestamp of the command. Keys come from a per-partition generator that
//! is part of the state. Replaying the same log therefore yields the same
//! state and the same decisions.

pub mod config;
pub mod error;
pub mod partition;
pub mod processing;
pub mod runtime;
pub mod sender;
pub mod state;
pub mod writers;

pub use config::{ConfigError, EngineConfig, ReplayConfig};
pub use error::{EngineError, ProcessingError, Rejection};
pub use partition::{Partition, ProcessedCommand};
pub use processing::{CommandDispatcher, CommandProcessor, ProcessingContext};
pub use runtime::{PartitionRuntime, PartitionRuntimeBuilder};
pub use sender::{ChannelCommandSender, SubscriptionCommand, SubscriptionCommandSender};
pub use state::{InMemoryState, ProcessingState};
pub use writers::{ClientResponse, Writers};
