// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Async driver for a [`Partition`].
//!
//! [`PartitionRuntime`] owns a partition on a dedicated tokio task. Commands
//! arrive through an mpsc channel and are processed strictly one at a time;
//! client responses are forwarded to a response channel. A periodic tick
//! expires messages past their deadline.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use meridian_engine::{ChannelCommandSender, Partition, PartitionRuntime};
//!
//! let (sender, outgoing) = ChannelCommandSender::channel();
//! let partition = Partition::new(1, Arc::new(sender))?;
//! let (responses_tx, mut responses) = tokio::sync::mpsc::unbounded_channel();
//!
//! let runtime = PartitionRuntime::builder()
//!     .message_ttl_check_interval(std::time::Duration::from_secs(60))
//!     .start(partition, responses_tx);
//!
//! runtime.submit(command).await?;
//! let response = responses.recv().await;
//!
//! let partition = runtime.shutdown().await?;
//! ```

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use meridian_protocol::Command;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::partition::Partition;
use crate::writers::ClientResponse;

const DEFAULT_COMMAND_BUFFER: usize = 1024;
const DEFAULT_TTL_CHECK_INTERVAL: Duration = Duration::from_secs(60);
const MIN_TTL_CHECK_INTERVAL: Duration = Duration::from_millis(1);

/// Builder for a [`PartitionRuntime`].
#[derive(Debug, Clone)]
pub struct PartitionRuntimeBuilder {
    command_buffer: usize,
    message_ttl_check_interval: Duration,
}

impl Default for PartitionRuntimeBuilder {
    fn default() -> Self {
        Self {
            command_buffer: DEFAULT_COMMAND_BUFFER,
            message_ttl_check_interval: DEFAULT_TTL_CHECK_INTERVAL,
        }
    }
}

impl PartitionRuntimeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capacity of the command channel.
    ///
    /// Default: 1024
    pub fn command_buffer(mut self, capacity: usize) -> Self {
        self.command_buffer = capacity.max(1);
        self
    }

    /// How often buffered messages are checked for expiry.
    ///
    /// Default: 60 seconds, minimum 1 ms
    pub fn message_ttl_check_interval(mut self, interval: Duration) -> Self {
        self.message_ttl_check_interval = interval.max(MIN_TTL_CHECK_INTERVAL);
        self
    }

    /// Spawns the processing task.
    pub fn start(
        self,
        partition: Partition,
        responses: mpsc::UnboundedSender<ClientResponse>,
    ) -> PartitionRuntime {
        let (commands_tx, commands_rx) = mpsc::channel(self.command_buffer);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let partition_id = partition.partition_id();

        let handle = tokio::spawn(run_partition(
            partition,
            commands_rx,
            responses,
            shutdown_rx,
            self.message_ttl_check_interval,
        ));

        info!(partition_id, "PartitionRuntime started");

        PartitionRuntime {
            partition_id,
            commands_tx,
            shutdown_tx,
            handle,
        }
    }
}

/// A partition running on its own task.
pub struct PartitionRuntime {
    partition_id: u16,
    commands_tx: mpsc::Sender<Command>,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<Result<Partition>>,
}

impl std::fmt::Debug for PartitionRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionRuntime")
            .field("partition_id", &self.partition_id)
            .finish()
    }
}

impl PartitionRuntime {
    pub fn builder() -> PartitionRuntimeBuilder {
        PartitionRuntimeBuilder::new()
    }

    pub fn partition_id(&self) -> u16 {
        self.partition_id
    }

    /// Queues a command. The log timestamp is taken when it is processed.
    pub async fn submit(&self, command: Command) -> Result<()> {
        self.commands_tx
            .send(command)
            .await
            .map_err(|_| anyhow::anyhow!("partition {} is not running", self.partition_id))
    }

    /// Stops the task after the command in progress and returns the
    /// partition. Commands still queued are not processed.
    pub async fn shutdown(self) -> Result<Partition> {
        info!(partition_id = self.partition_id, "PartitionRuntime shutting down...");

        let _ = self.shutdown_tx.send(true);

        match self.handle.await {
            Ok(Ok(partition)) => {
                info!(partition_id = self.partition_id, "PartitionRuntime shutdown complete");
                Ok(partition)
            }
            Ok(Err(e)) => {
                error!("PartitionRuntime stopped with error: {}", e);
                Err(e)
            }
            Err(e) => {
                error!("PartitionRuntime task panicked: {}", e);
                Err(anyhow::anyhow!("partition task panicked: {}", e))
            }
        }
    }
}

async fn run_partition(
    mut partition: Partition,
    mut commands: mpsc::Receiver<Command>,
    responses: mpsc::UnboundedSender<ClientResponse>,
    mut shutdown: watch::Receiver<bool>,
    ttl_check_interval: Duration,
) -> Result<Partition> {
    let mut ttl_check = tokio::time::interval(ttl_check_interval);
    ttl_check.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.changed() => {
                info!(partition_id = partition.partition_id(), "Partition received shutdown signal");
                break;
            }

            command = commands.recv() => {
                let Some(command) = command else {
                    info!(partition_id = partition.partition_id(), "Command channel closed");
                    break;
                };
                let processed = partition.process(command, Utc::now())?;
                if let Some(response) = processed.response {
                    if responses.send(response).is_err() {
                        warn!("Response receiver dropped, response lost");
                    }
                }
            }

            _ = ttl_check.tick() => {
                for processed in partition.expire_messages(Utc::now())? {
                    if let Some(response) = processed.response {
                        let _ = responses.send(response);
                    }
                }
            }
        }
    }

    Ok(partition)
}
