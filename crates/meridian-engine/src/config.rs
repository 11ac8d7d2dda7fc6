// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use meridian_protocol::MAX_PARTITION_ID;

/// Partition configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Id of the partition this engine processes.
    pub partition_id: u16,
    /// Total number of partitions in the cluster.
    pub partition_count: u16,
    /// How often buffered messages are checked for expiry.
    pub message_ttl_check_interval: Duration,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional (with defaults):
    /// - `MERIDIAN_PARTITION_ID`: Partition to process (default: 1)
    /// - `MERIDIAN_PARTITION_COUNT`: Number of partitions (default: 1)
    /// - `MERIDIAN_MESSAGE_TTL_CHECK_INTERVAL_MS`: Expiry check period (default: 60000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let partition_count: u16 = std::env::var("MERIDIAN_PARTITION_COUNT")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .ok()
            .filter(|count| (1..=MAX_PARTITION_ID).contains(count))
            .ok_or(ConfigError::Invalid(
                "MERIDIAN_PARTITION_COUNT",
                "must be an integer between 1 and 4095",
            ))?;

        let partition_id: u16 = std::env::var("MERIDIAN_PARTITION_ID")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("MERIDIAN_PARTITION_ID", "must be a positive integer"))?;
        if partition_id == 0 || partition_id > partition_count {
            return Err(ConfigError::Invalid(
                "MERIDIAN_PARTITION_ID",
                "must be between 1 and MERIDIAN_PARTITION_COUNT",
            ));
        }

        let ttl_check_ms: u64 = std::env::var("MERIDIAN_MESSAGE_TTL_CHECK_INTERVAL_MS")
            .unwrap_or_else(|_| "60000".to_string())
            .parse()
            .ok()
            .filter(|ms| *ms > 0)
            .ok_or(ConfigError::Invalid(
                "MERIDIAN_MESSAGE_TTL_CHECK_INTERVAL_MS",
                "must be a positive number of milliseconds",
            ))?;

        Ok(Self {
            partition_id,
            partition_count,
            message_ttl_check_interval: Duration::from_millis(ttl_check_ms),
        })
    }

    /// Whether `partition_id` is part of the cluster.
    pub fn is_known_partition(&self, partition_id: u16) -> bool {
        (1..=self.partition_count).contains(&partition_id)
    }
}

/// Configuration of the `meridian-replay` binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayConfig {
    pub engine: EngineConfig,
    /// JSON-lines file of commands and external events to process.
    pub command_log: PathBuf,
    /// State snapshot to start from.
    pub state_snapshot: Option<PathBuf>,
    /// Where to write the final state snapshot.
    pub output_snapshot: Option<PathBuf>,
}

impl ReplayConfig {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `MERIDIAN_COMMAND_LOG`: Path of the JSON-lines command log
    ///
    /// Optional:
    /// - `MERIDIAN_STATE_SNAPSHOT`: Snapshot to start from
    /// - `MERIDIAN_OUTPUT_SNAPSHOT`: Path for the final snapshot
    /// - everything read by [`EngineConfig::from_env`]
    pub fn from_env() -> Result<Self, ConfigError> {
        let command_log = std::env::var("MERIDIAN_COMMAND_LOG")
            .map(PathBuf::from)
            .map_err(|_| ConfigError::Missing("MERIDIAN_COMMAND_LOG"))?;

        Ok(Self {
            engine: EngineConfig::from_env()?,
            command_log,
            state_snapshot: std::env::var("MERIDIAN_STATE_SNAPSHOT").ok().map(PathBuf::from),
            output_snapshot: std::env::var("MERIDIAN_OUTPUT_SNAPSHOT").ok().map(PathBuf::from),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
