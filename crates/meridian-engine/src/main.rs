// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Meridian Replay
//!
//! Runs a JSON-lines log of commands and external events through one
//! partition and prints every produced record, client response and outgoing
//! subscription command as JSON lines on stdout.
//!
//! Each input line carries a `timestamp` and either a `command` or an
//! `event`:
//!
//! ```text
//! {"timestamp":"2025-01-01T00:00:00Z","event":{"key":1,"intent":{...},"value":{...}}}
//! {"timestamp":"2025-01-01T00:00:01Z","command":{"intent":{...},"value":{...}}}
//! ```

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use meridian_engine::config::ReplayConfig;
use meridian_engine::{
    ChannelCommandSender, ClientResponse, InMemoryState, Partition, SubscriptionCommand,
};
use meridian_protocol::{Command, Intent, Key, Record, RecordValue};

/// An event produced outside the record-processing core.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExternalEvent {
    key: Key,
    intent: Intent,
    value: RecordValue,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogEntry {
    timestamp: DateTime<Utc>,
    #[serde(default)]
    command: Option<Command>,
    #[serde(default)]
    event: Option<ExternalEvent>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase")]
enum Output<'a> {
    Record(&'a Record),
    Response(&'a ClientResponse),
    Outgoing(&'a SubscriptionCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (from crate directory or parent directories)
    dotenvy::dotenv().ok();

    // Initialize tracing (stdout carries the replay output)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("meridian_engine=info".parse()?),
        )
        .init();

    info!("Starting Meridian Replay");

    let config = ReplayConfig::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;

    info!(
        partition_id = config.engine.partition_id,
        partition_count = config.engine.partition_count,
        command_log = %config.command_log.display(),
        "Configuration loaded"
    );

    let state = match &config.state_snapshot {
        Some(path) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading snapshot {}", path.display()))?;
            let state = InMemoryState::from_json(&json)?;
            if state.partition_id() != config.engine.partition_id {
                bail!(
                    "snapshot belongs to partition {} but MERIDIAN_PARTITION_ID is {}",
                    state.partition_id(),
                    config.engine.partition_id
                );
            }
            info!(path = %path.display(), "State snapshot loaded");
            state
        }
        None => InMemoryState::new(config.engine.partition_id)?,
    };

    let (sender, mut outgoing) = ChannelCommandSender::channel();
    let mut partition = Partition::with_state(state, Arc::new(sender));

    let log = tokio::fs::read_to_string(&config.command_log)
        .await
        .with_context(|| format!("reading command log {}", config.command_log.display()))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut processed_commands = 0usize;

    for (index, line) in log.lines().enumerate() {
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        let entry: LogEntry = serde_json::from_str(line)
            .with_context(|| format!("parsing line {}", line_no))?;

        match (entry.command, entry.event) {
            (Some(command), None) => {
                let processed = partition.process(command, entry.timestamp)?;
                processed_commands += 1;
                let command_record = partition
                    .log()
                    .iter()
                    .find(|r| r.position == processed.command_position);
                for record in command_record.into_iter().chain(processed.records.iter()) {
                    print_output(&mut out, &Output::Record(record))?;
                }
                if let Some(response) = &processed.response {
                    print_output(&mut out, &Output::Response(response))?;
                }
            }
            (None, Some(event)) => {
                let record =
                    partition.write_event(event.key, event.intent, event.value, entry.timestamp)?;
                print_output(&mut out, &Output::Record(&record))?;
            }
            _ => bail!("line {} must contain exactly one of `command` or `event`", line_no),
        }

        while let Ok(command) = outgoing.try_recv() {
            if !config.engine.is_known_partition(command.partition_id()) {
                warn!(
                    partition_id = command.partition_id(),
                    "Outgoing command addressed to unknown partition"
                );
            }
            print_output(&mut out, &Output::Outgoing(&command))?;
        }
    }

    if let Some(path) = &config.output_snapshot {
        tokio::fs::write(path, partition.state().to_json()?)
            .await
            .with_context(|| format!("writing snapshot {}", path.display()))?;
        info!(path = %path.display(), "State snapshot written");
    }

    info!(
        commands = processed_commands,
        records = partition.log().len(),
        "Replay complete"
    );

    Ok(())
}

fn print_output(out: &mut impl Write, output: &Output<'_>) -> Result<()> {
    serde_json::to_writer(&mut *out, output)?;
    writeln!(out)?;
    Ok(())
}
