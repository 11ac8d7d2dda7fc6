// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Command processing.
//!
//! A [`CommandProcessor`] handles one `(value type, intent)` pair. It reads
//! state through [`ProcessingState`], draws keys from the context's key
//! generator and buffers every effect in the context's [`Writers`].
//! Refusing a command is expressed by returning a [`Rejection`]; processors
//! never block or retry.

pub mod dispatcher;
pub mod message;
pub mod migration;

pub use dispatcher::CommandDispatcher;

use chrono::{DateTime, Utc};
use meridian_protocol::{KeyGenerator, Record};

use crate::error::{EngineError, ProcessingError, Rejection};
use crate::state::ProcessingState;
use crate::writers::Writers;

/// Everything a processor may touch while handling one command.
pub struct ProcessingContext<'a> {
    pub state: &'a dyn ProcessingState,
    pub writers: &'a mut Writers,
    pub keys: &'a mut KeyGenerator,
    /// Log-supplied timestamp of the command.
    pub timestamp: DateTime<Utc>,
}

pub trait CommandProcessor: Send {
    fn process(
        &self,
        command: &Record,
        ctx: &mut ProcessingContext<'_>,
    ) -> Result<(), ProcessingError>;
}

/// Error for a command whose payload does not fit its intent.
pub(crate) fn value_mismatch(command: &Record) -> ProcessingError {
    ProcessingError::Fatal(EngineError::IntentValueMismatch {
        position: command.position,
        intent: command.intent,
        value_type: command.value.value_type(),
    })
}

pub(crate) fn reject<T>(rejection: Rejection) -> Result<T, ProcessingError> {
    Err(ProcessingError::Rejected(rejection))
}
