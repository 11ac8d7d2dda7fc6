// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Process instance migration.

pub mod preconditions;
mod processor;

pub use preconditions::{ElementMapping, MigrationFailure};
pub use processor::MigrationProcessor;
