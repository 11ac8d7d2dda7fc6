// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Meridian Model - Deployed Process Definitions
//!
//! This crate defines the immutable, versioned process definition graph the
//! engine reads while processing commands:
//!
//! - [`BpmnElementType`] / [`BpmnEventType`]: the kinds of executable elements
//! - [`ElementTypeSet`]: compile-time sets of element types (e.g. the types
//!   that can be migrated)
//! - [`DeployedProcess`]: an arena of [`ExecutableElement`]s addressed by
//!   element id, with flow-scope and boundary-event relations stored as id
//!   references
//!
//! # Example
//!
//! ```
//! use meridian_model::{BpmnElementType, BpmnEventType, DeployedProcess};
//!
//! let process = DeployedProcess::builder("order-process")
//!     .key(2251799813685249)
//!     .version(1)
//!     .service_task("charge", "order-process")
//!     .boundary_event("timeout", "charge", BpmnEventType::Timer)
//!     .build()
//!     .unwrap();
//!
//! let charge = process.get_element_by_id("charge").unwrap();
//! assert_eq!(charge.element_type, BpmnElementType::ServiceTask);
//! assert_eq!(process.boundary_events("charge").count(), 1);
//! ```

mod element;
mod error;
mod process;

pub use element::{BpmnElementType, BpmnEventType, ElementTypeSet};
pub use error::ModelError;
pub use process::{DEFAULT_TENANT_ID, DeployedProcess, ExecutableElement, ProcessBuilder};
