// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Errors raised while assembling a process definition.

/// A process definition that violates the structure of the element arena.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Two elements share the same id.
    #[error("process '{process_id}' contains more than one element with id '{element_id}'")]
    DuplicateElementId {
        /// The process id.
        process_id: String,
        /// The duplicated element id.
        element_id: String,
    },

    /// An element refers to a flow scope that is not part of the process.
    #[error("element '{element_id}' refers to unknown flow scope '{flow_scope}'")]
    UnknownFlowScope {
        /// The element with the dangling reference.
        element_id: String,
        /// The referenced flow scope id.
        flow_scope: String,
    },

    /// A boundary event is attached to an element that is not an activity.
    #[error("boundary event '{element_id}' is attached to '{attached_to}' which is not an activity")]
    InvalidAttachment {
        /// The boundary event id.
        element_id: String,
        /// The element it claims to be attached to.
        attached_to: String,
    },

    /// The process has no root element of type `PROCESS`, or more than one.
    #[error("process '{0}' must have exactly one root element of type PROCESS")]
    InvalidRoot(String),
}
