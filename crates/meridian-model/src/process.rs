// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Deployed process definitions.
//!
//! A [`DeployedProcess`] is an arena of [`ExecutableElement`]s. Relations
//! between elements (flow scope, boundary attachment) are stored as element
//! id references and resolved through the arena index, so definitions can be
//! serialized as a flat element list and rebuilt on deserialization.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::element::{BpmnElementType, BpmnEventType};
use crate::error::ModelError;

/// Tenant id used when multi-tenancy is not in use.
pub const DEFAULT_TENANT_ID: &str = "<default>";

/// A single element of a deployed process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutableElement {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub element_type: BpmnElementType,
    /// Id of the enclosing element. `None` only for the root process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_scope: Option<String>,
    /// Trigger kind for event elements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<BpmnEventType>,
    /// For boundary events, the id of the activity they are attached to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_to: Option<String>,
}

impl ExecutableElement {
    pub fn new(id: impl Into<String>, element_type: BpmnElementType) -> Self {
        Self {
            id: id.into(),
            name: None,
            element_type,
            flow_scope: None,
            event_type: None,
            attached_to: None,
        }
    }

    pub fn in_scope(mut self, flow_scope: impl Into<String>) -> Self {
        self.flow_scope = Some(flow_scope.into());
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_event_type(mut self, event_type: BpmnEventType) -> Self {
        self.event_type = Some(event_type);
        self
    }
}

/// Flat, serializable form of a deployed process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessDefinition {
    key: i64,
    bpmn_process_id: String,
    version: i32,
    #[serde(default = "default_tenant")]
    tenant_id: String,
    elements: Vec<ExecutableElement>,
}

fn default_tenant() -> String {
    DEFAULT_TENANT_ID.to_string()
}

/// An immutable, versioned process definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProcessDefinition", into = "ProcessDefinition")]
pub struct DeployedProcess {
    key: i64,
    bpmn_process_id: String,
    version: i32,
    tenant_id: String,
    elements: Vec<ExecutableElement>,
    index: HashMap<String, usize>,
}

impl TryFrom<ProcessDefinition> for DeployedProcess {
    type Error = ModelError;

    fn try_from(def: ProcessDefinition) -> Result<Self, Self::Error> {
        let mut index = HashMap::with_capacity(def.elements.len());
        for (i, element) in def.elements.iter().enumerate() {
            if index.insert(element.id.clone(), i).is_some() {
                return Err(ModelError::DuplicateElementId {
                    process_id: def.bpmn_process_id.clone(),
                    element_id: element.id.clone(),
                });
            }
        }

        let roots: Vec<&ExecutableElement> = def
            .elements
            .iter()
            .filter(|e| e.flow_scope.is_none())
            .collect();
        match roots.as_slice() {
            [root]
                if root.element_type == BpmnElementType::Process
                    && root.id == def.bpmn_process_id => {}
            _ => return Err(ModelError::InvalidRoot(def.bpmn_process_id)),
        }

        for element in &def.elements {
            if let Some(scope) = &element.flow_scope {
                let valid = index
                    .get(scope)
                    .is_some_and(|&i| def.elements[i].element_type.is_container());
                if !valid {
                    return Err(ModelError::UnknownFlowScope {
                        element_id: element.id.clone(),
                        flow_scope: scope.clone(),
                    });
                }
            }
            if let Some(attached_to) = &element.attached_to {
                let valid = index
                    .get(attached_to)
                    .is_some_and(|&i| def.elements[i].element_type.is_activity());
                if !valid {
                    return Err(ModelError::InvalidAttachment {
                        element_id: element.id.clone(),
                        attached_to: attached_to.clone(),
                    });
                }
            }
        }

        Ok(DeployedProcess {
            key: def.key,
            bpmn_process_id: def.bpmn_process_id,
            version: def.version,
            tenant_id: def.tenant_id,
            elements: def.elements,
            index,
        })
    }
}

impl From<DeployedProcess> for ProcessDefinition {
    fn from(process: DeployedProcess) -> Self {
        ProcessDefinition {
            key: process.key,
            bpmn_process_id: process.bpmn_process_id,
            version: process.version,
            tenant_id: process.tenant_id,
            elements: process.elements,
        }
    }
}

impl DeployedProcess {
    /// Starts building a definition whose root process element has the given id.
    pub fn builder(bpmn_process_id: impl Into<String>) -> ProcessBuilder {
        ProcessBuilder::new(bpmn_process_id)
    }

    pub fn key(&self) -> i64 {
        self.key
    }

    pub fn bpmn_process_id(&self) -> &str {
        &self.bpmn_process_id
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// The root `PROCESS` element.
    pub fn process(&self) -> &ExecutableElement {
        // The root is validated on construction.
        &self.elements[self.index[&self.bpmn_process_id]]
    }

    pub fn elements(&self) -> &[ExecutableElement] {
        &self.elements
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<&ExecutableElement> {
        self.index.get(id).map(|&i| &self.elements[i])
    }

    /// Looks up an element that is an activity (may carry boundary events).
    pub fn get_activity_by_id(&self, id: &str) -> Option<&ExecutableElement> {
        self.get_element_by_id(id)
            .filter(|e| e.element_type.is_activity())
    }

    /// The element enclosing `id`, if any.
    pub fn flow_scope_of(&self, id: &str) -> Option<&ExecutableElement> {
        self.get_element_by_id(id)
            .and_then(|e| e.flow_scope.as_deref())
            .and_then(|scope| self.get_element_by_id(scope))
    }

    /// Boundary events attached to the element with the given id.
    pub fn boundary_events<'a>(
        &'a self,
        id: &'a str,
    ) -> impl Iterator<Item = &'a ExecutableElement> + 'a {
        self.elements
            .iter()
            .filter(move |e| e.attached_to.as_deref() == Some(id))
    }

    /// Event subprocesses declared directly in the root process.
    pub fn event_subprocesses(&self) -> impl Iterator<Item = &ExecutableElement> {
        self.elements.iter().filter(|e| {
            e.element_type == BpmnElementType::EventSubProcess
                && e.flow_scope.as_deref() == Some(self.bpmn_process_id.as_str())
        })
    }
}

/// Assembles a [`DeployedProcess`] programmatically.
///
/// Boundary events get the flow scope of the activity they are attached to,
/// resolved when [`ProcessBuilder::build`] runs.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    key: i64,
    bpmn_process_id: String,
    version: i32,
    tenant_id: String,
    root: ExecutableElement,
    elements: Vec<ExecutableElement>,
}

impl ProcessBuilder {
    fn new(bpmn_process_id: impl Into<String>) -> Self {
        let bpmn_process_id = bpmn_process_id.into();
        Self {
            key: 0,
            root: ExecutableElement::new(bpmn_process_id.clone(), BpmnElementType::Process),
            bpmn_process_id,
            version: 1,
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            elements: Vec::new(),
        }
    }

    pub fn key(mut self, key: i64) -> Self {
        self.key = key;
        self
    }

    pub fn version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = tenant_id.into();
        self
    }

    /// Sets the display name of the root process element.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.root.name = Some(name.into());
        self
    }

    pub fn element(mut self, element: ExecutableElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn service_task(self, id: &str, flow_scope: &str) -> Self {
        self.element(ExecutableElement::new(id, BpmnElementType::ServiceTask).in_scope(flow_scope))
    }

    pub fn sub_process(self, id: &str, flow_scope: &str) -> Self {
        self.element(ExecutableElement::new(id, BpmnElementType::SubProcess).in_scope(flow_scope))
    }

    pub fn event_sub_process(self, id: &str, flow_scope: &str) -> Self {
        self.element(
            ExecutableElement::new(id, BpmnElementType::EventSubProcess).in_scope(flow_scope),
        )
    }

    pub fn boundary_event(self, id: &str, attached_to: &str, event_type: BpmnEventType) -> Self {
        let mut event =
            ExecutableElement::new(id, BpmnElementType::BoundaryEvent).with_event_type(event_type);
        event.attached_to = Some(attached_to.to_string());
        self.element(event)
    }

    pub fn build(self) -> Result<DeployedProcess, ModelError> {
        let mut elements = Vec::with_capacity(self.elements.len() + 1);
        elements.push(self.root);
        elements.extend(self.elements);

        let scopes: HashMap<String, Option<String>> = elements
            .iter()
            .map(|e| (e.id.clone(), e.flow_scope.clone()))
            .collect();
        for element in elements.iter_mut() {
            if element.flow_scope.is_some() {
                continue;
            }
            if let Some(attached_to) = &element.attached_to {
                element.flow_scope = scopes.get(attached_to).cloned().flatten();
                if element.flow_scope.is_none() {
                    return Err(ModelError::InvalidAttachment {
                        element_id: element.id.clone(),
                        attached_to: attached_to.clone(),
                    });
                }
            }
        }

        DeployedProcess::try_from(ProcessDefinition {
            key: self.key,
            bpmn_process_id: self.bpmn_process_id,
            version: self.version,
            tenant_id: self.tenant_id,
            elements,
        })
    }
}
