// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The `PROCESS_INSTANCE_MIGRATION:MIGRATE` processor.

use meridian_model::DeployedProcess;
use meridian_protocol::{
    JobIntent, ProcessInstanceIntent, ProcessInstanceMigrationIntent, Record,
};
use tracing::{info, instrument};

use super::preconditions::*;
use crate::error::{EngineError, ProcessingError};
use crate::processing::{CommandProcessor, ProcessingContext, value_mismatch};
use crate::state::{ElementInstance, ProcessingState};

/// Moves a running process instance to another process definition.
///
/// Every active element instance is validated before anything is written,
/// so a rejected migration leaves no trace in the state.
#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationProcessor;

impl CommandProcessor for MigrationProcessor {
    #[instrument(skip(self, command, ctx), fields(process_instance_key = tracing::field::Empty))]
    fn process(
        &self,
        command: &Record,
        ctx: &mut ProcessingContext<'_>,
    ) -> Result<(), ProcessingError> {
        let value = command
            .value
            .as_process_instance_migration()
            .ok_or_else(|| value_mismatch(command))?;
        let process_instance_key = value.process_instance_key;
        tracing::Span::current().record("process_instance_key", process_instance_key);

        let state = ctx.state;
        let instance = require_non_null_process_instance(
            state.element_instance_state().get_instance(process_instance_key),
            process_instance_key,
        )?;
        require_authorized_tenant(
            &command.authorizations,
            &instance.value.tenant_id,
            process_instance_key,
        )?;
        require_null_parent(
            instance.value.parent_process_instance_key,
            process_instance_key,
        )?;
        let target = require_non_null_target_process_definition(
            state
                .process_state()
                .get_process_by_key(value.target_process_definition_key),
            value.target_process_definition_key,
            process_instance_key,
        )?;
        require_non_duplicate_source_element_ids(
            &value.mapping_instructions,
            process_instance_key,
        )?;

        let source_key = instance.value.process_definition_key;
        let source = state
            .process_state()
            .get_process_by_key(source_key)
            .ok_or(EngineError::MissingProcessDefinition { key: source_key })?;

        require_referred_elements_exist(
            source,
            target,
            &value.mapping_instructions,
            process_instance_key,
        )?;
        require_no_event_subprocess(source, target, process_instance_key)?;

        let mapping = ElementMapping::new(source, target, &value.mapping_instructions);
        let plan = plan_migration(state, instance, source, target, &mapping, process_instance_key)?;

        for (element, target_element_id) in &plan {
            let mut migrated = element.value.clone();
            migrated.process_definition_key = target.key();
            migrated.bpmn_process_id = target.bpmn_process_id().to_string();
            migrated.version = target.version();
            migrated.element_id = target_element_id.clone();
            ctx.writers.state.append_follow_up_event(
                element.key,
                ProcessInstanceIntent::ElementMigrated,
                migrated,
            );

            if let Some(job_key) = element.job_key {
                if let Some(mut job) = state.job_state().get_job(job_key) {
                    job.process_definition_key = target.key();
                    job.bpmn_process_id = target.bpmn_process_id().to_string();
                    job.process_definition_version = target.version();
                    job.element_id = target_element_id.clone();
                    ctx.writers
                        .state
                        .append_follow_up_event(job_key, JobIntent::Migrated, job);
                }
            }
        }

        ctx.writers.state.append_follow_up_event(
            process_instance_key,
            ProcessInstanceMigrationIntent::Migrated,
            value.clone(),
        );
        ctx.writers.response.write_event_on_command(
            process_instance_key,
            ProcessInstanceMigrationIntent::Migrated,
            value.clone(),
            command,
        );

        info!(
            elements = plan.len(),
            target_process_definition_key = target.key(),
            "Process instance migrated"
        );
        Ok(())
    }
}

/// Validates every active element instance, visiting the tree depth-first
/// from the root with children in key order, and returns the elements with
/// their target element ids.
fn plan_migration(
    state: &dyn ProcessingState,
    root: ElementInstance,
    source: &DeployedProcess,
    target: &DeployedProcess,
    mapping: &ElementMapping<'_>,
    process_instance_key: meridian_protocol::Key,
) -> Result<Vec<(ElementInstance, String)>, ProcessingError> {
    let elements = state.element_instance_state();
    let mut plan = Vec::new();
    let mut stack = vec![root];

    while let Some(element) = stack.pop() {
        let element_id = element.value.element_id.as_str();

        require_supported_element_type(&element, process_instance_key)?;
        let target_element_id = require_non_null_target_element_id(
            mapping.target_of(element_id),
            process_instance_key,
            element_id,
        )?;
        require_no_incident(state.incident_state(), &element, process_instance_key)?;
        require_same_element_type(target, target_element_id, &element, process_instance_key)?;
        let source_flow_scope = match element.value.flow_scope_key {
            Some(key) => Some(
                elements
                    .get_instance(key)
                    .ok_or(EngineError::MissingElementInstance { key })?,
            ),
            None => None,
        };
        require_unchanged_flow_scope(
            source_flow_scope.as_ref(),
            &element,
            target,
            target_element_id,
            mapping,
            process_instance_key,
        )?;
        require_no_boundary_events_in_source(source, &element, process_instance_key)?;
        require_no_boundary_events_in_target(
            target,
            target_element_id,
            &element,
            process_instance_key,
        )?;
        require_no_concurrent_command(
            state.event_scope_instance_state(),
            &element,
            process_instance_key,
        )?;

        let target_element_id = target_element_id.to_string();
        let mut children = elements.get_children(element.key);
        children.reverse();
        stack.extend(children);
        plan.push((element, target_element_id));
    }

    Ok(plan)
}
