// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Process instance migration through a partition.

mod common;

use common::TestContext;
use meridian_engine::ProcessedCommand;
use meridian_engine::state::{ElementInstanceState, JobState};
use meridian_model::{BpmnElementType, BpmnEventType, DeployedProcess, ExecutableElement};
use meridian_protocol::{
    Authorizations, Intent, JobIntent, Key, MappingInstruction, ProcessInstanceIntent,
    ProcessInstanceMigrationIntent, ProcessInstanceRecord, RejectionType,
};

const PROCESS_ID: &str = "order-process";

fn deploy(ctx: &mut TestContext, process: DeployedProcess) -> DeployedProcess {
    ctx.deploy(&process);
    process
}

/// Version 1: a single service task at the root.
fn source_process(ctx: &mut TestContext) -> DeployedProcess {
    let key = ctx.partition.next_key();
    let process = DeployedProcess::builder(PROCESS_ID)
        .key(key)
        .version(1)
        .name("Order")
        .service_task("charge", PROCESS_ID)
        .service_task("ship", PROCESS_ID)
        .build()
        .expect("valid process");
    deploy(ctx, process)
}

/// Version 2: the service task was renamed.
fn target_process(ctx: &mut TestContext) -> DeployedProcess {
    let key = ctx.partition.next_key();
    let process = DeployedProcess::builder(PROCESS_ID)
        .key(key)
        .version(2)
        .name("Order")
        .service_task("charge-card", PROCESS_ID)
        .service_task("ship", PROCESS_ID)
        .build()
        .expect("valid process");
    deploy(ctx, process)
}

fn rejection_of(processed: &ProcessedCommand) -> (RejectionType, String) {
    let rejection = processed.rejection.clone().expect("migration rejected");
    (rejection.rejection_type, rejection.reason)
}

fn expect_invalid_state(processed: &ProcessedCommand, reason: String) {
    assert_eq!(rejection_of(processed), (RejectionType::InvalidState, reason));
}

// ============================================================================
// Successful migration
// ============================================================================

#[test]
fn test_migrates_instance_and_job() {
    let mut ctx = TestContext::new();
    let source = source_process(&mut ctx);
    let target = target_process(&mut ctx);
    let pik = ctx.start_instance(&source);
    let task = ctx.activate_element(&source, pik, pik, "charge");
    let job = ctx.create_job(&source, pik, task, "charge");

    let processed = ctx.migrate(
        pik,
        target.key(),
        vec![MappingInstruction::new("charge", "charge-card")],
    );

    assert!(!processed.is_rejected(), "{:?}", processed.rejection);
    let migrated: Vec<Key> = processed
        .events_with(ProcessInstanceIntent::ElementMigrated)
        .iter()
        .map(|r| r.key)
        .collect();
    assert_eq!(migrated, vec![pik, task], "root first, then children");
    assert_eq!(processed.events_with(JobIntent::Migrated).len(), 1);

    let done = processed.events_with(ProcessInstanceMigrationIntent::Migrated);
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].key, pik);
    let response = processed.response.as_ref().expect("response");
    assert_eq!(response.intent, Intent::from(ProcessInstanceMigrationIntent::Migrated));

    let state = ctx.partition.state();
    let root = state.get_instance(pik).expect("root");
    assert_eq!(root.value.process_definition_key, target.key());
    assert_eq!(root.value.version, 2);
    assert_eq!(root.value.element_id, PROCESS_ID);
    let task = state.get_instance(task).expect("task");
    assert_eq!(task.value.element_id, "charge-card");
    assert_eq!(task.job_key, Some(job));
    let job = state.get_job(job).expect("job");
    assert_eq!(job.element_id, "charge-card");
    assert_eq!(job.process_definition_key, target.key());
    assert_eq!(job.process_definition_version, 2);
}

#[test]
fn test_same_process_id_with_new_name_keeps_flow_scope() {
    let mut ctx = TestContext::new();
    let source = source_process(&mut ctx);
    let key = ctx.partition.next_key();
    let renamed = deploy(
        &mut ctx,
        DeployedProcess::builder(PROCESS_ID)
            .key(key)
            .version(2)
            .name("Order fulfilment")
            .service_task("charge", PROCESS_ID)
            .build()
            .expect("valid process"),
    );
    let pik = ctx.start_instance(&source);
    ctx.activate_element(&source, pik, pik, "charge");

    let processed = ctx.migrate(pik, renamed.key(), vec![MappingInstruction::new("charge", "charge")]);

    assert!(!processed.is_rejected(), "{:?}", processed.rejection);
}

// ============================================================================
// Instance level checks
// ============================================================================

#[test]
fn test_unknown_instance_and_foreign_tenant_look_alike() {
    let mut ctx = TestContext::new();
    let source = source_process(&mut ctx);
    let target = target_process(&mut ctx);
    let pik = ctx.start_instance(&source);

    let missing = ctx.migrate(pik + 1000, target.key(), vec![]);
    assert_eq!(
        rejection_of(&missing),
        (
            RejectionType::NotFound,
            format!(
                "Expected to migrate process instance but no process instance found with key '{}'",
                pik + 1000
            )
        )
    );

    let foreign = ctx.migrate_as(pik, target.key(), vec![], Authorizations::tenants(["acme"]));
    assert_eq!(
        rejection_of(&foreign),
        (
            RejectionType::NotFound,
            format!(
                "Expected to migrate process instance but no process instance found with key '{pik}'"
            )
        )
    );
}

#[test]
fn test_child_instance_is_rejected() {
    let mut ctx = TestContext::new();
    let source = source_process(&mut ctx);
    let target = target_process(&mut ctx);
    let pik = ctx.partition.next_key();
    ctx.activate(
        pik,
        ProcessInstanceRecord {
            bpmn_process_id: PROCESS_ID.to_string(),
            version: 1,
            process_definition_key: source.key(),
            process_instance_key: pik,
            element_id: PROCESS_ID.to_string(),
            flow_scope_key: None,
            bpmn_element_type: BpmnElementType::Process,
            parent_process_instance_key: Some(7),
            parent_element_instance_key: Some(8),
            tenant_id: source.tenant_id().to_string(),
        },
    );

    let processed = ctx.migrate(pik, target.key(), vec![]);

    expect_invalid_state(
        &processed,
        format!(
            "Expected to migrate process instance '{pik}' but process instance is a child process instance. Child process instances cannot be migrated."
        ),
    );
}

#[test]
fn test_unknown_target_definition_is_rejected() {
    let mut ctx = TestContext::new();
    let source = source_process(&mut ctx);
    let pik = ctx.start_instance(&source);

    let processed = ctx.migrate(pik, 404, vec![]);

    assert_eq!(
        rejection_of(&processed),
        (
            RejectionType::NotFound,
            format!(
                "Expected to migrate process instance '{pik}' to process definition with key '404' but no process definition found with this key"
            )
        )
    );
}

#[test]
fn test_duplicate_source_ids_are_rejected_before_element_checks() {
    let mut ctx = TestContext::new();
    let source = source_process(&mut ctx);
    let target = target_process(&mut ctx);
    let pik = ctx.start_instance(&source);
    let task = ctx.activate_element(&source, pik, pik, "charge");
    // Would fail the per-element incident check.
    ctx.raise_incident(pik, task, "charge", None);

    let processed = ctx.migrate(
        pik,
        target.key(),
        vec![
            MappingInstruction::new("charge", "charge-card"),
            MappingInstruction::new("charge", "ship"),
            MappingInstruction::new("ship", "ship"),
        ],
    );

    assert_eq!(
        rejection_of(&processed),
        (
            RejectionType::InvalidArgument,
            format!(
                "Expected to migrate process instance '{pik}' but the mapping instructions contain duplicate source element ids '[charge]'."
            )
        )
    );
}

#[test]
fn test_mapping_to_unknown_target_element_is_rejected() {
    let mut ctx = TestContext::new();
    let source = source_process(&mut ctx);
    let target = target_process(&mut ctx);
    let pik = ctx.start_instance(&source);

    let processed = ctx.migrate(pik, target.key(), vec![MappingInstruction::new("charge", "refund")]);

    assert_eq!(
        rejection_of(&processed),
        (
            RejectionType::InvalidArgument,
            format!(
                "Expected to migrate process instance '{pik}' but mapping instructions contain a non-existing target element id 'refund'. Elements provided in mapping instructions must exist in the target process definition."
            )
        )
    );
}

#[test]
fn test_target_with_event_subprocess_is_rejected() {
    let mut ctx = TestContext::new();
    let source = source_process(&mut ctx);
    let key = ctx.partition.next_key();
    let target = deploy(
        &mut ctx,
        DeployedProcess::builder(PROCESS_ID)
            .key(key)
            .version(2)
            .service_task("charge", PROCESS_ID)
            .event_sub_process("cancellation", PROCESS_ID)
            .build()
            .expect("valid process"),
    );
    let pik = ctx.start_instance(&source);

    let processed = ctx.migrate(pik, target.key(), vec![]);

    expect_invalid_state(
        &processed,
        format!(
            "Expected to migrate process instance '{pik}' but target process with id '{PROCESS_ID}' has an event subprocess. Target processes with event subprocesses cannot be migrated yet."
        ),
    );
}

// ============================================================================
// Element level checks
// ============================================================================

#[test]
fn test_active_gateway_is_not_migratable() {
    let mut ctx = TestContext::new();
    let key = ctx.partition.next_key();
    let source = deploy(
        &mut ctx,
        DeployedProcess::builder(PROCESS_ID)
            .key(key)
            .version(1)
            .element(
                ExecutableElement::new("route", BpmnElementType::ExclusiveGateway)
                    .in_scope(PROCESS_ID),
            )
            .build()
            .expect("valid process"),
    );
    let key = ctx.partition.next_key();
    let target = deploy(
        &mut ctx,
        DeployedProcess::builder(PROCESS_ID)
            .key(key)
            .version(2)
            .element(
                ExecutableElement::new("route", BpmnElementType::ExclusiveGateway)
                    .in_scope(PROCESS_ID),
            )
            .build()
            .expect("valid process"),
    );
    let pik = ctx.start_instance(&source);
    ctx.activate_element(&source, pik, pik, "route");

    let processed = ctx.migrate(pik, target.key(), vec![MappingInstruction::new("route", "route")]);

    expect_invalid_state(
        &processed,
        format!(
            "Expected to migrate process instance '{pik}' but active element with id 'route' has an unsupported type. The migration of a EXCLUSIVE_GATEWAY is not supported."
        ),
    );
}

#[test]
fn test_unmapped_active_element_is_rejected() {
    let mut ctx = TestContext::new();
    let source = source_process(&mut ctx);
    let target = target_process(&mut ctx);
    let pik = ctx.start_instance(&source);
    ctx.activate_element(&source, pik, pik, "charge");

    let processed = ctx.migrate(pik, target.key(), vec![]);

    expect_invalid_state(
        &processed,
        format!(
            "Expected to migrate process instance '{pik}' but no mapping instruction defined for active element with id 'charge'. Elements cannot be migrated without a mapping."
        ),
    );
}

#[test]
fn test_migration_is_all_or_nothing() {
    let mut ctx = TestContext::new();
    let source = source_process(&mut ctx);
    let target = target_process(&mut ctx);
    let pik = ctx.start_instance(&source);
    let charge = ctx.activate_element(&source, pik, pik, "charge");
    ctx.create_job(&source, pik, charge, "charge");
    let ship = ctx.activate_element(&source, pik, pik, "ship");
    let ship_job = ctx.create_job(&source, pik, ship, "ship");
    ctx.raise_incident(pik, ship, "ship", Some(ship_job));
    let before = ctx.state_snapshot();

    let processed = ctx.migrate(
        pik,
        target.key(),
        vec![
            MappingInstruction::new("charge", "charge-card"),
            MappingInstruction::new("ship", "ship"),
        ],
    );

    expect_invalid_state(
        &processed,
        format!(
            "Expected to migrate process instance '{pik}' but active element with id 'ship' has an incident. Elements cannot be migrated with an incident yet. Please retry migration after resolving the incident."
        ),
    );
    assert!(processed.records.iter().all(|r| !r.is_event()));
    assert_eq!(ctx.state_snapshot(), before);
}

#[test]
fn test_element_type_change_is_rejected() {
    let mut ctx = TestContext::new();
    let source = source_process(&mut ctx);
    let key = ctx.partition.next_key();
    let target = deploy(
        &mut ctx,
        DeployedProcess::builder(PROCESS_ID)
            .key(key)
            .version(2)
            .element(ExecutableElement::new("charge", BpmnElementType::UserTask).in_scope(PROCESS_ID))
            .build()
            .expect("valid process"),
    );
    let pik = ctx.start_instance(&source);
    ctx.activate_element(&source, pik, pik, "charge");

    let processed = ctx.migrate(pik, target.key(), vec![MappingInstruction::new("charge", "charge")]);

    expect_invalid_state(
        &processed,
        format!(
            "Expected to migrate process instance '{pik}' but active element with id 'charge' and type 'SERVICE_TASK' is mapped to an element with id 'charge' and different type 'USER_TASK'. Elements must be mapped to elements of the same type."
        ),
    );
}

#[test]
fn test_changed_process_id_moves_flow_scope() {
    let mut ctx = TestContext::new();
    let source = source_process(&mut ctx);
    let key = ctx.partition.next_key();
    let target = deploy(
        &mut ctx,
        DeployedProcess::builder("order-process-v2")
            .key(key)
            .version(1)
            .name("Order")
            .service_task("charge", "order-process-v2")
            .build()
            .expect("valid process"),
    );
    let pik = ctx.start_instance(&source);
    ctx.activate_element(&source, pik, pik, "charge");

    let processed = ctx.migrate(pik, target.key(), vec![MappingInstruction::new("charge", "charge")]);

    expect_invalid_state(
        &processed,
        format!(
            "Expected to migrate process instance '{pik}' but the flow scope of active element with id 'charge' is changed. The flow scope of the active element is expected to be '{PROCESS_ID}' but was 'order-process-v2'. The flow scope of an element cannot be changed during migration yet."
        ),
    );
}

#[test]
fn test_boundary_events_block_migration() {
    let mut ctx = TestContext::new();
    let key = ctx.partition.next_key();
    let source = deploy(
        &mut ctx,
        DeployedProcess::builder(PROCESS_ID)
            .key(key)
            .version(1)
            .service_task("charge", PROCESS_ID)
            .boundary_event("charge-timeout", "charge", BpmnEventType::Timer)
            .boundary_event("charge-failed", "charge", BpmnEventType::Error)
            .boundary_event("charge-retry", "charge", BpmnEventType::Timer)
            .build()
            .expect("valid process"),
    );
    let target = target_process(&mut ctx);
    let pik = ctx.start_instance(&source);
    ctx.activate_element(&source, pik, pik, "charge");

    let processed = ctx.migrate(
        pik,
        target.key(),
        vec![MappingInstruction::new("charge", "charge-card")],
    );

    expect_invalid_state(
        &processed,
        format!(
            "Expected to migrate process instance '{pik}' but active element with id 'charge' has one or more boundary events of types 'ERROR, TIMER'. Migrating active elements with boundary events is not possible yet."
        ),
    );
}

#[test]
fn test_boundary_events_on_target_block_migration() {
    let mut ctx = TestContext::new();
    let source = source_process(&mut ctx);
    let key = ctx.partition.next_key();
    let target = deploy(
        &mut ctx,
        DeployedProcess::builder(PROCESS_ID)
            .key(key)
            .version(2)
            .service_task("charge", PROCESS_ID)
            .boundary_event("charge-paid", "charge", BpmnEventType::Message)
            .build()
            .expect("valid process"),
    );
    let pik = ctx.start_instance(&source);
    ctx.activate_element(&source, pik, pik, "charge");

    let processed = ctx.migrate(pik, target.key(), vec![MappingInstruction::new("charge", "charge")]);

    expect_invalid_state(
        &processed,
        format!(
            "Expected to migrate process instance '{pik}' but active element with id 'charge' is mapped to element with id 'charge' that has one or more boundary events of types 'MESSAGE'. Migrating target elements with boundary events is not possible yet."
        ),
    );
}

#[test]
fn test_pending_sequence_flow_is_a_concurrent_command() {
    let mut ctx = TestContext::new();
    let source = source_process(&mut ctx);
    let target = target_process(&mut ctx);
    let pik = ctx.start_instance(&source);
    ctx.take_sequence_flow(pik, pik);

    let processed = ctx.migrate(pik, target.key(), vec![]);

    expect_invalid_state(
        &processed,
        format!(
            "Expected to migrate process instance '{pik}' but a concurrent command was executed on the process instance. The active element with id '{PROCESS_ID}' is not in a stable state. Please retry the migration."
        ),
    );
}

#[test]
fn test_pending_event_trigger_is_a_concurrent_command() {
    let mut ctx = TestContext::new();
    let source = source_process(&mut ctx);
    let target = target_process(&mut ctx);
    let pik = ctx.start_instance(&source);
    let task = ctx.activate_element(&source, pik, pik, "charge");
    ctx.trigger_event(&source, pik, task);

    let processed = ctx.migrate(
        pik,
        target.key(),
        vec![MappingInstruction::new("charge", "charge-card")],
    );

    expect_invalid_state(
        &processed,
        format!(
            "Expected to migrate process instance '{pik}' but a concurrent command was executed on the process instance. The active element with id 'charge' is not in a stable state. Please retry the migration."
        ),
    );
}
