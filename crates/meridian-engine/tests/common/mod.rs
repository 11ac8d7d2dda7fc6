// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for meridian-engine integration tests.
//!
//! Provides [`TestContext`], a partition with a controllable log clock and
//! helpers that write the external events (deployments, element lifecycle,
//! jobs, incidents) the processors read.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;

use meridian_engine::state::ElementInstanceState;
use meridian_engine::{ChannelCommandSender, Partition, ProcessedCommand, SubscriptionCommand};
use meridian_model::{BpmnElementType, DeployedProcess};
use meridian_protocol::{
    Authorizations, Command, IncidentIntent, IncidentRecord, JobIntent, JobRecord, Key,
    MappingInstruction, MessageIntent, MessageRecord, MessageSubscriptionIntent,
    MessageSubscriptionRecord, ProcessEventIntent, ProcessEventRecord, ProcessInstanceIntent,
    ProcessInstanceMigrationIntent, ProcessInstanceMigrationRecord, ProcessInstanceRecord,
    ProcessIntent, Variables,
};

pub const MESSAGE_TTL_MS: i64 = 60_000;

/// A partition plus the receiving end of its outgoing subscription commands.
pub struct TestContext {
    pub partition: Partition,
    pub outgoing: mpsc::UnboundedReceiver<SubscriptionCommand>,
    pub clock: DateTime<Utc>,
}

impl TestContext {
    pub fn new() -> Self {
        let (sender, outgoing) = ChannelCommandSender::channel();
        let partition = Partition::new(1, Arc::new(sender)).expect("partition");
        Self {
            partition,
            outgoing,
            clock: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).expect("timestamp"),
        }
    }

    pub fn advance(&mut self, ms: i64) {
        self.clock += Duration::milliseconds(ms);
    }

    pub fn process(&mut self, command: Command) -> ProcessedCommand {
        self.partition
            .process(command, self.clock)
            .expect("command processing must not fail")
    }

    pub fn drain_outgoing(&mut self) -> Vec<SubscriptionCommand> {
        let mut commands = Vec::new();
        while let Ok(command) = self.outgoing.try_recv() {
            commands.push(command);
        }
        commands
    }

    pub fn state_snapshot(&self) -> String {
        self.partition.state().to_json().expect("snapshot")
    }

    // ========================================================================
    // External events
    // ========================================================================

    pub fn deploy(&mut self, process: &DeployedProcess) {
        self.partition
            .write_event(process.key(), ProcessIntent::Created, process.clone(), self.clock)
            .expect("deploy");
    }

    /// Activates the root element of a new process instance.
    pub fn start_instance(&mut self, process: &DeployedProcess) -> Key {
        let key = self.partition.next_key();
        let record = ProcessInstanceRecord {
            bpmn_process_id: process.bpmn_process_id().to_string(),
            version: process.version(),
            process_definition_key: process.key(),
            process_instance_key: key,
            element_id: process.bpmn_process_id().to_string(),
            flow_scope_key: None,
            bpmn_element_type: BpmnElementType::Process,
            parent_process_instance_key: None,
            parent_element_instance_key: None,
            tenant_id: process.tenant_id().to_string(),
        };
        self.activate(key, record);
        key
    }

    /// Activates an element inside the flow scope `scope_key`.
    pub fn activate_element(
        &mut self,
        process: &DeployedProcess,
        process_instance_key: Key,
        scope_key: Key,
        element_id: &str,
    ) -> Key {
        let element_type = process
            .get_element_by_id(element_id)
            .map(|e| e.element_type)
            .expect("element exists in process");
        let key = self.partition.next_key();
        let record = ProcessInstanceRecord {
            bpmn_process_id: process.bpmn_process_id().to_string(),
            version: process.version(),
            process_definition_key: process.key(),
            process_instance_key,
            element_id: element_id.to_string(),
            flow_scope_key: Some(scope_key),
            bpmn_element_type: element_type,
            parent_process_instance_key: None,
            parent_element_instance_key: None,
            tenant_id: process.tenant_id().to_string(),
        };
        self.activate(key, record);
        key
    }

    pub fn activate(&mut self, key: Key, record: ProcessInstanceRecord) {
        self.partition
            .write_event(key, ProcessInstanceIntent::ElementActivating, record, self.clock)
            .expect("activate element");
    }

    pub fn take_sequence_flow(&mut self, process_instance_key: Key, scope_key: Key) {
        let key = self.partition.next_key();
        let record = self
            .partition
            .state()
            .get_instance(scope_key)
            .map(|scope| ProcessInstanceRecord {
                element_id: "flow".to_string(),
                flow_scope_key: Some(scope_key),
                bpmn_element_type: BpmnElementType::SequenceFlow,
                process_instance_key,
                ..scope.value
            })
            .expect("flow scope exists");
        self.partition
            .write_event(key, ProcessInstanceIntent::SequenceFlowTaken, record, self.clock)
            .expect("take sequence flow");
    }

    pub fn create_job(
        &mut self,
        process: &DeployedProcess,
        process_instance_key: Key,
        element_key: Key,
        element_id: &str,
    ) -> Key {
        let key = self.partition.next_key();
        let record = JobRecord {
            job_type: format!("{element_id}-worker"),
            element_id: element_id.to_string(),
            element_instance_key: element_key,
            process_instance_key,
            process_definition_key: process.key(),
            bpmn_process_id: process.bpmn_process_id().to_string(),
            process_definition_version: process.version(),
            tenant_id: process.tenant_id().to_string(),
        };
        self.partition
            .write_event(key, JobIntent::Created, record, self.clock)
            .expect("create job");
        key
    }

    pub fn raise_incident(
        &mut self,
        process_instance_key: Key,
        element_key: Key,
        element_id: &str,
        job_key: Option<Key>,
    ) -> Key {
        let key = self.partition.next_key();
        let record = IncidentRecord {
            error_type: "IO_MAPPING_ERROR".to_string(),
            error_message: "failed to evaluate expression".to_string(),
            element_instance_key: element_key,
            job_key,
            process_instance_key,
            element_id: element_id.to_string(),
        };
        self.partition
            .write_event(key, IncidentIntent::Created, record, self.clock)
            .expect("raise incident");
        key
    }

    pub fn trigger_event(
        &mut self,
        process: &DeployedProcess,
        process_instance_key: Key,
        scope_key: Key,
    ) {
        let key = self.partition.next_key();
        let record = ProcessEventRecord {
            scope_key,
            target_element_id: "boundary".to_string(),
            variables: Variables::new(),
            process_definition_key: process.key(),
            process_instance_key,
        };
        self.partition
            .write_event(key, ProcessEventIntent::Triggering, record, self.clock)
            .expect("trigger event");
    }

    // ========================================================================
    // Commands
    // ========================================================================

    pub fn publish(&mut self, message: MessageRecord) -> ProcessedCommand {
        self.process(Command::new(MessageIntent::Publish, message))
    }

    pub fn open_subscription(&mut self, subscription: MessageSubscriptionRecord) -> ProcessedCommand {
        self.process(Command::new(MessageSubscriptionIntent::Create, subscription))
    }

    /// Confirms a correlation from the process instance side.
    pub fn correlate_subscription(
        &mut self,
        subscription: &MessageSubscriptionRecord,
        message_key: Key,
    ) -> ProcessedCommand {
        let mut value = subscription.clone();
        value.message_key = Some(message_key);
        self.process(Command::new(MessageSubscriptionIntent::Correlate, value))
    }

    pub fn migrate(
        &mut self,
        process_instance_key: Key,
        target_process_definition_key: Key,
        mapping_instructions: Vec<MappingInstruction>,
    ) -> ProcessedCommand {
        self.migrate_as(
            process_instance_key,
            target_process_definition_key,
            mapping_instructions,
            Authorizations::default(),
        )
    }

    pub fn migrate_as(
        &mut self,
        process_instance_key: Key,
        target_process_definition_key: Key,
        mapping_instructions: Vec<MappingInstruction>,
        authorizations: Authorizations,
    ) -> ProcessedCommand {
        let value = ProcessInstanceMigrationRecord {
            process_instance_key,
            target_process_definition_key,
            mapping_instructions,
        };
        self.process(
            Command::new(ProcessInstanceMigrationIntent::Migrate, value)
                .with_request(1, 1)
                .with_authorizations(authorizations),
        )
    }
}

pub fn message(name: &str, correlation_key: &str) -> MessageRecord {
    MessageRecord::new(name, correlation_key).with_ttl(MESSAGE_TTL_MS)
}

/// Message key of the first `MESSAGE:PUBLISHED` event.
pub fn published_key(processed: &ProcessedCommand) -> Key {
    processed
        .events_with(MessageIntent::Published)
        .first()
        .map(|r| r.key)
        .expect("message published")
}
