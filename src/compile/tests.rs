// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::{Arc, Mutex};

use crate::host::{demo_catalog, CompileOutcome, DemoHost};
use crate::model::{
    CompileSession, CompileState, InstanceId, KindId, LinkEnd, SessionId, Value,
};
use crate::ops::{apply_op, GraphOp};
use crate::registry::SchemaRegistry;

use super::{
    begin_compile, invalidate_after_mutation, release, resolve_compile, stage_session, validate,
    CompileBeginError, StageError,
};

fn registry() -> SchemaRegistry {
    SchemaRegistry::from_catalog(demo_catalog()).expect("demo catalog")
}

fn session() -> CompileSession {
    CompileSession::new(SessionId::new("s1").expect("session id"))
}

fn add_node(session: &mut CompileSession, registry: &SchemaRegistry, kind: &str, instance: u32) {
    apply_op(
        session.graph_mut(),
        registry,
        &GraphOp::AddNode {
            kind_id: KindId::new(kind).expect("kind id"),
            instance_id: InstanceId::new(instance),
        },
    )
    .expect("add node");
}

fn link(session: &mut CompileSession, registry: &SchemaRegistry, src: (u32, u32), dst: (u32, u32)) {
    apply_op(
        session.graph_mut(),
        registry,
        &GraphOp::AddLink {
            src: LinkEnd::new(InstanceId::new(src.0), src.1),
            dst: LinkEnd::new(InstanceId::new(dst.0), dst.1),
        },
    )
    .expect("add link");
}

/// Entry -> print chain with the print message defaulted; passes validation.
fn stageable_session(registry: &SchemaRegistry) -> CompileSession {
    let mut session = session();
    add_node(&mut session, registry, "event.start", 1);
    add_node(&mut session, registry, "debug.print", 2);
    link(&mut session, registry, (1, 0), (2, 0));
    session
}

fn discard_outcome() -> crate::host::CompileCallback {
    Box::new(|_| {})
}

fn capture_outcome() -> (crate::host::CompileCallback, Arc<Mutex<Option<CompileOutcome>>>) {
    let slot = Arc::new(Mutex::new(None));
    let sink = slot.clone();
    let callback: crate::host::CompileCallback = Box::new(move |outcome| {
        *sink.lock().expect("outcome slot") = Some(outcome);
    });
    (callback, slot)
}

#[test]
fn unbound_required_input_fails_validation_and_stays_idle() {
    let registry = registry();
    let mut host = DemoHost::new();
    let mut session = session();
    // flow.branch has a required bool condition that is never bound.
    add_node(&mut session, &registry, "event.start", 1);
    add_node(&mut session, &registry, "flow.branch", 2);
    link(&mut session, &registry, (1, 0), (2, 0));

    let result = stage_session(&mut session, &registry, &mut host);
    let Err(StageError::Validation(issues)) = result else {
        panic!("expected validation failure");
    };
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].pin(), Some("condition"));
    assert_eq!(session.state(), &CompileState::Idle);
    assert_eq!(host.staged_count(), 0, "no partial materialization");
}

#[test]
fn unreachable_exec_node_fails_validation() {
    let registry = registry();
    let mut session = session();
    add_node(&mut session, &registry, "event.start", 1);
    add_node(&mut session, &registry, "debug.print", 2);
    // No exec link from the entry, so the print node floats.

    let issues = validate(session.graph(), &registry, true);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].node(), Some(InstanceId::new(2)));

    // Hosts without the reachability requirement accept the same graph.
    assert!(validate(session.graph(), &registry, false).is_empty());
}

#[test]
fn pure_data_nodes_are_exempt_from_reachability() {
    let registry = registry();
    let mut session = stageable_session(&registry);
    add_node(&mut session, &registry, "math.add", 3);
    apply_op(
        session.graph_mut(),
        &registry,
        &GraphOp::SetLiteral {
            instance_id: InstanceId::new(3),
            pin_name: "a".to_owned(),
            value: Value::Float(1.0),
        },
    )
    .expect("literal");

    assert!(validate(session.graph(), &registry, true).is_empty());
}

#[test]
fn staging_clears_dirty_and_parks_the_copy_in_the_host() {
    let registry = registry();
    let mut host = DemoHost::new();
    let mut session = stageable_session(&registry);
    assert!(session.graph().is_dirty());

    let stage = stage_session(&mut session, &registry, &mut host).expect("stage");
    assert_eq!(session.state(), &CompileState::Staged { stage });
    assert!(!session.graph().is_dirty());
    assert_eq!(host.staged_count(), 1);
}

#[test]
fn restaging_releases_the_previous_copy() {
    let registry = registry();
    let mut host = DemoHost::new();
    let mut session = stageable_session(&registry);

    let first = stage_session(&mut session, &registry, &mut host).expect("stage");
    let second = stage_session(&mut session, &registry, &mut host).expect("restage");
    assert_ne!(first, second);
    assert_eq!(host.staged_count(), 1, "old copy must be discarded");
}

#[test]
fn compile_without_stage_is_a_state_error() {
    let registry = registry();
    let mut host = DemoHost::new();
    let mut session = stageable_session(&registry);

    let result = begin_compile(&mut session, &mut host, discard_outcome());
    assert_eq!(result, Err(CompileBeginError::NotStaged { state: "idle" }));
}

#[test]
fn successful_compile_records_the_artifact_and_releases_the_stage() {
    let registry = registry();
    let mut host = DemoHost::new();
    let mut session = stageable_session(&registry);
    stage_session(&mut session, &registry, &mut host).expect("stage");

    let (callback, slot) = capture_outcome();
    begin_compile(&mut session, &mut host, callback).expect("compile");
    assert!(session.state().is_compiling());

    let outcome = slot.lock().expect("outcome slot").clone().expect("settled");
    assert!(resolve_compile(&mut session, &mut host, outcome));

    let CompileState::Succeeded { artifact } = session.state() else {
        panic!("expected success");
    };
    assert!(artifact.as_str().starts_with("demo://s1/"));
    assert_eq!(host.staged_count(), 0);
}

#[test]
fn failed_compile_keeps_the_stage_for_retry() {
    let registry = registry();
    let mut host = DemoHost::new();
    host.script_failure(vec![crate::model::Diagnostic::error("type hole")]);
    let mut session = stageable_session(&registry);
    let stage = stage_session(&mut session, &registry, &mut host).expect("stage");

    let (callback, slot) = capture_outcome();
    begin_compile(&mut session, &mut host, callback).expect("compile");
    let outcome = slot.lock().expect("outcome slot").clone().expect("settled");
    assert!(resolve_compile(&mut session, &mut host, outcome));

    let CompileState::Failed { stage: kept, diagnostics } = session.state() else {
        panic!("expected failure");
    };
    assert_eq!(*kept, stage);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(host.staged_count(), 1);

    // Retry without re-staging succeeds.
    let (callback, slot) = capture_outcome();
    begin_compile(&mut session, &mut host, callback).expect("retry");
    let outcome = slot.lock().expect("outcome slot").clone().expect("settled");
    assert!(resolve_compile(&mut session, &mut host, outcome));
    assert!(matches!(session.state(), CompileState::Succeeded { .. }));
}

#[test]
fn staging_while_compiling_is_rejected() {
    let registry = registry();
    let (mut host, _queue) = DemoHost::deferred();
    let mut session = stageable_session(&registry);
    stage_session(&mut session, &registry, &mut host).expect("stage");
    begin_compile(&mut session, &mut host, discard_outcome()).expect("compile");

    let result = stage_session(&mut session, &registry, &mut host);
    assert_eq!(result, Err(StageError::CompileInProgress));
    let result = begin_compile(&mut session, &mut host, discard_outcome());
    assert_eq!(result, Err(CompileBeginError::CompileInProgress));
}

#[test]
fn mutation_invalidates_staged_and_terminal_states() {
    let registry = registry();
    let mut host = DemoHost::new();
    let mut session = stageable_session(&registry);
    stage_session(&mut session, &registry, &mut host).expect("stage");

    add_node(&mut session, &registry, "math.add", 7);
    invalidate_after_mutation(&mut session, &mut host);
    assert_eq!(session.state(), &CompileState::Idle);
    assert_eq!(host.staged_count(), 0);

    // A compile now has nothing staged to work with.
    let result = begin_compile(&mut session, &mut host, discard_outcome());
    assert_eq!(result, Err(CompileBeginError::NotStaged { state: "idle" }));
}

#[test]
fn late_outcome_after_release_is_discarded() {
    let registry = registry();
    let (mut host, queue) = DemoHost::deferred();
    let mut session = stageable_session(&registry);
    stage_session(&mut session, &registry, &mut host).expect("stage");
    begin_compile(&mut session, &mut host, discard_outcome()).expect("compile");

    release(&mut session, &mut host);
    assert_eq!(session.state(), &CompileState::Idle);
    assert_eq!(host.staged_count(), 0);

    // The host finishes later; applying the outcome must be a no-op.
    assert!(queue.resolve_next(CompileOutcome::Failed(Vec::new())));
    assert!(!resolve_compile(
        &mut session,
        &mut host,
        CompileOutcome::Failed(Vec::new())
    ));
    assert_eq!(session.state(), &CompileState::Idle);
}
