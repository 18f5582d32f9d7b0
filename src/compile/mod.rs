// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Compile orchestration: consistency validation, staging into the host, and
//! the session state machine around the host's asynchronous compiler.
//!
//! The functions here are only ever called from the service worker, so they
//! take the host by `&mut` and never worry about reentrancy. Staging is
//! all-or-nothing: a failed stage leaves no copy behind on the host side.

use std::collections::BTreeSet;

use crate::host::{CompileCallback, CompileOutcome, EditorHost, HostError};
use crate::model::{
    CompileSession, CompileState, Diagnostic, InstanceId, LinkEnd, StageHandle, WorkingGraph,
};
use crate::registry::SchemaRegistry;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StageError {
    #[error("graph failed validation with {} issue(s)", .0.len())]
    Validation(Vec<Diagnostic>),
    #[error("a compile is in progress; wait for it to settle")]
    CompileInProgress,
    #[error(transparent)]
    Host(HostError),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileBeginError {
    #[error("a compile is in progress; wait for it to settle")]
    CompileInProgress,
    #[error("session is {state}; stage the graph before compiling")]
    NotStaged { state: &'static str },
    #[error(transparent)]
    Host(HostError),
}

/// Consistency checks run before anything is materialized into the host.
/// Returns one diagnostic per violation; an empty list means stageable.
pub fn validate(
    graph: &WorkingGraph,
    registry: &SchemaRegistry,
    require_entry_reachability: bool,
) -> Vec<Diagnostic> {
    let mut issues = Vec::new();

    if graph.nodes().is_empty() {
        issues.push(Diagnostic::error("graph has no nodes"));
        return issues;
    }

    for (&instance_id, node) in graph.nodes() {
        let Some(kind) = registry.lookup(node.kind_id()) else {
            issues.push(
                Diagnostic::error(format!("kind '{}' is not in the catalog", node.kind_id()))
                    .with_node(instance_id),
            );
            continue;
        };

        for (index, pin) in kind.inputs().iter().enumerate() {
            if !pin.is_required() {
                continue;
            }
            let bound = node.literal(pin.name()).is_some()
                || graph.link_into(LinkEnd::new(instance_id, index as u32)).is_some();
            if !bound {
                issues.push(
                    Diagnostic::error(format!(
                        "required input '{}' of {} ({}) is unbound",
                        pin.name(),
                        instance_id,
                        kind.label()
                    ))
                    .with_node(instance_id)
                    .with_pin(pin.name()),
                );
            }
        }
    }

    if require_entry_reachability {
        issues.extend(entry_reachability_issues(graph, registry));
    }

    issues
}

/// Every node that takes part in control flow must be reachable from an
/// entry node (a kind with exec outputs and no exec inputs). Pure data nodes
/// are exempt; the host compiler pulls them in on demand.
fn entry_reachability_issues(
    graph: &WorkingGraph,
    registry: &SchemaRegistry,
) -> Vec<Diagnostic> {
    let mut reached: BTreeSet<InstanceId> = BTreeSet::new();
    let mut frontier: Vec<InstanceId> = Vec::new();

    for (&instance_id, node) in graph.nodes() {
        let is_entry = registry
            .lookup(node.kind_id())
            .map(|kind| kind.is_exec_entry())
            .unwrap_or(false);
        if is_entry {
            reached.insert(instance_id);
            frontier.push(instance_id);
        }
    }

    while let Some(current) = frontier.pop() {
        for link in graph.links().iter().filter(|link| link.is_exec()) {
            if link.src().instance_id() == current && reached.insert(link.dst().instance_id()) {
                frontier.push(link.dst().instance_id());
            }
        }
    }

    let mut issues = Vec::new();
    for (&instance_id, node) in graph.nodes() {
        let has_exec = registry
            .lookup(node.kind_id())
            .map(|kind| kind.has_exec_pins())
            .unwrap_or(false);
        if has_exec && !reached.contains(&instance_id) {
            issues.push(
                Diagnostic::error(format!(
                    "node {instance_id} ({}) is not reachable from any entry node",
                    node.kind_id()
                ))
                .with_node(instance_id),
            );
        }
    }
    issues
}

/// `Idle`/`Staged`/terminal -> `Staged`. Validates, releases any previous
/// staged copy, then materializes the graph into the host.
pub fn stage_session(
    session: &mut CompileSession,
    registry: &SchemaRegistry,
    host: &mut dyn EditorHost,
) -> Result<StageHandle, StageError> {
    if session.state().is_compiling() {
        return Err(StageError::CompileInProgress);
    }

    let issues = validate(session.graph(), registry, host.requires_entry_reachability());
    if !issues.is_empty() {
        return Err(StageError::Validation(issues));
    }

    if let Some(previous) = session.state().stage() {
        host.discard_stage(previous);
        session.set_state(CompileState::Idle);
    }

    let stage = host
        .stage_graph(session.session_id(), session.graph())
        .map_err(StageError::Host)?;
    session.set_state(CompileState::Staged { stage });
    session.graph_mut().clear_dirty();
    tracing::debug!(session = %session.session_id(), %stage, "graph staged");
    Ok(stage)
}

/// `Staged`/`Failed` -> `Compiling`. The callback fires when the host
/// settles; the service routes it back to [`resolve_compile`].
pub fn begin_compile(
    session: &mut CompileSession,
    host: &mut dyn EditorHost,
    done: CompileCallback,
) -> Result<StageHandle, CompileBeginError> {
    let stage = match session.state() {
        CompileState::Compiling { .. } => return Err(CompileBeginError::CompileInProgress),
        CompileState::Staged { stage } => *stage,
        // A failed compile leaves the staged copy valid; retrying without
        // re-staging is allowed.
        CompileState::Failed { stage, .. } => *stage,
        state @ (CompileState::Idle | CompileState::Succeeded { .. }) => {
            return Err(CompileBeginError::NotStaged { state: state.label() })
        }
    };

    host.compile(stage, done).map_err(CompileBeginError::Host)?;
    session.set_state(CompileState::Compiling { stage });
    tracing::debug!(session = %session.session_id(), %stage, "compile dispatched");
    Ok(stage)
}

/// Applies a settled host outcome. Returns false when the session is no
/// longer `Compiling` (a late or stale callback), in which case the outcome
/// is discarded.
pub fn resolve_compile(
    session: &mut CompileSession,
    host: &mut dyn EditorHost,
    outcome: CompileOutcome,
) -> bool {
    let CompileState::Compiling { stage } = *session.state() else {
        tracing::debug!(session = %session.session_id(), "late compile outcome discarded");
        return false;
    };

    match outcome {
        CompileOutcome::Succeeded(artifact) => {
            // The artifact is independent of the staged copy; release it.
            host.discard_stage(stage);
            tracing::info!(session = %session.session_id(), %artifact, "compile succeeded");
            session.set_state(CompileState::Succeeded { artifact });
        }
        CompileOutcome::Failed(diagnostics) => {
            tracing::info!(
                session = %session.session_id(),
                issues = diagnostics.len(),
                "compile failed"
            );
            session.set_state(CompileState::Failed { stage, diagnostics });
        }
    }
    true
}

/// Called after a successful graph mutation: stale staged copies are never
/// reused, so every non-idle state collapses back to `Idle`. Must not be
/// called while `Compiling` (mutations are rejected there instead).
pub fn invalidate_after_mutation(session: &mut CompileSession, host: &mut dyn EditorHost) {
    debug_assert!(!session.state().is_compiling());
    if let Some(stage) = session.state().stage() {
        host.discard_stage(stage);
    }
    if !matches!(session.state(), CompileState::Idle) {
        tracing::debug!(
            session = %session.session_id(),
            was = session.state().label(),
            "stage invalidated by mutation"
        );
        session.set_state(CompileState::Idle);
    }
}

/// Session teardown: releases the staged copy, including one whose compile is
/// still in flight (the pending result is detached and later discarded).
pub fn release(session: &mut CompileSession, host: &mut dyn EditorHost) {
    if let Some(stage) = session.state().stage() {
        host.discard_stage(stage);
    }
    session.set_state(CompileState::Idle);
}

#[cfg(test)]
mod tests;
