// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Built-in host used by `--demo` mode and the test suite.
//!
//! Stages are bookkept in-memory and compiles settle immediately unless the
//! host was built in deferred mode, in which case the paired
//! [`DemoCompileQueue`] decides when and how each compile resolves. Deferred
//! mode is how tests hold a session in `Compiling`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::{CompileCallback, CompileOutcome, EditorHost, HostError};
use crate::model::{
    ArtifactRef, DataType, Diagnostic, KindId, NodeKind, PinSpec, SessionId, StageHandle, Value,
    WorkingGraph,
};

/// The fixed demo catalog: one entry event, one branch, a little arithmetic,
/// string formatting, and a print sink.
pub fn demo_catalog() -> Vec<NodeKind> {
    fn kind(id: &str) -> KindId {
        // Catalog ids are literals; a malformed one is a programmer error.
        KindId::new(id).unwrap_or_else(|err| panic!("demo kind id '{id}': {err}"))
    }

    vec![
        NodeKind::new(
            kind("event.start"),
            "On Start",
            [],
            [PinSpec::new("then", DataType::Exec)],
        ),
        NodeKind::new(
            kind("flow.branch"),
            "Branch",
            [
                PinSpec::new("run", DataType::Exec),
                PinSpec::new("condition", DataType::Bool),
            ],
            [
                PinSpec::new("when_true", DataType::Exec),
                PinSpec::new("when_false", DataType::Exec),
            ],
        ),
        NodeKind::new(
            kind("math.add"),
            "Add",
            [
                PinSpec::new("a", DataType::Float),
                PinSpec::with_default("b", DataType::Float, Value::Float(0.0)),
            ],
            [PinSpec::new("sum", DataType::Float)],
        ),
        NodeKind::new(
            kind("math.compare"),
            "Compare",
            [
                PinSpec::new("a", DataType::Float),
                PinSpec::new("b", DataType::Float),
            ],
            [PinSpec::new("greater", DataType::Bool)],
        ),
        NodeKind::new(
            kind("string.format"),
            "Format",
            [
                PinSpec::new("template", DataType::Text),
                PinSpec::with_default("value", DataType::Float, Value::Float(0.0)),
            ],
            [PinSpec::new("text", DataType::Text)],
        ),
        NodeKind::new(
            kind("debug.print"),
            "Print",
            [
                PinSpec::new("run", DataType::Exec),
                PinSpec::with_default("message", DataType::Text, Value::Text(String::new())),
            ],
            [PinSpec::new("then", DataType::Exec)],
        ),
    ]
}

#[derive(Debug, Clone)]
struct StagedCopy {
    session_id: SessionId,
    nodes: usize,
    links: usize,
}

type PendingCompile = (StageHandle, CompileCallback);

/// Test-side handle for resolving compiles dispatched by a deferred
/// [`DemoHost`].
#[derive(Clone, Default)]
pub struct DemoCompileQueue {
    pending: Arc<Mutex<Vec<PendingCompile>>>,
}

impl DemoCompileQueue {
    pub fn pending(&self) -> usize {
        self.pending.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    /// Fires the oldest pending compile with the given outcome. Returns false
    /// when nothing was pending.
    pub fn resolve_next(&self, outcome: CompileOutcome) -> bool {
        let entry = match self.pending.lock() {
            Ok(mut queue) if !queue.is_empty() => Some(queue.remove(0)),
            _ => None,
        };
        match entry {
            Some((_, done)) => {
                done(outcome);
                true
            }
            None => false,
        }
    }
}

pub struct DemoHost {
    staged: BTreeMap<u64, StagedCopy>,
    next_stage: u64,
    scripted_failures: Vec<Vec<Diagnostic>>,
    deferred: Option<DemoCompileQueue>,
}

impl DemoHost {
    pub fn new() -> Self {
        Self {
            staged: BTreeMap::new(),
            next_stage: 1,
            scripted_failures: Vec::new(),
            deferred: None,
        }
    }

    /// Compiles dispatched by a deferred host park in the returned queue
    /// until the caller resolves them.
    pub fn deferred() -> (Self, DemoCompileQueue) {
        let queue = DemoCompileQueue::default();
        let mut host = Self::new();
        host.deferred = Some(queue.clone());
        (host, queue)
    }

    /// Queues diagnostics for the next immediate-mode compile to fail with.
    pub fn script_failure(&mut self, diagnostics: Vec<Diagnostic>) {
        self.scripted_failures.push(diagnostics);
    }

    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    fn artifact_for(&self, stage: StageHandle) -> ArtifactRef {
        let session = self
            .staged
            .get(&stage.raw())
            .map(|copy| copy.session_id.as_str().to_owned())
            .unwrap_or_else(|| "unknown".to_owned());
        ArtifactRef::new(format!("demo://{session}/{}", stage.raw()))
    }
}

impl Default for DemoHost {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorHost for DemoHost {
    fn enumerate_kinds(&self) -> Vec<NodeKind> {
        demo_catalog()
    }

    fn stage_graph(
        &mut self,
        session_id: &SessionId,
        graph: &WorkingGraph,
    ) -> Result<StageHandle, HostError> {
        if graph.nodes().is_empty() {
            return Err(HostError::StageRejected("graph has no nodes".to_owned()));
        }

        let stage = StageHandle::new(self.next_stage);
        self.next_stage += 1;
        let copy = StagedCopy {
            session_id: session_id.clone(),
            nodes: graph.nodes().len(),
            links: graph.links().len(),
        };
        tracing::debug!(
            session = %copy.session_id,
            %stage,
            nodes = copy.nodes,
            links = copy.links,
            "demo host staged graph"
        );
        self.staged.insert(stage.raw(), copy);
        Ok(stage)
    }

    fn discard_stage(&mut self, stage: StageHandle) {
        if self.staged.remove(&stage.raw()).is_some() {
            tracing::debug!(%stage, "demo host discarded stage");
        }
    }

    fn compile(&mut self, stage: StageHandle, done: CompileCallback) -> Result<(), HostError> {
        if !self.staged.contains_key(&stage.raw()) {
            return Err(HostError::CompileRejected(format!("{stage} is not staged")));
        }

        if let Some(queue) = &self.deferred {
            if let Ok(mut pending) = queue.pending.lock() {
                pending.push((stage, done));
                return Ok(());
            }
            return Err(HostError::Unavailable("compile queue poisoned".to_owned()));
        }

        let outcome = if self.scripted_failures.is_empty() {
            CompileOutcome::Succeeded(self.artifact_for(stage))
        } else {
            CompileOutcome::Failed(self.scripted_failures.remove(0))
        };
        done(outcome);
        Ok(())
    }
}
