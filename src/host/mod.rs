// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The editor host as an injected capability.
//!
//! Proteus never subclasses or reaches into the host's graph and compiler
//! types; it talks to them through [`EditorHost`]. The service guarantees all
//! trait calls happen on its single mutation worker, so implementations may
//! assume single-threaded access (a real editor bridge would forward to its
//! main thread from there).

mod demo;

pub use demo::{demo_catalog, DemoCompileQueue, DemoHost};

use crate::model::{ArtifactRef, Diagnostic, NodeKind, SessionId, StageHandle, WorkingGraph};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("host rejected the staged graph: {0}")]
    StageRejected(String),
    #[error("host could not start the compile: {0}")]
    CompileRejected(String),
    #[error("host is unavailable: {0}")]
    Unavailable(String),
}

/// Terminal result of one host compile run.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileOutcome {
    Succeeded(ArtifactRef),
    Failed(Vec<Diagnostic>),
}

/// Invoked exactly once when a dispatched compile settles. May fire from any
/// thread the host pleases; the service routes it back onto its worker.
pub type CompileCallback = Box<dyn FnOnce(CompileOutcome) + Send + 'static>;

pub trait EditorHost: Send {
    /// One-shot catalog snapshot taken at service startup.
    fn enumerate_kinds(&self) -> Vec<NodeKind>;

    /// Materializes a working graph into the host's editable representation.
    /// All-or-nothing: on error the host must leave no partial copy behind.
    fn stage_graph(
        &mut self,
        session_id: &SessionId,
        graph: &WorkingGraph,
    ) -> Result<StageHandle, HostError>;

    /// Releases a staged copy. Must tolerate handles whose compile is still
    /// in flight (the pending result is then detached) and unknown handles.
    fn discard_stage(&mut self, stage: StageHandle);

    /// Starts an incremental compile of a staged copy. The callback fires
    /// when the host settles the run; it must not fire when this returns Err.
    fn compile(&mut self, stage: StageHandle, done: CompileCallback) -> Result<(), HostError>;

    /// Whether staging validation must prove every exec-carrying node
    /// reachable from an entry node. Hosts with lazy graph pruning turn this
    /// off.
    fn requires_entry_reachability(&self) -> bool {
        true
    }
}
