// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Compile sessions and their state machine data.
//!
//! One [`CompileSession`] exists per remote peer context: it owns exactly one
//! working graph and at most one in-flight compile. The state transitions
//! themselves are driven by the `compile` module; this file only carries the
//! data.

use std::fmt;
use std::time::{Duration, Instant};

use smol_str::SmolStr;

use super::graph::WorkingGraph;
use super::ids::{InstanceId, SessionId};

/// Handle to a graph copy materialized inside the host editor.
/// Issued by the host on staging; opaque to everything but the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageHandle(u64);

impl StageHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage:{}", self.0)
    }
}

/// Opaque reference to a compiled artifact, returned verbatim to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef(String);

impl ArtifactRef {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Note => "note",
        }
    }
}

/// A compiler- or validator-reported message, optionally anchored to a node
/// and pin.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    severity: Severity,
    message: String,
    node: Option<InstanceId>,
    pin: Option<SmolStr>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            node: None,
            pin: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn with_node(mut self, node: InstanceId) -> Self {
        self.node = Some(node);
        self
    }

    pub fn with_pin(mut self, pin: impl AsRef<str>) -> Self {
        self.pin = Some(SmolStr::new(pin.as_ref()));
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn node(&self) -> Option<InstanceId> {
        self.node
    }

    pub fn pin(&self) -> Option<&str> {
        self.pin.as_deref()
    }
}

/// Where a session stands in the stage/compile lifecycle.
///
/// `Failed` keeps the stage handle: the staged copy is still valid on the
/// host side, so a caller may re-issue `compile` without re-staging. Any
/// mutation collapses every non-idle state back to `Idle` and releases the
/// staged copy.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileState {
    Idle,
    Staged {
        stage: StageHandle,
    },
    Compiling {
        stage: StageHandle,
    },
    Succeeded {
        artifact: ArtifactRef,
    },
    Failed {
        stage: StageHandle,
        diagnostics: Vec<Diagnostic>,
    },
}

impl CompileState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Staged { .. } => "staged",
            Self::Compiling { .. } => "compiling",
            Self::Succeeded { .. } => "succeeded",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_compiling(&self) -> bool {
        matches!(self, Self::Compiling { .. })
    }

    /// The staged host-side copy this state holds on to, if any.
    pub fn stage(&self) -> Option<StageHandle> {
        match self {
            Self::Staged { stage } | Self::Compiling { stage } | Self::Failed { stage, .. } => {
                Some(*stage)
            }
            Self::Idle | Self::Succeeded { .. } => None,
        }
    }
}

#[derive(Debug)]
pub struct CompileSession {
    session_id: SessionId,
    graph: WorkingGraph,
    state: CompileState,
    last_activity: Instant,
}

impl CompileSession {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            graph: WorkingGraph::new(),
            state: CompileState::Idle,
            last_activity: Instant::now(),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn graph(&self) -> &WorkingGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut WorkingGraph {
        &mut self.graph
    }

    pub fn state(&self) -> &CompileState {
        &self.state
    }

    pub fn set_state(&mut self, state: CompileState) {
        self.state = state;
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }
}
