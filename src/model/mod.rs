// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model: ids, values, kind descriptors, working graphs, sessions.

pub mod graph;
pub mod ids;
pub mod schema;
pub mod session;
pub mod value;

pub use graph::{Link, LinkEnd, NodeInstance, WorkingGraph};
pub use ids::{Id, IdError, InstanceId, KindId, SessionId, MAX_ID_LEN};
pub use schema::{NodeKind, PinList, PinSpec};
pub use session::{
    ArtifactRef, CompileSession, CompileState, Diagnostic, Severity, StageHandle,
};
pub use value::{DataType, Value};
