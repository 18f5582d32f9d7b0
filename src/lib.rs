// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Proteus: remote node-graph authoring and compile orchestration for
//! visual-scripting editor hosts.
//!
//! External peers (TCP clients or in-process scripts) send structured
//! commands; Proteus materializes them as validated working graphs and
//! drives the host's incremental compiler through an injected capability
//! interface. The host's own graph storage and code generation stay on the
//! host side of [`host::EditorHost`].

pub mod compile;
pub mod host;
pub mod model;
pub mod net;
pub mod ops;
pub mod protocol;
pub mod registry;
pub mod script;
pub mod service;
