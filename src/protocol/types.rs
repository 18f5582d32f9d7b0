// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Wire-facing parameter and response types.
//!
//! These are deliberately separate from the model types: the wire speaks
//! plain strings and integers, the model speaks validated ids. `schemars`
//! derives feed `--print-protocol-schema` so clients can generate bindings.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::compile::{CompileBeginError, StageError};
use crate::model::{Diagnostic, NodeKind, PinSpec};
use crate::ops::GraphError;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AddNodeParams {
    pub kind: String,
    pub instance: u32,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RemoveNodeParams {
    pub instance: u32,
}

/// A node/pin pair; `pin` indexes outputs on the `src` side and inputs on the
/// `dst` side.
#[derive(Debug, Clone, Copy, Deserialize, JsonSchema)]
pub struct EndpointParams {
    pub node: u32,
    pub pin: u32,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AddLinkParams {
    pub src: EndpointParams,
    pub dst: EndpointParams,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RemoveLinkParams {
    pub dst: EndpointParams,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SetLiteralParams {
    pub instance: u32,
    pub pin: String,
    /// Bare JSON scalar; objects, arrays and null are rejected.
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ClearLiteralParams {
    pub instance: u32,
    pub pin: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct WireDiagnostic {
    pub severity: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
}

impl From<&Diagnostic> for WireDiagnostic {
    fn from(diagnostic: &Diagnostic) -> Self {
        Self {
            severity: diagnostic.severity().label().to_owned(),
            message: diagnostic.message().to_owned(),
            node: diagnostic.node().map(|instance| instance.raw()),
            pin: diagnostic.pin().map(ToOwned::to_owned),
        }
    }
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct WirePin {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    pub required: bool,
}

impl From<&PinSpec> for WirePin {
    fn from(pin: &PinSpec) -> Self {
        Self {
            name: pin.name().to_owned(),
            data_type: pin.data_type().label().to_owned(),
            default: pin.default().and_then(|value| serde_json::to_value(value).ok()),
            required: pin.is_required(),
        }
    }
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct WireNodeKind {
    pub kind: String,
    pub label: String,
    pub inputs: Vec<WirePin>,
    pub outputs: Vec<WirePin>,
}

impl From<&NodeKind> for WireNodeKind {
    fn from(kind: &NodeKind) -> Self {
        Self {
            kind: kind.kind_id().as_str().to_owned(),
            label: kind.label().to_owned(),
            inputs: kind.inputs().iter().map(WirePin::from).collect(),
            outputs: kind.outputs().iter().map(WirePin::from).collect(),
        }
    }
}

/// Command-specific success payloads; plain acks carry no payload at all.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum OkPayload {
    NodeAdded {
        instance: u32,
    },
    NodeRemoved {
        instance: u32,
        removed_links: u64,
    },
    Compiled {
        artifact: String,
    },
    Schema {
        kinds: Vec<WireNodeKind>,
    },
    Digest {
        nodes: u64,
        links: u64,
        dirty: bool,
        state: String,
        kinds: BTreeMap<String, u64>,
        literals: u64,
    },
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct WireError {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasons: Option<Vec<WireDiagnostic>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation: Option<String>,
}

impl WireError {
    fn bare(kind: &str, message: String) -> Self {
        Self {
            kind: kind.to_owned(),
            message,
            node: None,
            pin: None,
            suggestion: None,
            reasons: None,
            correlation: None,
        }
    }

    pub fn internal(correlation: &str) -> Self {
        let mut error = Self::bare(
            "internal_error",
            "unexpected internal failure; quote the correlation id when reporting".to_owned(),
        );
        error.correlation = Some(correlation.to_owned());
        error
    }

    pub fn from_protocol(error: &crate::protocol::ProtocolError) -> Self {
        use crate::protocol::ProtocolError;
        let kind = match error {
            ProtocolError::MalformedEnvelope { .. } => "malformed_envelope",
            ProtocolError::UnsupportedVersion { .. } => "unsupported_version",
            ProtocolError::UnknownSession { .. } => "unknown_session",
        };
        Self::bare(kind, error.to_string())
    }

    pub fn from_resource(error: &crate::service::ResourceError) -> Self {
        use crate::service::ResourceError;
        let kind = match error {
            ResourceError::SessionLimitExceeded { .. } => "session_limit_exceeded",
        };
        Self::bare(kind, error.to_string())
    }

    pub fn from_graph(error: &GraphError) -> Self {
        let message = error.to_string();
        let (kind, node, pin, suggestion) = match error {
            GraphError::UnknownKind { suggestion, .. } => (
                "unknown_kind",
                None,
                None,
                suggestion.as_ref().map(|kind| kind.as_str().to_owned()),
            ),
            GraphError::DuplicateInstance { instance_id } => {
                ("duplicate_instance", Some(instance_id.raw()), None, None)
            }
            GraphError::UnknownInstance { instance_id } => {
                ("unknown_instance", Some(instance_id.raw()), None, None)
            }
            GraphError::UnknownPin { instance_id, pin } => {
                ("unknown_pin", Some(instance_id.raw()), Some(pin.clone()), None)
            }
            GraphError::PinTypeMismatch { dst, .. } => (
                "pin_type_mismatch",
                Some(dst.instance_id().raw()),
                Some(format!("in{}", dst.pin())),
                None,
            ),
            GraphError::InputAlreadyBound { instance_id, pin } => (
                "input_already_bound",
                Some(instance_id.raw()),
                Some(pin.clone()),
                None,
            ),
            GraphError::WouldCreateCycle { dst, .. } => {
                ("would_create_cycle", Some(dst.raw()), None, None)
            }
            GraphError::TypeMismatch { pin, .. } => ("type_mismatch", None, Some(pin.clone()), None),
            GraphError::LinkNotFound { dst } => (
                "link_not_found",
                Some(dst.instance_id().raw()),
                Some(format!("in{}", dst.pin())),
                None,
            ),
            GraphError::LiteralNotSet { instance_id, pin } => {
                ("literal_not_set", Some(instance_id.raw()), Some(pin.clone()), None)
            }
        };

        let mut wire = Self::bare(kind, message);
        wire.node = node;
        wire.pin = pin;
        wire.suggestion = suggestion;
        wire
    }

    pub fn from_stage(error: &StageError) -> Self {
        match error {
            StageError::Validation(issues) => {
                let mut wire = Self::bare("validation_failed", error.to_string());
                wire.reasons = Some(issues.iter().map(WireDiagnostic::from).collect());
                wire
            }
            StageError::CompileInProgress => {
                Self::bare("compile_in_progress", error.to_string())
            }
            // Host failures are intercepted by the service, which logs them
            // under a correlation id; this arm is a guarded fallback.
            StageError::Host(_) => Self::internal("unrouted"),
        }
    }

    pub fn from_compile_begin(error: &CompileBeginError) -> Self {
        match error {
            CompileBeginError::CompileInProgress => {
                Self::bare("compile_in_progress", error.to_string())
            }
            CompileBeginError::NotStaged { .. } => Self::bare("not_staged", error.to_string()),
            CompileBeginError::Host(_) => Self::internal("unrouted"),
        }
    }
}

/// The three wire response shapes: `ok`, `error`, `diagnostics`.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WireResponse {
    Ok {
        #[serde(skip_serializing_if = "Option::is_none")]
        session: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<OkPayload>,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        session: Option<String>,
        error: WireError,
    },
    Diagnostics {
        session: String,
        state: String,
        diagnostics: Vec<WireDiagnostic>,
    },
}

impl WireResponse {
    pub fn ack(session: impl Into<String>) -> Self {
        Self::Ok {
            session: Some(session.into()),
            result: None,
        }
    }

    pub fn ok(session: impl Into<String>, payload: OkPayload) -> Self {
        Self::Ok {
            session: Some(session.into()),
            result: Some(payload),
        }
    }

    pub fn error(session: Option<String>, error: WireError) -> Self {
        Self::Error { session, error }
    }

    pub fn diagnostics(
        session: impl Into<String>,
        state: &str,
        diagnostics: &[Diagnostic],
    ) -> Self {
        Self::Diagnostics {
            session: session.into(),
            state: state.to_owned(),
            diagnostics: diagnostics.iter().map(WireDiagnostic::from).collect(),
        }
    }
}
