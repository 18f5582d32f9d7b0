// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Command envelope decoding.
//!
//! One frame carries one JSON envelope: `{"v": 1, "session": "s1",
//! "cmd": "add_node", "params": {...}}`. The decoder turns that into a typed
//! [`Command`] or fails; it never touches graph or session state. Unknown
//! protocol versions are rejected outright rather than best-effort mapped.

pub mod encode;
pub mod types;

use serde_json::Value as Json;

use crate::model::{InstanceId, KindId, LinkEnd, SessionId, Value};

use types::{
    AddLinkParams, AddNodeParams, ClearLiteralParams, EndpointParams, RemoveLinkParams,
    RemoveNodeParams, SetLiteralParams,
};

pub const PROTOCOL_VERSION: u64 = 1;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddNode { kind_id: KindId, instance_id: InstanceId },
    RemoveNode { instance_id: InstanceId },
    AddLink { src: LinkEnd, dst: LinkEnd },
    RemoveLink { dst: LinkEnd },
    SetLiteral { instance_id: InstanceId, pin: String, value: Value },
    ClearLiteral { instance_id: InstanceId, pin: String },
    Stage,
    Compile,
    QuerySchema,
    GraphDigest,
    Close,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddNode { .. } => "add_node",
            Self::RemoveNode { .. } => "remove_node",
            Self::AddLink { .. } => "add_link",
            Self::RemoveLink { .. } => "remove_link",
            Self::SetLiteral { .. } => "set_literal",
            Self::ClearLiteral { .. } => "clear_literal",
            Self::Stage => "stage",
            Self::Compile => "compile",
            Self::QuerySchema => "query_schema",
            Self::GraphDigest => "graph_digest",
            Self::Close => "close",
        }
    }

    /// Whether this command mutates the working graph when it succeeds.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::AddNode { .. }
                | Self::RemoveNode { .. }
                | Self::AddLink { .. }
                | Self::RemoveLink { .. }
                | Self::SetLiteral { .. }
                | Self::ClearLiteral { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub session: Option<SessionId>,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed envelope: {detail}")]
    MalformedEnvelope { detail: String },
    #[error("unsupported protocol version {version}")]
    UnsupportedVersion { version: u64 },
    #[error("unknown session '{session}'")]
    UnknownSession { session: SessionId },
}

fn malformed(detail: impl Into<String>) -> ProtocolError {
    ProtocolError::MalformedEnvelope { detail: detail.into() }
}

pub fn decode(frame: &[u8]) -> Result<Envelope, ProtocolError> {
    let root: Json =
        serde_json::from_slice(frame).map_err(|err| malformed(format!("invalid JSON: {err}")))?;
    let Json::Object(_) = root else {
        return Err(malformed("envelope must be a JSON object"));
    };

    let version = root
        .get("v")
        .and_then(Json::as_u64)
        .ok_or_else(|| malformed("missing or non-integer 'v' field"))?;
    if version != PROTOCOL_VERSION {
        return Err(ProtocolError::UnsupportedVersion { version });
    }

    let session = match root.get("session") {
        None | Some(Json::Null) => None,
        Some(Json::String(raw)) => Some(
            SessionId::new(raw).map_err(|err| malformed(format!("invalid session id: {err}")))?,
        ),
        Some(_) => return Err(malformed("'session' must be a string")),
    };

    let cmd = root
        .get("cmd")
        .and_then(Json::as_str)
        .ok_or_else(|| malformed("missing 'cmd' field"))?;
    let params = root.get("params").cloned().unwrap_or(Json::Null);

    let command = decode_command(cmd, params)?;
    Ok(Envelope { session, command })
}

fn decode_command(cmd: &str, params: Json) -> Result<Command, ProtocolError> {
    match cmd {
        "add_node" => {
            let params: AddNodeParams = typed_params(cmd, params)?;
            let kind_id = KindId::new(&params.kind)
                .map_err(|err| malformed(format!("invalid kind id '{}': {err}", params.kind)))?;
            Ok(Command::AddNode {
                kind_id,
                instance_id: InstanceId::new(params.instance),
            })
        }
        "remove_node" => {
            let params: RemoveNodeParams = typed_params(cmd, params)?;
            Ok(Command::RemoveNode {
                instance_id: InstanceId::new(params.instance),
            })
        }
        "add_link" => {
            let params: AddLinkParams = typed_params(cmd, params)?;
            Ok(Command::AddLink {
                src: link_end(params.src),
                dst: link_end(params.dst),
            })
        }
        "remove_link" => {
            let params: RemoveLinkParams = typed_params(cmd, params)?;
            Ok(Command::RemoveLink { dst: link_end(params.dst) })
        }
        "set_literal" => {
            let params: SetLiteralParams = typed_params(cmd, params)?;
            let value = literal_value(&params.value)?;
            Ok(Command::SetLiteral {
                instance_id: InstanceId::new(params.instance),
                pin: params.pin,
                value,
            })
        }
        "clear_literal" => {
            let params: ClearLiteralParams = typed_params(cmd, params)?;
            Ok(Command::ClearLiteral {
                instance_id: InstanceId::new(params.instance),
                pin: params.pin,
            })
        }
        "stage" => expect_no_params(cmd, params, Command::Stage),
        "compile" => expect_no_params(cmd, params, Command::Compile),
        "query_schema" => expect_no_params(cmd, params, Command::QuerySchema),
        "graph_digest" => expect_no_params(cmd, params, Command::GraphDigest),
        "close" => expect_no_params(cmd, params, Command::Close),
        other => Err(malformed(format!("unknown command '{other}'"))),
    }
}

fn typed_params<T: serde::de::DeserializeOwned>(cmd: &str, params: Json) -> Result<T, ProtocolError> {
    serde_json::from_value(params)
        .map_err(|err| malformed(format!("invalid params for '{cmd}': {err}")))
}

fn expect_no_params(cmd: &str, params: Json, command: Command) -> Result<Command, ProtocolError> {
    match params {
        Json::Null => Ok(command),
        Json::Object(map) if map.is_empty() => Ok(command),
        _ => Err(malformed(format!("'{cmd}' takes no params"))),
    }
}

fn link_end(endpoint: EndpointParams) -> LinkEnd {
    LinkEnd::new(InstanceId::new(endpoint.node), endpoint.pin)
}

/// Machine-readable description of the wire protocol, for client codegen.
/// Served by the binary's `--print-protocol-schema` flag.
pub fn protocol_schema() -> serde_json::Value {
    use schemars::schema_for;
    serde_json::json!({
        "v": PROTOCOL_VERSION,
        "commands": {
            "add_node": schema_for!(types::AddNodeParams),
            "remove_node": schema_for!(types::RemoveNodeParams),
            "add_link": schema_for!(types::AddLinkParams),
            "remove_link": schema_for!(types::RemoveLinkParams),
            "set_literal": schema_for!(types::SetLiteralParams),
            "clear_literal": schema_for!(types::ClearLiteralParams),
            "stage": null,
            "compile": null,
            "query_schema": null,
            "graph_digest": null,
            "close": null,
        },
        "response": schema_for!(types::WireResponse),
    })
}

/// Literals arrive as bare JSON scalars. Integers that fit i64 stay `Int`;
/// everything else numeric becomes `Float`.
fn literal_value(raw: &Json) -> Result<Value, ProtocolError> {
    match raw {
        Json::Bool(v) => Ok(Value::Bool(*v)),
        Json::Number(number) => {
            if let Some(v) = number.as_i64() {
                Ok(Value::Int(v))
            } else if let Some(v) = number.as_f64() {
                Ok(Value::Float(v))
            } else {
                Err(malformed(format!("unrepresentable number literal {number}")))
            }
        }
        Json::String(v) => Ok(Value::Text(v.clone())),
        Json::Null => Err(malformed("literal value must not be null")),
        Json::Array(_) | Json::Object(_) => {
            Err(malformed("literal value must be a scalar"))
        }
    }
}
