// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! In-process scripting surface.
//!
//! Exposes the wire command set as Rhai functions so host-embedded scripts
//! can drive graph construction without the transport. Calls funnel through
//! the same service queue as network commands, so every ordering and
//! isolation guarantee holds unchanged. One script run owns one session,
//! opened lazily and closed when the run ends.
//!
//! Scripts execute on the caller's (non-runtime) thread; each bound function
//! bridges into the async service with `Handle::block_on`.

use std::sync::{Arc, Mutex};

use rhai::{Dynamic, Engine, EvalAltResult, Position};
use tokio::runtime::Handle;

use crate::model::{InstanceId, KindId, LinkEnd, SessionId, Value};
use crate::protocol::types::{OkPayload, WireResponse};
use crate::protocol::Command;
use crate::service::GraphService;

/// Safety cap on script operations, against runaway loops.
const MAX_SCRIPT_OPS: u64 = 100_000;

type SessionCell = Arc<Mutex<Option<SessionId>>>;

pub struct ScriptRunner {
    service: GraphService,
    runtime: Handle,
}

impl ScriptRunner {
    pub fn new(service: GraphService, runtime: Handle) -> Self {
        Self { service, runtime }
    }

    /// Runs one script against a fresh session; the session is closed when
    /// the run finishes, whether it succeeded or not.
    pub fn run(&self, source: &str) -> Result<Dynamic, Box<EvalAltResult>> {
        let cell: SessionCell = Arc::new(Mutex::new(None));
        let engine = self.engine(cell.clone());
        let result = engine.eval::<Dynamic>(source);

        let open = cell.lock().ok().and_then(|mut slot| slot.take());
        if let Some(session) = open {
            let _ = self
                .runtime
                .block_on(self.service.route(Some(session), Command::Close, None));
        }
        result
    }

    fn engine(&self, cell: SessionCell) -> Engine {
        let mut engine = Engine::new();
        engine.on_progress(|count| {
            (count > MAX_SCRIPT_OPS)
                .then(|| format!("script exceeded {MAX_SCRIPT_OPS} operations").into())
        });

        let binding = Binding {
            service: self.service.clone(),
            runtime: self.runtime.clone(),
            cell,
        };

        {
            let binding = binding.clone();
            engine.register_fn(
                "add_node",
                move |kind: &str, instance: i64| -> Result<(), Box<EvalAltResult>> {
                    let kind_id = KindId::new(kind)
                        .map_err(|err| script_error(format!("invalid kind id '{kind}': {err}")))?;
                    binding.dispatch(Command::AddNode {
                        kind_id,
                        instance_id: instance_id(instance)?,
                    })?;
                    Ok(())
                },
            );
        }
        {
            let binding = binding.clone();
            engine.register_fn(
                "remove_node",
                move |instance: i64| -> Result<i64, Box<EvalAltResult>> {
                    let response = binding.dispatch(Command::RemoveNode {
                        instance_id: instance_id(instance)?,
                    })?;
                    if let WireResponse::Ok {
                        result: Some(OkPayload::NodeRemoved { removed_links, .. }),
                        ..
                    } = response
                    {
                        return Ok(removed_links as i64);
                    }
                    Ok(0)
                },
            );
        }
        {
            let binding = binding.clone();
            engine.register_fn(
                "add_link",
                move |src_node: i64,
                      src_pin: i64,
                      dst_node: i64,
                      dst_pin: i64|
                      -> Result<(), Box<EvalAltResult>> {
                    binding.dispatch(Command::AddLink {
                        src: link_end(src_node, src_pin)?,
                        dst: link_end(dst_node, dst_pin)?,
                    })?;
                    Ok(())
                },
            );
        }
        {
            let binding = binding.clone();
            engine.register_fn(
                "remove_link",
                move |dst_node: i64, dst_pin: i64| -> Result<(), Box<EvalAltResult>> {
                    binding.dispatch(Command::RemoveLink { dst: link_end(dst_node, dst_pin)? })?;
                    Ok(())
                },
            );
        }
        {
            let binding = binding.clone();
            engine.register_fn(
                "set_literal",
                move |instance: i64, pin: &str, value: Dynamic| -> Result<(), Box<EvalAltResult>> {
                    binding.dispatch(Command::SetLiteral {
                        instance_id: instance_id(instance)?,
                        pin: pin.to_owned(),
                        value: literal(value)?,
                    })?;
                    Ok(())
                },
            );
        }
        {
            let binding = binding.clone();
            engine.register_fn(
                "clear_literal",
                move |instance: i64, pin: &str| -> Result<(), Box<EvalAltResult>> {
                    binding.dispatch(Command::ClearLiteral {
                        instance_id: instance_id(instance)?,
                        pin: pin.to_owned(),
                    })?;
                    Ok(())
                },
            );
        }
        {
            let binding = binding.clone();
            engine.register_fn("stage", move || -> Result<(), Box<EvalAltResult>> {
                binding.dispatch(Command::Stage)?;
                Ok(())
            });
        }
        {
            let binding = binding.clone();
            engine.register_fn("compile", move || -> Result<String, Box<EvalAltResult>> {
                let response = binding.dispatch(Command::Compile)?;
                match response {
                    WireResponse::Ok {
                        result: Some(OkPayload::Compiled { artifact }), ..
                    } => Ok(artifact),
                    WireResponse::Diagnostics { diagnostics, .. } => {
                        let summary = diagnostics
                            .iter()
                            .map(|issue| issue.message.as_str())
                            .collect::<Vec<_>>()
                            .join("; ");
                        Err(script_error(format!("compile failed: {summary}")))
                    }
                    other => Err(script_error(format!("unexpected compile response: {other:?}"))),
                }
            });
        }
        {
            let binding = binding.clone();
            engine.register_fn("graph_digest", move || -> Result<rhai::Map, Box<EvalAltResult>> {
                let response = binding.dispatch(Command::GraphDigest)?;
                let WireResponse::Ok {
                    result: Some(OkPayload::Digest { nodes, links, state, .. }),
                    ..
                } = response
                else {
                    return Err(script_error("unexpected digest response"));
                };
                let mut map = rhai::Map::new();
                map.insert("nodes".into(), Dynamic::from(nodes as i64));
                map.insert("links".into(), Dynamic::from(links as i64));
                map.insert("state".into(), Dynamic::from(state));
                Ok(map)
            });
        }
        {
            let binding = binding;
            engine.register_fn("kind_ids", move || -> Result<rhai::Array, Box<EvalAltResult>> {
                let response = binding.dispatch(Command::QuerySchema)?;
                let WireResponse::Ok { result: Some(OkPayload::Schema { kinds }), .. } = response
                else {
                    return Err(script_error("unexpected schema response"));
                };
                Ok(kinds.into_iter().map(|kind| Dynamic::from(kind.kind)).collect())
            });
        }

        engine
    }
}

#[derive(Clone)]
struct Binding {
    service: GraphService,
    runtime: Handle,
    cell: SessionCell,
}

impl Binding {
    /// Routes one command under the script's session, allocating it on first
    /// use. Error responses become script errors; `ok`/`diagnostics` pass
    /// through for the caller to unpack.
    fn dispatch(&self, command: Command) -> Result<WireResponse, Box<EvalAltResult>> {
        let session = self
            .cell
            .lock()
            .map_err(|_| script_error("script session cell poisoned"))?
            .clone();

        let response = self
            .runtime
            .block_on(self.service.route(session, command, None));

        match &response {
            WireResponse::Ok { session: Some(session), .. } => {
                self.remember_session(session)?;
            }
            WireResponse::Diagnostics { session, .. } => {
                self.remember_session(session)?;
            }
            WireResponse::Ok { session: None, .. } => {}
            WireResponse::Error { error, .. } => {
                return Err(script_error(format!("{}: {}", error.kind, error.message)));
            }
        }
        Ok(response)
    }

    fn remember_session(&self, session: &str) -> Result<(), Box<EvalAltResult>> {
        let mut slot = self
            .cell
            .lock()
            .map_err(|_| script_error("script session cell poisoned"))?;
        if slot.is_none() {
            let session = SessionId::new(session)
                .map_err(|err| script_error(format!("bad session id from service: {err}")))?;
            *slot = Some(session);
        }
        Ok(())
    }
}

fn script_error(message: impl Into<String>) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(
        Dynamic::from(message.into()),
        Position::NONE,
    ))
}

fn instance_id(raw: i64) -> Result<InstanceId, Box<EvalAltResult>> {
    u32::try_from(raw)
        .map(InstanceId::new)
        .map_err(|_| script_error(format!("node handle {raw} is out of range")))
}

fn link_end(node: i64, pin: i64) -> Result<LinkEnd, Box<EvalAltResult>> {
    let pin = u32::try_from(pin)
        .map_err(|_| script_error(format!("pin index {pin} is out of range")))?;
    Ok(LinkEnd::new(instance_id(node)?, pin))
}

fn literal(value: Dynamic) -> Result<Value, Box<EvalAltResult>> {
    if let Ok(v) = value.as_bool() {
        return Ok(Value::Bool(v));
    }
    if let Ok(v) = value.as_int() {
        return Ok(Value::Int(v));
    }
    if let Ok(v) = value.as_float() {
        return Ok(Value::Float(v));
    }
    if value.is_string() {
        return Ok(Value::Text(value.into_string().unwrap_or_default()));
    }
    Err(script_error(format!(
        "unsupported literal type '{}'",
        value.type_name()
    )))
}
