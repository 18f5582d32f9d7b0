// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Session management and the single mutation worker.
//!
//! Transports deliver commands concurrently from many peers; everything that
//! touches a working graph, the registry, or the host funnels through one
//! queue drained by one worker task. That gives per-session FIFO ordering and
//! keeps every host call on one logical thread. A session suspends only while
//! its compile is in flight: the reply is parked and the worker keeps
//! draining other sessions' commands.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::compile::{self, CompileBeginError, StageError};
use crate::host::{CompileCallback, CompileOutcome, EditorHost};
use crate::model::{CompileSession, CompileState, Diagnostic, SessionId};
use crate::ops::{apply_op, GraphOp, OpReceipt};
use crate::protocol::types::{OkPayload, WireError, WireResponse};
use crate::protocol::{Command, ProtocolError};
use crate::registry::{CatalogError, SchemaRegistry};

pub const DEFAULT_SESSION_CAP: usize = 16;
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Cap on concurrently open sessions.
    pub max_sessions: usize,
    /// Sessions idle longer than this are torn down by the sweeper.
    pub idle_timeout: Duration,
    /// How often the idle sweeper runs.
    pub sweep_interval: Duration,
    /// Force-fail a compile that has not settled after this long. Off by
    /// default: the host compiler owns its own pacing.
    pub compile_watchdog: Option<Duration>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_SESSION_CAP,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            compile_watchdog: None,
        }
    }
}

/// Transport-assigned connection handle; sessions remember which connection
/// opened them so a disconnect can tear them down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}

enum ServiceMsg {
    Route {
        session: Option<SessionId>,
        origin: Option<ConnectionId>,
        command: Command,
        reply: oneshot::Sender<WireResponse>,
    },
    CompileSettled {
        session: SessionId,
        epoch: u64,
        outcome: CompileOutcome,
    },
    CompileTimeout {
        session: SessionId,
        epoch: u64,
    },
    ConnectionClosed {
        connection: ConnectionId,
    },
}

/// Cheap handle onto the worker queue; everything is routed through it.
#[derive(Clone)]
pub struct GraphService {
    tx: mpsc::UnboundedSender<ServiceMsg>,
}

impl GraphService {
    /// Snapshots the host catalog, then spawns the mutation worker onto the
    /// current tokio runtime.
    pub fn spawn(host: Box<dyn EditorHost>, config: ServiceConfig) -> Result<Self, CatalogError> {
        let registry = SchemaRegistry::from_catalog(host.enumerate_kinds())?;
        tracing::info!(kinds = registry.len(), "schema registry snapshot taken");

        let (tx, rx) = mpsc::unbounded_channel();
        let worker = ServiceWorker {
            registry,
            host,
            config,
            sessions: BTreeMap::new(),
            tx: tx.clone(),
            next_session: 0,
            next_correlation: 0,
        };
        tokio::spawn(worker.run(rx));
        Ok(Self { tx })
    }

    /// Routes one command and waits for its response. `session: None` opens a
    /// new session; the response names the allocated id.
    pub async fn route(
        &self,
        session: Option<SessionId>,
        command: Command,
        origin: Option<ConnectionId>,
    ) -> WireResponse {
        let (reply, receiver) = oneshot::channel();
        let msg = ServiceMsg::Route { session, origin, command, reply };
        if self.tx.send(msg).is_err() {
            return detached_response();
        }
        match receiver.await {
            Ok(response) => response,
            // The worker dropped the reply: the session was torn down while
            // this command (typically a parked compile) was pending.
            Err(_) => detached_response(),
        }
    }

    /// Tells the worker a transport connection is gone; every session it
    /// opened is torn down, detaching any in-flight compile.
    pub fn connection_closed(&self, connection: ConnectionId) {
        let _ = self.tx.send(ServiceMsg::ConnectionClosed { connection });
    }
}

fn detached_response() -> WireResponse {
    WireResponse::error(None, WireError::internal("detached"))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    #[error("session limit of {limit} reached; close an existing session first")]
    SessionLimitExceeded { limit: usize },
}

struct SessionSlot {
    session: CompileSession,
    origin: Option<ConnectionId>,
    /// Bumped per compile dispatch; guards stale watchdog firings and late
    /// host callbacks against a newer compile on the same session.
    epoch: u64,
    /// The parked reply of the command that started the in-flight compile.
    waiter: Option<oneshot::Sender<WireResponse>>,
}

struct ServiceWorker {
    registry: SchemaRegistry,
    host: Box<dyn EditorHost>,
    config: ServiceConfig,
    sessions: BTreeMap<SessionId, SessionSlot>,
    tx: mpsc::UnboundedSender<ServiceMsg>,
    next_session: u64,
    next_correlation: u64,
}

impl ServiceWorker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<ServiceMsg>) {
        let mut sweep = tokio::time::interval(self.config.sweep_interval);
        sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                msg = rx.recv() => match msg {
                    Some(msg) => self.handle(msg),
                    None => break,
                },
                _ = sweep.tick() => self.sweep_idle(),
            }
        }
        tracing::info!("graph service worker stopped");
    }

    fn handle(&mut self, msg: ServiceMsg) {
        match msg {
            ServiceMsg::Route { session, origin, command, reply } => {
                self.handle_route(session, origin, command, reply);
            }
            ServiceMsg::CompileSettled { session, epoch, outcome } => {
                self.settle_compile(&session, epoch, outcome);
            }
            ServiceMsg::CompileTimeout { session, epoch } => {
                self.handle_timeout(&session, epoch);
            }
            ServiceMsg::ConnectionClosed { connection } => {
                self.handle_disconnect(connection);
            }
        }
    }

    fn handle_route(
        &mut self,
        session: Option<SessionId>,
        origin: Option<ConnectionId>,
        command: Command,
        reply: oneshot::Sender<WireResponse>,
    ) {
        let session_id = match self.resolve_session(session, origin) {
            Ok(session_id) => session_id,
            Err(response) => {
                let _ = reply.send(response);
                return;
            }
        };

        match command {
            Command::Compile => self.start_compile(&session_id, reply),
            Command::Close => {
                let response = self.close_session(&session_id);
                let _ = reply.send(response);
            }
            other => {
                let response = self.execute(&session_id, other);
                let _ = reply.send(response);
            }
        }
    }

    /// `Some(id)` must reference a live session; `None` allocates one,
    /// subject to the session cap.
    fn resolve_session(
        &mut self,
        session: Option<SessionId>,
        origin: Option<ConnectionId>,
    ) -> Result<SessionId, WireResponse> {
        if let Some(session_id) = session {
            if self.sessions.contains_key(&session_id) {
                return Ok(session_id);
            }
            let error = ProtocolError::UnknownSession { session: session_id };
            return Err(WireResponse::error(None, WireError::from_protocol(&error)));
        }

        if self.sessions.len() >= self.config.max_sessions {
            tracing::warn!(limit = self.config.max_sessions, "session limit reached");
            let error = ResourceError::SessionLimitExceeded { limit: self.config.max_sessions };
            return Err(WireResponse::error(None, WireError::from_resource(&error)));
        }

        self.next_session += 1;
        let session_id = SessionId::new(format!("s{}", self.next_session))
            .expect("generated session ids are always valid");
        self.sessions.insert(
            session_id.clone(),
            SessionSlot {
                session: CompileSession::new(session_id.clone()),
                origin,
                epoch: 0,
                waiter: None,
            },
        );
        match origin {
            Some(connection) => {
                tracing::info!(session = %session_id, %connection, "session opened")
            }
            None => tracing::info!(session = %session_id, "session opened (in-process)"),
        }
        Ok(session_id)
    }

    fn execute(&mut self, session_id: &SessionId, command: Command) -> WireResponse {
        let Some(slot) = self.sessions.get_mut(session_id) else {
            let error = ProtocolError::UnknownSession { session: session_id.clone() };
            return WireResponse::error(None, WireError::from_protocol(&error));
        };
        slot.session.touch();
        let session = session_id.as_str().to_owned();

        match command {
            Command::QuerySchema => {
                let kinds = self.registry.kinds().iter().map(Into::into).collect();
                WireResponse::ok(session, OkPayload::Schema { kinds })
            }
            Command::GraphDigest => WireResponse::ok(session, digest_payload(&slot.session)),
            Command::Stage => {
                match compile::stage_session(
                    &mut slot.session,
                    &self.registry,
                    self.host.as_mut(),
                ) {
                    Ok(_stage) => WireResponse::ack(session),
                    Err(StageError::Host(err)) => {
                        self.next_correlation += 1;
                        let correlation = format!("c-{}", self.next_correlation);
                        tracing::error!(%correlation, %session, error = %err, "host stage failed");
                        WireResponse::error(Some(session), WireError::internal(&correlation))
                    }
                    Err(err) => WireResponse::error(Some(session), WireError::from_stage(&err)),
                }
            }
            Command::Compile | Command::Close => {
                // Routed before execute(); kept here so the match is total.
                WireResponse::error(Some(session), WireError::internal("unrouted"))
            }
            mutation => {
                if slot.session.state().is_compiling() {
                    return WireResponse::error(
                        Some(session),
                        WireError::from_stage(&StageError::CompileInProgress),
                    );
                }
                let Some(op) = graph_op(mutation) else {
                    return WireResponse::error(Some(session), WireError::internal("unrouted"));
                };
                match apply_op(slot.session.graph_mut(), &self.registry, &op) {
                    Ok(receipt) => {
                        compile::invalidate_after_mutation(&mut slot.session, self.host.as_mut());
                        match receipt_payload(receipt) {
                            Some(payload) => WireResponse::ok(session, payload),
                            None => WireResponse::ack(session),
                        }
                    }
                    Err(err) => WireResponse::error(Some(session), WireError::from_graph(&err)),
                }
            }
        }
    }

    fn start_compile(&mut self, session_id: &SessionId, reply: oneshot::Sender<WireResponse>) {
        let Some(slot) = self.sessions.get_mut(session_id) else {
            let error = ProtocolError::UnknownSession { session: session_id.clone() };
            let _ = reply.send(WireResponse::error(None, WireError::from_protocol(&error)));
            return;
        };
        slot.session.touch();
        slot.epoch += 1;
        let epoch = slot.epoch;

        let settle_tx = self.tx.clone();
        let settle_session = session_id.clone();
        let done: CompileCallback = Box::new(move |outcome| {
            let _ = settle_tx.send(ServiceMsg::CompileSettled {
                session: settle_session,
                epoch,
                outcome,
            });
        });

        match compile::begin_compile(&mut slot.session, self.host.as_mut(), done) {
            Ok(_stage) => {
                slot.waiter = Some(reply);
                if let Some(timeout) = self.config.compile_watchdog {
                    let watchdog_tx = self.tx.clone();
                    let watchdog_session = session_id.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(timeout).await;
                        let _ = watchdog_tx.send(ServiceMsg::CompileTimeout {
                            session: watchdog_session,
                            epoch,
                        });
                    });
                }
            }
            Err(CompileBeginError::Host(err)) => {
                self.next_correlation += 1;
                let correlation = format!("c-{}", self.next_correlation);
                tracing::error!(
                    %correlation,
                    session = %session_id,
                    error = %err,
                    "host compile dispatch failed"
                );
                let _ = reply.send(WireResponse::error(
                    Some(session_id.as_str().to_owned()),
                    WireError::internal(&correlation),
                ));
            }
            Err(err) => {
                let _ = reply.send(WireResponse::error(
                    Some(session_id.as_str().to_owned()),
                    WireError::from_compile_begin(&err),
                ));
            }
        }
    }

    fn settle_compile(&mut self, session_id: &SessionId, epoch: u64, outcome: CompileOutcome) {
        let Some(slot) = self.sessions.get_mut(session_id) else {
            tracing::debug!(session = %session_id, "compile result for closed session discarded");
            return;
        };
        if slot.epoch != epoch {
            tracing::debug!(session = %session_id, "stale compile result discarded");
            return;
        }
        if !compile::resolve_compile(&mut slot.session, self.host.as_mut(), outcome) {
            return;
        }
        slot.session.touch();

        let session = session_id.as_str().to_owned();
        let response = match slot.session.state() {
            CompileState::Succeeded { artifact } => WireResponse::ok(
                session,
                OkPayload::Compiled { artifact: artifact.as_str().to_owned() },
            ),
            CompileState::Failed { diagnostics, .. } => {
                WireResponse::diagnostics(session, "failed", diagnostics)
            }
            _ => return,
        };
        if let Some(waiter) = slot.waiter.take() {
            let _ = waiter.send(response);
        }
    }

    fn handle_timeout(&mut self, session_id: &SessionId, epoch: u64) {
        let still_compiling = self
            .sessions
            .get(session_id)
            .map(|slot| slot.epoch == epoch && slot.session.state().is_compiling())
            .unwrap_or(false);
        if !still_compiling {
            return;
        }
        tracing::warn!(session = %session_id, "compile watchdog expired");
        let outcome = CompileOutcome::Failed(vec![Diagnostic::error(
            "compile did not settle before the watchdog deadline",
        )]);
        self.settle_compile(session_id, epoch, outcome);
    }

    fn close_session(&mut self, session_id: &SessionId) -> WireResponse {
        let Some(mut slot) = self.sessions.remove(session_id) else {
            let error = ProtocolError::UnknownSession { session: session_id.clone() };
            return WireResponse::error(None, WireError::from_protocol(&error));
        };
        compile::release(&mut slot.session, self.host.as_mut());
        // A parked compile reply is dropped here; the host's late result will
        // find no session and be discarded.
        drop(slot.waiter.take());
        tracing::info!(session = %session_id, "session closed");
        WireResponse::ack(session_id.as_str())
    }

    fn handle_disconnect(&mut self, connection: ConnectionId) {
        let owned: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, slot)| slot.origin == Some(connection))
            .map(|(session_id, _)| session_id.clone())
            .collect();
        for session_id in owned {
            if let Some(mut slot) = self.sessions.remove(&session_id) {
                compile::release(&mut slot.session, self.host.as_mut());
                drop(slot.waiter.take());
                tracing::info!(session = %session_id, %connection, "session torn down on disconnect");
            }
        }
    }

    fn sweep_idle(&mut self) {
        let timeout = self.config.idle_timeout;
        let expired: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, slot)| {
                !slot.session.state().is_compiling() && slot.session.idle_for() >= timeout
            })
            .map(|(session_id, _)| session_id.clone())
            .collect();
        for session_id in expired {
            if let Some(mut slot) = self.sessions.remove(&session_id) {
                compile::release(&mut slot.session, self.host.as_mut());
                tracing::info!(session = %session_id, "idle session swept");
            }
        }
    }
}

fn graph_op(command: Command) -> Option<GraphOp> {
    match command {
        Command::AddNode { kind_id, instance_id } => {
            Some(GraphOp::AddNode { kind_id, instance_id })
        }
        Command::RemoveNode { instance_id } => Some(GraphOp::RemoveNode { instance_id }),
        Command::AddLink { src, dst } => Some(GraphOp::AddLink { src, dst }),
        Command::RemoveLink { dst } => Some(GraphOp::RemoveLink { dst }),
        Command::SetLiteral { instance_id, pin, value } => {
            Some(GraphOp::SetLiteral { instance_id, pin_name: pin, value })
        }
        Command::ClearLiteral { instance_id, pin } => {
            Some(GraphOp::ClearLiteral { instance_id, pin_name: pin })
        }
        _ => None,
    }
}

fn receipt_payload(receipt: OpReceipt) -> Option<OkPayload> {
    match receipt {
        OpReceipt::NodeAdded { instance_id } => {
            Some(OkPayload::NodeAdded { instance: instance_id.raw() })
        }
        OpReceipt::NodeRemoved { instance_id, removed_links } => Some(OkPayload::NodeRemoved {
            instance: instance_id.raw(),
            removed_links: removed_links as u64,
        }),
        OpReceipt::LinkAdded
        | OpReceipt::LinkRemoved
        | OpReceipt::LiteralSet
        | OpReceipt::LiteralCleared => None,
    }
}

fn digest_payload(session: &CompileSession) -> OkPayload {
    let graph = session.graph();
    let mut kinds: BTreeMap<String, u64> = BTreeMap::new();
    let mut literals = 0u64;
    for node in graph.nodes().values() {
        *kinds.entry(node.kind_id().as_str().to_owned()).or_insert(0) += 1;
        literals += node.literals().len() as u64;
    }
    OkPayload::Digest {
        nodes: graph.nodes().len() as u64,
        links: graph.links().len() as u64,
        dirty: graph.is_dirty(),
        state: session.state().label().to_owned(),
        kinds,
        literals,
    }
}
