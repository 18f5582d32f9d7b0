// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Structural mutations on a working graph.
//!
//! Every op validates completely before it touches the graph, so a failed op
//! leaves the graph byte-for-byte unchanged. A successful op marks the graph
//! dirty; the session layer uses that to invalidate any staged compile copy.

use crate::model::{
    DataType, InstanceId, KindId, LinkEnd, Link, NodeInstance, Value, WorkingGraph,
};
use crate::registry::SchemaRegistry;

#[derive(Debug, Clone, PartialEq)]
pub enum GraphOp {
    AddNode {
        kind_id: KindId,
        instance_id: InstanceId,
    },
    RemoveNode {
        instance_id: InstanceId,
    },
    AddLink {
        src: LinkEnd,
        dst: LinkEnd,
    },
    RemoveLink {
        dst: LinkEnd,
    },
    SetLiteral {
        instance_id: InstanceId,
        pin_name: String,
        value: Value,
    },
    ClearLiteral {
        instance_id: InstanceId,
        pin_name: String,
    },
}

/// What a successful op did, for the command response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpReceipt {
    NodeAdded {
        instance_id: InstanceId,
    },
    /// Removing a node cascades over every link touching it.
    NodeRemoved {
        instance_id: InstanceId,
        removed_links: usize,
    },
    LinkAdded,
    LinkRemoved,
    LiteralSet,
    LiteralCleared,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("unknown node kind '{kind_id}'{}", suggestion_suffix(.suggestion))]
    UnknownKind {
        kind_id: KindId,
        suggestion: Option<KindId>,
    },
    #[error("instance {instance_id} already exists in this graph")]
    DuplicateInstance { instance_id: InstanceId },
    #[error("instance {instance_id} does not exist in this graph")]
    UnknownInstance { instance_id: InstanceId },
    #[error("instance {instance_id} has no pin {pin}")]
    UnknownPin { instance_id: InstanceId, pin: String },
    #[error("cannot link {src_type} output {src} to {dst_type} input {dst}")]
    PinTypeMismatch {
        src: LinkEnd,
        src_type: DataType,
        dst: LinkEnd,
        dst_type: DataType,
    },
    #[error("input pin '{pin}' of instance {instance_id} is already bound")]
    InputAlreadyBound { instance_id: InstanceId, pin: String },
    #[error("linking {src} to {dst} would close a control-flow cycle")]
    WouldCreateCycle { src: InstanceId, dst: InstanceId },
    #[error("pin '{pin}' expects {expected}, got {found}")]
    TypeMismatch {
        pin: String,
        expected: DataType,
        found: DataType,
    },
    #[error("no link feeds input pin {dst}")]
    LinkNotFound { dst: LinkEnd },
    #[error("pin '{pin}' of instance {instance_id} has no literal override")]
    LiteralNotSet { instance_id: InstanceId, pin: String },
}

fn suggestion_suffix(suggestion: &Option<KindId>) -> String {
    match suggestion {
        Some(kind_id) => format!(" (did you mean '{kind_id}'?)"),
        None => String::new(),
    }
}

/// Applies one op atomically. On `Err` the graph is untouched.
pub fn apply_op(
    graph: &mut WorkingGraph,
    registry: &SchemaRegistry,
    op: &GraphOp,
) -> Result<OpReceipt, GraphError> {
    match op {
        GraphOp::AddNode { kind_id, instance_id } => add_node(graph, registry, kind_id, *instance_id),
        GraphOp::RemoveNode { instance_id } => remove_node(graph, *instance_id),
        GraphOp::AddLink { src, dst } => add_link(graph, registry, *src, *dst),
        GraphOp::RemoveLink { dst } => remove_link(graph, *dst),
        GraphOp::SetLiteral { instance_id, pin_name, value } => {
            set_literal(graph, registry, *instance_id, pin_name, value)
        }
        GraphOp::ClearLiteral { instance_id, pin_name } => {
            clear_literal(graph, registry, *instance_id, pin_name)
        }
    }
}

fn add_node(
    graph: &mut WorkingGraph,
    registry: &SchemaRegistry,
    kind_id: &KindId,
    instance_id: InstanceId,
) -> Result<OpReceipt, GraphError> {
    if registry.lookup(kind_id).is_none() {
        return Err(GraphError::UnknownKind {
            kind_id: kind_id.clone(),
            suggestion: registry.suggest(kind_id.as_str()).cloned(),
        });
    }
    if graph.nodes().contains_key(&instance_id) {
        return Err(GraphError::DuplicateInstance { instance_id });
    }

    graph.nodes_mut().insert(instance_id, NodeInstance::new(kind_id.clone()));
    graph.mark_dirty();
    Ok(OpReceipt::NodeAdded { instance_id })
}

fn remove_node(graph: &mut WorkingGraph, instance_id: InstanceId) -> Result<OpReceipt, GraphError> {
    if !graph.nodes().contains_key(&instance_id) {
        return Err(GraphError::UnknownInstance { instance_id });
    }

    let removed_links = graph.links_touching(instance_id);
    graph.links_mut().retain(|link| {
        link.src().instance_id() != instance_id && link.dst().instance_id() != instance_id
    });
    graph.nodes_mut().remove(&instance_id);
    graph.mark_dirty();
    Ok(OpReceipt::NodeRemoved { instance_id, removed_links })
}

fn add_link(
    graph: &mut WorkingGraph,
    registry: &SchemaRegistry,
    src: LinkEnd,
    dst: LinkEnd,
) -> Result<OpReceipt, GraphError> {
    let src_node = graph
        .node(src.instance_id())
        .ok_or(GraphError::UnknownInstance { instance_id: src.instance_id() })?;
    let dst_node = graph
        .node(dst.instance_id())
        .ok_or(GraphError::UnknownInstance { instance_id: dst.instance_id() })?;

    // Kinds were checked against the registry when the nodes were added, and
    // the registry snapshot never shrinks, so these lookups cannot miss.
    let src_kind = registry
        .lookup(src_node.kind_id())
        .ok_or_else(|| GraphError::UnknownKind {
            kind_id: src_node.kind_id().clone(),
            suggestion: None,
        })?;
    let dst_kind = registry
        .lookup(dst_node.kind_id())
        .ok_or_else(|| GraphError::UnknownKind {
            kind_id: dst_node.kind_id().clone(),
            suggestion: None,
        })?;

    let src_pin = src_kind.output(src.pin()).ok_or_else(|| GraphError::UnknownPin {
        instance_id: src.instance_id(),
        pin: format!("out{}", src.pin()),
    })?;
    let dst_pin = dst_kind.input(dst.pin()).ok_or_else(|| GraphError::UnknownPin {
        instance_id: dst.instance_id(),
        pin: format!("in{}", dst.pin()),
    })?;

    if !dst_pin.data_type().accepts(src_pin.data_type()) {
        return Err(GraphError::PinTypeMismatch {
            src,
            src_type: src_pin.data_type(),
            dst,
            dst_type: dst_pin.data_type(),
        });
    }

    if graph.link_into(dst).is_some()
        || dst_node.literal(dst_pin.name()).is_some()
    {
        return Err(GraphError::InputAlreadyBound {
            instance_id: dst.instance_id(),
            pin: dst_pin.name().to_owned(),
        });
    }

    let exec = dst_pin.data_type() == DataType::Exec;
    // A control-flow edge src -> dst closes a cycle exactly when src is
    // already reachable from dst.
    if exec && graph.exec_reaches(dst.instance_id(), src.instance_id()) {
        return Err(GraphError::WouldCreateCycle {
            src: src.instance_id(),
            dst: dst.instance_id(),
        });
    }

    graph.links_mut().push(Link::new(src, dst, exec));
    graph.mark_dirty();
    Ok(OpReceipt::LinkAdded)
}

fn remove_link(graph: &mut WorkingGraph, dst: LinkEnd) -> Result<OpReceipt, GraphError> {
    let before = graph.links().len();
    graph.links_mut().retain(|link| link.dst() != dst);
    if graph.links().len() == before {
        return Err(GraphError::LinkNotFound { dst });
    }
    graph.mark_dirty();
    Ok(OpReceipt::LinkRemoved)
}

fn set_literal(
    graph: &mut WorkingGraph,
    registry: &SchemaRegistry,
    instance_id: InstanceId,
    pin_name: &str,
    value: &Value,
) -> Result<OpReceipt, GraphError> {
    let node = graph
        .node(instance_id)
        .ok_or(GraphError::UnknownInstance { instance_id })?;
    let kind = registry
        .lookup(node.kind_id())
        .ok_or_else(|| GraphError::UnknownKind {
            kind_id: node.kind_id().clone(),
            suggestion: None,
        })?;
    let (pin_index, pin) = kind.input_by_name(pin_name).ok_or_else(|| GraphError::UnknownPin {
        instance_id,
        pin: pin_name.to_owned(),
    })?;

    if !pin.data_type().accepts(value.data_type()) {
        return Err(GraphError::TypeMismatch {
            pin: pin_name.to_owned(),
            expected: pin.data_type(),
            found: value.data_type(),
        });
    }

    if graph.link_into(LinkEnd::new(instance_id, pin_index)).is_some() {
        return Err(GraphError::InputAlreadyBound {
            instance_id,
            pin: pin_name.to_owned(),
        });
    }

    let node = graph
        .nodes_mut()
        .get_mut(&instance_id)
        .ok_or(GraphError::UnknownInstance { instance_id })?;
    node.set_literal(pin_name, value.clone());
    graph.mark_dirty();
    Ok(OpReceipt::LiteralSet)
}

fn clear_literal(
    graph: &mut WorkingGraph,
    registry: &SchemaRegistry,
    instance_id: InstanceId,
    pin_name: &str,
) -> Result<OpReceipt, GraphError> {
    let node = graph
        .node(instance_id)
        .ok_or(GraphError::UnknownInstance { instance_id })?;
    let kind = registry
        .lookup(node.kind_id())
        .ok_or_else(|| GraphError::UnknownKind {
            kind_id: node.kind_id().clone(),
            suggestion: None,
        })?;
    if kind.input_by_name(pin_name).is_none() {
        return Err(GraphError::UnknownPin {
            instance_id,
            pin: pin_name.to_owned(),
        });
    }
    if node.literal(pin_name).is_none() {
        return Err(GraphError::LiteralNotSet {
            instance_id,
            pin: pin_name.to_owned(),
        });
    }

    let node = graph
        .nodes_mut()
        .get_mut(&instance_id)
        .ok_or(GraphError::UnknownInstance { instance_id })?;
    node.clear_literal(pin_name);
    graph.mark_dirty();
    Ok(OpReceipt::LiteralCleared)
}

#[cfg(test)]
mod tests;
