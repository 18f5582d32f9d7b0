// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use crate::host::demo_catalog;
use crate::model::{InstanceId, KindId, LinkEnd, Value, WorkingGraph};
use crate::registry::SchemaRegistry;

use super::{apply_op, GraphError, GraphOp, OpReceipt};

fn registry() -> SchemaRegistry {
    SchemaRegistry::from_catalog(demo_catalog()).expect("demo catalog")
}

fn kind(id: &str) -> KindId {
    KindId::new(id).expect("kind id")
}

fn add_node(graph: &mut WorkingGraph, registry: &SchemaRegistry, kind_id: &str, instance: u32) {
    apply_op(
        graph,
        registry,
        &GraphOp::AddNode {
            kind_id: kind(kind_id),
            instance_id: InstanceId::new(instance),
        },
    )
    .expect("add node");
}

fn end(instance: u32, pin: u32) -> LinkEnd {
    LinkEnd::new(InstanceId::new(instance), pin)
}

/// Input pins must never carry a link and a literal at once; checked after
/// every mutation in these tests, not just at the end.
fn assert_no_double_binding(graph: &WorkingGraph, registry: &SchemaRegistry) {
    for link in graph.links() {
        let dst = link.dst();
        let node = graph.node(dst.instance_id()).expect("link endpoint exists");
        let kind = registry.lookup(node.kind_id()).expect("kind exists");
        let pin = kind.input(dst.pin()).expect("input pin exists");
        assert!(
            node.literal(pin.name()).is_none(),
            "pin '{}' of {} is both linked and literal",
            pin.name(),
            dst.instance_id()
        );
    }
}

#[test]
fn duplicate_instance_is_rejected() {
    let registry = registry();
    let mut graph = WorkingGraph::new();
    add_node(&mut graph, &registry, "math.add", 1);

    let result = apply_op(
        &mut graph,
        &registry,
        &GraphOp::AddNode {
            kind_id: kind("math.add"),
            instance_id: InstanceId::new(1),
        },
    );
    assert_eq!(
        result,
        Err(GraphError::DuplicateInstance { instance_id: InstanceId::new(1) })
    );
    assert_eq!(graph.nodes().len(), 1);
}

#[test]
fn unknown_kind_reports_a_suggestion() {
    let registry = registry();
    let mut graph = WorkingGraph::new();

    let result = apply_op(
        &mut graph,
        &registry,
        &GraphOp::AddNode {
            kind_id: kind("math.ad"),
            instance_id: InstanceId::new(1),
        },
    );
    let Err(GraphError::UnknownKind { kind_id, suggestion }) = result else {
        panic!("expected UnknownKind");
    };
    assert_eq!(kind_id.as_str(), "math.ad");
    assert_eq!(suggestion.map(|k| k.as_str().to_owned()).as_deref(), Some("math.add"));
    assert!(graph.nodes().is_empty());
}

#[test]
fn remove_node_cascades_links_and_reports_the_count() {
    let registry = registry();
    let mut graph = WorkingGraph::new();
    add_node(&mut graph, &registry, "math.add", 1);
    add_node(&mut graph, &registry, "math.add", 2);
    add_node(&mut graph, &registry, "math.compare", 3);

    apply_op(&mut graph, &registry, &GraphOp::AddLink { src: end(1, 0), dst: end(3, 0) })
        .expect("link 1 -> 3");
    apply_op(&mut graph, &registry, &GraphOp::AddLink { src: end(2, 0), dst: end(3, 1) })
        .expect("link 2 -> 3");
    assert_no_double_binding(&graph, &registry);

    let receipt = apply_op(
        &mut graph,
        &registry,
        &GraphOp::RemoveNode { instance_id: InstanceId::new(3) },
    )
    .expect("remove node");
    assert_eq!(
        receipt,
        OpReceipt::NodeRemoved { instance_id: InstanceId::new(3), removed_links: 2 }
    );
    assert!(graph.links().is_empty());
    assert_eq!(graph.nodes().len(), 2);
}

#[test]
fn removing_an_absent_instance_has_no_side_effects() {
    let registry = registry();
    let mut graph = WorkingGraph::new();
    add_node(&mut graph, &registry, "math.add", 1);
    let snapshot = graph.clone();

    let result = apply_op(
        &mut graph,
        &registry,
        &GraphOp::RemoveNode { instance_id: InstanceId::new(9) },
    );
    assert_eq!(
        result,
        Err(GraphError::UnknownInstance { instance_id: InstanceId::new(9) })
    );
    assert_eq!(graph, snapshot);
}

#[test]
fn numeric_output_cannot_feed_a_text_input() {
    let registry = registry();
    let mut graph = WorkingGraph::new();
    add_node(&mut graph, &registry, "math.add", 1);
    add_node(&mut graph, &registry, "debug.print", 2);

    // debug.print input 1 is the text message pin; math.add output 0 is a
    // float.
    let result = apply_op(
        &mut graph,
        &registry,
        &GraphOp::AddLink { src: end(1, 0), dst: end(2, 1) },
    );
    assert!(matches!(result, Err(GraphError::PinTypeMismatch { .. })));
    assert!(graph.links().is_empty());
}

#[test]
fn int_output_feeding_a_float_input_is_a_valid_coercion() {
    let registry = registry();
    let mut graph = WorkingGraph::new();
    add_node(&mut graph, &registry, "math.add", 1);

    apply_op(
        &mut graph,
        &registry,
        &GraphOp::SetLiteral {
            instance_id: InstanceId::new(1),
            pin_name: "a".to_owned(),
            value: Value::Int(4),
        },
    )
    .expect("int literal coerces onto a float pin");
}

#[test]
fn linking_a_bound_input_fails_both_ways() {
    let registry = registry();
    let mut graph = WorkingGraph::new();
    add_node(&mut graph, &registry, "math.add", 1);
    add_node(&mut graph, &registry, "math.add", 2);
    add_node(&mut graph, &registry, "math.compare", 3);

    // Literal first, then link: rejected.
    apply_op(
        &mut graph,
        &registry,
        &GraphOp::SetLiteral {
            instance_id: InstanceId::new(3),
            pin_name: "a".to_owned(),
            value: Value::Float(1.0),
        },
    )
    .expect("literal");
    let result = apply_op(
        &mut graph,
        &registry,
        &GraphOp::AddLink { src: end(1, 0), dst: end(3, 0) },
    );
    assert!(matches!(result, Err(GraphError::InputAlreadyBound { .. })));
    assert_no_double_binding(&graph, &registry);

    // Link first, then literal: also rejected.
    apply_op(&mut graph, &registry, &GraphOp::AddLink { src: end(1, 0), dst: end(3, 1) })
        .expect("link");
    let result = apply_op(
        &mut graph,
        &registry,
        &GraphOp::SetLiteral {
            instance_id: InstanceId::new(3),
            pin_name: "b".to_owned(),
            value: Value::Float(2.0),
        },
    );
    assert!(matches!(result, Err(GraphError::InputAlreadyBound { .. })));
    assert_no_double_binding(&graph, &registry);

    // A second link into the same input is rejected too.
    let result = apply_op(
        &mut graph,
        &registry,
        &GraphOp::AddLink { src: end(2, 0), dst: end(3, 1) },
    );
    assert!(matches!(result, Err(GraphError::InputAlreadyBound { .. })));
}

#[test]
fn exec_cycle_is_refused_and_graph_left_untouched() {
    let registry = registry();
    let mut graph = WorkingGraph::new();
    add_node(&mut graph, &registry, "debug.print", 1);
    add_node(&mut graph, &registry, "debug.print", 2);
    add_node(&mut graph, &registry, "debug.print", 3);

    apply_op(&mut graph, &registry, &GraphOp::AddLink { src: end(1, 0), dst: end(2, 0) })
        .expect("1 -> 2");
    apply_op(&mut graph, &registry, &GraphOp::AddLink { src: end(2, 0), dst: end(3, 0) })
        .expect("2 -> 3");

    let snapshot = graph.clone();
    let result = apply_op(
        &mut graph,
        &registry,
        &GraphOp::AddLink { src: end(3, 0), dst: end(1, 0) },
    );
    assert_eq!(
        result,
        Err(GraphError::WouldCreateCycle {
            src: InstanceId::new(3),
            dst: InstanceId::new(1),
        })
    );
    assert_eq!(graph, snapshot);
}

#[test]
fn exec_self_loop_is_a_cycle() {
    let registry = registry();
    let mut graph = WorkingGraph::new();
    add_node(&mut graph, &registry, "debug.print", 1);

    let result = apply_op(
        &mut graph,
        &registry,
        &GraphOp::AddLink { src: end(1, 0), dst: end(1, 0) },
    );
    assert!(matches!(result, Err(GraphError::WouldCreateCycle { .. })));
}

#[test]
fn data_links_are_exempt_from_the_acyclicity_rule() {
    let registry = registry();
    let mut graph = WorkingGraph::new();
    add_node(&mut graph, &registry, "math.add", 1);
    add_node(&mut graph, &registry, "math.add", 2);

    apply_op(&mut graph, &registry, &GraphOp::AddLink { src: end(1, 0), dst: end(2, 0) })
        .expect("1 -> 2");
    // Back-edge over data pins is allowed; only exec edges must stay acyclic.
    apply_op(&mut graph, &registry, &GraphOp::AddLink { src: end(2, 0), dst: end(1, 0) })
        .expect("2 -> 1");
}

#[test]
fn remove_link_requires_an_existing_link() {
    let registry = registry();
    let mut graph = WorkingGraph::new();
    add_node(&mut graph, &registry, "math.add", 1);
    add_node(&mut graph, &registry, "math.compare", 2);

    apply_op(&mut graph, &registry, &GraphOp::AddLink { src: end(1, 0), dst: end(2, 0) })
        .expect("link");
    apply_op(&mut graph, &registry, &GraphOp::RemoveLink { dst: end(2, 0) }).expect("unlink");

    let result = apply_op(&mut graph, &registry, &GraphOp::RemoveLink { dst: end(2, 0) });
    assert_eq!(result, Err(GraphError::LinkNotFound { dst: end(2, 0) }));
}

#[test]
fn literals_are_validated_against_the_pin_signature() {
    let registry = registry();
    let mut graph = WorkingGraph::new();
    add_node(&mut graph, &registry, "math.add", 1);

    let result = apply_op(
        &mut graph,
        &registry,
        &GraphOp::SetLiteral {
            instance_id: InstanceId::new(1),
            pin_name: "a".to_owned(),
            value: Value::Text("four".to_owned()),
        },
    );
    assert!(matches!(result, Err(GraphError::TypeMismatch { .. })));

    let result = apply_op(
        &mut graph,
        &registry,
        &GraphOp::SetLiteral {
            instance_id: InstanceId::new(1),
            pin_name: "missing".to_owned(),
            value: Value::Float(1.0),
        },
    );
    assert!(matches!(result, Err(GraphError::UnknownPin { .. })));
}

#[test]
fn literals_cannot_target_exec_pins() {
    let registry = registry();
    let mut graph = WorkingGraph::new();
    add_node(&mut graph, &registry, "debug.print", 1);

    let result = apply_op(
        &mut graph,
        &registry,
        &GraphOp::SetLiteral {
            instance_id: InstanceId::new(1),
            pin_name: "run".to_owned(),
            value: Value::Bool(true),
        },
    );
    assert!(matches!(result, Err(GraphError::TypeMismatch { .. })));
}

#[test]
fn clear_literal_requires_an_existing_override() {
    let registry = registry();
    let mut graph = WorkingGraph::new();
    add_node(&mut graph, &registry, "debug.print", 1);

    let result = apply_op(
        &mut graph,
        &registry,
        &GraphOp::ClearLiteral {
            instance_id: InstanceId::new(1),
            pin_name: "message".to_owned(),
        },
    );
    assert!(matches!(result, Err(GraphError::LiteralNotSet { .. })));

    apply_op(
        &mut graph,
        &registry,
        &GraphOp::SetLiteral {
            instance_id: InstanceId::new(1),
            pin_name: "message".to_owned(),
            value: Value::Text("hello".to_owned()),
        },
    )
    .expect("literal");
    apply_op(
        &mut graph,
        &registry,
        &GraphOp::ClearLiteral {
            instance_id: InstanceId::new(1),
            pin_name: "message".to_owned(),
        },
    )
    .expect("clear");
    assert!(graph
        .node(InstanceId::new(1))
        .expect("node")
        .literal("message")
        .is_none());
}

#[test]
fn every_successful_mutation_marks_the_graph_dirty() {
    let registry = registry();
    let mut graph = WorkingGraph::new();

    add_node(&mut graph, &registry, "math.add", 1);
    assert!(graph.is_dirty());

    graph.clear_dirty();
    apply_op(
        &mut graph,
        &registry,
        &GraphOp::SetLiteral {
            instance_id: InstanceId::new(1),
            pin_name: "a".to_owned(),
            value: Value::Float(1.0),
        },
    )
    .expect("literal");
    assert!(graph.is_dirty());

    graph.clear_dirty();
    let result = apply_op(
        &mut graph,
        &registry,
        &GraphOp::RemoveNode { instance_id: InstanceId::new(9) },
    );
    assert!(result.is_err());
    assert!(!graph.is_dirty(), "failed ops must not dirty the graph");
}
