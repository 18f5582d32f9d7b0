// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The session-owned working graph.
//!
//! A [`WorkingGraph`] is the mutable graph a remote peer assembles before it
//! is handed to the host compiler. Nodes are keyed by caller-chosen
//! [`InstanceId`]s so the whole structure snapshots and compares cheaply;
//! structural invariants are enforced by the `ops` layer before anything is
//! inserted here.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use smol_str::SmolStr;

use super::ids::{InstanceId, KindId};
use super::value::Value;

/// One endpoint of a link: a node instance plus a pin index on that node.
/// Whether the index counts inputs or outputs depends on which side of the
/// link the endpoint sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LinkEnd {
    instance_id: InstanceId,
    pin: u32,
}

impl LinkEnd {
    pub fn new(instance_id: InstanceId, pin: u32) -> Self {
        Self { instance_id, pin }
    }

    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }
}

impl fmt::Display for LinkEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.pin{}", self.instance_id, self.pin)
    }
}

/// A committed connection from an output pin to an input pin.
///
/// `exec` is resolved against the catalog once, when the link is validated,
/// so cycle checks never need to consult the registry again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    src: LinkEnd,
    dst: LinkEnd,
    exec: bool,
}

impl Link {
    pub fn new(src: LinkEnd, dst: LinkEnd, exec: bool) -> Self {
        Self { src, dst, exec }
    }

    pub fn src(&self) -> LinkEnd {
        self.src
    }

    pub fn dst(&self) -> LinkEnd {
        self.dst
    }

    pub fn is_exec(&self) -> bool {
        self.exec
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeInstance {
    kind_id: KindId,
    literals: BTreeMap<SmolStr, Value>,
}

impl NodeInstance {
    pub fn new(kind_id: KindId) -> Self {
        Self {
            kind_id,
            literals: BTreeMap::new(),
        }
    }

    pub fn kind_id(&self) -> &KindId {
        &self.kind_id
    }

    pub fn literals(&self) -> &BTreeMap<SmolStr, Value> {
        &self.literals
    }

    pub fn literal(&self, pin_name: &str) -> Option<&Value> {
        self.literals.get(pin_name)
    }

    pub fn set_literal(&mut self, pin_name: impl AsRef<str>, value: Value) {
        self.literals.insert(SmolStr::new(pin_name.as_ref()), value);
    }

    pub fn clear_literal(&mut self, pin_name: &str) -> Option<Value> {
        self.literals.remove(pin_name)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkingGraph {
    nodes: BTreeMap<InstanceId, NodeInstance>,
    links: Vec<Link>,
    dirty: bool,
}

impl WorkingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &BTreeMap<InstanceId, NodeInstance> {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut BTreeMap<InstanceId, NodeInstance> {
        &mut self.nodes
    }

    pub fn node(&self, instance_id: InstanceId) -> Option<&NodeInstance> {
        self.nodes.get(&instance_id)
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn links_mut(&mut self) -> &mut Vec<Link> {
        &mut self.links
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Called when the graph is materialized into the host; the next mutation
    /// re-dirties it and invalidates the staged copy.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// The link feeding a given input pin, if any. Input pins accept at most
    /// one incoming link, so this is unambiguous.
    pub fn link_into(&self, dst: LinkEnd) -> Option<&Link> {
        self.links.iter().find(|link| link.dst() == dst)
    }

    pub fn links_touching(&self, instance_id: InstanceId) -> usize {
        self.links
            .iter()
            .filter(|link| {
                link.src().instance_id() == instance_id || link.dst().instance_id() == instance_id
            })
            .count()
    }

    /// Whether `to` is reachable from `from` by walking exec links forward.
    /// Used to refuse a control-flow edge that would close a cycle: adding
    /// `src -> dst` is illegal when `src` is already reachable from `dst`.
    pub fn exec_reaches(&self, from: InstanceId, to: InstanceId) -> bool {
        if from == to {
            return true;
        }

        let mut seen = BTreeSet::new();
        let mut frontier = vec![from];
        while let Some(current) = frontier.pop() {
            if !seen.insert(current) {
                continue;
            }
            for link in self.links.iter().filter(|link| link.is_exec()) {
                if link.src().instance_id() != current {
                    continue;
                }
                let next = link.dst().instance_id();
                if next == to {
                    return true;
                }
                frontier.push(next);
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::{Link, LinkEnd, NodeInstance, WorkingGraph};
    use crate::model::{InstanceId, KindId, Value};

    fn end(instance: u32, pin: u32) -> LinkEnd {
        LinkEnd::new(InstanceId::new(instance), pin)
    }

    fn graph_with_exec_chain() -> WorkingGraph {
        // 1 -> 2 -> 3 over exec links, plus a data link 3 -> 2 that must not
        // participate in reachability.
        let mut graph = WorkingGraph::new();
        for instance in 1..=3 {
            graph.nodes_mut().insert(
                InstanceId::new(instance),
                NodeInstance::new(KindId::new("demo.kind").expect("kind id")),
            );
        }
        graph.links_mut().push(Link::new(end(1, 0), end(2, 0), true));
        graph.links_mut().push(Link::new(end(2, 0), end(3, 0), true));
        graph.links_mut().push(Link::new(end(3, 1), end(2, 1), false));
        graph
    }

    #[test]
    fn exec_reachability_follows_only_exec_links() {
        let graph = graph_with_exec_chain();
        let n1 = InstanceId::new(1);
        let n2 = InstanceId::new(2);
        let n3 = InstanceId::new(3);

        assert!(graph.exec_reaches(n1, n3));
        assert!(graph.exec_reaches(n2, n3));
        // The data link back from 3 to 2 does not count.
        assert!(!graph.exec_reaches(n3, n2));
        assert!(!graph.exec_reaches(n3, n1));
    }

    #[test]
    fn exec_reachability_is_reflexive() {
        let graph = graph_with_exec_chain();
        assert!(graph.exec_reaches(InstanceId::new(2), InstanceId::new(2)));
    }

    #[test]
    fn link_into_finds_the_feeding_link() {
        let graph = graph_with_exec_chain();
        let link = graph.link_into(end(2, 0)).expect("link into 2.in0");
        assert_eq!(link.src(), end(1, 0));
        assert!(graph.link_into(end(1, 0)).is_none());
    }

    #[test]
    fn links_touching_counts_both_directions() {
        let graph = graph_with_exec_chain();
        assert_eq!(graph.links_touching(InstanceId::new(2)), 3);
        assert_eq!(graph.links_touching(InstanceId::new(1)), 1);
        assert_eq!(graph.links_touching(InstanceId::new(9)), 0);
    }

    #[test]
    fn literal_overrides_round_trip_per_pin_name() {
        let mut node = NodeInstance::new(KindId::new("demo.kind").expect("kind id"));
        assert!(node.literal("a").is_none());

        node.set_literal("a", Value::Int(4));
        assert_eq!(node.literal("a"), Some(&Value::Int(4)));

        assert_eq!(node.clear_literal("a"), Some(Value::Int(4)));
        assert!(node.literal("a").is_none());
        assert!(node.clear_literal("a").is_none());
    }
}
