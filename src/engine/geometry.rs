// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Authoritative node, edge and decoration geometry, plus the per-node derived slot cache.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use log::{debug, trace};

use super::Engine;
use crate::error::EngineError;
use crate::model::geometry::distance_to_segment;
use crate::model::{
    Anchor, Decoration, DecorationId, Edge, EdgeEnd, EdgeId, EndpointRef, EntityRef, MarkerRef,
    Node, NodeId, Point, Rect, Side, SlotKey,
};
use crate::ops::{Command, GeometrySnapshot, MoveRecord};

/// Coordinates recomputed whenever a node's rect changes.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedGeometry {
    slots: BTreeMap<SlotKey, Point>,
    midpoints: BTreeMap<Side, Point>,
}

impl DerivedGeometry {
    fn compute(rect: Rect, spacing: f64) -> Self {
        let origin = rect.origin();
        let slots = SlotKey::ALL
            .iter()
            .map(|slot| (*slot, origin.add(slot.offset(rect.width, rect.height, spacing))))
            .collect();
        let center = rect.center();
        let midpoints = Side::ALL
            .iter()
            .map(|side| {
                let at = match side {
                    Side::North => Point::new(center.x, rect.top()),
                    Side::South => Point::new(center.x, rect.bottom()),
                    Side::West => Point::new(rect.left(), center.y),
                    Side::East => Point::new(rect.right(), center.y),
                };
                (*side, at)
            })
            .collect();
        Self { slots, midpoints }
    }

    /// Absolute slot coordinate.
    pub fn slot(&self, slot: SlotKey) -> Option<Point> {
        self.slots.get(&slot).copied()
    }

    pub fn side_midpoint(&self, side: Side) -> Option<Point> {
        self.midpoints.get(&side).copied()
    }
}

#[derive(Debug, Clone, Default)]
pub struct GeometryStore {
    nodes: IndexMap<NodeId, Node>,
    edges: IndexMap<EdgeId, Edge>,
    decorations: IndexMap<DecorationId, Decoration>,
    derived: BTreeMap<NodeId, DerivedGeometry>,
    marker_spacing: f64,
}

impl GeometryStore {
    pub(crate) fn new(marker_spacing: f64) -> Self {
        Self {
            marker_spacing,
            ..Self::default()
        }
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Nodes in insertion order; later nodes draw on top.
    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = (&NodeId, &Node)> {
        self.nodes.iter()
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn edges(&self) -> impl DoubleEndedIterator<Item = (&EdgeId, &Edge)> {
        self.edges.iter()
    }

    pub fn decoration(&self, id: &DecorationId) -> Option<&Decoration> {
        self.decorations.get(id)
    }

    pub fn decorations(&self) -> impl DoubleEndedIterator<Item = (&DecorationId, &Decoration)> {
        self.decorations.iter()
    }

    pub fn derived(&self, id: &NodeId) -> Option<&DerivedGeometry> {
        self.derived.get(id)
    }

    pub fn contains(&self, entity: &EntityRef) -> bool {
        match entity {
            EntityRef::Node(id) => self.nodes.contains_key(id),
            EntityRef::Edge(id) => self.edges.contains_key(id),
            EntityRef::Decoration(id) => self.decorations.contains_key(id),
            EntityRef::Marker(marker) => self.nodes.contains_key(&marker.node),
            EntityRef::Group(_) => false,
        }
    }

    pub(crate) fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub(crate) fn edge_mut(&mut self, id: &EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(id)
    }

    pub(crate) fn edges_mut(&mut self) -> impl Iterator<Item = (&EdgeId, &mut Edge)> {
        self.edges.iter_mut()
    }

    pub(crate) fn decoration_mut(&mut self, id: &DecorationId) -> Option<&mut Decoration> {
        self.decorations.get_mut(id)
    }

    pub(crate) fn set_node_rect(&mut self, id: &NodeId, rect: Rect) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        node.set_rect(rect);
        self.derived
            .insert(id.clone(), DerivedGeometry::compute(rect, self.marker_spacing));
        true
    }

    pub(crate) fn insert_node(&mut self, id: NodeId, node: Node, index: Option<usize>) {
        self.derived.insert(
            id.clone(),
            DerivedGeometry::compute(node.rect(), self.marker_spacing),
        );
        insert_at(&mut self.nodes, id, node, index);
    }

    pub(crate) fn remove_node(&mut self, id: &NodeId) -> Option<(usize, Node)> {
        self.derived.remove(id);
        self.nodes
            .shift_remove_full(id)
            .map(|(index, _, node)| (index, node))
    }

    pub(crate) fn insert_edge(&mut self, id: EdgeId, edge: Edge, index: Option<usize>) {
        insert_at(&mut self.edges, id, edge, index);
    }

    pub(crate) fn remove_edge(&mut self, id: &EdgeId) -> Option<(usize, Edge)> {
        self.edges
            .shift_remove_full(id)
            .map(|(index, _, edge)| (index, edge))
    }

    pub(crate) fn insert_decoration(
        &mut self,
        id: DecorationId,
        decoration: Decoration,
        index: Option<usize>,
    ) {
        insert_at(&mut self.decorations, id, decoration, index);
    }

    pub(crate) fn remove_decoration(&mut self, id: &DecorationId) -> Option<(usize, Decoration)> {
        self.decorations
            .shift_remove_full(id)
            .map(|(index, _, decoration)| (index, decoration))
    }

    pub fn edge_index(&self, id: &EdgeId) -> Option<usize> {
        self.edges.get_index_of(id)
    }

    pub fn node_index(&self, id: &NodeId) -> Option<usize> {
        self.nodes.get_index_of(id)
    }

    pub fn decoration_index(&self, id: &DecorationId) -> Option<usize> {
        self.decorations.get_index_of(id)
    }
}

fn insert_at<K, V>(map: &mut IndexMap<K, V>, key: K, value: V, index: Option<usize>)
where
    K: std::hash::Hash + Eq,
{
    match index {
        Some(index) => {
            let index = index.min(map.len());
            map.shift_insert(index, key, value);
        }
        None => {
            map.insert(key, value);
        }
    }
}

/// What a pointer position resolves to, in pick priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hit {
    Endpoint(EndpointRef),
    Marker(MarkerRef),
    Entity(EntityRef),
}

impl Engine {
    /// Moves a node by `(dx, dy)` and refreshes everything derived from it.
    ///
    /// Returns the delta actually applied. An unknown id is a no-op reported as `NotFound`, so
    /// a batched move can skip it and continue.
    pub fn translate(&mut self, node: &NodeId, dx: f64, dy: f64) -> Result<Point, EngineError> {
        if self.store.node(node).is_none() {
            debug!(node:% = node; "translate skipped, node not found");
            return Err(EngineError::not_found(node.clone()));
        }
        if dx == 0.0 && dy == 0.0 {
            return Ok(Point::ZERO);
        }

        let targets = vec![EntityRef::Node(node.clone())];
        let leaves = BTreeSet::from([EntityRef::Node(node.clone())]);
        let before = self.capture(&leaves);
        let applied = self.translate_raw(node, dx, dy)?;
        self.commit();
        let after = self.capture(&leaves);
        self.record_move(targets, before, after);
        Ok(applied)
    }

    /// Replaces a node's rect. Width and height must be finite and non-negative.
    pub fn resize_node(&mut self, node: &NodeId, rect: Rect) -> Result<(), EngineError> {
        if !rect.is_finite() || rect.width < 0.0 || rect.height < 0.0 {
            return Err(EngineError::constraint(format!("invalid rect for node {node}")));
        }
        if self.store.node(node).is_none() {
            return Err(EngineError::not_found(node.clone()));
        }

        let targets = vec![EntityRef::Node(node.clone())];
        let leaves = BTreeSet::from([EntityRef::Node(node.clone())]);
        let before = self.capture(&leaves);
        self.set_node_rect_raw(node, rect);
        self.commit();
        let after = self.capture(&leaves);
        self.record_move(targets, before, after);
        Ok(())
    }

    /// Overrides the handle distance of one node side; `None` restores the default.
    pub fn set_handle_distance(
        &mut self,
        node: &NodeId,
        side: Side,
        distance: Option<f64>,
    ) -> Result<(), EngineError> {
        let Some(before) = self
            .store
            .node(node)
            .map(|target| target.handle_distance_override(side))
        else {
            return Err(EngineError::not_found(node.clone()));
        };
        if before == distance {
            return Ok(());
        }
        self.set_handle_distance_raw(node, side, distance)?;
        self.commit();
        self.record(Command::HandleDistance {
            node: node.clone(),
            side,
            before,
            after: distance,
        });
        Ok(())
    }

    pub(crate) fn set_handle_distance_raw(
        &mut self,
        node: &NodeId,
        side: Side,
        distance: Option<f64>,
    ) -> Result<(), EngineError> {
        let Some(target) = self.store.node_mut(node) else {
            return Err(EngineError::not_found(node.clone()));
        };
        target.set_handle_distance(side, distance);
        self.touch_node(node);
        Ok(())
    }

    pub(crate) fn translate_raw(
        &mut self,
        node: &NodeId,
        dx: f64,
        dy: f64,
    ) -> Result<Point, EngineError> {
        let Some(rect) = self.store.node(node).map(Node::rect) else {
            return Err(EngineError::not_found(node.clone()));
        };
        trace!(node:% = node, dx = dx, dy = dy; "translate");
        self.set_node_rect_raw(node, rect.translate(dx, dy));
        Ok(Point::new(dx, dy))
    }

    pub(crate) fn set_node_rect_raw(&mut self, node: &NodeId, rect: Rect) {
        if self.store.set_node_rect(node, rect) {
            self.touch_node(node);
        }
    }

    /// Translates a free endpoint; anchored endpoints follow their anchor and stay put.
    pub(crate) fn translate_free_endpoints(&mut self, edge: &EdgeId, dx: f64, dy: f64) -> bool {
        let Some(target) = self.store.edge_mut(edge) else {
            return false;
        };
        for end in EdgeEnd::BOTH {
            let endpoint = target.endpoint_mut(end);
            if let Anchor::Free { at } = endpoint.anchor() {
                let moved = at.offset(dx, dy);
                endpoint.replace_anchor(Anchor::free(moved));
            }
        }
        self.pending.record_updated(EntityRef::Edge(edge.clone()));
        true
    }

    pub(crate) fn translate_decoration(&mut self, id: &DecorationId, dx: f64, dy: f64) -> bool {
        let Some(decoration) = self.store.decoration_mut(id) else {
            return false;
        };
        decoration.set_rect(decoration.rect().translate(dx, dy));
        self.pending.record_updated(EntityRef::Decoration(id.clone()));
        true
    }

    /// Resolves a pointer position: endpoint handles, then markers, nodes (topmost first),
    /// decorations and finally edge segments.
    pub fn hit_test(&self, at: Point) -> Option<Hit> {
        let radius = self.config.endpoint_snap_radius;

        let endpoint = self
            .store
            .edges()
            .flat_map(|(id, edge)| {
                EdgeEnd::BOTH
                    .into_iter()
                    .map(move |end| (id, end, edge.endpoint(end).rendered()))
            })
            .map(|(id, end, point)| (id, end, point.distance(at)))
            .filter(|(_, _, distance)| *distance <= radius)
            .min_by(|a, b| a.2.total_cmp(&b.2));
        if let Some((id, end, _)) = endpoint {
            return Some(Hit::Endpoint(EndpointRef::new(id.clone(), end)));
        }

        for (id, _) in self.store.nodes().rev() {
            for (marker, point) in self.visible_markers(id) {
                if point.distance(at) <= radius {
                    return Some(Hit::Marker(marker));
                }
            }
        }

        if let Some((id, _)) = self
            .store
            .nodes()
            .rev()
            .find(|(_, node)| node.rect().contains(at))
        {
            return Some(Hit::Entity(EntityRef::Node(id.clone())));
        }

        if let Some((id, _)) = self
            .store
            .decorations()
            .rev()
            .find(|(_, decoration)| decoration.rect().contains(at))
        {
            return Some(Hit::Entity(EntityRef::Decoration(id.clone())));
        }

        self.store
            .edges()
            .rev()
            .find(|(_, edge)| {
                let start = edge.endpoint(EdgeEnd::Start).rendered();
                let end = edge.endpoint(EdgeEnd::End).rendered();
                distance_to_segment(at, start, end) <= self.config.edge_hit_tolerance
            })
            .map(|(id, _)| Hit::Entity(EntityRef::Edge(id.clone())))
    }

    /// Leaf entities moved when `targets` move: groups expand to their leaves.
    pub(crate) fn leaves_of(&self, targets: &[EntityRef]) -> BTreeSet<EntityRef> {
        let mut leaves = BTreeSet::new();
        for target in targets {
            match target {
                EntityRef::Group(group) => {
                    leaves.extend(self.groups.collect_leaves(group));
                }
                other => {
                    leaves.insert(other.clone());
                }
            }
        }
        leaves
    }

    /// Geometry of `leaves` plus the whole link table.
    pub(crate) fn capture(&self, leaves: &BTreeSet<EntityRef>) -> GeometrySnapshot {
        let mut snapshot = GeometrySnapshot {
            links: self.links.iter().cloned().collect(),
            ..GeometrySnapshot::default()
        };
        for leaf in leaves {
            match leaf {
                EntityRef::Node(id) => {
                    if let Some(node) = self.store.node(id) {
                        snapshot.nodes.push((id.clone(), node.rect()));
                    }
                }
                EntityRef::Edge(id) => {
                    if let Some(edge) = self.store.edge(id) {
                        snapshot.edges.push((
                            id.clone(),
                            edge.endpoint(EdgeEnd::Start).anchor().clone(),
                            edge.endpoint(EdgeEnd::End).anchor().clone(),
                        ));
                    }
                }
                EntityRef::Decoration(id) => {
                    if let Some(decoration) = self.store.decoration(id) {
                        snapshot.decorations.push((id.clone(), decoration.rect()));
                    }
                }
                EntityRef::Marker(marker) => {
                    if let Some(node) = self.store.node(&marker.node) {
                        let placement = node.marker_override(&marker.variant, &marker.key).cloned();
                        snapshot.markers.push((marker.clone(), placement));
                    }
                }
                EntityRef::Group(_) => {}
            }
        }
        snapshot
    }

    /// Writes a captured snapshot back. Entities that no longer exist are skipped; returns
    /// how many were restored.
    pub(crate) fn apply_snapshot(&mut self, snapshot: &GeometrySnapshot) -> usize {
        let mut restored = 0;

        for (id, rect) in &snapshot.nodes {
            if self.store.node(id).is_some() {
                self.set_node_rect_raw(id, *rect);
                restored += 1;
            } else {
                debug!(node:% = id; "snapshot restore skipped missing node");
            }
        }
        for (id, start, end) in &snapshot.edges {
            if self.store.edge(id).is_none() {
                debug!(edge:% = id; "snapshot restore skipped missing edge");
                continue;
            }
            for (end_kind, anchor) in [(EdgeEnd::Start, start), (EdgeEnd::End, end)] {
                let endpoint = EndpointRef::new(id.clone(), end_kind);
                if let Err(err) = self.set_anchor_raw(&endpoint, anchor.clone()) {
                    debug!(endpoint:% = endpoint, err:% = err; "snapshot anchor not restored");
                }
            }
            restored += 1;
        }
        for (id, rect) in &snapshot.decorations {
            if let Some(decoration) = self.store.decoration_mut(id) {
                decoration.set_rect(*rect);
                self.pending.record_updated(EntityRef::Decoration(id.clone()));
                restored += 1;
            }
        }
        for (marker, placement) in &snapshot.markers {
            if self.set_marker_override_raw(marker, placement.clone()) {
                restored += 1;
            }
        }

        self.replace_links(snapshot.links.iter().cloned());
        restored
    }

    /// Records a move entry unless every coordinate stayed within the no-op tolerance.
    pub(crate) fn record_move(
        &mut self,
        targets: Vec<EntityRef>,
        before: GeometrySnapshot,
        after: GeometrySnapshot,
    ) {
        if before.approx_eq(&after, self.config.move_epsilon) {
            trace!(targets = targets.len(); "move within tolerance, not recorded");
            return;
        }
        let record = MoveRecord {
            targets,
            before,
            after,
        };
        let command = if record.targets.len() > 1 {
            crate::ops::Command::MultiMove(record)
        } else {
            crate::ops::Command::Move(record)
        };
        self.record(command);
    }
}
