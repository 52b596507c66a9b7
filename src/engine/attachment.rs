// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Node-side attachment lists and edge-to-edge chains.
//!
//! The index is derived purely from edge anchors and is rebuilt from scratch after every
//! mutation rather than patched.

use std::collections::BTreeMap;

use log::{debug, trace, warn};
use smallvec::SmallVec;

use super::geometry::GeometryStore;
use super::traverse::{follow, ChainEnd};
use super::Engine;
use crate::error::EngineError;
use crate::model::geometry::distance_to_segment;
use crate::model::{
    Anchor, Edge, EdgeEnd, EdgeId, EdgeKind, EndpointRef, EntityRef, NodeId, NodeSide, Point,
    Rect, Side,
};
use crate::ops::{Command, EdgeStyle, EntityPayload, EntityRecord};

type SideList = SmallVec<[EndpointRef; 4]>;

#[derive(Debug, Clone, Default)]
pub struct AttachmentIndex {
    sides: BTreeMap<NodeSide, SideList>,
    slaves: BTreeMap<EndpointRef, Vec<EndpointRef>>,
}

impl AttachmentIndex {
    /// Full rescan of every edge anchor.
    pub(crate) fn rebuild(store: &GeometryStore) -> Self {
        let mut keyed: BTreeMap<NodeSide, Vec<(f64, EndpointRef)>> = BTreeMap::new();
        let mut slaves: BTreeMap<EndpointRef, Vec<EndpointRef>> = BTreeMap::new();

        for (id, edge) in store.edges() {
            for end in EdgeEnd::BOTH {
                let endpoint = EndpointRef::new(id.clone(), end);
                match edge.endpoint(end).anchor() {
                    Anchor::Node { node, side } => {
                        let key = far_end_key(store, edge, end, *side);
                        keyed
                            .entry(NodeSide::new(node.clone(), *side))
                            .or_default()
                            .push((key, endpoint));
                    }
                    Anchor::Chained { to } => {
                        slaves.entry(to.clone()).or_default().push(endpoint);
                    }
                    Anchor::Free { .. } => {}
                }
            }
        }

        let sides = keyed
            .into_iter()
            .map(|(side, mut entries)| {
                entries.sort_by(|a, b| a.0.total_cmp(&b.0));
                (side, entries.into_iter().map(|(_, endpoint)| endpoint).collect())
            })
            .collect();

        Self { sides, slaves }
    }

    /// Endpoints anchored on one node side, in order along the side.
    pub fn side_list(&self, node: &NodeId, side: Side) -> &[EndpointRef] {
        self.sides
            .get(&NodeSide::new(node.clone(), side))
            .map(SmallVec::as_slice)
            .unwrap_or_default()
    }

    /// Endpoints chained to `master`.
    pub fn slaves_of(&self, master: &EndpointRef) -> &[EndpointRef] {
        self.slaves
            .get(master)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.sides.is_empty() && self.slaves.is_empty()
    }
}

/// Sort key along the side: x of the far end for North/South sides, y for East/West.
fn far_end_key(store: &GeometryStore, edge: &Edge, end: EdgeEnd, side: Side) -> f64 {
    let far = edge.endpoint(end.other());
    let reference = match far.anchor() {
        Anchor::Node { node, .. } => store
            .node(node)
            .map(|n| n.rect().center())
            .unwrap_or_else(|| far.rendered()),
        Anchor::Free { at } => *at,
        Anchor::Chained { .. } => far.rendered(),
    };
    match side {
        Side::North | Side::South => reference.x,
        Side::East | Side::West => reference.y,
    }
}

/// Point at `fraction` along `side`, `distance` outside the rect.
fn side_point(rect: Rect, side: Side, fraction: f64, distance: f64) -> Point {
    match side {
        Side::North => Point::new(rect.x + rect.width * fraction, rect.top() - distance),
        Side::South => Point::new(rect.x + rect.width * fraction, rect.bottom() + distance),
        Side::West => Point::new(rect.left() - distance, rect.y + rect.height * fraction),
        Side::East => Point::new(rect.right() + distance, rect.y + rect.height * fraction),
    }
}

/// The handle line of a side: the side itself pushed out by the handle distance.
fn handle_segment(rect: Rect, side: Side, distance: f64) -> (Point, Point) {
    (side_point(rect, side, 0.0, distance), side_point(rect, side, 1.0, distance))
}

fn axis_snap(at: Point, other: Point, degrees: f64) -> Point {
    let delta = at.sub(other);
    if delta.is_zero() {
        return at;
    }
    let angle = delta.y.atan2(delta.x).to_degrees().rem_euclid(90.0);
    let off_axis = angle.min(90.0 - angle);
    if off_axis > degrees {
        return at;
    }
    if delta.x.abs() >= delta.y.abs() {
        Point::new(at.x, other.y)
    } else {
        Point::new(other.x, at.y)
    }
}

impl Engine {
    pub fn attachments(&self) -> &AttachmentIndex {
        &self.attachments
    }

    /// Anchors an endpoint to a node side or another endpoint, replacing any previous anchor.
    ///
    /// Rejects unknown targets, chaining to the edge's own endpoints, and chains that would
    /// cycle. A rejected attach leaves the previous anchor in place.
    pub fn attach(&mut self, endpoint: &EndpointRef, target: Anchor) -> Result<(), EngineError> {
        let before = self.set_anchor_raw(endpoint, target.clone())?;
        self.commit();
        self.record(Command::SetAnchor {
            endpoint: endpoint.clone(),
            before,
            after: target,
        });
        Ok(())
    }

    /// Frees an endpoint at the coordinate it was last drawn at.
    pub fn detach(&mut self, endpoint: &EndpointRef) -> Result<Point, EngineError> {
        let at = self.rendered_endpoint(endpoint)?;
        self.attach(endpoint, Anchor::free(at))?;
        Ok(at)
    }

    /// Where an endpoint currently resolves to.
    pub fn resolve_endpoint_position(&self, endpoint: &EndpointRef) -> Result<Point, EngineError> {
        let walk = follow(endpoint.clone(), |current| {
            let to = self
                .store
                .edge(&current.edge)?
                .endpoint(current.end)
                .anchor()
                .chained_to()?;
            self.store.edge(&to.edge).is_some().then(|| to.clone())
        });
        let terminal = match walk {
            ChainEnd::Terminal(terminal) => terminal,
            ChainEnd::Cycle(repeated) => {
                return Err(EngineError::CycleDetected { endpoint: repeated })
            }
        };

        let edge = self
            .store
            .edge(&terminal.edge)
            .ok_or_else(|| EngineError::not_found(terminal.edge.clone()))?;
        let slot = edge.endpoint(terminal.end);
        match slot.anchor() {
            Anchor::Free { at } => Ok(*at),
            // A dangling chain target resolves to the last drawn coordinate.
            Anchor::Chained { .. } => Ok(slot.rendered()),
            Anchor::Node { node, side } => {
                let host = self
                    .store
                    .node(node)
                    .ok_or_else(|| EngineError::not_found(node.clone()))?;
                let (fraction, distance) = if edge.dashed() {
                    (0.5, 0.0)
                } else {
                    let ranked: Vec<&EndpointRef> = self
                        .attachments
                        .side_list(node, *side)
                        .iter()
                        .filter(|candidate| {
                            self.store
                                .edge(&candidate.edge)
                                .is_some_and(|edge| !edge.dashed())
                        })
                        .collect();
                    let rank = ranked
                        .iter()
                        .position(|candidate| **candidate == terminal)
                        .unwrap_or(ranked.len());
                    let count = ranked.len().max(rank + 1);
                    let fraction = (rank + 1) as f64 / (count + 1) as f64;
                    (fraction, host.handle_distance(*side, self.config.handle_distance))
                };
                Ok(side_point(host.rect(), *side, fraction, distance))
            }
        }
    }

    /// Full rescan after bulk structural edits.
    pub fn rebuild_from_topology(&mut self) {
        self.commit();
    }

    /// Rebuilds the index and re-resolves every endpoint, reporting edges whose drawn
    /// coordinates changed.
    pub(crate) fn refresh_attachments(&mut self) {
        self.attachments = AttachmentIndex::rebuild(&self.store);

        let mut resolved = Vec::new();
        for (id, edge) in self.store.edges() {
            for end in EdgeEnd::BOTH {
                let endpoint = EndpointRef::new(id.clone(), end);
                let at = match self.resolve_endpoint_position(&endpoint) {
                    Ok(at) => at,
                    Err(err) => {
                        warn!(endpoint:% = endpoint, err:% = err; "keeping last drawn coordinate");
                        edge.endpoint(end).rendered()
                    }
                };
                if at != edge.endpoint(end).rendered() {
                    resolved.push((endpoint, at));
                }
            }
        }

        trace!(changed = resolved.len(); "endpoint refresh");
        for (endpoint, at) in resolved {
            if let Some(edge) = self.store.edge_mut(&endpoint.edge) {
                edge.endpoint_mut(endpoint.end).set_rendered(at);
            }
            self.pending.record_updated(EntityRef::Edge(endpoint.edge));
        }
    }

    fn rendered_endpoint(&self, endpoint: &EndpointRef) -> Result<Point, EngineError> {
        self.store
            .edge(&endpoint.edge)
            .map(|edge| edge.endpoint(endpoint.end).rendered())
            .ok_or_else(|| EngineError::not_found(endpoint.edge.clone()))
    }

    fn validate_anchor(&self, endpoint: &EndpointRef, anchor: &Anchor) -> Result<(), EngineError> {
        match anchor {
            Anchor::Free { at } => {
                if at.x.is_finite() && at.y.is_finite() {
                    Ok(())
                } else {
                    Err(EngineError::invalid_topology("free endpoint is not finite"))
                }
            }
            Anchor::Node { node, .. } => {
                if self.store.node(node).is_some() {
                    Ok(())
                } else {
                    Err(EngineError::invalid_topology(format!(
                        "anchor target node {node} does not exist"
                    )))
                }
            }
            Anchor::Chained { to } => {
                if to.edge == endpoint.edge {
                    return Err(EngineError::invalid_topology(format!(
                        "{endpoint} cannot chain to its own edge"
                    )));
                }
                if self.store.edge(&to.edge).is_none() {
                    return Err(EngineError::invalid_topology(format!(
                        "chain target {to} does not exist"
                    )));
                }
                let walk = follow(to.clone(), |current| {
                    if current == endpoint {
                        return None;
                    }
                    self.store
                        .edge(&current.edge)?
                        .endpoint(current.end)
                        .anchor()
                        .chained_to()
                        .cloned()
                });
                match walk {
                    ChainEnd::Terminal(last) if &last != endpoint => Ok(()),
                    _ => Err(EngineError::invalid_topology(format!(
                        "chaining {endpoint} to {to} would form a cycle"
                    ))),
                }
            }
        }
    }

    /// Validates and swaps in a new anchor without recording history. Returns the old anchor.
    pub(crate) fn set_anchor_raw(
        &mut self,
        endpoint: &EndpointRef,
        anchor: Anchor,
    ) -> Result<Anchor, EngineError> {
        if self.store.edge(&endpoint.edge).is_none() {
            return Err(EngineError::not_found(endpoint.edge.clone()));
        }
        self.validate_anchor(endpoint, &anchor)?;
        let edge = self
            .store
            .edge_mut(&endpoint.edge)
            .ok_or_else(|| EngineError::not_found(endpoint.edge.clone()))?;
        let previous = edge.endpoint_mut(endpoint.end).replace_anchor(anchor);
        self.pending.record_updated(EntityRef::Edge(endpoint.edge.clone()));
        Ok(previous)
    }

    /// Anchor a dragged endpoint released at `at` resolves to: a node side handle within the
    /// snap radius, else another edge's endpoint within the radius, else a free coordinate
    /// (axis-snapped against the other end when `axis_lock` is held).
    pub fn resolve_drop(&self, endpoint: &EndpointRef, at: Point, axis_lock: bool) -> Anchor {
        let radius = self.config.endpoint_snap_radius;

        let side = self
            .store
            .nodes()
            .flat_map(|(id, node)| {
                Side::ALL.into_iter().map(move |side| {
                    let distance = node.handle_distance(side, self.config.handle_distance);
                    let (a, b) = handle_segment(node.rect(), side, distance);
                    (id, side, distance_to_segment(at, a, b))
                })
            })
            .filter(|(_, _, distance)| *distance <= radius)
            .min_by(|a, b| a.2.total_cmp(&b.2));
        if let Some((node, side, _)) = side {
            return Anchor::Node {
                node: node.clone(),
                side,
            };
        }

        let chained = self
            .store
            .edges()
            .filter(|(id, _)| **id != endpoint.edge)
            .flat_map(|(id, edge)| {
                EdgeEnd::BOTH.into_iter().map(move |end| {
                    let distance = edge.endpoint(end).rendered().distance(at);
                    (EndpointRef::new(id.clone(), end), distance)
                })
            })
            .filter(|(_, distance)| *distance <= radius)
            .filter(|(to, _)| {
                self.validate_anchor(endpoint, &Anchor::Chained { to: to.clone() })
                    .is_ok()
            })
            .min_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((to, _)) = chained {
            return Anchor::Chained { to };
        }

        let at = match (axis_lock, self.rendered_endpoint(&endpoint.other_end())) {
            (true, Ok(other)) => axis_snap(at, other, self.config.axis_snap_degrees),
            _ => at,
        };
        Anchor::free(at)
    }

    /// Drops an endpoint at `at` and records the resulting anchor change.
    pub fn drop_endpoint(
        &mut self,
        endpoint: &EndpointRef,
        at: Point,
        axis_lock: bool,
    ) -> Result<Anchor, EngineError> {
        let anchor = self.resolve_drop(endpoint, at, axis_lock);
        self.attach(endpoint, anchor.clone())?;
        Ok(anchor)
    }

    pub fn add_edge(&mut self, id: EdgeId, edge: Edge) -> Result<(), EngineError> {
        let record = self.add_edge_raw(id, edge)?;
        self.commit();
        self.record(Command::Add { record });
        Ok(())
    }

    fn add_edge_raw(&mut self, id: EdgeId, edge: Edge) -> Result<EntityRecord, EngineError> {
        if self.store.edge(&id).is_some() {
            return Err(EngineError::invalid_topology(format!("edge {id} already exists")));
        }
        for end in EdgeEnd::BOTH {
            let endpoint = EndpointRef::new(id.clone(), end);
            self.validate_anchor(&endpoint, edge.endpoint(end).anchor())?;
        }
        debug!(edge:% = id; "edge added");
        let index = self.store.edges().count();
        self.store.insert_edge(id.clone(), edge.clone(), None);
        self.pending.record_added(EntityRef::Edge(id.clone()));
        Ok(EntityRecord::bare(EntityPayload::Edge { id, edge }, index))
    }

    /// Deletes an edge; endpoints chained to it are freed where they were drawn.
    pub fn delete_edge(&mut self, id: &EdgeId) -> Result<(), EngineError> {
        let record = self.delete_edge_raw(id)?;
        self.commit();
        self.record(Command::Delete { record });
        Ok(())
    }

    pub(crate) fn delete_edge_raw(&mut self, id: &EdgeId) -> Result<EntityRecord, EngineError> {
        if self.store.edge(id).is_none() {
            return Err(EngineError::not_found(id.clone()));
        }

        let mut freed = Vec::new();
        let slaves: Vec<EndpointRef> = EdgeEnd::BOTH
            .into_iter()
            .flat_map(|end| {
                self.attachments
                    .slaves_of(&EndpointRef::new(id.clone(), end))
                    .to_vec()
            })
            .collect();
        for slave in slaves {
            let Ok(at) = self.rendered_endpoint(&slave) else {
                debug!(endpoint:% = slave; "cascade step skipped, chained edge already gone");
                continue;
            };
            match self.set_anchor_raw(&slave, Anchor::free(at)) {
                Ok(previous) => freed.push((slave, previous)),
                Err(err) => debug!(endpoint:% = slave, err:% = err; "cascade step failed"),
            }
        }

        let entity = EntityRef::Edge(id.clone());
        let (memberships, emptied) = self.remove_from_all_groups(&entity);
        self.forget_selected(&entity);

        let (index, edge) = self
            .store
            .remove_edge(id)
            .ok_or_else(|| EngineError::StructuralCascadeFailure {
                step: format!("remove edge {id}"),
            })?;
        self.pending.record_removed(entity);
        debug!(edge:% = id, freed = freed.len(); "edge deleted");

        Ok(EntityRecord {
            entity: EntityPayload::Edge {
                id: id.clone(),
                edge,
            },
            index,
            memberships,
            freed,
            links: Vec::new(),
            emptied,
        })
    }

    /// Swaps the anchors of both ends. Chains onto the edge keep their physical attachment.
    pub fn flip_edge(&mut self, id: &EdgeId) -> Result<(), EngineError> {
        self.flip_edge_raw(id)?;
        self.commit();
        self.record(Command::FlipEdge { edge: id.clone() });
        Ok(())
    }

    pub(crate) fn flip_edge_raw(&mut self, id: &EdgeId) -> Result<(), EngineError> {
        let Some(edge) = self.store.edge_mut(id) else {
            return Err(EngineError::not_found(id.clone()));
        };
        edge.swap_ends();

        for (_, other) in self.store.edges_mut() {
            for end in EdgeEnd::BOTH {
                let endpoint = other.endpoint_mut(end);
                if let Anchor::Chained { to } = endpoint.anchor() {
                    if &to.edge == id {
                        let retargeted = to.other_end();
                        endpoint.replace_anchor(Anchor::Chained { to: retargeted });
                    }
                }
            }
        }
        self.pending.record_updated(EntityRef::Edge(id.clone()));
        Ok(())
    }

    pub fn set_edge_style(
        &mut self,
        id: &EdgeId,
        kind: EdgeKind,
        dashed: bool,
    ) -> Result<(), EngineError> {
        let after = EdgeStyle { kind, dashed };
        let before = self.set_edge_style_raw(id, after)?;
        self.commit();
        self.record(Command::EdgeStyle {
            edge: id.clone(),
            before,
            after,
        });
        Ok(())
    }

    pub(crate) fn set_edge_style_raw(
        &mut self,
        id: &EdgeId,
        style: EdgeStyle,
    ) -> Result<EdgeStyle, EngineError> {
        let Some(edge) = self.store.edge_mut(id) else {
            return Err(EngineError::not_found(id.clone()));
        };
        let before = EdgeStyle {
            kind: edge.kind(),
            dashed: edge.dashed(),
        };
        edge.set_style(style.kind, style.dashed);
        self.pending.record_updated(EntityRef::Edge(id.clone()));
        Ok(before)
    }

    /// Connects `source` to every target with a new edge on facing sides. One undo removes
    /// them all. Unknown targets and `source` itself are skipped.
    pub fn auto_connect(
        &mut self,
        source: &NodeId,
        targets: &[NodeId],
        kind: EdgeKind,
    ) -> Result<Vec<EdgeId>, EngineError> {
        let Some(from) = self.store.node(source).map(|node| node.rect().center()) else {
            return Err(EngineError::not_found(source.clone()));
        };

        let mut created = Vec::new();
        let mut commands = Vec::new();
        for target in targets {
            if target == source {
                continue;
            }
            let Some(to) = self.store.node(target).map(|node| node.rect().center()) else {
                debug!(node:% = target; "auto-connect skipped missing target");
                continue;
            };
            let offset = to.sub(from);
            let (source_side, target_side) = if offset.x.abs() >= offset.y.abs() {
                if offset.x >= 0.0 {
                    (Side::East, Side::West)
                } else {
                    (Side::West, Side::East)
                }
            } else if offset.y >= 0.0 {
                (Side::South, Side::North)
            } else {
                (Side::North, Side::South)
            };

            let id = self.fresh_edge_id();
            let edge = Edge::new(
                kind,
                Anchor::Node {
                    node: source.clone(),
                    side: source_side,
                },
                Anchor::Node {
                    node: target.clone(),
                    side: target_side,
                },
            );
            let record = match self.add_edge_raw(id.clone(), edge) {
                Ok(record) => record,
                Err(err) => {
                    debug!(node:% = target, err:% = err; "auto-connect edge rejected");
                    continue;
                }
            };
            commands.push(Command::Add { record });
            created.push(id);
        }

        self.commit();
        match commands.len() {
            0 => {}
            1 => {
                if let Some(command) = commands.pop() {
                    self.record(command);
                }
            }
            _ => self.record(Command::Composite { commands }),
        }
        Ok(created)
    }

    fn fresh_edge_id(&mut self) -> EdgeId {
        loop {
            self.next_id += 1;
            let id = EdgeId::generated("e", self.next_id);
            if self.store.edge(&id).is_none() {
                return id;
            }
        }
    }
}
