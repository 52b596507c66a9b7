// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The editing engine.
//!
//! One [`Engine`] owns a diagram session: geometry, the attachment index, the link table, the
//! group table, marker state, selection and history. Every public mutation runs the same
//! pipeline before returning:
//!
//! 1. mutate geometry or topology
//! 2. rebuild the attachment index and re-resolve endpoints
//! 3. re-validate links
//! 4. refresh group bounding boxes
//! 5. queue a [`Delta`] and [`EngineEvent`]s
//! 6. record a history entry
//!
//! Operations on ids that no longer exist return [`crate::error::EngineError::NotFound`] and
//! change nothing.

mod attachment;
mod geometry;
mod grouping;
mod history;
mod linker;
mod markers;
mod router;
mod selection;
mod traverse;

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;

use log::{debug, warn};

pub use attachment::AttachmentIndex;
pub use geometry::{DerivedGeometry, GeometryStore, Hit};
pub use grouping::GroupTable;
pub use history::History;
pub use linker::{AdjacencyCandidate, AlignmentGuide, LinkTable};
pub use markers::PlaceOptions;
pub use router::{GesturePhase, InputEvent, Key, Modifiers};
pub use selection::Selection;

use self::router::Gesture;
use self::traverse::{follow, ChainEnd};
use crate::config::EngineConfig;
use crate::error::LoadError;
use crate::model::{
    Anchor, EdgeEnd, EndpointRef, EntityRef, GroupId, Link, NodeId, VariantCatalog,
};
use crate::ops::{Delta, DeltaBuilder, EngineEvent, Geometry};
use crate::store::{Keyed, Snapshot};

#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    store: GeometryStore,
    attachments: AttachmentIndex,
    links: LinkTable,
    groups: GroupTable,
    catalog: VariantCatalog,
    selection: Selection,
    gesture: Gesture,
    group_edit: Option<GroupId>,
    history: History,
    pending: DeltaBuilder,
    deltas: Vec<Delta>,
    events: Vec<EngineEvent>,
    next_id: u64,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            store: GeometryStore::new(config.marker_spacing),
            history: History::new(config.history_limit),
            config,
            attachments: AttachmentIndex::default(),
            links: LinkTable::default(),
            groups: GroupTable::default(),
            catalog: VariantCatalog::default(),
            selection: Selection::default(),
            gesture: Gesture::default(),
            group_edit: None,
            pending: DeltaBuilder::default(),
            deltas: Vec::new(),
            events: Vec::new(),
            next_id: 0,
        }
    }

    /// Builds an engine from an initial snapshot. Validation failures here are the only
    /// errors that keep a session from starting.
    pub fn from_snapshot(snapshot: Snapshot, config: EngineConfig) -> Result<Self, LoadError> {
        validate_ids(&snapshot)?;
        validate_references(&snapshot)?;

        let mut engine = Self::new(config);
        engine.catalog = snapshot.catalog;
        for Keyed { id, value } in snapshot.nodes {
            engine.store.insert_node(id, value, None);
        }
        for Keyed { id, value } in snapshot.edges {
            engine.store.insert_edge(id, value, None);
        }
        for Keyed { id, value } in snapshot.decorations {
            engine.store.insert_decoration(id, value, None);
        }
        for Keyed { id, value } in snapshot.groups {
            engine.groups.insert(id, value);
        }

        if let Some(cyclic) = engine.group_cycles().into_iter().next() {
            return Err(LoadError::GroupCycle {
                entity: EntityRef::Group(cyclic),
            });
        }
        engine.check_chains()?;

        for link in snapshot.links {
            engine.load_link(link);
        }
        let nodes: Vec<NodeId> = engine.store.nodes().map(|(id, _)| id.clone()).collect();
        for node in &nodes {
            engine.derive_markers(node);
        }
        engine.commit();
        engine.deltas.clear();
        engine.events.clear();
        debug!(
            nodes = engine.store.nodes().count(),
            edges = engine.store.edges().count(),
            groups = engine.groups.len();
            "snapshot loaded"
        );
        Ok(engine)
    }

    /// Full serializable state, in store order.
    pub fn export_snapshot(&self) -> Snapshot {
        Snapshot {
            nodes: self
                .store
                .nodes()
                .map(|(id, node)| Keyed::new(id.clone(), node.clone()))
                .collect(),
            edges: self
                .store
                .edges()
                .map(|(id, edge)| Keyed::new(id.clone(), edge.clone()))
                .collect(),
            groups: self
                .groups
                .iter()
                .map(|(id, group)| Keyed::new(id.clone(), group.clone()))
                .collect(),
            decorations: self
                .store
                .decorations()
                .map(|(id, decoration)| Keyed::new(id.clone(), decoration.clone()))
                .collect(),
            catalog: self.catalog.clone(),
            links: self.links.iter().cloned().collect(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &GeometryStore {
        &self.store
    }

    /// Drains the per-mutation delta feed.
    pub fn take_deltas(&mut self) -> Vec<Delta> {
        std::mem::take(&mut self.deltas)
    }

    /// Drains the event feed.
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    /// Current geometry of an entity as the delta feed reports it.
    pub fn geometry_of(&self, entity: &EntityRef) -> Option<Geometry> {
        match entity {
            EntityRef::Node(id) => self.store.node(id).map(|node| Geometry::Node {
                rect: node.rect(),
            }),
            EntityRef::Edge(id) => self.store.edge(id).map(|edge| Geometry::Edge {
                start: edge.endpoint(EdgeEnd::Start).rendered(),
                end: edge.endpoint(EdgeEnd::End).rendered(),
            }),
            EntityRef::Decoration(id) => self
                .store
                .decoration(id)
                .map(|decoration| Geometry::Decoration {
                    rect: decoration.rect(),
                }),
            EntityRef::Group(id) => self.groups.get(id).map(|_| Geometry::Group {
                bounds: self.groups.bounds(id),
            }),
            EntityRef::Marker(marker) => {
                let at = self.marker_position(marker)?;
                let hidden = self
                    .marker_placement(marker)
                    .is_some_and(|placement| placement.hidden);
                Some(Geometry::Marker { at, hidden })
            }
        }
    }

    /// Runs the refresh pipeline and flushes what changed into the feeds.
    pub(crate) fn commit(&mut self) {
        self.refresh_attachments();
        self.validate_links();
        self.refresh_group_bounds();
        self.flush();
    }

    fn flush(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return;
        }
        let (delta, events) = pending.finish(|entity| self.geometry_of(entity));
        if !delta.is_empty() {
            self.deltas.push(delta);
        }
        self.events.extend(events);
    }

    /// Marks a node and the markers drawn on it as changed.
    pub(crate) fn touch_node(&mut self, node: &NodeId) {
        self.pending.record_updated(EntityRef::Node(node.clone()));
        for (marker, _) in self.visible_markers(node) {
            self.pending.record_updated(EntityRef::Marker(marker));
        }
    }

    /// Adds a snapshot link unless it breaks the one-link-per-side rule or no longer holds.
    fn load_link(&mut self, link: Link) {
        let taken = [link.first(), link.second()]
            .into_iter()
            .find(|side| self.links.partner(side).is_some())
            .cloned();
        if let Some(side) = taken {
            warn!(
                first:% = link.first(),
                second:% = link.second(),
                side:% = side;
                "snapshot link dropped, side already linked"
            );
            return;
        }
        if !self.link_holds(&link) {
            warn!(
                first:% = link.first(),
                second:% = link.second();
                "snapshot link dropped, sides do not face"
            );
            return;
        }
        self.links.insert(link);
    }

    fn check_chains(&self) -> Result<(), LoadError> {
        for (id, _) in self.store.edges() {
            for end in EdgeEnd::BOTH {
                let start = EndpointRef::new(id.clone(), end);
                let walk = follow(start, |current| {
                    self.store
                        .edge(&current.edge)?
                        .endpoint(current.end)
                        .anchor()
                        .chained_to()
                        .cloned()
                });
                if let ChainEnd::Cycle(endpoint) = walk {
                    return Err(LoadError::ChainCycle { endpoint });
                }
            }
        }
        Ok(())
    }
}

fn validate_ids(snapshot: &Snapshot) -> Result<(), LoadError> {
    let mut seen: BTreeSet<EntityRef> = BTreeSet::new();
    let entities = snapshot
        .nodes
        .iter()
        .map(|n| EntityRef::Node(n.id.clone()))
        .chain(snapshot.edges.iter().map(|e| EntityRef::Edge(e.id.clone())))
        .chain(snapshot.groups.iter().map(|g| EntityRef::Group(g.id.clone())))
        .chain(
            snapshot
                .decorations
                .iter()
                .map(|d| EntityRef::Decoration(d.id.clone())),
        );
    for entity in entities {
        if !seen.insert(entity.clone()) {
            return Err(LoadError::DuplicateId { entity });
        }
    }

    let rects = snapshot
        .nodes
        .iter()
        .map(|n| (EntityRef::Node(n.id.clone()), n.value.rect()))
        .chain(
            snapshot
                .decorations
                .iter()
                .map(|d| (EntityRef::Decoration(d.id.clone()), d.value.rect())),
        );
    for (entity, rect) in rects {
        if !rect.is_finite() || rect.width < 0.0 || rect.height < 0.0 {
            return Err(LoadError::InvalidRect { entity });
        }
    }
    Ok(())
}

fn validate_references(snapshot: &Snapshot) -> Result<(), LoadError> {
    let nodes: BTreeSet<&NodeId> = snapshot.nodes.iter().map(|n| &n.id).collect();
    let edges: BTreeSet<_> = snapshot.edges.iter().map(|e| &e.id).collect();
    let groups: BTreeSet<_> = snapshot.groups.iter().map(|g| &g.id).collect();
    let decorations: BTreeSet<_> = snapshot.decorations.iter().map(|d| &d.id).collect();

    for edge in &snapshot.edges {
        for end in EdgeEnd::BOTH {
            let anchor = edge.value.endpoint(end).anchor();
            let missing = match anchor {
                Anchor::Node { node, .. } if !nodes.contains(node) => {
                    Some(EntityRef::Node(node.clone()))
                }
                Anchor::Chained { to } if !edges.contains(&to.edge) => {
                    Some(EntityRef::Edge(to.edge.clone()))
                }
                _ => None,
            };
            if let Some(missing) = missing {
                return Err(LoadError::DanglingReference {
                    owner: EntityRef::Edge(edge.id.clone()),
                    missing,
                });
            }
        }
    }

    for group in &snapshot.groups {
        for member in group.value.members() {
            let present = match member {
                EntityRef::Node(id) => nodes.contains(id),
                EntityRef::Edge(id) => edges.contains(id),
                EntityRef::Decoration(id) => decorations.contains(id),
                EntityRef::Group(id) => groups.contains(id),
                EntityRef::Marker(_) => false,
            };
            if !present {
                return Err(LoadError::DanglingReference {
                    owner: EntityRef::Group(group.id.clone()),
                    missing: member.clone(),
                });
            }
        }
    }

    for link in &snapshot.links {
        for side in [link.first(), link.second()] {
            if !nodes.contains(&side.node) {
                return Err(LoadError::DanglingReference {
                    owner: EntityRef::Node(link.first().node.clone()),
                    missing: EntityRef::Node(side.node.clone()),
                });
            }
        }
    }
    Ok(())
}
