// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Selection set and the per-type delete and move routines it dispatches to.

use std::collections::BTreeSet;

use log::debug;

use super::Engine;
use crate::error::EngineError;
use crate::model::{
    Anchor, Decoration, DecorationId, EdgeEnd, EndpointRef, EntityRef, Node, NodeId,
};
use crate::ops::{Command, EntityPayload, EntityRecord};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    items: Vec<EntityRef>,
    primary: Option<EntityRef>,
}

impl Selection {
    pub fn items(&self) -> &[EntityRef] {
        &self.items
    }

    pub fn primary(&self) -> Option<&EntityRef> {
        self.primary.as_ref()
    }

    pub fn contains(&self, entity: &EntityRef) -> bool {
        self.items.contains(entity)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn replace(&mut self, entity: EntityRef) {
        self.items = vec![entity.clone()];
        self.primary = Some(entity);
    }

    fn toggle(&mut self, entity: EntityRef) {
        if let Some(index) = self.items.iter().position(|item| item == &entity) {
            self.items.remove(index);
            if self.primary.as_ref() == Some(&entity) {
                self.primary = self.items.last().cloned();
            }
        } else {
            self.items.push(entity.clone());
            self.primary = Some(entity);
        }
    }

    fn remove(&mut self, entity: &EntityRef) {
        self.items.retain(|item| item != entity);
        if self.primary.as_ref() == Some(entity) {
            self.primary = self.items.last().cloned();
        }
    }

    fn clear(&mut self) {
        self.items.clear();
        self.primary = None;
    }
}

impl Engine {
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// The entity a click on `entity` selects. Outside group edit this climbs to the root
    /// group; inside it, to the edited group's direct member. Clicking anything outside the
    /// edited group leaves group edit.
    pub fn resolve_target(&mut self, entity: &EntityRef) -> EntityRef {
        if let Some(editing) = self.group_edit.clone() {
            if let Some(child) = self.groups.direct_child_containing(&editing, entity) {
                return child;
            }
            self.exit_group_edit();
        }
        match self.groups.root_of(entity) {
            Some(root) => EntityRef::Group(root),
            None => entity.clone(),
        }
    }

    /// Applies a click to the selection. `toggle` flips membership of the resolved target.
    pub fn click(&mut self, entity: Option<&EntityRef>, toggle: bool) {
        let Some(entity) = entity else {
            if !toggle {
                self.selection.clear();
            }
            return;
        };
        let target = self.resolve_target(entity);
        if toggle {
            self.selection.toggle(target);
        } else if self.selection.len() > 1 && self.selection.contains(&target) {
            self.selection.primary = Some(target);
        } else {
            self.selection.replace(target);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub(crate) fn forget_selected(&mut self, entity: &EntityRef) {
        self.selection.remove(entity);
        if let EntityRef::Group(id) = entity {
            if self.group_edit.as_ref() == Some(id) {
                self.exit_group_edit();
            }
        }
    }

    /// Deletes every selected entity with its own routine; each delete is undone on its own.
    /// Entities already removed by an earlier delete in the batch are skipped.
    pub fn delete_selection(&mut self) -> usize {
        let items = self.selection.items().to_vec();
        let mut deleted = 0;
        for item in items {
            match self.delete_entity(&item) {
                Ok(()) => deleted += 1,
                Err(err) if err.is_not_found() => {
                    debug!(entity:% = item; "delete skipped, already gone");
                }
                Err(err) => debug!(entity:% = item, err:% = err; "delete failed"),
            }
        }
        deleted
    }

    /// Type-specific delete: nodes and decorations cascade, markers are hidden, and a group
    /// deletes its leaves.
    pub fn delete_entity(&mut self, entity: &EntityRef) -> Result<(), EngineError> {
        match entity {
            EntityRef::Node(id) => self.delete_node(id),
            EntityRef::Edge(id) => self.delete_edge(id),
            EntityRef::Decoration(id) => self.delete_decoration(id),
            EntityRef::Marker(marker) => self.hide_marker(marker),
            EntityRef::Group(id) => {
                let leaves = self.collect_members(id)?;
                let mut commands = Vec::new();
                for leaf in leaves {
                    match self.delete_raw(&leaf) {
                        Ok(record) => commands.push(Command::Delete { record }),
                        Err(err) => debug!(entity:% = leaf, err:% = err; "group delete step skipped"),
                    }
                }
                self.commit();
                if commands.is_empty() {
                    return Err(EngineError::not_found(id.clone()));
                }
                self.record(Command::Composite { commands });
                Ok(())
            }
        }
    }

    pub(crate) fn delete_raw(&mut self, entity: &EntityRef) -> Result<EntityRecord, EngineError> {
        match entity {
            EntityRef::Node(id) => self.delete_node_raw(id),
            EntityRef::Edge(id) => self.delete_edge_raw(id),
            EntityRef::Decoration(id) => self.delete_decoration_raw(id),
            other => Err(EngineError::invalid_topology(format!("{other} is not a leaf"))),
        }
    }

    pub fn add_node(&mut self, id: NodeId, node: Node) -> Result<(), EngineError> {
        if self.store.node(&id).is_some() {
            return Err(EngineError::invalid_topology(format!("node {id} already exists")));
        }
        let rect = node.rect();
        if !rect.is_finite() || rect.width < 0.0 || rect.height < 0.0 {
            return Err(EngineError::constraint(format!("invalid rect for node {id}")));
        }
        let index = self.store.nodes().count();
        self.store.insert_node(id.clone(), node.clone(), None);
        self.pending.record_added(EntityRef::Node(id.clone()));
        self.derive_markers(&id);
        self.commit();
        let node = self.store.node(&id).cloned().unwrap_or(node);
        self.record(Command::Add {
            record: EntityRecord::bare(EntityPayload::Node { id, node }, index),
        });
        Ok(())
    }

    /// Deletes a node. Edges anchored to it are freed exactly where they were drawn, its
    /// links and memberships go, and groups left empty are removed.
    pub fn delete_node(&mut self, id: &NodeId) -> Result<(), EngineError> {
        let record = self.delete_node_raw(id)?;
        self.commit();
        self.record(Command::Delete { record });
        Ok(())
    }

    pub(crate) fn delete_node_raw(&mut self, id: &NodeId) -> Result<EntityRecord, EngineError> {
        if self.store.node(id).is_none() {
            return Err(EngineError::not_found(id.clone()));
        }

        let anchored: Vec<EndpointRef> = self
            .store
            .edges()
            .flat_map(|(edge_id, edge)| {
                EdgeEnd::BOTH
                    .into_iter()
                    .filter(|end| {
                        edge.endpoint(*end)
                            .anchor()
                            .node()
                            .is_some_and(|(node, _)| node == id)
                    })
                    .map(|end| EndpointRef::new(edge_id.clone(), end))
                    .collect::<Vec<_>>()
            })
            .collect();
        let mut freed = Vec::new();
        for endpoint in anchored {
            let Some(at) = self
                .store
                .edge(&endpoint.edge)
                .map(|edge| edge.endpoint(endpoint.end).rendered())
            else {
                debug!(endpoint:% = endpoint; "cascade step skipped, edge already gone");
                continue;
            };
            match self.set_anchor_raw(&endpoint, Anchor::free(at)) {
                Ok(previous) => freed.push((endpoint, previous)),
                Err(err) => debug!(endpoint:% = endpoint, err:% = err; "cascade step failed"),
            }
        }

        for (marker, _) in self.visible_markers(id) {
            self.pending.record_removed(EntityRef::Marker(marker));
        }
        let links = self.remove_links_of(id);
        let entity = EntityRef::Node(id.clone());
        let (memberships, emptied) = self.remove_from_all_groups(&entity);
        self.forget_selected(&entity);

        let (index, node) =
            self.store
                .remove_node(id)
                .ok_or_else(|| EngineError::StructuralCascadeFailure {
                    step: format!("remove node {id}"),
                })?;
        self.pending.record_removed(entity);
        debug!(node:% = id, freed = freed.len(), links = links.len(); "node deleted");

        Ok(EntityRecord {
            entity: EntityPayload::Node {
                id: id.clone(),
                node,
            },
            index,
            memberships,
            freed,
            links,
            emptied,
        })
    }

    pub fn add_decoration(&mut self, id: DecorationId, decoration: Decoration) -> Result<(), EngineError> {
        if self.store.decoration(&id).is_some() {
            return Err(EngineError::invalid_topology(format!(
                "decoration {id} already exists"
            )));
        }
        let index = self.store.decorations().count();
        self.store
            .insert_decoration(id.clone(), decoration.clone(), None);
        self.pending.record_added(EntityRef::Decoration(id.clone()));
        self.commit();
        self.record(Command::Add {
            record: EntityRecord::bare(EntityPayload::Decoration { id, decoration }, index),
        });
        Ok(())
    }

    pub fn delete_decoration(&mut self, id: &DecorationId) -> Result<(), EngineError> {
        let record = self.delete_decoration_raw(id)?;
        self.commit();
        self.record(Command::Delete { record });
        Ok(())
    }

    fn delete_decoration_raw(&mut self, id: &DecorationId) -> Result<EntityRecord, EngineError> {
        if self.store.decoration(id).is_none() {
            return Err(EngineError::not_found(id.clone()));
        }
        let entity = EntityRef::Decoration(id.clone());
        let (memberships, emptied) = self.remove_from_all_groups(&entity);
        self.forget_selected(&entity);
        let (index, decoration) = self.store.remove_decoration(id).ok_or_else(|| {
            EngineError::StructuralCascadeFailure {
                step: format!("remove decoration {id}"),
            }
        })?;
        self.pending.record_removed(entity);
        Ok(EntityRecord {
            entity: EntityPayload::Decoration {
                id: id.clone(),
                decoration,
            },
            index,
            memberships,
            freed: Vec::new(),
            links: Vec::new(),
            emptied,
        })
    }

    /// Puts a deleted entity back and reverses its cascade.
    pub(crate) fn restore_entity(&mut self, record: &EntityRecord) -> Result<(), EngineError> {
        let entity = record.entity_ref();
        if self.entity_exists(&entity) {
            return Err(EngineError::invalid_topology(format!("{entity} already exists")));
        }
        match &record.entity {
            EntityPayload::Node { id, node } => {
                self.store
                    .insert_node(id.clone(), node.clone(), Some(record.index));
            }
            EntityPayload::Edge { id, edge } => {
                self.store
                    .insert_edge(id.clone(), edge.clone(), Some(record.index));
            }
            EntityPayload::Decoration { id, decoration } => {
                self.store
                    .insert_decoration(id.clone(), decoration.clone(), Some(record.index));
            }
        }
        self.pending.record_added(entity.clone());

        for group in record.emptied.iter().rev() {
            self.restore_group(group);
        }
        self.restore_memberships(&entity, &record.memberships);
        for (endpoint, anchor) in &record.freed {
            if let Err(err) = self.set_anchor_raw(endpoint, anchor.clone()) {
                debug!(endpoint:% = endpoint, err:% = err; "freed endpoint not re-anchored");
            }
        }
        let links: Vec<_> = self.links.iter().cloned().chain(record.links.iter().cloned()).collect();
        self.replace_links(links);
        Ok(())
    }

    /// Moves the selection by `(dx, dy)` with each entity's own move rule, as one history
    /// entry. Stale entries are skipped.
    pub fn move_selection(&mut self, dx: f64, dy: f64) -> usize {
        let targets: Vec<EntityRef> = self
            .selection
            .items()
            .iter()
            .filter(|item| self.entity_exists(item))
            .cloned()
            .collect();
        if targets.is_empty() {
            return 0;
        }
        let leaves = self.leaves_of(&targets);
        let before = self.capture(&leaves);
        for leaf in &leaves {
            self.move_leaf_raw(leaf, dx, dy);
        }
        self.commit();
        let after = self.capture(&leaves);
        let moved = targets.len();
        self.record_move(targets, before, after);
        moved
    }

    /// Moves one leaf without snapping or recording.
    pub(crate) fn move_leaf_raw(&mut self, leaf: &EntityRef, dx: f64, dy: f64) -> bool {
        match leaf {
            EntityRef::Node(id) => self.translate_raw(id, dx, dy).is_ok(),
            EntityRef::Edge(id) => self.translate_free_endpoints(id, dx, dy),
            EntityRef::Decoration(id) => self.translate_decoration(id, dx, dy),
            EntityRef::Marker(marker) => {
                let Some(mut placement) = self.marker_placement(marker).cloned() else {
                    return false;
                };
                let Some(offset) = placement.offset else {
                    return false;
                };
                placement.offset = Some(offset.offset(dx, dy));
                placement.slot = None;
                self.set_marker_override_raw(marker, Some(placement))
            }
            EntityRef::Group(group) => {
                let leaves: BTreeSet<EntityRef> =
                    self.groups.collect_leaves(group).into_iter().collect();
                leaves
                    .iter()
                    .fold(false, |moved, leaf| self.move_leaf_raw(leaf, dx, dy) || moved)
            }
        }
    }
}
