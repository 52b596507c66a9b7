// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::{EntityRef, GroupId, Link, Point, Rect};

/// Current drawable geometry of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Geometry {
    Node { rect: Rect },
    Edge { start: Point, end: Point },
    Decoration { rect: Rect },
    /// Padded bounding box, `None` when the group has no positioned leaves.
    Group { bounds: Option<Rect> },
    Marker { at: Point, hidden: bool },
}

/// Minimal per-mutation change set for the render collaborator.
///
/// Only entities touched by the mutation appear, each at most once.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Delta {
    pub added: Vec<(EntityRef, Geometry)>,
    pub updated: Vec<(EntityRef, Geometry)>,
    pub removed: Vec<EntityRef>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    pub fn geometry_of(&self, entity: &EntityRef) -> Option<&Geometry> {
        self.added
            .iter()
            .chain(self.updated.iter())
            .find(|(candidate, _)| candidate == entity)
            .map(|(_, geometry)| geometry)
    }
}

#[derive(Debug, Default)]
pub(crate) struct DeltaBuilder {
    added: BTreeSet<EntityRef>,
    removed: BTreeSet<EntityRef>,
    updated: BTreeSet<EntityRef>,
}

impl DeltaBuilder {
    pub(crate) fn record_added(&mut self, entity: EntityRef) {
        self.removed.remove(&entity);
        self.updated.remove(&entity);
        self.added.insert(entity);
    }

    pub(crate) fn record_removed(&mut self, entity: EntityRef) {
        let was_added = self.added.remove(&entity);
        self.updated.remove(&entity);
        if !was_added {
            self.removed.insert(entity);
        }
    }

    pub(crate) fn record_updated(&mut self, entity: EntityRef) {
        if self.added.contains(&entity) || self.removed.contains(&entity) {
            return;
        }
        self.updated.insert(entity);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }

    /// Resolves final geometry for every touched entity. Entities that no longer resolve are
    /// reported as removed.
    pub(crate) fn finish(
        self,
        mut resolve: impl FnMut(&EntityRef) -> Option<Geometry>,
    ) -> (Delta, Vec<EngineEvent>) {
        let mut delta = Delta::default();
        let mut events = Vec::new();

        for entity in self.added {
            match resolve(&entity) {
                Some(geometry) => {
                    events.push(EngineEvent::Added(entity.clone()));
                    delta.added.push((entity, geometry));
                }
                None => delta.removed.push(entity),
            }
        }
        for entity in self.updated {
            match resolve(&entity) {
                Some(geometry) => {
                    match &entity {
                        EntityRef::Group(group) => {
                            events.push(EngineEvent::GroupChanged(group.clone()))
                        }
                        _ => events.push(EngineEvent::Moved(entity.clone())),
                    }
                    delta.updated.push((entity, geometry));
                }
                None => delta.removed.push(entity),
            }
        }
        for entity in self.removed {
            events.push(EngineEvent::Removed(entity.clone()));
            delta.removed.push(entity);
        }
        delta.removed.sort();
        delta.removed.dedup();

        (delta, events)
    }
}

/// Change notification for an external persistence collaborator. Fire-and-forget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum EngineEvent {
    Moved(EntityRef),
    Added(EntityRef),
    Removed(EntityRef),
    GroupChanged(GroupId),
    LinkCreated(Link),
    LinkBroken(Link),
    HistoryChanged { can_undo: bool, can_redo: bool },
}
