// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Pointer and key input dispatch.
//!
//! One gesture at a time: `Idle -> Dragging -> Committing -> Idle`. A drag re-applies the
//! total pointer offset to each target's gesture-start geometry on every move, and history is
//! captured only on release.

use std::collections::BTreeSet;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use super::geometry::Hit;
use super::Engine;
use crate::model::{Anchor, EdgeEnd, EndpointRef, EntityRef, MarkerRef, NodeId, Point, Rect};
use crate::ops::{anchor_approx_eq, Command, GeometrySnapshot};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    /// Add or remove the clicked entity from the selection.
    #[serde(default)]
    pub toggle: bool,
    /// Snap the dragged node onto alignment guides.
    #[serde(default)]
    pub align: bool,
    /// Drag the whole link-connected cluster.
    #[serde(default)]
    pub link_lock: bool,
    /// Snap free edge endpoints to horizontal or vertical.
    #[serde(default)]
    pub axis: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Escape,
    Delete,
    Undo,
    Redo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    PointerDown {
        point: Point,
        #[serde(default)]
        modifiers: Modifiers,
        #[serde(default = "single_click")]
        click_count: u8,
    },
    PointerMove {
        point: Point,
        #[serde(default)]
        modifiers: Modifiers,
    },
    PointerUp {
        point: Point,
        #[serde(default)]
        modifiers: Modifiers,
    },
    KeyDown {
        key: Key,
        #[serde(default)]
        modifiers: Modifiers,
    },
    KeyUp {
        key: Key,
    },
}

fn single_click() -> u8 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    Dragging,
    Committing,
}

#[derive(Debug, Clone)]
enum DragKind {
    Entities {
        targets: Vec<EntityRef>,
        leaves: BTreeSet<EntityRef>,
        /// Node that snaps and aligns; only set for a single-node drag.
        lead: Option<NodeId>,
    },
    Endpoint {
        endpoint: EndpointRef,
        start_anchor: Anchor,
        /// Offset from the pointer to the endpoint at gesture start.
        grab: Point,
    },
    Marker {
        marker: MarkerRef,
        /// Offset from the node's top-left corner at gesture start.
        start: Point,
    },
}

#[derive(Debug, Clone)]
struct DragSession {
    origin: Point,
    kind: DragKind,
    before: GeometrySnapshot,
}

#[derive(Debug, Clone, Default)]
pub(crate) enum Gesture {
    #[default]
    Idle,
    Dragging(Box<DragSession>),
    Committing,
}

impl Engine {
    pub fn gesture_phase(&self) -> GesturePhase {
        match self.gesture {
            Gesture::Idle => GesturePhase::Idle,
            Gesture::Dragging(_) => GesturePhase::Dragging,
            Gesture::Committing => GesturePhase::Committing,
        }
    }

    /// Single entry point for input. Everything it changes is reported through the delta and
    /// event feeds.
    pub fn handle_event(&mut self, event: InputEvent) {
        trace!(event:? = event; "input");
        match event {
            InputEvent::PointerDown {
                point,
                modifiers,
                click_count,
            } => self.pointer_down(point, modifiers, click_count),
            InputEvent::PointerMove { point, modifiers } => self.pointer_move(point, modifiers),
            InputEvent::PointerUp { point, modifiers } => self.pointer_up(point, modifiers),
            InputEvent::KeyDown { key, .. } => self.key_down(key),
            InputEvent::KeyUp { .. } => {}
        }
    }

    fn key_down(&mut self, key: Key) {
        match key {
            Key::Escape => self.exit_group_edit(),
            Key::Delete => {
                self.delete_selection();
            }
            Key::Undo => {
                if !self.undo() {
                    debug!("nothing to undo");
                }
            }
            Key::Redo => {
                if !self.redo() {
                    debug!("nothing to redo");
                }
            }
        }
    }

    fn pointer_down(&mut self, point: Point, modifiers: Modifiers, click_count: u8) {
        if !matches!(self.gesture, Gesture::Idle) {
            debug!("pointer down during an active gesture, ignored");
            return;
        }

        let hit = self.hit_test(point);
        let kind = match hit {
            Some(Hit::Endpoint(endpoint)) => {
                self.click(Some(&EntityRef::Edge(endpoint.edge.clone())), modifiers.toggle);
                let start = self.store.edge(&endpoint.edge).map(|edge| {
                    let end = edge.endpoint(endpoint.end);
                    (end.anchor().clone(), end.rendered().sub(point))
                });
                start.map(|(start_anchor, grab)| DragKind::Endpoint {
                    endpoint,
                    start_anchor,
                    grab,
                })
            }
            Some(Hit::Marker(marker)) => {
                let origin = self.store.node(&marker.node).map(|node| node.rect().origin());
                match (origin, self.marker_position(&marker)) {
                    (Some(origin), Some(at)) => Some(DragKind::Marker {
                        start: at.sub(origin),
                        marker,
                    }),
                    _ => None,
                }
            }
            Some(Hit::Entity(entity)) => {
                if click_count >= 2 {
                    self.enter_edit_for(&entity);
                }
                self.click(Some(&entity), modifiers.toggle);
                self.entity_drag(modifiers)
            }
            None => {
                if click_count >= 2 {
                    self.enter_edit_at(point);
                }
                self.click(None, modifiers.toggle);
                None
            }
        };

        if let Some(kind) = kind {
            let leaves = match &kind {
                DragKind::Entities { leaves, .. } => leaves.clone(),
                DragKind::Endpoint { endpoint, .. } => {
                    BTreeSet::from([EntityRef::Edge(endpoint.edge.clone())])
                }
                DragKind::Marker { marker, .. } => {
                    BTreeSet::from([EntityRef::Marker(marker.clone())])
                }
            };
            let before = self.capture(&leaves);
            self.gesture = Gesture::Dragging(Box::new(DragSession {
                origin: point,
                kind,
                before,
            }));
        }
    }

    /// Double click on a grouped entity enters edit mode for its outermost group.
    fn enter_edit_for(&mut self, entity: &EntityRef) {
        let target = match &self.group_edit {
            Some(editing) => self
                .groups
                .direct_child_containing(editing, entity)
                .and_then(|child| child.as_group().cloned()),
            None => self.groups.root_of(entity),
        };
        if let Some(group) = target {
            if let Err(err) = self.enter_group_edit(&group) {
                debug!(err:% = err; "group edit not entered");
            }
        }
    }

    /// Double click on empty space inside a group's box enters edit mode for it.
    fn enter_edit_at(&mut self, point: Point) {
        let hit = self
            .groups
            .iter()
            .filter(|(id, _)| {
                self.groups
                    .bounds(id)
                    .is_some_and(|bounds| bounds.contains(point))
            })
            .map(|(id, _)| id.clone())
            .find(|id| self.groups.root_of(&EntityRef::Group(id.clone())).is_none());
        if let Some(group) = hit {
            if let Err(err) = self.enter_group_edit(&group) {
                debug!(err:% = err; "group edit not entered");
            }
        }
    }

    fn entity_drag(&self, modifiers: Modifiers) -> Option<DragKind> {
        let targets: Vec<EntityRef> = self.selection.items().to_vec();
        if targets.is_empty() {
            return None;
        }
        let mut leaves = self.leaves_of(&targets);

        let lead = match targets.as_slice() {
            [EntityRef::Node(node)] => Some(node.clone()),
            _ => None,
        };
        if modifiers.link_lock {
            let nodes: Vec<NodeId> = leaves
                .iter()
                .filter_map(|leaf| leaf.as_node().cloned())
                .collect();
            for node in nodes {
                leaves.extend(self.links.cluster(&node).into_iter().map(EntityRef::Node));
            }
        }

        Some(DragKind::Entities {
            targets,
            leaves,
            lead,
        })
    }

    fn pointer_move(&mut self, point: Point, modifiers: Modifiers) {
        let Gesture::Dragging(session) = &self.gesture else {
            return;
        };
        let session = session.clone();
        let total = point.sub(session.origin);

        match &session.kind {
            DragKind::Entities { leaves, lead, .. } => {
                let mut total = total;
                if let (Some(lead), true) = (lead, modifiers.align) {
                    if let Some(start) = start_rect(&session.before, lead) {
                        let desired = start.translate(total.x, total.y);
                        total = total.add(self.align_correction(lead, &desired));
                    }
                }
                self.drag_leaves_to(&session.before, leaves, total);
                if let (Some(lead), false) = (lead, modifiers.align) {
                    self.snap_node(lead);
                }
            }
            DragKind::Endpoint { endpoint, grab, .. } => {
                if let Err(err) = self.set_anchor_raw(endpoint, Anchor::free(point.add(*grab))) {
                    debug!(endpoint:% = endpoint, err:% = err; "endpoint drag ignored");
                }
            }
            DragKind::Marker { marker, start } => {
                let mut placement = self.marker_placement(marker).cloned().unwrap_or_default();
                placement.offset = Some(start.add(total));
                placement.slot = None;
                self.set_marker_override_raw(marker, Some(placement));
            }
        }
        self.commit();
    }

    /// Places every leaf at its gesture-start geometry shifted by `total`.
    fn drag_leaves_to(
        &mut self,
        start: &GeometrySnapshot,
        leaves: &BTreeSet<EntityRef>,
        total: Point,
    ) {
        for leaf in leaves {
            match leaf {
                EntityRef::Node(id) => {
                    if let Some(rect) = start_rect(start, id) {
                        self.set_node_rect_raw(id, rect.translate(total.x, total.y));
                    }
                }
                EntityRef::Decoration(id) => {
                    let origin = start
                        .decorations
                        .iter()
                        .find(|(candidate, _)| candidate == id)
                        .map(|(_, rect)| *rect);
                    let current = self.store.decoration(id).map(|d| d.rect());
                    if let (Some(origin), Some(current)) = (origin, current) {
                        let target = origin.translate(total.x, total.y);
                        self.translate_decoration(id, target.x - current.x, target.y - current.y);
                    }
                }
                EntityRef::Edge(id) => {
                    let anchors = start
                        .edges
                        .iter()
                        .find(|(candidate, _, _)| candidate == id)
                        .map(|(_, s, e)| (s.clone(), e.clone()));
                    if let Some((s, e)) = anchors {
                        for (end, anchor) in [
                            (EdgeEnd::Start, s),
                            (EdgeEnd::End, e),
                        ] {
                            if let Anchor::Free { at } = anchor {
                                let endpoint = EndpointRef::new(id.clone(), end);
                                let moved = Anchor::free(at.add(total));
                                if let Err(err) = self.set_anchor_raw(&endpoint, moved) {
                                    debug!(endpoint:% = endpoint, err:% = err; "edge drag skipped");
                                }
                            }
                        }
                    }
                }
                EntityRef::Marker(_) | EntityRef::Group(_) => {}
            }
        }
    }

    fn pointer_up(&mut self, point: Point, modifiers: Modifiers) {
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Committing);
        let Gesture::Dragging(session) = gesture else {
            self.gesture = Gesture::Idle;
            return;
        };

        match session.kind {
            DragKind::Entities {
                targets, leaves, ..
            } => {
                let after = self.capture(&leaves);
                self.record_move(targets, session.before, after);
            }
            DragKind::Endpoint {
                endpoint,
                start_anchor,
                grab,
            } => {
                let dropped = self.resolve_drop(&endpoint, point.add(grab), modifiers.axis);
                let changed = !anchor_approx_eq(&dropped, &start_anchor, self.config.move_epsilon);
                let anchor = if changed {
                    dropped
                } else {
                    start_anchor.clone()
                };
                match self.set_anchor_raw(&endpoint, anchor.clone()) {
                    Ok(_) => {
                        self.commit();
                        if changed {
                            self.record(Command::SetAnchor {
                                endpoint,
                                before: start_anchor,
                                after: anchor,
                            });
                        }
                    }
                    Err(err) => {
                        debug!(endpoint:% = endpoint, err:% = err; "drop rejected, reverting");
                        if self.set_anchor_raw(&endpoint, start_anchor).is_ok() {
                            self.commit();
                        }
                    }
                }
            }
            DragKind::Marker { marker, .. } => {
                let before = session
                    .before
                    .markers
                    .iter()
                    .find(|(candidate, _)| candidate == &marker)
                    .and_then(|(_, placement)| placement.clone());
                let dropped_at = self.dropped_marker_at(&marker, point);
                if let Some((offset, slot)) = self.marker_drop(&marker.node, dropped_at) {
                    let mut placement =
                        self.marker_placement(&marker).cloned().unwrap_or_default();
                    placement.offset = Some(offset);
                    placement.slot = slot;
                    self.set_marker_override_raw(&marker, Some(placement.clone()));
                    self.commit();
                    let after = Some(placement);
                    let moved = match (&before, &after) {
                        (Some(b), Some(a)) => match (b.offset, a.offset) {
                            (Some(pb), Some(pa)) => !pb.approx_eq(pa, self.config.move_epsilon),
                            _ => true,
                        },
                        _ => true,
                    };
                    if moved {
                        self.record(Command::MarkerMove {
                            marker,
                            before,
                            after,
                        });
                    }
                }
            }
        }

        self.gesture = Gesture::Idle;
    }

    /// Current absolute position of a dragged marker, falling back to the pointer.
    fn dropped_marker_at(&self, marker: &MarkerRef, pointer: Point) -> Point {
        self.marker_position(marker).unwrap_or(pointer)
    }
}

fn start_rect(snapshot: &GeometrySnapshot, node: &NodeId) -> Option<Rect> {
    snapshot
        .nodes
        .iter()
        .find(|(candidate, _)| candidate == node)
        .map(|(_, rect)| *rect)
}
