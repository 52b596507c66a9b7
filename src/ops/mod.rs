// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Invertible edit commands.
//!
//! Every mutation the engine records is captured as a [`Command`] value holding enough state
//! to replay it and to build its inverse. The history stacks store these values, which also
//! makes the log serializable for diagnostics.

mod delta;

pub use delta::{Delta, EngineEvent, Geometry};
pub(crate) use delta::DeltaBuilder;

use serde::{Deserialize, Serialize};

use crate::model::{
    Anchor, Decoration, DecorationId, Edge, EdgeId, EdgeKind, EndpointRef, EntityRef, Group,
    GroupFlags, GroupId, Link, MarkerPlacement, MarkerRef, Node, NodeId, Rect, Side, VariantKey,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    Move(MoveRecord),
    MultiMove(MoveRecord),
    Add { record: EntityRecord },
    Delete { record: EntityRecord },
    Group { creation: GroupCreation },
    Dissolve { creation: GroupCreation },
    /// Groups removed by one ungroup, in removal order.
    Ungroup { removed: Vec<GroupRecord> },
    Regroup { removed: Vec<GroupRecord> },
    AddMember { group: GroupId, member: EntityRef, index: usize },
    RemoveMember { group: GroupId, member: EntityRef, index: usize },
    SetAnchor { endpoint: EndpointRef, before: Anchor, after: Anchor },
    EdgeStyle { edge: EdgeId, before: EdgeStyle, after: EdgeStyle },
    FlipEdge { edge: EdgeId },
    HandleDistance {
        node: NodeId,
        side: Side,
        before: Option<f64>,
        after: Option<f64>,
    },
    SetGroupFlags { group: GroupId, before: GroupFlags, after: GroupFlags },
    SetVariant { node: NodeId, before: Option<VariantKey>, after: Option<VariantKey> },
    MarkerVisibility {
        marker: MarkerRef,
        before: Option<MarkerPlacement>,
        after: Option<MarkerPlacement>,
    },
    MarkerMove {
        marker: MarkerRef,
        before: Option<MarkerPlacement>,
        after: Option<MarkerPlacement>,
    },
    Unlink(MoveRecord),
    Composite { commands: Vec<Command> },
}

impl Command {
    pub fn inverse(&self) -> Command {
        match self {
            Command::Move(record) => Command::Move(record.swapped()),
            Command::MultiMove(record) => Command::MultiMove(record.swapped()),
            Command::Unlink(record) => Command::Unlink(record.swapped()),
            Command::Add { record } => Command::Delete {
                record: record.clone(),
            },
            Command::Delete { record } => Command::Add {
                record: record.clone(),
            },
            Command::Group { creation } => Command::Dissolve {
                creation: creation.clone(),
            },
            Command::Dissolve { creation } => Command::Group {
                creation: creation.clone(),
            },
            Command::Ungroup { removed } => Command::Regroup {
                removed: removed.clone(),
            },
            Command::Regroup { removed } => Command::Ungroup {
                removed: removed.clone(),
            },
            Command::AddMember {
                group,
                member,
                index,
            } => Command::RemoveMember {
                group: group.clone(),
                member: member.clone(),
                index: *index,
            },
            Command::RemoveMember {
                group,
                member,
                index,
            } => Command::AddMember {
                group: group.clone(),
                member: member.clone(),
                index: *index,
            },
            Command::SetAnchor {
                endpoint,
                before,
                after,
            } => Command::SetAnchor {
                endpoint: endpoint.clone(),
                before: after.clone(),
                after: before.clone(),
            },
            Command::EdgeStyle {
                edge,
                before,
                after,
            } => Command::EdgeStyle {
                edge: edge.clone(),
                before: *after,
                after: *before,
            },
            Command::FlipEdge { edge } => Command::FlipEdge { edge: edge.clone() },
            Command::HandleDistance {
                node,
                side,
                before,
                after,
            } => Command::HandleDistance {
                node: node.clone(),
                side: *side,
                before: *after,
                after: *before,
            },
            Command::SetGroupFlags {
                group,
                before,
                after,
            } => Command::SetGroupFlags {
                group: group.clone(),
                before: after.clone(),
                after: before.clone(),
            },
            Command::SetVariant {
                node,
                before,
                after,
            } => Command::SetVariant {
                node: node.clone(),
                before: after.clone(),
                after: before.clone(),
            },
            Command::MarkerVisibility {
                marker,
                before,
                after,
            } => Command::MarkerVisibility {
                marker: marker.clone(),
                before: after.clone(),
                after: before.clone(),
            },
            Command::MarkerMove {
                marker,
                before,
                after,
            } => Command::MarkerMove {
                marker: marker.clone(),
                before: after.clone(),
                after: before.clone(),
            },
            Command::Composite { commands } => Command::Composite {
                commands: commands.iter().rev().map(Command::inverse).collect(),
            },
        }
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Move(_) => CommandKind::Move,
            Command::MultiMove(_) => CommandKind::MultiMove,
            Command::Add { .. } => CommandKind::Add,
            Command::Delete { .. } => CommandKind::Delete,
            Command::Group { .. } | Command::Dissolve { .. } => CommandKind::Group,
            Command::Ungroup { .. } | Command::Regroup { .. } => CommandKind::Ungroup,
            Command::AddMember { .. } | Command::RemoveMember { .. } => CommandKind::Membership,
            Command::SetAnchor { .. } => CommandKind::SetAnchor,
            Command::EdgeStyle { .. } => CommandKind::EdgeStyle,
            Command::FlipEdge { .. } => CommandKind::FlipEdge,
            Command::HandleDistance { .. } => CommandKind::HandleDistance,
            Command::SetGroupFlags { .. } => CommandKind::GroupFlags,
            Command::SetVariant { .. } => CommandKind::SetVariant,
            Command::MarkerVisibility { .. } => CommandKind::MarkerVisibility,
            Command::MarkerMove { .. } => CommandKind::MarkerMove,
            Command::Unlink(_) => CommandKind::Unlink,
            Command::Composite { .. } => CommandKind::Composite,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Move,
    MultiMove,
    Add,
    Delete,
    Group,
    Ungroup,
    Membership,
    SetAnchor,
    EdgeStyle,
    FlipEdge,
    HandleDistance,
    GroupFlags,
    SetVariant,
    MarkerVisibility,
    MarkerMove,
    Unlink,
    Composite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeStyle {
    pub kind: EdgeKind,
    pub dashed: bool,
}

/// Geometry of a set of leaf entities plus the full link table at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometrySnapshot {
    #[serde(default)]
    pub nodes: Vec<(NodeId, Rect)>,
    #[serde(default)]
    pub edges: Vec<(EdgeId, Anchor, Anchor)>,
    #[serde(default)]
    pub decorations: Vec<(DecorationId, Rect)>,
    #[serde(default)]
    pub markers: Vec<(MarkerRef, Option<MarkerPlacement>)>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl GeometrySnapshot {
    /// Whether every captured coordinate matches `other` within `epsilon`, links included.
    pub fn approx_eq(&self, other: &GeometrySnapshot, epsilon: f64) -> bool {
        let nodes = self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .iter()
                .zip(&other.nodes)
                .all(|((a, ra), (b, rb))| a == b && ra.approx_eq(rb, epsilon));
        let edges = self.edges.len() == other.edges.len()
            && self
                .edges
                .iter()
                .zip(&other.edges)
                .all(|((a, sa, ea), (b, sb, eb))| {
                    a == b && anchor_approx_eq(sa, sb, epsilon) && anchor_approx_eq(ea, eb, epsilon)
                });
        let decorations = self.decorations.len() == other.decorations.len()
            && self
                .decorations
                .iter()
                .zip(&other.decorations)
                .all(|((a, ra), (b, rb))| a == b && ra.approx_eq(rb, epsilon));
        let markers = self.markers.len() == other.markers.len()
            && self
                .markers
                .iter()
                .zip(&other.markers)
                .all(|((a, pa), (b, pb))| a == b && placement_approx_eq(pa, pb, epsilon));

        nodes && edges && decorations && markers && self.links == other.links
    }
}

pub(crate) fn anchor_approx_eq(a: &Anchor, b: &Anchor, epsilon: f64) -> bool {
    match (a, b) {
        (Anchor::Free { at: pa }, Anchor::Free { at: pb }) => pa.approx_eq(*pb, epsilon),
        _ => a == b,
    }
}

fn placement_approx_eq(
    a: &Option<MarkerPlacement>,
    b: &Option<MarkerPlacement>,
    epsilon: f64,
) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => {
            let offsets = match (a.offset, b.offset) {
                (Some(pa), Some(pb)) => pa.approx_eq(pb, epsilon),
                (None, None) => true,
                _ => false,
            };
            offsets
                && a.slot == b.slot
                && a.hidden == b.hidden
                && a.label_offset == b.label_offset
                && a.symbol_offset == b.symbol_offset
        }
        (None, None) => true,
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub targets: Vec<EntityRef>,
    pub before: GeometrySnapshot,
    pub after: GeometrySnapshot,
}

impl MoveRecord {
    fn swapped(&self) -> MoveRecord {
        MoveRecord {
            targets: self.targets.clone(),
            before: self.after.clone(),
            after: self.before.clone(),
        }
    }
}

/// Position of a member inside a group's ordered member list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub group: GroupId,
    pub index: usize,
}

/// A group as it was when it was removed, with the parents that listed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: GroupId,
    pub group: Group,
    pub memberships: Vec<Membership>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupCreation {
    pub record: GroupRecord,
    /// Members lifted out of the common parent the new group was nested into.
    #[serde(default)]
    pub displaced: Vec<(EntityRef, Membership)>,
}

/// Everything needed to restore a removed entity and undo its delete cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub entity: EntityPayload,
    /// Insertion position in the store, which drives z-order and side-list tie breaks.
    pub index: usize,
    #[serde(default)]
    pub memberships: Vec<Membership>,
    /// Endpoints freed by the cascade, with the anchor they had before.
    #[serde(default)]
    pub freed: Vec<(EndpointRef, Anchor)>,
    #[serde(default)]
    pub links: Vec<Link>,
    /// Groups the cascade removed because they became empty, in removal order.
    #[serde(default)]
    pub emptied: Vec<GroupRecord>,
}

impl EntityRecord {
    pub(crate) fn bare(entity: EntityPayload, index: usize) -> Self {
        Self {
            entity,
            index,
            memberships: Vec::new(),
            freed: Vec::new(),
            links: Vec::new(),
            emptied: Vec::new(),
        }
    }

    pub fn entity_ref(&self) -> EntityRef {
        self.entity.entity_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityPayload {
    Node { id: NodeId, node: Node },
    Edge { id: EdgeId, edge: Edge },
    Decoration { id: DecorationId, decoration: Decoration },
}

impl EntityPayload {
    pub fn entity_ref(&self) -> EntityRef {
        match self {
            EntityPayload::Node { id, .. } => EntityRef::Node(id.clone()),
            EntityPayload::Edge { id, .. } => EntityRef::Edge(id.clone()),
            EntityPayload::Decoration { id, .. } => EntityRef::Decoration(id.clone()),
        }
    }
}

#[cfg(test)]
mod tests;
