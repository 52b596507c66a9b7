// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ids::{DecorationId, EdgeId, GroupId, MarkerKey, NodeId, VariantKey};

/// Which end of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeEnd {
    Start,
    End,
}

impl EdgeEnd {
    pub const BOTH: [EdgeEnd; 2] = [EdgeEnd::Start, EdgeEnd::End];

    pub fn other(self) -> EdgeEnd {
        match self {
            EdgeEnd::Start => EdgeEnd::End,
            EdgeEnd::End => EdgeEnd::Start,
        }
    }
}

/// One endpoint of one edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EndpointRef {
    pub edge: EdgeId,
    pub end: EdgeEnd,
}

impl EndpointRef {
    pub fn new(edge: EdgeId, end: EdgeEnd) -> Self {
        Self { edge, end }
    }

    pub fn other_end(&self) -> EndpointRef {
        EndpointRef::new(self.edge.clone(), self.end.other())
    }
}

impl fmt::Display for EndpointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = match self.end {
            EdgeEnd::Start => "start",
            EdgeEnd::End => "end",
        };
        write!(f, "{}#{end}", self.edge)
    }
}

/// A marker instance: one marker key of one variant shown on one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerRef {
    pub node: NodeId,
    pub variant: VariantKey,
    pub key: MarkerKey,
}

impl MarkerRef {
    pub fn new(node: NodeId, variant: VariantKey, key: MarkerKey) -> Self {
        Self { node, variant, key }
    }
}

/// Typed reference to any addressable entity of the diagram.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Node(NodeId),
    Edge(EdgeId),
    Decoration(DecorationId),
    Group(GroupId),
    Marker(MarkerRef),
}

impl EntityRef {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Node(_) => EntityKind::Node,
            Self::Edge(_) => EntityKind::Edge,
            Self::Decoration(_) => EntityKind::Decoration,
            Self::Group(_) => EntityKind::Group,
            Self::Marker(_) => EntityKind::Marker,
        }
    }

    /// Whether this entity may be listed as a group member.
    pub fn is_groupable(&self) -> bool {
        !matches!(self, Self::Marker(_))
    }

    pub fn as_node(&self) -> Option<&NodeId> {
        match self {
            Self::Node(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupId> {
        match self {
            Self::Group(id) => Some(id),
            _ => None,
        }
    }
}

impl From<NodeId> for EntityRef {
    fn from(value: NodeId) -> Self {
        Self::Node(value)
    }
}

impl From<EdgeId> for EntityRef {
    fn from(value: EdgeId) -> Self {
        Self::Edge(value)
    }
}

impl From<DecorationId> for EntityRef {
    fn from(value: DecorationId) -> Self {
        Self::Decoration(value)
    }
}

impl From<GroupId> for EntityRef {
    fn from(value: GroupId) -> Self {
        Self::Group(value)
    }
}

impl From<MarkerRef> for EntityRef {
    fn from(value: MarkerRef) -> Self {
        Self::Marker(value)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(id) => write!(f, "node:{id}"),
            Self::Edge(id) => write!(f, "edge:{id}"),
            Self::Decoration(id) => write!(f, "decoration:{id}"),
            Self::Group(id) => write!(f, "group:{id}"),
            Self::Marker(m) => write!(f, "marker:{}/{}/{}", m.node, m.variant, m.key),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Node,
    Edge,
    Decoration,
    Group,
    Marker,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_ref_serializes_with_kind_tag() {
        let node = EntityRef::Node(NodeId::new("n1").expect("node id"));
        let json = serde_json::to_value(&node).expect("serialize");
        assert_eq!(json, serde_json::json!({ "kind": "node", "id": "n1" }));
    }

    #[test]
    fn markers_are_not_groupable() {
        let marker = EntityRef::Marker(MarkerRef::new(
            NodeId::new("n1").expect("node id"),
            VariantKey::new("v1").expect("variant"),
            MarkerKey::new("S15").expect("marker"),
        ));
        assert!(!marker.is_groupable());
        assert_eq!(marker.to_string(), "marker:n1/v1/S15");
    }
}
