// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::entity::{EdgeEnd, EndpointRef};
use super::geometry::{Point, Side};
use super::ids::NodeId;

/// Interaction type drawn by an edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    #[default]
    Directed,
    Inhibitory,
    Plain,
}

/// What an endpoint is held by. Exactly one kind at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Anchor {
    Free { at: Point },
    Node { node: NodeId, side: Side },
    Chained { to: EndpointRef },
}

impl Anchor {
    pub fn free(at: Point) -> Self {
        Self::Free { at }
    }

    pub fn node(&self) -> Option<(&NodeId, Side)> {
        match self {
            Self::Node { node, side } => Some((node, *side)),
            _ => None,
        }
    }

    pub fn chained_to(&self) -> Option<&EndpointRef> {
        match self {
            Self::Chained { to } => Some(to),
            _ => None,
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, Self::Free { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    anchor: Anchor,
    /// Coordinate the endpoint was last drawn at.
    #[serde(default)]
    rendered: Point,
}

impl Endpoint {
    pub fn new(anchor: Anchor) -> Self {
        let rendered = match &anchor {
            Anchor::Free { at } => *at,
            _ => Point::ZERO,
        };
        Self { anchor, rendered }
    }

    pub fn anchor(&self) -> &Anchor {
        &self.anchor
    }

    /// Replaces the anchor, returning the previous one.
    pub(crate) fn replace_anchor(&mut self, anchor: Anchor) -> Anchor {
        if let Anchor::Free { at } = &anchor {
            self.rendered = *at;
        }
        std::mem::replace(&mut self.anchor, anchor)
    }

    pub fn rendered(&self) -> Point {
        self.rendered
    }

    pub(crate) fn set_rendered(&mut self, at: Point) {
        self.rendered = at;
    }
}

/// A connector between two endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default)]
    kind: EdgeKind,
    #[serde(default)]
    dashed: bool,
    start: Endpoint,
    end: Endpoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<SmolStr>,
}

impl Edge {
    pub fn new(kind: EdgeKind, start: Anchor, end: Anchor) -> Self {
        Self {
            kind,
            dashed: false,
            start: Endpoint::new(start),
            end: Endpoint::new(end),
            label: None,
        }
    }

    pub fn with_dashed(mut self, dashed: bool) -> Self {
        self.dashed = dashed;
        self
    }

    pub fn with_label(mut self, label: impl Into<SmolStr>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn kind(&self) -> EdgeKind {
        self.kind
    }

    pub fn dashed(&self) -> bool {
        self.dashed
    }

    pub(crate) fn set_style(&mut self, kind: EdgeKind, dashed: bool) {
        self.kind = kind;
        self.dashed = dashed;
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn endpoint(&self, end: EdgeEnd) -> &Endpoint {
        match end {
            EdgeEnd::Start => &self.start,
            EdgeEnd::End => &self.end,
        }
    }

    pub(crate) fn endpoint_mut(&mut self, end: EdgeEnd) -> &mut Endpoint {
        match end {
            EdgeEnd::Start => &mut self.start,
            EdgeEnd::End => &mut self.end,
        }
    }

    pub(crate) fn swap_ends(&mut self) {
        std::mem::swap(&mut self.start, &mut self.end);
    }

    /// Whether either end is anchored to `node`.
    pub fn touches_node(&self, node: &NodeId) -> bool {
        EdgeEnd::BOTH
            .iter()
            .any(|end| self.endpoint(*end).anchor().node().is_some_and(|(n, _)| n == node))
    }
}
