// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::geometry::{Axis, Side};
use super::ids::NodeId;

/// One side of one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeSide {
    pub node: NodeId,
    pub side: Side,
}

impl NodeSide {
    pub fn new(node: NodeId, side: Side) -> Self {
        Self { node, side }
    }
}

impl fmt::Display for NodeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:?}", self.node, self.side)
    }
}

/// Symmetric flush constraint between two facing node sides.
///
/// The pair is stored in canonical order so `Link::new(a, b)` and `Link::new(b, a)` compare
/// equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Link {
    first: NodeSide,
    second: NodeSide,
    axis: Axis,
}

impl Link {
    pub fn new(a: NodeSide, b: NodeSide) -> Self {
        let axis = a.side.normal_axis();
        if a <= b {
            Self {
                first: a,
                second: b,
                axis,
            }
        } else {
            Self {
                first: b,
                second: a,
                axis,
            }
        }
    }

    pub fn first(&self) -> &NodeSide {
        &self.first
    }

    pub fn second(&self) -> &NodeSide {
        &self.second
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn involves(&self, node: &NodeId) -> bool {
        &self.first.node == node || &self.second.node == node
    }

    /// The side of `node` in this link and the partner's side.
    pub fn oriented_from(&self, node: &NodeId) -> Option<(&NodeSide, &NodeSide)> {
        if &self.first.node == node {
            Some((&self.first, &self.second))
        } else if &self.second.node == node {
            Some((&self.second, &self.first))
        } else {
            None
        }
    }
}
