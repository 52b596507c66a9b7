// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

// Shared deterministic benchmark fixtures (no RNG).

use pathway_canvas::model::{
    Anchor, Edge, EdgeId, EdgeKind, EntityRef, Group, GroupId, Node, NodeId, Rect, Side,
};
use pathway_canvas::store::{Keyed, Snapshot};
use pathway_canvas::{Engine, EngineConfig};

pub const NODE_WIDTH: f64 = 40.0;
pub const NODE_HEIGHT: f64 = 20.0;
const PITCH_X: f64 = 100.0;
const PITCH_Y: f64 = 60.0;

#[derive(Debug, Clone, Copy)]
pub enum Case {
    Small,
    Medium,
    Large,
}

impl Case {
    pub fn id(self) -> &'static str {
        match self {
            Case::Small => "small",
            Case::Medium => "medium",
            Case::Large => "large",
        }
    }

    fn columns(self) -> usize {
        match self {
            Case::Small => 4,
            Case::Medium => 12,
            Case::Large => 30,
        }
    }
}

pub fn node_id(row: usize, col: usize) -> NodeId {
    NodeId::new(format!("n_{row:03}_{col:03}")).expect("node id")
}

/// A square grid of boxes. Every box points east to its neighbour and south to the box
/// below; each row is one group.
pub fn grid(case: Case) -> Snapshot {
    let size = case.columns();
    let mut snapshot = Snapshot::default();

    for row in 0..size {
        for col in 0..size {
            let rect = Rect::new(
                col as f64 * PITCH_X,
                row as f64 * PITCH_Y,
                NODE_WIDTH,
                NODE_HEIGHT,
            );
            snapshot.nodes.push(Keyed::new(node_id(row, col), Node::new(rect)));
        }
    }

    let mut edge_index = 0usize;
    let mut push_edge = |snapshot: &mut Snapshot,
                         from: NodeId,
                         from_side: Side,
                         to: NodeId,
                         to_side: Side| {
        let id = EdgeId::new(format!("e_{edge_index:06}")).expect("edge id");
        edge_index += 1;
        let edge = Edge::new(
            EdgeKind::Directed,
            Anchor::Node {
                node: from,
                side: from_side,
            },
            Anchor::Node {
                node: to,
                side: to_side,
            },
        );
        snapshot.edges.push(Keyed::new(id, edge));
    };
    for row in 0..size {
        for col in 0..size {
            if col + 1 < size {
                push_edge(
                    &mut snapshot,
                    node_id(row, col),
                    Side::East,
                    node_id(row, col + 1),
                    Side::West,
                );
            }
            if row + 1 < size {
                push_edge(
                    &mut snapshot,
                    node_id(row, col),
                    Side::South,
                    node_id(row + 1, col),
                    Side::North,
                );
            }
        }
    }

    for row in 0..size {
        let members = (0..size).map(|col| EntityRef::Node(node_id(row, col))).collect();
        let id = GroupId::new(format!("row_{row:03}")).expect("group id");
        snapshot.groups.push(Keyed::new(id, Group::new(members)));
    }

    snapshot
}

pub fn engine(case: Case) -> Engine {
    Engine::from_snapshot(grid(case), EngineConfig::default()).expect("grid loads")
}
