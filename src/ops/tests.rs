// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use rstest::{fixture, rstest};

use super::*;
use crate::model::{EdgeEnd, Point, Side};

#[fixture]
fn move_record() -> MoveRecord {
    let node = NodeId::new("a").expect("node id");
    MoveRecord {
        targets: vec![EntityRef::Node(node.clone())],
        before: GeometrySnapshot {
            nodes: vec![(node.clone(), Rect::new(0.0, 0.0, 40.0, 20.0))],
            ..GeometrySnapshot::default()
        },
        after: GeometrySnapshot {
            nodes: vec![(node, Rect::new(10.0, 0.0, 40.0, 20.0))],
            ..GeometrySnapshot::default()
        },
    }
}

#[rstest]
fn move_inverse_swaps_snapshots(move_record: MoveRecord) {
    let command = Command::Move(move_record.clone());
    let Command::Move(inverse) = command.inverse() else {
        panic!("expected move");
    };
    assert_eq!(inverse.before, move_record.after);
    assert_eq!(inverse.after, move_record.before);
    assert_eq!(command.inverse().inverse(), command);
}

#[rstest]
fn composite_inverse_reverses_order(move_record: MoveRecord) {
    let endpoint = EndpointRef::new(EdgeId::new("e1").expect("edge id"), EdgeEnd::Start);
    let anchor = Command::SetAnchor {
        endpoint,
        before: Anchor::free(Point::new(1.0, 1.0)),
        after: Anchor::Node {
            node: NodeId::new("a").expect("node id"),
            side: Side::East,
        },
    };
    let composite = Command::Composite {
        commands: vec![Command::Move(move_record), anchor.clone()],
    };

    let Command::Composite { commands } = composite.inverse() else {
        panic!("expected composite");
    };
    assert_eq!(commands[0], anchor.inverse());
    assert_eq!(commands[1].kind(), CommandKind::Move);
}

#[rstest]
#[case(0.3, true)]
#[case(0.5, false)]
fn snapshot_comparison_uses_epsilon(
    move_record: MoveRecord,
    #[case] shift: f64,
    #[case] expected: bool,
) {
    let mut nudged = move_record.before.clone();
    nudged.nodes[0].1 = nudged.nodes[0].1.translate(shift, 0.0);
    assert_eq!(move_record.before.approx_eq(&nudged, 0.4), expected);
}

#[test]
fn command_log_serializes_with_op_tag() {
    let command = Command::FlipEdge {
        edge: EdgeId::new("e1").expect("edge id"),
    };
    let json = serde_json::to_value(&command).expect("serialize");
    assert_eq!(json, serde_json::json!({ "op": "flip_edge", "edge": "e1" }));
}
