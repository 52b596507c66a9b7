// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use float_cmp::approx_eq;
use rstest::{fixture, rstest};

use super::*;
use crate::error::EngineError;
use crate::model::fixtures::{
    adjacent_pair, did, eid, gid, marker_key, nid, on_side, phospho_variants, receptor_cascade,
    variant,
};
use crate::model::{
    Anchor, Edge, EdgeKind, Group, GroupFlags, Link, MarkerRef, Node, NodeSide, Point, Rect,
    Side, SlotKey,
};
use crate::ops::{EngineEvent, Geometry};

fn load(snapshot: Snapshot) -> Engine {
    Engine::from_snapshot(snapshot, EngineConfig::default()).expect("snapshot loads")
}

#[fixture]
fn cascade() -> Engine {
    load(receptor_cascade())
}

/// `outer` holds only `inner`, which holds egfr and grb2.
#[fixture]
fn grouped() -> Engine {
    let mut snapshot = receptor_cascade();
    snapshot.groups = vec![
        Keyed::new(
            gid("inner"),
            Group::new(vec![EntityRef::Node(nid("egfr")), EntityRef::Node(nid("grb2"))]),
        ),
        Keyed::new(gid("outer"), Group::new(vec![EntityRef::Group(gid("inner"))])),
    ];
    load(snapshot)
}

#[fixture]
fn pair() -> Engine {
    load(adjacent_pair())
}

#[fixture]
fn phospho() -> Engine {
    load(phospho_variants())
}

fn rect_of(engine: &Engine, node: &str) -> Rect {
    engine.store().node(&nid(node)).expect("node").rect()
}

fn endpoint(edge: &str, end: EdgeEnd) -> EndpointRef {
    EndpointRef::new(eid(edge), end)
}

fn anchor_of(engine: &Engine, edge: &str, end: EdgeEnd) -> Anchor {
    engine
        .store()
        .edge(&eid(edge))
        .expect("edge")
        .endpoint(end)
        .anchor()
        .clone()
}

fn position(engine: &Engine, edge: &str, end: EdgeEnd) -> Point {
    engine
        .resolve_endpoint_position(&endpoint(edge, end))
        .expect("endpoint resolves")
}

fn assert_point(actual: Point, x: f64, y: f64) {
    assert!(
        approx_eq!(f64, actual.x, x, epsilon = 1e-9) && approx_eq!(f64, actual.y, y, epsilon = 1e-9),
        "expected ({x}, {y}), got ({}, {})",
        actual.x,
        actual.y
    );
}

fn press(engine: &mut Engine, x: f64, y: f64, modifiers: Modifiers, click_count: u8) {
    engine.handle_event(InputEvent::PointerDown {
        point: Point::new(x, y),
        modifiers,
        click_count,
    });
}

fn drag(engine: &mut Engine, from: (f64, f64), to: (f64, f64), modifiers: Modifiers) {
    press(engine, from.0, from.1, modifiers, 1);
    engine.handle_event(InputEvent::PointerMove {
        point: Point::new(to.0, to.1),
        modifiers,
    });
    engine.handle_event(InputEvent::PointerUp {
        point: Point::new(to.0, to.1),
        modifiers,
    });
}

fn key(engine: &mut Engine, key: Key) {
    engine.handle_event(InputEvent::KeyDown {
        key,
        modifiers: Modifiers::default(),
    });
}

// Loading

#[rstest]
fn load_resolves_anchored_endpoints(mut cascade: Engine) {
    assert_point(position(&cascade, "e1", EdgeEnd::Start), 45.0, 10.0);
    assert_point(position(&cascade, "e1", EdgeEnd::End), 95.0, 10.0);
    assert_point(position(&cascade, "e2", EdgeEnd::Start), 120.0, 25.0);
    assert_point(position(&cascade, "e2", EdgeEnd::End), 120.0, 55.0);
    assert!(cascade.take_deltas().is_empty());
    assert!(cascade.take_events().is_empty());
    assert!(!cascade.can_undo());
}

#[test]
fn load_rejects_duplicate_ids() {
    let mut snapshot = receptor_cascade();
    snapshot
        .nodes
        .push(Keyed::new(nid("egfr"), Node::new(Rect::new(0.0, 0.0, 1.0, 1.0))));
    let err = Engine::from_snapshot(snapshot, EngineConfig::default()).unwrap_err();
    assert_eq!(
        err,
        LoadError::DuplicateId {
            entity: EntityRef::Node(nid("egfr"))
        }
    );
}

#[test]
fn load_rejects_dangling_anchor() {
    let mut snapshot = receptor_cascade();
    snapshot.edges.push(Keyed::new(
        eid("e9"),
        Edge::new(EdgeKind::Plain, on_side("ghost", Side::East), Anchor::free(Point::ZERO)),
    ));
    let err = Engine::from_snapshot(snapshot, EngineConfig::default()).unwrap_err();
    assert_eq!(
        err,
        LoadError::DanglingReference {
            owner: EntityRef::Edge(eid("e9")),
            missing: EntityRef::Node(nid("ghost")),
        }
    );
}

#[test]
fn load_rejects_degenerate_rect() {
    let mut snapshot = receptor_cascade();
    snapshot
        .nodes
        .push(Keyed::new(nid("bad"), Node::new(Rect::new(0.0, 0.0, f64::NAN, 1.0))));
    let err = Engine::from_snapshot(snapshot, EngineConfig::default()).unwrap_err();
    assert!(matches!(err, LoadError::InvalidRect { .. }));
}

#[test]
fn load_rejects_group_cycle() {
    let mut snapshot = receptor_cascade();
    snapshot.groups = vec![
        Keyed::new(gid("x"), Group::new(vec![EntityRef::Group(gid("y"))])),
        Keyed::new(gid("y"), Group::new(vec![EntityRef::Group(gid("x"))])),
    ];
    let err = Engine::from_snapshot(snapshot, EngineConfig::default()).unwrap_err();
    assert!(matches!(err, LoadError::GroupCycle { .. }));
}

#[test]
fn load_rejects_chain_cycle() {
    let mut snapshot = receptor_cascade();
    snapshot.edges.push(Keyed::new(
        eid("x"),
        Edge::new(
            EdgeKind::Plain,
            Anchor::Chained {
                to: endpoint("y", EdgeEnd::Start),
            },
            Anchor::free(Point::ZERO),
        ),
    ));
    snapshot.edges.push(Keyed::new(
        eid("y"),
        Edge::new(
            EdgeKind::Plain,
            Anchor::Chained {
                to: endpoint("x", EdgeEnd::Start),
            },
            Anchor::free(Point::ZERO),
        ),
    ));
    let err = Engine::from_snapshot(snapshot, EngineConfig::default()).unwrap_err();
    assert!(matches!(err, LoadError::ChainCycle { .. }));
}

#[rstest]
fn export_snapshot_reloads_to_the_same_state(grouped: Engine) {
    let exported = grouped.export_snapshot();
    let reloaded = load(exported.clone());
    assert_eq!(reloaded.export_snapshot(), exported);
}

// Attachment

#[rstest]
fn endpoints_sharing_a_side_split_it_by_rank(mut cascade: Engine) {
    let extra = Edge::new(
        EdgeKind::Plain,
        on_side("egfr", Side::East),
        Anchor::free(Point::new(80.0, 30.0)),
    );
    cascade.add_edge(eid("e3"), extra).unwrap();

    assert_eq!(
        cascade.attachments().side_list(&nid("egfr"), Side::East),
        [endpoint("e1", EdgeEnd::Start), endpoint("e3", EdgeEnd::Start)]
    );
    assert_point(position(&cascade, "e1", EdgeEnd::Start), 45.0, 20.0 / 3.0);
    assert_point(position(&cascade, "e3", EdgeEnd::Start), 45.0, 40.0 / 3.0);

    cascade.set_edge_style(&eid("e3"), EdgeKind::Plain, true).unwrap();
    assert_point(position(&cascade, "e3", EdgeEnd::Start), 40.0, 10.0);
    assert_point(position(&cascade, "e1", EdgeEnd::Start), 45.0, 10.0);
}

#[rstest]
fn reattaching_leaves_exactly_one_anchor(mut cascade: Engine) {
    let start = endpoint("e1", EdgeEnd::Start);
    cascade.attach(&start, on_side("sos", Side::West)).unwrap();

    assert_eq!(anchor_of(&cascade, "e1", EdgeEnd::Start), on_side("sos", Side::West));
    assert!(cascade.attachments().side_list(&nid("egfr"), Side::East).is_empty());
    assert_eq!(cascade.attachments().side_list(&nid("sos"), Side::West), [start]);
}

#[rstest]
fn attach_rejects_self_chains_and_cycles(mut cascade: Engine) {
    let e1_end = endpoint("e1", EdgeEnd::End);
    let own = cascade.attach(
        &e1_end,
        Anchor::Chained {
            to: endpoint("e1", EdgeEnd::Start),
        },
    );
    assert!(matches!(own, Err(EngineError::InvalidTopology { .. })));

    cascade
        .attach(
            &endpoint("e2", EdgeEnd::Start),
            Anchor::Chained { to: e1_end.clone() },
        )
        .unwrap();
    let cycle = cascade.attach(
        &e1_end,
        Anchor::Chained {
            to: endpoint("e2", EdgeEnd::Start),
        },
    );
    assert!(matches!(cycle, Err(EngineError::InvalidTopology { .. })));
    assert_eq!(anchor_of(&cascade, "e1", EdgeEnd::End), on_side("grb2", Side::West));
}

#[rstest]
fn chained_endpoint_follows_its_master(mut cascade: Engine) {
    cascade
        .attach(
            &endpoint("e2", EdgeEnd::Start),
            Anchor::Chained {
                to: endpoint("e1", EdgeEnd::End),
            },
        )
        .unwrap();
    assert_point(position(&cascade, "e2", EdgeEnd::Start), 95.0, 10.0);

    cascade.translate(&nid("grb2"), 0.0, 10.0).unwrap();
    assert_point(position(&cascade, "e2", EdgeEnd::Start), 95.0, 20.0);
}

#[rstest]
fn detach_freezes_the_drawn_coordinate(mut cascade: Engine) {
    let at = cascade.detach(&endpoint("e2", EdgeEnd::End)).unwrap();
    assert_point(at, 120.0, 55.0);
    assert_eq!(
        anchor_of(&cascade, "e2", EdgeEnd::End),
        Anchor::free(Point::new(120.0, 55.0))
    );
}

#[rstest]
fn deleting_an_edge_frees_its_chained_slaves(mut cascade: Engine) {
    cascade
        .attach(
            &endpoint("e2", EdgeEnd::Start),
            Anchor::Chained {
                to: endpoint("e1", EdgeEnd::End),
            },
        )
        .unwrap();
    cascade.delete_edge(&eid("e1")).unwrap();

    assert_eq!(
        anchor_of(&cascade, "e2", EdgeEnd::Start),
        Anchor::free(Point::new(95.0, 10.0))
    );

    assert!(cascade.undo());
    assert_eq!(
        anchor_of(&cascade, "e2", EdgeEnd::Start),
        Anchor::Chained {
            to: endpoint("e1", EdgeEnd::End)
        }
    );
}

#[rstest]
fn flip_swaps_anchors_and_undoes(mut cascade: Engine) {
    cascade.flip_edge(&eid("e1")).unwrap();
    assert_eq!(anchor_of(&cascade, "e1", EdgeEnd::Start), on_side("grb2", Side::West));
    assert_eq!(anchor_of(&cascade, "e1", EdgeEnd::End), on_side("egfr", Side::East));

    assert!(cascade.undo());
    assert_eq!(anchor_of(&cascade, "e1", EdgeEnd::Start), on_side("egfr", Side::East));
}

#[rstest]
fn auto_connect_is_one_history_entry(mut cascade: Engine) {
    let created = cascade
        .auto_connect(&nid("egfr"), &[nid("grb2"), nid("sos"), nid("egfr")], EdgeKind::Plain)
        .unwrap();
    assert_eq!(created.len(), 2);
    for id in &created {
        let edge = cascade.store().edge(id).unwrap();
        assert_eq!(edge.endpoint(EdgeEnd::Start).anchor(), &on_side("egfr", Side::East));
    }
    assert_eq!(cascade.history().undo_len(), 1);

    assert!(cascade.undo());
    assert!(created.iter().all(|id| cascade.store().edge(id).is_none()));
    assert_eq!(cascade.store().edges().count(), 2);
}

#[rstest]
fn axis_lock_straightens_a_free_drop(cascade: Engine) {
    // e2 starts at (120, 25); a drop at (121, 200) is within two degrees of vertical.
    let anchor = cascade.resolve_drop(&endpoint("e2", EdgeEnd::End), Point::new(121.0, 200.0), true);
    assert_eq!(anchor, Anchor::free(Point::new(120.0, 200.0)));
}

// Geometry and deltas

#[rstest]
fn translate_reports_node_and_attached_edges(mut cascade: Engine) {
    cascade.translate(&nid("egfr"), 10.0, 0.0).unwrap();
    let deltas = cascade.take_deltas();
    let delta = deltas.last().expect("delta queued");

    assert_eq!(
        delta.geometry_of(&EntityRef::Node(nid("egfr"))),
        Some(&Geometry::Node {
            rect: Rect::new(10.0, 0.0, 40.0, 20.0)
        })
    );
    match delta.geometry_of(&EntityRef::Edge(eid("e1"))) {
        Some(Geometry::Edge { start, .. }) => assert_point(*start, 55.0, 10.0),
        other => panic!("unexpected edge geometry {other:?}"),
    }
    assert!(delta.geometry_of(&EntityRef::Edge(eid("e2"))).is_none());

    let events = cascade.take_events();
    assert!(events.contains(&EngineEvent::Moved(EntityRef::Node(nid("egfr")))));
    assert!(events.contains(&EngineEvent::HistoryChanged {
        can_undo: true,
        can_redo: false
    }));
}

#[rstest]
fn unknown_node_is_a_not_found_no_op(mut cascade: Engine) {
    let err = cascade.translate(&nid("ghost"), 1.0, 1.0).unwrap_err();
    assert!(err.is_not_found());
    assert!(cascade.take_deltas().is_empty());
    assert!(!cascade.can_undo());
}

#[rstest]
fn hit_test_prefers_endpoint_handles(cascade: Engine) {
    assert_eq!(
        cascade.hit_test(Point::new(95.0, 11.0)),
        Some(Hit::Endpoint(endpoint("e1", EdgeEnd::End)))
    );
    assert_eq!(
        cascade.hit_test(Point::new(20.0, 10.0)),
        Some(Hit::Entity(EntityRef::Node(nid("egfr"))))
    );
    assert_eq!(
        cascade.hit_test(Point::new(150.0, -35.0)),
        Some(Hit::Entity(EntityRef::Decoration(did("membrane"))))
    );
    assert_eq!(
        cascade.hit_test(Point::new(70.0, 10.0)),
        Some(Hit::Entity(EntityRef::Edge(eid("e1"))))
    );
    assert_eq!(cascade.hit_test(Point::new(300.0, 300.0)), None);
}

#[rstest]
fn chain_cycle_keeps_the_last_drawn_coordinate(mut cascade: Engine) {
    let e1_end = endpoint("e1", EdgeEnd::End);
    let e2_start = endpoint("e2", EdgeEnd::Start);
    for (from, to) in [(&e1_end, &e2_start), (&e2_start, &e1_end)] {
        cascade
            .store
            .edge_mut(&from.edge)
            .expect("edge")
            .endpoint_mut(from.end)
            .replace_anchor(Anchor::Chained { to: to.clone() });
    }

    let err = cascade.resolve_endpoint_position(&e1_end).unwrap_err();
    assert!(matches!(err, EngineError::CycleDetected { .. }));

    cascade.commit();
    let e1 = cascade.store().edge(&eid("e1")).expect("edge");
    assert_point(e1.endpoint(EdgeEnd::End).rendered(), 95.0, 10.0);
    let e2 = cascade.store().edge(&eid("e2")).expect("edge");
    assert_point(e2.endpoint(EdgeEnd::Start).rendered(), 120.0, 25.0);
}

#[rstest]
fn dashed_edges_sit_at_the_side_centre(mut cascade: Engine) {
    cascade
        .add_edge(
            eid("e3"),
            Edge::new(
                EdgeKind::Directed,
                Anchor::free(Point::new(200.0, 0.0)),
                on_side("sos", Side::North),
            ),
        )
        .unwrap();
    assert_point(position(&cascade, "e2", EdgeEnd::End), 100.0 + 40.0 / 3.0, 55.0);
    assert_point(position(&cascade, "e3", EdgeEnd::End), 100.0 + 80.0 / 3.0, 55.0);

    cascade
        .set_edge_style(&eid("e2"), EdgeKind::Inhibitory, true)
        .unwrap();
    assert_point(position(&cascade, "e2", EdgeEnd::End), 120.0, 60.0);
    // The dashed edge no longer takes a rank, so e3 is alone on the side.
    assert_point(position(&cascade, "e3", EdgeEnd::End), 120.0, 55.0);

    cascade.set_handle_distance(&nid("sos"), Side::North, Some(9.0)).unwrap();
    assert_point(position(&cascade, "e2", EdgeEnd::End), 120.0, 60.0);
    assert_point(position(&cascade, "e3", EdgeEnd::End), 120.0, 51.0);
}

#[rstest]
fn handle_distance_changes_are_undoable(mut cascade: Engine) {
    cascade.set_handle_distance(&nid("sos"), Side::North, Some(9.0)).unwrap();
    assert_point(position(&cascade, "e2", EdgeEnd::End), 120.0, 51.0);
    assert_eq!(cascade.history().undo_len(), 1);

    cascade.set_handle_distance(&nid("sos"), Side::North, Some(9.0)).unwrap();
    assert_eq!(cascade.history().undo_len(), 1);

    assert!(cascade.undo());
    assert_point(position(&cascade, "e2", EdgeEnd::End), 120.0, 55.0);
    assert!(cascade.redo());
    assert_point(position(&cascade, "e2", EdgeEnd::End), 120.0, 51.0);
}

// Links

#[rstest]
fn unlink_separates_and_records(mut pair: Engine) {
    drag(&mut pair, (20.0, 10.0), (28.0, 10.0), Modifiers::default());
    assert_eq!(pair.links().len(), 1);
    let undo_before = pair.history().undo_len();

    let broken = pair.unlink(&nid("a")).unwrap();
    assert_eq!(broken.len(), 1);
    assert!(pair.links().is_empty());
    assert!(approx_eq!(f64, rect_of(&pair, "a").x, 5.0));
    assert_eq!(pair.history().undo_len(), undo_before + 1);

    assert!(pair.undo());
    assert_eq!(pair.links().len(), 1);
    assert!(approx_eq!(f64, rect_of(&pair, "a").x, 10.0));
}

#[rstest]
fn occupied_side_rejects_a_second_partner(mut pair: Engine) {
    drag(&mut pair, (20.0, 10.0), (28.0, 10.0), Modifiers::default());
    pair.add_node(nid("c"), Node::new(Rect::new(50.0, -10.0, 40.0, 20.0)))
        .unwrap();

    // c is flush with a's east side too, but that side already belongs to b.
    let candidates = pair.adjacency_candidates(&nid("a"));
    assert!(!candidates.is_empty());
    assert!(candidates
        .iter()
        .all(|candidate| candidate.partner.node == nid("b")));
}

#[test]
fn load_drops_links_that_double_book_a_side() {
    let mut snapshot = adjacent_pair();
    snapshot.nodes[0] = Keyed::new(nid("a"), Node::new(Rect::new(10.0, 0.0, 40.0, 20.0)));
    snapshot.nodes.push(Keyed::new(
        nid("c"),
        Node::new(Rect::new(50.0, -10.0, 40.0, 20.0)),
    ));
    snapshot.nodes.push(Keyed::new(
        nid("d"),
        Node::new(Rect::new(300.0, 0.0, 40.0, 20.0)),
    ));
    let a_east = NodeSide::new(nid("a"), Side::East);
    let with_b = Link::new(a_east.clone(), NodeSide::new(nid("b"), Side::West));
    snapshot.links = vec![
        with_b.clone(),
        Link::new(a_east.clone(), NodeSide::new(nid("c"), Side::West)),
        Link::new(
            NodeSide::new(nid("b"), Side::East),
            NodeSide::new(nid("d"), Side::West),
        ),
    ];

    let engine = load(snapshot);
    assert_eq!(engine.links().iter().cloned().collect::<Vec<_>>(), [with_b]);
}

#[test]
fn alignment_guides_report_nearby_lines() {
    let mut engine = Engine::default();
    engine
        .add_node(nid("a"), Node::new(Rect::new(0.0, 0.0, 40.0, 20.0)))
        .unwrap();
    engine
        .add_node(nid("c"), Node::new(Rect::new(100.0, 2.0, 40.0, 20.0)))
        .unwrap();

    let guides = engine.alignment_guides(&nid("a"));
    assert_eq!(guides.len(), 3);
    assert!(guides
        .iter()
        .all(|guide| guide.orientation == crate::model::Axis::Horizontal
            && approx_eq!(f64, guide.offset, 2.0)));
}

// Grouping

#[rstest]
fn create_group_nests_into_the_shared_parent(mut cascade: Engine) {
    let outer = cascade
        .create_group(&[
            EntityRef::Node(nid("egfr")),
            EntityRef::Node(nid("grb2")),
            EntityRef::Node(nid("sos")),
        ])
        .unwrap();
    let inner = cascade
        .create_group(&[EntityRef::Node(nid("egfr")), EntityRef::Node(nid("grb2"))])
        .unwrap();

    assert_eq!(
        cascade.groups().get(&outer).unwrap().members(),
        [EntityRef::Group(inner.clone()), EntityRef::Node(nid("sos"))]
    );

    assert!(cascade.undo());
    assert!(cascade.groups().get(&inner).is_none());
    assert_eq!(
        cascade.groups().get(&outer).unwrap().members(),
        [
            EntityRef::Node(nid("egfr")),
            EntityRef::Node(nid("grb2")),
            EntityRef::Node(nid("sos"))
        ]
    );
}

#[rstest]
fn create_group_needs_two_members(mut cascade: Engine) {
    let err = cascade
        .create_group(&[EntityRef::Node(nid("egfr")), EntityRef::Node(nid("egfr"))])
        .unwrap_err();
    assert!(matches!(err, EngineError::ConstraintViolation { .. }));
}

#[rstest]
fn bounding_box_pads_leaf_extents(mut cascade: Engine) {
    let group = cascade
        .create_group(&[EntityRef::Node(nid("egfr")), EntityRef::Node(nid("grb2"))])
        .unwrap();
    let expected = Rect::new(-5.0, -5.0, 150.0, 30.0);
    assert_eq!(cascade.compute_bounding_box(&group, 5.0), Some(expected));
    assert_eq!(cascade.groups().bounds(&group), Some(expected));
}

#[rstest]
fn ungroup_removes_parents_left_empty(mut grouped: Engine) {
    let before = grouped.collect_members(&gid("outer")).unwrap();
    assert_eq!(before, grouped.collect_members(&gid("inner")).unwrap());

    let removed = grouped.ungroup(&gid("inner")).unwrap();
    assert_eq!(removed, [gid("inner"), gid("outer")]);
    assert!(grouped.groups().is_empty());

    assert!(grouped.undo());
    assert_eq!(grouped.collect_members(&gid("outer")).unwrap(), before);
}

#[rstest]
fn add_to_group_rejects_cycles(mut grouped: Engine) {
    let err = grouped
        .add_to_group(&gid("inner"), EntityRef::Group(gid("outer")))
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTopology { .. }));

    grouped
        .add_to_group(&gid("outer"), EntityRef::Node(nid("sos")))
        .unwrap();
    let sos = EntityRef::Node(nid("sos"));
    assert!(grouped.groups().get(&gid("outer")).unwrap().contains(&sos));
    assert!(grouped.undo());
    assert!(!grouped.groups().get(&gid("outer")).unwrap().contains(&sos));
}

#[rstest]
fn deleting_a_group_is_one_undo(mut grouped: Engine) {
    grouped.delete_entity(&EntityRef::Group(gid("outer"))).unwrap();
    assert!(grouped.store().node(&nid("egfr")).is_none());
    assert!(grouped.store().node(&nid("grb2")).is_none());
    assert!(grouped.groups().is_empty());

    assert!(grouped.undo());
    assert_eq!(
        grouped.groups().get(&gid("inner")).unwrap().members(),
        [EntityRef::Node(nid("egfr")), EntityRef::Node(nid("grb2"))]
    );
    assert_eq!(
        grouped.groups().get(&gid("outer")).unwrap().members(),
        [EntityRef::Group(gid("inner"))]
    );
    assert_eq!(anchor_of(&grouped, "e1", EdgeEnd::Start), on_side("egfr", Side::East));
}

#[rstest]
fn group_flag_changes_are_undoable(mut grouped: Engine) {
    let flags = GroupFlags {
        outline: false,
        label: Some("receptor".into()),
    };
    grouped.set_group_flags(&gid("inner"), flags.clone()).unwrap();
    assert_eq!(grouped.groups().get(&gid("inner")).unwrap().flags(), &flags);
    assert_eq!(grouped.history().undo_len(), 1);

    assert!(grouped.undo());
    assert_eq!(
        grouped.groups().get(&gid("inner")).unwrap().flags(),
        &GroupFlags::default()
    );
    assert!(grouped.redo());
    assert_eq!(grouped.groups().get(&gid("inner")).unwrap().flags(), &flags);
}

// Selection

#[rstest]
fn click_climbs_to_the_root_group(mut grouped: Engine) {
    grouped.click(Some(&EntityRef::Node(nid("egfr"))), false);
    assert_eq!(grouped.selection().primary(), Some(&EntityRef::Group(gid("outer"))));

    grouped.enter_group_edit(&gid("outer")).unwrap();
    grouped.click(Some(&EntityRef::Node(nid("egfr"))), false);
    assert_eq!(grouped.selection().primary(), Some(&EntityRef::Group(gid("inner"))));

    grouped.click(Some(&EntityRef::Node(nid("sos"))), false);
    assert_eq!(grouped.editing_group(), None);
    assert_eq!(grouped.selection().items(), [EntityRef::Node(nid("sos"))]);
}

#[rstest]
fn click_inside_a_multi_selection_promotes_primary(mut cascade: Engine) {
    let egfr = EntityRef::Node(nid("egfr"));
    let grb2 = EntityRef::Node(nid("grb2"));
    cascade.click(Some(&egfr), false);
    cascade.click(Some(&grb2), true);
    assert_eq!(cascade.selection().primary(), Some(&grb2));

    cascade.click(Some(&egfr), false);
    assert_eq!(cascade.selection().len(), 2);
    assert_eq!(cascade.selection().primary(), Some(&egfr));
}

#[rstest]
fn delete_selection_records_each_entity(mut cascade: Engine) {
    cascade.click(Some(&EntityRef::Node(nid("egfr"))), false);
    cascade.click(Some(&EntityRef::Decoration(did("membrane"))), true);
    assert_eq!(cascade.delete_selection(), 2);
    assert_eq!(cascade.history().undo_len(), 2);
    assert!(cascade.selection().is_empty());

    assert!(cascade.undo());
    assert!(cascade.store().decoration(&did("membrane")).is_some());
    assert!(cascade.store().node(&nid("egfr")).is_none());
    assert!(cascade.undo());
    assert!(cascade.store().node(&nid("egfr")).is_some());
}

#[rstest]
fn delete_selection_skips_entities_an_earlier_delete_removed(mut grouped: Engine) {
    grouped.enter_group_edit(&gid("outer")).unwrap();
    grouped.click(Some(&EntityRef::Node(nid("egfr"))), false);
    grouped.enter_group_edit(&gid("inner")).unwrap();
    grouped.click(Some(&EntityRef::Node(nid("egfr"))), true);
    assert_eq!(
        grouped.selection().items(),
        [EntityRef::Group(gid("inner")), EntityRef::Node(nid("egfr"))]
    );

    assert_eq!(grouped.delete_selection(), 1);
    assert!(grouped.store().node(&nid("egfr")).is_none());
    assert!(grouped.store().node(&nid("grb2")).is_none());
    assert_eq!(grouped.history().undo_len(), 1);

    assert!(grouped.undo());
    assert!(grouped.store().node(&nid("egfr")).is_some());
    assert!(grouped.store().node(&nid("grb2")).is_some());
}

#[rstest]
fn move_selection_moves_every_kind(mut cascade: Engine) {
    cascade.detach(&endpoint("e2", EdgeEnd::End)).unwrap();
    cascade.click(Some(&EntityRef::Node(nid("egfr"))), false);
    cascade.click(Some(&EntityRef::Decoration(did("membrane"))), true);
    cascade.click(Some(&EntityRef::Edge(eid("e2"))), true);

    assert_eq!(cascade.move_selection(3.0, 4.0), 3);
    assert_eq!(rect_of(&cascade, "egfr"), Rect::new(3.0, 4.0, 40.0, 20.0));
    assert_eq!(
        cascade.store().decoration(&did("membrane")).unwrap().rect(),
        Rect::new(-17.0, -36.0, 200.0, 10.0)
    );
    assert_eq!(
        anchor_of(&cascade, "e2", EdgeEnd::End),
        Anchor::free(Point::new(123.0, 59.0))
    );
    // The anchored start stays on grb2.
    assert_eq!(anchor_of(&cascade, "e2", EdgeEnd::Start), on_side("grb2", Side::South));

    assert!(cascade.undo());
    assert_eq!(rect_of(&cascade, "egfr"), Rect::new(0.0, 0.0, 40.0, 20.0));
}

// History

#[rstest]
fn sub_tolerance_moves_are_not_recorded(mut cascade: Engine) {
    cascade.translate(&nid("egfr"), 0.1, 0.0).unwrap();
    assert!(!cascade.can_undo());
    assert!(approx_eq!(f64, rect_of(&cascade, "egfr").x, 0.1));
}

#[test]
fn history_is_bounded() {
    let config = EngineConfig {
        history_limit: 2,
        ..EngineConfig::default()
    };
    let mut engine = Engine::from_snapshot(receptor_cascade(), config).unwrap();
    for _ in 0..3 {
        engine.translate(&nid("sos"), 10.0, 0.0).unwrap();
    }
    assert_eq!(engine.history().undo_len(), 2);
    assert!(engine.undo());
    assert!(engine.undo());
    assert!(!engine.undo());
    assert!(approx_eq!(f64, rect_of(&engine, "sos").x, 110.0));
}

#[rstest]
fn undo_skips_entries_whose_target_vanished(mut cascade: Engine) {
    cascade.translate(&nid("sos"), 10.0, 0.0).unwrap();
    cascade.delete_node_raw(&nid("sos")).unwrap();
    cascade.commit();

    assert!(!cascade.undo());
    assert!(!cascade.can_undo());
    assert!(!cascade.can_redo());
}

#[rstest]
fn new_command_clears_redo(mut cascade: Engine) {
    cascade.translate(&nid("sos"), 10.0, 0.0).unwrap();
    assert!(cascade.undo());
    assert!(cascade.can_redo());
    cascade.translate(&nid("egfr"), 10.0, 0.0).unwrap();
    assert!(!cascade.can_redo());
}

#[rstest]
fn history_dumps_as_json(mut cascade: Engine) {
    cascade.flip_edge(&eid("e2")).unwrap();
    let json = cascade.history_json().unwrap();
    assert!(json.contains("\"op\": \"flip_edge\""));

    cascade.clear_history();
    assert!(!cascade.can_undo());
}

// Markers

#[rstest]
fn primary_owner_places_variant_markers(phospho: Engine) {
    assert_eq!(phospho.primary_owner(&variant("v1")), Some(nid("a")));

    let visible = phospho.visible_markers(&nid("a"));
    assert_eq!(visible.len(), 2);
    let site_x = MarkerRef::new(nid("a"), variant("v1"), marker_key("siteX"));
    let site_y = MarkerRef::new(nid("a"), variant("v1"), marker_key("siteY"));
    assert_point(phospho.marker_position(&site_x).unwrap(), 20.0, -4.0);
    assert_point(phospho.marker_position(&site_y).unwrap(), 8.0, -4.0);

    assert!(phospho.visible_markers(&nid("b")).is_empty());
    assert!(phospho
        .marker_spec(&MarkerRef::new(nid("b"), variant("v1"), marker_key("siteX")))
        .is_some());
}

#[rstest]
fn markers_travel_with_their_node(mut phospho: Engine) {
    phospho.translate(&nid("a"), 10.0, 5.0).unwrap();
    let site_x = MarkerRef::new(nid("a"), variant("v1"), marker_key("siteX"));
    assert_point(phospho.marker_position(&site_x).unwrap(), 30.0, 1.0);
}

#[rstest]
fn pick_free_slot_skips_occupied(phospho: Engine) {
    let slot = phospho
        .pick_free_slot(&nid("a"), &[SlotKey::N2, SlotKey::N1, SlotKey::N3])
        .unwrap();
    assert_eq!(slot, Some(SlotKey::N3));
    assert!(phospho.pick_free_slot(&nid("ghost"), &[]).is_err());
}

#[rstest]
fn hiding_keeps_the_placement(mut phospho: Engine) {
    let site_x = MarkerRef::new(nid("a"), variant("v1"), marker_key("siteX"));
    phospho.hide_marker(&site_x).unwrap();
    assert_eq!(phospho.visible_markers(&nid("a")).len(), 1);
    assert_eq!(
        phospho.marker_placement(&site_x).unwrap().offset,
        Some(Point::new(20.0, -4.0))
    );

    assert!(phospho.undo());
    assert_eq!(phospho.visible_markers(&nid("a")).len(), 2);
}

#[rstest]
fn moved_marker_snaps_to_a_near_slot(mut phospho: Engine) {
    let site_x = MarkerRef::new(nid("a"), variant("v1"), marker_key("siteX"));
    phospho.move_marker(&site_x, Point::new(33.0, 25.0)).unwrap();
    let placement = phospho.marker_placement(&site_x).unwrap();
    assert_eq!(placement.slot, Some(SlotKey::S3));
    assert_point(placement.offset.unwrap(), 32.0, 24.0);

    phospho.move_marker(&site_x, Point::new(70.0, 70.0)).unwrap();
    let placement = phospho.marker_placement(&site_x).unwrap();
    assert_eq!(placement.slot, None);
    assert_point(placement.offset.unwrap(), 70.0, 70.0);
}

#[rstest]
fn variant_switch_is_undoable(mut phospho: Engine) {
    phospho.set_active_variant(&nid("b"), None).unwrap();
    assert_eq!(phospho.store().node(&nid("b")).unwrap().active_variant(), None);
    assert!(phospho.undo());
    assert_eq!(
        phospho.store().node(&nid("b")).unwrap().active_variant(),
        Some(&variant("v1"))
    );
}

#[test]
fn place_marker_takes_the_next_free_priority_slot() {
    let mut engine = Engine::default();
    engine
        .add_node(nid("a"), Node::new(Rect::new(0.0, 0.0, 40.0, 20.0)))
        .unwrap();
    let priority = [SlotKey::N1, SlotKey::N2];

    let first = engine
        .place_marker(&nid("a"), &variant("v1"), &marker_key("siteX"), PlaceOptions::slots(priority))
        .unwrap();
    let second = engine
        .place_marker(&nid("a"), &variant("v1"), &marker_key("siteY"), PlaceOptions::slots(priority))
        .unwrap();

    assert_point(first, 8.0, -4.0);
    assert_point(second, 20.0, -4.0);
}

#[rstest]
fn overflow_markers_stack_above_the_top_slots(mut phospho: Engine) {
    let priority = [SlotKey::N1, SlotKey::N2];
    let first = phospho
        .place_marker(&nid("a"), &variant("v1"), &marker_key("siteZ"), PlaceOptions::slots(priority))
        .unwrap();
    let second = phospho
        .place_marker(&nid("a"), &variant("v1"), &marker_key("siteW"), PlaceOptions::slots(priority))
        .unwrap();
    assert_point(first, 20.0, -16.0);
    assert_point(second, 20.0, -28.0);

    let site_x = MarkerRef::new(nid("a"), variant("v1"), marker_key("siteX"));
    phospho.hide_marker(&site_x).unwrap();
    assert_eq!(phospho.pick_free_slot(&nid("a"), &[SlotKey::N2]).unwrap(), Some(SlotKey::N2));
}

// Router

#[rstest]
fn drag_snaps_flush_and_links(mut pair: Engine) {
    drag(&mut pair, (20.0, 10.0), (28.0, 10.0), Modifiers::default());

    assert!(approx_eq!(f64, rect_of(&pair, "a").x, 10.0));
    let link = Link::new(
        NodeSide::new(nid("a"), Side::East),
        NodeSide::new(nid("b"), Side::West),
    );
    assert!(pair.links().contains(&link));
    assert!(pair.take_events().contains(&EngineEvent::LinkCreated(link.clone())));
    assert_eq!(pair.history().undo_len(), 1);
    assert_eq!(pair.gesture_phase(), GesturePhase::Idle);

    assert!(pair.undo());
    assert!(approx_eq!(f64, rect_of(&pair, "a").x, 0.0));
    assert!(pair.links().is_empty());
}

#[rstest]
fn dragging_apart_breaks_the_link(mut pair: Engine) {
    drag(&mut pair, (20.0, 10.0), (28.0, 10.0), Modifiers::default());
    pair.take_events();

    drag(&mut pair, (30.0, 10.0), (10.0, 10.0), Modifiers::default());
    assert!(pair.links().is_empty());
    assert!(pair
        .take_events()
        .iter()
        .any(|event| matches!(event, EngineEvent::LinkBroken(_))));
}

#[rstest]
fn link_lock_drags_the_whole_cluster(mut pair: Engine) {
    drag(&mut pair, (20.0, 10.0), (28.0, 10.0), Modifiers::default());
    let lock = Modifiers {
        link_lock: true,
        ..Modifiers::default()
    };
    drag(&mut pair, (30.0, 10.0), (30.0, 40.0), lock);

    assert!(approx_eq!(f64, rect_of(&pair, "a").y, 30.0));
    assert!(approx_eq!(f64, rect_of(&pair, "b").y, 35.0));
    assert_eq!(pair.links().len(), 1);

    assert!(pair.undo());
    assert!(approx_eq!(f64, rect_of(&pair, "b").y, 5.0));
}

#[rstest]
fn drag_relinks_to_a_new_partner_on_the_same_side(mut pair: Engine) {
    drag(&mut pair, (20.0, 10.0), (28.0, 10.0), Modifiers::default());
    pair.add_node(nid("c"), Node::new(Rect::new(200.0, 5.0, 40.0, 20.0)))
        .unwrap();
    pair.take_events();

    drag(&mut pair, (30.0, 10.0), (179.0, 10.0), Modifiers::default());

    assert!(approx_eq!(f64, rect_of(&pair, "a").x, 160.0));
    let with_c = Link::new(
        NodeSide::new(nid("a"), Side::East),
        NodeSide::new(nid("c"), Side::West),
    );
    assert_eq!(pair.links().iter().cloned().collect::<Vec<_>>(), [with_c.clone()]);
    let events = pair.take_events();
    assert!(events.contains(&EngineEvent::LinkCreated(with_c)));
    assert!(events.iter().any(|event| matches!(event, EngineEvent::LinkBroken(_))));
}

#[test]
fn clicking_an_endpoint_without_moving_records_nothing() {
    let mut engine = Engine::default();
    engine
        .add_edge(
            eid("e"),
            Edge::new(
                EdgeKind::Plain,
                Anchor::free(Point::new(0.0, 0.0)),
                Anchor::free(Point::new(100.0, 100.0)),
            ),
        )
        .unwrap();
    engine.clear_history();

    press(&mut engine, 102.0, 100.0, Modifiers::default(), 1);
    engine.handle_event(InputEvent::PointerUp {
        point: Point::new(102.0, 100.0),
        modifiers: Modifiers::default(),
    });
    assert!(!engine.can_undo());
    assert_eq!(anchor_of(&engine, "e", EdgeEnd::End), Anchor::free(Point::new(100.0, 100.0)));

    drag(&mut engine, (102.0, 100.0), (152.0, 90.0), Modifiers::default());
    assert_eq!(anchor_of(&engine, "e", EdgeEnd::End), Anchor::free(Point::new(150.0, 90.0)));
    assert_eq!(engine.history().undo_len(), 1);
}

#[test]
fn align_modifier_snaps_to_guides() {
    let mut engine = Engine::default();
    engine
        .add_node(nid("a"), Node::new(Rect::new(0.0, 0.0, 40.0, 20.0)))
        .unwrap();
    engine
        .add_node(nid("c"), Node::new(Rect::new(100.0, 2.0, 40.0, 20.0)))
        .unwrap();
    let align = Modifiers {
        align: true,
        ..Modifiers::default()
    };
    drag(&mut engine, (20.0, 10.0), (20.0, 11.0), align);
    assert!(approx_eq!(f64, rect_of(&engine, "a").y, 2.0));
}

#[rstest]
fn endpoint_drag_reanchors_on_release(mut cascade: Engine) {
    drag(&mut cascade, (95.0, 10.0), (110.0, 55.0), Modifiers::default());
    assert_eq!(anchor_of(&cascade, "e1", EdgeEnd::End), on_side("sos", Side::North));
    assert_eq!(
        cascade.attachments().side_list(&nid("sos"), Side::North),
        [endpoint("e1", EdgeEnd::End), endpoint("e2", EdgeEnd::End)]
    );

    assert!(cascade.undo());
    assert_eq!(anchor_of(&cascade, "e1", EdgeEnd::End), on_side("grb2", Side::West));
}

#[rstest]
fn double_click_enters_group_edit_and_escape_leaves(mut grouped: Engine) {
    press(&mut grouped, 20.0, 10.0, Modifiers::default(), 2);
    grouped.handle_event(InputEvent::PointerUp {
        point: Point::new(20.0, 10.0),
        modifiers: Modifiers::default(),
    });
    assert_eq!(grouped.editing_group(), Some(&gid("outer")));
    assert_eq!(grouped.selection().primary(), Some(&EntityRef::Group(gid("inner"))));
    assert!(!grouped.can_undo());

    key(&mut grouped, Key::Escape);
    assert_eq!(grouped.editing_group(), None);
}

#[rstest]
fn clicking_outside_the_edited_group_leaves_group_edit(mut grouped: Engine) {
    press(&mut grouped, 20.0, 10.0, Modifiers::default(), 2);
    grouped.handle_event(InputEvent::PointerUp {
        point: Point::new(20.0, 10.0),
        modifiers: Modifiers::default(),
    });
    assert_eq!(grouped.editing_group(), Some(&gid("outer")));

    press(&mut grouped, 120.0, 70.0, Modifiers::default(), 1);
    grouped.handle_event(InputEvent::PointerUp {
        point: Point::new(120.0, 70.0),
        modifiers: Modifiers::default(),
    });
    assert_eq!(grouped.editing_group(), None);
    assert_eq!(grouped.selection().items(), [EntityRef::Node(nid("sos"))]);
}

#[rstest]
fn delete_key_frees_attached_endpoints(mut cascade: Engine) {
    press(&mut cascade, 20.0, 10.0, Modifiers::default(), 1);
    cascade.handle_event(InputEvent::PointerUp {
        point: Point::new(20.0, 10.0),
        modifiers: Modifiers::default(),
    });
    key(&mut cascade, Key::Delete);

    assert!(cascade.store().node(&nid("egfr")).is_none());
    assert_eq!(
        anchor_of(&cascade, "e1", EdgeEnd::Start),
        Anchor::free(Point::new(45.0, 10.0))
    );

    key(&mut cascade, Key::Undo);
    assert_eq!(anchor_of(&cascade, "e1", EdgeEnd::Start), on_side("egfr", Side::East));
    key(&mut cascade, Key::Redo);
    assert!(cascade.store().node(&nid("egfr")).is_none());
}

#[rstest]
fn click_on_empty_canvas_clears_selection(mut cascade: Engine) {
    cascade.click(Some(&EntityRef::Node(nid("egfr"))), false);
    press(&mut cascade, 400.0, 400.0, Modifiers::default(), 1);
    assert!(cascade.selection().is_empty());
    assert_eq!(cascade.gesture_phase(), GesturePhase::Idle);
}
