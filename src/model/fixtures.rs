// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;

use super::edge::{Anchor, Edge, EdgeKind};
use super::geometry::{Rect, Side};
use super::ids::{DecorationId, EdgeId, GroupId, MarkerKey, NodeId, VariantKey};
use super::marker::{MarkerSpec, VariantCatalog, VariantEntry};
use super::node::Node;
use super::decoration::Decoration;
use crate::store::{Keyed, Snapshot};

pub(crate) fn nid(value: &str) -> NodeId {
    NodeId::new(value).expect("node id")
}

pub(crate) fn eid(value: &str) -> EdgeId {
    EdgeId::new(value).expect("edge id")
}

pub(crate) fn gid(value: &str) -> GroupId {
    GroupId::new(value).expect("group id")
}

pub(crate) fn did(value: &str) -> DecorationId {
    DecorationId::new(value).expect("decoration id")
}

pub(crate) fn variant(value: &str) -> VariantKey {
    VariantKey::new(value).expect("variant key")
}

pub(crate) fn marker_key(value: &str) -> MarkerKey {
    MarkerKey::new(value).expect("marker key")
}

pub(crate) fn on_side(node: &str, side: Side) -> Anchor {
    Anchor::Node {
        node: nid(node),
        side,
    }
}

/// EGFR -> GRB2 -| SOS, plus a free-floating label box.
///
/// ```text
///  egfr (0,0)  --e1-->  grb2 (100,0)
///                          |
///                          e2 (inhibitory)
///                          v
///                       sos (100,60)
/// ```
pub(crate) fn receptor_cascade() -> Snapshot {
    Snapshot {
        nodes: vec![
            Keyed::new(nid("egfr"), Node::new(Rect::new(0.0, 0.0, 40.0, 20.0)).with_label("EGFR")),
            Keyed::new(nid("grb2"), Node::new(Rect::new(100.0, 0.0, 40.0, 20.0)).with_label("GRB2")),
            Keyed::new(nid("sos"), Node::new(Rect::new(100.0, 60.0, 40.0, 20.0)).with_label("SOS")),
        ],
        edges: vec![
            Keyed::new(
                eid("e1"),
                Edge::new(
                    EdgeKind::Directed,
                    on_side("egfr", Side::East),
                    on_side("grb2", Side::West),
                ),
            ),
            Keyed::new(
                eid("e2"),
                Edge::new(
                    EdgeKind::Inhibitory,
                    on_side("grb2", Side::South),
                    on_side("sos", Side::North),
                ),
            ),
        ],
        decorations: vec![Keyed::new(
            did("membrane"),
            Decoration::new(Rect::new(-20.0, -40.0, 200.0, 10.0)),
        )],
        ..Snapshot::default()
    }
}

/// Two boxes 10 units apart with overlapping vertical extents.
pub(crate) fn adjacent_pair() -> Snapshot {
    Snapshot {
        nodes: vec![
            Keyed::new(nid("a"), Node::new(Rect::new(0.0, 0.0, 40.0, 20.0))),
            Keyed::new(nid("b"), Node::new(Rect::new(50.0, 5.0, 40.0, 20.0))),
        ],
        ..Snapshot::default()
    }
}

/// Variant `v1` with two phosphorylation sites, shown by nodes `a` and `b`.
pub(crate) fn phospho_variants() -> Snapshot {
    let mut markers = BTreeMap::new();
    for key in ["siteX", "siteY"] {
        markers.insert(
            marker_key(key),
            MarkerSpec {
                label: Some("P".into()),
                ..MarkerSpec::default()
            },
        );
    }
    let mut catalog = VariantCatalog::default();
    catalog.insert(
        variant("v1"),
        VariantEntry {
            primary_owner: None,
            markers,
        },
    );

    Snapshot {
        nodes: vec![
            Keyed::new(
                nid("a"),
                Node::new(Rect::new(0.0, 0.0, 40.0, 20.0)).with_variant(variant("v1")),
            ),
            Keyed::new(
                nid("b"),
                Node::new(Rect::new(100.0, 0.0, 40.0, 20.0)).with_variant(variant("v1")),
            ),
        ],
        catalog,
        ..Snapshot::default()
    }
}
