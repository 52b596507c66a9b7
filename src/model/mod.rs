// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model.
//!
//! Nodes (protein boxes), edges (interactions), groups, decorations, marker placements and
//! adjacency links, each addressed by its own typed id.

pub mod decoration;
pub mod edge;
pub mod entity;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod geometry;
pub mod group;
pub mod ids;
pub mod link;
pub mod marker;
pub mod node;

pub use decoration::{Decoration, DecorationStyle};
pub use edge::{Anchor, Edge, EdgeKind, Endpoint};
pub use entity::{EdgeEnd, EndpointRef, EntityKind, EntityRef, MarkerRef};
pub use geometry::{Axis, Point, Rect, Side};
pub use group::{Group, GroupFlags};
pub use ids::{DecorationId, EdgeId, GroupId, Id, IdError, MarkerKey, NodeId, VariantKey};
pub use link::{Link, NodeSide};
pub use marker::{MarkerPlacement, MarkerSpec, SlotKey, VariantCatalog, VariantEntry};
pub use node::Node;
