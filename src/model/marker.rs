// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::geometry::Point;
use super::ids::{MarkerKey, NodeId, VariantKey};

/// One of the ten named compass positions around a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SlotKey {
    N1,
    N2,
    N3,
    S1,
    S2,
    S3,
    E1,
    E2,
    W1,
    W2,
}

impl SlotKey {
    pub const ALL: [SlotKey; 10] = [
        SlotKey::N1,
        SlotKey::N2,
        SlotKey::N3,
        SlotKey::S1,
        SlotKey::S2,
        SlotKey::S3,
        SlotKey::E1,
        SlotKey::E2,
        SlotKey::W1,
        SlotKey::W2,
    ];

    /// Order used by the free-slot search when the caller gives none.
    pub const DEFAULT_PRIORITY: [SlotKey; 10] = [
        SlotKey::N2,
        SlotKey::N1,
        SlotKey::N3,
        SlotKey::S2,
        SlotKey::S1,
        SlotKey::S3,
        SlotKey::E1,
        SlotKey::E2,
        SlotKey::W1,
        SlotKey::W2,
    ];

    /// Slot position relative to the node's top-left corner.
    pub fn offset(self, width: f64, height: f64, spacing: f64) -> Point {
        let upper = height * 0.33 - 2.0;
        let lower = height * 0.66 + 2.0;
        match self {
            SlotKey::N1 => Point::new(width * 0.2, -spacing),
            SlotKey::N2 => Point::new(width * 0.5, -spacing),
            SlotKey::N3 => Point::new(width * 0.8, -spacing),
            SlotKey::S1 => Point::new(width * 0.2, height + spacing),
            SlotKey::S2 => Point::new(width * 0.5, height + spacing),
            SlotKey::S3 => Point::new(width * 0.8, height + spacing),
            SlotKey::E1 => Point::new(width + spacing, upper),
            SlotKey::E2 => Point::new(width + spacing, lower),
            SlotKey::W1 => Point::new(-spacing, upper),
            SlotKey::W2 => Point::new(-spacing, lower),
        }
    }
}

/// Catalog description of a marker; copied into node-local state on first use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_slot: Option<SlotKey>,
}

/// Per-node placement override for one marker.
///
/// `offset` is relative to the node's top-left corner, so markers travel with their node.
/// A hidden marker keeps its placement so showing it again (or undoing the hide) restores it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerPlacement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<SlotKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_offset: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_offset: Option<Point>,
    #[serde(default)]
    pub hidden: bool,
}

/// Shared description of a variant: its markers and the node that owns their rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_owner: Option<NodeId>,
    #[serde(default)]
    pub markers: BTreeMap<MarkerKey, MarkerSpec>,
}

/// Read-only lookup from variant key to its default marker set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantCatalog {
    entries: BTreeMap<VariantKey, VariantEntry>,
}

impl VariantCatalog {
    pub fn new(entries: BTreeMap<VariantKey, VariantEntry>) -> Self {
        Self { entries }
    }

    pub fn get(&self, variant: &VariantKey) -> Option<&VariantEntry> {
        self.entries.get(variant)
    }

    pub fn entries(&self) -> &BTreeMap<VariantKey, VariantEntry> {
        &self.entries
    }

    pub fn insert(&mut self, variant: VariantKey, entry: VariantEntry) {
        self.entries.insert(variant, entry);
    }
}
