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

use super::geometry::{Rect, Side};
use super::ids::{MarkerKey, VariantKey};
use super::marker::{MarkerPlacement, MarkerSpec};

/// A protein box: a rect with a selectable variant and per-variant marker placements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    rect: Rect,
    #[serde(default)]
    label: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    active_variant: Option<VariantKey>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    marker_overrides: BTreeMap<VariantKey, BTreeMap<MarkerKey, MarkerPlacement>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    local_markers: BTreeMap<VariantKey, BTreeMap<MarkerKey, MarkerSpec>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    handle_distances: BTreeMap<Side, f64>,
}

impl Node {
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            label: SmolStr::default(),
            active_variant: None,
            marker_overrides: BTreeMap::new(),
            local_markers: BTreeMap::new(),
            handle_distances: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<SmolStr>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_variant(mut self, variant: VariantKey) -> Self {
        self.active_variant = Some(variant);
        self
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub(crate) fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn active_variant(&self) -> Option<&VariantKey> {
        self.active_variant.as_ref()
    }

    pub(crate) fn set_active_variant(&mut self, variant: Option<VariantKey>) {
        self.active_variant = variant;
    }

    pub fn marker_overrides(&self) -> &BTreeMap<VariantKey, BTreeMap<MarkerKey, MarkerPlacement>> {
        &self.marker_overrides
    }

    pub fn marker_override(&self, variant: &VariantKey, key: &MarkerKey) -> Option<&MarkerPlacement> {
        self.marker_overrides.get(variant)?.get(key)
    }

    pub(crate) fn set_marker_override(
        &mut self,
        variant: VariantKey,
        key: MarkerKey,
        placement: Option<MarkerPlacement>,
    ) {
        match placement {
            Some(placement) => {
                self.marker_overrides
                    .entry(variant)
                    .or_default()
                    .insert(key, placement);
            }
            None => {
                if let Some(per_variant) = self.marker_overrides.get_mut(&variant) {
                    per_variant.remove(&key);
                    if per_variant.is_empty() {
                        self.marker_overrides.remove(&variant);
                    }
                }
            }
        }
    }

    pub fn local_markers(&self, variant: &VariantKey) -> Option<&BTreeMap<MarkerKey, MarkerSpec>> {
        self.local_markers.get(variant)
    }

    pub(crate) fn local_markers_mut(
        &mut self,
    ) -> &mut BTreeMap<VariantKey, BTreeMap<MarkerKey, MarkerSpec>> {
        &mut self.local_markers
    }

    /// Gap between the side and the point where edge endpoints attach.
    pub fn handle_distance(&self, side: Side, default: f64) -> f64 {
        self.handle_distances.get(&side).copied().unwrap_or(default)
    }

    /// Per-side override, if one is set.
    pub fn handle_distance_override(&self, side: Side) -> Option<f64> {
        self.handle_distances.get(&side).copied()
    }

    pub(crate) fn set_handle_distance(&mut self, side: Side, distance: Option<f64>) {
        match distance {
            Some(distance) => {
                self.handle_distances.insert(side, distance);
            }
            None => {
                self.handle_distances.remove(&side);
            }
        }
    }
}
