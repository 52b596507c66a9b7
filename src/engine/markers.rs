// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Per-node marker positions on the ten compass slots.
//!
//! Positions are stored relative to the node's top-left corner so markers follow their node.
//! Hiding a marker only flips a flag; the stored placement survives for unhide and undo.

use std::collections::BTreeSet;

use log::{debug, trace};

use super::Engine;
use crate::error::EngineError;
use crate::model::{
    MarkerKey, MarkerPlacement, MarkerRef, MarkerSpec, NodeId, Point, Rect, SlotKey,
    VariantCatalog, VariantKey,
};
use crate::ops::Command;

/// How `place_marker` should position a marker that has no stored placement yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceOptions {
    /// Explicit position relative to the node's top-left corner.
    pub at: Option<Point>,
    /// Slot search order; empty means the default priority.
    pub priority: Vec<SlotKey>,
}

impl PlaceOptions {
    pub fn slots(priority: impl Into<Vec<SlotKey>>) -> Self {
        Self {
            at: None,
            priority: priority.into(),
        }
    }

    pub fn at(at: Point) -> Self {
        Self {
            at: Some(at),
            priority: Vec::new(),
        }
    }
}

impl Engine {
    pub fn catalog(&self) -> &VariantCatalog {
        &self.catalog
    }

    /// The node that renders a variant's markers by default: the catalog's named owner, or
    /// else the first node (by id) showing that variant.
    pub fn primary_owner(&self, variant: &VariantKey) -> Option<NodeId> {
        if let Some(owner) = self
            .catalog
            .get(variant)
            .and_then(|entry| entry.primary_owner.as_ref())
        {
            if self.store.node(owner).is_some() {
                return Some(owner.clone());
            }
        }
        self.store
            .nodes()
            .filter(|(_, node)| node.active_variant() == Some(variant))
            .map(|(id, _)| id)
            .min()
            .cloned()
    }

    /// Stored position of a marker relative to its node, if it has one.
    fn marker_offset(&self, marker: &MarkerRef) -> Option<Point> {
        let node = self.store.node(&marker.node)?;
        let placement = node.marker_override(&marker.variant, &marker.key)?;
        placement.offset.or_else(|| {
            let rect = node.rect();
            placement
                .slot
                .map(|slot| slot.offset(rect.width, rect.height, self.config.marker_spacing))
        })
    }

    /// Absolute marker position, if the marker has a placement.
    pub fn marker_position(&self, marker: &MarkerRef) -> Option<Point> {
        let origin = self.store.node(&marker.node)?.rect().origin();
        self.marker_offset(marker).map(|offset| origin.add(offset))
    }

    pub fn marker_placement(&self, marker: &MarkerRef) -> Option<&MarkerPlacement> {
        self.store
            .node(&marker.node)?
            .marker_override(&marker.variant, &marker.key)
    }

    /// Markers drawn for `node`: placed, not hidden, and belonging to its active variant.
    pub fn visible_markers(&self, node: &NodeId) -> Vec<(MarkerRef, Point)> {
        let Some(target) = self.store.node(node) else {
            return Vec::new();
        };
        let Some(variant) = target.active_variant() else {
            return Vec::new();
        };
        let Some(overrides) = target.marker_overrides().get(variant) else {
            return Vec::new();
        };
        overrides
            .iter()
            .filter(|(_, placement)| !placement.hidden)
            .filter_map(|(key, _)| {
                let marker = MarkerRef::new(node.clone(), variant.clone(), key.clone());
                self.marker_position(&marker).map(|at| (marker, at))
            })
            .collect()
    }

    fn slot_occupied(
        &self,
        node: &NodeId,
        variant: &VariantKey,
        slot: SlotKey,
        exclude: Option<&MarkerKey>,
    ) -> bool {
        let Some(rect) = self.store.node(node).map(|target| target.rect()) else {
            return false;
        };
        let slot_at = slot.offset(rect.width, rect.height, self.config.marker_spacing);
        self.offset_occupied(node, variant, slot_at, exclude)
    }

    /// Whether a visible marker of `variant` sits within the snap radius of `offset`.
    fn offset_occupied(
        &self,
        node: &NodeId,
        variant: &VariantKey,
        offset: Point,
        exclude: Option<&MarkerKey>,
    ) -> bool {
        let Some(overrides) = self
            .store
            .node(node)
            .and_then(|target| target.marker_overrides().get(variant))
        else {
            return false;
        };
        overrides
            .iter()
            .filter(|(key, placement)| Some(*key) != exclude && !placement.hidden)
            .filter_map(|(key, _)| {
                self.marker_offset(&MarkerRef::new(node.clone(), variant.clone(), key.clone()))
            })
            .any(|at| at.distance(offset) < self.config.marker_snap_radius)
    }

    /// Offset for a marker that found no free slot: rows stacked above N2, one snap radius
    /// apart, first free row wins.
    fn overflow_offset(
        &self,
        node: &NodeId,
        variant: &VariantKey,
        rect: Rect,
        exclude: Option<&MarkerKey>,
    ) -> Point {
        let above = SlotKey::N2.offset(rect.width, rect.height, self.config.marker_spacing);
        let step = self.config.marker_snap_radius;
        let rows = self
            .store
            .node(node)
            .and_then(|target| target.marker_overrides().get(variant))
            .map_or(0, |overrides| overrides.len());
        (1..=rows + 1)
            .map(|row| above.offset(0.0, -step * row as f64))
            .find(|at| !self.offset_occupied(node, variant, *at, exclude))
            .unwrap_or_else(|| above.offset(0.0, -step * (rows + 2) as f64))
    }

    fn free_slot(
        &self,
        node: &NodeId,
        variant: &VariantKey,
        priority: &[SlotKey],
        exclude: Option<&MarkerKey>,
    ) -> Option<SlotKey> {
        let order: &[SlotKey] = if priority.is_empty() {
            &SlotKey::DEFAULT_PRIORITY
        } else {
            priority
        };
        order
            .iter()
            .copied()
            .find(|slot| !self.slot_occupied(node, variant, *slot, exclude))
    }

    /// First slot in `priority` not occupied by a visible marker of the node's active variant.
    pub fn pick_free_slot(
        &self,
        node: &NodeId,
        priority: &[SlotKey],
    ) -> Result<Option<SlotKey>, EngineError> {
        let target = self
            .store
            .node(node)
            .ok_or_else(|| EngineError::not_found(node.clone()))?;
        match target.active_variant() {
            Some(variant) => Ok(self.free_slot(node, variant, priority, None)),
            None => Ok(priority
                .first()
                .copied()
                .or(SlotKey::DEFAULT_PRIORITY.first().copied())),
        }
    }

    /// Resolves a marker position (stored placement, explicit option, catalog default slot,
    /// free slot, or an overflow row above N2) and stores it. Returns the absolute position.
    pub fn place_marker(
        &mut self,
        node: &NodeId,
        variant: &VariantKey,
        key: &MarkerKey,
        options: PlaceOptions,
    ) -> Result<Point, EngineError> {
        let marker = MarkerRef::new(node.clone(), variant.clone(), key.clone());
        let rect = self
            .store
            .node(node)
            .map(|target| target.rect())
            .ok_or_else(|| EngineError::not_found(node.clone()))?;
        self.ensure_local_markers(node, variant);

        if let Some(offset) = self.marker_offset(&marker) {
            return Ok(rect.origin().add(offset));
        }

        let spacing = self.config.marker_spacing;
        let default_slot = self
            .store
            .node(node)
            .and_then(|target| target.local_markers(variant))
            .and_then(|specs| specs.get(key))
            .and_then(|spec| spec.default_slot)
            .filter(|slot| !self.slot_occupied(node, variant, *slot, Some(key)));

        let (offset, slot) = match options.at {
            Some(at) => (at, None),
            None => match default_slot
                .or_else(|| self.free_slot(node, variant, &options.priority, Some(key)))
            {
                Some(slot) => (slot.offset(rect.width, rect.height, spacing), Some(slot)),
                None => (self.overflow_offset(node, variant, rect, Some(key)), None),
            },
        };
        trace!(marker:% = key, slot:? = slot; "marker placed");

        let mut placement = self.marker_placement(&marker).cloned().unwrap_or_default();
        placement.offset = Some(offset);
        placement.slot = slot;
        self.set_marker_override_raw(&marker, Some(placement));
        self.commit();
        Ok(rect.origin().add(offset))
    }

    /// Copies the catalog's marker specs into the node the first time it references a variant.
    fn ensure_local_markers(&mut self, node: &NodeId, variant: &VariantKey) {
        let Some(specs) = self
            .catalog
            .get(variant)
            .map(|entry| entry.markers.clone())
        else {
            return;
        };
        if let Some(target) = self.store.node_mut(node) {
            target
                .local_markers_mut()
                .entry(variant.clone())
                .or_insert(specs);
        }
    }

    /// Local marker spec of a node, copied from the catalog on first reference.
    pub fn marker_spec(&self, marker: &MarkerRef) -> Option<&MarkerSpec> {
        self.store
            .node(&marker.node)?
            .local_markers(&marker.variant)?
            .get(&marker.key)
    }

    /// Writes a placement without recording history. Returns whether the node exists.
    pub(crate) fn set_marker_override_raw(
        &mut self,
        marker: &MarkerRef,
        placement: Option<MarkerPlacement>,
    ) -> bool {
        let Some(node) = self.store.node_mut(&marker.node) else {
            return false;
        };
        node.set_marker_override(marker.variant.clone(), marker.key.clone(), placement);
        self.pending.record_updated(marker.clone().into());
        true
    }

    fn change_marker(
        &mut self,
        marker: &MarkerRef,
        update: impl FnOnce(&mut MarkerPlacement),
    ) -> Result<(Option<MarkerPlacement>, Option<MarkerPlacement>), EngineError> {
        if self.marker_offset(marker).is_none() {
            self.place_marker(
                &marker.node,
                &marker.variant,
                &marker.key,
                PlaceOptions::default(),
            )?;
        }
        let before = self.marker_placement(marker).cloned();
        let mut after = before.clone().unwrap_or_default();
        update(&mut after);
        self.set_marker_override_raw(marker, Some(after.clone()));
        self.commit();
        Ok((before, Some(after)))
    }

    /// Hides a marker, keeping its placement.
    pub fn hide_marker(&mut self, marker: &MarkerRef) -> Result<(), EngineError> {
        let (before, after) = self.change_marker(marker, |placement| placement.hidden = true)?;
        self.record(Command::MarkerVisibility {
            marker: marker.clone(),
            before,
            after,
        });
        Ok(())
    }

    pub fn show_marker(&mut self, marker: &MarkerRef) -> Result<(), EngineError> {
        let (before, after) = self.change_marker(marker, |placement| placement.hidden = false)?;
        self.record(Command::MarkerVisibility {
            marker: marker.clone(),
            before,
            after,
        });
        Ok(())
    }

    /// Where a marker dropped at absolute `at` lands: the nearest slot within the snap radius,
    /// or exactly `at`. Returned relative to the node.
    pub(crate) fn marker_drop(&self, node: &NodeId, at: Point) -> Option<(Point, Option<SlotKey>)> {
        let rect = self.store.node(node)?.rect();
        let relative = at.sub(rect.origin());
        let spacing = self.config.marker_spacing;
        let snapped = SlotKey::ALL
            .iter()
            .map(|slot| (*slot, slot.offset(rect.width, rect.height, spacing)))
            .map(|(slot, offset)| (slot, offset, offset.distance(relative)))
            .filter(|(_, _, distance)| *distance < self.config.marker_snap_radius)
            .min_by(|a, b| a.2.total_cmp(&b.2));
        Some(match snapped {
            Some((slot, offset, _)) => (offset, Some(slot)),
            None => (relative, None),
        })
    }

    /// Moves a marker to absolute `at`, snapping to a nearby slot.
    pub fn move_marker(&mut self, marker: &MarkerRef, at: Point) -> Result<(), EngineError> {
        let (offset, slot) = self
            .marker_drop(&marker.node, at)
            .ok_or_else(|| EngineError::not_found(marker.node.clone()))?;
        let (before, after) = self.change_marker(marker, |placement| {
            placement.offset = Some(offset);
            placement.slot = slot;
        })?;
        self.record(Command::MarkerMove {
            marker: marker.clone(),
            before,
            after,
        });
        Ok(())
    }

    /// Sets the label and symbol sub-offsets, relative to the marker position.
    pub fn set_marker_offsets(
        &mut self,
        marker: &MarkerRef,
        label_offset: Option<Point>,
        symbol_offset: Option<Point>,
    ) -> Result<(), EngineError> {
        let (before, after) = self.change_marker(marker, |placement| {
            placement.label_offset = label_offset;
            placement.symbol_offset = symbol_offset;
        })?;
        self.record(Command::MarkerMove {
            marker: marker.clone(),
            before,
            after,
        });
        Ok(())
    }

    /// Switches the variant a node displays and re-derives its markers.
    pub fn set_active_variant(
        &mut self,
        node: &NodeId,
        variant: Option<VariantKey>,
    ) -> Result<(), EngineError> {
        let before = self.set_active_variant_raw(node, variant.clone())?;
        self.derive_markers(node);
        self.commit();
        self.record(Command::SetVariant {
            node: node.clone(),
            before,
            after: variant,
        });
        Ok(())
    }

    pub(crate) fn set_active_variant_raw(
        &mut self,
        node: &NodeId,
        variant: Option<VariantKey>,
    ) -> Result<Option<VariantKey>, EngineError> {
        let Some(target) = self.store.node_mut(node) else {
            return Err(EngineError::not_found(node.clone()));
        };
        let before = target.active_variant().cloned();
        target.set_active_variant(variant);
        self.touch_node(node);
        Ok(before)
    }

    /// Places the active variant's markers when `node` is that variant's primary owner.
    /// Other nodes only draw markers they hold an explicit placement for.
    pub(crate) fn derive_markers(&mut self, node: &NodeId) {
        let Some(variant) = self
            .store
            .node(node)
            .and_then(|target| target.active_variant().cloned())
        else {
            return;
        };
        self.ensure_local_markers(node, &variant);
        if self.primary_owner(&variant).as_ref() != Some(node) {
            debug!(node:% = node, variant:% = variant; "not the primary owner, markers left as-is");
            return;
        }

        let keys: BTreeSet<MarkerKey> = self
            .store
            .node(node)
            .and_then(|target| target.local_markers(&variant))
            .map(|specs| specs.keys().cloned().collect())
            .unwrap_or_default();
        for key in keys {
            if let Err(err) = self.place_marker(node, &variant, &key, PlaceOptions::default()) {
                debug!(marker:% = key, err:% = err; "marker not placed");
            }
        }
    }
}
