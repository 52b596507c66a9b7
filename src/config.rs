// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Engine tuning knobs.
//!
//! Every field has a default, so a host only needs to spell out what it changes:
//!
//! ```
//! # use pathway_canvas::config::EngineConfig;
//! let config = EngineConfig::from_json_str(r#"{ "snap_tolerance": 4.0 }"#).unwrap();
//! assert_eq!(config.snap_tolerance, 4.0);
//! assert_eq!(config.unlink_nudge, 5.0);
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest facing-edge gap for which two nodes count as adjacent.
    pub snap_tolerance: f64,
    /// Minimum perpendicular overlap, as a fraction of the smaller extent.
    pub min_overlap_fraction: f64,
    /// Weight of centre misalignment in the adjacency score.
    pub misalignment_weight: f64,
    /// Distance a node is pushed away from its partner on explicit unlink.
    pub unlink_nudge: f64,
    /// Alignment guide capture distance.
    pub guide_tolerance: f64,
    /// Default gap between a node side and its edge attachment points.
    pub handle_distance: f64,
    /// Capture radius when dropping an edge endpoint onto a side or another endpoint.
    pub endpoint_snap_radius: f64,
    /// Angular tolerance for axis snapping of free endpoints.
    pub axis_snap_degrees: f64,
    /// Radius within which a marker occupies a slot.
    pub marker_snap_radius: f64,
    /// Distance of marker slots from the node outline.
    pub marker_spacing: f64,
    /// Padding around group bounding boxes.
    pub group_padding: f64,
    /// Moves smaller than this on every coordinate are not recorded.
    pub move_epsilon: f64,
    pub history_limit: usize,
    /// Pick tolerance around edge segments.
    pub edge_hit_tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            snap_tolerance: 2.0,
            min_overlap_fraction: 0.25,
            misalignment_weight: 0.25,
            unlink_nudge: 5.0,
            guide_tolerance: 3.0,
            handle_distance: 5.0,
            endpoint_snap_radius: 3.0,
            axis_snap_degrees: 2.0,
            marker_snap_radius: 12.0,
            marker_spacing: 4.0,
            group_padding: 5.0,
            move_epsilon: 0.4,
            history_limit: 256,
            edge_hit_tolerance: 3.0,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}
