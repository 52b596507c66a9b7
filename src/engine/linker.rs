// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Soft flush constraints between facing node sides.

use std::collections::BTreeSet;

use log::debug;

use super::traverse::depth_first;
use super::Engine;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::model::{Axis, EntityRef, Link, NodeId, NodeSide, Point, Rect, Side};
use crate::ops::{Command, EngineEvent, MoveRecord};

#[derive(Debug, Clone, Default)]
pub struct LinkTable {
    links: BTreeSet<Link>,
}

impl LinkTable {
    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn contains(&self, link: &Link) -> bool {
        self.links.contains(link)
    }

    /// The side linked to `side`, if any. A node side holds at most one link.
    pub fn partner(&self, side: &NodeSide) -> Option<&NodeSide> {
        self.links.iter().find_map(|link| {
            if link.first() == side {
                Some(link.second())
            } else if link.second() == side {
                Some(link.first())
            } else {
                None
            }
        })
    }

    pub fn links_of(&self, node: &NodeId) -> Vec<Link> {
        self.links
            .iter()
            .filter(|link| link.involves(node))
            .cloned()
            .collect()
    }

    /// Every node reachable from `node` through links, `node` first.
    pub fn cluster(&self, node: &NodeId) -> Vec<NodeId> {
        depth_first([node.clone()], |current, out| {
            for link in self.links.iter() {
                if let Some((_, partner)) = link.oriented_from(current) {
                    out.push(partner.node.clone());
                }
            }
        })
    }

    pub(crate) fn insert(&mut self, link: Link) -> bool {
        self.links.insert(link)
    }

    pub(crate) fn remove(&mut self, link: &Link) -> bool {
        self.links.remove(link)
    }
}

/// A possible flush placement of a moving node against a neighbour.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjacencyCandidate {
    pub mine: NodeSide,
    pub partner: NodeSide,
    /// Signed distance between the facing edges; negative when they overlap.
    pub gap: f64,
    pub score: f64,
}

impl AdjacencyCandidate {
    /// Delta that makes the moving node sit exactly flush.
    pub fn nudge(&self) -> Point {
        match self.mine.side {
            Side::East => Point::new(self.gap, 0.0),
            Side::West => Point::new(-self.gap, 0.0),
            Side::South => Point::new(0.0, self.gap),
            Side::North => Point::new(0.0, -self.gap),
        }
    }
}

/// A snapping line shared with another node.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentGuide {
    /// `Vertical` for a line of constant x, `Horizontal` for constant y.
    pub orientation: Axis,
    pub position: f64,
    pub partner: NodeId,
    /// Correction that puts the moving node on the guide.
    pub offset: f64,
}

/// Gap and centre misalignment when `side` of `a` faces `b`, or `None` when the pair is not
/// adjacent within tolerance.
fn facing(a: &Rect, side: Side, b: &Rect, config: &EngineConfig) -> Option<(f64, f64)> {
    let gap = match side {
        Side::East => b.left() - a.right(),
        Side::West => a.left() - b.right(),
        Side::South => b.top() - a.bottom(),
        Side::North => a.top() - b.bottom(),
    };
    if gap.abs() > config.snap_tolerance {
        return None;
    }

    let (overlap, smaller, misalignment) = match side.normal_axis() {
        Axis::Horizontal => (
            a.vertical_overlap(b),
            a.height.min(b.height),
            (a.center().y - b.center().y).abs(),
        ),
        Axis::Vertical => (
            a.horizontal_overlap(b),
            a.width.min(b.width),
            (a.center().x - b.center().x).abs(),
        ),
    };
    if overlap <= 0.0 || overlap < config.min_overlap_fraction * smaller {
        return None;
    }
    Some((gap, misalignment))
}

fn guide_lines(rect: &Rect, orientation: Axis) -> [f64; 3] {
    match orientation {
        Axis::Vertical => [rect.left(), rect.center().x, rect.right()],
        Axis::Horizontal => [rect.top(), rect.center().y, rect.bottom()],
    }
}

impl Engine {
    pub fn links(&self) -> &LinkTable {
        &self.links
    }

    /// Nodes link only within a shared direct parent group, or when neither is grouped.
    fn share_scope(&self, a: &NodeId, b: &NodeId) -> bool {
        let parents_a = self.groups.parents_of(&EntityRef::Node(a.clone()));
        let parents_b = self.groups.parents_of(&EntityRef::Node(b.clone()));
        if parents_a.is_empty() && parents_b.is_empty() {
            return true;
        }
        parents_a.iter().any(|group| parents_b.contains(group))
    }

    /// Adjacency candidates for `node`, best first.
    pub fn adjacency_candidates(&self, node: &NodeId) -> Vec<AdjacencyCandidate> {
        let Some(rect) = self.store.node(node).map(|n| n.rect()) else {
            return Vec::new();
        };

        let mut candidates = Vec::new();
        for (other, other_node) in self.store.nodes() {
            if other == node || !self.share_scope(node, other) {
                continue;
            }
            let other_rect = other_node.rect();
            for side in Side::ALL {
                let Some((gap, misalignment)) = facing(&rect, side, &other_rect, &self.config)
                else {
                    continue;
                };
                let mine = NodeSide::new(node.clone(), side);
                let partner = NodeSide::new(other.clone(), side.opposite());
                let occupied = self.holding_partner(&mine).is_some_and(|p| p != &partner)
                    || self.holding_partner(&partner).is_some_and(|p| p != &mine);
                if occupied {
                    continue;
                }
                candidates.push(AdjacencyCandidate {
                    mine,
                    partner,
                    gap,
                    score: gap.abs() + self.config.misalignment_weight * misalignment,
                });
            }
        }

        candidates.sort_by(|a, b| a.score.total_cmp(&b.score));
        candidates
    }

    /// Whether both sides of `link` still exist and face each other within tolerance.
    pub(crate) fn link_holds(&self, link: &Link) -> bool {
        if link.second().side != link.first().side.opposite() {
            return false;
        }
        let first = self.store.node(&link.first().node).map(|n| n.rect());
        let second = self.store.node(&link.second().node).map(|n| n.rect());
        match (first, second) {
            (Some(a), Some(b)) => facing(&a, link.first().side, &b, &self.config).is_some(),
            _ => false,
        }
    }

    /// Partner of `side` through a link that still holds. A link the current move has already
    /// broken does not occupy the side.
    fn holding_partner(&self, side: &NodeSide) -> Option<&NodeSide> {
        let partner = self.links.partner(side)?;
        self.link_holds(&Link::new(side.clone(), partner.clone()))
            .then_some(partner)
    }

    /// Links `node` to its best candidate, nudging it flush. Returns the link when one holds.
    pub(crate) fn snap_node(&mut self, node: &NodeId) -> Option<Link> {
        self.validate_links();
        let best = self.adjacency_candidates(node).into_iter().next()?;
        let nudge = best.nudge();
        if !nudge.is_zero() {
            self.translate_raw(node, nudge.x, nudge.y).ok()?;
        }
        let link = Link::new(best.mine, best.partner);
        if self.links.insert(link.clone()) {
            debug!(first:% = link.first(), second:% = link.second(); "link created");
            self.events.push(EngineEvent::LinkCreated(link.clone()));
        }
        Some(link)
    }

    /// Drops every link that no longer satisfies the tolerance and overlap rules.
    pub(crate) fn validate_links(&mut self) {
        let broken: Vec<Link> = self
            .links
            .iter()
            .filter(|link| !self.link_holds(link))
            .cloned()
            .collect();

        for link in broken {
            self.links.remove(&link);
            debug!(first:% = link.first(), second:% = link.second(); "link broken");
            self.events.push(EngineEvent::LinkBroken(link));
        }
    }

    /// Removes every link of `node` without moving anything.
    pub(crate) fn remove_links_of(&mut self, node: &NodeId) -> Vec<Link> {
        let removed = self.links.links_of(node);
        for link in &removed {
            self.links.remove(link);
            self.events.push(EngineEvent::LinkBroken(link.clone()));
        }
        removed
    }

    /// Swaps the link table for `links`, dropping any that reference missing nodes.
    pub(crate) fn replace_links(&mut self, links: impl IntoIterator<Item = Link>) {
        let wanted: BTreeSet<Link> = links
            .into_iter()
            .filter(|link| {
                self.store.node(&link.first().node).is_some()
                    && self.store.node(&link.second().node).is_some()
            })
            .collect();

        let stale: Vec<Link> = self
            .links
            .iter()
            .filter(|link| !wanted.contains(*link))
            .cloned()
            .collect();
        for link in stale {
            self.links.remove(&link);
            self.events.push(EngineEvent::LinkBroken(link));
        }
        for link in wanted {
            if self.links.insert(link.clone()) {
                self.events.push(EngineEvent::LinkCreated(link));
            }
        }
    }

    /// Breaks every link of `node` and pushes it away from each former partner.
    pub fn unlink(&mut self, node: &NodeId) -> Result<Vec<Link>, EngineError> {
        if self.store.node(node).is_none() {
            return Err(EngineError::not_found(node.clone()));
        }
        let links = self.links.links_of(node);
        if links.is_empty() {
            return Ok(links);
        }

        let leaves = BTreeSet::from([EntityRef::Node(node.clone())]);
        let before = self.capture(&leaves);
        self.remove_links_of(node);

        let mut push = Point::ZERO;
        for link in &links {
            if let Some((mine, _)) = link.oriented_from(node) {
                let away = mine.side.outward();
                push = push.offset(
                    -away.x * self.config.unlink_nudge,
                    -away.y * self.config.unlink_nudge,
                );
            }
        }
        self.translate_raw(node, push.x, push.y)?;
        self.commit();

        let after = self.capture(&leaves);
        self.record(Command::Unlink(MoveRecord {
            targets: vec![EntityRef::Node(node.clone())],
            before,
            after,
        }));
        Ok(links)
    }

    /// Guides for `node` at its current position.
    pub fn alignment_guides(&self, node: &NodeId) -> Vec<AlignmentGuide> {
        match self.store.node(node) {
            Some(target) => self.guides_for(node, &target.rect()),
            None => Vec::new(),
        }
    }

    /// Guides for `node` if it were placed at `rect`, nearest first per orientation.
    pub(crate) fn guides_for(&self, node: &NodeId, rect: &Rect) -> Vec<AlignmentGuide> {
        let mut guides = Vec::new();
        for (other, other_node) in self.store.nodes() {
            if other == node {
                continue;
            }
            let other_rect = other_node.rect();
            for orientation in [Axis::Vertical, Axis::Horizontal] {
                for mine in guide_lines(rect, orientation) {
                    for theirs in guide_lines(&other_rect, orientation) {
                        let offset = theirs - mine;
                        if offset.abs() <= self.config.guide_tolerance {
                            guides.push(AlignmentGuide {
                                orientation,
                                position: theirs,
                                partner: other.clone(),
                                offset,
                            });
                        }
                    }
                }
            }
        }
        guides.sort_by(|a, b| a.offset.abs().total_cmp(&b.offset.abs()));
        guides
    }

    /// Delta that moves `rect` onto the nearest guide on each axis.
    pub(crate) fn align_correction(&self, node: &NodeId, rect: &Rect) -> Point {
        let guides = self.guides_for(node, rect);
        let dx = guides
            .iter()
            .find(|guide| guide.orientation == Axis::Vertical)
            .map_or(0.0, |guide| guide.offset);
        let dy = guides
            .iter()
            .find(|guide| guide.orientation == Axis::Horizontal)
            .map_or(0.0, |guide| guide.offset);
        Point::new(dx, dy)
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;

    use super::*;

    #[test]
    fn facing_requires_overlap_and_tolerance() {
        let config = EngineConfig::default();
        let a = Rect::new(8.0, 0.0, 40.0, 20.0);
        let b = Rect::new(50.0, 5.0, 40.0, 20.0);
        let (gap, misalignment) = facing(&a, Side::East, &b, &config).expect("adjacent");
        assert!(approx_eq!(f64, gap, 2.0));
        assert!(approx_eq!(f64, misalignment, 5.0));

        let far = Rect::new(53.0, 5.0, 40.0, 20.0);
        assert!(facing(&a, Side::East, &far, &config).is_none());

        let sliver = Rect::new(50.0, 18.0, 40.0, 20.0);
        assert!(facing(&a, Side::East, &sliver, &config).is_none());
    }

    #[test]
    fn cluster_walk_terminates_on_cycles() {
        let id = |name: &str| NodeId::new(name).expect("node id");
        let mut table = LinkTable::default();
        table.insert(Link::new(
            NodeSide::new(id("a"), Side::East),
            NodeSide::new(id("b"), Side::West),
        ));
        table.insert(Link::new(
            NodeSide::new(id("b"), Side::South),
            NodeSide::new(id("c"), Side::North),
        ));
        table.insert(Link::new(
            NodeSide::new(id("c"), Side::West),
            NodeSide::new(id("a"), Side::East),
        ));

        let cluster = table.cluster(&id("a"));
        assert_eq!(cluster.len(), 3);
        assert_eq!(cluster[0], id("a"));
    }
}
