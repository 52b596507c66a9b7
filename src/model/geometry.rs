// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-PathwayCanvas-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Pathway Canvas and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Geometric primitives in diagram space.
//!
//! Origin is the top-left corner, x grows rightward and y grows downward (SVG convention).

use serde::{Deserialize, Serialize};

/// A 2D coordinate in diagram space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn add(self, other: Point) -> Self {
        self.offset(other.x, other.y)
    }

    pub fn sub(self, other: Point) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Both coordinates within `epsilon` of `other`.
    pub fn approx_eq(self, other: Point, epsilon: f64) -> bool {
        (self.x - other.x).abs() <= epsilon && (self.y - other.y).abs() <= epsilon
    }
}

/// Axis-aligned rectangle stored as top-left corner plus size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest rect containing both points.
    pub fn spanning(a: Point, b: Point) -> Self {
        let min_x = a.x.min(b.x);
        let min_y = a.y.min(b.y);
        Self::new(min_x, min_y, a.x.max(b.x) - min_x, a.y.max(b.y) - min_y)
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left()
            && point.x <= self.right()
            && point.y >= self.top()
            && point.y <= self.bottom()
    }

    pub fn merge(&self, other: &Rect) -> Self {
        let min_x = self.left().min(other.left());
        let min_y = self.top().min(other.top());
        let max_x = self.right().max(other.right());
        let max_y = self.bottom().max(other.bottom());
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    pub fn pad(&self, padding: f64) -> Self {
        Self::new(
            self.x - padding,
            self.y - padding,
            self.width + 2.0 * padding,
            self.height + 2.0 * padding,
        )
    }

    /// Length of the overlap of the two vertical extents (negative when disjoint).
    pub fn vertical_overlap(&self, other: &Rect) -> f64 {
        self.bottom().min(other.bottom()) - self.top().max(other.top())
    }

    /// Length of the overlap of the two horizontal extents (negative when disjoint).
    pub fn horizontal_overlap(&self, other: &Rect) -> f64 {
        self.right().min(other.right()) - self.left().max(other.left())
    }

    /// Coordinate of the given side's edge line.
    pub fn side_coordinate(&self, side: Side) -> f64 {
        match side {
            Side::North => self.top(),
            Side::South => self.bottom(),
            Side::West => self.left(),
            Side::East => self.right(),
        }
    }

    pub fn approx_eq(&self, other: &Rect, epsilon: f64) -> bool {
        (self.x - other.x).abs() <= epsilon
            && (self.y - other.y).abs() <= epsilon
            && (self.width - other.width).abs() <= epsilon
            && (self.height - other.height).abs() <= epsilon
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }
}

/// One of the four sides of a node rect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    North,
    East,
    South,
    West,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::North, Side::East, Side::South, Side::West];

    pub fn opposite(self) -> Side {
        match self {
            Side::North => Side::South,
            Side::South => Side::North,
            Side::East => Side::West,
            Side::West => Side::East,
        }
    }

    /// Axis along which a link on this side separates the two nodes.
    pub fn normal_axis(self) -> Axis {
        match self {
            Side::East | Side::West => Axis::Horizontal,
            Side::North | Side::South => Axis::Vertical,
        }
    }

    /// Unit direction pointing out of the rect through this side.
    pub fn outward(self) -> Point {
        match self {
            Side::North => Point::new(0.0, -1.0),
            Side::South => Point::new(0.0, 1.0),
            Side::West => Point::new(-1.0, 0.0),
            Side::East => Point::new(1.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Distance from `point` to the segment `a`-`b`.
pub fn distance_to_segment(point: Point, a: Point, b: Point) -> f64 {
    let seg = b.sub(a);
    let len_sq = seg.x * seg.x + seg.y * seg.y;
    if len_sq == 0.0 {
        return point.distance(a);
    }
    let t = (((point.x - a.x) * seg.x + (point.y - a.y) * seg.y) / len_sq).clamp(0.0, 1.0);
    point.distance(Point::new(a.x + t * seg.x, a.y + t * seg.y))
}
