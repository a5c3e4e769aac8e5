//! Overlap and containment tests
//!
//! Stand-ins for the broad-phase queries the rendering/physics substrate
//! provides: axis-aligned boxes for bodies, a triangle for spotlight beams.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box (screen space, +y down)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    /// Box of `size` centred on `center`
    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Box from its top-left corner
    pub fn from_top_left(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            max: Vec2::new(x + width, y + height),
        }
    }

    /// Strict overlap: boxes sharing only an edge do not overlap.
    /// Used for solid-body resolution.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Inclusive overlap: touching edges count.
    /// Used for sensors (hiding, floor detector, hazards).
    pub fn touches(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }
}

/// Triangle hit area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    pub points: [Vec2; 3],
}

impl Triangle {
    pub fn new(a: Vec2, b: Vec2, c: Vec2) -> Self {
        Self { points: [a, b, c] }
    }

    /// Point-in-triangle by edge signs; points on an edge are inside.
    /// Works for either winding.
    pub fn contains_point(&self, p: Vec2) -> bool {
        let [a, b, c] = self.points;
        let d1 = edge_sign(p, a, b);
        let d2 = edge_sign(p, b, c);
        let d3 = edge_sign(p, c, a);

        let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
        let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;

        !(has_neg && has_pos)
    }
}

#[inline]
fn edge_sign(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    (p - b).perp_dot(a - b)
}
