//! Procedural terrain strip
//!
//! Platforms are laid out in fixed-width slots left to right. Each slot is
//! either a gap or a segment whose surface is exactly one cube above or below
//! the previous one, clamped to a band above the base height.

use serde::{Deserialize, Serialize};

use super::collision::Aabb;
use super::dice::Dice;
use crate::config::RunConfig;

/// A walkable platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainSegment {
    pub id: u32,
    /// Left edge
    pub x: f32,
    /// Top surface
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl TerrainSegment {
    #[inline]
    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_top_left(self.x, self.y, self.width, self.height)
    }
}

/// Visual fill below a segment down to the world floor (no collision)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainExtension {
    pub segment_id: u32,
    /// Horizontal centre
    pub x: f32,
    /// Segment underside
    pub top_y: f32,
    pub height: f32,
}

/// Where a freshly generated segment wants a spike
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpikeSite {
    pub anchor_x: f32,
    /// Centre y of the fully risen spike
    pub surface_y: f32,
}

impl SpikeSite {
    /// Spike sitting centred on top of `segment`
    pub fn on(segment: &TerrainSegment, cube_size: f32) -> Self {
        Self {
            anchor_x: segment.center_x(),
            surface_y: segment.y - cube_size / 2.0,
        }
    }
}

/// Outcome of one generation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationReport {
    pub segments_added: u32,
    pub gaps: u32,
    pub spike_sites: Vec<SpikeSite>,
}

impl GenerationReport {
    pub fn is_empty(&self) -> bool {
        self.segments_added == 0 && self.gaps == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Frontier {
    x: f32,
    y: f32,
}

/// Snap a raw height draw to exactly one cube up or down.
/// Zero counts as non-positive.
pub fn snap_height_delta(draw: i32, cube_size: f32) -> f32 {
    if draw > 0 { cube_size } else { -cube_size }
}

/// Surface height of the slot after one at `prev_y`
pub fn next_platform_y(prev_y: f32, dice: &mut impl Dice, config: &RunConfig) -> f32 {
    let cube = config.cube_size.round() as i32;
    let delta = snap_height_delta(dice.int_between(-cube, cube), config.cube_size);
    (prev_y + delta).clamp(config.min_platform_y(), config.base_platform_y)
}

/// Owns the terrain strip and extends it ahead of the agent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldGenerator {
    segments: Vec<TerrainSegment>,
    extensions: Vec<TerrainExtension>,
    /// Rightmost segment ever created; survives retirement of old segments
    frontier: Option<Frontier>,
    next_id: u32,
}

impl WorldGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Segments ordered by x ascending
    pub fn segments(&self) -> &[TerrainSegment] {
        &self.segments
    }

    pub fn extensions(&self) -> &[TerrainExtension] {
        &self.extensions
    }

    /// X of the rightmost generated segment
    pub fn frontier_x(&self) -> Option<f32> {
        self.frontier.map(|f| f.x)
    }

    /// Lay out the initial strip from x = 0, ignoring the distance gate.
    /// The first `bootstrap_flat_segments` slots stay at base height, and the
    /// slot under the spawn point plus the one after it are never gaps.
    pub fn seed(&mut self, dice: &mut impl Dice, config: &RunConfig) -> GenerationReport {
        self.segments.clear();
        self.extensions.clear();
        self.frontier = None;

        let mut report = GenerationReport::default();
        let mut current_x = 0.0;
        let mut current_y = config.base_platform_y;
        let spawn_slot = (config.spawn_x / config.platform_width).floor().max(0.0) as u32;

        for slot in 0..config.bootstrap_slot_count() {
            let solid = slot == spawn_slot || slot == spawn_slot + 1;
            if !solid && dice.chance(config.gap_chance) {
                current_x += config.platform_width;
                report.gaps += 1;
                continue;
            }

            if slot >= config.bootstrap_flat_segments {
                current_y = next_platform_y(current_y, dice, config);
            }

            self.place_segment(current_x, current_y, config);
            report.segments_added += 1;
            current_x += config.platform_width;
        }

        log::debug!(
            "Seeded terrain: {} segments, {} gaps",
            report.segments_added,
            report.gaps
        );
        report
    }

    /// Append a batch of slots if the agent is close to the frontier.
    ///
    /// With no segments at all the batch starts at x = 0 on base height.
    pub fn extend_if_needed(
        &mut self,
        agent_x: f32,
        dice: &mut impl Dice,
        config: &RunConfig,
    ) -> GenerationReport {
        let (mut current_x, mut current_y) = match self.frontier {
            Some(frontier) => {
                if agent_x <= frontier.x - config.generation_trigger_distance {
                    return GenerationReport::default();
                }
                (frontier.x + config.platform_width, frontier.y)
            }
            None => (0.0, config.base_platform_y),
        };

        let mut report = GenerationReport::default();
        for _ in 0..config.slots_per_batch {
            if dice.chance(config.gap_chance) {
                current_x += config.platform_width;
                report.gaps += 1;
                continue;
            }

            current_y = next_platform_y(current_y, dice, config);
            let segment = self.place_segment(current_x, current_y, config);
            let site = SpikeSite::on(segment, config.cube_size);
            report.segments_added += 1;
            current_x += config.platform_width;

            if dice.chance(config.spike_chance) {
                report.spike_sites.push(site);
            }
        }

        log::debug!(
            "Extended terrain to x={:?}: +{} segments, {} gaps, {} spikes",
            self.frontier_x(),
            report.segments_added,
            report.gaps,
            report.spike_sites.len()
        );
        report
    }

    /// Create a segment and its extension at slot `x` with surface `y`.
    /// Slots must be placed strictly left to right.
    pub fn place_segment(&mut self, x: f32, y: f32, config: &RunConfig) -> &TerrainSegment {
        debug_assert!(self.frontier.is_none_or(|f| x >= f.x + config.platform_width));

        let id = self.next_id;
        self.next_id += 1;

        let segment = TerrainSegment {
            id,
            x,
            y,
            width: config.platform_width,
            height: config.platform_height,
        };
        let underside = y + config.platform_height;
        self.extensions.push(TerrainExtension {
            segment_id: id,
            x: segment.center_x(),
            top_y: underside,
            height: (config.world_height - underside).max(0.0),
        });
        self.frontier = Some(Frontier { x, y });
        self.segments.push(segment);
        &self.segments[self.segments.len() - 1]
    }

    /// Last segment (highest x) whose centre lies strictly within `radius` of `x`
    pub fn segment_near(&self, x: f32, radius: f32) -> Option<&TerrainSegment> {
        self.segments
            .iter()
            .rev()
            .find(|s| (s.center_x() - x).abs() < radius)
    }

    /// Segment whose slot spans `x`
    pub fn segment_at(&self, x: f32) -> Option<&TerrainSegment> {
        self.segments.iter().find(|s| x >= s.x && x < s.right())
    }

    /// Drop extensions whose centre is left of `limit_x`
    pub fn retire_extensions_before(&mut self, limit_x: f32) -> usize {
        let before = self.extensions.len();
        self.extensions.retain(|e| e.x >= limit_x);
        before - self.extensions.len()
    }

    /// Drop segments whose centre is left of `limit_x`, matching the rule
    /// for their extensions. The frontier record is kept so generation still
    /// continues from the right place.
    pub fn retire_segments_before(&mut self, limit_x: f32) -> usize {
        let before = self.segments.len();
        self.segments.retain(|s| s.center_x() >= limit_x);
        before - self.segments.len()
    }
}
