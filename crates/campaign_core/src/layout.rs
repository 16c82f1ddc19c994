//! Jittered-grid anchor layouts.
//!
//! Produces the anchor set the pipeline runs on:
//! - One anchor at most per grid cell, jittered around the cell centre
//! - Cells visited from a seeded start cell, wrapping around
//! - Deterministic keys derived from the seed, cell and spawn ordinal
//!
//! Layout is an input to generation, not a pipeline step.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CampaignError, Result};
use crate::graph::{AnchorGraph, AnchorKey, AnchorPoint};
use crate::math::Vec2Fixed;
use crate::rng::{hash_combine64, CampaignRng};

/// Seed offset of the layout stream.
pub const LAYOUT_SEED_OFFSET: u64 = 15401;

/// Jitter as a percentage of the cell size, each way from the centre.
pub const JITTER_PERCENT: u32 = 49;

/// Bounds on jitter retries per cell.
pub const MIN_JITTER_ATTEMPTS: u32 = 1;
/// Bounds on jitter retries per cell.
pub const MAX_JITTER_ATTEMPTS: u32 = 32;

/// Largest extent of a layout along either axis, in world units.
pub const MAX_LAYOUT_EXTENT: u64 = 1_000_000;

const KEY_SALT_HIGH: u64 = 0xA9B4_C3D2_E1F0_ABCD;
const KEY_SALT_LOW: u64 = 0x1D2C_3B4A_5968_7766;

/// Grid layout configuration.
///
/// # Example RON
///
/// ```ron
/// AnchorLayout(columns: 6, rows: 4, cell_size: 500, seed: 9, min_spacing: 150)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorLayout {
    /// Cells along X.
    pub columns: u32,
    /// Cells along Y.
    pub rows: u32,
    /// Cell edge length in world units.
    pub cell_size: u32,
    /// Seed for jitter, start cell and keys.
    #[serde(default)]
    pub seed: u64,
    /// Stop after this many anchors. `None` fills every cell it can.
    #[serde(default)]
    pub target_count: Option<u32>,
    /// Minimum distance between anchors in world units.
    #[serde(default)]
    pub min_spacing: u32,
    /// Jitter retries per cell before the cell is skipped.
    #[serde(default = "default_jitter_attempts")]
    pub jitter_attempts: u32,
}

const fn default_jitter_attempts() -> u32 {
    8
}

impl Default for AnchorLayout {
    fn default() -> Self {
        Self::new(6, 4, 500)
    }
}

impl AnchorLayout {
    /// Grid of `columns` by `rows` cells of `cell_size` units.
    #[must_use]
    pub const fn new(columns: u32, rows: u32, cell_size: u32) -> Self {
        Self {
            columns,
            rows,
            cell_size,
            seed: 0,
            target_count: None,
            min_spacing: 0,
            jitter_attempts: default_jitter_attempts(),
        }
    }

    /// Set the seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Cap the number of anchors.
    #[must_use]
    pub const fn with_target_count(mut self, count: u32) -> Self {
        self.target_count = Some(count);
        self
    }

    /// Set the minimum spacing between anchors.
    #[must_use]
    pub const fn with_min_spacing(mut self, spacing: u32) -> Self {
        self.min_spacing = spacing;
        self
    }

    /// Set jitter retries per cell, clamped to the supported range.
    #[must_use]
    pub fn with_jitter_attempts(mut self, attempts: u32) -> Self {
        self.jitter_attempts = attempts.clamp(MIN_JITTER_ATTEMPTS, MAX_JITTER_ATTEMPTS);
        self
    }

    /// Number of grid cells.
    #[must_use]
    pub const fn cell_count(&self) -> u64 {
        self.columns as u64 * self.rows as u64
    }

    fn validate(&self) -> Result<()> {
        if self.columns == 0 || self.rows == 0 || self.cell_size == 0 {
            return Err(CampaignError::InvalidConfig(
                "layout: columns, rows and cell_size must be positive".to_string(),
            ));
        }
        let width = u64::from(self.columns) * u64::from(self.cell_size);
        let height = u64::from(self.rows) * u64::from(self.cell_size);
        if width > MAX_LAYOUT_EXTENT || height > MAX_LAYOUT_EXTENT {
            return Err(CampaignError::InvalidConfig(format!(
                "layout: extent {width}x{height} exceeds {MAX_LAYOUT_EXTENT}"
            )));
        }
        Ok(())
    }

    /// Deterministic key of the `ordinal`-th anchor, spawned in `cell`.
    #[must_use]
    pub const fn anchor_key(&self, cell: u64, ordinal: u64) -> AnchorKey {
        AnchorKey::from_halves(
            hash_combine64(self.seed, KEY_SALT_HIGH, 0, cell, ordinal),
            hash_combine64(self.seed, KEY_SALT_LOW, 0, cell, ordinal),
        )
    }

    /// Generate the anchors as an unconnected graph.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::InvalidConfig`] for an empty or oversized
    /// grid, or in the unlikely event of a key collision.
    pub fn build(&self) -> Result<AnchorGraph> {
        self.validate()?;
        let attempts = self.jitter_attempts.clamp(MIN_JITTER_ATTEMPTS, MAX_JITTER_ATTEMPTS);
        let target = self.target_count.map_or(u64::MAX, u64::from);
        let cell_count = self.cell_count();
        let cell = i64::from(self.cell_size);
        let jitter = u32::try_from(u64::from(self.cell_size) * u64::from(JITTER_PERCENT) / 100)
            .unwrap_or(u32::MAX / 2);
        let min_spacing_squared = i64::from(self.min_spacing).pow(2);

        let mut rng = CampaignRng::with_offset(self.seed, LAYOUT_SEED_OFFSET);
        let start = rng.next_u64() % cell_count;
        let mut placed: Vec<(i64, i64)> = Vec::new();
        let mut points = Vec::new();

        for offset in 0..cell_count {
            if placed.len() as u64 >= target {
                break;
            }
            let index = (start + offset) % cell_count;
            let min_x = (index % u64::from(self.columns)) as i64 * cell;
            let min_y = (index / u64::from(self.columns)) as i64 * cell;
            let (centre_x, centre_y) = (min_x + cell / 2, min_y + cell / 2);

            for _ in 0..attempts {
                let dx = i64::from(rng.range_inclusive(0, jitter * 2)) - i64::from(jitter);
                let dy = i64::from(rng.range_inclusive(0, jitter * 2)) - i64::from(jitter);
                let x = (centre_x + dx).clamp(min_x, min_x + cell);
                let y = (centre_y + dy).clamp(min_y, min_y + cell);

                let crowded = placed.iter().any(|(px, py)| {
                    let (ex, ey) = (px - x, py - y);
                    ex * ex + ey * ey < min_spacing_squared
                });
                if crowded {
                    continue;
                }

                let key = self.anchor_key(index, placed.len() as u64);
                let position = Vec2Fixed::from_units(
                    i32::try_from(x).unwrap_or(i32::MAX),
                    i32::try_from(y).unwrap_or(i32::MAX),
                );
                points.push(AnchorPoint::new(key, position));
                placed.push((x, y));
                break;
            }
        }

        debug!(
            anchors = points.len(),
            cells = cell_count,
            seed = self.seed,
            "anchor layout built"
        );
        AnchorGraph::from_points(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Fixed;

    #[test]
    fn test_layout_is_deterministic() {
        let layout = AnchorLayout::new(5, 4, 300).with_seed(11);
        let a = layout.build().expect("valid layout");
        let b = layout.build().expect("valid layout");
        assert_eq!(a, b);
        assert_eq!(a.anchor_count(), 20);
    }

    #[test]
    fn test_anchors_stay_in_their_cells() {
        let graph = AnchorLayout::new(3, 3, 100).with_seed(5).build().expect("valid layout");
        let (low, high) = (Fixed::ZERO, Fixed::from_num(300));
        for anchor in graph.anchors() {
            let position = anchor.position();
            assert!(position.x >= low && position.x <= high);
            assert!(position.y >= low && position.y <= high);
        }
    }

    #[test]
    fn test_target_count_and_spacing() {
        let layout = AnchorLayout::new(6, 6, 200)
            .with_seed(2)
            .with_target_count(10)
            .with_min_spacing(50);
        let graph = layout.build().expect("valid layout");
        assert_eq!(graph.anchor_count(), 10);

        let positions: Vec<_> = graph.anchors().map(|a| a.position()).collect();
        for (i, a) in positions.iter().enumerate() {
            for b in &positions[i + 1..] {
                assert!(a.distance_squared(*b) >= crate::math::squared_units(50));
            }
        }
    }

    #[test]
    fn test_different_seeds_give_different_keys() {
        let a = AnchorLayout::new(2, 2, 100).with_seed(1).build().expect("valid layout");
        let b = AnchorLayout::new(2, 2, 100).with_seed(2).build().expect("valid layout");
        let keys_a: Vec<_> = a.keys().collect();
        let keys_b: Vec<_> = b.keys().collect();
        assert_ne!(keys_a, keys_b);
    }

    #[test]
    fn test_empty_grid_is_rejected() {
        assert!(AnchorLayout::new(0, 3, 100).build().is_err());
        assert_eq!(
            AnchorLayout::default().with_jitter_attempts(500).jitter_attempts,
            MAX_JITTER_ATTEMPTS
        );
    }
}
