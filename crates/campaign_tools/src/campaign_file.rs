//! Campaign input files.
//!
//! A campaign file bundles the anchors to generate over with the
//! generation config:
//!
//! ```ron
//! CampaignFile(
//!     anchors: Layout((columns: 6, rows: 4, cell_size: 500, seed: 9)),
//!     config: (counts: (seed: 42, base_enemy_items: { Outpost: 2 })),
//! )
//! ```

use std::path::Path;

use campaign_core::collaborator::RecordingWorld;
use campaign_core::generator::CampaignGenerator;
use campaign_core::graph::{AnchorGraph, AnchorKey, AnchorPoint};
use campaign_core::layout::AnchorLayout;
use campaign_core::math::Vec2Fixed;
use campaign_core::rules::GenerationConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Result, ToolError};

/// An anchor given by hand, in whole world units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplicitAnchor {
    /// Key value.
    pub id: u64,
    /// X position.
    pub x: i32,
    /// Y position.
    pub y: i32,
}

/// Where the anchors come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorSource {
    /// Generate a jittered grid.
    Layout(AnchorLayout),
    /// Use the listed anchors.
    Points(Vec<ExplicitAnchor>),
}

impl Default for AnchorSource {
    fn default() -> Self {
        Self::Layout(AnchorLayout::default())
    }
}

impl AnchorSource {
    /// Build the unconnected anchor graph.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid layout, duplicate anchor ids or
    /// positions beyond the supported coordinate range.
    pub fn build(&self) -> Result<AnchorGraph> {
        let graph = match self {
            Self::Layout(layout) => layout.build()?,
            Self::Points(points) => AnchorGraph::from_points(points.iter().map(|p| {
                AnchorPoint::new(AnchorKey::from_u128(u128::from(p.id)), Vec2Fixed::from_units(p.x, p.y))
            }))?,
        };
        Ok(graph)
    }
}

/// Anchors plus config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignFile {
    /// Anchor source.
    #[serde(default)]
    pub anchors: AnchorSource,
    /// Generation config.
    #[serde(default)]
    pub config: GenerationConfig,
}

impl CampaignFile {
    /// Load from a RON file.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Io`] or [`ToolError::Parse`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_ron_str(&contents)
    }

    /// Parse from a RON string.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Parse`] on malformed input.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        Ok(ron::from_str(ron)?)
    }

    /// Serialize to pretty RON.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Serialize`] if serialization fails.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ToolError::Serialize(e.to_string()))
    }

    /// Build a generator over a fresh [`RecordingWorld`], optionally
    /// overriding the run seed.
    ///
    /// # Errors
    ///
    /// Returns an error if the anchors cannot be built or the config is
    /// invalid for them.
    pub fn generator(&self, seed: Option<u64>) -> Result<CampaignGenerator<RecordingWorld>> {
        let graph = self.anchors.build()?;
        let mut config = self.config.clone();
        if let Some(seed) = seed {
            config.counts.seed = seed;
        }
        config.validate_for(&graph)?;
        debug!(anchors = graph.anchor_count(), seed = config.seed(), "campaign file loaded");
        Ok(CampaignGenerator::new(graph, config, RecordingWorld::new())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_core::error::CampaignError;

    #[test]
    fn test_explicit_points() {
        let file = CampaignFile::from_ron_str(
            "(anchors: Points([(id: 1, x: 0, y: 0), (id: 2, x: 100, y: 0)]))",
        )
        .expect("valid RON");
        let graph = file.anchors.build().expect("unique ids");
        assert_eq!(graph.anchor_count(), 2);
        assert!(graph.contains(AnchorKey::from_u128(2)));
    }

    #[test]
    fn test_far_away_points_are_rejected() {
        let file = CampaignFile::from_ron_str(
            "(anchors: Points([(id: 1, x: 0, y: 0), (id: 2, x: 2000000000, y: 0)]))",
        )
        .expect("valid RON");
        let err = file.anchors.build().unwrap_err();
        assert!(matches!(err, ToolError::Campaign(CampaignError::InvalidConfig(_))));
    }

    #[test]
    fn test_seed_override() {
        let file = CampaignFile::default();
        let generator = file.generator(Some(99)).expect("default file is valid");
        assert_eq!(generator.config().seed(), 99);
    }

    #[test]
    fn test_unknown_wall_anchor_is_rejected() {
        let mut file = CampaignFile {
            anchors: AnchorSource::Points(vec![ExplicitAnchor { id: 1, x: 0, y: 0 }]),
            ..CampaignFile::default()
        };
        file.config.enemy_wall.anchor_candidates = vec![AnchorKey::from_u128(5)];
        let err = file.generator(None).unwrap_err();
        assert!(matches!(err, ToolError::Campaign(CampaignError::UnknownAnchor(_))));
    }

    #[test]
    fn test_round_trip() {
        let file = CampaignFile::default();
        let text = file.to_ron_string().expect("serializable");
        assert_eq!(CampaignFile::from_ron_str(&text).expect("parses"), file);
    }
}
