//! Rendering run results.

use std::fmt::Write as _;

use campaign_core::collaborator::WorldCollaborator;
use campaign_core::generator::CampaignGenerator;
use campaign_core::graph::AnchorKey;
use campaign_core::items::PlacedItem;
use campaign_core::report::GenerationReport;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{Result, ToolError};

/// Output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Pretty RON.
    #[default]
    Ron,
    /// Pretty JSON.
    Json,
}

/// One occupied anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRow {
    /// Anchor key.
    pub anchor: AnchorKey,
    /// X position, whole units.
    pub x: i64,
    /// Y position, whole units.
    pub y: i64,
    /// Connection count.
    pub degree: u32,
    /// Items on the anchor.
    pub items: Vec<PlacedItem>,
}

/// What a CLI run prints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutput {
    /// Run summary.
    pub report: GenerationReport,
    /// Occupied anchors, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placements: Option<Vec<PlacementRow>>,
}

/// Occupied anchors in key order.
#[must_use]
pub fn placement_rows<W: WorldCollaborator>(generator: &CampaignGenerator<W>) -> Vec<PlacementRow> {
    let graph = generator.graph();
    let state = generator.state();
    graph
        .anchors()
        .filter_map(|anchor| {
            let items = state.items_at(anchor.key());
            if items.is_empty() {
                return None;
            }
            let position = anchor.position();
            Some(PlacementRow {
                anchor: anchor.key(),
                x: position.x.to_num::<i64>(),
                y: position.y.to_num::<i64>(),
                degree: anchor.degree(),
                items,
            })
        })
        .collect()
}

/// Encode any serializable value.
///
/// # Errors
///
/// Returns [`ToolError::Serialize`] if encoding fails.
pub fn render<T: Serialize>(value: &T, format: Format) -> Result<String> {
    match format {
        Format::Ron => ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default())
            .map_err(|e| ToolError::Serialize(e.to_string())),
        Format::Json => serde_json::to_string_pretty(value).map_err(|e| ToolError::Serialize(e.to_string())),
    }
}

/// Human-readable summary of a report, one fact per line.
#[must_use]
pub fn summarize(report: &GenerationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "step:          {}", report.step);
    let _ = writeln!(out, "anchors:       {}", report.anchors);
    let _ = writeln!(out, "connections:   {}", report.connections);
    for (label, hq) in [("player hq:", report.player_hq), ("enemy hq:", report.enemy_hq)] {
        match hq {
            Some(key) => {
                let _ = writeln!(out, "{label:<14} {key}");
            }
            None => {
                let _ = writeln!(out, "{label:<14} -");
            }
        }
    }
    for (kind, count) in &report.enemy_items {
        let _ = writeln!(out, "  enemy   {kind:?} x{count}");
    }
    for (kind, count) in &report.neutral_items {
        let _ = writeln!(out, "  neutral {kind:?} x{count}");
    }
    for (kind, count) in &report.missions {
        let _ = writeln!(out, "  mission {kind:?} x{count}");
    }
    let _ = writeln!(out, "transactions:  {}", report.transactions);
    let _ = writeln!(out, "attempts:      {}", report.total_attempts);
    let _ = write!(out, "state hash:    {:016x}", report.state_hash);
    out
}
