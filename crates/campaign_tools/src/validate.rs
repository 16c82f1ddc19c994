//! Campaign file validation.

use std::path::Path;

use campaign_core::connections::connection_problems;
use tracing::{info, warn};

use crate::campaign_file::CampaignFile;
use crate::Result;

/// Everything wrong with a campaign file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Rule consistency problems. Generation refuses to start on these.
    pub errors: Vec<String>,
    /// Suspicious but runnable settings.
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Whether generation would start.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a parsed campaign file.
///
/// # Errors
///
/// Returns an error only if the anchors cannot be built at all.
pub fn validate_campaign(file: &CampaignFile) -> Result<ValidationReport> {
    let graph = file.anchors.build()?;
    let config = &file.config;
    let mut report = ValidationReport {
        errors: config.validation_errors(),
        warnings: Vec::new(),
    };

    for key in config.unknown_anchors(&graph) {
        report.errors.push(format!("allow-listed anchor {key} is not in the anchor set"));
    }
    if config.enemy_wall.anchor_candidates.is_empty() {
        report
            .warnings
            .push("enemy_wall.anchor_candidates is empty: the wall step can never succeed".to_string());
    }
    if graph.anchor_count() < 2 {
        report.errors.extend(connection_problems(&graph, &config.connections));
    }

    let required = config.counts.enemy_plan().len()
        + config.counts.required_neutral_items().values().map(|&n| n as usize).sum::<usize>()
        + 3;
    if required > graph.anchor_count() {
        report.warnings.push(format!(
            "{required} items requested for {} anchors",
            graph.anchor_count()
        ));
    }

    for warning in &report.warnings {
        warn!("{warning}");
    }
    Ok(report)
}

/// Load and validate a campaign file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn validate_campaign_file(path: &Path) -> Result<ValidationReport> {
    let file = CampaignFile::load(path)?;
    let report = validate_campaign(&file)?;
    info!(
        path = %path.display(),
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "campaign file validated"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign_file::{AnchorSource, ExplicitAnchor};
    use campaign_core::graph::AnchorKey;
    use campaign_core::items::EnemyItemType;

    fn points(count: u64) -> AnchorSource {
        AnchorSource::Points(
            (1..=count)
                .map(|id| ExplicitAnchor { id, x: id as i32 * 100, y: 0 })
                .collect(),
        )
    }

    #[test]
    fn test_default_file_only_warns_about_the_wall() {
        let report = validate_campaign(&CampaignFile::default()).expect("builds");
        assert!(report.is_ok());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_unknown_anchor_and_crowding() {
        let mut file = CampaignFile {
            anchors: points(3),
            ..CampaignFile::default()
        };
        file.config.player_hq.anchor_candidates = vec![AnchorKey::from_u128(40)];
        file.config.enemy_wall.anchor_candidates = vec![AnchorKey::from_u128(1)];
        file.config.counts.base_enemy_items.insert(EnemyItemType::Outpost, 4);

        let report = validate_campaign(&file).expect("builds");
        assert!(!report.is_ok());
        assert_eq!(report.errors.len(), 1);
        assert!(report.warnings.iter().any(|w| w.contains("items requested")));
    }

    #[test]
    fn test_single_anchor_cannot_connect() {
        let file = CampaignFile {
            anchors: points(1),
            ..CampaignFile::default()
        };
        assert!(!validate_campaign(&file).expect("builds").is_ok());
    }
}
