//! Item kinds an anchor can be promoted to.

use serde::{Deserialize, Serialize};

/// Enemy structures. `EnemyHq` and `EnemyWall` are placed by their own
/// steps; the rest come from the enemy item plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EnemyItemType {
    /// Enemy headquarters.
    EnemyHq,
    /// Enemy wall segment.
    EnemyWall,
    /// Forward outpost.
    Outpost,
    /// Production site.
    Factory,
    /// Road checkpoint.
    Checkpoint,
    /// Artillery emplacement.
    ArtilleryPosition,
    /// Airfield.
    Airfield,
}

impl EnemyItemType {
    /// Whether the type is placed by a dedicated step instead of the item plan.
    #[must_use]
    pub const fn has_dedicated_step(self) -> bool {
        matches!(self, Self::EnemyHq | Self::EnemyWall)
    }
}

/// Neutral map features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NeutralItemType {
    /// Radixite resource field.
    RadixiteField,
    /// Abandoned supply depot.
    AbandonedDepot,
    /// Inhabited village.
    Village,
    /// Ruined city.
    Ruins,
}

/// Campaign missions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MissionType {
    /// Clear a blocked road.
    ClearRoad,
    /// Establish a forward base.
    BuildBase,
    /// Escort a convoy to safety.
    RescueConvoy,
    /// Demolish a bridge.
    DestroyBridge,
    /// Scout a ruined city.
    ScoutRuins,
    /// Hold a village against raids.
    DefendVillage,
}

/// Difficulty band a mission belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MissionTier {
    /// Opening missions.
    Tier1,
    /// Early campaign.
    Tier2,
    /// Mid campaign.
    Tier3,
    /// Late campaign.
    Tier4,
}

/// Broad category of a placed item, used by adjacency requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ItemCategory {
    /// Player-owned item (the player HQ).
    Player,
    /// Enemy item, including the enemy HQ and wall.
    Enemy,
    /// Neutral item.
    Neutral,
    /// Mission marker.
    Mission,
}

/// A concrete item placed on an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PlacedItem {
    /// The player headquarters.
    PlayerHq,
    /// An enemy item.
    Enemy(EnemyItemType),
    /// A neutral item.
    Neutral(NeutralItemType),
    /// A mission.
    Mission(MissionType),
}

impl PlacedItem {
    /// Category of this item.
    #[must_use]
    pub const fn category(self) -> ItemCategory {
        match self {
            Self::PlayerHq => ItemCategory::Player,
            Self::Enemy(_) => ItemCategory::Enemy,
            Self::Neutral(_) => ItemCategory::Neutral,
            Self::Mission(_) => ItemCategory::Mission,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(PlacedItem::PlayerHq.category(), ItemCategory::Player);
        assert_eq!(
            PlacedItem::Enemy(EnemyItemType::EnemyHq).category(),
            ItemCategory::Enemy
        );
        assert_eq!(
            PlacedItem::Mission(MissionType::ScoutRuins).category(),
            ItemCategory::Mission
        );
    }

    #[test]
    fn test_dedicated_enemy_types() {
        assert!(EnemyItemType::EnemyHq.has_dedicated_step());
        assert!(EnemyItemType::EnemyWall.has_dedicated_step());
        assert!(!EnemyItemType::Factory.has_dedicated_step());
    }
}
