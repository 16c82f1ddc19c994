//! Connection-generation rules.

use serde::{Deserialize, Serialize};

/// Degree bounds and search radius for the connection generator.
///
/// # Example RON
///
/// ```ron
/// ConnectionRules(
///     min_connections: 1,
///     max_connections: 2,
///     max_preferred_distance: 4294967295,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRules {
    /// Minimum degree every anchor must reach.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Maximum degree any anchor may reach.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Radius of the preferred phase in world units. `u32::MAX` is unbounded.
    #[serde(default = "default_max_preferred_distance")]
    pub max_preferred_distance: u32,
}

const fn default_min_connections() -> u32 {
    1
}

const fn default_max_connections() -> u32 {
    3
}

const fn default_max_preferred_distance() -> u32 {
    5000
}

impl Default for ConnectionRules {
    fn default() -> Self {
        Self {
            min_connections: default_min_connections(),
            max_connections: default_max_connections(),
            max_preferred_distance: default_max_preferred_distance(),
        }
    }
}

impl ConnectionRules {
    /// Create rules with explicit bounds.
    #[must_use]
    pub const fn new(min_connections: u32, max_connections: u32, max_preferred_distance: u32) -> Self {
        Self {
            min_connections,
            max_connections,
            max_preferred_distance,
        }
    }

    /// Consistency problems with these rules.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.min_connections > self.max_connections {
            errors.push(format!(
                "connections: min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            ));
        }
        errors
    }
}
