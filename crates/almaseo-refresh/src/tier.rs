//! Score color tiers.

use serde::{Deserialize, Serialize};

use crate::error::{RefreshError, RefreshResult};

/// One of three ordered score bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTier {
    Poor,
    Warn,
    Good,
}

impl ScoreTier {
    /// Class-style label (`good`, `warn`, `poor`).
    pub fn label(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Warn => "warn",
            Self::Poor => "poor",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::Good => "#00a32a",
            Self::Warn => "#dba617",
            Self::Poor => "#d63638",
        }
    }
}

/// Lower bounds for the `Good` and `Warn` tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierThresholds {
    #[serde(default = "default_good")]
    pub good: u8,

    #[serde(default = "default_warn")]
    pub warn: u8,
}

fn default_good() -> u8 {
    80
}

fn default_warn() -> u8 {
    50
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            good: default_good(),
            warn: default_warn(),
        }
    }
}

impl TierThresholds {
    pub fn new(good: u8, warn: u8) -> RefreshResult<Self> {
        let thresholds = Self { good, warn };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> RefreshResult<()> {
        if self.warn > self.good || self.good > 100 {
            return Err(RefreshError::Config {
                message: format!(
                    "tier thresholds must satisfy warn <= good <= 100 (got warn={}, good={})",
                    self.warn, self.good
                ),
            });
        }
        Ok(())
    }

    pub fn classify(&self, score: u8) -> ScoreTier {
        if score >= self.good {
            ScoreTier::Good
        } else if score >= self.warn {
            ScoreTier::Warn
        } else {
            ScoreTier::Poor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cutoffs() {
        let tiers = TierThresholds::default();
        assert_eq!(tiers.classify(100), ScoreTier::Good);
        assert_eq!(tiers.classify(80), ScoreTier::Good);
        assert_eq!(tiers.classify(79), ScoreTier::Warn);
        assert_eq!(tiers.classify(50), ScoreTier::Warn);
        assert_eq!(tiers.classify(49), ScoreTier::Poor);
        assert_eq!(tiers.classify(0), ScoreTier::Poor);
    }

    #[test]
    fn test_custom_cutoffs_and_ordering() {
        let tiers = TierThresholds::new(70, 40).unwrap();
        assert_eq!(tiers.classify(70), ScoreTier::Good);
        assert_eq!(tiers.classify(40), ScoreTier::Warn);
        assert!(ScoreTier::Good > ScoreTier::Warn && ScoreTier::Warn > ScoreTier::Poor);
    }

    #[test]
    fn test_invalid_cutoffs() {
        assert!(TierThresholds::new(40, 70).is_err());
        assert!(TierThresholds::new(101, 50).is_err());
    }

    #[test]
    fn test_labels() {
        assert_eq!(ScoreTier::Warn.label(), "warn");
        assert_eq!(ScoreTier::Poor.color(), "#d63638");
    }
}
