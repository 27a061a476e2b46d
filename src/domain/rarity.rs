use crate::error::{EngineError, Result};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// One row of a rarity table: values below `upper_bound` (and at or above the
/// previous row's bound) fall into `label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub label: String,
    pub upper_bound: u64,
}

impl Tier {
    pub fn new(label: impl Into<String>, upper_bound: u64) -> Self {
        Self {
            label: label.into(),
            upper_bound,
        }
    }
}

/// A validated cumulative-weight table partitioning `[0, modulus)`.
///
/// Construction is the only place the table is checked; every lookup after
/// that relies on the bounds being strictly increasing and ending at the
/// modulus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RarityTable {
    tiers: Vec<Tier>,
    modulus: u64,
}

impl RarityTable {
    pub fn new(tiers: Vec<Tier>, modulus: u64) -> Result<Self> {
        if tiers.is_empty() {
            return Err(EngineError::Configuration(
                "rarity table must contain at least one tier".to_string(),
            ));
        }
        if modulus == 0 {
            return Err(EngineError::Configuration(
                "rarity modulus must be positive".to_string(),
            ));
        }

        let mut previous = 0u64;
        for (index, tier) in tiers.iter().enumerate() {
            if tier.label.trim().is_empty() {
                return Err(EngineError::Configuration(format!(
                    "rarity tier {index} has an empty label"
                )));
            }
            if tier.upper_bound <= previous {
                return Err(EngineError::Configuration(format!(
                    "rarity bounds must be strictly increasing: tier '{}' has bound {} after {}",
                    tier.label, tier.upper_bound, previous
                )));
            }
            previous = tier.upper_bound;
        }

        if previous != modulus {
            return Err(EngineError::Configuration(format!(
                "last rarity bound {previous} does not equal modulus {modulus}"
            )));
        }

        Ok(Self { tiers, modulus })
    }

    /// Builds a table from bounds known to be valid, such as built-in defaults.
    pub(crate) fn from_trusted(tiers: Vec<Tier>, modulus: u64) -> Self {
        debug_assert!(Self::new(tiers.clone(), modulus).is_ok());
        Self { tiers, modulus }
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    /// Reduces an oracle value into `[0, modulus)`.
    pub fn reduce(&self, raw: U256) -> u64 {
        (raw % U256::from(self.modulus)).to::<u64>()
    }

    /// Returns the first tier whose bound exceeds `reduced`, or `None` when
    /// `reduced` lies outside `[0, modulus)`.
    pub fn map_to_tier(&self, reduced: u64) -> Option<&Tier> {
        self.tiers.iter().find(|tier| reduced < tier.upper_bound)
    }

    /// Reduces `raw` and maps it in one step.
    pub fn classify(&self, raw: U256) -> Result<&Tier> {
        let reduced = self.reduce(raw);
        self.map_to_tier(reduced).ok_or_else(|| {
            EngineError::Configuration(format!(
                "reduced value {reduced} is not covered by the rarity table"
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RarityTable {
        RarityTable::new(
            vec![
                Tier::new("tier0", 10),
                Tier::new("tier1", 30),
                Tier::new("tier2", 100),
            ],
            100,
        )
        .unwrap()
    }

    #[test]
    fn test_bucket_sizes_match_table() {
        let table = table();
        let mut counts = [0usize; 3];
        for value in 0..table.modulus() {
            let tier = table.map_to_tier(value).unwrap();
            let index = table.tiers().iter().position(|t| t == tier).unwrap();
            counts[index] += 1;
        }
        assert_eq!(counts, [10, 20, 70]);
    }

    #[test]
    fn test_boundary_values_belong_to_next_tier() {
        let table = table();
        assert_eq!(table.map_to_tier(9).unwrap().label, "tier0");
        assert_eq!(table.map_to_tier(10).unwrap().label, "tier1");
        assert_eq!(table.map_to_tier(29).unwrap().label, "tier1");
        assert_eq!(table.map_to_tier(30).unwrap().label, "tier2");
        assert_eq!(table.map_to_tier(99).unwrap().label, "tier2");
        assert!(table.map_to_tier(100).is_none());
    }

    #[test]
    fn test_classify_reduces_large_values() {
        let table = table();
        assert_eq!(table.classify(U256::from(37u64)).unwrap().label, "tier2");
        assert_eq!(table.classify(U256::from(117u64)).unwrap().label, "tier1");
        assert_eq!(table.classify(U256::MAX).unwrap().label, "tier2");
    }

    #[test]
    fn test_rejects_empty_table() {
        assert!(matches!(
            RarityTable::new(vec![], 100),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn test_rejects_non_increasing_bounds() {
        let result = RarityTable::new(
            vec![
                Tier::new("a", 30),
                Tier::new("b", 30),
                Tier::new("c", 100),
            ],
            100,
        );
        assert!(matches!(result, Err(EngineError::Configuration(_))));
    }

    #[test]
    fn test_rejects_zero_first_bound() {
        let result = RarityTable::new(vec![Tier::new("a", 0), Tier::new("b", 100)], 100);
        assert!(matches!(result, Err(EngineError::Configuration(_))));
    }

    #[test]
    fn test_rejects_modulus_mismatch() {
        let result = RarityTable::new(vec![Tier::new("a", 10), Tier::new("b", 90)], 100);
        assert!(matches!(result, Err(EngineError::Configuration(_))));
    }
}
