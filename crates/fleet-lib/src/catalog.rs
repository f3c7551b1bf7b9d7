//! Instance tier catalog
//!
//! A single static table of instance tiers with their relative capacity and
//! hourly price. Tiers within a family are totally ordered by size
//! (micro < small < medium < large < xlarge < 2xlarge), which defines the
//! single-step moves used for vertical scaling.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Tier assumed when an allocation does not name one
pub const DEFAULT_TIER: &str = "t2.micro";

/// Size ladder shared by every built-in family
pub const SIZE_ORDER: [&str; 6] = ["micro", "small", "medium", "large", "xlarge", "2xlarge"];

static BUILTIN: OnceLock<Arc<TierCatalog>> = OnceLock::new();

/// Opaque tier identifier, e.g. `t3.large`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierId(String);

impl TierId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Family prefix of the id (`t2` for `t2.micro`)
    pub fn family(&self) -> &str {
        self.0.split('.').next().unwrap_or_default()
    }
}

impl Default for TierId {
    fn default() -> Self {
        Self::new(DEFAULT_TIER)
    }
}

impl fmt::Display for TierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TierId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TierId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A family of tiers sharing a size ladder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierFamily {
    pub name: String,
    /// Older burstable generation that a newer family outperforms per dollar
    pub burstable_economy: bool,
    /// Family suggested as a replacement, if any
    pub successor: Option<String>,
}

/// One row of the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSpec {
    pub id: TierId,
    pub family: String,
    pub hourly_price: f64,
    /// Relative compute capacity in normalized load units
    pub capacity: u32,
}

/// Immutable table of tiers, ordered by family then size
#[derive(Debug, Clone)]
pub struct TierCatalog {
    families: Vec<TierFamily>,
    tiers: Vec<TierSpec>,
}

impl TierCatalog {
    /// Build a catalog; tiers of one family must be listed smallest first
    pub fn new(families: Vec<TierFamily>, tiers: Vec<TierSpec>) -> Self {
        Self { families, tiers }
    }

    /// Process-wide built-in catalog of `t2` and `t3` tiers
    pub fn builtin() -> Arc<TierCatalog> {
        BUILTIN.get_or_init(|| Arc::new(Self::aws_burstable())).clone()
    }

    fn aws_burstable() -> Self {
        const T2_PRICES: [f64; 6] = [0.0116, 0.023, 0.0464, 0.0928, 0.1856, 0.3712];
        const T3_PRICES: [f64; 6] = [0.0104, 0.0208, 0.0416, 0.0832, 0.1664, 0.3328];

        let families = vec![
            TierFamily {
                name: "t2".to_string(),
                burstable_economy: true,
                successor: Some("t3".to_string()),
            },
            TierFamily {
                name: "t3".to_string(),
                burstable_economy: false,
                successor: None,
            },
        ];

        let mut tiers = Vec::with_capacity(SIZE_ORDER.len() * 2);
        for (family, prices) in [("t2", T2_PRICES), ("t3", T3_PRICES)] {
            for (rank, (size, price)) in SIZE_ORDER.iter().zip(prices).enumerate() {
                tiers.push(TierSpec {
                    id: TierId::new(format!("{family}.{size}")),
                    family: family.to_string(),
                    hourly_price: price,
                    capacity: 1 << rank,
                });
            }
        }

        Self::new(families, tiers)
    }

    pub fn tiers(&self) -> &[TierSpec] {
        &self.tiers
    }

    pub fn get(&self, tier: &TierId) -> Option<&TierSpec> {
        self.tiers.iter().find(|t| &t.id == tier)
    }

    pub fn family(&self, name: &str) -> Option<&TierFamily> {
        self.families.iter().find(|f| f.name == name)
    }

    /// Next larger tier in the same family; unknown or largest tiers map to themselves
    pub fn step_up(&self, tier: &TierId) -> TierId {
        self.neighbor(tier, 1)
    }

    /// Next smaller tier in the same family; unknown or smallest tiers map to themselves
    pub fn step_down(&self, tier: &TierId) -> TierId {
        self.neighbor(tier, -1)
    }

    fn neighbor(&self, tier: &TierId, offset: isize) -> TierId {
        let Some(index) = self.tiers.iter().position(|t| &t.id == tier) else {
            return tier.clone();
        };

        let family = &self.tiers[index].family;
        index
            .checked_add_signed(offset)
            .and_then(|i| self.tiers.get(i))
            .filter(|t| &t.family == family)
            .map(|t| t.id.clone())
            .unwrap_or_else(|| tier.clone())
    }

    /// Capacity in load units; unknown tiers count as 1
    pub fn capacity(&self, tier: &TierId) -> u32 {
        self.get(tier).map(|t| t.capacity).unwrap_or(1)
    }

    /// Hourly unit price; unknown tiers are priced as the cheapest known tier
    pub fn hourly_price(&self, tier: &TierId) -> f64 {
        self.get(tier)
            .map(|t| t.hourly_price)
            .unwrap_or_else(|| self.cheapest_price())
    }

    pub fn cheapest_price(&self) -> f64 {
        self.tiers
            .iter()
            .map(|t| t.hourly_price)
            .reduce(f64::min)
            .unwrap_or(0.0)
    }

    /// Whether the tier's family (known or inferred from the id prefix) is burstable-economy
    pub fn is_burstable_economy(&self, tier: &TierId) -> bool {
        self.family(tier.family())
            .map(|f| f.burstable_economy)
            .unwrap_or(false)
    }
}
