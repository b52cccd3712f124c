// Tier pricing table and resolver
//
// *Le Tarif* (The Price List) - Monthly cost and priority for every license tier

use crate::normalize::normalize_tier_name;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Default tier table: `(name, priority, monthly cost)`.
///
/// Used when no pricing source is configured and to fill priorities the
/// pricing source leaves out.
pub const DEFAULT_TIERS: &[(&str, u32, f64)] = &[
    ("None", 0, 0.0),
    ("Team Members", 10, 8.0),
    ("Activity", 20, 30.0),
    ("Operations - Activity", 20, 50.0),
    ("Human Resources", 30, 120.0),
    ("Project Operations", 30, 120.0),
    ("Finance", 40, 180.0),
    ("Supply Chain Management", 40, 180.0),
    ("Commerce", 40, 180.0),
    ("Finance Premium", 50, 300.0),
];

/// Errors raised while building a pricing table
#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    /// Tier name is empty after normalization
    #[error("Tier name is empty")]
    EmptyName,

    /// Monthly cost is negative, NaN or infinite
    #[error("Invalid monthly cost {cost} for tier '{tier}'")]
    InvalidCost {
        /// Offending tier
        tier: String,
        /// Offending cost
        cost: f64,
    },

    /// Two entries normalize to the same name
    #[error("Duplicate tier '{tier}' (conflicts with '{existing}')")]
    DuplicateTier {
        /// Tier being added
        tier: String,
        /// Tier already present
        existing: String,
    },
}

/// A pricing entry as supplied by configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierPrice {
    /// Tier display name
    pub name: String,

    /// Monthly cost per user
    pub monthly_cost: f64,

    /// Priority (higher = more capable). Filled from the default table when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
}

impl TierPrice {
    /// Create a pricing entry with an explicit priority
    pub fn new(name: impl Into<String>, monthly_cost: f64, priority: u32) -> Self {
        Self {
            name: name.into(),
            monthly_cost,
            priority: Some(priority),
        }
    }
}

/// How a tier name was matched against the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Byte-for-byte equal name
    Exact,
    /// Equal after normalization
    Normalized,
    /// Word-level containment on normalized names
    Scan,
}

/// A resolved tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierQuote {
    /// Canonical tier name from the table
    pub name: String,

    /// Monthly cost per user
    pub monthly_cost: f64,

    /// Tier priority
    pub priority: u32,

    /// Lookup step that produced the match
    pub matched_by: MatchKind,
}

/// Resolves license tier names to priority and price.
///
/// `priority` is total: tiers nobody knows about rank lowest (0).
/// `price` returns `None` when the tier cannot be priced even after the
/// fallback lookups.
pub trait TierResolver: Send + Sync {
    /// Resolve a tier name
    fn resolve(&self, tier: &str) -> Option<TierQuote>;

    /// Monthly cost of a tier
    fn price(&self, tier: &str) -> Option<f64> {
        self.resolve(tier).map(|quote| quote.monthly_cost)
    }

    /// Priority of a tier
    fn priority(&self, tier: &str) -> u32 {
        self.resolve(tier).map(|quote| quote.priority).unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
struct TierEntry {
    name: String,
    normalized: String,
    monthly_cost: f64,
    priority: u32,
}

/// In-memory pricing table with exact, normalized and scan lookups
#[derive(Debug, Clone, Default)]
pub struct PricingTable {
    entries: Vec<TierEntry>,
    exact: HashMap<String, usize>,
    normalized: HashMap<String, usize>,
}

impl PricingTable {
    /// Create an empty table. Every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from configured entries
    pub fn new(tiers: Vec<TierPrice>) -> Result<Self, PricingError> {
        let mut table = Self::empty();
        for tier in tiers {
            table.insert(tier, false)?;
        }
        Ok(table)
    }

    /// The documented default tier table
    pub fn with_defaults() -> Self {
        let mut table = Self::empty();
        for (name, priority, cost) in DEFAULT_TIERS {
            table.push(TierEntry {
                name: (*name).to_string(),
                normalized: normalize_tier_name(name),
                monthly_cost: *cost,
                priority: *priority,
            });
        }
        table
    }

    /// Overlay entries on this table.
    ///
    /// An entry whose normalized name already exists replaces the existing
    /// entry in place; new names are appended.
    pub fn merge(mut self, overrides: Vec<TierPrice>) -> Result<Self, PricingError> {
        for tier in overrides {
            self.insert(tier, true)?;
        }
        Ok(self)
    }

    /// Number of tiers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the table has no tiers
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All tiers in table order
    pub fn tiers(&self) -> Vec<TierPrice> {
        self.entries
            .iter()
            .map(|e| TierPrice::new(e.name.clone(), e.monthly_cost, e.priority))
            .collect()
    }

    /// Priority of a tier in the default table, if it is a default tier
    pub fn default_priority(name: &str) -> Option<u32> {
        let wanted = normalize_tier_name(name);
        DEFAULT_TIERS
            .iter()
            .find(|(default, _, _)| normalize_tier_name(default) == wanted)
            .map(|(_, priority, _)| *priority)
    }

    fn insert(&mut self, tier: TierPrice, replace: bool) -> Result<(), PricingError> {
        let normalized = normalize_tier_name(&tier.name);
        if normalized.is_empty() {
            return Err(PricingError::EmptyName);
        }
        if !tier.monthly_cost.is_finite() || tier.monthly_cost < 0.0 {
            return Err(PricingError::InvalidCost {
                tier: tier.name,
                cost: tier.monthly_cost,
            });
        }

        let priority = tier
            .priority
            .or_else(|| Self::default_priority(&tier.name))
            .unwrap_or(0);
        let entry = TierEntry {
            name: tier.name.trim().to_string(),
            normalized,
            monthly_cost: tier.monthly_cost,
            priority,
        };

        match self.normalized.get(&entry.normalized).copied() {
            Some(idx) if replace => {
                self.exact.remove(&self.entries[idx].name);
                self.exact.insert(entry.name.clone(), idx);
                self.entries[idx] = entry;
                Ok(())
            }
            Some(idx) => Err(PricingError::DuplicateTier {
                tier: entry.name,
                existing: self.entries[idx].name.clone(),
            }),
            None => {
                self.push(entry);
                Ok(())
            }
        }
    }

    fn push(&mut self, entry: TierEntry) {
        let idx = self.entries.len();
        self.exact.insert(entry.name.clone(), idx);
        self.normalized.insert(entry.normalized.clone(), idx);
        self.entries.push(entry);
    }

    fn quote(&self, idx: usize, matched_by: MatchKind) -> TierQuote {
        let entry = &self.entries[idx];
        TierQuote {
            name: entry.name.clone(),
            monthly_cost: entry.monthly_cost,
            priority: entry.priority,
            matched_by,
        }
    }
}

impl TierResolver for PricingTable {
    fn resolve(&self, tier: &str) -> Option<TierQuote> {
        if let Some(&idx) = self.exact.get(tier) {
            return Some(self.quote(idx, MatchKind::Exact));
        }

        let wanted = normalize_tier_name(tier);
        if wanted.is_empty() {
            return None;
        }
        if let Some(&idx) = self.normalized.get(&wanted) {
            return Some(self.quote(idx, MatchKind::Normalized));
        }

        let idx = self.entries.iter().position(|entry| {
            contains_words(&entry.normalized, &wanted) || contains_words(&wanted, &entry.normalized)
        })?;
        debug!(
            "Tier '{}' resolved by scan to '{}'",
            tier, self.entries[idx].name
        );
        Some(self.quote(idx, MatchKind::Scan))
    }
}

/// True if `needle`'s words appear as a contiguous run in `haystack`'s words
fn contains_words(haystack: &str, needle: &str) -> bool {
    let hay: Vec<&str> = haystack.split(' ').collect();
    let pin: Vec<&str> = needle.split(' ').collect();
    if pin.is_empty() || pin.len() > hay.len() {
        return false;
    }
    hay.windows(pin.len()).any(|window| window == pin.as_slice())
}
