// Recommendation ranking
//
// Turns candidate role sets into priced, conflict-checked options and keeps
// the cheapest few.

use crate::index::CapabilityIndex;
use crate::search::{CandidateRoleSet, SearchOutcome};
use leconflit::ConflictPolicy;
use lelicence::TierResolver;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Number of options returned by default
pub const DEFAULT_TOP_K: usize = 3;

/// Recommendation confidence labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    /// No known duty-segregation conflict in the combination.
    High,
    /// At least one conflicting role pair is present.
    Medium,
}

/// One ranked role combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationOption {
    /// Roles to assign, in selection order.
    pub roles: Vec<String>,
    /// Number of roles.
    pub role_count: usize,
    /// Highest-priority license tier among the roles.
    pub license_required: String,
    /// Monthly cost of `license_required`.
    pub monthly_cost: f64,
    /// Share of the request granted by the roles, in `[0, 1]`.
    pub coverage: f64,
    /// Duty-segregation conflicts inside the combination.
    pub conflict_count: usize,
    /// Confidence label.
    pub confidence: Confidence,
    /// Human-readable caveats.
    pub warnings: Vec<String>,
    /// Requested capabilities the roles do not grant.
    pub uncovered: Vec<String>,
}

impl RecommendationOption {
    /// True if every requested capability is granted
    pub fn is_complete(&self) -> bool {
        self.uncovered.is_empty()
    }
}

/// Ranked options plus bookkeeping about what was discarded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedOptions {
    /// Options, cheapest first, at most `top_k`
    pub options: Vec<RecommendationOption>,
    /// Candidates evaluated
    pub considered: usize,
    /// Candidates dropped because their license tier could not be priced
    pub dropped: usize,
}

/// Scores, sorts and truncates candidate role sets
pub struct Ranker<'a> {
    index: &'a CapabilityIndex,
    resolver: &'a dyn TierResolver,
    conflicts: &'a dyn ConflictPolicy,
    top_k: usize,
}

impl<'a> Ranker<'a> {
    /// Create a ranker returning [`DEFAULT_TOP_K`] options
    pub fn new(
        index: &'a CapabilityIndex,
        resolver: &'a dyn TierResolver,
        conflicts: &'a dyn ConflictPolicy,
    ) -> Self {
        Self {
            index,
            resolver,
            conflicts,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Set how many options to keep
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Rank every candidate of a search outcome.
    ///
    /// Options are sorted by monthly cost, then by role count. The sort is
    /// stable, so equal options keep the search's discovery order.
    pub fn rank(&self, outcome: &SearchOutcome) -> RankedOptions {
        let mut ranked = RankedOptions {
            considered: outcome.candidates.len(),
            ..RankedOptions::default()
        };

        for candidate in &outcome.candidates {
            match self.evaluate(candidate, outcome) {
                Some(option) => ranked.options.push(option),
                None => ranked.dropped += 1,
            }
        }

        ranked.options.sort_by(|a, b| {
            a.monthly_cost
                .total_cmp(&b.monthly_cost)
                .then_with(|| a.role_count.cmp(&b.role_count))
        });
        ranked.options.truncate(self.top_k);

        debug!(
            "Ranked {} candidates: kept {}, dropped {}",
            ranked.considered,
            ranked.options.len(),
            ranked.dropped
        );
        ranked
    }

    /// Price and annotate one candidate. `None` if its tier has no price.
    pub fn evaluate(
        &self,
        candidate: &CandidateRoleSet,
        outcome: &SearchOutcome,
    ) -> Option<RecommendationOption> {
        let license_required = self.license_required(candidate)?;
        let Some(monthly_cost) = self.resolver.price(&license_required) else {
            warn!(
                "Dropping candidate {:?}: license tier '{}' has no price",
                candidate, license_required
            );
            return None;
        };

        let granted: HashSet<&str> = candidate
            .iter()
            .filter_map(|role| self.index.capabilities_of(role))
            .flatten()
            .map(String::as_str)
            .collect();

        let uncovered: Vec<String> = outcome
            .requested
            .iter()
            .filter(|capability| !granted.contains(capability.as_str()))
            .cloned()
            .collect();

        let coverage = if outcome.requested.is_empty() {
            0.0
        } else {
            (outcome.requested.len() - uncovered.len()) as f64 / outcome.requested.len() as f64
        };

        let conflict_count = self.conflicts.count_conflicts(candidate);
        let confidence = if conflict_count == 0 {
            Confidence::High
        } else {
            Confidence::Medium
        };

        let mut warnings: Vec<String> = outcome
            .uncoverable
            .iter()
            .map(|capability| format!("Capability '{}' is not granted by any role", capability))
            .collect();
        let global: HashSet<&str> = outcome.uncoverable.iter().map(String::as_str).collect();
        warnings.extend(
            uncovered
                .iter()
                .filter(|capability| !global.contains(capability.as_str()))
                .map(|capability| {
                    format!(
                        "Capability '{}' is not covered by this role combination",
                        capability
                    )
                }),
        );
        if conflict_count > 0 {
            warnings.push(format!(
                "{} duty-segregation conflict(s) between the recommended roles",
                conflict_count
            ));
        }

        Some(RecommendationOption {
            roles: candidate.clone(),
            role_count: candidate.len(),
            license_required,
            monthly_cost,
            coverage,
            conflict_count,
            confidence,
            warnings,
            uncovered,
        })
    }

    /// Tier with the highest priority among the candidate's roles.
    ///
    /// Ties keep the tier of the earlier role.
    fn license_required(&self, candidate: &CandidateRoleSet) -> Option<String> {
        let mut best: Option<(&str, u32)> = None;
        for role in candidate {
            let Some(tier) = self.index.tier_of(role) else {
                continue;
            };
            let priority = self
                .index
                .priority_of(tier)
                .unwrap_or_else(|| self.resolver.priority(tier));
            if best.map_or(true, |(_, top)| priority > top) {
                best = Some((tier, priority));
            }
        }
        best.map(|(tier, _)| tier.to_string())
    }
}
