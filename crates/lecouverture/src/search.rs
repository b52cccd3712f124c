// Set-cover search
//
// *La Recherche* (The Search) - Cost-aware greedy set cover with penalty-based diversification
//
// Minimum set cover is NP-hard. The search runs the classic greedy
// approximation once, then reruns it with a growing penalty on roles that
// earlier solutions already used so later runs explore different shapes.

use crate::index::CapabilityIndex;
use crate::request::dedup_requested;
use lelicence::TierResolver;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Score penalty per attempt for each earlier solution a role appeared in
pub const DIVERSITY_PENALTY: f64 = 0.1;

/// Distinct role names in selection order
pub type CandidateRoleSet = Vec<String>;

/// Result of a set-cover search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// The cleaned request (trimmed, deduplicated, caller order)
    pub requested: Vec<String>,

    /// Requested capabilities some role grants
    pub coverable: Vec<String>,

    /// Requested capabilities no role grants
    pub uncoverable: Vec<String>,

    /// Candidate role sets, primary solution first
    pub candidates: Vec<CandidateRoleSet>,
}

/// A role under consideration in one greedy step
#[derive(Debug, Clone, Copy)]
struct Choice<'a> {
    role: &'a str,
    gain: usize,
    score: f64,
    cost: f64,
    priority: u32,
}

impl Choice<'_> {
    /// `Less` means `self` is the better pick
    fn compare(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.cost.total_cmp(&other.cost))
            .then_with(|| self.priority.cmp(&other.priority))
            .then_with(|| self.role.cmp(other.role))
    }
}

/// Greedy set-cover search over a capability index
pub struct SetCoverSearch<'a> {
    index: &'a CapabilityIndex,
    resolver: &'a dyn TierResolver,
}

impl<'a> SetCoverSearch<'a> {
    /// Create a search over `index`, pricing roles with `resolver`
    pub fn new(index: &'a CapabilityIndex, resolver: &'a dyn TierResolver) -> Self {
        Self { index, resolver }
    }

    /// Find up to `max_alternatives` distinct role combinations covering
    /// as much of `requested` as possible.
    ///
    /// The primary greedy solution is always attempted, so a
    /// `max_alternatives` of 0 behaves like 1.
    pub fn search<S: AsRef<str>>(&self, requested: &[S], max_alternatives: usize) -> SearchOutcome {
        let requested = dedup_requested(requested);
        let (coverable, uncoverable): (Vec<String>, Vec<String>) = requested
            .iter()
            .cloned()
            .partition(|capability| self.index.contains_capability(capability));

        let mut outcome = SearchOutcome {
            requested,
            coverable,
            uncoverable,
            candidates: Vec::new(),
        };

        if !outcome.uncoverable.is_empty() {
            debug!(
                "{} requested capabilities are not granted by any role: {:?}",
                outcome.uncoverable.len(),
                outcome.uncoverable
            );
        }
        if outcome.coverable.is_empty() {
            return outcome;
        }

        let targets: BTreeSet<&str> = outcome.coverable.iter().map(String::as_str).collect();
        let mut seen: HashSet<BTreeSet<String>> = HashSet::new();
        let mut usage: HashMap<String, usize> = HashMap::new();
        let mut candidates = Vec::new();

        for attempt in 0..max_alternatives.max(1) {
            let candidate = self.greedy(&targets, attempt, &usage);
            if candidate.is_empty() {
                continue;
            }

            let key: BTreeSet<String> = candidate.iter().cloned().collect();
            if !seen.insert(key) {
                debug!("Attempt {} repeated an earlier role set", attempt);
                continue;
            }

            for role in &candidate {
                *usage.entry(role.clone()).or_insert(0) += 1;
            }
            candidates.push(candidate);
        }

        debug!(
            "Set-cover search found {} distinct candidates for {} coverable capabilities",
            candidates.len(),
            targets.len()
        );
        outcome.candidates = candidates;
        outcome
    }

    /// One greedy pass. `attempt` 0 is the unpenalized primary solution.
    fn greedy(
        &self,
        targets: &BTreeSet<&str>,
        attempt: usize,
        usage: &HashMap<String, usize>,
    ) -> CandidateRoleSet {
        let mut uncovered: BTreeSet<&str> = targets.clone();
        let mut selected: CandidateRoleSet = Vec::new();
        let mut taken: HashSet<&str> = HashSet::new();

        // Every successful step covers at least one target, so this never binds
        let max_iterations = targets.len() + 1;

        for _ in 0..max_iterations {
            if uncovered.is_empty() {
                break;
            }

            let pool: BTreeSet<&str> = uncovered
                .iter()
                .filter_map(|capability| self.index.roles_for(capability))
                .flatten()
                .map(String::as_str)
                .filter(|role| !taken.contains(role))
                .collect();

            let best = pool
                .into_iter()
                .filter_map(|role| self.choice(role, &uncovered, attempt, usage))
                .min_by(|a, b| a.compare(b));

            let Some(best) = best else {
                debug!(
                    "No role adds coverage; {} capabilities left uncovered",
                    uncovered.len()
                );
                break;
            };

            debug!(
                "Attempt {}: picked '{}' (gain {}, score {:.2}, cost {})",
                attempt, best.role, best.gain, best.score, best.cost
            );

            if let Some(granted) = self.index.capabilities_of(best.role) {
                for capability in granted {
                    uncovered.remove(capability.as_str());
                }
            }
            taken.insert(best.role);
            selected.push(best.role.to_string());
        }

        selected
    }

    fn choice<'r>(
        &self,
        role: &'r str,
        uncovered: &BTreeSet<&str>,
        attempt: usize,
        usage: &HashMap<String, usize>,
    ) -> Option<Choice<'r>> {
        let granted = self.index.capabilities_of(role)?;
        let gain = granted
            .iter()
            .filter(|capability| uncovered.contains(capability.as_str()))
            .count();
        if gain == 0 {
            return None;
        }

        let uses = usage.get(role).copied().unwrap_or(0);
        let penalty = DIVERSITY_PENALTY * attempt as f64 * uses as f64;
        let tier = self.index.tier_of(role).unwrap_or_default();

        Some(Choice {
            role,
            gain,
            score: gain as f64 - penalty,
            cost: self.resolver.price(tier).unwrap_or(f64::INFINITY),
            priority: self.role_priority(tier),
        })
    }

    fn role_priority(&self, tier: &str) -> u32 {
        self.index
            .priority_of(tier)
            .unwrap_or_else(|| self.resolver.priority(tier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CapabilityRecord;
    use lelicence::{PricingTable, TierPrice};

    fn pricing() -> PricingTable {
        PricingTable::new(vec![
            TierPrice::new("Basic", 60.0, 10),
            TierPrice::new("Premium", 180.0, 40),
        ])
        .unwrap()
    }

    fn rec(role: &str, capability: &str, tier: &str) -> CapabilityRecord {
        let priority = if tier == "Premium" { 40 } else { 10 };
        CapabilityRecord::new(role, capability, tier, priority)
    }

    fn set(roles: &[&str]) -> BTreeSet<String> {
        roles.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_request_has_no_candidates() {
        let index = CapabilityIndex::build(&[rec("R1", "A", "Basic")]);
        let pricing = pricing();
        let empty: [&str; 0] = [];
        let outcome = SetCoverSearch::new(&index, &pricing).search(&empty, 5);
        assert!(outcome.candidates.is_empty());
        assert!(outcome.requested.is_empty());
    }

    #[test]
    fn test_uncoverable_request_has_no_candidates() {
        let index = CapabilityIndex::build(&[rec("R1", "A", "Basic")]);
        let pricing = pricing();
        let outcome = SetCoverSearch::new(&index, &pricing).search(&["X", "Y"], 5);
        assert!(outcome.candidates.is_empty());
        assert_eq!(outcome.uncoverable, vec!["X", "Y"]);
        assert!(outcome.coverable.is_empty());
    }

    #[test]
    fn test_primary_prefers_largest_gain() {
        let index = CapabilityIndex::build(&[
            rec("R1", "A", "Basic"),
            rec("R1", "B", "Basic"),
            rec("R2", "A", "Premium"),
            rec("R2", "B", "Premium"),
            rec("R2", "C", "Premium"),
        ]);
        let pricing = pricing();
        let outcome = SetCoverSearch::new(&index, &pricing).search(&["A", "B", "C"], 1);
        assert_eq!(outcome.candidates, vec![vec!["R2".to_string()]]);
    }

    #[test]
    fn test_equal_gain_prefers_cheaper_role() {
        let index = CapabilityIndex::build(&[
            rec("Expensive", "A", "Premium"),
            rec("Cheap", "A", "Basic"),
        ]);
        let pricing = pricing();
        let outcome = SetCoverSearch::new(&index, &pricing).search(&["A"], 1);
        assert_eq!(outcome.candidates[0], vec!["Cheap".to_string()]);
    }

    #[test]
    fn test_unpriced_role_loses_cost_ties() {
        let index = CapabilityIndex::build(&[
            CapabilityRecord::new("AAA", "A", "Mystery", 0),
            rec("ZZZ", "A", "Premium"),
        ]);
        let pricing = pricing();
        let outcome = SetCoverSearch::new(&index, &pricing).search(&["A"], 1);
        assert_eq!(outcome.candidates[0], vec!["ZZZ".to_string()]);
    }

    #[test]
    fn test_full_tie_breaks_by_role_name() {
        let index = CapabilityIndex::build(&[rec("R4", "D", "Basic"), rec("R3", "D", "Basic")]);
        let pricing = pricing();
        let outcome = SetCoverSearch::new(&index, &pricing).search(&["D"], 1);
        assert_eq!(outcome.candidates[0], vec!["R3".to_string()]);
    }

    #[test]
    fn test_reruns_explore_equal_alternatives() {
        let index = CapabilityIndex::build(&[rec("R3", "D", "Basic"), rec("R4", "D", "Basic")]);
        let pricing = pricing();
        let outcome = SetCoverSearch::new(&index, &pricing).search(&["D"], 3);

        assert_eq!(outcome.candidates.len(), 2);
        assert_eq!(outcome.candidates[0], vec!["R3".to_string()]);
        assert_eq!(outcome.candidates[1], vec!["R4".to_string()]);
    }

    #[test]
    fn test_duplicate_role_sets_are_discarded() {
        let index = CapabilityIndex::build(&[
            rec("R1", "A", "Basic"),
            rec("R2", "B", "Basic"),
        ]);
        let pricing = pricing();
        let outcome = SetCoverSearch::new(&index, &pricing).search(&["A", "B"], 5);

        // Only one way to cover both capabilities
        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(
            outcome.candidates[0].iter().cloned().collect::<BTreeSet<_>>(),
            set(&["R1", "R2"])
        );
    }

    #[test]
    fn test_candidates_cover_all_coverable() {
        let index = CapabilityIndex::build(&[
            rec("R1", "A", "Basic"),
            rec("R1", "B", "Basic"),
            rec("R2", "B", "Basic"),
            rec("R2", "C", "Basic"),
            rec("R3", "C", "Premium"),
            rec("R3", "D", "Premium"),
        ]);
        let pricing = pricing();
        let outcome = SetCoverSearch::new(&index, &pricing).search(&["A", "B", "C", "D", "Z"], 4);

        assert_eq!(outcome.uncoverable, vec!["Z"]);
        for candidate in &outcome.candidates {
            let covered: BTreeSet<&str> = candidate
                .iter()
                .flat_map(|role| index.capabilities_of(role).unwrap())
                .map(String::as_str)
                .collect();
            for capability in &outcome.coverable {
                assert!(covered.contains(capability.as_str()));
            }
        }
    }

    #[test]
    fn test_zero_alternatives_still_runs_primary() {
        let index = CapabilityIndex::build(&[rec("R1", "A", "Basic")]);
        let pricing = pricing();
        let outcome = SetCoverSearch::new(&index, &pricing).search(&["A"], 0);
        assert_eq!(outcome.candidates.len(), 1);
    }

    #[test]
    fn test_choice_ordering() {
        let base = Choice {
            role: "B",
            gain: 2,
            score: 2.0,
            cost: 60.0,
            priority: 10,
        };
        let higher_score = Choice { score: 2.5, ..base };
        let cheaper = Choice { cost: 30.0, ..base };
        let earlier_name = Choice { role: "A", ..base };

        assert_eq!(higher_score.compare(&base), Ordering::Less);
        assert_eq!(cheaper.compare(&base), Ordering::Less);
        assert_eq!(earlier_name.compare(&base), Ordering::Less);
        assert_eq!(base.compare(&base), Ordering::Equal);
    }
}
