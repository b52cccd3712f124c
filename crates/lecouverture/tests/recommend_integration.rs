// Integration tests for role recommendation
//
// End-to-end scenarios through `Recommender`, plus property checks on the
// ordering, bounds and determinism of the ranked output.

use lecouverture::{
    CapabilityIndex, CapabilityRecord, Confidence, Ranker, Recommender, SetCoverSearch,
};
use leconflit::{ConflictMatrix, ConflictRule, NoConflicts, Severity};
use lelicence::{PricingTable, TierPrice};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

fn pricing() -> PricingTable {
    PricingTable::new(vec![
        TierPrice::new("Team", 8.0, 10),
        TierPrice::new("Basic", 60.0, 20),
        TierPrice::new("Premium", 180.0, 40),
    ])
    .expect("valid pricing")
}

fn rec(role: &str, capability: &str, tier: &str) -> CapabilityRecord {
    let priority = match tier {
        "Team" => 10,
        "Basic" => 20,
        "Premium" => 40,
        _ => 0,
    };
    CapabilityRecord::new(role, capability, tier, priority)
}

#[test]
fn single_premium_role_beats_two_role_alternatives() {
    let records = vec![
        rec("R1", "A", "Basic"),
        rec("R1", "B", "Basic"),
        rec("R2", "A", "Premium"),
        rec("R2", "B", "Premium"),
        rec("R2", "C", "Premium"),
        rec("R6", "C", "Premium"),
    ];
    let recommender = Recommender::from_records(&records, Arc::new(pricing()), Arc::new(NoConflicts));

    let options = recommender.recommend(&["A", "B", "C"]);
    assert!(!options.is_empty());

    let first = &options[0];
    assert_eq!(first.roles, vec!["R2"]);
    assert_eq!(first.coverage, 1.0);
    assert_eq!(first.monthly_cost, 180.0);
    assert_eq!(first.confidence, Confidence::High);

    // Any two-role option covering the same set costs at least as much and ranks later
    for later in options.iter().skip(1) {
        assert!(later.monthly_cost >= first.monthly_cost);
        if later.monthly_cost == first.monthly_cost {
            assert!(later.role_count >= first.role_count);
        }
    }
}

#[test]
fn missing_capability_is_reported_everywhere() {
    let records = vec![rec("R1", "A", "Basic"), rec("R2", "B", "Team")];
    let recommender = Recommender::from_records(&records, Arc::new(pricing()), Arc::new(NoConflicts));

    let report = recommender.recommend_detailed(&["A", "B", "GHOST"]);
    assert!(!report.options.is_empty());
    assert_eq!(report.uncovered, vec!["GHOST"]);
    assert!(report.warnings.iter().any(|w| w.contains("GHOST")));

    for option in &report.options {
        assert!(option.coverage < 1.0);
        assert!(option.uncovered.contains(&"GHOST".to_string()));
    }
}

#[test]
fn conflicting_pair_in_candidate_is_medium_confidence() {
    let records = vec![rec("R3", "D", "Basic"), rec("R4", "D", "Basic")];
    let index = CapabilityIndex::build(&records);
    let pricing = pricing();
    let matrix = ConflictMatrix::new(vec![ConflictRule::new("R3", "R4", Severity::High, "")])
        .expect("valid rule");

    // The search alone only ever needs one of the two roles
    let mut outcome = SetCoverSearch::new(&index, &pricing).search(&["D"], 3);
    for option in Ranker::new(&index, &pricing, &matrix).rank(&outcome).options {
        assert_eq!(option.confidence, Confidence::High);
    }

    // A combination holding both must be flagged
    outcome.candidates.push(vec!["R3".to_string(), "R4".to_string()]);
    let ranked = Ranker::new(&index, &pricing, &matrix).rank(&outcome);
    let both = ranked
        .options
        .iter()
        .find(|o| o.role_count == 2)
        .expect("two-role option kept");
    assert_eq!(both.conflict_count, 1);
    assert_eq!(both.confidence, Confidence::Medium);
}

#[test]
fn empty_request_returns_empty() {
    let recommender = Recommender::from_records(
        &[rec("R1", "A", "Basic")],
        Arc::new(pricing()),
        Arc::new(NoConflicts),
    );
    let empty: Vec<String> = Vec::new();
    assert!(recommender.recommend(&empty).is_empty());
}

#[test]
fn no_coverage_law() {
    let recommender = Recommender::from_records(
        &[rec("R1", "A", "Basic")],
        Arc::new(pricing()),
        Arc::new(NoConflicts),
    );
    let requested = ["X", "Y", "Z"];
    let report = recommender.recommend_detailed(&requested);

    assert!(report.options.is_empty());
    for capability in requested {
        assert!(
            report.warnings.iter().any(|w| w.contains(&format!("'{}'", capability))),
            "missing warning for {}",
            capability
        );
    }
}

#[test]
fn default_pricing_table_prices_real_tier_names() {
    let records = vec![
        CapabilityRecord::new("AP clerk", "VendInvoice", "Operations - Activity", 20),
        CapabilityRecord::new("AP clerk", "VendPayment", "Operations - Activity", 20),
        CapabilityRecord::new("Controller", "VendInvoice", "Finance", 40),
        CapabilityRecord::new("Controller", "VendPayment", "Finance", 40),
        CapabilityRecord::new("Controller", "LedgerClose", "Finance", 40),
    ];
    let recommender = Recommender::from_records(
        &records,
        Arc::new(PricingTable::with_defaults()),
        Arc::new(ConflictMatrix::default_rules()),
    );

    let options = recommender.recommend(&["VendInvoice", "VendPayment"]);
    assert_eq!(options[0].roles, vec!["AP clerk"]);
    assert_eq!(options[0].license_required, "Operations - Activity");
    assert_eq!(options[0].monthly_cost, 50.0);
}

fn arb_records() -> impl Strategy<Value = Vec<CapabilityRecord>> {
    let tiers = prop::sample::select(vec!["Team", "Basic", "Premium", "Unpriced"]);
    prop::collection::vec((0u8..8, 0u8..10, tiers), 0..40).prop_map(|rows| {
        rows.into_iter()
            .map(|(role, capability, tier)| {
                rec(&format!("R{}", role), &format!("C{}", capability), tier)
            })
            .collect()
    })
}

fn arb_request() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec((0u8..12).prop_map(|c| format!("C{}", c)), 0..8)
}

proptest! {
    #[test]
    fn prop_results_sorted_and_bounded(records in arb_records(), requested in arb_request()) {
        let recommender = Recommender::from_records(&records, Arc::new(pricing()), Arc::new(NoConflicts));
        let options = recommender.recommend(&requested);

        prop_assert!(options.len() <= 3);
        for pair in options.windows(2) {
            prop_assert!(pair[0].monthly_cost <= pair[1].monthly_cost);
            if pair[0].monthly_cost == pair[1].monthly_cost {
                prop_assert!(pair[0].role_count <= pair[1].role_count);
            }
        }
        for option in &options {
            prop_assert!((0.0..=1.0).contains(&option.coverage));
            prop_assert_eq!(option.role_count, option.roles.len());
            let distinct: BTreeSet<_> = option.roles.iter().collect();
            prop_assert_eq!(distinct.len(), option.roles.len());
        }
    }

    #[test]
    fn prop_recommend_is_deterministic(records in arb_records(), requested in arb_request()) {
        let recommender = Recommender::from_records(&records, Arc::new(pricing()), Arc::new(NoConflicts));
        let first = recommender.recommend_detailed(&requested);
        let second = recommender.recommend_detailed(&requested);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_primary_covers_at_least_best_single_role(
        records in arb_records(),
        requested in arb_request(),
    ) {
        let index = CapabilityIndex::build(&records);
        let pricing = pricing();
        let outcome = SetCoverSearch::new(&index, &pricing).search(&requested, 1);

        if let Some(primary) = outcome.candidates.first() {
            let covered = |roles: &[String]| -> usize {
                let granted: BTreeSet<&str> = roles
                    .iter()
                    .filter_map(|role| index.capabilities_of(role))
                    .flatten()
                    .map(String::as_str)
                    .collect();
                outcome.requested.iter().filter(|c| granted.contains(c.as_str())).count()
            };

            let primary_coverage = covered(primary.as_slice());
            for role in index.roles() {
                let single = vec![role.to_string()];
                prop_assert!(primary_coverage >= covered(single.as_slice()));
            }

            // Each greedy step adds coverage
            for len in 1..primary.len() {
                prop_assert!(covered(&primary[..len]) < covered(&primary[..len + 1]));
            }
        } else {
            prop_assert!(outcome.coverable.is_empty());
        }
    }
}
