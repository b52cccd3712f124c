// Capability index
//
// *L'Index* (The Index) - Reverse map from capability to granting roles, with per-role license tier

use crate::record::CapabilityRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Size summary of an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IndexStats {
    /// Distinct roles
    pub roles: usize,
    /// Distinct capabilities
    pub capabilities: usize,
    /// Distinct license tiers
    pub tiers: usize,
    /// Records the index was built from
    pub records: usize,
}

/// Read-only index over a configuration snapshot.
///
/// Built once per snapshot and shared (usually behind an `Arc`) by every
/// recommendation request. Nothing mutates it after `build`.
#[derive(Debug, Clone, Default)]
pub struct CapabilityIndex {
    capability_to_roles: BTreeMap<String, BTreeSet<String>>,
    role_to_capabilities: BTreeMap<String, BTreeSet<String>>,
    role_to_license_tier: BTreeMap<String, String>,
    tier_priority: BTreeMap<String, u32>,
    record_count: usize,
    generation: String,
}

impl CapabilityIndex {
    /// Build the index from configuration records.
    ///
    /// Each role keeps the tier with the highest priority among its records.
    /// When two tiers share that priority the one seen first in `records`
    /// is kept. Records with a blank role or capability are skipped.
    pub fn build(records: &[CapabilityRecord]) -> Self {
        let mut index = Self {
            generation: generation_of(records),
            ..Self::default()
        };
        let mut role_best: BTreeMap<&str, (&str, u32)> = BTreeMap::new();

        for record in records {
            let role = record.role.trim();
            let capability = record.capability.trim();
            if role.is_empty() || capability.is_empty() {
                debug!("Skipping incomplete capability record: {:?}", record);
                continue;
            }
            index.record_count += 1;

            index
                .capability_to_roles
                .entry(capability.to_string())
                .or_default()
                .insert(role.to_string());
            index
                .role_to_capabilities
                .entry(role.to_string())
                .or_default()
                .insert(capability.to_string());

            let tier = record.license_tier.trim();
            let priority = index.tier_priority.entry(tier.to_string()).or_insert(0);
            *priority = (*priority).max(record.tier_priority);

            match role_best.get(role).copied() {
                Some((best_tier, best_priority)) if record.tier_priority <= best_priority => {
                    if record.tier_priority == best_priority && best_tier != tier {
                        debug!(
                            "Role '{}' has tiers '{}' and '{}' at priority {}; keeping '{}'",
                            role, best_tier, tier, best_priority, best_tier
                        );
                    }
                }
                _ => {
                    role_best.insert(role, (tier, record.tier_priority));
                }
            }
        }

        index.role_to_license_tier = role_best
            .into_iter()
            .map(|(role, (tier, _))| (role.to_string(), tier.to_string()))
            .collect();

        index
    }

    /// Roles granting a capability
    pub fn roles_for(&self, capability: &str) -> Option<&BTreeSet<String>> {
        self.capability_to_roles.get(capability)
    }

    /// Capabilities granted by a role
    pub fn capabilities_of(&self, role: &str) -> Option<&BTreeSet<String>> {
        self.role_to_capabilities.get(role)
    }

    /// License tier required by a role
    pub fn tier_of(&self, role: &str) -> Option<&str> {
        self.role_to_license_tier.get(role).map(String::as_str)
    }

    /// Highest priority recorded for a tier
    pub fn priority_of(&self, tier: &str) -> Option<u32> {
        self.tier_priority.get(tier).copied()
    }

    /// True if some role grants the capability
    pub fn contains_capability(&self, capability: &str) -> bool {
        self.capability_to_roles.contains_key(capability)
    }

    /// All role names, sorted
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.role_to_license_tier.keys().map(String::as_str)
    }

    /// All capability names, sorted
    pub fn capabilities(&self) -> impl Iterator<Item = &str> {
        self.capability_to_roles.keys().map(String::as_str)
    }

    /// Fingerprint of the records this index was built from
    pub fn generation(&self) -> &str {
        &self.generation
    }

    /// True if the index knows no capability
    pub fn is_empty(&self) -> bool {
        self.capability_to_roles.is_empty()
    }

    /// Size summary
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            roles: self.role_to_license_tier.len(),
            capabilities: self.capability_to_roles.len(),
            tiers: self.tier_priority.len(),
            records: self.record_count,
        }
    }
}

/// blake3 fingerprint of the records, in input order
fn generation_of(records: &[CapabilityRecord]) -> String {
    let mut hasher = blake3::Hasher::new();
    for record in records {
        for field in [
            record.role.as_str(),
            record.capability.as_str(),
            record.license_tier.as_str(),
        ] {
            hasher.update(field.as_bytes());
            hasher.update(&[0x1f]);
        }
        hasher.update(&record.tier_priority.to_le_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(role: &str, capability: &str, tier: &str, priority: u32) -> CapabilityRecord {
        CapabilityRecord::new(role, capability, tier, priority)
    }

    #[test]
    fn test_empty_input_yields_empty_index() {
        let index = CapabilityIndex::build(&[]);
        assert!(index.is_empty());
        assert_eq!(index.stats(), IndexStats::default());
        assert_eq!(index.roles().count(), 0);
    }

    #[test]
    fn test_reverse_mapping() {
        let index = CapabilityIndex::build(&[
            rec("R1", "A", "Basic", 10),
            rec("R1", "B", "Basic", 10),
            rec("R2", "A", "Premium", 40),
        ]);

        let roles: Vec<_> = index.roles_for("A").unwrap().iter().cloned().collect();
        assert_eq!(roles, vec!["R1", "R2"]);
        assert_eq!(index.roles_for("B").unwrap().len(), 1);
        assert!(index.roles_for("C").is_none());
        assert!(index.contains_capability("B"));
        assert_eq!(index.capabilities_of("R1").unwrap().len(), 2);
    }

    #[test]
    fn test_role_keeps_highest_priority_tier() {
        let index = CapabilityIndex::build(&[
            rec("R1", "A", "Team Members", 10),
            rec("R1", "B", "Finance", 40),
            rec("R1", "C", "Activity", 20),
        ]);
        assert_eq!(index.tier_of("R1"), Some("Finance"));
    }

    #[test]
    fn test_equal_priority_keeps_first_seen() {
        let index = CapabilityIndex::build(&[
            rec("R1", "A", "Finance", 40),
            rec("R1", "B", "Commerce", 40),
        ]);
        assert_eq!(index.tier_of("R1"), Some("Finance"));
    }

    #[test]
    fn test_tier_priority_is_max_seen() {
        let index = CapabilityIndex::build(&[
            rec("R1", "A", "Custom", 5),
            rec("R2", "B", "Custom", 7),
        ]);
        assert_eq!(index.priority_of("Custom"), Some(7));
        assert_eq!(index.priority_of("Unknown"), None);
    }

    #[test]
    fn test_blank_records_skipped() {
        let index = CapabilityIndex::build(&[
            rec("  ", "A", "Basic", 1),
            rec("R1", "", "Basic", 1),
            rec(" R1 ", " A ", " Basic ", 1),
        ]);
        let stats = index.stats();
        assert_eq!(stats.records, 1);
        assert_eq!(stats.roles, 1);
        assert_eq!(index.tier_of("R1"), Some("Basic"));
        assert!(index.contains_capability("A"));
    }

    #[test]
    fn test_every_indexed_role_has_a_tier() {
        let index = CapabilityIndex::build(&[
            rec("R1", "A", "Basic", 1),
            rec("R2", "A", "", 0),
            rec("R3", "B", "Premium", 3),
        ]);
        for capability in index.capabilities() {
            for role in index.roles_for(capability).unwrap() {
                assert!(index.tier_of(role).is_some(), "role {} has no tier", role);
            }
        }
    }

    #[test]
    fn test_generation_tracks_content() {
        let a = CapabilityIndex::build(&[rec("R1", "A", "Basic", 1)]);
        let b = CapabilityIndex::build(&[rec("R1", "A", "Basic", 1)]);
        let c = CapabilityIndex::build(&[rec("R1", "A", "Basic", 2)]);
        assert_eq!(a.generation(), b.generation());
        assert_ne!(a.generation(), c.generation());
        assert_eq!(a.generation().len(), 64);
    }
}
