// Snapshot Loading
//
// *Le Chargeur* (The Loader) - Reads capability records and conflict rules from JSON files

use crate::errors::{LeRoleError, Result};
use leconflit::ConflictRule;
use lecouverture::CapabilityRecord;
use lelicence::TierResolver;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// One row of a capability snapshot file.
///
/// `tier_priority` may be omitted, in which case it is taken from the
/// pricing table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordRow {
    /// Role name
    pub role: String,

    /// Capability granted by the role
    pub capability: String,

    /// License tier the capability requires
    pub license_tier: String,

    /// Priority of the tier, if the snapshot carries it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier_priority: Option<u32>,
}

impl RecordRow {
    /// Turn the row into a record, filling a missing priority from `resolver`
    pub fn into_record(self, resolver: &dyn TierResolver) -> CapabilityRecord {
        let priority = match self.tier_priority {
            Some(priority) => priority,
            None => {
                let priority = resolver.priority(&self.license_tier);
                if priority == 0 && resolver.resolve(&self.license_tier).is_none() {
                    warn!(
                        "License tier '{}' of role '{}' is not in the pricing table",
                        self.license_tier, self.role
                    );
                }
                priority
            }
        };
        CapabilityRecord::new(self.role, self.capability, self.license_tier, priority)
    }
}

/// Parse a JSON array of record rows
pub fn parse_records(json: &str, resolver: &dyn TierResolver) -> Result<Vec<CapabilityRecord>> {
    let rows: Vec<RecordRow> = serde_json::from_str(json)
        .map_err(|e| LeRoleError::snapshot_error(format!("Invalid record JSON: {}", e), None))?;

    debug!("Parsed {} capability records", rows.len());
    Ok(rows.into_iter().map(|row| row.into_record(resolver)).collect())
}

/// Read a capability snapshot file
pub fn load_records(path: &Path, resolver: &dyn TierResolver) -> Result<Vec<CapabilityRecord>> {
    let content = fs::read_to_string(path)
        .map_err(|e| LeRoleError::io_error("Failed to read capability records", path, e))?;

    parse_records(&content, resolver).map_err(|e| match e {
        LeRoleError::Snapshot { message, .. } => {
            LeRoleError::snapshot_error(message, Some(path.to_path_buf()))
        }
        other => other,
    })
}

/// Read a JSON array of conflict rules
pub fn load_rules(path: &Path) -> Result<Vec<ConflictRule>> {
    let content = fs::read_to_string(path)
        .map_err(|e| LeRoleError::io_error("Failed to read conflict rules", path, e))?;

    let rules: Vec<ConflictRule> = serde_json::from_str(&content).map_err(|e| {
        LeRoleError::snapshot_error(
            format!("Invalid conflict rule JSON: {}", e),
            Some(path.to_path_buf()),
        )
    })?;

    for rule in &rules {
        rule.validate()?;
    }
    Ok(rules)
}
