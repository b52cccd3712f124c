// Capability configuration records

use serde::{Deserialize, Serialize};

/// One role-capability grant from the configuration snapshot.
///
/// A role appears once per capability it grants; the same capability may be
/// granted by many roles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CapabilityRecord {
    /// Role name
    pub role: String,

    /// Capability (securable action or menu item) granted by the role
    pub capability: String,

    /// License tier required for this grant
    pub license_tier: String,

    /// Priority of the license tier (higher = more capable)
    pub tier_priority: u32,
}

impl CapabilityRecord {
    /// Create a record
    pub fn new(
        role: impl Into<String>,
        capability: impl Into<String>,
        license_tier: impl Into<String>,
        tier_priority: u32,
    ) -> Self {
        Self {
            role: role.into(),
            capability: capability.into(),
            license_tier: license_tier.into(),
            tier_priority,
        }
    }
}
