// Conflict rules

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while validating conflict rules
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConflictRuleError {
    /// One side of the rule names no role
    #[error("Conflict rule has an empty role name")]
    EmptyRole,

    /// Both sides name the same role
    #[error("Role '{0}' cannot conflict with itself")]
    SelfConflict(String),
}

/// How serious a conflict is.
///
/// Consumed by reporting; the cross-validator only counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational
    Low,
    /// Needs review
    #[default]
    Medium,
    /// Needs a mitigating control
    High,
    /// Must not be granted together
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(label)
    }
}

/// A pair of roles that must not be held by the same user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRule {
    /// First role
    pub role_a: String,

    /// Second role
    pub role_b: String,

    /// Severity of holding both
    #[serde(default)]
    pub severity: Severity,

    /// Why the pair conflicts
    #[serde(default)]
    pub description: String,
}

impl ConflictRule {
    /// Create a rule
    pub fn new(
        role_a: impl Into<String>,
        role_b: impl Into<String>,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            role_a: role_a.into(),
            role_b: role_b.into(),
            severity,
            description: description.into(),
        }
    }

    /// Check the rule is well formed
    pub fn validate(&self) -> Result<(), ConflictRuleError> {
        let a = role_key(&self.role_a);
        let b = role_key(&self.role_b);
        if a.is_empty() || b.is_empty() {
            return Err(ConflictRuleError::EmptyRole);
        }
        if a == b {
            return Err(ConflictRuleError::SelfConflict(self.role_a.clone()));
        }
        Ok(())
    }

    /// Unordered, case-folded key for the role pair
    pub fn pair_key(&self) -> (String, String) {
        let a = role_key(&self.role_a);
        let b = role_key(&self.role_b);
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}

/// Comparison key for a role name
pub(crate) fn role_key(role: &str) -> String {
    role.trim().to_lowercase()
}

/// The reduced rule set used when no organisation matrix is available
pub fn default_rules() -> Vec<ConflictRule> {
    vec![
        ConflictRule::new(
            "Accounts payable clerk",
            "Vendor master maintainer",
            Severity::High,
            "Can create a vendor and pay it",
        ),
        ConflictRule::new(
            "Purchasing agent",
            "Accounts payable clerk",
            Severity::High,
            "Can raise a purchase order and settle its invoice",
        ),
        ConflictRule::new(
            "Purchasing agent",
            "Receiving clerk",
            Severity::Medium,
            "Can order goods and confirm their receipt",
        ),
        ConflictRule::new(
            "Accounts receivable clerk",
            "Credit and collections manager",
            Severity::Medium,
            "Can post customer payments and write off balances",
        ),
        ConflictRule::new(
            "Payroll administrator",
            "Human resource assistant",
            Severity::High,
            "Can add a worker and pay them",
        ),
        ConflictRule::new(
            "General ledger accountant",
            "Accounting manager",
            Severity::Medium,
            "Can post and approve the same journal",
        ),
        ConflictRule::new(
            "Security administrator",
            "Accounting manager",
            Severity::Critical,
            "Can grant themselves financial approval rights",
        ),
        ConflictRule::new(
            "Inventory clerk",
            "Warehouse manager",
            Severity::Low,
            "Can adjust stock and approve the adjustment",
        ),
    ]
}
