// Conflict policy and cross-validation
//
// *La Matrice* (The Matrix) - Counting duty-segregation conflicts inside a role set

use crate::rules::{default_rules, role_key, ConflictRule, ConflictRuleError};
use once_cell::sync::OnceCell;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use tracing::{debug, info, warn};

/// Reports duty-segregation conflicts inside a role combination.
///
/// A count of 0 means no known conflicting pair is present.
pub trait ConflictPolicy: Send + Sync {
    /// Number of conflicting role pairs in `roles`
    fn count_conflicts(&self, roles: &[String]) -> usize;

    /// Rules violated by `roles`. Policies that only count return nothing.
    fn violations(&self, roles: &[String]) -> Vec<ConflictRule> {
        let _ = roles;
        Vec::new()
    }
}

/// Policy that never reports a conflict
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConflicts;

impl ConflictPolicy for NoConflicts {
    fn count_conflicts(&self, _roles: &[String]) -> usize {
        0
    }
}

/// Rule table of conflicting role pairs
#[derive(Debug, Clone, Default)]
pub struct ConflictMatrix {
    rules: Vec<ConflictRule>,
    /// role key -> indices of rules mentioning it
    by_role: HashMap<String, Vec<usize>>,
}

impl ConflictMatrix {
    /// Build a matrix from rules.
    ///
    /// Rules repeating an already seen pair (in either order) are ignored.
    pub fn new(rules: Vec<ConflictRule>) -> Result<Self, ConflictRuleError> {
        let mut matrix = Self::default();
        let mut seen = HashSet::new();

        for rule in rules {
            rule.validate()?;
            if !seen.insert(rule.pair_key()) {
                debug!(
                    "Ignoring duplicate conflict rule {} <-> {}",
                    rule.role_a, rule.role_b
                );
                continue;
            }

            let idx = matrix.rules.len();
            let (a, b) = rule.pair_key();
            matrix.by_role.entry(a).or_default().push(idx);
            matrix.by_role.entry(b).or_default().push(idx);
            matrix.rules.push(rule);
        }

        Ok(matrix)
    }

    /// Matrix holding the reduced default rule set
    pub fn default_rules() -> Self {
        // The built-in rules are validated by tests
        Self::new(default_rules()).unwrap_or_default()
    }

    /// Extend this matrix with more rules
    pub fn extend(self, rules: Vec<ConflictRule>) -> Result<Self, ConflictRuleError> {
        let mut all = self.rules;
        all.extend(rules);
        Self::new(all)
    }

    /// All rules in insertion order
    pub fn rules(&self) -> &[ConflictRule] {
        &self.rules
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True if there are no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn violated_indices(&self, roles: &[String]) -> Vec<usize> {
        let present: HashSet<String> = roles.iter().map(|r| role_key(r)).collect();
        let mut hits: Vec<usize> = present
            .iter()
            .filter_map(|role| self.by_role.get(role))
            .flatten()
            .copied()
            .filter(|&idx| {
                let (a, b) = self.rules[idx].pair_key();
                present.contains(&a) && present.contains(&b)
            })
            .collect();
        hits.sort_unstable();
        hits.dedup();
        hits
    }
}

impl ConflictPolicy for ConflictMatrix {
    fn count_conflicts(&self, roles: &[String]) -> usize {
        self.violated_indices(roles).len()
    }

    fn violations(&self, roles: &[String]) -> Vec<ConflictRule> {
        self.violated_indices(roles)
            .into_iter()
            .map(|idx| self.rules[idx].clone())
            .collect()
    }
}

/// A conflict matrix loaded on first use.
///
/// The loader runs at most once. If it fails the policy falls back to the
/// default rule set for the rest of its lifetime.
pub struct LazyConflictPolicy<F> {
    loader: F,
    matrix: OnceCell<ConflictMatrix>,
}

impl<F, E> LazyConflictPolicy<F>
where
    F: Fn() -> Result<ConflictMatrix, E>,
    E: Display,
{
    /// Wrap a loader
    pub fn new(loader: F) -> Self {
        Self {
            loader,
            matrix: OnceCell::new(),
        }
    }

    /// True once the matrix has been loaded (or has fallen back)
    pub fn is_loaded(&self) -> bool {
        self.matrix.get().is_some()
    }

    /// The loaded matrix, loading it if needed
    pub fn matrix(&self) -> &ConflictMatrix {
        self.matrix.get_or_init(|| match (self.loader)() {
            Ok(matrix) => {
                info!("Loaded conflict matrix with {} rules", matrix.len());
                matrix
            }
            Err(e) => {
                warn!("Failed to load conflict matrix, using default rules: {}", e);
                ConflictMatrix::default_rules()
            }
        })
    }
}

impl<F, E> ConflictPolicy for LazyConflictPolicy<F>
where
    F: Fn() -> Result<ConflictMatrix, E> + Send + Sync,
    E: Display,
{
    fn count_conflicts(&self, roles: &[String]) -> usize {
        self.matrix().count_conflicts(roles)
    }

    fn violations(&self, roles: &[String]) -> Vec<ConflictRule> {
        self.matrix().violations(roles)
    }
}
