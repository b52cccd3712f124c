// leconflit - Duty Segregation
//
// *Le Conflit* (The Conflict) - Role-pair conflict rules and cross-validation of role sets

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub mod policy;
pub mod rules;

pub use policy::{ConflictMatrix, ConflictPolicy, LazyConflictPolicy, NoConflicts};
pub use rules::{ConflictRule, ConflictRuleError, Severity};

/// Conflict library initialization
pub fn init() {
    let _ = tracing::subscriber::set_default(tracing::subscriber::NoSubscriber::default());
}
