// Error Handling
//
// *La Gestion des Erreurs* (The Error Management) - Error types for loading and serving recommendations

use leconflit::ConflictRuleError;
use lelicence::PricingError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for LeRole operations
pub type Result<T> = std::result::Result<T, LeRoleError>;

/// LeRole error types
#[derive(Debug, Error)]
pub enum LeRoleError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong
        message: String,
        /// How to fix it
        suggestion: Option<String>,
    },

    /// Malformed or unreadable configuration snapshot
    #[error("Snapshot error: {message}")]
    Snapshot {
        /// What is wrong
        message: String,
        /// File the snapshot was read from
        path: Option<PathBuf>,
    },

    /// Invalid pricing table entry
    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),

    /// Invalid conflict rule
    #[error("Conflict rule error: {0}")]
    Conflicts(#[from] ConflictRuleError),

    /// I/O errors with context
    #[error("I/O error: {context} (path: {path:?})")]
    Io {
        /// Operation being performed
        context: String,
        /// File involved
        path: Option<PathBuf>,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl LeRoleError {
    /// Create a config error
    pub fn config_error(message: impl Into<String>, suggestion: Option<String>) -> Self {
        LeRoleError::Config {
            message: message.into(),
            suggestion,
        }
    }

    /// Create a snapshot error for a file
    pub fn snapshot_error(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        LeRoleError::Snapshot {
            message: message.into(),
            path,
        }
    }

    /// Wrap an I/O error
    pub fn io_error(context: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LeRoleError::Io {
            context: context.into(),
            path: Some(path.into()),
            source,
        }
    }

    /// Get user-friendly suggestion for recovery
    pub fn suggestion(&self) -> Option<String> {
        match self {
            LeRoleError::Config { suggestion, .. } => suggestion.clone(),
            LeRoleError::Snapshot { .. } => Some(
                "Snapshot files are JSON arrays of {\"role\", \"capability\", \"license_tier\"} objects."
                    .to_string(),
            ),
            LeRoleError::Pricing(_) => {
                Some("Check the [pricing] tiers in your configuration file.".to_string())
            }
            LeRoleError::Conflicts(_) => {
                Some("Each conflict rule needs two different, non-empty role names.".to_string())
            }
            LeRoleError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                Some("Check the path, or pass --records / --config explicitly.".to_string())
            }
            LeRoleError::Io { .. } => None,
        }
    }
}

/// Format an error for display, including the suggestion if there is one
pub fn format_error(error: &LeRoleError) -> String {
    let mut output = error.to_string();

    if let LeRoleError::Snapshot { path: Some(path), .. } = error {
        output.push_str(&format!("\n  in {}", path.display()));
    }

    if let Some(suggestion) = error.suggestion() {
        output.push_str(&format!("\n\nSuggestion: {}", suggestion));
    }

    output
}
