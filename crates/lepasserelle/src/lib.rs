// lepasserelle - Bridge & Integration
//
// *La Passerelle* (The Bridge) - Configuration, snapshot loading and the `lerole` command line

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub mod cli;
pub mod config;
pub mod errors;
pub mod lerole;
pub mod loader;

pub use config::{
    ConflictConfig, LoggingConfig, PricingConfig, RoleConfig, SearchConfig, SnapshotConfig,
    DEFAULT_CONFIG_FILE,
};
pub use errors::{format_error, LeRoleError, Result};
pub use lerole::{Diagnostics, LeRole};
pub use loader::{load_records, load_rules, parse_records, RecordRow};

/// Bridge library initialization
pub fn init() {
    let _ = tracing::subscriber::set_default(tracing::subscriber::NoSubscriber::default());
}
