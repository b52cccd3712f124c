// lerole - Core Orchestration
//
// *Le Rôle* (The Role) - Unified API that assembles pricing, conflicts and the capability snapshot

use crate::config::RoleConfig;
use crate::errors::{LeRoleError, Result};
use crate::loader::{load_records, load_rules};
use leconflit::{ConflictMatrix, ConflictPolicy, ConflictRule, LazyConflictPolicy};
use lecouverture::{
    CapabilityRecord, IndexStats, RecommendationReport, Recommender, SnapshotHandle,
};
use lelicence::{PricingTable, TierPrice, TierResolver};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// LeRole - Main orchestration struct
///
/// Owns the pricing table, the conflict policy and a swappable capability
/// snapshot, and answers recommendation requests against them.
///
/// # Example
///
/// ```ignore
/// let config = RoleConfig::from_env(None)?;
/// let lerole = LeRole::from_config(config, ".")?;
/// let report = lerole.recommend(&["VendInvoice", "VendPayment"]);
/// ```
pub struct LeRole {
    config: RoleConfig,
    base_dir: PathBuf,
    pricing: Arc<PricingTable>,
    snapshot: Arc<SnapshotHandle>,
    recommender: Recommender,
}

/// Summary of the loaded state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Generation of the current snapshot
    pub generation: String,

    /// Size of the current snapshot
    pub stats: IndexStats,

    /// Tiers in the effective pricing table
    pub pricing_tiers: usize,

    /// Where records are loaded from, if anywhere
    pub records_path: Option<PathBuf>,
}

impl LeRole {
    /// Assemble from configuration, loading the records file if one is set.
    ///
    /// Relative paths in `config` are resolved against `base_dir`.
    pub fn from_config(config: RoleConfig, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        let pricing = build_pricing(&config)?;

        let records = match config.snapshot.records_path.as_deref() {
            Some(path) => load_records(&resolve_path(&base_dir, path), &pricing)?,
            None => {
                warn!("No records path configured, starting with an empty snapshot");
                Vec::new()
            }
        };

        Self::assemble(config, base_dir, pricing, &records)
    }

    /// Assemble from configuration with records supplied directly
    pub fn with_records(config: RoleConfig, records: &[CapabilityRecord]) -> Result<Self> {
        let pricing = build_pricing(&config)?;
        Self::assemble(config, PathBuf::from("."), pricing, records)
    }

    fn assemble(
        config: RoleConfig,
        base_dir: PathBuf,
        pricing: PricingTable,
        records: &[CapabilityRecord],
    ) -> Result<Self> {
        config.validate()?;

        let pricing = Arc::new(pricing);
        let snapshot = Arc::new(SnapshotHandle::from_records(records));
        let conflicts = build_conflicts(&config, &base_dir);

        let recommender = Recommender::with_snapshot(
            Arc::clone(&snapshot),
            Arc::clone(&pricing) as Arc<dyn TierResolver>,
            conflicts,
        )
        .with_max_alternatives(config.search.max_alternatives)
        .with_top_k(config.search.top_k);

        info!(
            "LeRole ready: {} records, {} pricing tiers",
            records.len(),
            pricing.len()
        );

        Ok(Self {
            config,
            base_dir,
            pricing,
            snapshot,
            recommender,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &RoleConfig {
        &self.config
    }

    /// Recommend role combinations for one request
    pub fn recommend<S: AsRef<str>>(&self, requested: &[S]) -> RecommendationReport {
        self.recommender.recommend_detailed(requested)
    }

    /// Recommend for independent requests in parallel
    pub fn recommend_batch<S>(&self, requests: &[Vec<S>]) -> Vec<RecommendationReport>
    where
        S: AsRef<str> + Sync,
    {
        self.recommender.recommend_batch(requests)
    }

    /// Conflict rules violated by holding all of `roles`
    pub fn conflicts_for(&self, roles: &[String]) -> Vec<ConflictRule> {
        self.recommender.conflicts().violations(roles)
    }

    /// The effective pricing table
    pub fn tiers(&self) -> Vec<TierPrice> {
        self.pricing.tiers()
    }

    /// Generation, size and sources of the loaded state
    pub fn diagnostics(&self) -> Diagnostics {
        let index = self.snapshot.current();
        Diagnostics {
            generation: index.generation().to_string(),
            stats: index.stats(),
            pricing_tiers: self.pricing.len(),
            records_path: self
                .config
                .snapshot
                .records_path
                .as_deref()
                .map(|path| resolve_path(&self.base_dir, path)),
        }
    }

    /// Re-read the records file and publish it.
    ///
    /// Returns `Ok(false)` when the file is unchanged. In-flight requests keep
    /// the snapshot they started with.
    pub fn reload(&self) -> Result<bool> {
        let path = self.config.snapshot.records_path.as_deref().ok_or_else(|| {
            LeRoleError::config_error(
                "Cannot reload without a records path",
                Some("Set records_path under [snapshot] or pass --records".to_string()),
            )
        })?;

        let records = load_records(&resolve_path(&self.base_dir, path), self.pricing.as_ref())?;
        Ok(self.snapshot.replace(&records))
    }

    /// Publish records supplied directly
    pub fn replace_records(&self, records: &[CapabilityRecord]) -> bool {
        self.snapshot.replace(records)
    }
}

/// Resolve `path` against `base_dir` unless it is absolute
pub fn resolve_path(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn build_pricing(config: &RoleConfig) -> Result<PricingTable> {
    let tiers = config.pricing.tiers.clone();
    let table = if config.pricing.include_defaults {
        PricingTable::with_defaults().merge(tiers)?
    } else {
        PricingTable::new(tiers)?
    };
    if table.is_empty() {
        warn!("Pricing table is empty, every candidate will be dropped");
    }
    Ok(table)
}

fn build_conflicts(config: &RoleConfig, base_dir: &Path) -> Arc<dyn ConflictPolicy> {
    let include_defaults = config.conflicts.include_defaults;
    let inline = config.conflicts.rules.clone();
    let rules_path = config
        .conflicts
        .rules_path
        .as_deref()
        .map(|path| resolve_path(base_dir, path));

    Arc::new(LazyConflictPolicy::new(move || -> Result<ConflictMatrix> {
        let mut rules = inline.clone();
        if let Some(path) = rules_path.as_deref() {
            rules.extend(load_rules(path)?);
        }

        let matrix = if include_defaults {
            ConflictMatrix::default_rules().extend(rules)?
        } else {
            ConflictMatrix::new(rules)?
        };
        Ok(matrix)
    }))
}
