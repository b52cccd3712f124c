// Recommendation entry point
//
// Wires the index, the tier resolver and the conflict policy into a single
// request/response call.

use crate::index::CapabilityIndex;
use crate::ranking::{Ranker, RecommendationOption, DEFAULT_TOP_K};
use crate::record::CapabilityRecord;
use crate::search::SetCoverSearch;
use crate::snapshot::SnapshotHandle;
use leconflit::ConflictPolicy;
use lelicence::TierResolver;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Search reruns attempted per request by default
pub const DEFAULT_MAX_ALTERNATIVES: usize = 5;

/// Full answer to one recommendation request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationReport {
    /// The cleaned request
    pub requested: Vec<String>,

    /// Ranked options (at most `top_k`)
    pub options: Vec<RecommendationOption>,

    /// Request-level warnings
    pub warnings: Vec<String>,

    /// Requested capabilities no role grants
    pub uncovered: Vec<String>,

    /// Distinct candidates produced by the search
    pub candidates_considered: usize,

    /// Candidates dropped because they could not be priced
    pub candidates_dropped: usize,

    /// Generation of the index that answered the request
    pub generation: String,
}

impl RecommendationReport {
    /// True if no option could be produced
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

enum IndexSource {
    Fixed(Arc<CapabilityIndex>),
    Snapshot(Arc<SnapshotHandle>),
}

impl IndexSource {
    fn current(&self) -> Arc<CapabilityIndex> {
        match self {
            IndexSource::Fixed(index) => Arc::clone(index),
            IndexSource::Snapshot(handle) => handle.current(),
        }
    }
}

/// Recommends role combinations for users without usage history.
///
/// Holds only shared, read-only state, so one recommender can serve many
/// requests in parallel.
pub struct Recommender {
    source: IndexSource,
    resolver: Arc<dyn TierResolver>,
    conflicts: Arc<dyn ConflictPolicy>,
    max_alternatives: usize,
    top_k: usize,
}

impl Recommender {
    /// Create a recommender over a fixed index
    pub fn new(
        index: Arc<CapabilityIndex>,
        resolver: Arc<dyn TierResolver>,
        conflicts: Arc<dyn ConflictPolicy>,
    ) -> Self {
        Self {
            source: IndexSource::Fixed(index),
            resolver,
            conflicts,
            max_alternatives: DEFAULT_MAX_ALTERNATIVES,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Create a recommender that reads the current index of `handle` on
    /// every request
    pub fn with_snapshot(
        handle: Arc<SnapshotHandle>,
        resolver: Arc<dyn TierResolver>,
        conflicts: Arc<dyn ConflictPolicy>,
    ) -> Self {
        Self {
            source: IndexSource::Snapshot(handle),
            resolver,
            conflicts,
            max_alternatives: DEFAULT_MAX_ALTERNATIVES,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Build the index from configuration records
    pub fn from_records(
        records: &[CapabilityRecord],
        resolver: Arc<dyn TierResolver>,
        conflicts: Arc<dyn ConflictPolicy>,
    ) -> Self {
        let index = CapabilityIndex::build(records);
        info!("Built capability index: {:?}", index.stats());
        Self::new(Arc::new(index), resolver, conflicts)
    }

    /// Set the number of search attempts (primary + reruns)
    pub fn with_max_alternatives(mut self, max_alternatives: usize) -> Self {
        self.max_alternatives = max_alternatives;
        self
    }

    /// Set the number of options returned
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// The index the next request will use
    pub fn index(&self) -> Arc<CapabilityIndex> {
        self.source.current()
    }

    /// The conflict policy
    pub fn conflicts(&self) -> &dyn ConflictPolicy {
        self.conflicts.as_ref()
    }

    /// The tier resolver
    pub fn resolver(&self) -> &dyn TierResolver {
        self.resolver.as_ref()
    }

    /// Ranked options for a requested capability set
    pub fn recommend<S: AsRef<str>>(&self, requested: &[S]) -> Vec<RecommendationOption> {
        self.recommend_detailed(requested).options
    }

    /// Ranked options plus request-level warnings and bookkeeping
    pub fn recommend_detailed<S: AsRef<str>>(&self, requested: &[S]) -> RecommendationReport {
        let index = self.source.current();
        let resolver = self.resolver.as_ref();

        let outcome =
            SetCoverSearch::new(&index, resolver).search(requested, self.max_alternatives);
        let ranked = Ranker::new(&index, resolver, self.conflicts.as_ref())
            .with_top_k(self.top_k)
            .rank(&outcome);

        let mut warnings: Vec<String> = outcome
            .uncoverable
            .iter()
            .map(|capability| format!("Capability '{}' is not granted by any role", capability))
            .collect();
        if ranked.options.is_empty() && !outcome.coverable.is_empty() {
            warnings.push(format!(
                "No recommendation available: all {} candidates had an unpriced license tier",
                ranked.dropped
            ));
        }

        debug!(
            "Recommendation for {} capabilities: {} options, {} warnings",
            outcome.requested.len(),
            ranked.options.len(),
            warnings.len()
        );

        RecommendationReport {
            requested: outcome.requested,
            options: ranked.options,
            warnings,
            uncovered: outcome.uncoverable,
            candidates_considered: ranked.considered,
            candidates_dropped: ranked.dropped,
            generation: index.generation().to_string(),
        }
    }

    /// Answer independent requests in parallel against the shared index
    pub fn recommend_batch<S>(&self, requests: &[Vec<S>]) -> Vec<RecommendationReport>
    where
        S: AsRef<str> + Sync,
    {
        requests
            .par_iter()
            .map(|requested| self.recommend_detailed(requested))
            .collect()
    }
}
