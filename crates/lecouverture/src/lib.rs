// lecouverture - Role Coverage Search
//
// *La Couverture* (The Coverage) - Cheapest role combinations granting a requested capability set

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub mod index;
pub mod ranking;
pub mod recommender;
pub mod record;
pub mod request;
pub mod search;
pub mod snapshot;

pub use index::{CapabilityIndex, IndexStats};
pub use ranking::{Confidence, RankedOptions, Ranker, RecommendationOption, DEFAULT_TOP_K};
pub use recommender::{RecommendationReport, Recommender, DEFAULT_MAX_ALTERNATIVES};
pub use record::CapabilityRecord;
pub use search::{CandidateRoleSet, SearchOutcome, SetCoverSearch};
pub use snapshot::SnapshotHandle;

/// Coverage library initialization
pub fn init() {
    let _ = tracing::subscriber::set_default(tracing::subscriber::NoSubscriber::default());
}
