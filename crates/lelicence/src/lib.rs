// lelicence - License Tier Resolution
//
// *La Licence* (The License) - Tier pricing, priority ordering and name normalization

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub mod normalize;
pub mod pricing;

pub use normalize::normalize_tier_name;
pub use pricing::{MatchKind, PricingError, PricingTable, TierPrice, TierQuote, TierResolver};

/// License library initialization
pub fn init() {
    let _ = tracing::subscriber::set_default(tracing::subscriber::NoSubscriber::default());
}
