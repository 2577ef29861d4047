//! Storefront catalog cache and price hydration
//!
//! Mirrors a remote trading-card catalog (sets and per-set card lists)
//! into a TTL-bounded local cache so browsing never blocks on the
//! upstream source, refreshes per-card market prices in rate-limited
//! background batches, and supports bulk curation (multi-select, batched
//! price assignment) over the cached catalog.
//!
//! Per-card hydration failures are invisible to the end user by design:
//! the stale price silently remains until the next eligible refresh.

pub mod api;
pub mod cache;
pub mod curation;
pub mod error;
pub mod hydrate;
pub mod models;
pub mod selection;

// Re-exports for public API convenience
pub use api::{CardSource, HttpCardSource};
pub use cache::{CacheStats, CacheStore, CatalogCache, MemoryBackend, SqliteBackend, StorageBackend};
pub use curation::{
    CollectionKind, CurationEntry, CurationStore, PolicyFilter, PolicyOutcome, PriceSpec,
    PricingAction, SetSummary,
};
pub use error::{CatalogError, Result};
pub use hydrate::{BatchProgress, CancelFlag, HydrateOptions, HydrationOutcome, PriceHydrator};
pub use models::{Card, CardSet, ImageRefs, PriceFacet, VariantPrices, VariantTag};
pub use selection::{Modifiers, SelectionState, VisibleCard};
