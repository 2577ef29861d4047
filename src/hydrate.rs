//! Background price hydration pipeline
//!
//! Scans card lists for records with stale or missing price data and
//! refreshes them from the remote source in bounded concurrent batches,
//! pausing between batches to stay under the upstream rate limit. Callers
//! spawn a run as background work; nothing here blocks a render.
//!
//! A fetch failure bumps the card's freshness stamp without touching its
//! prices, so a failing endpoint is not hammered on every render - the
//! card becomes eligible again only after the next staleness window.

use crate::api::CardSource;
use crate::models::{now_millis, Card};
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Batch size and pacing for a hydration run
#[derive(Debug, Clone)]
pub struct HydrateOptions {
    /// Concurrent fetches per batch
    pub batch_size: usize,
    /// Pause between batches
    pub inter_batch_delay: Duration,
}

impl Default for HydrateOptions {
    fn default() -> Self {
        Self {
            batch_size: 5,
            inter_batch_delay: Duration::from_millis(1000),
        }
    }
}

/// Cooperative cancellation for an in-flight hydration run. Checked
/// between batches; an in-flight batch always completes its merges.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// What a hydration pass did with one card
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HydrationOutcome {
    /// Prices were refreshed from the remote source
    Refreshed,
    /// Card already had fresh price data; no fetch was made
    AlreadyFresh,
    /// Fetch failed or the run was cancelled; only the freshness stamp
    /// moved (or nothing, for cancelled cards)
    Skipped(String),
}

/// Progress snapshot delivered after each completed batch
#[derive(Debug, Clone, Copy)]
pub struct BatchProgress {
    pub processed: usize,
    pub total_stale: usize,
    pub batch_index: usize,
    pub total_batches: usize,
}

/// Result of a hydration run. Card order is not guaranteed; callers
/// re-index by id.
#[derive(Debug)]
pub struct HydrationReport {
    pub cards: Vec<Card>,
    /// Card key to what happened to it
    pub outcomes: Vec<(String, HydrationOutcome)>,
}

impl HydrationReport {
    pub fn refreshed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| *o == HydrationOutcome::Refreshed)
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, HydrationOutcome::Skipped(_)))
            .count()
    }
}

/// Refreshes stale card prices from a remote source in paced batches
pub struct PriceHydrator<S: CardSource> {
    source: S,
}

impl<S: CardSource> PriceHydrator<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// The remote source this hydrator fetches from
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Hydrate with default progress handling and no cancellation
    pub async fn hydrate(&self, cards: Vec<Card>, opts: &HydrateOptions) -> HydrationReport {
        self.hydrate_with(cards, opts, &CancelFlag::new(), |_| {}).await
    }

    /// Full-control entry point: cancellation flag plus a progress
    /// callback invoked after each completed batch.
    pub async fn hydrate_with(
        &self,
        cards: Vec<Card>,
        opts: &HydrateOptions,
        cancel: &CancelFlag,
        mut on_batch: impl FnMut(BatchProgress),
    ) -> HydrationReport {
        let now = now_millis();
        let (stale, fresh): (Vec<Card>, Vec<Card>) =
            cards.into_iter().partition(|c| c.needs_hydration(now));

        let total_stale = stale.len();
        let batch_size = opts.batch_size.max(1);
        let total_batches = total_stale.div_ceil(batch_size);

        let mut outcomes: Vec<(String, HydrationOutcome)> = fresh
            .iter()
            .map(|c| (c.key(), HydrationOutcome::AlreadyFresh))
            .collect();
        let mut out = fresh;

        if total_stale == 0 {
            log::debug!("Nothing to hydrate; all cards fresh");
            return HydrationReport { cards: out, outcomes };
        }

        log::info!(
            "Hydrating {} stale card(s) in {} batch(es) of {}",
            total_stale,
            total_batches,
            batch_size
        );

        let mut processed = 0;
        for (batch_index, batch) in stale.chunks(batch_size).enumerate() {
            if cancel.is_cancelled() {
                log::info!(
                    "Hydration cancelled after {} of {} card(s)",
                    processed,
                    total_stale
                );
                for card in &stale[processed..] {
                    outcomes.push((card.key(), HydrationOutcome::Skipped("cancelled".into())));
                    out.push(card.clone());
                }
                break;
            }

            if batch_index > 0 {
                tokio::time::sleep(opts.inter_batch_delay).await;
            }

            let fetches: Vec<_> = batch.iter().map(|card| self.refresh_card(card)).collect();
            for (card, outcome) in join_all(fetches).await {
                outcomes.push((card.key(), outcome));
                out.push(card);
            }

            processed += batch.len();
            on_batch(BatchProgress {
                processed,
                total_stale,
                batch_index,
                total_batches,
            });
        }

        HydrationReport { cards: out, outcomes }
    }

    async fn refresh_card(&self, card: &Card) -> (Card, HydrationOutcome) {
        match self.source.fetch_card(&card.id).await {
            Ok(canonical) => (
                merge_canonical(card, canonical),
                HydrationOutcome::Refreshed,
            ),
            Err(e) => {
                log::warn!("Price fetch failed for {} ({}): {}", card.name, card.id, e);
                let mut stamped = card.clone();
                stamped.last_updated = Some(now_millis());
                (stamped, HydrationOutcome::Skipped(e.to_string()))
            }
        }
    }
}

/// Merge a canonical record over a locally-held card: remote catalog and
/// price data wins, locally-owned fields survive.
fn merge_canonical(local: &Card, canonical: Card) -> Card {
    Card {
        id: canonical.id,
        set_id: canonical.set_id,
        number: canonical.number,
        name: canonical.name,
        image_refs: canonical.image_refs.or_else(|| local.image_refs.clone()),
        variants: canonical.variants,
        last_updated: Some(now_millis()),
        price_override: local.price_override,
        added_at: local.added_at,
    }
}

#[cfg(test)]
#[path = "hydrate_tests.rs"]
mod tests;
