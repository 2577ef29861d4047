//! Tests for the price hydration pipeline

use super::*;
use crate::error::{CatalogError, Result};
use crate::models::{CardSet, PriceFacet, VariantPrices, STALENESS_WINDOW_MS};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::AtomicUsize;
use std::sync::Mutex;

/// Fake source that serves refreshed records and counts fetches.
/// Ids listed in `failing` return an error instead.
struct CountingSource {
    fetches: AtomicUsize,
    failing: HashSet<String>,
}

impl CountingSource {
    fn new() -> Self {
        Self {
            fetches: AtomicUsize::new(0),
            failing: HashSet::new(),
        }
    }

    fn failing_for(ids: &[&str]) -> Self {
        Self {
            fetches: AtomicUsize::new(0),
            failing: ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CardSource for CountingSource {
    async fn fetch_sets(&self) -> Result<Vec<CardSet>> {
        Ok(Vec::new())
    }

    async fn fetch_cards_page(&self, _: &str, _: usize, _: usize) -> Result<Vec<Card>> {
        Ok(Vec::new())
    }

    async fn fetch_card(&self, card_id: &str) -> Result<Card> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(card_id) {
            return Err(CatalogError::CardNotFound(card_id.to_string()));
        }
        Ok(Card {
            id: card_id.to_string(),
            set_id: "set-a".to_string(),
            number: "1".to_string(),
            name: format!("Card {}", card_id),
            image_refs: None,
            variants: VariantPrices {
                holofoil: Some(PriceFacet {
                    low: Some(8.0),
                    mid: Some(10.0),
                    high: Some(12.0),
                    market: Some(10.0),
                }),
                ..VariantPrices::default()
            },
            last_updated: None,
            price_override: None,
            added_at: None,
        })
    }
}

fn stale_card(id: &str) -> Card {
    Card {
        id: id.to_string(),
        set_id: "set-a".to_string(),
        number: "1".to_string(),
        name: format!("Card {}", id),
        image_refs: None,
        variants: VariantPrices::default(),
        last_updated: None,
        price_override: None,
        added_at: None,
    }
}

fn fresh_card(id: &str) -> Card {
    let mut card = stale_card(id);
    card.variants.non_holo = Some(PriceFacet {
        market: Some(1.0),
        ..PriceFacet::default()
    });
    card.last_updated = Some(now_millis());
    card
}

fn quick_opts() -> HydrateOptions {
    HydrateOptions {
        batch_size: 2,
        inter_batch_delay: Duration::ZERO,
    }
}

#[tokio::test]
async fn fresh_cards_pass_through_without_fetching() {
    let hydrator = PriceHydrator::new(CountingSource::new());
    let cards = vec![fresh_card("a"), fresh_card("b"), fresh_card("c")];

    let report = hydrator.hydrate(cards.clone(), &quick_opts()).await;

    assert_eq!(hydrator.source.fetch_count(), 0);
    assert_eq!(report.cards, cards);
    assert!(report
        .outcomes
        .iter()
        .all(|(_, o)| *o == HydrationOutcome::AlreadyFresh));
}

#[tokio::test]
async fn stale_cards_are_fetched_and_merged() {
    let hydrator = PriceHydrator::new(CountingSource::new());
    let cards = vec![stale_card("a"), fresh_card("b")];

    let report = hydrator.hydrate(cards, &quick_opts()).await;

    assert_eq!(hydrator.source.fetch_count(), 1);
    assert_eq!(report.refreshed_count(), 1);

    let refreshed = report.cards.iter().find(|c| c.id == "a").unwrap();
    assert!(refreshed.has_any_price());
    assert!(refreshed.last_updated.is_some());
}

#[tokio::test]
async fn partial_failure_never_aborts_the_run() {
    let hydrator = PriceHydrator::new(CountingSource::failing_for(&["b", "d"]));
    let cards = vec![
        stale_card("a"),
        stale_card("b"),
        stale_card("c"),
        stale_card("d"),
        stale_card("e"),
    ];

    let report = hydrator.hydrate(cards, &quick_opts()).await;

    assert_eq!(report.cards.len(), 5);
    assert_eq!(report.refreshed_count(), 3);
    assert_eq!(report.skipped_count(), 2);

    for id in ["a", "c", "e"] {
        let card = report.cards.iter().find(|c| c.id == id).unwrap();
        assert!(card.has_any_price(), "{} should carry refreshed prices", id);
    }
    for id in ["b", "d"] {
        let card = report.cards.iter().find(|c| c.id == id).unwrap();
        assert!(!card.has_any_price(), "{} keeps its old (empty) prices", id);
        // Stamp moved so the failing endpoint is not retried immediately
        assert!(card.last_updated.is_some());
        assert!(!card.needs_hydration(now_millis()));
    }
}

#[tokio::test]
async fn merge_preserves_locally_owned_fields() {
    let hydrator = PriceHydrator::new(CountingSource::new());
    let mut card = stale_card("a");
    card.price_override = Some(3.33);
    card.added_at = Some(123_456);

    let report = hydrator.hydrate(vec![card], &quick_opts()).await;

    let merged = &report.cards[0];
    assert_eq!(merged.price_override, Some(3.33));
    assert_eq!(merged.added_at, Some(123_456));
    assert_eq!(
        merged.variants.holofoil.as_ref().unwrap().market,
        Some(10.0)
    );
}

#[tokio::test]
async fn progress_is_reported_per_batch() {
    let hydrator = PriceHydrator::new(CountingSource::new());
    let cards = vec![
        stale_card("a"),
        stale_card("b"),
        stale_card("c"),
        stale_card("d"),
        stale_card("e"),
    ];

    let snapshots = Mutex::new(Vec::new());
    let report = hydrator
        .hydrate_with(cards, &quick_opts(), &CancelFlag::new(), |progress| {
            snapshots.lock().unwrap().push(progress);
        })
        .await;

    assert_eq!(report.cards.len(), 5);
    let snapshots = snapshots.into_inner().unwrap();
    let seen: Vec<(usize, usize, usize, usize)> = snapshots
        .iter()
        .map(|p| (p.processed, p.total_stale, p.batch_index, p.total_batches))
        .collect();
    assert_eq!(seen, vec![(2, 5, 0, 3), (4, 5, 1, 3), (5, 5, 2, 3)]);
}

#[tokio::test]
async fn cancellation_stops_between_batches() {
    let hydrator = PriceHydrator::new(CountingSource::new());
    let cards = vec![
        stale_card("a"),
        stale_card("b"),
        stale_card("c"),
        stale_card("d"),
    ];

    let cancel = CancelFlag::new();
    let report = hydrator
        .hydrate_with(cards, &quick_opts(), &cancel, |_| cancel.cancel())
        .await;

    // First batch completed, second never started
    assert_eq!(hydrator.source.fetch_count(), 2);
    assert_eq!(report.cards.len(), 4);
    assert_eq!(report.refreshed_count(), 2);

    let cancelled: Vec<&str> = report
        .outcomes
        .iter()
        .filter(|(_, o)| *o == HydrationOutcome::Skipped("cancelled".into()))
        .map(|(key, _)| key.as_str())
        .collect();
    assert_eq!(cancelled.len(), 2);
    // Untouched cards come back unchanged
    let untouched = report.cards.iter().find(|c| c.id == "d").unwrap();
    assert!(untouched.last_updated.is_none());
}

#[tokio::test]
async fn failed_card_becomes_eligible_after_the_window() {
    let hydrator = PriceHydrator::new(CountingSource::failing_for(&["a"]));
    let report = hydrator.hydrate(vec![stale_card("a")], &quick_opts()).await;

    let stamped = &report.cards[0];
    assert_eq!(hydrator.source.fetch_count(), 1);

    // Immediately after the failure: held off
    assert!(!stamped.needs_hydration(now_millis()));
    // Once the staleness window passes: eligible again
    assert!(stamped.needs_hydration(stamped.last_updated.unwrap() + STALENESS_WINDOW_MS + 1));
}
