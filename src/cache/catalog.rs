//! Catalog cache: the set list and one card list per set
//!
//! The set list carries a 24h TTL; per-set card lists keep for 7 days
//! because card lists churn far less than prices. A cache hit never
//! touches the network - callers fetch on a miss and write the result
//! back before using it.

use crate::cache::store::{CacheStats, CacheStore, StorageBackend};
use crate::models::{compare_card_numbers, now_millis, Card, CardSet};
use std::time::Duration;

/// TTL for the all-sets collection
pub const SETS_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// TTL for a per-set card list
pub const CARDS_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const SETS_KEY: &str = "catalog/sets";
const CARDS_KEY_PREFIX: &str = "catalog/cards/";

/// TTL-bounded mirror of the upstream catalog
pub struct CatalogCache<B: StorageBackend> {
    store: CacheStore<B>,
}

impl<B: StorageBackend> CatalogCache<B> {
    pub fn new(store: CacheStore<B>) -> Self {
        Self { store }
    }

    fn cards_key(set_id: &str) -> String {
        format!("{}{}", CARDS_KEY_PREFIX, set_id)
    }

    /// TTL that applies to one of this cache's keys
    fn ttl_for(key: &str) -> Option<Duration> {
        if key == SETS_KEY {
            Some(SETS_TTL)
        } else if key.starts_with(CARDS_KEY_PREFIX) {
            Some(CARDS_TTL)
        } else {
            None
        }
    }

    pub fn get_all_sets(&self) -> Option<Vec<CardSet>> {
        let sets: Option<Vec<CardSet>> = self.store.get(SETS_KEY, SETS_TTL);
        match &sets {
            Some(sets) => log::debug!("Set list cache hit ({} sets)", sets.len()),
            None => log::debug!("Set list cache miss"),
        }
        sets
    }

    pub fn put_all_sets(&mut self, sets: &[CardSet]) {
        self.store.put(SETS_KEY, &sets);
        log::info!("Cached {} sets", sets.len());
    }

    pub fn get_cards(&self, set_id: &str) -> Option<Vec<Card>> {
        let cards: Option<Vec<Card>> = self.store.get(&Self::cards_key(set_id), CARDS_TTL);
        match &cards {
            Some(cards) => log::debug!("Card list cache hit for {} ({} cards)", set_id, cards.len()),
            None => log::debug!("Card list cache miss for {}", set_id),
        }
        cards
    }

    /// Store a set's card list, pre-sorted by card number ascending
    pub fn put_cards(&mut self, set_id: &str, mut cards: Vec<Card>) {
        cards.sort_by(|a, b| compare_card_numbers(&a.number, &b.number));
        self.store.put(&Self::cards_key(set_id), &cards);
        log::info!("Cached {} cards for set {}", cards.len(), set_id);
    }

    pub fn clear_set(&mut self, set_id: &str) {
        self.store.invalidate(&Self::cards_key(set_id));
    }

    /// Drop every entry this cache owns
    pub fn clear_all(&mut self) {
        let keys: Vec<String> = self
            .store
            .keys()
            .into_iter()
            .filter(|k| Self::ttl_for(k).is_some())
            .collect();
        for key in &keys {
            self.store.invalidate(key);
        }
        log::info!("Cleared {} catalog cache entries", keys.len());
    }

    /// Drop only entries already past their TTL
    pub fn clear_stale(&mut self) {
        self.clear_stale_at(now_millis());
    }

    pub(crate) fn clear_stale_at(&mut self, now_ms: i64) {
        let mut dropped = 0;
        for key in self.store.keys() {
            let Some(ttl) = Self::ttl_for(&key) else {
                continue;
            };
            let expired = match self.store.stored_at(&key) {
                Some(stored_at) => now_ms - stored_at >= ttl.as_millis() as i64,
                // Unreadable entries can never produce a hit; drop them too
                None => true,
            };
            if expired {
                self.store.invalidate(&key);
                dropped += 1;
            }
        }
        if dropped > 0 {
            log::info!("Dropped {} stale catalog cache entries", dropped);
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::MemoryBackend;
    use crate::models::{PriceFacet, VariantPrices};

    fn cache() -> CatalogCache<MemoryBackend> {
        CatalogCache::new(CacheStore::new(MemoryBackend::new()))
    }

    fn set(id: &str) -> CardSet {
        CardSet {
            id: id.to_string(),
            name: format!("Set {}", id),
            release_date: None,
            total_card_count: None,
            logo_image_ref: None,
        }
    }

    fn card(id: &str, number: &str) -> Card {
        Card {
            id: id.to_string(),
            set_id: "set-a".to_string(),
            number: number.to_string(),
            name: format!("Card {}", id),
            image_refs: None,
            variants: VariantPrices {
                non_holo: Some(PriceFacet {
                    market: Some(1.0),
                    ..PriceFacet::default()
                }),
                ..VariantPrices::default()
            },
            last_updated: None,
            price_override: None,
            added_at: None,
        }
    }

    #[test]
    fn sets_roundtrip() {
        let mut cache = cache();
        assert!(cache.get_all_sets().is_none());

        cache.put_all_sets(&[set("a"), set("b")]);
        let sets = cache.get_all_sets().unwrap();
        assert_eq!(sets.len(), 2);
    }

    #[test]
    fn cards_are_stored_sorted_by_number() {
        let mut cache = cache();
        cache.put_cards(
            "set-a",
            vec![card("c10", "10"), card("c2", "2"), card("ctg", "TG01")],
        );

        let cards = cache.get_cards("set-a").unwrap();
        let numbers: Vec<&str> = cards.iter().map(|c| c.number.as_str()).collect();
        assert_eq!(numbers, vec!["2", "10", "TG01"]);
    }

    #[test]
    fn clear_set_only_touches_that_set() {
        let mut cache = cache();
        cache.put_cards("set-a", vec![card("c1", "1")]);
        cache.put_cards("set-b", vec![card("c2", "2")]);

        cache.clear_set("set-a");
        assert!(cache.get_cards("set-a").is_none());
        assert!(cache.get_cards("set-b").is_some());
    }

    #[test]
    fn clear_all_empties_the_cache() {
        let mut cache = cache();
        cache.put_all_sets(&[set("a")]);
        cache.put_cards("set-a", vec![card("c1", "1")]);

        cache.clear_all();
        assert_eq!(cache.stats().entry_count, 0);
    }

    #[test]
    fn clear_stale_drops_only_expired_entries() {
        let mut cache = cache();
        let t0 = now_millis();
        cache.store.put_at(SETS_KEY, &vec![set("a")], t0);
        cache
            .store
            .put_at(&CatalogCache::<MemoryBackend>::cards_key("set-a"), &vec![card("c1", "1")], t0);

        // Past the 24h set-list TTL but inside the 7d card-list TTL
        let later = t0 + SETS_TTL.as_millis() as i64 + 1;
        cache.clear_stale_at(later);

        assert_eq!(cache.stats().entry_count, 1);
        assert!(cache.get_cards("set-a").is_some());
    }

    #[test]
    fn hit_returns_identical_cards_without_refetch() {
        let mut cache = cache();
        let cards: Vec<Card> = (1..=120).map(|n| card(&format!("c{}", n), &n.to_string())).collect();
        cache.put_cards("set-a", cards.clone());

        let first = cache.get_cards("set-a").unwrap();
        let second = cache.get_cards("set-a").unwrap();
        assert_eq!(first.len(), 120);
        assert_eq!(first, second);
    }
}
