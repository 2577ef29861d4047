//! User curation lists (buy-list / sell-list) over the cached catalog
//!
//! Set counts are recomputed by counting live entries after every
//! mutation, never incremented in place, so they cannot drift. Bulk
//! operations tolerate partial failure and report what they touched.

use crate::models::{now_millis, Card, CardSet, VariantTag};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The two user-owned collections. A card may appear in both
/// independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    BuyList,
    SellList,
}

/// One curated card. Carries a catalog snapshot so pricing policies can
/// resolve market prices without reaching back into the cache; hydration
/// replaces the snapshot wholesale via [`CurationStore::absorb_hydrated`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CurationEntry {
    pub set_id: String,
    pub card_id: String,
    pub variant: VariantTag,
    /// User override; `None` means the catalog price applies
    pub price: Option<f64>,
    pub card: Card,
}

impl CurationEntry {
    pub fn key(&self) -> String {
        entry_key(&self.set_id, &self.card_id)
    }
}

fn entry_key(set_id: &str, card_id: &str) -> String {
    format!("{}-{}", set_id, card_id)
}

/// Per-set rollup. `card_count` always equals the number of live entries
/// with that set id in the same collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SetSummary {
    pub set_id: String,
    pub name: String,
    pub logo_image_ref: Option<String>,
    pub card_count: usize,
}

#[derive(Debug, Default)]
struct Collection {
    entries: HashMap<String, CurationEntry>,
    set_summaries: HashMap<String, SetSummary>,
}

impl Collection {
    fn live_count(&self, set_id: &str) -> usize {
        self.entries.values().filter(|e| e.set_id == set_id).count()
    }

    /// Recompute one set's count from live entries; a set that reaches
    /// zero loses its summary row entirely.
    fn recount_set(&mut self, set_id: &str) {
        let count = self.live_count(set_id);
        if count == 0 {
            self.set_summaries.remove(set_id);
        } else if let Some(summary) = self.set_summaries.get_mut(set_id) {
            summary.card_count = count;
        }
    }

    fn snapshot(&self) -> MutationResult {
        let mut entries: Vec<CurationEntry> = self.entries.values().cloned().collect();
        entries.sort_by(|a, b| a.key().cmp(&b.key()));
        let mut set_summaries: Vec<SetSummary> = self.set_summaries.values().cloned().collect();
        set_summaries.sort_by(|a, b| a.set_id.cmp(&b.set_id));
        MutationResult {
            entries,
            set_summaries,
        }
    }
}

/// Collection contents after a mutation, for the caller to re-render from
#[derive(Debug, Clone)]
pub struct MutationResult {
    pub entries: Vec<CurationEntry>,
    pub set_summaries: Vec<SetSummary>,
}

/// Price for a bulk assignment: one literal for everything, or a per-card
/// derivation (used for "apply default price to all selected")
pub enum PriceSpec<'a> {
    Literal(f64),
    PerCard(&'a dyn Fn(&Card) -> Option<f64>),
}

/// How a bulk assignment went. Partial application is fine; `updated`
/// says how many entries actually changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignOutcome {
    pub updated: usize,
    pub requested: usize,
}

/// Filter for a pricing policy pass
#[derive(Debug, Clone, Default)]
pub struct PolicyFilter {
    /// Exact set-name match
    pub set_name: Option<String>,
    /// Inclusive bounds checked against the card's averaged known prices
    pub price_range: Option<(f64, f64)>,
}

/// What a pricing policy does to each matched entry
#[derive(Debug, Clone, Copy)]
pub enum PricingAction {
    /// Overwrite with a fixed amount
    SetCustom(f64),
    /// `market * (1 + percent/100)`; negative percent discounts. Cards
    /// with no resolvable market price are skipped.
    ApplyMargin(f64),
    /// Delete the override, reverting to the catalog price
    UseMarket,
}

/// Structured result of a policy pass; one card's failure never stops the
/// rest, and zero matches is a result, not an error.
#[derive(Debug, Clone, Default)]
pub struct PolicyOutcome {
    pub updated: usize,
    pub matched: usize,
    pub errors: Vec<String>,
}

/// The user's buy-list and sell-list
#[derive(Debug, Default)]
pub struct CurationStore {
    buy_list: Collection,
    sell_list: Collection,
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn valid_price(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

impl CurationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn collection(&self, kind: CollectionKind) -> &Collection {
        match kind {
            CollectionKind::BuyList => &self.buy_list,
            CollectionKind::SellList => &self.sell_list,
        }
    }

    fn collection_mut(&mut self, kind: CollectionKind) -> &mut Collection {
        match kind {
            CollectionKind::BuyList => &mut self.buy_list,
            CollectionKind::SellList => &mut self.sell_list,
        }
    }

    /// Upsert a card into a collection and recount its set
    pub fn add(
        &mut self,
        kind: CollectionKind,
        card: &Card,
        set: &CardSet,
        variant: VariantTag,
        price: Option<f64>,
    ) -> MutationResult {
        let col = self.collection_mut(kind);

        let mut snapshot = card.clone();
        if snapshot.added_at.is_none() {
            snapshot.added_at = Some(now_millis());
        }

        let key = entry_key(&card.set_id, &card.id);
        col.entries.insert(
            key,
            CurationEntry {
                set_id: card.set_id.clone(),
                card_id: card.id.clone(),
                variant,
                price,
                card: snapshot,
            },
        );

        col.set_summaries
            .entry(set.id.clone())
            .or_insert_with(|| SetSummary {
                set_id: set.id.clone(),
                name: set.name.clone(),
                logo_image_ref: set.logo_image_ref.clone(),
                card_count: 0,
            });
        col.recount_set(&set.id);

        col.snapshot()
    }

    /// Delete an entry and recount its set
    pub fn remove(&mut self, kind: CollectionKind, set_id: &str, card_id: &str) -> MutationResult {
        let col = self.collection_mut(kind);
        if col.entries.remove(&entry_key(set_id, card_id)).is_none() {
            log::debug!("Remove of absent entry {}-{} ignored", set_id, card_id);
        }
        col.recount_set(set_id);
        col.snapshot()
    }

    pub fn entry(&self, kind: CollectionKind, set_id: &str, card_id: &str) -> Option<&CurationEntry> {
        self.collection(kind).entries.get(&entry_key(set_id, card_id))
    }

    pub fn entries(&self, kind: CollectionKind) -> Vec<&CurationEntry> {
        let mut entries: Vec<&CurationEntry> = self.collection(kind).entries.values().collect();
        entries.sort_by_key(|e| e.key());
        entries
    }

    pub fn set_summaries(&self, kind: CollectionKind) -> Vec<&SetSummary> {
        let mut summaries: Vec<&SetSummary> =
            self.collection(kind).set_summaries.values().collect();
        summaries.sort_by(|a, b| a.set_id.cmp(&b.set_id));
        summaries
    }

    /// Assign a price to every listed entry. Unknown keys and
    /// unresolvable or invalid prices are skipped, not fatal.
    pub fn bulk_assign_price(
        &mut self,
        kind: CollectionKind,
        card_keys: &[String],
        spec: PriceSpec<'_>,
    ) -> AssignOutcome {
        let col = self.collection_mut(kind);
        let mut updated = 0;

        for key in card_keys {
            let Some(entry) = col.entries.get_mut(key) else {
                log::debug!("Bulk price assign skipped unknown entry {}", key);
                continue;
            };
            let price = match &spec {
                PriceSpec::Literal(price) => Some(*price),
                PriceSpec::PerCard(derive) => derive(&entry.card),
            };
            let Some(price) = price.filter(|p| valid_price(*p)) else {
                log::debug!("Bulk price assign skipped {} (no usable price)", key);
                continue;
            };
            entry.price = Some(round_cents(price));
            updated += 1;
        }

        AssignOutcome {
            updated,
            requested: card_keys.len(),
        }
    }

    /// Apply a pricing policy to every entry matching the filter
    pub fn bulk_apply_pricing_policy(
        &mut self,
        kind: CollectionKind,
        filter: &PolicyFilter,
        action: PricingAction,
    ) -> PolicyOutcome {
        let col = self.collection_mut(kind);
        let mut outcome = PolicyOutcome::default();

        let set_names: HashMap<String, String> = col
            .set_summaries
            .values()
            .map(|s| (s.set_id.clone(), s.name.clone()))
            .collect();

        for entry in col.entries.values_mut() {
            if let Some(wanted) = &filter.set_name {
                let name = set_names.get(&entry.set_id);
                if name.map(String::as_str) != Some(wanted.as_str()) {
                    continue;
                }
            }
            if let Some((lo, hi)) = filter.price_range {
                match entry.card.average_known_price() {
                    Some(avg) if avg >= lo && avg <= hi => {}
                    _ => continue,
                }
            }
            outcome.matched += 1;

            match action {
                PricingAction::SetCustom(amount) => {
                    if !valid_price(amount) {
                        outcome
                            .errors
                            .push(format!("{}: invalid custom price {}", entry.key(), amount));
                        continue;
                    }
                    entry.price = Some(round_cents(amount));
                    outcome.updated += 1;
                }
                PricingAction::ApplyMargin(percent) => {
                    let Some(market) = entry.card.market_price(entry.variant) else {
                        log::debug!("Margin skipped {}: no market price", entry.key());
                        continue;
                    };
                    let derived = round_cents(market * (1.0 + percent / 100.0));
                    if !valid_price(derived) {
                        outcome.errors.push(format!(
                            "{}: margin {}% produced unusable price {}",
                            entry.key(),
                            percent,
                            derived
                        ));
                        continue;
                    }
                    entry.price = Some(derived);
                    outcome.updated += 1;
                }
                PricingAction::UseMarket => {
                    entry.price = None;
                    outcome.updated += 1;
                }
            }
        }

        if outcome.matched == 0 {
            log::info!("Pricing policy matched no cards");
        }
        outcome
    }

    /// Re-absorb hydrated card records: entries tracking those cards get
    /// their catalog snapshot replaced. Entry-level overrides stay.
    pub fn absorb_hydrated(&mut self, cards: &[Card]) {
        for card in cards {
            let key = entry_key(&card.set_id, &card.id);
            for col in [&mut self.buy_list, &mut self.sell_list] {
                if let Some(entry) = col.entries.get_mut(&key) {
                    entry.card = card.clone();
                }
            }
        }
    }
}
