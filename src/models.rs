//! Canonical catalog schema shared by every component
//!
//! Remote payloads are normalized into these types at the API boundary, so
//! downstream code never branches on upstream field-name variants.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Window after which a card's price data is eligible for re-hydration
pub const STALENESS_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

/// Current time as epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A card set from the upstream catalog. Immutable once cached; replaced
/// wholesale on refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardSet {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub total_card_count: Option<u32>,
    #[serde(default)]
    pub logo_image_ref: Option<String>,
}

/// Print variant of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VariantTag {
    NonHolo,
    ReverseHolo,
    Holofoil,
}

impl VariantTag {
    /// All variants in default-selection priority order
    pub fn priority_order() -> [VariantTag; 3] {
        [
            VariantTag::Holofoil,
            VariantTag::ReverseHolo,
            VariantTag::NonHolo,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VariantTag::NonHolo => "nonHolo",
            VariantTag::ReverseHolo => "reverseHolo",
            VariantTag::Holofoil => "holofoil",
        }
    }
}

/// One price quote shape for one card variant
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PriceFacet {
    pub low: Option<f64>,
    pub mid: Option<f64>,
    pub high: Option<f64>,
    pub market: Option<f64>,
}

impl PriceFacet {
    /// True if any field carries a quote
    pub fn has_any(&self) -> bool {
        self.low.is_some() || self.mid.is_some() || self.high.is_some() || self.market.is_some()
    }

    /// All non-null quote values
    pub fn known_values(&self) -> Vec<f64> {
        [self.low, self.mid, self.high, self.market]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Per-variant price facets. A card's variant set is derived from which
/// facets are non-null.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VariantPrices {
    #[serde(default)]
    pub non_holo: Option<PriceFacet>,
    #[serde(default)]
    pub reverse_holo: Option<PriceFacet>,
    #[serde(default)]
    pub holofoil: Option<PriceFacet>,
}

impl VariantPrices {
    pub fn get(&self, tag: VariantTag) -> Option<&PriceFacet> {
        match tag {
            VariantTag::NonHolo => self.non_holo.as_ref(),
            VariantTag::ReverseHolo => self.reverse_holo.as_ref(),
            VariantTag::Holofoil => self.holofoil.as_ref(),
        }
    }

    /// Facets present on this card, in priority order
    pub fn available(&self) -> Vec<VariantTag> {
        VariantTag::priority_order()
            .into_iter()
            .filter(|tag| self.get(*tag).is_some())
            .collect()
    }
}

/// Card image references (small and large renditions)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageRefs {
    #[serde(default)]
    pub small: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
}

/// A card in the canonical schema.
///
/// `last_updated`, `price_override` and `added_at` are locally owned: the
/// hydrator preserves them when it merges a freshly fetched canonical
/// record over a cached card.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub set_id: String,
    pub number: String,
    pub name: String,
    #[serde(default)]
    pub image_refs: Option<ImageRefs>,
    #[serde(default)]
    pub variants: VariantPrices,
    /// Epoch millis of the last price refresh attempt (success or failure)
    #[serde(default)]
    pub last_updated: Option<i64>,
    /// Curation price override; never touched by hydration merges
    #[serde(default)]
    pub price_override: Option<f64>,
    /// When the card was added to a curation list
    #[serde(default)]
    pub added_at: Option<i64>,
}

impl Card {
    /// Stable key identifying this card across sets
    pub fn key(&self) -> String {
        format!("{}-{}", self.set_id, self.id)
    }

    /// True if at least one facet across all variants has a quote
    pub fn has_any_price(&self) -> bool {
        VariantTag::priority_order()
            .into_iter()
            .any(|tag| self.variants.get(tag).is_some_and(|f| f.has_any()))
    }

    /// First non-null facet in priority order: holofoil, reverse holo,
    /// non-holo. Falls back to non-holo when no facet is present.
    pub fn default_variant(&self) -> VariantTag {
        self.variants
            .available()
            .first()
            .copied()
            .unwrap_or(VariantTag::NonHolo)
    }

    /// Market price for a variant, falling back to the default variant
    pub fn market_price(&self, variant: VariantTag) -> Option<f64> {
        self.variants
            .get(variant)
            .and_then(|f| f.market)
            .or_else(|| self.variants.get(self.default_variant()).and_then(|f| f.market))
    }

    /// Mean of all non-null quote values across every variant
    pub fn average_known_price(&self) -> Option<f64> {
        let values: Vec<f64> = VariantTag::priority_order()
            .into_iter()
            .filter_map(|tag| self.variants.get(tag))
            .flat_map(|f| f.known_values())
            .collect();
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    /// A card needs hydration when it has never been price-refreshed or
    /// its last refresh is past the staleness window. The stamp alone
    /// gates eligibility: a failed refresh bumps it too, which keeps a
    /// failing endpoint from being retried on every render.
    pub fn needs_hydration(&self, now_ms: i64) -> bool {
        match self.last_updated {
            None => true,
            Some(ts) => now_ms - ts > STALENESS_WINDOW_MS,
        }
    }
}

/// Ordering for card numbers: numeric when both sides parse as integers,
/// otherwise a digit-aware string comparison (so "2" < "10" and
/// "TG10" < "TG12" both hold).
pub fn compare_card_numbers(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<u64>(), b.trim().parse::<u64>()) {
        (Ok(na), Ok(nb)) => na.cmp(&nb),
        _ => natural_cmp(a, b),
    }
}

fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ai = a.chars().peekable();
    let mut bi = b.chars().peekable();
    loop {
        match (ai.peek().copied(), bi.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) => {
                if ca.is_ascii_digit() && cb.is_ascii_digit() {
                    let na = take_number(&mut ai);
                    let nb = take_number(&mut bi);
                    match na.cmp(&nb) {
                        Ordering::Equal => continue,
                        other => return other,
                    }
                }
                let la = ca.to_ascii_lowercase();
                let lb = cb.to_ascii_lowercase();
                if la != lb {
                    return la.cmp(&lb);
                }
                ai.next();
                bi.next();
            }
        }
    }
}

fn take_number(iter: &mut std::iter::Peekable<std::str::Chars<'_>>) -> u64 {
    let mut value: u64 = 0;
    while let Some(c) = iter.peek().copied() {
        if let Some(d) = c.to_digit(10) {
            value = value.saturating_mul(10).saturating_add(d as u64);
            iter.next();
        } else {
            break;
        }
    }
    value
}
