//! HTTP client for the remote catalog/price source
//!
//! Uses async reqwest for non-blocking requests. Card-list pages are
//! fetched sequentially with a small pause between pages, the same
//! rate-limit policy family as hydration batching.
//!
//! Upstream payloads are normalized into the canonical schema here;
//! historical field-name variants (`cardId`/`cardNumber`) are accepted on
//! ingest and never leak downstream.

use crate::error::{CatalogError, Result};
use crate::models::{Card, CardSet, ImageRefs, VariantPrices};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// User-Agent sent with every request
const USER_AGENT: &str = "storefront-catalog/1.0";
/// Cards requested per page
pub const DEFAULT_PAGE_SIZE: usize = 250;
/// Pause between sequential card-list pages
const INTER_PAGE_DELAY: Duration = Duration::from_millis(200);

/// Remote source of canonical set, card and price records
#[async_trait]
pub trait CardSource: Send + Sync {
    async fn fetch_sets(&self) -> Result<Vec<CardSet>>;

    async fn fetch_cards_page(
        &self,
        set_id: &str,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<Card>>;

    async fn fetch_card(&self, card_id: &str) -> Result<Card>;

    /// Fetch every card in a set, paging sequentially until a short page
    async fn fetch_all_cards_paged(&self, set_id: &str, page_size: usize) -> Result<Vec<Card>> {
        let mut all = Vec::new();
        let mut page = 1;
        loop {
            let batch = self.fetch_cards_page(set_id, page, page_size).await?;
            let fetched = batch.len();
            all.extend(batch);
            if fetched < page_size {
                break;
            }
            page += 1;
            tokio::time::sleep(INTER_PAGE_DELAY).await;
        }
        log::info!("Fetched {} cards for set {} in {} page(s)", all.len(), set_id, page);
        Ok(all)
    }

    async fn fetch_all_cards(&self, set_id: &str) -> Result<Vec<Card>> {
        self.fetch_all_cards_paged(set_id, DEFAULT_PAGE_SIZE).await
    }
}

/// Standard envelope the upstream wraps every payload in
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Upstream set record
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteSet {
    #[serde(alias = "setId")]
    id: String,
    name: String,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default, alias = "total")]
    total_card_count: Option<u32>,
    #[serde(default, alias = "logo")]
    logo_image_ref: Option<String>,
}

impl From<RemoteSet> for CardSet {
    fn from(remote: RemoteSet) -> Self {
        CardSet {
            id: remote.id,
            name: remote.name,
            release_date: remote.release_date,
            total_card_count: remote.total_card_count,
            logo_image_ref: remote.logo_image_ref,
        }
    }
}

/// Upstream card record. Older payloads use `cardId`/`cardNumber`; both
/// spellings normalize into the canonical `id`/`number`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteCard {
    #[serde(alias = "cardId")]
    id: String,
    set_id: String,
    #[serde(alias = "cardNumber")]
    number: String,
    name: String,
    #[serde(default, alias = "images")]
    image_refs: Option<ImageRefs>,
    #[serde(default, alias = "prices")]
    variants: VariantPrices,
}

impl From<RemoteCard> for Card {
    fn from(remote: RemoteCard) -> Self {
        Card {
            id: remote.id,
            set_id: remote.set_id,
            number: remote.number,
            name: remote.name,
            image_refs: remote.image_refs,
            variants: remote.variants,
            last_updated: None,
            price_override: None,
            added_at: None,
        }
    }
}

/// HTTP implementation of [`CardSource`]
pub struct HttpCardSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpCardSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        log::debug!("Fetching {}", url);
        let response = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CatalogError::HttpStatus(response.status()));
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl CardSource for HttpCardSource {
    async fn fetch_sets(&self) -> Result<Vec<CardSet>> {
        let url = format!("{}/sets", self.base_url);
        let envelope: Envelope<Vec<RemoteSet>> = self.get_json(&url).await?;
        Ok(envelope.data.into_iter().map(CardSet::from).collect())
    }

    async fn fetch_cards_page(
        &self,
        set_id: &str,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<Card>> {
        let url = format!(
            "{}/cards?setId={}&page={}&pageSize={}",
            self.base_url,
            urlencoding::encode(set_id),
            page,
            page_size
        );
        let envelope: Envelope<Vec<RemoteCard>> = self.get_json(&url).await?;
        Ok(envelope.data.into_iter().map(Card::from).collect())
    }

    async fn fetch_card(&self, card_id: &str) -> Result<Card> {
        let url = format!("{}/cards/{}", self.base_url, urlencoding::encode(card_id));
        match self.get_json::<Envelope<RemoteCard>>(&url).await {
            Ok(envelope) => Ok(envelope.data.into()),
            Err(CatalogError::HttpStatus(status)) if status == reqwest::StatusCode::NOT_FOUND => {
                Err(CatalogError::CardNotFound(card_id.to_string()))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
