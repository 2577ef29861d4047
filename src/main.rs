//! Storefront catalog sync - mirrors the remote card catalog locally
//!
//! Keeps the local set and card-list cache fresh and hydrates stale
//! market prices in rate-limited batches. Runs once or continuously on
//! an interval.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use storefront_catalog::{
    CacheStore, CancelFlag, CardSource, CatalogCache, HttpCardSource, HydrateOptions,
    PriceHydrator, SqliteBackend,
};
use tokio::time::interval;

/// Catalog mirror - caches sets/cards locally and refreshes market prices
#[derive(Parser, Debug)]
#[command(name = "storefront_catalog")]
#[command(version, about, long_about = None)]
struct Args {
    /// Base URL of the remote catalog/price API
    #[arg(long)]
    api_url: String,

    /// Path to the SQLite cache database
    #[arg(short, long, default_value_t = default_db_path())]
    database: String,

    /// Sync only this set id (default: every set in the catalog)
    #[arg(long)]
    set: Option<String>,

    /// Run once and exit (default: run continuously)
    #[arg(long, default_value_t = false)]
    once: bool,

    /// Check interval in hours when running continuously
    #[arg(long, default_value_t = 6)]
    interval_hours: u64,

    /// Drop expired cache entries before syncing
    #[arg(long, default_value_t = false)]
    clear_stale: bool,

    /// Concurrent price fetches per hydration batch
    #[arg(long, default_value_t = 5)]
    batch_size: usize,

    /// Pause between hydration batches, in milliseconds
    #[arg(long, default_value_t = 1000)]
    batch_delay_ms: u64,
}

/// Returns the default cache path: ~/.local/share/storefront_catalog/catalog_cache.db
fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("storefront_catalog")
        .join("catalog_cache.db")
        .to_string_lossy()
        .to_string()
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let db_path = PathBuf::from(&args.database);

    log::info!("Starting storefront_catalog sync...");
    log::info!("Cache database: {}", db_path.display());

    if let Some(parent) = db_path.parent() {
        if !parent.exists() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("Failed to create cache directory: {}", e);
                std::process::exit(1);
            }
            log::info!("Created directory: {}", parent.display());
        }
    }

    let backend = match SqliteBackend::open(&db_path) {
        Ok(backend) => backend,
        Err(e) => {
            log::error!("Failed to open cache database: {}", e);
            std::process::exit(1);
        }
    };
    let mut cache = CatalogCache::new(CacheStore::new(backend));
    let hydrator = PriceHydrator::new(HttpCardSource::new(&args.api_url));

    // Ctrl-C cancels an in-flight hydration run between batches and stops
    // the daemon loop
    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Shutdown requested, finishing current batch...");
                cancel.cancel();
            }
        });
    }

    if args.once {
        run_sync(&mut cache, &hydrator, &args, &cancel).await;
    } else {
        log::info!(
            "Running in daemon mode, syncing every {} hour(s)",
            args.interval_hours
        );
        run_daemon(&mut cache, &hydrator, &args, &cancel).await;
    }
}

/// Run the sync daemon - re-syncs on a fixed interval until cancelled
async fn run_daemon(
    cache: &mut CatalogCache<SqliteBackend>,
    hydrator: &PriceHydrator<HttpCardSource>,
    args: &Args,
    cancel: &CancelFlag,
) {
    let mut ticker = interval(Duration::from_secs(args.interval_hours * 3600));

    loop {
        ticker.tick().await;
        run_sync(cache, hydrator, args, cancel).await;
        if cancel.is_cancelled() {
            log::info!("Daemon stopped");
            return;
        }
    }
}

/// One sync pass: ensure a fresh set list, ensure each target set's card
/// list (cache-first, write-through on a miss), then hydrate stale prices.
async fn run_sync(
    cache: &mut CatalogCache<SqliteBackend>,
    hydrator: &PriceHydrator<HttpCardSource>,
    args: &Args,
    cancel: &CancelFlag,
) {
    if args.clear_stale {
        cache.clear_stale();
    }

    let sets = match cache.get_all_sets() {
        Some(sets) => sets,
        None => match hydrator.source().fetch_sets().await {
            Ok(sets) => {
                cache.put_all_sets(&sets);
                sets
            }
            Err(e) => {
                log::error!("Failed to fetch set list: {}", e);
                return;
            }
        },
    };
    log::info!("Catalog has {} set(s)", sets.len());

    let targets: Vec<_> = sets
        .iter()
        .filter(|s| args.set.as_deref().map_or(true, |wanted| wanted == s.id))
        .collect();
    if targets.is_empty() {
        log::warn!("No sets match the requested filter");
        return;
    }

    for set in targets {
        if cancel.is_cancelled() {
            break;
        }

        let cards = match cache.get_cards(&set.id) {
            Some(cards) => cards,
            None => match hydrator.source().fetch_all_cards(&set.id).await {
                Ok(cards) => {
                    cache.put_cards(&set.id, cards);
                    cache.get_cards(&set.id).unwrap_or_default()
                }
                Err(e) => {
                    log::error!("Failed to fetch cards for set {}: {}", set.id, e);
                    continue;
                }
            },
        };

        let opts = HydrateOptions {
            batch_size: args.batch_size,
            inter_batch_delay: Duration::from_millis(args.batch_delay_ms),
        };
        let set_id = set.id.clone();
        let report = hydrator
            .hydrate_with(cards, &opts, cancel, |p| {
                log::info!(
                    "Hydrating {}: {}/{} cards (batch {}/{})",
                    set_id,
                    p.processed,
                    p.total_stale,
                    p.batch_index + 1,
                    p.total_batches
                );
            })
            .await;

        if report.refreshed_count() > 0 || report.skipped_count() > 0 {
            log::info!(
                "Set {}: {} refreshed, {} skipped",
                set.id,
                report.refreshed_count(),
                report.skipped_count()
            );
            cache.put_cards(&set.id, report.cards);
        }
    }

    let stats = cache.stats();
    log::info!(
        "Sync complete. Cache holds {} entries (~{} KiB)",
        stats.entry_count,
        stats.approx_byte_size / 1024
    );
}
