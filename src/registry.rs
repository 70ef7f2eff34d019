//! Dynamic parser registry.
//!
//! Caches the control-plane catalog with a TTL, collapses concurrent
//! refreshes into a single fetch, and falls back to the static catalog so
//! callers always see a usable parser list. Per-parser options are cached
//! independently from a second endpoint under the same discipline.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;

use crate::api::{ApiClient, DefaultOptions, ParserOptions};
use crate::catalog::{self, ParserDescriptor};

/// Default cache TTL: 5 minutes.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub cache_ttl: Duration,
    /// When false the registry serves the static catalog only and never
    /// touches the network.
    pub enable_dynamic: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            enable_dynamic: true,
        }
    }
}

type ParsersFetch = Shared<BoxFuture<'static, Arc<Vec<ParserDescriptor>>>>;
type OptionsFetch = Shared<BoxFuture<'static, ()>>;

struct RegistryState {
    parsers: Arc<Vec<ParserDescriptor>>,
    options: HashMap<String, ParserOptions>,
    defaults: DefaultOptions,
    last_fetch: Option<Instant>,
    last_options_fetch: Option<Instant>,
    initialized: bool,
}

struct RegistryInner {
    config: RegistryConfig,
    api: ApiClient,
    state: Mutex<RegistryState>,
    // Single-slot in-flight fetches: concurrent callers attach to the
    // existing shared future instead of issuing a duplicate request. Each
    // slot entry carries a generation tag so a fetch displaced by
    // `refresh()` cannot clear the newer flight when it completes.
    parsers_flight: Mutex<Option<(u64, ParsersFetch)>>,
    options_flight: Mutex<Option<(u64, OptionsFetch)>>,
    flight_generation: AtomicU64,
}

/// Handle to the registry. Cheap to clone; all clones share one cache.
#[derive(Clone)]
pub struct ParserRegistry {
    inner: Arc<RegistryInner>,
}

impl ParserRegistry {
    pub fn new(api: ApiClient, config: RegistryConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                config,
                api,
                state: Mutex::new(RegistryState {
                    parsers: Arc::new(Vec::new()),
                    options: HashMap::new(),
                    defaults: DefaultOptions::default(),
                    last_fetch: None,
                    last_options_fetch: None,
                    initialized: false,
                }),
                parsers_flight: Mutex::new(None),
                options_flight: Mutex::new(None),
                flight_generation: AtomicU64::new(0),
            }),
        }
    }

    /// Current parser collection: static catalog in static mode, a fresh
    /// cache hit, an attach to an in-flight fetch, or a new fetch. Never
    /// fails - fetch errors degrade to the last good snapshot or the static
    /// catalog.
    pub async fn get_parsers(&self) -> Arc<Vec<ParserDescriptor>> {
        if !self.inner.config.enable_dynamic {
            return catalog::static_parsers();
        }

        if let Some(snapshot) = self.inner.fresh_snapshot() {
            return snapshot;
        }

        let fetch = {
            let mut flight = self.inner.parsers_flight.lock();
            match flight.as_ref() {
                Some((_, existing)) => existing.clone(),
                None => {
                    let generation = self.inner.next_generation();
                    let inner = Arc::clone(&self.inner);
                    let fut = async move {
                        let snapshot = inner.fetch_parsers().await;
                        // Clear only this fetch's slot entry; the slot may
                        // already hold a newer fetch started by `refresh()`.
                        let mut flight = inner.parsers_flight.lock();
                        if flight.as_ref().is_some_and(|(g, _)| *g == generation) {
                            *flight = None;
                        }
                        snapshot
                    }
                    .boxed()
                    .shared();
                    *flight = Some((generation, fut.clone()));
                    fut
                }
            }
        };

        fetch.await
    }

    pub async fn get_parser_by_id(&self, id: &str) -> Option<ParserDescriptor> {
        self.get_parsers().await.iter().find(|p| p.id == id).cloned()
    }

    pub async fn get_parser_by_remote_name(&self, name: &str) -> Option<ParserDescriptor> {
        self.get_parsers()
            .await
            .iter()
            .find(|p| p.remote_name == name)
            .cloned()
    }

    pub async fn get_parsers_by_category(&self, category: &str) -> Vec<ParserDescriptor> {
        self.get_parsers()
            .await
            .iter()
            .filter(|p| p.category == category)
            .cloned()
            .collect()
    }

    /// Category values in first-seen order, deduplicated.
    pub async fn get_categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = Vec::new();
        for p in self.get_parsers().await.iter() {
            if !categories.contains(&p.category) {
                categories.push(p.category.clone());
            }
        }
        categories
    }

    /// Force the next `get_parsers` to bypass the TTL and any in-flight
    /// dedup, then perform it.
    pub async fn refresh(&self) -> Arc<Vec<ParserDescriptor>> {
        {
            let mut state = self.inner.state.lock();
            state.last_fetch = None;
        }
        *self.inner.parsers_flight.lock() = None;
        self.get_parsers().await
    }

    /// Options for one parser. Missing overrides degrade to the defaults
    /// merged with the requested id and `enabled = true`; the key lookup is
    /// case-insensitive.
    pub async fn get_parser_options(&self, parser_id: &str) -> ParserOptions {
        self.ensure_options_fresh().await;
        let state = self.inner.state.lock();
        state
            .options
            .get(&parser_id.to_lowercase())
            .cloned()
            .unwrap_or_else(|| state.defaults.for_parser(parser_id))
    }

    pub async fn get_parser_timeout(&self, parser_id: &str) -> u64 {
        self.get_parser_options(parser_id).await.timeout
    }

    pub async fn is_parser_enabled(&self, parser_id: &str) -> bool {
        self.get_parser_options(parser_id).await.enabled
    }

    async fn ensure_options_fresh(&self) {
        if !self.inner.config.enable_dynamic {
            return;
        }

        {
            let state = self.inner.state.lock();
            if let Some(stamped) = state.last_options_fetch
                && stamped.elapsed() < self.inner.config.cache_ttl
            {
                return;
            }
        }

        let fetch = {
            let mut flight = self.inner.options_flight.lock();
            match flight.as_ref() {
                Some((_, existing)) => existing.clone(),
                None => {
                    let generation = self.inner.next_generation();
                    let inner = Arc::clone(&self.inner);
                    let fut = async move {
                        inner.fetch_options().await;
                        let mut flight = inner.options_flight.lock();
                        if flight.as_ref().is_some_and(|(g, _)| *g == generation) {
                            *flight = None;
                        }
                    }
                    .boxed()
                    .shared();
                    *flight = Some((generation, fut.clone()));
                    fut
                }
            }
        };

        fetch.await;
    }
}

impl RegistryInner {
    fn next_generation(&self) -> u64 {
        self.flight_generation.fetch_add(1, Ordering::Relaxed)
    }

    /// Cached snapshot, when initialized and younger than the TTL.
    fn fresh_snapshot(&self) -> Option<Arc<Vec<ParserDescriptor>>> {
        let state = self.state.lock();
        let stamped = state.last_fetch?;
        (state.initialized && stamped.elapsed() < self.config.cache_ttl)
            .then(|| Arc::clone(&state.parsers))
    }

    async fn fetch_parsers(&self) -> Arc<Vec<ParserDescriptor>> {
        log::debug!("Fetching parser catalog from control-plane");

        match self.api.fetch_parsers().await {
            Ok(response) => {
                let parsers: Vec<ParserDescriptor> = response
                    .parsers
                    .into_iter()
                    .filter(|p| p.enabled != Some(false))
                    .map(ParserDescriptor::from)
                    .collect();
                let snapshot = Arc::new(parsers);

                let mut state = self.state.lock();
                state.parsers = Arc::clone(&snapshot);
                state.last_fetch = Some(Instant::now());
                state.initialized = true;

                log::info!("Loaded {} parsers from control-plane", snapshot.len());
                snapshot
            }
            Err(err) => {
                log::error!("Failed to fetch parsers: {err}");

                // A transient failure must not erase previously known
                // capabilities. Note: the fetch time is left unstamped so
                // the next call retries.
                let mut state = self.state.lock();
                if !state.initialized {
                    state.parsers = catalog::static_parsers();
                    state.initialized = true;
                    log::info!("Falling back to {} static parsers", state.parsers.len());
                }
                Arc::clone(&state.parsers)
            }
        }
    }

    async fn fetch_options(&self) {
        log::debug!("Fetching parser options from control-plane");

        match self.api.fetch_options().await {
            Ok(response) => {
                let mut state = self.state.lock();
                if let Some(defaults) = response.defaults {
                    state.defaults = defaults;
                }
                if let Some(overrides) = response.overrides {
                    for (parser_id, options) in overrides {
                        state.options.insert(parser_id.to_lowercase(), options);
                    }
                }
                state.last_options_fetch = Some(Instant::now());
                log::debug!("Loaded options for {} parsers", state.options.len());
            }
            Err(err) => {
                // Options are an optimization; keep whatever is cached.
                log::debug!("Failed to fetch parser options: {err}");
            }
        }
    }
}
