//! Image loading with caching, in-flight de-duplication, bounded retries and
//! fallback images.
//!
//! A load never fails with an error: when every attempt is exhausted the
//! result carries `success: false`, the error text and a stand-in image, so
//! callers can keep drawing.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tpe_render::Image;

use crate::fallback;
use crate::source::ImageSource;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RETRIES: u32 = 2;
/// Largest retry count an engine config may ask for.
pub const MAX_RETRIES: u32 = 10;
/// Backoff before retry `n` is `n * RETRY_BACKOFF_STEP_MS` milliseconds.
pub const RETRY_BACKOFF_STEP_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// Per-attempt limit.
    pub timeout: Duration,
    /// Attempts after the first one.
    pub retries: u32,
    /// Image tried once when every attempt failed.
    pub fallback_image: Option<String>,
}

impl LoadOptions {
    pub fn new(timeout: Duration, retries: u32) -> Self {
        Self {
            timeout,
            retries,
            fallback_image: None,
        }
    }

    /// First attempt plus retries.
    pub fn total_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    pub fn with_fallback(mut self, path: impl Into<String>) -> Self {
        self.fallback_image = Some(path.into());
        self
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_RETRIES)
    }
}

#[derive(Debug, Clone)]
pub struct AssetLoadResult {
    pub success: bool,
    /// The requested image, or a fallback when `success` is false.
    pub asset: Image,
    pub error: Option<String>,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub paths: Vec<String>,
}

type PendingResult = watch::Receiver<Option<AssetLoadResult>>;

#[derive(Default)]
struct LoaderState {
    cache: BTreeMap<String, Image>,
    pending: HashMap<String, PendingResult>,
}

enum Claim {
    Cached(Image),
    Wait(PendingResult),
    Load(watch::Sender<Option<AssetLoadResult>>),
}

/// Removes the pending entry when the loading call finishes or is dropped.
/// Waiters then see either the published result or a closed channel.
struct PendingGuard {
    state: Arc<Mutex<LoaderState>>,
    path: String,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        lock(&self.state).pending.remove(&self.path);
    }
}

fn lock(state: &Mutex<LoaderState>) -> MutexGuard<'_, LoaderState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cloning shares the cache and in-flight map.
#[derive(Clone)]
pub struct AssetLoader {
    source: Arc<dyn ImageSource>,
    state: Arc<Mutex<LoaderState>>,
}

impl AssetLoader {
    pub fn new(source: Arc<dyn ImageSource>) -> Self {
        Self {
            source,
            state: Arc::new(Mutex::new(LoaderState::default())),
        }
    }

    pub async fn load_image(&self, path: &str, options: &LoadOptions) -> AssetLoadResult {
        loop {
            match self.claim(path) {
                Claim::Cached(asset) => {
                    log::debug!("Using cached image: {path}");
                    return AssetLoadResult {
                        success: true,
                        asset,
                        error: None,
                        path: path.to_string(),
                    };
                }
                Claim::Wait(mut pending) => {
                    log::debug!("Image already loading, waiting: {path}");
                    let published = match pending.wait_for(Option::is_some).await {
                        Ok(value) => (*value).clone(),
                        Err(_) => None,
                    };
                    if let Some(result) = published {
                        return result;
                    }
                    log::debug!("In-flight load of {path} was abandoned; retrying");
                }
                Claim::Load(publish) => {
                    let _guard = PendingGuard {
                        state: self.state.clone(),
                        path: path.to_string(),
                    };
                    let result = self.load_with_retry(path, options).await;
                    if result.success {
                        lock(&self.state)
                            .cache
                            .insert(path.to_string(), result.asset.clone());
                    }
                    publish.send_replace(Some(result.clone()));
                    return result;
                }
            }
        }
    }

    fn claim(&self, path: &str) -> Claim {
        let mut state = lock(&self.state);
        if let Some(image) = state.cache.get(path) {
            return Claim::Cached(image.clone());
        }
        if let Some(pending) = state.pending.get(path) {
            return Claim::Wait(pending.clone());
        }
        let (publish, pending) = watch::channel(None);
        state.pending.insert(path.to_string(), pending);
        Claim::Load(publish)
    }

    async fn load_with_retry(&self, path: &str, options: &LoadOptions) -> AssetLoadResult {
        let mut last_error = String::new();

        for attempt in 0..=options.retries {
            if attempt > 0 {
                log::warn!("Retry {}/{} for {}", attempt, options.retries, path);
                tokio::time::sleep(Duration::from_millis(
                    RETRY_BACKOFF_STEP_MS.saturating_mul(u64::from(attempt)),
                ))
                .await;
            }
            match self.fetch_once(path, options.timeout).await {
                Ok(asset) => {
                    if attempt > 0 {
                        log::info!("Loaded {} (attempt {})", path, attempt + 1);
                    } else {
                        log::info!("Loaded {}", path);
                    }
                    return AssetLoadResult {
                        success: true,
                        asset,
                        error: None,
                        path: path.to_string(),
                    };
                }
                Err(err) => {
                    log::warn!("Failed to load {} (attempt {}): {}", path, attempt + 1, err);
                    last_error = err;
                }
            }
        }

        log::error!(
            "Failed to load {} after {} attempts; using fallback",
            path,
            options.total_attempts()
        );

        if let Some(fallback_path) = &options.fallback_image {
            match self.fetch_once(fallback_path, options.timeout).await {
                Ok(asset) => {
                    return AssetLoadResult {
                        success: false,
                        asset,
                        error: Some(format!(
                            "Failed to load {path}: {last_error}. Using fallback."
                        )),
                        path: path.to_string(),
                    };
                }
                Err(err) => log::warn!("Fallback image {fallback_path} failed too: {err}"),
            }
        }

        AssetLoadResult {
            success: false,
            asset: fallback::missing_image(),
            error: Some(format!("Failed to load {path} and fallback: {last_error}")),
            path: path.to_string(),
        }
    }

    async fn fetch_once(&self, path: &str, timeout: Duration) -> Result<Image, String> {
        match tokio::time::timeout(timeout, self.source.fetch(path)).await {
            Ok(result) => result,
            Err(_) => Err(format!("Image load timeout after {}ms", timeout.as_millis())),
        }
    }

    /// Load every path concurrently. Results come back in input order.
    pub async fn preload_images(
        &self,
        paths: &[String],
        options: &LoadOptions,
    ) -> Vec<AssetLoadResult> {
        log::info!("Preloading {} images...", paths.len());

        let mut tasks = JoinSet::new();
        for (index, path) in paths.iter().enumerate() {
            let loader = self.clone();
            let path = path.clone();
            let options = options.clone();
            tasks.spawn(async move { (index, loader.load_image(&path, &options).await) });
        }

        let mut slots: Vec<Option<AssetLoadResult>> = vec![None; paths.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(err) => log::error!("Preload task failed: {err}"),
            }
        }

        let results: Vec<AssetLoadResult> = slots
            .into_iter()
            .zip(paths)
            .map(|(slot, path)| {
                slot.unwrap_or_else(|| AssetLoadResult {
                    success: false,
                    asset: fallback::missing_image(),
                    error: Some(format!("Preload of {path} did not complete")),
                    path: path.clone(),
                })
            })
            .collect();

        let loaded = results.iter().filter(|r| r.success).count();
        log::info!("Preloaded {}/{} images successfully", loaded, paths.len());
        results
    }

    pub fn clear_cache(&self) {
        lock(&self.state).cache.clear();
        log::info!("Asset cache cleared");
    }

    /// Cached paths in sorted order.
    pub fn cache_stats(&self) -> CacheStats {
        let state = lock(&self.state);
        CacheStats {
            size: state.cache.len(),
            paths: state.cache.keys().cloned().collect(),
        }
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.state).pending.len()
    }
}
