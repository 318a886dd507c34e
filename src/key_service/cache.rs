use crate::error::{lock_poison_error, Error};
use crate::jwks::{jwks_from_slice_with_report, JsonWebKeySet};
use log::{debug, warn};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};
use url::Url;

use super::fetcher::{redact_uri, HttpKeySetFetcher, RemoteKeySetFetcher};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

/// Where a key set comes from: endpoint url plus optional tenant context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeySource {
    pub url: Url,
    pub tenant: Option<String>,
}

impl KeySource {
    pub fn new(url: Url, tenant: Option<&str>) -> Self {
        Self {
            url,
            tenant: tenant.map(str::to_string),
        }
    }
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tenant {
            Some(tenant) => write!(f, "{} (tenant {tenant})", redact_uri(&self.url)),
            None => f.write_str(&redact_uri(&self.url)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FetchSource {
    Cache,
    Remote,
}

#[derive(Debug, Clone)]
struct CachedKeySet {
    keys: Arc<JsonWebKeySet>,
    fetched_at: Instant,
    expires_at: Instant,
}

type FetchLocks = Mutex<HashMap<KeySource, Arc<Mutex<()>>>>;

/// Time-bounded cache of key sets keyed by [`KeySource`].
///
/// Concurrent misses for one source share a single remote fetch. Failed
/// fetches are not cached, and an expired entry is never served.
pub struct KeyRetrievalCache {
    fetcher: Arc<dyn RemoteKeySetFetcher>,
    cache_ttl: Duration,
    min_refresh_interval: Duration,
    max_entries: usize,
    entries: RwLock<HashMap<KeySource, CachedKeySet>>,
    fetch_locks: FetchLocks,
}

impl KeyRetrievalCache {
    pub fn new(fetcher: Arc<dyn RemoteKeySetFetcher>) -> Self {
        Self {
            fetcher,
            cache_ttl: DEFAULT_CACHE_TTL,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            max_entries: DEFAULT_MAX_ENTRIES,
            entries: RwLock::new(HashMap::new()),
            fetch_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_http() -> Result<Self, Error> {
        Ok(Self::new(Arc::new(HttpKeySetFetcher::new()?)))
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        if let Ok(entries) = self.entries.get_mut() {
            for cached in entries.values_mut() {
                cached.expires_at = cached.fetched_at + ttl;
            }
        }
        self
    }

    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_preloaded(mut self, source: KeySource, keys: JsonWebKeySet) -> Self {
        let now = Instant::now();
        let cached = CachedKeySet {
            keys: Arc::new(keys),
            fetched_at: now,
            expires_at: now + self.cache_ttl,
        };
        if let Ok(entries) = self.entries.get_mut() {
            entries.insert(source, cached);
            enforce_cache_limit(entries, self.max_entries);
        }
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) -> Result<(), Error> {
        self.entries
            .write()
            .map_err(|_| lock_poison_error("key set cache"))?
            .clear();
        Ok(())
    }

    /// Returns the cached key set for `source`, fetching it when absent or expired.
    pub fn get_key_set(&self, source: &KeySource) -> Result<Arc<JsonWebKeySet>, Error> {
        let (keys, _source) = self.get_key_set_with_source(source)?;
        Ok(keys)
    }

    pub(crate) fn get_key_set_with_source(
        &self,
        source: &KeySource,
    ) -> Result<(Arc<JsonWebKeySet>, FetchSource), Error> {
        if let Some(keys) = self.cached(source, |cached| cached.expires_at > Instant::now())? {
            return Ok((keys, FetchSource::Cache));
        }
        let keys = self.with_fetch_lock(source, || {
            if let Some(keys) = self.cached(source, |cached| cached.expires_at > Instant::now())? {
                return Ok((keys, FetchSource::Cache));
            }
            Ok((self.fetch_remote(source)?, FetchSource::Remote))
        })?;
        Ok(keys)
    }

    /// Fetches `source` again unless it was fetched within the minimum
    /// refresh interval, in which case the cached set is returned.
    pub fn refresh(&self, source: &KeySource) -> Result<Arc<JsonWebKeySet>, Error> {
        let requested_at = Instant::now();
        let recent = |cached: &CachedKeySet| {
            cached.fetched_at + self.min_refresh_interval > requested_at
                && cached.expires_at > Instant::now()
        };
        if let Some(keys) = self.cached(source, recent)? {
            debug!("key set refresh for {source} rate limited");
            return Ok(keys);
        }
        self.with_fetch_lock(source, || {
            if let Some(keys) = self.cached(source, recent)? {
                return Ok(keys);
            }
            self.fetch_remote(source)
        })
    }

    fn cached(
        &self,
        source: &KeySource,
        usable: impl Fn(&CachedKeySet) -> bool,
    ) -> Result<Option<Arc<JsonWebKeySet>>, Error> {
        let entries = self
            .entries
            .read()
            .map_err(|_| lock_poison_error("key set cache"))?;
        Ok(entries
            .get(source)
            .filter(|cached| usable(cached))
            .map(|cached| cached.keys.clone()))
    }

    fn with_fetch_lock<T>(
        &self,
        source: &KeySource,
        fetch: impl FnOnce() -> Result<T, Error>,
    ) -> Result<T, Error> {
        let fetch_lock = {
            let mut locks = self
                .fetch_locks
                .lock()
                .map_err(|_| lock_poison_error("key set fetch lock map"))?;
            locks
                .entry(source.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        // Guards no data; a fetch that panicked leaves nothing to repair.
        let result = {
            let _guard = fetch_lock.lock().unwrap_or_else(PoisonError::into_inner);
            fetch()
        };

        let mut locks = self
            .fetch_locks
            .lock()
            .map_err(|_| lock_poison_error("key set fetch lock map"))?;
        if let Some(existing) = locks.get(source) {
            if Arc::ptr_eq(existing, &fetch_lock) && Arc::strong_count(existing) == 2 {
                locks.remove(source);
            }
        }
        result
    }

    fn fetch_remote(&self, source: &KeySource) -> Result<Arc<JsonWebKeySet>, Error> {
        debug!("fetching json web keys from {source}");
        let body = self
            .fetcher
            .fetch(&source.url, source.tenant.as_deref())
            .map_err(|err| key_retrieval_error(source, err))?;
        let report =
            jwks_from_slice_with_report(&body).map_err(|err| key_retrieval_error(source, err))?;
        if report.keys.is_empty() {
            warn!("key set from {source} contains no usable keys");
        }

        let keys = Arc::new(report.keys);
        let now = Instant::now();
        let cached = CachedKeySet {
            keys: keys.clone(),
            fetched_at: now,
            expires_at: now + self.cache_ttl,
        };
        let mut entries = self
            .entries
            .write()
            .map_err(|_| lock_poison_error("key set cache"))?;
        entries.insert(source.clone(), cached);
        enforce_cache_limit(&mut entries, self.max_entries);
        Ok(keys)
    }
}

impl fmt::Debug for KeyRetrievalCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRetrievalCache")
            .field("cache_ttl", &self.cache_ttl)
            .field("min_refresh_interval", &self.min_refresh_interval)
            .field("max_entries", &self.max_entries)
            .field("entries", &self.len())
            .finish()
    }
}

fn key_retrieval_error(source: &KeySource, err: Error) -> Error {
    warn!("json web key retrieval from {source} failed: {err}");
    match err {
        Error::KeyRetrieval { .. } => err,
        other => Error::KeyRetrieval {
            url: redact_uri(&source.url),
            message: other.to_string(),
        },
    }
}

fn enforce_cache_limit(cache: &mut HashMap<KeySource, CachedKeySet>, max_entries: usize) {
    if max_entries == 0 {
        cache.clear();
        return;
    }
    while cache.len() > max_entries {
        if let Some(oldest) = cache
            .iter()
            .min_by_key(|(_, entry)| entry.fetched_at)
            .map(|(key, _)| key.clone())
        {
            cache.remove(&oldest);
        } else {
            break;
        }
    }
}
