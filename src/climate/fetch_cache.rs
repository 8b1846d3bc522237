use crate::climate::error::ClimateDataError;
use crate::climate::point_fetcher::PointSource;
use crate::types::municipality::LatLon;
use crate::types::observation::PointReading;
use chrono::NaiveDate;
use log::debug;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// When a memoized point fetch may be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Reuse until explicitly invalidated.
    #[default]
    Session,
    /// Reuse while younger than the given age.
    MaxAge(Duration),
    /// Never memoize; every call reaches the inner source.
    Disabled,
}

struct CacheEntry {
    readings: Vec<PointReading>,
    stored_at: Instant,
}

/// Memoizes a [`PointSource`] by a hash of the call arguments.
///
/// Only successful fetches are stored. Entries are dropped by the
/// [`CachePolicy`], by [`CachedPointSource::invalidate`] or by
/// [`CachedPointSource::clear`].
pub struct CachedPointSource<S> {
    inner: S,
    policy: CachePolicy,
    entries: Mutex<HashMap<u64, CacheEntry>>,
}

impl<S: PointSource> CachedPointSource<S> {
    pub fn new(inner: S, policy: CachePolicy) -> Self {
        Self {
            inner,
            policy,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Drops the entry for these arguments. Returns whether one was present.
    pub async fn invalidate(&self, location: LatLon, start: NaiveDate, end: NaiveDate) -> bool {
        let key = cache_key(location, start, end);
        self.entries.lock().await.remove(&key).is_some()
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        match self.policy {
            CachePolicy::Session => true,
            CachePolicy::MaxAge(max_age) => entry.stored_at.elapsed() <= max_age,
            CachePolicy::Disabled => false,
        }
    }
}

impl<S: PointSource + Sync> PointSource for CachedPointSource<S> {
    async fn fetch_point(
        &self,
        location: LatLon,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PointReading>, ClimateDataError> {
        if self.policy == CachePolicy::Disabled {
            return self.inner.fetch_point(location, start, end).await;
        }
        let key = cache_key(location, start, end);

        // Lock is released before the fetch so a slow request doesn't block other lookups.
        {
            let mut entries = self.entries.lock().await;
            if let Some(entry) = entries.get(&key) {
                if self.is_fresh(entry) {
                    debug!("Fetch cache hit for key {:016x}", key);
                    return Ok(entry.readings.clone());
                }
                debug!("Fetch cache entry {:016x} expired", key);
            }
            entries.remove(&key);
        }

        let readings = self.inner.fetch_point(location, start, end).await?;

        self.entries.lock().await.insert(
            key,
            CacheEntry {
                readings: readings.clone(),
                stored_at: Instant::now(),
            },
        );
        Ok(readings)
    }
}

fn cache_key(location: LatLon, start: NaiveDate, end: NaiveDate) -> u64 {
    let mut hasher = DefaultHasher::new();
    location.latitude().to_bits().hash(&mut hasher);
    location.longitude().to_bits().hash(&mut hasher);
    start.hash(&mut hasher);
    end.hash(&mut hasher);
    hasher.finish()
}
