// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The record store backing every answer.
//!
//! Every [Record] carries the instant it expires at, and [Cache::get] treats an expired record
//! as missing. Nothing sweeps expired records: they are replaced on the next full refresh
//! performed by a [Refresher].

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::{Duration, Instant},
};

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use waypoint_parser::QType;

// Far enough to never be reached, small enough to never overflow an Instant.
const MAX_TTL: Duration = Duration::from_secs(u32::MAX as u64);

/// The full contents of a [Cache].
pub type Records = HashMap<CacheKey, Record>;

/// Identifies a record by type and domain.
///
/// The domain is compared without regard to ASCII case and with one trailing dot removed, so
/// `Example.COM.` and `example.com` are the same key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    qtype: QType,
    domain: String,
}

impl CacheKey {
    /// Key for the record of type `qtype` at `domain`.
    pub fn new(domain: &str, qtype: QType) -> Self {
        let domain = domain.strip_suffix('.').unwrap_or(domain);
        CacheKey {
            qtype,
            domain: domain.to_ascii_lowercase(),
        }
    }

    /// The normalized domain.
    #[inline]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The record type.
    #[inline]
    pub fn qtype(&self) -> QType {
        self.qtype
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", u16::from(self.qtype), self.domain)
    }
}

/// A record value in the form it takes on the wire, with its expiration.
///
/// The value is shared, cloning a record never copies its bytes and nobody can modify them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    value: Arc<[u8]>,
    expires_at: Instant,
}

impl Record {
    /// A record that lives for `ttl` from now.
    pub fn new(value: impl Into<Arc<[u8]>>, ttl: Duration) -> Self {
        Record::with_expiration(value, Instant::now() + ttl.min(MAX_TTL))
    }

    /// A record that expires at `expires_at`.
    #[inline]
    pub fn with_expiration(value: impl Into<Arc<[u8]>>, expires_at: Instant) -> Self {
        Record {
            value: value.into(),
            expires_at,
        }
    }

    /// The wire ready value.
    #[inline]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// The instant from which the record is no longer served.
    #[inline]
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Time left before the record expires, zero once it has.
    #[inline]
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// `true` if the record has expired by `now`.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// A concurrent map from [CacheKey] to [Record].
///
/// Lookups share a read lock, [Cache::set] and [Cache::update] take the write lock only for the
/// insertion or the swap.
#[derive(Debug, Default)]
pub struct Cache {
    records: RwLock<Records>,
}

impl Cache {
    /// An empty cache.
    pub fn new() -> Self {
        Cache::default()
    }

    /// Insert or overwrite the record of type `qtype` at `domain`.
    pub fn set(&self, domain: &str, qtype: QType, value: impl Into<Arc<[u8]>>, ttl: Duration) {
        let key = CacheKey::new(domain, qtype);
        let record = Record::new(value, ttl);
        self.write().insert(key, record);
    }

    /// The record of type `qtype` at `domain`, unless it is missing or expired.
    pub fn get(&self, domain: &str, qtype: QType) -> Option<Record> {
        let key = CacheKey::new(domain, qtype);
        let now = Instant::now();
        self.read()
            .get(&key)
            .filter(|record| !record.is_expired_at(now))
            .cloned()
    }

    /// Replace every record at once with `records`.
    pub fn update(&self, records: Records) {
        let old = std::mem::replace(&mut *self.write(), records);
        // the old map is freed after the lock is released
        drop(old);
    }

    /// Number of records stored, expired ones included.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panic while holding the lock cannot leave the map half updated, every write is a
    // single insertion or swap.
    fn read(&self) -> RwLockReadGuard<'_, Records> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Records> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Produces the full set of records, for example by reading them from a file.
///
/// Loading is blocking and runs outside of the async runtime workers.
pub trait RecordSource: Send + Sync + 'static {
    /// Why a load failed.
    type Error: std::error::Error + Send + 'static;

    /// Load every record.
    fn load(&self) -> Result<Records, Self::Error>;
}

/// Load `source` once and replace the contents of `cache` with the result.
///
/// On failure the error is logged, the cache keeps its current records and `false` is
/// returned.
pub async fn refresh<S: RecordSource>(cache: &Cache, source: &Arc<S>) -> bool {
    let loader = Arc::clone(source);
    match tokio::task::spawn_blocking(move || loader.load()).await {
        Ok(Ok(records)) => {
            let count = records.len();
            cache.update(records);
            info!(records = count, "cache refreshed");
            true
        }
        Ok(Err(e)) => {
            error!(error = %e, "cache refresh failed, keeping current records");
            false
        }
        Err(e) => {
            error!(error = %e, "cache refresh task failed, keeping current records");
            false
        }
    }
}

/// A background task that refreshes a [Cache] from a [RecordSource] at a fixed interval.
///
/// The first refresh happens one interval after the task starts.
#[derive(Debug)]
pub struct Refresher {
    shutdown: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Refresher {
    /// Start refreshing `cache` from `source` every `every`.
    ///
    /// Must be called from within a tokio runtime. An `every` of zero is raised to one
    /// millisecond.
    pub fn spawn<S: RecordSource>(cache: Arc<Cache>, source: Arc<S>, every: Duration) -> Self {
        let every = every.max(Duration::from_millis(1));
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + every;
            let mut interval = tokio::time::interval_at(start, every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        debug!("refreshing cache");
                        refresh(&cache, &source).await;
                    }
                }
            }
            info!("cache refresher stopped");
        });
        Refresher {
            shutdown,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Ask the task to exit. Calling it again does nothing.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Stop the task and wait until it has exited.
    pub async fn join(&self) {
        self.stop();
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "cache refresher panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn set_then_get() {
        let cache = Cache::new();
        cache.set("example.com", QType::A, [127, 0, 0, 1], Duration::from_secs(300));

        let record = cache.get("example.com", QType::A).unwrap();
        assert_eq!(record.value(), &[127, 0, 0, 1]);
        assert!(record.ttl_remaining() > Duration::from_secs(299));
    }

    #[test]
    fn missing_records() {
        let cache = Cache::new();
        cache.set("example.com", QType::A, [127, 0, 0, 1], Duration::from_secs(300));

        assert_eq!(cache.get("example.org", QType::A), None);
        assert_eq!(cache.get("example.com", QType::Txt), None);
    }

    #[test]
    fn type_and_domain_are_both_part_of_the_key() {
        let cache = Cache::new();
        cache.set("svc", QType::A, [10, 0, 0, 1], Duration::from_secs(60));
        cache.set("svc", QType::Txt, &b"v=1"[..], Duration::from_secs(60));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("svc", QType::A).unwrap().value(), &[10, 0, 0, 1]);
        assert_eq!(cache.get("svc", QType::Txt).unwrap().value(), b"v=1");
    }

    #[test]
    fn set_overwrites() {
        let cache = Cache::new();
        cache.set("svc", QType::A, [10, 0, 0, 1], Duration::from_secs(60));
        cache.set("svc", QType::A, [10, 0, 0, 2], Duration::from_secs(60));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("svc", QType::A).unwrap().value(), &[10, 0, 0, 2]);
    }

    #[test]
    fn domains_are_normalized() {
        let cache = Cache::new();
        cache.set("Example.COM.", QType::A, [127, 0, 0, 1], Duration::from_secs(60));

        assert!(cache.get("example.com", QType::A).is_some());
        assert!(cache.get("EXAMPLE.com.", QType::A).is_some());
        let key = CacheKey::new("Example.COM.", QType::A);
        assert_eq!(key.domain(), "example.com");
        assert_eq!(key.qtype(), QType::A);
        assert_eq!(key.to_string(), "1.example.com");
    }

    #[test]
    fn expired_records_are_missing() {
        let cache = Cache::new();
        cache.set("gone", QType::A, [127, 0, 0, 1], Duration::ZERO);
        cache.set("soon", QType::A, [127, 0, 0, 1], Duration::from_millis(20));

        assert_eq!(cache.get("gone", QType::A), None);
        assert!(cache.get("soon", QType::A).is_some());
        thread::sleep(Duration::from_millis(50));
        assert_eq!(cache.get("soon", QType::A), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn huge_ttl_does_not_overflow() {
        let record = Record::new([1, 2, 3, 4], Duration::MAX);
        assert!(!record.is_expired_at(Instant::now()));
        assert!(record.expires_at() > Instant::now() + Duration::from_secs(u32::MAX as u64 - 1));
    }

    #[test]
    fn update_replaces_everything() {
        let cache = Cache::new();
        cache.set("old", QType::A, [127, 0, 0, 1], Duration::from_secs(60));

        let mut records = Records::new();
        records.insert(
            CacheKey::new("new", QType::A),
            Record::new([127, 0, 0, 2], Duration::from_secs(60)),
        );
        cache.update(records);

        assert_eq!(cache.get("old", QType::A), None);
        assert_eq!(cache.get("new", QType::A).unwrap().value(), &[127, 0, 0, 2]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn concurrent_access() {
        let cache = Arc::new(Cache::new());
        let values: Vec<[u8; 16]> = (0..8u8).map(|n| [n; 16]).collect();

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let cache = Arc::clone(&cache);
                let values = values.clone();
                thread::spawn(move || {
                    for i in 0..500 {
                        let value = values[(n + i) % values.len()];
                        match i % 3 {
                            0 => cache.set("shared", QType::Aaaa, value, Duration::from_secs(60)),
                            1 => {
                                let mut records = Records::new();
                                records.insert(
                                    CacheKey::new("shared", QType::Aaaa),
                                    Record::new(value, Duration::from_secs(60)),
                                );
                                cache.update(records);
                            }
                            _ => {
                                if let Some(record) = cache.get("shared", QType::Aaaa) {
                                    let first = record.value()[0];
                                    assert!(record.value().iter().all(|&b| b == first));
                                }
                            }
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 1);
    }

    #[derive(Debug, thiserror::Error)]
    #[error("source unavailable")]
    struct Unavailable;

    struct Flaky {
        loads: AtomicUsize,
    }

    impl RecordSource for Flaky {
        type Error = Unavailable;

        // Every other load fails.
        fn load(&self) -> Result<Records, Self::Error> {
            let n = self.loads.fetch_add(1, Ordering::SeqCst);
            if n % 2 == 1 {
                return Err(Unavailable);
            }
            let mut records = Records::new();
            records.insert(
                CacheKey::new(&format!("gen{n}"), QType::A),
                Record::new([127, 0, 0, 1], Duration::from_secs(60)),
            );
            Ok(records)
        }
    }

    #[tokio::test]
    async fn failed_refresh_keeps_records() {
        let cache = Cache::new();
        let source = Arc::new(Flaky {
            loads: AtomicUsize::new(0),
        });

        assert!(refresh(&cache, &source).await);
        assert!(cache.get("gen0", QType::A).is_some());

        assert!(!refresh(&cache, &source).await);
        assert!(cache.get("gen0", QType::A).is_some());

        assert!(refresh(&cache, &source).await);
        assert!(cache.get("gen0", QType::A).is_none());
        assert!(cache.get("gen2", QType::A).is_some());
    }

    #[tokio::test]
    async fn refresher_runs_until_stopped() {
        let cache = Arc::new(Cache::new());
        let source = Arc::new(Flaky {
            loads: AtomicUsize::new(0),
        });
        let refresher = Refresher::spawn(
            Arc::clone(&cache),
            Arc::clone(&source),
            Duration::from_millis(10),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        refresher.stop();
        refresher.stop();
        refresher.join().await;

        let loads = source.loads.load(Ordering::SeqCst);
        assert!(loads >= 2);
        assert_eq!(cache.len(), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(source.loads.load(Ordering::SeqCst), loads);
    }
}
