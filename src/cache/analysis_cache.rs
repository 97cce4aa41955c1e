/// Depth-aware, single-flight cache for per-wallet base analysis snapshots.
///
/// A `computing` flag and a `depth` field sit alongside each entry: a
/// request for depth D is satisfied by any cached entry with
/// `depth_stored >= D` still within TTL. The first caller for a given
/// address runs the computation; concurrent callers wait on a `Notify` tied
/// to that address instead of recomputing.
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

#[derive(Debug, Clone)]
pub enum CacheStatus<T> {
    Ok(T),
    Computing,
    Miss,
}

struct Slot<T> {
    computing: bool,
    ts: Instant,
    depth: usize,
    data: Option<T>,
    notify: Arc<Notify>,
}

pub struct AnalysisCache<T: Clone> {
    entries: DashMap<String, Slot<T>>,
    ttl: Duration,
    max_wait: Duration,
    poll_interval: Duration,
}

impl<T: Clone> AnalysisCache<T> {
    pub fn new(ttl: Duration, max_wait: Duration) -> Self {
        AnalysisCache {
            entries: DashMap::new(),
            ttl,
            max_wait,
            poll_interval: Duration::from_millis(150),
        }
    }

    /// Non-blocking status check. Callers that get `Computing` should wait
    /// via `wait_for(address)` if they want to coalesce with the in-flight
    /// computation, or proceed to compute themselves after `wait_for` times
    /// out and returns `Miss`.
    pub fn get_status(&self, address: &str, depth_requested: usize) -> CacheStatus<T> {
        let Some(slot) = self.entries.get(address) else {
            return CacheStatus::Miss;
        };

        if slot.computing {
            return CacheStatus::Computing;
        }

        if slot.ts.elapsed() > self.ttl {
            return CacheStatus::Miss;
        }

        if slot.depth < depth_requested {
            return CacheStatus::Miss;
        }

        match &slot.data {
            Some(data) => CacheStatus::Ok(data.clone()),
            None => CacheStatus::Miss,
        }
    }

    /// Atomic check-and-claim: if a fresh, deep-enough entry exists, returns
    /// it. If another task already claimed the slot, returns `Computing`
    /// without touching it. Otherwise claims the slot for the calling task
    /// (marking it `computing`) in the same `DashMap` shard lock and returns
    /// `Miss` to mean "you won the claim, go compute". This is the only
    /// entry point that starts a computation, so exactly one caller per
    /// address ever sees a winning `Miss` at a time.
    pub fn try_claim(&self, address: &str, depth_requested: usize) -> CacheStatus<T> {
        match self.entries.entry(address.to_string()) {
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get();
                if slot.computing {
                    return CacheStatus::Computing;
                }
                if slot.ts.elapsed() <= self.ttl && slot.depth >= depth_requested {
                    if let Some(data) = &slot.data {
                        return CacheStatus::Ok(data.clone());
                    }
                }
                let notify = slot.notify.clone();
                occupied.insert(Slot {
                    computing: true,
                    ts: Instant::now(),
                    depth: 0,
                    data: None,
                    notify,
                });
                CacheStatus::Miss
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot {
                    computing: true,
                    ts: Instant::now(),
                    depth: 0,
                    data: None,
                    notify: Arc::new(Notify::new()),
                });
                CacheStatus::Miss
            }
        }
    }

    /// Store a freshly computed snapshot. Depth is monotonic: storing a
    /// shallower depth than what's already cached never downgrades it.
    pub fn store(&self, address: &str, data: T, depth: usize) {
        let notify = self
            .entries
            .get(address)
            .map(|s| s.notify.clone())
            .unwrap_or_else(|| Arc::new(Notify::new()));

        let existing_depth = self
            .entries
            .get(address)
            .and_then(|s| s.data.as_ref().map(|_| s.depth))
            .unwrap_or(0);

        self.entries.insert(
            address.to_string(),
            Slot {
                computing: false,
                ts: Instant::now(),
                depth: depth.max(existing_depth),
                data: Some(data),
                notify: notify.clone(),
            },
        );

        notify.notify_waiters();
    }

    /// Wait for an in-flight computation to finish, spin-polling at 150ms
    /// up to `max_wait`. Falls through to `Miss` on timeout so the caller
    /// can attempt the computation itself.
    pub async fn wait_for(&self, address: &str, depth_requested: usize) -> CacheStatus<T> {
        let deadline = Instant::now() + self.max_wait;

        loop {
            match self.get_status(address, depth_requested) {
                CacheStatus::Computing => {
                    if Instant::now() >= deadline {
                        return CacheStatus::Miss;
                    }
                    let notify = self.entries.get(address).map(|s| s.notify.clone());
                    match notify {
                        Some(n) => {
                            let _ = tokio::time::timeout(self.poll_interval, n.notified()).await;
                        }
                        None => tokio::time::sleep(self.poll_interval).await,
                    }
                }
                other => return other,
            }
        }
    }

    pub fn invalidate(&self, address: &str) {
        self.entries.remove(address);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_on_unknown_address() {
        let cache: AnalysisCache<u32> = AnalysisCache::new(Duration::from_secs(300), Duration::from_secs(1));
        matches!(cache.get_status("addr", 1), CacheStatus::Miss);
    }

    #[test]
    fn depth_upgrade_never_downgrades() {
        let cache: AnalysisCache<u32> = AnalysisCache::new(Duration::from_secs(300), Duration::from_secs(1));
        cache.store("addr", 10, 5);
        cache.store("addr", 20, 2);
        match cache.get_status("addr", 5) {
            CacheStatus::Ok(v) => assert_eq!(v, 20),
            _ => panic!("expected ok"),
        }
    }

    #[test]
    fn deeper_request_than_stored_is_miss() {
        let cache: AnalysisCache<u32> = AnalysisCache::new(Duration::from_secs(300), Duration::from_secs(1));
        cache.store("addr", 10, 1);
        matches!(cache.get_status("addr", 5), CacheStatus::Miss);
    }

    #[tokio::test]
    async fn only_one_concurrent_claimant_wins_miss() {
        let cache: Arc<AnalysisCache<u32>> =
            Arc::new(AnalysisCache::new(Duration::from_secs(300), Duration::from_secs(5)));

        let mut claimants = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            claimants.push(tokio::spawn(async move { cache.try_claim("addr", 1) }));
        }

        let mut miss_count = 0;
        let mut computing_count = 0;
        for claimant in claimants {
            match claimant.await.unwrap() {
                CacheStatus::Miss => miss_count += 1,
                CacheStatus::Computing => computing_count += 1,
                CacheStatus::Ok(_) => panic!("no entry was ever stored"),
            }
        }

        assert_eq!(miss_count, 1, "exactly one caller should win the claim");
        assert_eq!(computing_count, 15);
    }

    #[tokio::test]
    async fn computing_then_store_wakes_waiter() {
        let cache: Arc<AnalysisCache<u32>> =
            Arc::new(AnalysisCache::new(Duration::from_secs(300), Duration::from_secs(5)));
        matches!(cache.try_claim("addr", 1), CacheStatus::Miss);

        let waiter_cache = cache.clone();
        let waiter = tokio::spawn(async move { waiter_cache.wait_for("addr", 1).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.store("addr", 42, 1);

        match waiter.await.unwrap() {
            CacheStatus::Ok(v) => assert_eq!(v, 42),
            other => panic!("expected ok, got {other:?}"),
        }
    }
}
