//! API credential pool for the external judge.
//!
//! Multiple keys rotate round-robin; a key that hits a rate limit is put
//! on a cooldown and skipped until the cooldown expires. With a single
//! key the pool degrades to "wait out the cooldown".

use crate::defaults;
use log::{info, warn};
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

struct KeyState {
    key: String,
    cooling_until: Option<Instant>,
    requests: u64,
    failures: u64,
}

pub struct KeyPool {
    inner: Mutex<PoolState>,
    cooldown: Duration,
}

struct PoolState {
    keys: Vec<KeyState>,
    cursor: usize,
}

impl KeyPool {
    /// Build a pool from explicit keys.
    pub fn new(keys: Vec<String>) -> Self {
        let keys = keys
            .into_iter()
            .map(|key| KeyState {
                key,
                cooling_until: None,
                requests: 0,
                failures: 0,
            })
            .collect();
        Self {
            inner: Mutex::new(PoolState { keys, cursor: 0 }),
            cooldown: Duration::from_secs(defaults::KEY_COOLDOWN_SECS),
        }
    }

    /// Load keys from the environment: `EXPOEVAL_API_KEY_1` … `_10`,
    /// falling back to a single `EXPOEVAL_API_KEY`.
    pub fn from_env() -> Self {
        let mut keys: Vec<String> = Vec::new();
        for i in 1..=10 {
            if let Ok(key) = std::env::var(format!("EXPOEVAL_API_KEY_{}", i)) {
                let key = key.trim().to_string();
                if !key.is_empty() && !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        if keys.is_empty() {
            if let Ok(key) = std::env::var("EXPOEVAL_API_KEY") {
                let key = key.trim().to_string();
                if !key.is_empty() {
                    keys.push(key);
                }
            }
        }

        if keys.is_empty() {
            warn!("no judge API keys configured");
        } else {
            info!("credential pool loaded with {} key(s)", keys.len());
        }
        Self::new(keys)
    }

    /// Process-wide pool, loaded from the environment on first use.
    pub fn shared() -> &'static KeyPool {
        static POOL: OnceLock<KeyPool> = OnceLock::new();
        POOL.get_or_init(KeyPool::from_env)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().map(|s| s.keys.is_empty()).unwrap_or(true)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|s| s.keys.len()).unwrap_or(0)
    }

    /// Next usable key, skipping keys still cooling down.
    ///
    /// Returns `None` when no keys are configured or all are cooling down.
    pub fn acquire(&self) -> Option<String> {
        let mut state = self.inner.lock().ok()?;
        let n = state.keys.len();
        if n == 0 {
            return None;
        }

        let now = Instant::now();
        for _ in 0..n {
            let i = state.cursor;
            state.cursor = (state.cursor + 1) % n;

            let entry = &mut state.keys[i];
            let cooling = entry.cooling_until.is_some_and(|until| until > now);
            if cooling {
                continue;
            }
            entry.cooling_until = None;
            entry.requests += 1;
            return Some(entry.key.clone());
        }

        warn!("all judge API keys are cooling down");
        None
    }

    /// Put a rate-limited key on cooldown.
    pub fn mark_rate_limited(&self, key: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let cooldown = self.cooldown;
            if let Some(entry) = state.keys.iter_mut().find(|k| k.key == key) {
                entry.cooling_until = Some(Instant::now() + cooldown);
                entry.failures += 1;
                warn!("judge API key put on {}s cooldown", cooldown.as_secs());
            }
        }
    }

    #[cfg(test)]
    fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(keys: &[&str]) -> KeyPool {
        KeyPool::new(keys.iter().map(|k| k.to_string()).collect())
    }

    #[test]
    fn empty_pool_yields_nothing() {
        let pool = pool(&[]);
        assert!(pool.is_empty());
        assert!(pool.acquire().is_none());
    }

    #[test]
    fn keys_rotate_round_robin() {
        let pool = pool(&["k1", "k2", "k3"]);
        assert_eq!(pool.acquire().as_deref(), Some("k1"));
        assert_eq!(pool.acquire().as_deref(), Some("k2"));
        assert_eq!(pool.acquire().as_deref(), Some("k3"));
        assert_eq!(pool.acquire().as_deref(), Some("k1"));
    }

    #[test]
    fn rate_limited_key_is_skipped() {
        let pool = pool(&["k1", "k2"]);
        pool.mark_rate_limited("k1");
        assert_eq!(pool.acquire().as_deref(), Some("k2"));
        assert_eq!(pool.acquire().as_deref(), Some("k2"));
    }

    #[test]
    fn all_keys_cooling_yields_nothing() {
        let pool = pool(&["k1", "k2"]);
        pool.mark_rate_limited("k1");
        pool.mark_rate_limited("k2");
        assert!(pool.acquire().is_none());
    }

    #[test]
    fn cooldown_expires() {
        let pool = pool(&["k1"]).with_cooldown(Duration::from_millis(10));
        pool.mark_rate_limited("k1");
        assert!(pool.acquire().is_none());
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(pool.acquire().as_deref(), Some("k1"));
    }

    #[test]
    fn unknown_key_mark_is_ignored() {
        let pool = pool(&["k1"]);
        pool.mark_rate_limited("other");
        assert_eq!(pool.acquire().as_deref(), Some("k1"));
    }
}
