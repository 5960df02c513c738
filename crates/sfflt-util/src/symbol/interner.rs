//! Global, thread-safe string interner backing [`super::Symbol`].

use ahash::AHasher;
use dashmap::DashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::LazyLock;

/// Indices below this are reserved for [`super::Symbol`]'s keyword
/// constants, pre-interned at first use of the table.
pub const RESERVED_SYMBOLS_END: u32 = 64;

const MAX_PROBES: u64 = 32;
/// Odd multiplier (fractional part of the golden ratio, scaled to 64
/// bits) used to perturb the probe sequence on a hash collision.
const PROBE_PRIME: u64 = 0x9e3779b97f4a7c15;

pub static STRING_TABLE: LazyLock<StringTable> = LazyLock::new(StringTable::new);

/// Maps strings to `u32` indices and back. Strings are leaked to get a
/// `'static` lifetime, which is fine for a compiler process: the set of
/// distinct identifiers in one source file is small and never freed
/// before exit anyway.
pub struct StringTable {
    map: DashMap<u64, (&'static str, u32)>,
    next_index: AtomicU32,
    collisions: AtomicUsize,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

/// Snapshot of interner activity, exposed for diagnostics/tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InternerStats {
    pub count: u32,
    pub collisions: usize,
    pub hits: usize,
    pub misses: usize,
}

impl InternerStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn total_operations(&self) -> usize {
        self.hits + self.misses
    }
}

impl StringTable {
    fn new() -> Self {
        let table = Self {
            map: DashMap::new(),
            next_index: AtomicU32::new(0),
            collisions: AtomicUsize::new(0),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        };
        table.initialize_known_symbols();
        table
    }

    fn initialize_known_symbols(&self) {
        for kw in super::KNOWN_SYMBOLS {
            self.intern(kw);
        }
    }

    fn hash_string(s: &str) -> u64 {
        let mut hasher = AHasher::default();
        s.hash(&mut hasher);
        hasher.finish()
    }

    /// Linear probe on collision: the stored hash keeps the *original*
    /// string's slot, so a colliding string is assigned a perturbed key
    /// instead of evicting it. `get()` below doesn't need to know about
    /// this — it scans by index, not by hash.
    fn handle_collision(&self, mut hash: u64, s: &str) -> u64 {
        for _ in 0..MAX_PROBES {
            hash = hash.wrapping_add(PROBE_PRIME);
            match self.map.get(&hash) {
                Some(entry) if entry.0 == s => return hash,
                Some(_) => continue,
                None => return hash,
            }
        }
        // Give up probing and let the map's entry API overwrite; astronomically
        // unlikely with a 64-bit hash and MAX_PROBES=32.
        hash
    }

    pub fn intern(&self, s: &str) -> u32 {
        let hash = Self::hash_string(s);

        if let Some(entry) = self.map.get(&hash) {
            if entry.0 == s {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return entry.1;
            }
            self.collisions.fetch_add(1, Ordering::Relaxed);
            let resolved = self.handle_collision(hash, s);
            if let Some(entry) = self.map.get(&resolved) {
                if entry.0 == s {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return entry.1;
                }
            }
            self.misses.fetch_add(1, Ordering::Relaxed);
            let leaked: &'static str = Box::leak(s.to_string().into_boxed_str());
            let index = self.next_index.fetch_add(1, Ordering::Relaxed);
            self.map.insert(resolved, (leaked, index));
            return index;
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let leaked: &'static str = Box::leak(s.to_string().into_boxed_str());
        let index = self.next_index.fetch_add(1, Ordering::Relaxed);
        self.map.insert(hash, (leaked, index));
        index
    }

    /// O(n) over the interned set; acceptable here since it's only used
    /// for `Symbol::as_str`/`Display`, never in a hot loop.
    pub fn get(&self, index: u32) -> Option<&'static str> {
        self.map
            .iter()
            .find(|entry| entry.value().1 == index)
            .map(|entry| entry.value().0)
    }

    pub fn stats(&self) -> InternerStats {
        InternerStats {
            count: self.next_index.load(Ordering::Relaxed),
            collisions: self.collisions.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    #[cfg(test)]
    pub fn reset_stats(&self) {
        self.collisions.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_same_string_returns_same_index() {
        let table = StringTable::new();
        let a = table.intern("alpha_unique_1");
        let b = table.intern("alpha_unique_1");
        assert_eq!(a, b);
    }

    #[test]
    fn intern_different_strings_returns_different_indices() {
        let table = StringTable::new();
        let a = table.intern("beta_unique_1");
        let b = table.intern("beta_unique_2");
        assert_ne!(a, b);
    }

    #[test]
    fn get_returns_original_string() {
        let table = StringTable::new();
        let idx = table.intern("gamma_unique_1");
        assert_eq!(table.get(idx), Some("gamma_unique_1"));
    }

    #[test]
    fn get_unknown_index_is_none() {
        let table = StringTable::new();
        assert_eq!(table.get(u32::MAX), None);
    }

    #[test]
    fn empty_string_interns_fine() {
        let table = StringTable::new();
        let idx = table.intern("");
        assert_eq!(table.get(idx), Some(""));
    }

    #[test]
    fn unicode_strings_roundtrip() {
        let table = StringTable::new();
        let idx = table.intern("变量_δ");
        assert_eq!(table.get(idx), Some("变量_δ"));
    }

    #[test]
    fn stats_track_hits_and_misses() {
        let table = StringTable::new();
        table.reset_stats();
        table.intern("delta_unique_1");
        table.intern("delta_unique_1");
        let stats = table.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.total_operations(), 2);
    }

    #[test]
    fn hit_rate_is_zero_with_no_operations() {
        let stats = InternerStats {
            count: 0,
            collisions: 0,
            hits: 0,
            misses: 0,
        };
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn concurrent_intern_of_same_string_converges() {
        use std::thread;

        let table = std::sync::Arc::new(StringTable::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let table = table.clone();
                thread::spawn(move || table.intern("epsilon_shared_unique"))
            })
            .collect();

        let indices: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(indices.iter().all(|&i| i == indices[0]));
    }
}
