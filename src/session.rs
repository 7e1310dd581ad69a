// Copyright 2026 The Lumi Project
// SPDX-License-Identifier: Apache-2.0

// Session identity for conversation continuity.
//
// The backend groups questions into conversations by an opaque session
// id attached to every request. The id is generated lazily on first use
// and stays stable for the lifetime of the store — the CLI analog of the
// original browser client's tab-scoped storage. Not an authentication
// token; it only buckets requests on the backend.

use std::sync::{Arc, RwLock};

use chrono::Utc;
use uuid::Uuid;

/// Length of the random suffix in a generated identifier.
const SUFFIX_LEN: usize = 9;

// ---------------------------------------------------------------------------
// SessionIdStore trait
// ---------------------------------------------------------------------------

/// Storage backing for the session identifier.
///
/// Implementations must be thread-safe; reads vastly outnumber the
/// single write. Two racing first accesses may both write — last write
/// wins, and [`SessionProvider::get`] re-reads after storing so every
/// caller converges on the stored value.
pub trait SessionIdStore: Send + Sync {
    /// The stored identifier, if one exists.
    fn load(&self) -> Option<String>;

    /// Store the identifier, replacing any existing value.
    fn store(&self, id: &str);
}

/// Process-lifetime store — one identifier per CLI run.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    slot: RwLock<Option<String>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionIdStore for InMemorySessionStore {
    fn load(&self) -> Option<String> {
        self.slot.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn store(&self, id: &str) {
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = Some(id.to_string());
    }
}

// ---------------------------------------------------------------------------
// SessionProvider
// ---------------------------------------------------------------------------

/// Issues the session identifier attached to outgoing questions.
pub struct SessionProvider {
    store: Arc<dyn SessionIdStore>,
}

impl SessionProvider {
    pub fn new(store: Arc<dyn SessionIdStore>) -> Self {
        Self { store }
    }

    /// The current identifier, generating and persisting one on first use.
    pub fn get(&self) -> String {
        if let Some(id) = self.store.load() {
            return id;
        }
        let id = generate_session_id();
        tracing::debug!(%id, "generated session id");
        self.store.store(&id);
        // Re-read so racing first accesses converge on one stored value.
        self.store.load().unwrap_or(id)
    }
}

/// Generate a fresh identifier: `sess-<base36 millis>-<random suffix>`.
fn generate_session_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(SUFFIX_LEN)
        .collect();
    format!("sess-{}-{}", base36(millis), suffix)
}

/// Lowercase base-36 rendering of `n`.
fn base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        if let Some(digit) = std::char::from_digit((n % 36) as u32, 36) {
            digits.push(digit);
        }
        n /= 36;
    }
    digits.iter().rev().collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store that counts writes, for verifying lazy single generation.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemorySessionStore,
        writes: AtomicUsize,
    }

    impl SessionIdStore for CountingStore {
        fn load(&self) -> Option<String> {
            self.inner.load()
        }

        fn store(&self, id: &str) {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.store(id);
        }
    }

    /// Store where a racing first access "wins": whatever we store, the
    /// re-read returns the other access's value.
    struct RacingStore {
        stored: RwLock<Option<String>>,
    }

    impl SessionIdStore for RacingStore {
        fn load(&self) -> Option<String> {
            self.stored.read().unwrap().clone()
        }

        fn store(&self, _id: &str) {
            *self.stored.write().unwrap() = Some("sess-winner-000000000".to_string());
        }
    }

    // ---------------------------------------------------------------
    // Identifier format
    // ---------------------------------------------------------------

    #[test]
    fn generated_id_has_expected_shape() {
        let id = generate_session_id();
        let parts: Vec<&str> = id.splitn(3, '-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "sess");
        assert!(!parts[1].is_empty());
        assert!(parts[1].chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(parts[2].len(), SUFFIX_LEN);
    }

    #[test]
    fn generated_ids_differ() {
        assert_ne!(generate_session_id(), generate_session_id());
    }

    #[test]
    fn base36_encodes_known_values() {
        assert_eq!(base36(0), "0");
        assert_eq!(base36(35), "z");
        assert_eq!(base36(36), "10");
        assert_eq!(base36(36 * 36 + 1), "101");
    }

    #[test]
    fn base36_roundtrips_against_parse() {
        for n in [1u64, 42, 1_000, 1_700_000_000_000] {
            let encoded = base36(n);
            assert_eq!(u64::from_str_radix(&encoded, 36).unwrap(), n);
        }
    }

    // ---------------------------------------------------------------
    // Provider behavior
    // ---------------------------------------------------------------

    #[test]
    fn get_is_stable_across_calls() {
        let provider = SessionProvider::new(Arc::new(InMemorySessionStore::new()));
        let first = provider.get();
        let second = provider.get();
        assert_eq!(first, second);
    }

    #[test]
    fn store_is_written_exactly_once() {
        let store = Arc::new(CountingStore::default());
        let provider = SessionProvider::new(store.clone());
        provider.get();
        provider.get();
        provider.get();
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn racing_first_access_converges_on_stored_value() {
        let provider = SessionProvider::new(Arc::new(RacingStore {
            stored: RwLock::new(None),
        }));
        assert_eq!(provider.get(), "sess-winner-000000000");
        assert_eq!(provider.get(), "sess-winner-000000000");
    }

    #[test]
    fn racing_first_accesses_converge_for_later_reads() {
        let provider = Arc::new(SessionProvider::new(Arc::new(InMemorySessionStore::new())));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let provider = Arc::clone(&provider);
                std::thread::spawn(move || provider.get())
            })
            .collect();
        let ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        // Whatever the race produced, the store has settled on one value
        // that every later read agrees on, and it was one of the ids
        // handed out during the race.
        let stored = provider.get();
        assert_eq!(stored, provider.get());
        assert!(ids.contains(&stored));
    }
}
