//! Game Store (C2): an index of game handles by sport, team-pair, bound id,
//! and ticker. Generic over the handle type `H` so this crate does not need
//! to know about the actor runtime that owns the handle (that lives in the
//! sport-process binary, see §10.1).
//!
//! `put` and `register_ticker` may be invoked from non-owner threads and
//! must be safe for concurrent readers; a single lock per index is
//! acceptable because lookups only happen at binding time, never hot-path.

use crate::types::Sport;
use parking_lot::RwLock;
use std::collections::HashMap;

pub struct GameStore<H: Clone> {
    by_sport_and_canonical_pair: RwLock<HashMap<(Sport, String, String), H>>,
    by_sport_and_bound_id: RwLock<HashMap<(Sport, String), H>>,
    by_ticker: RwLock<HashMap<String, Vec<H>>>,
    by_sport: RwLock<HashMap<Sport, Vec<H>>>,
}

impl<H: Clone> Default for GameStore<H> {
    fn default() -> Self {
        Self {
            by_sport_and_canonical_pair: RwLock::new(HashMap::new()),
            by_sport_and_bound_id: RwLock::new(HashMap::new()),
            by_ticker: RwLock::new(HashMap::new()),
            by_sport: RwLock::new(HashMap::new()),
        }
    }
}

impl<H: Clone> GameStore<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly created context under its canonical team pair.
    pub fn put(&self, sport: Sport, canonical_home: &str, canonical_away: &str, handle: H) {
        self.by_sport_and_canonical_pair.write().insert(
            (sport, canonical_home.to_string(), canonical_away.to_string()),
            handle.clone(),
        );
        self.by_sport.write().entry(sport).or_default().push(handle);
    }

    /// Exact lookup on the canonical pair, order-sensitive.
    pub fn get_by_teams(&self, sport: Sport, hnorm: &str, anorm: &str) -> Option<H> {
        self.by_sport_and_canonical_pair
            .read()
            .get(&(sport, hnorm.to_string(), anorm.to_string()))
            .cloned()
    }

    /// Fast-path lookup by vendor-assigned bound id.
    pub fn get(&self, sport: Sport, bound_id: &str) -> Option<H> {
        self.by_sport_and_bound_id
            .read()
            .get(&(sport, bound_id.to_string()))
            .cloned()
    }

    pub fn bind_id(&self, sport: Sport, bound_id: &str, handle: H) {
        self.by_sport_and_bound_id
            .write()
            .insert((sport, bound_id.to_string()), handle);
    }

    pub fn register_ticker(&self, ticker: &str, handle: H) {
        self.by_ticker
            .write()
            .entry(ticker.to_string())
            .or_default()
            .push(handle);
    }

    pub fn by_ticker(&self, ticker: &str) -> Vec<H> {
        self.by_ticker.read().get(ticker).cloned().unwrap_or_default()
    }

    pub fn by_sport(&self, sport: Sport) -> Vec<H> {
        self.by_sport.read().get(&sport).cloned().unwrap_or_default()
    }

    pub fn all(&self) -> Vec<H> {
        self.by_sport.read().values().flatten().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_pair_lookup_is_order_sensitive() {
        let store: GameStore<u32> = GameStore::new();
        store.put(Sport::Soccer, "arsenal", "chelsea", 1);
        assert_eq!(store.get_by_teams(Sport::Soccer, "arsenal", "chelsea"), Some(1));
        assert_eq!(store.get_by_teams(Sport::Soccer, "chelsea", "arsenal"), None);
    }

    #[test]
    fn bind_id_then_fast_path_lookup() {
        let store: GameStore<u32> = GameStore::new();
        store.put(Sport::Hockey, "kings", "sharks", 7);
        store.bind_id(Sport::Hockey, "evt-1", 7);
        assert_eq!(store.get(Sport::Hockey, "evt-1"), Some(7));
    }

    #[test]
    fn ticker_may_map_to_multiple_contexts() {
        let store: GameStore<u32> = GameStore::new();
        store.register_ticker("TICK-A", 1);
        store.register_ticker("TICK-A", 2);
        assert_eq!(store.by_ticker("TICK-A"), vec![1, 2]);
    }

    #[test]
    fn by_sport_enumerates_for_fallback_fuzzy_search() {
        let store: GameStore<u32> = GameStore::new();
        store.put(Sport::Football, "jets", "bills", 1);
        store.put(Sport::Football, "chiefs", "raiders", 2);
        assert_eq!(store.by_sport(Sport::Football).len(), 2);
        assert!(store.by_sport(Sport::Hockey).is_empty());
    }
}
