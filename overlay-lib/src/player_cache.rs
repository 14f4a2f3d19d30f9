//! Two-tier TTL cache of fetched `Player`s, keyed by lowercased username.
//!
//! Grounded on `original_source/src/prism/overlay/get_stats.py`'s
//! `get_and_cache_stats` (short/long TTL split, genus-stamped writes) and
//! `behaviour.py`'s `get_and_cache_player` (pending-marker insertion so
//! concurrent lookups for the same username don't double-enqueue a fetch).
//! Uses the `ttl_cache` crate for the actual bounded+expiring storage, per
//! the recommendation to prefer an off-the-shelf TTL map over a hand-rolled one.

use std::time::Duration;
use ttl_cache::TtlCache;

use crate::player::Player;

const CACHE_CAPACITY: usize = 4096;

/// Two TTL maps (a short one for active-lobby churn, a long one so a player
/// who reappears in a later lobby doesn't need refetching) plus a genus
/// counter that lets in-flight fetches detect they've been invalidated by a
/// concurrent `clear_cache`.
pub struct PlayerCache {
    short_term: TtlCache<String, Player>,
    long_term: TtlCache<String, Player>,
    genus: u64,
    short_ttl: Duration,
    long_ttl: Duration,
}

impl PlayerCache {
    pub fn new(short_ttl: Duration, long_ttl: Duration) -> Self {
        PlayerCache {
            short_term: TtlCache::new(CACHE_CAPACITY),
            long_term: TtlCache::new(CACHE_CAPACITY),
            genus: 0,
            short_ttl,
            long_ttl,
        }
    }

    /// The current cache epoch. Capture this before starting a fetch and pass
    /// it to `set_cached_player` so a result that completes after a concurrent
    /// `clear_cache` is silently dropped instead of repopulating stale data.
    pub fn genus(&self) -> u64 {
        self.genus
    }

    pub fn get_cached_player(&mut self, username: &str) -> Option<Player> {
        let key = username.to_lowercase();
        self.short_term
            .get(&key)
            .or_else(|| self.long_term.get(&key))
            .cloned()
    }

    /// Look up only in the long-lived tier. Auto-denick deliberately consults
    /// this instead of `get_cached_player`, so a player the short-term tier
    /// hasn't settled on yet (still pending) reads as "not yet resolved"
    /// rather than racing a half-finished fetch.
    pub fn get_long_term_cached_player(&mut self, username: &str) -> Option<Player> {
        let key = username.to_lowercase();
        self.long_term.get(&key).cloned()
    }

    /// Look up `username`; if absent from both tiers, install a
    /// `PendingPlayer` marker (so a second concurrent lookup sees "already in
    /// flight" rather than triggering a duplicate fetch) and return `None` to
    /// tell the caller to enqueue a fetch.
    pub fn get_cached_player_or_set_pending(&mut self, username: &str) -> Option<Player> {
        let key = username.to_lowercase();
        if let Some(player) = self
            .short_term
            .get(&key)
            .or_else(|| self.long_term.get(&key))
        {
            return Some(player.clone());
        }
        let pending = Player::PendingPlayer {
            username: username.to_string(),
        };
        self.short_term.insert(key.clone(), pending.clone(), self.short_ttl);
        self.long_term.insert(key, pending, self.long_ttl);
        None
    }

    /// Store a freshly fetched player, stamped with the genus captured when
    /// the fetch began. If the cache has since been cleared (genus advanced),
    /// the write is discarded.
    pub fn set_cached_player(&mut self, username: &str, player: Player, genus: u64) {
        if genus != self.genus {
            return;
        }
        let key = username.to_lowercase();
        self.short_term.insert(key.clone(), player.clone(), self.short_ttl);
        self.long_term.insert(key, player, self.long_ttl);
    }

    /// Mutate a cached entry in place (e.g. attaching a winstreak estimate or
    /// tags after the initial stats fetch). No-op if the username isn't cached.
    pub fn update_cached_player(&mut self, username: &str, f: impl Fn(&mut Player)) {
        let key = username.to_lowercase();
        if let Some(player) = self.short_term.get_mut(&key) {
            f(player);
        }
        if let Some(player) = self.long_term.get_mut(&key) {
            f(player);
        }
    }

    pub fn uncache_player(&mut self, username: &str) {
        let key = username.to_lowercase();
        self.short_term.remove(&key);
        self.long_term.remove(&key);
    }

    /// Bump the genus and drop the short-term tier (always) and the long-term
    /// tier (unless `short_term_only`). Called between games: a new lobby's
    /// roster shouldn't inherit this game's stale pending/unknown markers, but
    /// confirmed long-term stats usually still apply.
    pub fn clear_cache(&mut self, short_term_only: bool) {
        self.genus = self.genus.wrapping_add(1);
        self.short_term.clear();
        if !short_term_only {
            self.long_term.clear();
        }
    }
}
