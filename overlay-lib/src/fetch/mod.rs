//! Stats-fetch abstraction: a small trait any HTTP (or test) backend
//! implements, a leaf error taxonomy distinct from the top-level `ErrorKind`,
//! and a retry/backoff helper shared by every fetch call site.
//!
//! Grounded on `original_source/src/prism/mojang.py`'s error handling
//! (`MissingLocalIssuerSSLError` short-circuits, 429/503/504 retried unless
//! `last_try`, everything else either `None` or a hard error) and
//! `gossip-lib/src/fetcher.rs`'s retry/backoff shape, adapted from the
//! teacher's async host-semaphore version to a blocking one since the stats
//! pipeline here runs on OS threads, not tokio tasks.

pub mod http;

use std::time::Duration;

use crate::player::Winstreaks;

/// Fetch-layer error taxonomy, embedded in `crate::error::ErrorKind::Fetch`
/// rather than forming a second top-level exception hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// The queried username/uuid does not exist (HTTP 404/204, or an empty
    /// Mojang lookup result).
    NotFound,
    /// The configured API key was rejected (HTTP 401/403).
    AuthInvalid,
    /// Rate limited (HTTP 429) with all retries exhausted.
    Throttled,
    /// TLS handshake failed because the local trust store has no issuer
    /// certificate for the endpoint; retrying won't help.
    MissingLocalIssuer,
    /// Transient network/server failure (timeout, 5xx, connection reset)
    /// that's worth retrying if attempts remain.
    Transient(String),
    /// Anything else: malformed JSON, an unexpected status code, etc.
    Unknown(String),
}

impl std::fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchErrorKind::NotFound => write!(f, "not found"),
            FetchErrorKind::AuthInvalid => write!(f, "API key rejected"),
            FetchErrorKind::Throttled => write!(f, "rate limited"),
            FetchErrorKind::MissingLocalIssuer => {
                write!(f, "missing local issuer certificate")
            }
            FetchErrorKind::Transient(s) => write!(f, "transient fetch error: {s}"),
            FetchErrorKind::Unknown(s) => write!(f, "unknown fetch error: {s}"),
        }
    }
}

pub type FetchResult<T> = Result<T, FetchErrorKind>;

/// One Bed Wars stats fetch backend. `HttpStatsBackend` is the production
/// implementation; tests substitute an in-memory fake so the assembler and
/// worker pool can be exercised without a network.
pub trait StatsBackend: Send + Sync {
    /// Resolve a username to a Mojang account uuid. `Ok(None)` means no such
    /// account exists (not an error).
    fn lookup_uuid(&self, username: &str) -> FetchResult<Option<String>>;

    /// Fetch the raw Hypixel player object for `uuid`. `Ok(None)` means the
    /// account exists but Hypixel has no record (new account, API privacy).
    fn fetch_playerdata(&self, uuid: &str) -> FetchResult<Option<serde_json::Value>>;

    /// Fetch a winstreak estimate for `uuid` from a third-party winstreak
    /// tracker, when Hypixel itself doesn't report one.
    fn fetch_winstreaks(&self, uuid: &str) -> FetchResult<Winstreaks>;
}

/// Retry `attempt` up to `retry_limit` additional times with exponential
/// backoff starting at `initial_backoff`, doubling each time. `attempt` is
/// told via its `last_try` argument whether this is the final allowed
/// attempt, mirroring `mojang.py`'s `last_try` pivot: a throttled/transient
/// response on the last try is surfaced as a hard error instead of retried.
pub fn retry_with_backoff<T>(
    retry_limit: u32,
    initial_backoff: Duration,
    mut attempt: impl FnMut(bool) -> FetchResult<T>,
) -> FetchResult<T> {
    let mut backoff = initial_backoff;
    for i in 0..=retry_limit {
        let last_try = i == retry_limit;
        match attempt(last_try) {
            Ok(v) => return Ok(v),
            Err(FetchErrorKind::Transient(_) | FetchErrorKind::Throttled) if !last_try => {
                std::thread::sleep(backoff);
                backoff *= 2;
            }
            Err(e) => return Err(e),
        }
    }
    unreachable!("loop always returns on its last iteration")
}
