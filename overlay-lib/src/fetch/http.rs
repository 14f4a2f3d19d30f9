//! The production `StatsBackend`, built on `reqwest::blocking` per spec's
//! mandate for OS threads rather than an async runtime.
//!
//! Grounded on `original_source/src/prism/mojang.py`'s `_make_request`
//! (status-code -> error-kind classification, SSL-issuer short-circuit) and
//! `gossip-lib/src/fetcher.rs`'s use of a shared `reqwest::Client` with a
//! fixed `USER_AGENT`. The concrete endpoints and JSON shapes are
//! intentionally light: only the fields this crate actually consumes are
//! extracted, and a response shape it doesn't recognize becomes `NotFound`/
//! `Unknown` rather than a hard-coded struct mismatch.

use std::error::Error as _;
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::player::Winstreaks;
use crate::rate_limiter::RateLimiter;

use super::{retry_with_backoff, FetchErrorKind, FetchResult, StatsBackend};

const USER_AGENT: &str = concat!("bw-overlay/", env!("CARGO_PKG_VERSION"));

pub struct HttpStatsBackend {
    client: Client,
    rate_limiter: Arc<RateLimiter>,
    hypixel_api_key: Option<String>,
    antisniper_api_key: Option<String>,
    retry_limit: u32,
    initial_backoff: Duration,
}

impl HttpStatsBackend {
    pub fn new(
        rate_limiter: Arc<RateLimiter>,
        hypixel_api_key: Option<String>,
        antisniper_api_key: Option<String>,
        timeout: Duration,
        retry_limit: u32,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).user_agent(USER_AGENT).build()?;
        Ok(HttpStatsBackend {
            client,
            rate_limiter,
            hypixel_api_key,
            antisniper_api_key,
            retry_limit,
            initial_backoff: Duration::from_millis(500),
        })
    }

    fn classify_status(status: StatusCode) -> Option<FetchErrorKind> {
        if status.is_success() {
            return None;
        }
        match status.as_u16() {
            204 | 404 => Some(FetchErrorKind::NotFound),
            401 | 403 => Some(FetchErrorKind::AuthInvalid),
            429 => Some(FetchErrorKind::Throttled),
            500..=599 => Some(FetchErrorKind::Transient(format!("http {status}"))),
            _ => Some(FetchErrorKind::Unknown(format!("http {status}"))),
        }
    }

    fn classify_reqwest_error(e: &reqwest::Error) -> FetchErrorKind {
        let chain = std::iter::successors(e.source(), |e| e.source())
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(": ");
        if chain.contains("unable to get local issuer certificate") {
            return FetchErrorKind::MissingLocalIssuer;
        }
        if e.is_timeout() || e.is_connect() {
            return FetchErrorKind::Transient(e.to_string());
        }
        FetchErrorKind::Unknown(e.to_string())
    }
}

impl StatsBackend for HttpStatsBackend {
    fn lookup_uuid(&self, username: &str) -> FetchResult<Option<String>> {
        retry_with_backoff(self.retry_limit, self.initial_backoff, |_last_try| {
            let _permit = self.rate_limiter.enter();
            let url = format!("https://api.mojang.com/users/profiles/minecraft/{username}");
            let response = self
                .client
                .get(&url)
                .send()
                .map_err(|e| Self::classify_reqwest_error(&e))?;
            let status = response.status();
            if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
                return Ok(None);
            }
            if let Some(kind) = Self::classify_status(status) {
                return Err(kind);
            }
            let body: serde_json::Value = response
                .json()
                .map_err(|e| FetchErrorKind::Unknown(e.to_string()))?;
            Ok(body
                .get("id")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()))
        })
    }

    fn fetch_playerdata(&self, uuid: &str) -> FetchResult<Option<serde_json::Value>> {
        let Some(api_key) = self.hypixel_api_key.as_deref() else {
            return Err(FetchErrorKind::AuthInvalid);
        };
        retry_with_backoff(self.retry_limit, self.initial_backoff, |_last_try| {
            let _permit = self.rate_limiter.enter();
            let response = self
                .client
                .get("https://api.hypixel.net/v2/player")
                .query(&[("uuid", uuid)])
                .header("API-Key", api_key)
                .send()
                .map_err(|e| Self::classify_reqwest_error(&e))?;
            let status = response.status();
            if let Some(kind) = Self::classify_status(status) {
                return Err(kind);
            }
            let body: serde_json::Value = response
                .json()
                .map_err(|e| FetchErrorKind::Unknown(e.to_string()))?;
            Ok(body.get("player").cloned().filter(|v| !v.is_null()))
        })
    }

    fn fetch_winstreaks(&self, uuid: &str) -> FetchResult<Winstreaks> {
        let Some(api_key) = self.antisniper_api_key.as_deref() else {
            // No winstreak-estimator key configured; this is a soft failure
            // the assembler treats the same as "no estimate available".
            return Ok(Winstreaks::default());
        };
        retry_with_backoff(self.retry_limit, self.initial_backoff, |_last_try| {
            let _permit = self.rate_limiter.enter();
            let response = self
                .client
                .get("https://api.antisniper.net/winstreak")
                .query(&[("key", api_key), ("player", uuid)])
                .send()
                .map_err(|e| Self::classify_reqwest_error(&e))?;
            let status = response.status();
            if let Some(kind) = Self::classify_status(status) {
                return Err(kind);
            }
            let body: serde_json::Value = response
                .json()
                .map_err(|e| FetchErrorKind::Unknown(e.to_string()))?;
            let data = body.get("data").unwrap_or(&body);
            Ok(Winstreaks {
                overall: data.get("overall").and_then(|v| v.as_i64()),
                solo: data.get("eight_one").and_then(|v| v.as_i64()),
                doubles: data.get("eight_two").and_then(|v| v.as_i64()),
                threes: data.get("four_three").and_then(|v| v.as_i64()),
                fours: data.get("four_four").and_then(|v| v.as_i64()),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification_matches_error_taxonomy() {
        assert_eq!(
            HttpStatsBackend::classify_status(StatusCode::NOT_FOUND),
            Some(FetchErrorKind::NotFound)
        );
        assert_eq!(
            HttpStatsBackend::classify_status(StatusCode::FORBIDDEN),
            Some(FetchErrorKind::AuthInvalid)
        );
        assert_eq!(
            HttpStatsBackend::classify_status(StatusCode::TOO_MANY_REQUESTS),
            Some(FetchErrorKind::Throttled)
        );
        assert!(matches!(
            HttpStatsBackend::classify_status(StatusCode::BAD_GATEWAY),
            Some(FetchErrorKind::Transient(_))
        ));
        assert_eq!(HttpStatsBackend::classify_status(StatusCode::OK), None);
    }
}
