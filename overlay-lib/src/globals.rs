//! Process-wide latched flags for fetch errors that matter regardless of
//! which thread or which username tripped them.
//!
//! Grounded on `gossip-lib/src/globals.rs`'s `lazy_static!` singleton
//! pattern, scoped down to just the error-taxonomy latches this crate needs
//! (§7's `ApiKeyState`): every other piece of shared state (settings, caches,
//! channels) is owned explicitly by `overlord::Overlord` rather than hidden
//! behind a singleton, since it needs construction-time configuration a bare
//! `lazy_static` can't carry.

use std::sync::atomic::{AtomicBool, Ordering};

use lazy_static::lazy_static;

use crate::fetch::FetchErrorKind;

pub struct ApiKeyState {
    pub invalid: AtomicBool,
    pub throttled: AtomicBool,
    pub missing_local_issuer_certificate: AtomicBool,
}

impl ApiKeyState {
    /// Clear every latch, e.g. after the user supplies a new API key.
    pub fn reset(&self) {
        self.invalid.store(false, Ordering::Relaxed);
        self.throttled.store(false, Ordering::Relaxed);
        self.missing_local_issuer_certificate.store(false, Ordering::Relaxed);
    }

    pub fn record(&self, kind: &FetchErrorKind) {
        match kind {
            FetchErrorKind::AuthInvalid => self.invalid.store(true, Ordering::Relaxed),
            FetchErrorKind::Throttled => self.throttled.store(true, Ordering::Relaxed),
            FetchErrorKind::MissingLocalIssuer => self
                .missing_local_issuer_certificate
                .store(true, Ordering::Relaxed),
            _ => {}
        }
    }
}

lazy_static! {
    pub static ref GLOBALS: ApiKeyState = ApiKeyState {
        invalid: AtomicBool::new(false),
        throttled: AtomicBool::new(false),
        missing_local_issuer_certificate: AtomicBool::new(false),
    };
}
