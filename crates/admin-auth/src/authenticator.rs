//! Issue and check the admin cookie.

use crate::cookie::{cookie_pairs, SetCookie};
use crate::token::AuthToken;
use chrono::Utc;
use site_config::ConfigCache;
use std::fmt;
use tracing::debug;

const COOKIE_PREFIX: &str = "__Host-";
const CANCELED_VALUE: &str = "-";

/// Minutes a token may be ahead of the server clock.
const FUTURE_SKEW_MINUTES: u64 = 1;

/// Cookie authenticator for one request.
///
/// Holds the cookie name, secret and window copied out of a [`ConfigCache`],
/// plus the current minute. It never touches the database.
#[derive(Clone)]
pub struct CookieAuthenticator {
    cookie_name: String,
    secret: String,
    window_minutes: u64,
    current_minute: u64,
}

impl CookieAuthenticator {
    /// Seed from the cache at the wall-clock time.
    pub fn from_config(cache: &ConfigCache) -> Self {
        Self::new(cache, Utc::now().timestamp())
    }

    /// Seed from the cache at `now`, unix seconds. Times before the epoch are
    /// treated as minute 0.
    pub fn new(cache: &ConfigCache, now: i64) -> Self {
        Self::from_parts(
            cache.auth_suffix(),
            cache.auth_secret(),
            cache.auth_window_minutes(),
            unix_minute(now),
        )
    }

    /// Build from raw settings.
    pub fn from_parts(
        suffix: &str,
        secret: impl Into<String>,
        window_minutes: u32,
        current_minute: u64,
    ) -> Self {
        Self {
            cookie_name: format!("{COOKIE_PREFIX}{suffix}"),
            secret: secret.into(),
            window_minutes: u64::from(window_minutes),
            current_minute,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn current_minute(&self) -> u64 {
        self.current_minute
    }

    pub fn window_minutes(&self) -> u64 {
        self.window_minutes
    }

    /// Fresh token for the current minute.
    pub fn issue(&self) -> SetCookie {
        let token = AuthToken::sign(self.secret.as_bytes(), self.current_minute);
        SetCookie::new(self.cookie_name.clone(), token.encode())
    }

    /// Header that overwrites and expires whatever token the client holds.
    pub fn cancel(&self) -> SetCookie {
        SetCookie::expired(self.cookie_name.clone(), CANCELED_VALUE)
    }

    /// Whether the `Cookie` header carries a valid token.
    pub fn validate(&self, cookie_header: &str) -> bool {
        self.authenticate(cookie_header).is_some()
    }

    /// The first valid token in the `Cookie` header.
    ///
    /// Candidates with our name that are malformed, too far in the future,
    /// older than the window or wrongly signed are skipped.
    pub fn authenticate(&self, cookie_header: &str) -> Option<AuthToken> {
        cookie_pairs(cookie_header)
            .filter(|(name, _)| *name == self.cookie_name)
            .find_map(|(_, value)| self.check(value))
    }

    fn check(&self, value: &str) -> Option<AuthToken> {
        let Some(token) = AuthToken::parse(value) else {
            debug!(cookie = %self.cookie_name, "Skipping malformed auth cookie");
            return None;
        };

        let minute = token.issued_minute();
        if minute > self.current_minute.saturating_add(FUTURE_SKEW_MINUTES) {
            debug!(minute, current = self.current_minute, "Skipping auth cookie from the future");
            return None;
        }
        if self.current_minute.saturating_sub(minute) > self.window_minutes {
            debug!(minute, current = self.current_minute, "Skipping expired auth cookie");
            return None;
        }
        if !token.verify(self.secret.as_bytes()) {
            debug!(minute, "Skipping auth cookie with bad signature");
            return None;
        }
        Some(token)
    }
}

impl fmt::Debug for CookieAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieAuthenticator")
            .field("cookie_name", &self.cookie_name)
            .field("window_minutes", &self.window_minutes)
            .field("current_minute", &self.current_minute)
            .finish_non_exhaustive()
    }
}

fn unix_minute(now: i64) -> u64 {
    u64::try_from(now.div_euclid(60)).unwrap_or(0)
}
