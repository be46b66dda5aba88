//! Per-client cooldown on report starts using the governor crate.
//!
//! Each (client, action) pair may pass once per cooldown period; repeats
//! inside the period are rejected with the remaining wait.

use axum::http::HeaderMap;
use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota, RateLimiter,
};
use std::time::Duration;

/// Header carrying the caller identity.
pub const CLIENT_ID_HEADER: &str = "x-user-id";

/// Client key used when the identity header is missing.
pub const ANONYMOUS_CLIENT: &str = "anonymous";

pub struct CooldownLimiter {
    /// `None` when the cooldown is zero.
    limiter: Option<DefaultKeyedRateLimiter<(String, String)>>,
}

impl CooldownLimiter {
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self {
            limiter: Quota::with_period(cooldown).map(RateLimiter::keyed),
        }
    }

    /// Records an attempt of `action` by `client`.
    ///
    /// Returns the seconds left until the pair may pass again when the
    /// attempt falls inside the cooldown.
    pub fn check(&self, client: &str, action: &str) -> Result<(), u64> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };

        match limiter.check_key(&(client.to_string(), action.to_string())) {
            Ok(()) => Ok(()),
            Err(not_until) => {
                let wait_time = not_until.wait_time_from(DefaultClock::default().now());
                Err(wait_time.as_secs().max(1))
            }
        }
    }
}

impl std::fmt::Debug for CooldownLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CooldownLimiter")
            .field("enabled", &self.limiter.is_some())
            .finish()
    }
}

/// Caller identity from the `X-User-Id` header.
#[must_use]
pub fn client_id(headers: &HeaderMap) -> String {
    headers
        .get(CLIENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(ANONYMOUS_CLIENT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_first_request_passes_repeat_is_rejected() {
        let limiter = CooldownLimiter::new(Duration::from_secs(300));

        assert!(limiter.check("alice", "adr").is_ok());
        let retry_after = limiter.check("alice", "adr").unwrap_err();
        assert!(retry_after > 0 && retry_after <= 300);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = CooldownLimiter::new(Duration::from_secs(300));

        assert!(limiter.check("alice", "adr").is_ok());
        assert!(limiter.check("alice", "npo").is_ok());
        assert!(limiter.check("bob", "adr").is_ok());
    }

    #[test]
    fn test_zero_cooldown_disables_limiter() {
        let limiter = CooldownLimiter::new(Duration::ZERO);
        for _ in 0..5 {
            assert!(limiter.check("alice", "adr").is_ok());
        }
    }

    #[test]
    fn test_client_id_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_id(&headers), "anonymous");

        headers.insert(CLIENT_ID_HEADER, HeaderValue::from_static("  "));
        assert_eq!(client_id(&headers), "anonymous");

        headers.insert(CLIENT_ID_HEADER, HeaderValue::from_static("u-42"));
        assert_eq!(client_id(&headers), "u-42");
    }
}
