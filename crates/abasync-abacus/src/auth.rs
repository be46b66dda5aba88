//! OAuth2 client-credentials authentication against the Abacus token endpoint.
//!
//! Tokens are not cached: every report submission, status poll and page
//! sequence asks for a fresh one.

use abasync_core::AbacusConfig;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::{AbacusError, AbacusResult};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Fetches bearer tokens, retrying failed requests with exponential backoff.
#[derive(Debug, Clone)]
pub struct TokenClient {
    config: Arc<AbacusConfig>,
    http_client: Client,
}

impl TokenClient {
    #[must_use]
    pub fn new(config: Arc<AbacusConfig>, http_client: Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    /// Exchanges the client credentials for a bearer token.
    ///
    /// Makes one attempt plus up to `auth_max_retries` retries, sleeping
    /// `auth_backoff_base * 2^n` before retry `n`. Returns
    /// [`AbacusError::AuthenticationFailed`] once all attempts failed.
    #[instrument(skip(self), fields(token_url = %self.config.token_url))]
    pub async fn authenticate(&self) -> AbacusResult<String> {
        let max_retries = self.config.auth_max_retries;
        let mut attempt: u32 = 0;

        loop {
            match self.request_token().await {
                Ok(token) => {
                    if attempt > 0 {
                        debug!(attempt = attempt + 1, "Token obtained after retries");
                    }
                    return Ok(token);
                }
                Err(message) => {
                    if attempt >= max_retries {
                        warn!(attempts = attempt + 1, error = %message, "Authentication failed");
                        return Err(AbacusError::AuthenticationFailed {
                            attempts: attempt + 1,
                            message,
                        });
                    }

                    let delay = backoff_delay(self.config.auth_backoff_base, attempt);
                    debug!(
                        attempt = attempt + 1,
                        max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %message,
                        "Retrying token request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// One token request. Any failure is reported as a message so the
    /// caller can decide whether to retry.
    async fn request_token(&self) -> Result<String, String> {
        let response = self
            .http_client
            .post(&self.config.token_url)
            .basic_auth(
                &self.config.client_id,
                Some(self.config.client_secret.expose_secret()),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| format!("token request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(format!("token endpoint returned {status}: {body}"));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| format!("failed to parse token response: {e}"))?;

        match token.access_token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err("token response did not contain an access_token".to_string()),
        }
    }
}

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}
