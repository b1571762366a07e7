//! Bearer-token cache with single-flight refresh.
//!
//! One refresh runs at a time. Callers arriving while it is in flight block
//! on a condition variable and share its outcome instead of issuing their own
//! token exchange.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use thiserror::Error;

use super::{ProviderError, TokenGrant};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("token endpoint rejected credentials (HTTP {0})")]
    Rejected(u16),
    #[error("token endpoint unreachable: {0}")]
    Unreachable(String),
}

impl From<ProviderError> for AuthError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Status(code) => Self::Rejected(code),
            other => Self::Unreachable(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Default)]
struct CredentialState {
    token: Option<CachedToken>,
    refreshing: bool,
    /// Bumped each time a refresh attempt finishes.
    generation: u64,
    last_error: Option<AuthError>,
}

/// Process-wide token cache. Construct once and share by reference.
#[derive(Debug, Default)]
pub struct CredentialCache {
    state: Mutex<CredentialState>,
    refreshed: Condvar,
}

impl CredentialCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CredentialState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return a usable token, refreshing via `fetch` when there is none, it
    /// has expired, or `force_refresh` is set.
    ///
    /// If another caller's refresh is in flight, waits for it and returns its
    /// result (token or error), even when `force_refresh` is set.
    pub fn get_token<F>(&self, force_refresh: bool, fetch: F) -> Result<String, AuthError>
    where
        F: FnOnce() -> Result<TokenGrant, ProviderError>,
    {
        self.acquire(force_refresh, None, fetch)
    }

    /// Replace a token the provider just rejected.
    ///
    /// Refreshes only while `rejected` is still the cached token, so a batch
    /// of callers that all saw the same 401 shares a single refresh.
    pub fn replace_token<F>(&self, rejected: &str, fetch: F) -> Result<String, AuthError>
    where
        F: FnOnce() -> Result<TokenGrant, ProviderError>,
    {
        self.acquire(true, Some(rejected), fetch)
    }

    fn acquire<F>(
        &self,
        force_refresh: bool,
        rejected: Option<&str>,
        fetch: F,
    ) -> Result<String, AuthError>
    where
        F: FnOnce() -> Result<TokenGrant, ProviderError>,
    {
        let mut state = self.lock();
        let observed = state.generation;

        while state.refreshing {
            state = self
                .refreshed
                .wait(state)
                .unwrap_or_else(|e| e.into_inner());
        }

        if state.generation != observed {
            // Someone else refreshed while we waited.
            return match &state.last_error {
                Some(err) => Err(err.clone()),
                None => state
                    .token
                    .as_ref()
                    .map(|t| t.value.clone())
                    .ok_or_else(|| AuthError::Unreachable("no token after refresh".into())),
            };
        }

        let reusable = state.token.as_ref().filter(|t| {
            t.is_valid(Instant::now())
                && match rejected {
                    Some(r) => t.value != r,
                    None => !force_refresh,
                }
        });
        if let Some(token) = reusable {
            return Ok(token.value.clone());
        }

        state.refreshing = true;
        drop(state);
        let guard = RefreshGuard { cache: self };

        log::info!("Requesting new provider access token");
        let outcome = fetch().and_then(|grant| {
            let expires_at = Instant::now()
                .checked_add(Duration::from_secs(grant.expires_in))
                .ok_or_else(|| {
                    ProviderError::Decode(format!(
                        "token lifetime out of range: {}s",
                        grant.expires_in
                    ))
                })?;
            Ok((grant, expires_at))
        });

        let mut state = self.lock();
        state.refreshing = false;
        state.generation += 1;
        let result = match outcome {
            Ok((grant, expires_at)) => {
                log::info!("Obtained access token (expires in {}s)", grant.expires_in);
                state.token = Some(CachedToken {
                    value: grant.access_token.clone(),
                    expires_at,
                });
                state.last_error = None;
                Ok(grant.access_token)
            }
            Err(e) => {
                let err = AuthError::from(e);
                log::error!("Access token request failed: {err}");
                state.last_error = Some(err.clone());
                Err(err)
            }
        };
        drop(state);
        drop(guard);
        result
    }

    /// A cached token exists and has not expired.
    pub fn has_valid_token(&self) -> bool {
        self.lock()
            .token
            .as_ref()
            .is_some_and(|t| t.is_valid(Instant::now()))
    }

    /// Error from the most recent failed refresh, cleared on success.
    pub fn last_error(&self) -> Option<AuthError> {
        self.lock().last_error.clone()
    }
}

/// Wakes waiters when a refresh ends, including when `fetch` unwinds.
struct RefreshGuard<'a> {
    cache: &'a CredentialCache,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.cache.lock();
        if state.refreshing {
            // fetch panicked before an outcome was recorded
            state.refreshing = false;
            state.generation += 1;
            state.last_error = Some(AuthError::Unreachable("token refresh aborted".into()));
        }
        drop(state);
        self.cache.refreshed.notify_all();
    }
}
