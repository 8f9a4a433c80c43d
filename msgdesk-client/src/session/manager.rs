//! Session Manager - single source of truth for the token pair
//!
//! Owns the access and refresh tokens, mirrors them into [`TokenStorage`], and
//! publishes a [`SessionStatus`] that front ends can watch.

use std::sync::Arc;

use msgdesk_core::{
    TokenResponse, TokenStorage, ACCESS_TOKEN_KEY, EXPIRES_IN_KEY, REFRESH_TOKEN_KEY,
    SESSION_KEYS, TOKEN_TYPE_KEY,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{AuthApi, Transport};
use crate::ApiResult;

/// In-memory session state; both tokens are always replaced together
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SessionState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    is_loading: bool,
}

/// Read-only view of the session handed to front ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub is_authenticated: bool,
    pub is_loading: bool,
}

impl From<&SessionState> for SessionStatus {
    fn from(state: &SessionState) -> Self {
        Self {
            is_authenticated: state.access_token.is_some(),
            is_loading: state.is_loading,
        }
    }
}

/// Watches [`SessionStatus`] changes; token rotations that keep the status unchanged are skipped
pub struct StatusReceiver {
    rx: watch::Receiver<SessionState>,
    last: SessionStatus,
}

impl StatusReceiver {
    /// Wait until the status differs from the one last seen
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        loop {
            self.rx.changed().await?;
            let next = SessionStatus::from(&*self.rx.borrow_and_update());
            if next != self.last {
                self.last = next;
                return Ok(());
            }
        }
    }

    pub fn borrow(&self) -> SessionStatus {
        SessionStatus::from(&*self.rx.borrow())
    }

    pub fn borrow_and_update(&mut self) -> SessionStatus {
        let status = SessionStatus::from(&*self.rx.borrow_and_update());
        self.last = status;
        status
    }
}

/// Token lifecycle: hydrate, login, refresh, logout
pub struct SessionManager {
    storage: Arc<dyn TokenStorage>,
    auth: AuthApi,
    state: watch::Sender<SessionState>,
}

impl SessionManager {
    /// Create a manager in the loading state; call [`hydrate`](Self::hydrate) once at startup
    ///
    /// `transport` must reach the auth endpoints directly, not through the
    /// request interceptor, so a failing refresh is reported exactly once.
    pub fn new(storage: Arc<dyn TokenStorage>, transport: Arc<dyn Transport>) -> Self {
        let initial = SessionState {
            is_loading: true,
            ..Default::default()
        };
        let (state, _) = watch::channel(initial);

        Self {
            storage,
            auth: AuthApi::new(transport),
            state,
        }
    }

    /// Load the token pair from storage; no network call
    ///
    /// Leaves the manager out of the loading state whatever the outcome. A
    /// lone token without its partner is discarded.
    pub fn hydrate(&self) {
        let read = |key: &str| match self.storage.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Failed to read token from storage");
                None
            }
        };

        let access_token = read(ACCESS_TOKEN_KEY);
        let refresh_token = read(REFRESH_TOKEN_KEY);

        match (access_token, refresh_token) {
            (Some(access_token), Some(refresh_token)) => {
                debug!("Hydrated session from storage");
                self.publish(SessionState {
                    access_token: Some(access_token),
                    refresh_token: Some(refresh_token),
                    is_loading: false,
                });
            }
            (None, None) => {
                debug!("No stored session");
                self.publish(SessionState::default());
            }
            _ => {
                warn!("Stored session has only one of its two tokens; discarding it");
                self.clear();
            }
        }
    }

    /// Log in with credentials
    ///
    /// On failure any tokens are cleared and the error is returned; a rejected
    /// password comes back as [`ApiError::InvalidCredentials`](crate::ApiError::InvalidCredentials).
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<()> {
        match self.auth.login(username, password).await {
            Ok(tokens) => {
                self.store(&tokens).inspect_err(|_| self.clear())?;
                info!(username, "Logged in");
                Ok(())
            }
            Err(e) => {
                self.clear();
                Err(e)
            }
        }
    }

    /// End the session
    ///
    /// The server is told best-effort; local state becomes unauthenticated
    /// whether or not that call succeeds.
    pub async fn logout(&self) {
        if let Err(e) = self.auth.logout(self.access_token()).await {
            warn!(error = %e, "Logout request failed, clearing local tokens anyway");
        }
        self.clear();
        info!("Logged out");
    }

    /// Exchange the stored refresh token for a new pair
    ///
    /// The token is read from storage, so a pair rotated by another process
    /// sharing it is picked up; the in-memory copy is the fallback. Without a
    /// refresh token the session is cleared and `Ok(())` is returned without
    /// contacting the server. A failed exchange clears the session and
    /// returns the error.
    pub async fn refresh(&self) -> ApiResult<()> {
        let stored = match self.storage.get(REFRESH_TOKEN_KEY) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Failed to read refresh token from storage");
                None
            }
        };
        let Some(refresh_token) = stored.or_else(|| self.refresh_token()) else {
            debug!("No refresh token stored; clearing session");
            self.clear();
            return Ok(());
        };

        match self.auth.refresh(&refresh_token).await {
            Ok(tokens) => {
                self.store(&tokens).inspect_err(|_| self.clear())?;
                debug!("Refreshed token pair");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                self.clear();
                Err(e)
            }
        }
    }

    /// Current access token, if any
    pub fn access_token(&self) -> Option<String> {
        self.state.borrow().access_token.clone()
    }

    /// Current refresh token, if any
    pub fn refresh_token(&self) -> Option<String> {
        self.state.borrow().refresh_token.clone()
    }

    /// Both tokens read under one borrow
    pub fn tokens(&self) -> (Option<String>, Option<String>) {
        let state = self.state.borrow();
        (state.access_token.clone(), state.refresh_token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().access_token.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus::from(&*self.state.borrow())
    }

    /// Receiver that observes every authentication state change
    pub fn subscribe(&self) -> StatusReceiver {
        let rx = self.state.subscribe();
        let last = SessionStatus::from(&*rx.borrow());
        StatusReceiver { rx, last }
    }

    /// Drop both tokens locally and in storage
    pub fn clear(&self) {
        if let Err(e) = self.storage.remove_all(&SESSION_KEYS) {
            warn!(error = %e, "Failed to remove tokens from storage");
        }
        self.publish(SessionState::default());
    }

    fn store(&self, tokens: &TokenResponse) -> ApiResult<()> {
        self.storage.set_all(&[
            (ACCESS_TOKEN_KEY, tokens.access_token.clone()),
            (REFRESH_TOKEN_KEY, tokens.refresh_token.clone()),
            (TOKEN_TYPE_KEY, tokens.token_type.clone()),
            (EXPIRES_IN_KEY, tokens.expires_in.to_string()),
        ])?;

        self.publish(SessionState {
            access_token: Some(tokens.access_token.clone()),
            refresh_token: Some(tokens.refresh_token.clone()),
            is_loading: false,
        });
        Ok(())
    }

    fn publish(&self, next: SessionState) {
        self.state.send_if_modified(|current| {
            let changed = *current != next;
            *current = next;
            changed
        });
    }
}
