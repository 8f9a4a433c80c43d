//! Request interceptor
//!
//! Wraps a [`Transport`] so that every request carries the current access
//! token, and an expired token is renewed and the request replayed without the
//! caller noticing.
//!
//! Requests that fail with 401 while a refresh is already running queue up
//! behind it instead of starting their own. The refresh runs on its own task,
//! so dropping the request that triggered it does not strand the queue. When
//! it settles, queued callers are released in arrival order: with the new
//! token to replay their request, or with a failure after the session has
//! been cleared and the login redirect signalled once.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use msgdesk_core::Navigator;
use reqwest::StatusCode;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, warn};

use crate::api::{is_token_endpoint, ApiRequest, ApiResponse, Transport};
use crate::session::SessionManager;
use crate::{ApiError, ApiResult, ErrorCategory};

/// What a queued caller receives once the refresh settles
type RefreshOutcome = Result<String, ()>;

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

struct Inner {
    next: Arc<dyn Transport>,
    session: Arc<SessionManager>,
    navigator: Arc<dyn Navigator>,
    refresh: Mutex<RefreshState>,
}

/// Middleware adding bearer credentials and single-flight token refresh
#[derive(Clone)]
pub struct AuthInterceptor {
    inner: Arc<Inner>,
}

impl AuthInterceptor {
    pub fn new(
        next: Arc<dyn Transport>,
        session: Arc<SessionManager>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                next,
                session,
                navigator,
                refresh: Mutex::new(RefreshState::default()),
            }),
        }
    }

    /// Whether a refresh is currently running
    pub async fn refresh_in_flight(&self) -> bool {
        self.inner.refresh.lock().await.in_flight
    }
}

#[async_trait]
impl Transport for AuthInterceptor {
    async fn send(&self, mut request: ApiRequest) -> ApiResult<ApiResponse> {
        let inner = &self.inner;
        let sent_token = inner.session.access_token();
        if let Some(token) = &sent_token {
            request.bearer = Some(token.clone());
        }

        let response = inner.forward(&request).await?;
        if !response.is_unauthorized() || request.retried {
            if response.is_unauthorized() {
                warn!(path = %request.path, "Request rejected again after token refresh");
            }
            return Ok(response);
        }

        if is_token_endpoint(&request.path) {
            // Retrying a rejected login or refresh would only loop
            warn!(path = %request.path, "Token endpoint returned 401; ending session");
            inner.session.clear();
            inner.navigator.redirect_to_login();
            return Ok(response);
        }

        let outcome = Inner::await_refresh(inner, sent_token.as_deref()).await;
        match outcome {
            Ok(token) => inner.replay(request, token).await,
            Err(()) => Err(ApiError::SessionExpired {
                problem: response.problem(),
            }),
        }
    }
}

impl Inner {
    async fn forward(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        debug!(method = %request.method, path = %request.path, retried = request.retried, "API request");

        match self.next.send(request.clone()).await {
            Ok(response) => {
                log_response(request, response.status);
                Ok(response)
            }
            Err(e) => {
                error!(method = %request.method, path = %request.path, error = %e, "No response received");
                Err(e)
            }
        }
    }

    /// Send the request once more with a fresh token; never refreshes again
    async fn replay(&self, mut request: ApiRequest, token: String) -> ApiResult<ApiResponse> {
        request.bearer = Some(token);
        request.retried = true;

        let response = self.forward(&request).await?;
        if response.is_unauthorized() {
            warn!(path = %request.path, "Request rejected again after token refresh");
        }
        Ok(response)
    }

    /// Join the refresh queue, starting the refresh if nobody has yet
    ///
    /// `sent_token` is the token the rejected request carried. If a refresh
    /// settled after that request left, its result is used directly.
    async fn await_refresh(this: &Arc<Self>, sent_token: Option<&str>) -> RefreshOutcome {
        let (tx, rx) = oneshot::channel();

        let start = {
            let mut state = this.refresh.lock().await;

            if !state.in_flight && sent_token.is_some() {
                match this.session.access_token() {
                    Some(current) if Some(current.as_str()) != sent_token => {
                        debug!("Token rotated while request was in flight");
                        return Ok(current);
                    }
                    None => {
                        debug!("Session ended while request was in flight");
                        return Err(());
                    }
                    Some(_) => {}
                }
            }

            state.waiters.push_back(tx);
            let start = !state.in_flight;
            state.in_flight = true;
            start
        };

        if start {
            let inner = Arc::clone(this);
            tokio::spawn(async move { inner.run_refresh().await });
        } else {
            debug!("Refresh already in flight; queued");
        }

        // The sender only disappears if the refresh task died
        rx.await.unwrap_or(Err(()))
    }

    async fn run_refresh(&self) {
        debug!("Starting token refresh");

        let outcome = match self.session.refresh().await {
            Ok(()) => self.session.access_token().ok_or(()),
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                Err(())
            }
        };

        if outcome.is_err() {
            self.session.clear();
            self.navigator.redirect_to_login();
        }

        let waiters = {
            let mut state = self.refresh.lock().await;
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };

        debug!(
            queued = waiters.len(),
            success = outcome.is_ok(),
            "Token refresh settled"
        );
        for waiter in waiters {
            // A receiver is gone when its caller was cancelled
            let _ = waiter.send(outcome.clone());
        }
    }
}

fn log_response(request: &ApiRequest, status: StatusCode) {
    let method = &request.method;
    let path = &request.path;

    if status.is_success() {
        debug!(%method, %path, status = status.as_u16(), "API response");
        return;
    }

    match ErrorCategory::from_status(status.as_u16()) {
        ErrorCategory::Unauthorized => debug!(%method, %path, "API error: unauthorized"),
        ErrorCategory::Forbidden => warn!(%method, %path, "API error: forbidden"),
        ErrorCategory::NotFound => warn!(%method, %path, "API error: not found"),
        ErrorCategory::Conflict => warn!(%method, %path, "API error: conflict"),
        ErrorCategory::BadRequest => warn!(%method, %path, "API error: bad request"),
        ErrorCategory::Server => {
            error!(%method, %path, status = status.as_u16(), "API error: server error")
        }
        _ => warn!(%method, %path, status = status.as_u16(), "API error"),
    }
}
