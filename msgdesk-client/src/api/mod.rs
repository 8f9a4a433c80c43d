//! Typed access to the message service REST API
//!
//! Every request flows through a [`Transport`]. The HTTP implementation talks to
//! the real service; the request interceptor wraps any transport to add
//! credentials and token refresh.

use async_trait::async_trait;
use msgdesk_core::ProblemDetail;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{ApiError, ApiResult};

pub mod auth;
pub mod http;
pub mod messages;

pub use auth::AuthApi;
pub use http::HttpTransport;
pub use messages::MessagesApi;

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REFRESH_PATH: &str = "/api/auth/refresh";
pub const LOGOUT_PATH: &str = "/api/auth/logout";
pub const CURRENT_USER_PATH: &str = "/api/users/me";
pub const MESSAGES_PATH: &str = "/api/messages";

/// Whether a path targets an endpoint that issues tokens
pub fn is_token_endpoint(path: &str) -> bool {
    let path = path.split('?').next().unwrap_or(path);
    path == LOGIN_PATH || path == REFRESH_PATH
}

/// An outbound API call, independent of the transport carrying it
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the service origin, starting with `/api`
    pub path: String,
    pub body: Option<serde_json::Value>,
    /// Bearer credential, filled in by the interceptor
    pub bearer: Option<String>,
    /// Set once the request has been replayed after a token refresh
    pub retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            bearer: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body
    pub fn with_json<T: Serialize>(mut self, body: &T) -> ApiResult<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

/// A response of any status; only "no response at all" is a transport error
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Convenience constructor serializing `value` as the body
    pub fn json<T: Serialize>(status: StatusCode, value: &T) -> ApiResult<Self> {
        Ok(Self::new(status, serde_json::to_vec(value)?))
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    /// Problem details from the body, if the body holds one
    pub fn problem(&self) -> Option<ProblemDetail> {
        if self.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }

    /// Turn a non-2xx response into [`ApiError::Http`]
    pub fn error_for_status(self) -> ApiResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::Http {
                status: self.status.as_u16(),
                problem: self.problem(),
            })
        }
    }

    /// Decode a successful body
    pub fn into_json<T: DeserializeOwned>(self) -> ApiResult<T> {
        let response = self.error_for_status()?;
        Ok(serde_json::from_slice(&response.body)?)
    }
}

/// Carries an [`ApiRequest`] to the service and brings back its response
///
/// Implementations compose as middleware: a wrapping transport receives the
/// request, may alter it, and delegates to the transport it wraps.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> ApiResult<ApiResponse>;
}
