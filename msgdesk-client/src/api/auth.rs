//! Authentication endpoints

use std::sync::Arc;

use msgdesk_core::{CurrentUser, LoginRequest, RefreshRequest, TokenResponse};
use tracing::debug;

use super::{
    ApiRequest, Transport, CURRENT_USER_PATH, LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH,
};
use crate::{ApiError, ApiResult};

/// Client for `/api/auth/*` and `/api/users/me`
#[derive(Clone)]
pub struct AuthApi {
    transport: Arc<dyn Transport>,
}

impl AuthApi {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Exchange credentials for a token pair
    ///
    /// A 401 becomes [`ApiError::InvalidCredentials`] so that nothing the server
    /// said about the account reaches the caller.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<TokenResponse> {
        let request = ApiRequest::post(LOGIN_PATH).with_json(&LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        })?;

        let response = self.transport.send(request).await?;
        if response.is_unauthorized() {
            debug!("Login rejected by server");
            return Err(ApiError::InvalidCredentials);
        }
        response.into_json()
    }

    /// Exchange a refresh token for a new token pair
    pub async fn refresh(&self, refresh_token: &str) -> ApiResult<TokenResponse> {
        let request = ApiRequest::post(REFRESH_PATH).with_json(&RefreshRequest {
            refresh_token: refresh_token.to_string(),
        })?;

        self.transport.send(request).await?.into_json()
    }

    /// Tell the server the session is over
    pub async fn logout(&self, access_token: Option<String>) -> ApiResult<()> {
        let mut request = ApiRequest::post(LOGOUT_PATH);
        request.bearer = access_token;

        self.transport.send(request).await?.error_for_status()?;
        Ok(())
    }

    /// Who the current bearer belongs to
    pub async fn current_user(&self) -> ApiResult<CurrentUser> {
        self.transport
            .send(ApiRequest::get(CURRENT_USER_PATH))
            .await?
            .into_json()
    }
}
