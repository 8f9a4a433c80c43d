//! Collaborator traits
//!
//! The session layer talks to persistence and navigation only through these seams.

use crate::error::DeskResult;

/// Storage key for the access token
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Storage key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Storage key for the token type (normally `Bearer`)
pub const TOKEN_TYPE_KEY: &str = "token_type";
/// Storage key for the expiry hint in seconds
pub const EXPIRES_IN_KEY: &str = "expires_in";

/// All keys written and cleared together by the session manager
pub const SESSION_KEYS: [&str; 4] = [
    ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
    TOKEN_TYPE_KEY,
    EXPIRES_IN_KEY,
];

/// Client-side key-value storage holding the session tokens
pub trait TokenStorage: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> DeskResult<Option<String>>;

    /// Write several values in one step
    fn set_all(&self, entries: &[(&str, String)]) -> DeskResult<()>;

    /// Remove several keys in one step; missing keys are ignored
    fn remove_all(&self, keys: &[&str]) -> DeskResult<()>;
}

/// Receiver of the "go to the login view" signal
///
/// Routing belongs to the front end; the session layer only notifies.
pub trait Navigator: Send + Sync {
    fn redirect_to_login(&self);
}

/// Navigator that drops the signal, for headless use
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn redirect_to_login(&self) {
        tracing::debug!("Login redirect requested (no navigator attached)");
    }
}
