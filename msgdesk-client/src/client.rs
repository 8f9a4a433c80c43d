//! Client context
//!
//! Wires storage, session, interceptor and the typed APIs together once, so a
//! front end holds a single handle instead of assembling the pieces itself.

use std::sync::Arc;

use msgdesk_core::{ClientConfig, CurrentUser, Navigator, TokenStorage};
use tracing::{debug, info};

use crate::api::{AuthApi, HttpTransport, MessagesApi, Transport};
use crate::interceptor::AuthInterceptor;
use crate::permissions::{permissions, Permissions};
use crate::session::{SessionManager, SessionStatus};
use crate::ApiResult;

/// Everything a front end needs to talk to the message service
#[derive(Clone)]
pub struct Client {
    session: Arc<SessionManager>,
    interceptor: AuthInterceptor,
    auth: AuthApi,
    messages: MessagesApi,
}

impl Client {
    /// Client talking HTTP to `config.api.base_url`
    pub fn new(
        config: &ClientConfig,
        storage: Arc<dyn TokenStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> ApiResult<Self> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config.api)?);
        Ok(Self::with_transport(transport, storage, navigator))
    }

    /// Client over any transport; the session is hydrated from `storage` here
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        storage: Arc<dyn TokenStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let session = Arc::new(SessionManager::new(storage, Arc::clone(&transport)));
        session.hydrate();

        let interceptor = AuthInterceptor::new(transport, Arc::clone(&session), navigator);
        let authorized: Arc<dyn Transport> = Arc::new(interceptor.clone());

        debug!(
            authenticated = session.is_authenticated(),
            "Client initialized"
        );

        Self {
            session,
            interceptor,
            auth: AuthApi::new(Arc::clone(&authorized)),
            messages: MessagesApi::new(authorized),
        }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn messages(&self) -> &MessagesApi {
        &self.messages
    }

    /// The credential-carrying transport, for endpoints without a typed wrapper
    pub fn interceptor(&self) -> &AuthInterceptor {
        &self.interceptor
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    pub async fn login(&self, username: &str, password: &str) -> ApiResult<()> {
        self.session.login(username, password).await
    }

    pub async fn logout(&self) {
        self.session.logout().await
    }

    pub async fn current_user(&self) -> ApiResult<CurrentUser> {
        self.auth.current_user().await
    }

    /// What the interface should offer right now
    ///
    /// Without a session no request is made and nothing is granted.
    pub async fn current_permissions(&self) -> ApiResult<Permissions> {
        if !self.session.is_authenticated() {
            return Ok(permissions(None));
        }

        let user = self.current_user().await?;
        let granted = Permissions::for_user(Some(&user));
        info!(username = %user.username, role = %user.role, read_only = granted.is_read_only, "Resolved permissions");
        Ok(granted)
    }
}
