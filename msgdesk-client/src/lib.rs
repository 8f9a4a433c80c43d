//! Msgdesk client - session handling for the message service API
//!
//! This crate owns the authentication side of a message CRUD front end:
//! - Session manager holding the token pair and its persistence
//! - Request interceptor with transparent single-flight token refresh
//! - Permission model mapping roles to what the interface offers
//! - Typed message and auth endpoints, form validation and list paging

pub mod api;
pub mod client;
pub mod error;
pub mod interceptor;
pub mod listing;
pub mod permissions;
pub mod session;
pub mod validation;

pub use api::{ApiRequest, ApiResponse, AuthApi, HttpTransport, MessagesApi, Transport};
pub use client::Client;
pub use error::{ApiError, ApiResult, ErrorCategory};
pub use interceptor::AuthInterceptor;
pub use listing::{page_window, ListPage, ListQuery, PageItem, SortDirection, SortField};
pub use permissions::{permissions, Capability, Permissions};
pub use session::{
    FileTokenStorage, MemoryTokenStorage, SessionManager, SessionStatus, StatusReceiver,
};
pub use validation::{FieldError, MessageForm};

// Re-export core types for convenience
pub use msgdesk_core::{
    ClientConfig, CurrentUser, Message, Navigator, NoopNavigator, Role, TokenResponse,
    TokenStorage,
};
