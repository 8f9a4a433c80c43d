//! Test helpers: a scripted in-process message service and a counting navigator

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use msgdesk_client::api::{
    ApiRequest, ApiResponse, Transport, CURRENT_USER_PATH, LOGIN_PATH, LOGOUT_PATH, MESSAGES_PATH,
    REFRESH_PATH,
};
use msgdesk_client::{ApiError, ApiResult, Client, MemoryTokenStorage};
use msgdesk_core::{
    Message, Navigator, ProblemDetail, TokenResponse, TokenStorage, ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
};
use reqwest::{Method, StatusCode};
use serde_json::json;
use tokio::sync::Barrier;

// Make sure tracing is only initialized once
static TRACING: LazyLock<()> = LazyLock::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(std::io::sink)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
});

pub fn init_tracing() {
    LazyLock::force(&TRACING);
}

/// A request as the fake service saw it
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
    pub retried: bool,
}

struct FakeState {
    access: Option<String>,
    refresh: Option<String>,
    username: String,
    role: String,
    generation: u32,
    messages: Vec<Message>,
    next_id: i64,
    requests: Vec<Recorded>,
}

/// In-process stand-in for the message service
///
/// Valid credentials are `admin`/`admin123` and `viewer`/`viewer123`. Token
/// pairs are numbered: login issues `a1`/`r1`, each refresh the next pair.
pub struct FakeApi {
    state: Mutex<FakeState>,
    refresh_calls: AtomicUsize,
    unauthorized_gate: Option<Barrier>,
    refresh_delay: Duration,
    refresh_rejects: bool,
    logout_fails: bool,
    reject_every_bearer: bool,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                access: None,
                refresh: None,
                username: String::new(),
                role: String::new(),
                generation: 0,
                messages: vec![
                    message(1, "GREETING", "Hello world"),
                    message(2, "FAREWELL", "Goodbye"),
                ],
                next_id: 3,
                requests: Vec::new(),
            }),
            refresh_calls: AtomicUsize::new(0),
            unauthorized_gate: None,
            refresh_delay: Duration::ZERO,
            refresh_rejects: false,
            logout_fails: false,
            reject_every_bearer: false,
        }
    }

    /// The service holds `r1` for an admin whose access token has expired
    pub fn with_expired_session(self) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.refresh = Some("r1".to_string());
            state.username = "admin".to_string();
            state.role = "ADMIN".to_string();
            state.generation = 1;
        }
        self
    }

    /// Hold back 401 answers until `n` of them are pending
    pub fn with_unauthorized_gate(mut self, n: usize) -> Self {
        self.unauthorized_gate = Some(Barrier::new(n));
        self
    }

    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    pub fn with_refresh_rejected(mut self) -> Self {
        self.refresh_rejects = true;
        self
    }

    pub fn with_logout_failing(mut self) -> Self {
        self.logout_fails = true;
        self
    }

    /// Every bearer is refused, even freshly issued ones
    pub fn with_every_bearer_rejected(mut self) -> Self {
        self.reject_every_bearer = true;
        self
    }

    /// Replace the seeded messages
    pub fn with_messages(self, messages: Vec<Message>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.next_id = messages.iter().map(|m| m.id).max().unwrap_or(0) + 1;
            state.messages = messages;
        }
        self
    }

    /// Issue the next pair as if another client sharing the session had
    /// refreshed; not counted in `refresh_calls`
    pub fn rotate_tokens(&self) -> TokenResponse {
        let mut state = self.state.lock().unwrap();
        state.generation += 1;
        issue_tokens(&mut state)
            .and_then(ApiResponse::into_json)
            .unwrap()
    }

    /// Stop accepting the current access token; the refresh token stays valid
    pub fn expire_access_token(&self) {
        self.state.lock().unwrap().access = Some("revoked".to_string());
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    pub fn requests_to_prefix(&self, prefix: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.starts_with(prefix))
            .collect()
    }

    fn login(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        let body = request.body.clone().unwrap_or_default();
        let role = match (body["username"].as_str(), body["password"].as_str()) {
            (Some("admin"), Some("admin123")) => "ADMIN",
            (Some("viewer"), Some("viewer123")) => "VIEWER",
            _ => return problem(StatusCode::UNAUTHORIZED, "Bad credentials"),
        };

        let mut state = self.state.lock().unwrap();
        state.username = body["username"].as_str().unwrap_or_default().to_string();
        state.role = role.to_string();
        state.generation = 1;
        issue_tokens(&mut state)
    }

    async fn refresh(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if !self.refresh_delay.is_zero() {
            tokio::time::sleep(self.refresh_delay).await;
        }
        if self.refresh_rejects {
            return problem(StatusCode::UNAUTHORIZED, "Refresh token expired");
        }

        let body = request.body.clone().unwrap_or_default();
        let mut state = self.state.lock().unwrap();
        if body["refreshToken"].as_str() != state.refresh.as_deref() {
            return problem(StatusCode::UNAUTHORIZED, "Unknown refresh token");
        }
        state.generation += 1;
        issue_tokens(&mut state)
    }

    fn logout(&self) -> ApiResult<ApiResponse> {
        if self.logout_fails {
            return Err(ApiError::Transport {
                message: "connection refused".to_string(),
                source: None,
            });
        }
        let mut state = self.state.lock().unwrap();
        state.access = None;
        state.refresh = None;
        Ok(ApiResponse::new(StatusCode::NO_CONTENT, Vec::new()))
    }

    fn authorized(&self, request: &ApiRequest) -> bool {
        let state = self.state.lock().unwrap();
        !self.reject_every_bearer && request.bearer.is_some() && request.bearer == state.access
    }

    fn resource(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        let mut state = self.state.lock().unwrap();
        let path = request.path.as_str();
        let id = path
            .strip_prefix(MESSAGES_PATH)
            .and_then(|rest| rest.strip_prefix('/'))
            .and_then(|id| id.parse::<i64>().ok());

        if request.method == Method::GET && path == CURRENT_USER_PATH {
            return ApiResponse::json(
                StatusCode::OK,
                &json!({"username": state.username, "role": state.role}),
            );
        }
        if request.method == Method::GET && path == MESSAGES_PATH {
            return ApiResponse::json(StatusCode::OK, &state.messages);
        }
        if request.method == Method::GET {
            return match id.and_then(|id| state.messages.iter().find(|m| m.id == id)) {
                Some(found) => ApiResponse::json(StatusCode::OK, found),
                None => problem(StatusCode::NOT_FOUND, "Message not found"),
            };
        }

        if state.role != "ADMIN" {
            return problem(StatusCode::FORBIDDEN, "Access denied");
        }

        let body = request.body.clone().unwrap_or_default();
        let code = body["code"].as_str().unwrap_or_default().to_string();
        let content = body["content"].as_str().unwrap_or_default().to_string();

        if request.method == Method::POST && path == MESSAGES_PATH {
            if state.messages.iter().any(|m| m.code == code) {
                return problem(
                    StatusCode::CONFLICT,
                    &format!("Message with code {} already exists", code),
                );
            }
            let created = message(state.next_id, &code, &content);
            state.next_id += 1;
            state.messages.push(created.clone());
            return ApiResponse::json(StatusCode::CREATED, &created);
        }

        let Some(index) = id.and_then(|id| state.messages.iter().position(|m| m.id == id)) else {
            return problem(StatusCode::NOT_FOUND, "Message not found");
        };

        if request.method == Method::PUT {
            let updated = message(state.messages[index].id, &code, &content);
            state.messages[index] = updated.clone();
            ApiResponse::json(StatusCode::OK, &updated)
        } else if request.method == Method::DELETE {
            state.messages.remove(index);
            Ok(ApiResponse::new(StatusCode::NO_CONTENT, Vec::new()))
        } else {
            problem(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
        }
    }
}

#[async_trait]
impl Transport for FakeApi {
    async fn send(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        self.state.lock().unwrap().requests.push(Recorded {
            method: request.method.clone(),
            path: request.path.clone(),
            bearer: request.bearer.clone(),
            retried: request.retried,
        });

        if request.method == Method::POST && request.path == LOGIN_PATH {
            return self.login(&request);
        }
        if request.method == Method::POST && request.path == REFRESH_PATH {
            return self.refresh(&request).await;
        }
        if request.method == Method::POST && request.path == LOGOUT_PATH {
            return self.logout();
        }

        if !self.authorized(&request) {
            if let Some(gate) = &self.unauthorized_gate {
                gate.wait().await;
            }
            return problem(StatusCode::UNAUTHORIZED, "Full authentication is required");
        }
        self.resource(&request)
    }
}

fn issue_tokens(state: &mut FakeState) -> ApiResult<ApiResponse> {
    let tokens = TokenResponse {
        access_token: format!("a{}", state.generation),
        refresh_token: format!("r{}", state.generation),
        token_type: "Bearer".to_string(),
        expires_in: 3600,
    };
    state.access = Some(tokens.access_token.clone());
    state.refresh = Some(tokens.refresh_token.clone());
    ApiResponse::json(StatusCode::OK, &tokens)
}

fn problem(status: StatusCode, detail: &str) -> ApiResult<ApiResponse> {
    ApiResponse::json(
        status,
        &ProblemDetail {
            title: status.canonical_reason().map(str::to_string),
            status: Some(status.as_u16()),
            detail: Some(detail.to_string()),
            ..Default::default()
        },
    )
}

pub fn message(id: i64, code: &str, content: &str) -> Message {
    Message {
        id,
        code: code.to_string(),
        content: content.to_string(),
        created_at: None,
        updated_at: None,
    }
}

/// Navigator that counts login redirects
#[derive(Debug, Default)]
pub struct CountingNavigator {
    redirects: AtomicUsize,
}

impl CountingNavigator {
    pub fn count(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Navigator for CountingNavigator {
    fn redirect_to_login(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}

/// Storage holding a token pair whose access token the service no longer accepts
pub fn expired_storage() -> Arc<MemoryTokenStorage> {
    Arc::new(MemoryTokenStorage::with_entries(&[
        (ACCESS_TOKEN_KEY, "expired"),
        (REFRESH_TOKEN_KEY, "r1"),
    ]))
}

pub struct TestClient {
    pub client: Client,
    pub api: Arc<FakeApi>,
    pub storage: Arc<MemoryTokenStorage>,
    pub navigator: Arc<CountingNavigator>,
}

impl TestClient {
    pub fn stored(&self, key: &str) -> Option<String> {
        self.storage.get(key).unwrap()
    }
}

pub fn spawn_client(api: FakeApi, storage: Arc<MemoryTokenStorage>) -> TestClient {
    init_tracing();

    let api = Arc::new(api);
    let navigator = Arc::new(CountingNavigator::default());
    let client = Client::with_transport(api.clone(), storage.clone(), navigator.clone());

    TestClient {
        client,
        api,
        storage,
        navigator,
    }
}
