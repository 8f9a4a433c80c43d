//! HTTP transport on top of reqwest

use async_trait::async_trait;
use msgdesk_core::{ApiConfig, DeskError, ErrorContext};
use tracing::{debug, info};

use super::{ApiRequest, ApiResponse, Transport};
use crate::{ApiError, ApiResult};

/// Sends requests to the message service over HTTP
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let client = create_http_client(config)?;

        info!("Created HTTP transport for {}", config.base_url);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let url = self.url_for(&request.path);
        debug!(method = %request.method, url = %url, "Sending HTTP request");

        let mut builder = self.client.request(request.method.clone(), &url);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::transport(format!("{} {}", request.method, url), e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::transport(format!("reading body of {}", url), e))?;

        Ok(ApiResponse::new(status, body.to_vec()))
    }
}

/// Helper function to create HTTP client with common configuration
pub(crate) fn create_http_client(config: &ApiConfig) -> ApiResult<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();

    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_str(&config.user_agent).map_err(|e| {
            DeskError::Config {
                message: format!("Invalid user agent: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_client").with_operation("create_client"),
            }
        })?,
    );
    headers.insert(
        reqwest::header::ACCEPT,
        reqwest::header::HeaderValue::from_static("application/json"),
    );

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_seconds))
        .default_headers(headers)
        .build()
        .map_err(|e| DeskError::Network {
            message: format!("Failed to create HTTP client: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("http_client").with_operation("create_client"),
        })?;

    Ok(client)
}
