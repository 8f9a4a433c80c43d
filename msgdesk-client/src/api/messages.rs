//! Message CRUD endpoints

use std::sync::Arc;

use msgdesk_core::Message;
use tracing::info;

use super::{ApiRequest, Transport, MESSAGES_PATH};
use crate::validation::MessageForm;
use crate::{ApiError, ApiResult};

/// Client for `/api/messages`
///
/// Meant to sit on top of the request interceptor so that every call carries
/// the current bearer and survives an access token expiring.
#[derive(Clone)]
pub struct MessagesApi {
    transport: Arc<dyn Transport>,
}

impl MessagesApi {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn list(&self) -> ApiResult<Vec<Message>> {
        self.transport
            .send(ApiRequest::get(MESSAGES_PATH))
            .await?
            .into_json()
    }

    pub async fn get(&self, id: i64) -> ApiResult<Message> {
        self.transport
            .send(ApiRequest::get(message_path(id)))
            .await?
            .into_json()
    }

    /// Create a message; the form is validated before anything is sent
    pub async fn create(&self, form: MessageForm) -> ApiResult<Message> {
        let body = form
            .into_request()
            .map_err(|errors| ApiError::InvalidInput { errors })?;
        let request = ApiRequest::post(MESSAGES_PATH).with_json(&body)?;

        let created: Message = self.transport.send(request).await?.into_json()?;
        info!(id = created.id, code = %created.code, "Created message");
        Ok(created)
    }

    /// Replace code and content of an existing message
    pub async fn update(&self, id: i64, form: MessageForm) -> ApiResult<Message> {
        let body = form
            .into_request()
            .map_err(|errors| ApiError::InvalidInput { errors })?;
        let request = ApiRequest::put(message_path(id)).with_json(&body)?;

        let updated: Message = self.transport.send(request).await?.into_json()?;
        info!(id = updated.id, "Updated message");
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        self.transport
            .send(ApiRequest::delete(message_path(id)))
            .await?
            .error_for_status()?;
        info!(id, "Deleted message");
        Ok(())
    }
}

fn message_path(id: i64) -> String {
    format!("{}/{}", MESSAGES_PATH, id)
}
