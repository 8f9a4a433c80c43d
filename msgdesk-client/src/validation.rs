//! Message form validation

use msgdesk_core::{Message, MessageRequest};
use serde::{Deserialize, Serialize};

pub const CODE_MAX_CHARS: usize = 50;
pub const CONTENT_MAX_CHARS: usize = 500;

/// A rejected field and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Data entered for creating or editing a message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageForm {
    pub code: String,
    pub content: String,
}

impl MessageForm {
    pub fn new(code: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            content: content.into(),
        }
    }

    /// Pre-filled form for editing an existing message
    pub fn from_message(message: &Message) -> Self {
        Self::new(message.code.clone(), message.content.clone())
    }

    /// Check every field; lengths count characters, not bytes
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        match self.code.chars().count() {
            0 => errors.push(FieldError::new("code", "Code is required")),
            n if n > CODE_MAX_CHARS => errors.push(FieldError::new(
                "code",
                "Code must be 50 characters or less",
            )),
            _ => {}
        }

        match self.content.chars().count() {
            0 => errors.push(FieldError::new("content", "Content is required")),
            n if n > CONTENT_MAX_CHARS => errors.push(FieldError::new(
                "content",
                "Content must be 500 characters or less",
            )),
            _ => {}
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and convert into the request body
    pub fn into_request(self) -> Result<MessageRequest, Vec<FieldError>> {
        self.validate()?;
        Ok(MessageRequest {
            code: self.code,
            content: self.content,
        })
    }
}
