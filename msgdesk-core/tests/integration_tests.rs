//! Integration tests for msgdesk-core infrastructure

use msgdesk_core::{
    config_error, init_logging, storage_error, validation_error, ClientConfig, CurrentUser,
    DeskError, ErrorContext, LogFormat, LoggingConfig, Message, ProblemDetail, Role,
    TokenResponse, SESSION_KEYS,
};

#[test]
fn test_error_handling() {
    let error = storage_error!("Session file is corrupt", "test_component");

    match &error {
        DeskError::Storage {
            message, context, ..
        } => {
            assert_eq!(message, "Session file is corrupt");
            assert_eq!(context.component, "test_component");
            assert!(!context.error_id.is_empty());
        }
        _ => panic!("Expected Storage error"),
    }

    // Logging an error without a subscriber must not panic
    error.log();

    let network_error = DeskError::Network {
        message: "Connection refused".to_string(),
        source: None,
        context: ErrorContext::new("test"),
    };
    assert!(network_error.is_recoverable());

    let config_error = config_error!("Invalid config", "test");
    assert!(!config_error.is_recoverable());
    assert!(config_error
        .context()
        .unwrap()
        .recovery_suggestions
        .iter()
        .any(|s| s.contains("msgdesk config --init")));

    let validation = validation_error!("Code is required", "code", "test");
    match validation {
        DeskError::Validation { field, .. } => assert_eq!(field.as_deref(), Some("code")),
        _ => panic!("Expected Validation error"),
    }
}

#[test]
fn test_error_context_by_variant() {
    let io_error: DeskError = std::io::Error::other("disk full").into();
    assert!(io_error.context().is_none());
    assert!(!io_error.is_recoverable());

    let storage = storage_error!(
        "Cannot write session",
        "session",
        std::io::Error::other("read-only")
    );
    let context = storage.context().unwrap();
    assert_eq!(context.component, "session");
    assert!(context
        .recovery_suggestions
        .iter()
        .any(|s| s.contains("session file")));
    assert!(std::error::Error::source(&storage).is_some());
}

#[test]
fn test_logging_initialization() {
    let config = LoggingConfig {
        level: "debug".to_string(),
        format: LogFormat::Compact,
        include_location: false,
        include_thread: false,
        log_to_file: false,
        log_file_path: None,
        enable_performance_monitoring: false,
        filter_directives: vec!["msgdesk_core=debug".to_string()],
    };

    // Only the first initialisation in a process can succeed
    let _ = init_logging(&config);
    assert!(init_logging(&config).is_err());
}

#[test]
fn test_logging_to_file_requires_path() {
    let config = LoggingConfig {
        log_to_file: true,
        log_file_path: None,
        ..LoggingConfig::default()
    };
    assert!(init_logging(&config).is_err());
}

#[test]
fn test_token_response_wire_format() {
    let json = r#"{"accessToken":"a1","refreshToken":"r1","tokenType":"Bearer","expiresIn":3600}"#;
    let tokens: TokenResponse = serde_json::from_str(json).unwrap();
    assert_eq!(tokens.access_token, "a1");
    assert_eq!(tokens.refresh_token, "r1");
    assert_eq!(tokens.token_type, "Bearer");
    assert_eq!(tokens.expires_in, 3600);
}

#[test]
fn test_message_without_timestamps() {
    let message: Message =
        serde_json::from_str(r#"{"id":7,"code":"GREETING","content":"hello"}"#).unwrap();
    assert_eq!(message.id, 7);
    assert!(message.created_at.is_none());

    let with_times: Message = serde_json::from_str(
        r#"{"id":8,"code":"X","content":"y","createdAt":"2024-05-01T10:00:00Z","updatedAt":"2024-05-02T10:00:00Z"}"#,
    )
    .unwrap();
    assert!(with_times.updated_at.unwrap() > with_times.created_at.unwrap());
}

#[test]
fn test_problem_detail_parsing() {
    let json = r#"{
        "type": "about:blank",
        "title": "Conflict",
        "status": 409,
        "detail": "Message code already exists: GREETING",
        "instance": "/api/messages"
    }"#;
    let problem: ProblemDetail = serde_json::from_str(json).unwrap();
    assert_eq!(problem.status, Some(409));
    assert_eq!(problem.message(), Some("Message code already exists: GREETING"));
    assert!(problem.errors.is_empty());

    let title_only: ProblemDetail = serde_json::from_str(r#"{"title":"Forbidden"}"#).unwrap();
    assert_eq!(title_only.message(), Some("Forbidden"));

    let blank: ProblemDetail = serde_json::from_str(r#"{"detail":"  "}"#).unwrap();
    assert_eq!(blank.message(), None);
}

#[test]
fn test_role_parsing() {
    assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
    assert_eq!("VIEWER".parse::<Role>(), Ok(Role::Viewer));
    assert!("admin".parse::<Role>().is_err());
    assert_eq!(Role::Admin.to_string(), "ADMIN");

    let user = CurrentUser {
        username: "someone".to_string(),
        role: "AUDITOR".to_string(),
    };
    assert_eq!(user.role(), None);
}

#[test]
fn test_session_keys_are_distinct() {
    let mut keys = SESSION_KEYS.to_vec();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 4);
}

#[test]
fn test_env_override_for_base_url() {
    std::env::set_var(msgdesk_core::API_URL_ENV, "http://api.internal:9000");
    let config = ClientConfig::default().with_env_overrides();
    std::env::remove_var(msgdesk_core::API_URL_ENV);
    assert_eq!(config.api.base_url, "http://api.internal:9000");
}
