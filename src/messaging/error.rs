use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessagingErrorCode {
    ConfigurationMissing,
    PermissionDenied,
    TransportInitFailed,
    NetworkFailure,
    MalformedPayload,
    UnsupportedBrowser,
    NotInitialized,
    WorkerRegistrationFailed,
    TokenRequestFailed,
    NotificationFailed,
    InvalidArgument,
    Internal,
}

impl MessagingErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessagingErrorCode::ConfigurationMissing => "messaging/configuration-missing",
            MessagingErrorCode::PermissionDenied => "messaging/permission-denied",
            MessagingErrorCode::TransportInitFailed => "messaging/transport-init-failed",
            MessagingErrorCode::NetworkFailure => "messaging/network-failure",
            MessagingErrorCode::MalformedPayload => "messaging/malformed-payload",
            MessagingErrorCode::UnsupportedBrowser => "messaging/unsupported-browser",
            MessagingErrorCode::NotInitialized => "messaging/not-initialized",
            MessagingErrorCode::WorkerRegistrationFailed => {
                "messaging/worker-registration-failed"
            }
            MessagingErrorCode::TokenRequestFailed => "messaging/token-request-failed",
            MessagingErrorCode::NotificationFailed => "messaging/notification-failed",
            MessagingErrorCode::InvalidArgument => "messaging/invalid-argument",
            MessagingErrorCode::Internal => "messaging/internal",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessagingError {
    pub code: MessagingErrorCode,
    message: String,
}

impl MessagingError {
    pub fn new(code: MessagingErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for MessagingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl std::error::Error for MessagingError {}

pub type MessagingResult<T> = Result<T, MessagingError>;

pub fn configuration_missing(message: impl Into<String>) -> MessagingError {
    MessagingError::new(MessagingErrorCode::ConfigurationMissing, message)
}

pub fn permission_denied(message: impl Into<String>) -> MessagingError {
    MessagingError::new(MessagingErrorCode::PermissionDenied, message)
}

pub fn transport_init_failed(message: impl Into<String>) -> MessagingError {
    MessagingError::new(MessagingErrorCode::TransportInitFailed, message)
}

pub fn network_failure(message: impl Into<String>) -> MessagingError {
    MessagingError::new(MessagingErrorCode::NetworkFailure, message)
}

pub fn malformed_payload(message: impl Into<String>) -> MessagingError {
    MessagingError::new(MessagingErrorCode::MalformedPayload, message)
}

pub fn unsupported_browser(message: impl Into<String>) -> MessagingError {
    MessagingError::new(MessagingErrorCode::UnsupportedBrowser, message)
}

pub fn not_initialized(message: impl Into<String>) -> MessagingError {
    MessagingError::new(MessagingErrorCode::NotInitialized, message)
}

pub fn worker_registration_failed(message: impl Into<String>) -> MessagingError {
    MessagingError::new(MessagingErrorCode::WorkerRegistrationFailed, message)
}

pub fn token_request_failed(message: impl Into<String>) -> MessagingError {
    MessagingError::new(MessagingErrorCode::TokenRequestFailed, message)
}

pub fn notification_failed(message: impl Into<String>) -> MessagingError {
    MessagingError::new(MessagingErrorCode::NotificationFailed, message)
}

pub fn invalid_argument(message: impl Into<String>) -> MessagingError {
    MessagingError::new(MessagingErrorCode::InvalidArgument, message)
}

pub fn internal_error(message: impl Into<String>) -> MessagingError {
    MessagingError::new(MessagingErrorCode::Internal, message)
}
