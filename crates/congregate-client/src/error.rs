use std::fmt;

use congregate_types::api::ErrorBody;

/// Shown when the backend rejects a registration because the user exists.
pub const CONFLICT_MESSAGE: &str =
    "Error: User with your email/phone number already exists. Please log in!";

/// Shown when nothing more specific is known about a failure.
pub const GENERIC_MESSAGE: &str = "Something went wrong. Please try again.";

/// One failed field of a form validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Every way a pipeline call can fail.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// 401 on an authenticated call or no usable session. The session guard
    /// has already been told.
    #[error("not authenticated")]
    Auth,
    #[error("entity already exists")]
    Conflict { message: Option<String> },
    #[error("server returned {status}")]
    Server {
        status: u16,
        body: Option<ErrorBody>,
    },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    /// The caller abandoned the request before it resolved.
    #[error("request cancelled")]
    Cancelled,
}

impl RequestError {
    /// Text suitable for a notification.
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth => "Your session has expired. Please log in again.".to_string(),
            Self::Conflict { .. } => CONFLICT_MESSAGE.to_string(),
            Self::Server { body, .. } => match body.as_ref().and_then(|b| b.message.as_deref()) {
                Some(message) => format!("Error: {}", message),
                None => GENERIC_MESSAGE.to_string(),
            },
            Self::Network(_) | Self::Decode(_) | Self::Cancelled => GENERIC_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_verbatim() {
        let err = RequestError::Server {
            status: 400,
            body: Some(ErrorBody {
                status: Some("INVALID".into()),
                message: Some("phone number is invalid".into()),
            }),
        };
        assert_eq!(err.user_message(), "Error: phone number is invalid");
    }

    #[test]
    fn test_server_message_fallback() {
        let err = RequestError::Server {
            status: 502,
            body: None,
        };
        assert_eq!(err.user_message(), GENERIC_MESSAGE);
    }

    #[test]
    fn test_conflict_message() {
        let err = RequestError::Conflict { message: None };
        assert_eq!(err.user_message(), CONFLICT_MESSAGE);
    }
}
