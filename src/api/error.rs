use thiserror::Error;

pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Text shown to the user for a failed action.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { message, .. } if !message.is_empty() => message.clone(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Pull the human-readable reason out of an error body. The backend uses
/// `{"error": ...}` for failures and `{"message": ...}` elsewhere.
pub(crate) fn error_message_from_body(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["error", "message", "msg"] {
            if let Some(text) = value.get(field).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    body.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_from_body() {
        assert_eq!(
            error_message_from_body(r#"{"error": "Invalid username or password"}"#),
            "Invalid username or password"
        );
        assert_eq!(error_message_from_body(r#"{"msg": "Token has expired"}"#), "Token has expired");
        assert_eq!(error_message_from_body("  Bad Gateway \n"), "Bad Gateway");
    }

    #[test]
    fn test_user_message_falls_back_to_generic() {
        let err = ApiError::Status {
            status: 500,
            message: String::new(),
        };
        assert_eq!(err.user_message(), GENERIC_FAILURE);

        let err = ApiError::Status {
            status: 400,
            message: "Username already exists".into(),
        };
        assert_eq!(err.user_message(), "Username already exists");
        assert_eq!(err.status(), Some(400));
    }
}
