//! Error taxonomy for CRM API calls.
//!
//! ERROR HANDLING
//! ==============
//! Status codes are classified per endpoint family: a 401 on login means bad
//! credentials, while a 401 on a protected read means the credential is
//! missing or expired. Callers always receive the error; nothing here retries.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

/// Errors produced by [`CrmApi`](super::api::CrmApi) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// No response was received (connection refused, timeout, TLS failure).
    #[error("network error: {0}")]
    Network(String),

    /// Login rejected the supplied credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Registration rejected the submitted fields.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Registration collided with an existing account.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A protected endpoint was called without a valid credential.
    #[error("not authenticated: {0}")]
    Unauthenticated(String),

    /// Any other non-success status.
    #[error("server error: status {status}")]
    Server { status: u16, body: String },

    /// A success response body could not be decoded.
    #[error("response parse failed: {0}")]
    Parse(String),

    /// Login succeeded but the response carried no credential.
    #[error("no token received from login response")]
    MissingToken,

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

/// Which endpoint family a failed status came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Endpoint {
    Login,
    Register,
    Protected,
}

impl ApiError {
    /// Stable machine-readable code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Network(_) => "E_NETWORK",
            Self::Auth(_) => "E_AUTH",
            Self::Validation(_) => "E_VALIDATION",
            Self::Conflict(_) => "E_CONFLICT",
            Self::Unauthenticated(_) => "E_UNAUTHENTICATED",
            Self::Server { .. } => "E_SERVER",
            Self::Parse(_) => "E_PARSE",
            Self::MissingToken => "E_MISSING_TOKEN",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    /// What the server said about the failure, if it said anything.
    #[must_use]
    pub fn server_text(&self) -> Option<String> {
        match self {
            Self::Auth(msg) | Self::Validation(msg) | Self::Conflict(msg) | Self::Unauthenticated(msg)
                if !msg.trim().is_empty() =>
            {
                Some(msg.clone())
            }
            Self::Server { body, .. } if !body.trim().is_empty() => Some(server_message(body)),
            _ => None,
        }
    }

    /// Text suitable for an inline form error.
    ///
    /// Prefers what the server said; falls back to a generic sentence.
    #[must_use]
    pub fn message(&self) -> String {
        if let Some(text) = self.server_text() {
            return text;
        }
        match self {
            Self::Auth(_) => "Invalid email or password",
            Self::Validation(_) => "Please check the form and try again",
            Self::Conflict(_) => "An account with this email already exists",
            Self::Unauthenticated(_) => "Please log in again",
            Self::Network(_) => "Unable to reach the server",
            _ => "An error occurred",
        }
        .to_owned()
    }
}

/// Map a non-success status to the error its endpoint family implies.
pub(crate) fn classify(endpoint: Endpoint, status: u16, body: &str) -> ApiError {
    let message = server_message(body);
    match (endpoint, status) {
        (Endpoint::Login, 400 | 401 | 403) => ApiError::Auth(message),
        (Endpoint::Register, 409) => ApiError::Conflict(message),
        (Endpoint::Register, 400) if mentions_existing_account(&message) => ApiError::Conflict(message),
        (Endpoint::Register, 400 | 422) => ApiError::Validation(message),
        (Endpoint::Protected, 401 | 403) => ApiError::Unauthenticated(message),
        _ => ApiError::Server { status, body: body.to_owned() },
    }
}

/// Extract a human message from an error body: a JSON `message` field when
/// present, otherwise the trimmed text.
pub(crate) fn server_message(body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body)
        && let Some(serde_json::Value::String(message)) = map.get("message")
    {
        return message.clone();
    }
    body.trim().to_owned()
}

fn mentions_existing_account(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("already in use") || lower.contains("already exists") || lower.contains("already registered")
}
