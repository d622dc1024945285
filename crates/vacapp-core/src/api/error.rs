use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Non-2xx response. `message` is what callers see; `server_message` is
    /// the body's own `message` field, kept for token checks.
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        server_message: Option<String>,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to encode request body: {0}")]
    Encode(serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error messages the server uses for a stale or invalid bearer token,
/// compared lowercased.
const TOKEN_INVALID_MESSAGES: &[&str] = &[
    "token inválido",
    "token invalido",
    "invalid token",
    "token expirado",
    "token expired",
];

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let cut: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
            format!("{}... (truncated, {} total bytes)", cut, body.len())
        }
    }

    /// Build the error for a failed response from its status and raw body.
    ///
    /// The body is expected to look like `{"message": ..., "error": ...}`.
    /// Anything else, including non-JSON bodies, counts as an empty object
    /// and yields the generic `Error <status>` message.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
        let field = |name: &str| {
            parsed
                .get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let server_message = field("message");
        let message = server_message
            .clone()
            .or_else(|| field("error"))
            .unwrap_or_else(|| format!("Error {}", status.as_u16()));

        ApiError::Http {
            status: status.as_u16(),
            message,
            server_message,
        }
    }

    /// HTTP status of the failed response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Whether the server rejected the bearer token as invalid or expired.
    /// Only the body's `message` field counts, never `error`.
    pub fn is_token_invalid(&self) -> bool {
        match self {
            ApiError::Http {
                server_message: Some(message),
                ..
            } => {
                let normalized = message.trim().trim_end_matches('.').to_lowercase();
                TOKEN_INVALID_MESSAGES.contains(&normalized.as_str())
            }
            _ => false,
        }
    }
}
