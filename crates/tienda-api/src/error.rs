use thiserror::Error;

/// Generic message shown when the server gave nothing more specific.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Something went wrong while processing your request. Please try again.";

/// One `field: message` pair from a structured validation response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors returned by the storefront API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A request body could not be serialized.
    #[error("could not encode request body for {context}: {source}")]
    Encode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The server refused the payload with field-level messages.
    #[error("request rejected with HTTP {status}: {}", join_fields(.fields))]
    Rejected { status: u16, fields: Vec<FieldError> },

    /// The record being created already exists.
    #[error("record already exists: {}", join_fields(.fields))]
    Conflict { fields: Vec<FieldError> },

    #[error("resource not found: {url}")]
    NotFound { url: String },

    /// Credentials were refused (401/403) and no refresh was possible.
    #[error("not authorized (HTTP {status})")]
    Unauthorized { status: u16 },

    /// The access token expired and refreshing it failed; tokens were cleared.
    #[error("session expired, please log in again")]
    SessionExpired,

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error(transparent)]
    Storage(#[from] tienda_core::StorageError),
}

impl ApiError {
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict { .. })
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    /// Message suitable for showing to the shopper: the joined field errors
    /// when the server sent any, otherwise a generic retry prompt.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Rejected { fields, .. } | ApiError::Conflict { fields }
                if !fields.is_empty() =>
            {
                join_fields(fields)
            }
            ApiError::SessionExpired => self.to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

fn join_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Flattens a validation body such as `{"rut": ["already exists."]}` or
/// `{"detail": "Not found."}` into field/message pairs.
///
/// Non-object bodies yield no pairs.
#[must_use]
pub fn parse_field_errors(body: &serde_json::Value) -> Vec<FieldError> {
    let Some(map) = body.as_object() else {
        return Vec::new();
    };
    map.iter()
        .map(|(field, value)| FieldError {
            field: field.clone(),
            message: flatten_message(value),
        })
        .collect()
}

fn flatten_message(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(flatten_message)
            .collect::<Vec<_>>()
            .join(" "),
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{k}: {}", flatten_message(v)))
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    }
}

/// Whether the field messages describe a duplicate-key rejection.
pub(crate) fn mentions_existing_record(fields: &[FieldError]) -> bool {
    fields.iter().any(|f| {
        let msg = f.message.to_lowercase();
        msg.contains("already exists") || msg.contains("ya existe")
    })
}
