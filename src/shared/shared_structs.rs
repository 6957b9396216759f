// src/shared/shared_structs.rs

use serde::Serialize;

/// Envelope used for health checks, confirmations and error bodies.
/// `body` is omitted from the JSON when it is `None`.
#[derive(Serialize)]
pub struct GenericResponse<T> {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<T>,
}

impl GenericResponse<()> {
    pub fn error(message: impl Into<String>) -> Self {
        GenericResponse {
            status: "error".to_string(),
            message: message.into(),
            body: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        GenericResponse {
            status: "success".to_string(),
            message: message.into(),
            body: None,
        }
    }
}
