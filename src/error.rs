use reqwest::StatusCode;

/// Failure of the persisted key-value store. Prior state is left intact.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage write failed: {0}")]
    Write(String),
    #[error("storage file is not valid JSON: {0}")]
    Corrupt(String),
    #[error("failed to encode results: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failure of a call to the proxy (or of reading the local input it needs).
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("API error: {status}")]
    Status { status: StatusCode, body: String },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a locally executed tool.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
}

/// Failure of the local audio recording session.
#[derive(Debug, thiserror::Error)]
pub enum RecordingError {
    #[error("no input device found")]
    NoDevice,
    #[error("no audio captured")]
    Empty,
    #[error("audio device error: {0}")]
    Device(String),
    #[error("failed to encode WAV: {0}")]
    Encode(#[from] hound::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_renders_code() {
        let err = ProxyError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".into(),
        };
        assert_eq!(err.to_string(), "API error: 500 Internal Server Error");
    }

    #[test]
    fn tool_error_messages() {
        assert_eq!(
            ToolError::NotFound("lookup".into()).to_string(),
            "tool not found: lookup"
        );
    }
}
