#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The body is not JSON, or is JSON but not an object.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl From<serde_json::Error> for ValidationError {
    fn from(err: serde_json::Error) -> Self {
        ValidationError::MalformedPayload(err.to_string())
    }
}
