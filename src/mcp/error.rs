#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("handshake with tool server {url} failed: {message}")]
    Initialization { url: String, message: String },
    #[error("tool server error {code}: {message}")]
    Rpc { code: i32, message: String },
    #[error("tool server request failed: {0}")]
    Service(String),
}

impl From<rmcp::ServiceError> for McpError {
    fn from(err: rmcp::ServiceError) -> Self {
        match err {
            rmcp::ServiceError::McpError(data) => McpError::Rpc {
                code: data.code.0,
                message: data.message.to_string(),
            },
            other => McpError::Service(other.to_string()),
        }
    }
}
