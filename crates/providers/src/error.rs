/// Errors from external service clients.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The client is missing configuration it needs (e.g. an API key).
    #[error("Provider not configured: {0}")]
    Config(String),

    /// A local input file does not exist.
    #[error("File not found: {0}")]
    MissingFile(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Provider API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The remote resource exists but may not be read with the given credentials.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// The remote resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The service answered successfully but produced no usable text.
    #[error("Provider returned an empty result")]
    EmptyResult,

    /// The response body did not have the expected shape.
    #[error("Unexpected provider response: {0}")]
    UnexpectedResponse(String),
}

/// Ensure the response has a success status code. Returns the response
/// unchanged on success, or a [`ProviderError::Api`] containing the status
/// and body text on failure.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(ProviderError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}
