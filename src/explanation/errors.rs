
/// Errors from an explanation backend; any of these send the caller to the rule-based fallback
#[derive(thiserror::Error, Debug)]
pub enum ExplanationError {
    #[error("no API credential was provided")]
    MissingCredential,
    #[error("request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String)
}
