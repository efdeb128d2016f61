use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("signature mismatch")]
    SignatureMismatch,
    #[error("token expired")]
    Expired,
    #[error("reserved claim: {0}")]
    ReservedClaim(String),
    #[error("invalid token ttl")]
    InvalidTtl,
    #[error("signing key shorter than {0} bytes")]
    WeakKey(usize),
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
}

impl TokenError {
    /// Whether the caller should ask the user to log in again rather than
    /// treat the request as tampered.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired)
    }
}
