//! Compact `header.payload.signature` wire encoding.
//!
//! Every segment is base64url without padding. Decoding failures of any kind
//! collapse into [`TokenError::Malformed`].

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{de::DeserializeOwned, Serialize};

use super::TokenError;

pub(crate) struct Segments<'a> {
    pub header: &'a str,
    pub payload: &'a str,
    pub signature: &'a str,
}

impl Segments<'_> {
    /// Bytes covered by the signature: `header "." payload`.
    pub fn signing_input(&self) -> String {
        format!("{}.{}", self.header, self.payload)
    }
}

pub(crate) fn split(token: &str) -> Result<Segments<'_>, TokenError> {
    let mut parts = token.split('.');
    let header = parts.next().ok_or(TokenError::Malformed)?;
    let payload = parts.next().ok_or(TokenError::Malformed)?;
    let signature = parts.next().ok_or(TokenError::Malformed)?;
    if parts.next().is_some() || header.is_empty() || payload.is_empty() || signature.is_empty()
    {
        return Err(TokenError::Malformed);
    }
    Ok(Segments {
        header,
        payload,
        signature,
    })
}

pub(crate) fn b64e(bytes: &[u8]) -> String {
    Base64UrlUnpadded::encode_string(bytes)
}

pub(crate) fn b64d(segment: &str) -> Result<Vec<u8>, TokenError> {
    Base64UrlUnpadded::decode_vec(segment).map_err(|_| TokenError::Malformed)
}

pub(crate) fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value)?;
    Ok(b64e(&json))
}

pub(crate) fn b64d_json<T: DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = b64d(segment)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}
