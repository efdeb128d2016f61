use thiserror::Error;

use crate::{config::ConfigError, credential::CredentialError, token::TokenError, totp::MfaError};

/// Any failure raised through [`crate::Sentinel`].
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Mfa(#[from] MfaError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
