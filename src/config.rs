//! Runtime configuration.
//!
//! Everything has a default except the token signing key. [`SentinelConfig::from_env`]
//! reads the `SENTINEL_*` variables; builders cover programmatic setup.

use std::{env, str::FromStr, time::Duration};

use secrecy::SecretSlice;
use thiserror::Error;

use crate::{
    credential::KdfParams,
    policy::PasswordPolicy,
    totp::models::{DEFAULT_DIGITS, DEFAULT_STEP_SECONDS},
};

pub const ENV_TOKEN_SECRET: &str = "SENTINEL_TOKEN_SECRET";
pub const ENV_TOKEN_TTL_SECONDS: &str = "SENTINEL_TOKEN_TTL_SECONDS";
pub const ENV_TOKEN_LEEWAY_SECONDS: &str = "SENTINEL_TOKEN_LEEWAY_SECONDS";
pub const ENV_MFA_ISSUER: &str = "SENTINEL_MFA_ISSUER";
pub const ENV_MFA_DIGITS: &str = "SENTINEL_MFA_DIGITS";
pub const ENV_MFA_STEP_SECONDS: &str = "SENTINEL_MFA_STEP_SECONDS";
pub const ENV_PASSWORD_MIN_LENGTH: &str = "SENTINEL_PASSWORD_MIN_LENGTH";
pub const ENV_KDF_ITERATIONS: &str = "SENTINEL_KDF_ITERATIONS";
pub const ENV_KDF_MEMORY_KIB: &str = "SENTINEL_KDF_MEMORY_KIB";
pub const ENV_KDF_OUTPUT_LENGTH: &str = "SENTINEL_KDF_OUTPUT_LENGTH";

const DEFAULT_TOKEN_TTL_SECONDS: u64 = 24 * 60 * 60;
const DEFAULT_MFA_ISSUER: &str = "Sentinel";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug)]
pub struct TokenConfig {
    pub secret: SecretSlice<u8>,
    pub ttl: Duration,
    pub leeway: Duration,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MfaConfig {
    pub issuer: String,
    pub digits: usize,
    pub step: u64,
}

impl Default for MfaConfig {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_MFA_ISSUER.to_string(),
            digits: DEFAULT_DIGITS,
            step: DEFAULT_STEP_SECONDS,
        }
    }
}

#[derive(Debug)]
pub struct SentinelConfig {
    pub password_policy: PasswordPolicy,
    pub kdf: KdfParams,
    pub token: TokenConfig,
    pub mfa: MfaConfig,
}

impl SentinelConfig {
    #[must_use]
    pub fn new(token_secret: SecretSlice<u8>) -> Self {
        Self {
            password_policy: PasswordPolicy::default(),
            kdf: KdfParams::default(),
            token: TokenConfig {
                secret: token_secret,
                ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECONDS),
                leeway: Duration::ZERO,
            },
            mfa: MfaConfig::default(),
        }
    }

    #[must_use]
    pub fn with_password_policy(mut self, policy: PasswordPolicy) -> Self {
        self.password_policy = policy;
        self
    }

    #[must_use]
    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    #[must_use]
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_token_leeway(mut self, leeway: Duration) -> Self {
        self.token.leeway = leeway;
        self
    }

    #[must_use]
    pub fn with_mfa(mut self, mfa: MfaConfig) -> Self {
        self.mfa = mfa;
        self
    }

    /// Load configuration from `SENTINEL_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if `SENTINEL_TOKEN_SECRET` is unset or
    /// empty, and [`ConfigError::Invalid`] if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = env::var(ENV_TOKEN_SECRET)
            .ok()
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::Missing(ENV_TOKEN_SECRET))?;

        let mut config = Self::new(SecretSlice::from(secret.into_bytes()));

        if let Some(seconds) = parse_var::<u64>(ENV_TOKEN_TTL_SECONDS)? {
            config.token.ttl = Duration::from_secs(seconds);
        }
        if let Some(seconds) = parse_var::<u64>(ENV_TOKEN_LEEWAY_SECONDS)? {
            config.token.leeway = Duration::from_secs(seconds);
        }
        if let Ok(issuer) = env::var(ENV_MFA_ISSUER) {
            if !issuer.is_empty() {
                config.mfa.issuer = issuer;
            }
        }
        if let Some(digits) = parse_var(ENV_MFA_DIGITS)? {
            config.mfa.digits = digits;
        }
        if let Some(step) = parse_var(ENV_MFA_STEP_SECONDS)? {
            config.mfa.step = step;
        }
        if let Some(min_length) = parse_var(ENV_PASSWORD_MIN_LENGTH)? {
            config.password_policy = config.password_policy.with_min_length(min_length);
        }
        if let Some(iterations) = parse_var(ENV_KDF_ITERATIONS)? {
            config.kdf = config.kdf.with_iterations(iterations);
        }
        if let Some(memory_kib) = parse_var(ENV_KDF_MEMORY_KIB)? {
            config.kdf = config.kdf.with_memory_kib(memory_kib);
        }
        if let Some(output_len) = parse_var(ENV_KDF_OUTPUT_LENGTH)? {
            config.kdf = config.kdf.with_output_len(output_len);
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(None),
    }
}
