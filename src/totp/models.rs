use std::fmt;

use secrecy::{ExposeSecret, SecretSlice};
use serde::{Deserialize, Serialize};
use totp_rs::{Algorithm, Secret, TOTP};
use tracing::warn;

use super::MfaError;

pub const DEFAULT_DIGITS: usize = 6;
pub const DEFAULT_STEP_SECONDS: u64 = 30;
/// Length of freshly generated secrets (160 bits, the HMAC-SHA1 block output).
pub const SECRET_LEN: usize = 20;
/// Shortest secret accepted when restoring a stored one.
pub const MIN_SECRET_LEN: usize = 16;

/// Codes within one step either side of the current one are accepted.
pub(crate) const SKEW_STEPS: u8 = 1;

/// Lifecycle of an account's second factor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MfaState {
    NotEnrolled,
    PendingVerification,
    Enrolled,
}

impl MfaState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotEnrolled => "not_enrolled",
            Self::PendingVerification => "pending_verification",
            Self::Enrolled => "enrolled",
        }
    }

    #[must_use]
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim() {
            "not_enrolled" => Some(Self::NotEnrolled),
            "pending_verification" => Some(Self::PendingVerification),
            "enrolled" => Some(Self::Enrolled),
            _ => None,
        }
    }
}

impl fmt::Display for MfaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared TOTP secret and the parameters the authenticator app was given.
#[derive(Debug)]
pub struct MfaSecret {
    secret: SecretSlice<u8>,
    issuer: String,
    account: String,
    digits: usize,
    step: u64,
}

impl MfaSecret {
    pub(crate) fn new(
        secret: Vec<u8>,
        issuer: &str,
        account: &str,
        digits: usize,
        step: u64,
    ) -> Result<Self, MfaError> {
        if !(6..=8).contains(&digits) {
            return Err(MfaError::InvalidDigits(digits));
        }
        if step == 0 {
            return Err(MfaError::InvalidStep);
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(MfaError::InvalidSecret);
        }
        if issuer.is_empty() || account.is_empty() || issuer.contains(':') || account.contains(':')
        {
            return Err(MfaError::InvalidLabel);
        }
        Ok(Self {
            secret: SecretSlice::from(secret),
            issuer: issuer.to_string(),
            account: account.to_string(),
            digits,
            step,
        })
    }

    /// Restore a secret persisted via [`MfaSecret::secret_base32`].
    ///
    /// # Errors
    ///
    /// Returns [`MfaError::InvalidSecret`] if `encoded` is not base32 or is
    /// too short, and parameter errors as for enrollment.
    pub fn from_base32(
        encoded: &str,
        issuer: &str,
        account: &str,
        digits: usize,
        step: u64,
    ) -> Result<Self, MfaError> {
        let normalized: String = encoded
            .chars()
            .filter(|ch| !ch.is_whitespace() && *ch != '=')
            .map(|ch| ch.to_ascii_uppercase())
            .collect();
        let bytes = Secret::Encoded(normalized)
            .to_bytes()
            .map_err(|_| MfaError::InvalidSecret)?;
        Self::new(bytes, issuer, account, digits, step)
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    #[must_use]
    pub fn digits(&self) -> usize {
        self.digits
    }

    #[must_use]
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Unpadded RFC 4648 base32 form, as shown to authenticator apps.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored parameters are rejected by the TOTP
    /// engine, which [`MfaSecret::new`] already rules out.
    pub fn secret_base32(&self) -> Result<String, MfaError> {
        Ok(self.totp()?.get_secret_base32())
    }

    pub(crate) fn totp(&self) -> Result<TOTP, MfaError> {
        TOTP::new(
            Algorithm::SHA1,
            self.digits,
            SKEW_STEPS,
            self.step,
            self.secret.expose_secret().to_vec(),
            Some(self.issuer.clone()),
            self.account.clone(),
        )
        .map_err(|err| {
            warn!("TOTP init error: {err}");
            MfaError::InvalidSecret
        })
    }
}

/// A secret together with the account's enrollment state. Callers persist
/// both and hand them back on every MFA operation.
#[derive(Debug)]
pub struct MfaEnrollment {
    secret: MfaSecret,
    state: MfaState,
}

impl MfaEnrollment {
    pub(crate) fn pending(secret: MfaSecret) -> Self {
        Self {
            secret,
            state: MfaState::PendingVerification,
        }
    }

    /// Rebuild an enrollment from persisted parts.
    ///
    /// # Errors
    ///
    /// Returns [`MfaError::InvalidState`] for [`MfaState::NotEnrolled`]: an
    /// account without a secret has nothing to restore.
    pub fn restore(secret: MfaSecret, state: MfaState) -> Result<Self, MfaError> {
        if state == MfaState::NotEnrolled {
            return Err(MfaError::InvalidState(state));
        }
        Ok(Self { secret, state })
    }

    #[must_use]
    pub fn secret(&self) -> &MfaSecret {
        &self.secret
    }

    #[must_use]
    pub fn state(&self) -> MfaState {
        self.state
    }

    pub(crate) fn mark_enrolled(&mut self) {
        self.state = MfaState::Enrolled;
    }
}

/// Result of starting enrollment.
#[derive(Debug)]
pub struct GeneratedSecret {
    pub enrollment: MfaEnrollment,
    pub provisioning_uri: String,
}
