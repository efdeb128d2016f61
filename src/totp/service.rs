use chrono::Utc;
use rand::{rngs::OsRng, RngCore};
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use url::{form_urlencoded, Url};

use super::{
    models::{DEFAULT_DIGITS, DEFAULT_STEP_SECONDS, SECRET_LEN, SKEW_STEPS},
    GeneratedSecret, MfaEnrollment, MfaError, MfaSecret, MfaState,
};

#[derive(Clone, Debug)]
pub struct MfaService {
    digits: usize,
    step: u64,
}

impl Default for MfaService {
    fn default() -> Self {
        Self {
            digits: DEFAULT_DIGITS,
            step: DEFAULT_STEP_SECONDS,
        }
    }
}

impl MfaService {
    /// # Errors
    ///
    /// Returns [`MfaError::InvalidDigits`] unless `digits` is 6, 7 or 8, and
    /// [`MfaError::InvalidStep`] for a zero step.
    pub fn new(digits: usize, step: u64) -> Result<Self, MfaError> {
        if !(6..=8).contains(&digits) {
            return Err(MfaError::InvalidDigits(digits));
        }
        if step == 0 {
            return Err(MfaError::InvalidStep);
        }
        Ok(Self { digits, step })
    }

    #[must_use]
    pub fn digits(&self) -> usize {
        self.digits
    }

    #[must_use]
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Begin enrollment: generate a fresh secret and its provisioning URI.
    ///
    /// The returned enrollment is in [`MfaState::PendingVerification`].
    ///
    /// # Errors
    ///
    /// Returns [`MfaError::InvalidLabel`] if `issuer` or `account` is empty or
    /// contains `:`.
    pub fn generate_secret(&self, account: &str, issuer: &str) -> Result<GeneratedSecret, MfaError> {
        let mut bytes = vec![0u8; SECRET_LEN];
        OsRng.fill_bytes(&mut bytes);

        let secret = MfaSecret::new(bytes, issuer, account, self.digits, self.step)?;
        let provisioning_uri = provisioning_uri(&secret)?;
        info!(%issuer, "mfa enrollment started");

        Ok(GeneratedSecret {
            enrollment: MfaEnrollment::pending(secret),
            provisioning_uri,
        })
    }

    /// Confirm enrollment with the first code from the user's authenticator.
    ///
    /// On success the enrollment moves to [`MfaState::Enrolled`]; on failure it
    /// stays pending. Re-confirming an enrolled factor checks the code the same
    /// way and leaves the state untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored secret is unusable.
    pub fn verify_enrollment(
        &self,
        enrollment: &mut MfaEnrollment,
        code: &str,
    ) -> Result<bool, MfaError> {
        self.verify_enrollment_at(enrollment, code, unix_now()?)
    }

    /// [`MfaService::verify_enrollment`] at an explicit Unix time.
    ///
    /// # Errors
    ///
    /// Same as [`MfaService::verify_enrollment`].
    pub fn verify_enrollment_at(
        &self,
        enrollment: &mut MfaEnrollment,
        code: &str,
        unix_time: u64,
    ) -> Result<bool, MfaError> {
        let accepted = check_code(enrollment.secret(), code, unix_time)?;

        // An enrollment is never NotEnrolled: `restore` refuses it.
        if enrollment.state() == MfaState::Enrolled {
            if !accepted {
                warn!("mfa re-confirmation code rejected");
            }
            return Ok(accepted);
        }

        if accepted {
            enrollment.mark_enrolled();
            info!("mfa enrollment confirmed");
            Ok(true)
        } else {
            warn!("mfa enrollment code rejected");
            Ok(false)
        }
    }

    /// Check a login-time code. Only valid once the factor is enrolled.
    ///
    /// # Errors
    ///
    /// Returns [`MfaError::NotEnrolled`] with the current state if the factor
    /// has not completed enrollment.
    pub fn challenge(&self, enrollment: &MfaEnrollment, code: &str) -> Result<bool, MfaError> {
        self.challenge_at(enrollment, code, unix_now()?)
    }

    /// [`MfaService::challenge`] at an explicit Unix time.
    ///
    /// # Errors
    ///
    /// Same as [`MfaService::challenge`].
    pub fn challenge_at(
        &self,
        enrollment: &MfaEnrollment,
        code: &str,
        unix_time: u64,
    ) -> Result<bool, MfaError> {
        if enrollment.state() != MfaState::Enrolled {
            return Err(MfaError::NotEnrolled(enrollment.state()));
        }
        let accepted = check_code(enrollment.secret(), code, unix_time)?;
        if !accepted {
            warn!("mfa challenge rejected");
        }
        Ok(accepted)
    }

    /// The code an authenticator would display at `unix_time`.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret's parameters are unusable.
    pub fn code_at(&self, secret: &MfaSecret, unix_time: u64) -> Result<String, MfaError> {
        Ok(secret.totp()?.generate(unix_time))
    }
}

/// Accepts the code for the step containing `unix_time` or either neighbour.
/// Steps before the epoch do not exist, so the window is clipped at zero.
fn check_code(secret: &MfaSecret, code: &str, unix_time: u64) -> Result<bool, MfaError> {
    if code.len() != secret.digits() || !code.bytes().all(|b| b.is_ascii_digit()) {
        debug!("mfa code has wrong shape");
        return Ok(false);
    }

    let totp = secret.totp()?;
    let step = secret.step();
    let counter = unix_time / step;
    let skew = u64::from(SKEW_STEPS);

    let mut matched = 0u8;
    for candidate in counter.saturating_sub(skew)..=counter.saturating_add(skew) {
        let Some(time) = candidate.checked_mul(step) else {
            break;
        };
        matched |= totp
            .generate(time)
            .as_bytes()
            .ct_eq(code.as_bytes())
            .unwrap_u8();
    }
    Ok(matched == 1)
}

/// `otpauth://totp/{issuer}:{account}?secret=..&issuer=..&digits=..&period=..`
fn provisioning_uri(secret: &MfaSecret) -> Result<String, MfaError> {
    let mut uri = Url::parse("otpauth://totp/").map_err(|_| MfaError::InvalidLabel)?;
    uri.set_path(&format!("/{}:{}", secret.issuer(), secret.account()));
    let query = format!(
        "secret={}&issuer={}&digits={}&period={}",
        secret.secret_base32()?,
        query_value(secret.issuer()),
        secret.digits(),
        secret.step()
    );
    uri.set_query(Some(&query));
    Ok(uri.to_string())
}

/// Percent-encodes a query value with `%20` for spaces, matching the label.
fn query_value(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn unix_now() -> Result<u64, MfaError> {
    u64::try_from(Utc::now().timestamp()).map_err(|_| MfaError::Clock)
}
