//! Time-based one-time codes (RFC 6238) for second-factor checks.
//!
//! Per account the factor moves `NotEnrolled → PendingVerification → Enrolled`.
//! The crate never stores the secret or the state; callers persist the
//! [`MfaEnrollment`] they get back and pass it into every call.

pub mod models;
pub mod service;

pub use models::{GeneratedSecret, MfaEnrollment, MfaSecret, MfaState};
pub use service::MfaService;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MfaError {
    #[error("mfa not enrolled (state: {0})")]
    NotEnrolled(MfaState),
    #[error("invalid mfa state: {0}")]
    InvalidState(MfaState),
    #[error("unsupported digit count: {0}")]
    InvalidDigits(usize),
    #[error("invalid time step")]
    InvalidStep,
    #[error("invalid mfa secret")]
    InvalidSecret,
    #[error("invalid issuer or account label")]
    InvalidLabel,
    #[error("system clock before unix epoch")]
    Clock,
}
