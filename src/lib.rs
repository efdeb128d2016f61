//! # Sentinel (Credential & Session Security Core)
//!
//! `sentinel` holds the pieces an authentication service needs between the
//! wire and the database: deciding whether a password is acceptable, storing
//! it, issuing and checking session tokens, answering "may this role do that",
//! and running a TOTP second factor.
//!
//! ## Passwords
//!
//! [`policy::validate`] reports every rule a password breaks, in a fixed
//! order, so a UI can list them all at once. Accepted passwords are derived
//! with **Argon2id** over a random salt ([`CredentialHasher`]); verification
//! recomputes the hash with the stored parameters and compares in constant
//! time. [`HashingPool`] moves that work off async worker threads.
//!
//! ## Tokens
//!
//! Session tokens are compact HS256 JWTs carrying `sub`, `role`, caller claims,
//! `iat` and `exp`. A token is valid on `[iat, exp)`: a zero lifetime yields a
//! token that is already expired. Tampering with any byte is reported as a
//! signature mismatch, never as expiry.
//!
//! ## Authorization
//!
//! [`RoleStore`] maps roles to exact permission strings. Unknown roles and
//! unknown permissions are denied. The store is shared by `Arc` and safe to
//! update while other threads read it.
//!
//! ## Second factor
//!
//! [`MfaService`] implements RFC 6238 (SHA-1, 6 digits, 30 second steps by
//! default, one step of drift either way). Enrollment stays pending until the
//! user proves possession with a valid code.
//!
//! ## Configuration
//!
//! [`SentinelConfig::from_env`] reads `SENTINEL_*` variables; only
//! `SENTINEL_TOKEN_SECRET` is required.

pub mod config;
pub mod credential;
pub mod error;
pub mod policy;
pub mod rbac;
pub mod sentinel;
pub mod token;
pub mod totp;

pub use config::{ConfigError, MfaConfig, SentinelConfig, TokenConfig};
pub use credential::{Credential, CredentialError, CredentialHasher, HashingPool, KdfParams};
pub use error::{Error, Result};
pub use policy::{PasswordPolicy, PolicyReport, SpecialChars, Violation};
pub use rbac::RoleStore;
pub use sentinel::Sentinel;
pub use token::{Claims, TokenError, TokenService, VerifiedClaims};
pub use totp::{GeneratedSecret, MfaEnrollment, MfaError, MfaSecret, MfaService, MfaState};
