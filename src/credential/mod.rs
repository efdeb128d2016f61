//! Salted password hashing.
//!
//! Credentials are derived with Argon2id over a fresh 16-byte salt from the OS
//! RNG. The cost parameters travel with each [`Credential`] so a stored hash
//! keeps verifying after the configured [`KdfParams`] are raised.
//!
//! Stored form is a PHC-style string:
//! `$argon2id$v=19$m=<kib>,t=<iterations>,p=<lanes>$<salt>$<hash>`.

pub mod pool;

pub use pool::HashingPool;

use argon2::{Algorithm, Argon2, Params, Version};
use base64ct::{Base64Unpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, warn};

pub const SALT_LEN: usize = 16;

/// Upper bounds on accepted cost parameters. A stored credential carries its
/// own costs, so these keep a corrupted record from forcing a huge derivation.
pub const MAX_MEMORY_KIB: u32 = 1024 * 1024;
pub const MAX_ITERATIONS: u32 = 64;
pub const MAX_PARALLELISM: u32 = 64;

const PHC_ID: &str = "argon2id";
const PHC_VERSION: &str = "v=19";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("malformed credential")]
    Malformed,
    #[error("credential salt too short")]
    SaltTooShort,
    #[error("invalid kdf parameters")]
    InvalidParams,
    #[error("key derivation failed")]
    Derivation,
    #[error("hashing worker unavailable")]
    WorkerUnavailable,
}

/// Argon2id cost parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    pub output_len: usize,
}

impl Default for KdfParams {
    // OWASP baseline for Argon2id: 19 MiB, 2 passes, 1 lane.
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
            output_len: 32,
        }
    }
}

impl KdfParams {
    #[must_use]
    pub fn with_memory_kib(mut self, memory_kib: u32) -> Self {
        self.memory_kib = memory_kib;
        self
    }

    #[must_use]
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    #[must_use]
    pub fn with_parallelism(mut self, parallelism: u32) -> Self {
        self.parallelism = parallelism;
        self
    }

    #[must_use]
    pub fn with_output_len(mut self, output_len: usize) -> Self {
        self.output_len = output_len;
        self
    }

    fn argon2(&self) -> Result<Argon2<'static>, CredentialError> {
        if self.memory_kib > MAX_MEMORY_KIB
            || self.iterations > MAX_ITERATIONS
            || self.parallelism > MAX_PARALLELISM
        {
            return Err(CredentialError::InvalidParams);
        }
        let params = Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(self.output_len),
        )
        .map_err(|_| CredentialError::InvalidParams)?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// A stored password: salt, derived hash and the parameters used to derive it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
    salt: Vec<u8>,
    hash: Vec<u8>,
    params: KdfParams,
}

impl Credential {
    #[must_use]
    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    #[must_use]
    pub fn hash(&self) -> &[u8] {
        &self.hash
    }

    #[must_use]
    pub fn params(&self) -> &KdfParams {
        &self.params
    }

    /// Encode as a PHC-style string suitable for storage.
    #[must_use]
    pub fn to_phc_string(&self) -> String {
        format!(
            "${PHC_ID}${PHC_VERSION}$m={},t={},p={}${}${}",
            self.params.memory_kib,
            self.params.iterations,
            self.params.parallelism,
            Base64Unpadded::encode_string(&self.salt),
            Base64Unpadded::encode_string(&self.hash),
        )
    }

    /// Parse a string produced by [`Credential::to_phc_string`].
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Malformed`] if the string is not a valid
    /// Argon2id PHC string, [`CredentialError::SaltTooShort`] if the salt is
    /// under [`SALT_LEN`] bytes, and [`CredentialError::InvalidParams`] if the
    /// embedded cost parameters are out of range.
    pub fn from_phc_string(encoded: &str) -> Result<Self, CredentialError> {
        let mut parts = encoded.split('$');
        if parts.next() != Some("") || parts.next() != Some(PHC_ID) {
            return Err(CredentialError::Malformed);
        }
        if parts.next() != Some(PHC_VERSION) {
            return Err(CredentialError::Malformed);
        }
        let cost = parts.next().ok_or(CredentialError::Malformed)?;
        let salt_b64 = parts.next().ok_or(CredentialError::Malformed)?;
        let hash_b64 = parts.next().ok_or(CredentialError::Malformed)?;
        if parts.next().is_some() {
            return Err(CredentialError::Malformed);
        }

        let (memory_kib, iterations, parallelism) = parse_cost(cost)?;
        let salt = Base64Unpadded::decode_vec(salt_b64).map_err(|_| CredentialError::Malformed)?;
        let hash = Base64Unpadded::decode_vec(hash_b64).map_err(|_| CredentialError::Malformed)?;

        let params = KdfParams {
            memory_kib,
            iterations,
            parallelism,
            output_len: hash.len(),
        };
        Self::from_parts(salt, hash, params)
    }

    /// Rebuild a credential from its raw components.
    ///
    /// # Errors
    ///
    /// Returns an error if the salt is too short, the hash length disagrees
    /// with `params.output_len`, or the parameters are invalid.
    pub fn from_parts(
        salt: Vec<u8>,
        hash: Vec<u8>,
        params: KdfParams,
    ) -> Result<Self, CredentialError> {
        if salt.len() < SALT_LEN {
            return Err(CredentialError::SaltTooShort);
        }
        if hash.len() != params.output_len {
            return Err(CredentialError::Malformed);
        }
        params.argon2()?;
        Ok(Self { salt, hash, params })
    }
}

fn parse_cost(cost: &str) -> Result<(u32, u32, u32), CredentialError> {
    let mut fields = cost.split(',');
    let mut next = |key: &str| -> Result<u32, CredentialError> {
        fields
            .next()
            .and_then(|field| field.strip_prefix(key))
            .and_then(|value| value.parse().ok())
            .ok_or(CredentialError::Malformed)
    };
    let memory_kib = next("m=")?;
    let iterations = next("t=")?;
    let parallelism = next("p=")?;
    if fields.next().is_some() {
        return Err(CredentialError::Malformed);
    }
    Ok((memory_kib, iterations, parallelism))
}

/// Derives and verifies password credentials.
#[derive(Clone, Debug)]
pub struct CredentialHasher {
    params: KdfParams,
}

impl CredentialHasher {
    /// # Errors
    ///
    /// Returns [`CredentialError::InvalidParams`] if Argon2 rejects `params`.
    pub fn new(params: KdfParams) -> Result<Self, CredentialError> {
        params.argon2()?;
        Ok(Self { params })
    }

    #[must_use]
    pub fn params(&self) -> &KdfParams {
        &self.params
    }

    /// Hash `password` under a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Derivation`] if Argon2 fails.
    pub fn hash(&self, password: &str) -> Result<Credential, CredentialError> {
        let mut salt = vec![0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);

        let hash = derive(password.as_bytes(), &salt, &self.params)?;
        debug!(
            memory_kib = self.params.memory_kib,
            iterations = self.params.iterations,
            "derived new credential"
        );

        Ok(Credential {
            salt,
            hash,
            params: self.params,
        })
    }

    /// Check `password` against a stored credential in constant time.
    ///
    /// # Errors
    ///
    /// Returns an error only when the credential itself cannot be used
    /// (invalid parameters or a failed derivation); a wrong password is
    /// `Ok(false)`.
    pub fn verify(&self, password: &str, credential: &Credential) -> Result<bool, CredentialError> {
        if credential.salt.len() < SALT_LEN {
            warn!("credential salt too short");
            return Err(CredentialError::SaltTooShort);
        }
        let candidate = derive(password.as_bytes(), &credential.salt, &credential.params)?;
        Ok(candidate.ct_eq(&credential.hash).into())
    }

    /// Parse a stored PHC string and verify `password` against it.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Malformed`] (or a more specific variant) if
    /// `encoded` is not a usable credential.
    pub fn verify_encoded(&self, password: &str, encoded: &str) -> Result<bool, CredentialError> {
        let credential = Credential::from_phc_string(encoded).inspect_err(|err| {
            warn!(error = %err, "rejecting stored credential");
        })?;
        self.verify(password, &credential)
    }
}

fn derive(password: &[u8], salt: &[u8], params: &KdfParams) -> Result<Vec<u8>, CredentialError> {
    let argon2 = params.argon2()?;
    let mut out = vec![0u8; params.output_len];
    argon2
        .hash_password_into(password, salt, &mut out)
        .map_err(|_| CredentialError::Derivation)?;
    Ok(out)
}
