//! Bounded, off-thread credential hashing.
//!
//! Argon2 is deliberately expensive. Request handlers should not run it inline
//! on an async worker, so [`HashingPool`] hands each derivation to tokio's
//! blocking pool while a semaphore caps how many run at once.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Semaphore;
use tracing::{debug, error};

use super::{Credential, CredentialError, CredentialHasher};

#[derive(Clone, Debug)]
pub struct HashingPool {
    hasher: Arc<CredentialHasher>,
    permits: Arc<Semaphore>,
}

impl HashingPool {
    /// Create a pool allowing at most `max_concurrent` derivations at a time
    /// (at least one).
    #[must_use]
    pub fn new(hasher: CredentialHasher, max_concurrent: usize) -> Self {
        Self {
            hasher: Arc::new(hasher),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Hash `password` on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::WorkerUnavailable`] if the pool was closed or
    /// the worker panicked, otherwise any error from [`CredentialHasher::hash`].
    pub async fn hash(&self, password: SecretString) -> Result<Credential, CredentialError> {
        self.run(move |hasher| hasher.hash(password.expose_secret()))
            .await
    }

    /// Verify `password` against `credential` on the blocking pool.
    ///
    /// # Errors
    ///
    /// Same as [`HashingPool::hash`], plus errors from [`CredentialHasher::verify`].
    pub async fn verify(
        &self,
        password: SecretString,
        credential: Credential,
    ) -> Result<bool, CredentialError> {
        self.run(move |hasher| hasher.verify(password.expose_secret(), &credential))
            .await
    }

    /// Stop handing out new permits; pending and future calls fail.
    pub fn close(&self) {
        self.permits.close();
    }

    async fn run<T, F>(&self, job: F) -> Result<T, CredentialError>
    where
        T: Send + 'static,
        F: FnOnce(&CredentialHasher) -> Result<T, CredentialError> + Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| CredentialError::WorkerUnavailable)?;
        debug!(available = self.permits.available_permits(), "hashing permit acquired");

        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || {
            // held until the derivation finishes, even if the caller stops waiting
            let _permit = permit;
            job(&hasher)
        })
        .await
        .map_err(|err| {
            error!("hashing worker failed: {err}");
            CredentialError::WorkerUnavailable
        })?
    }
}
