//! One entry point wiring the policy, hasher, token service, role store and
//! TOTP service from a single [`SentinelConfig`].

use std::{sync::Arc, time::Duration};

use tracing::{debug, info, instrument, warn};

use crate::{
    config::SentinelConfig,
    credential::{Credential, CredentialError, CredentialHasher, HashingPool},
    error::Result,
    policy::{self, PasswordPolicy, PolicyReport},
    rbac::RoleStore,
    token::{Claims, TokenError, TokenService, VerifiedClaims},
    totp::{GeneratedSecret, MfaEnrollment, MfaError, MfaService},
};

#[derive(Debug)]
pub struct Sentinel {
    policy: PasswordPolicy,
    hasher: CredentialHasher,
    tokens: TokenService,
    session_ttl: Duration,
    roles: Arc<RoleStore>,
    mfa: MfaService,
    mfa_issuer: String,
}

impl Sentinel {
    /// # Errors
    ///
    /// Fails if the KDF parameters, the token key or the MFA digits/step are
    /// rejected by their components.
    pub fn new(config: SentinelConfig, roles: Arc<RoleStore>) -> Result<Self> {
        let hasher = CredentialHasher::new(config.kdf)?;
        let tokens = TokenService::new(config.token.secret)?.with_leeway(config.token.leeway);
        let mfa = MfaService::new(config.mfa.digits, config.mfa.step)?;

        info!(
            min_password_length = config.password_policy.min_length,
            token_ttl_seconds = config.token.ttl.as_secs(),
            mfa_digits = config.mfa.digits,
            "sentinel initialized"
        );

        Ok(Self {
            policy: config.password_policy,
            hasher,
            tokens,
            session_ttl: config.token.ttl,
            roles,
            mfa,
            mfa_issuer: config.mfa.issuer,
        })
    }

    #[must_use]
    pub fn roles(&self) -> &Arc<RoleStore> {
        &self.roles
    }

    #[must_use]
    pub fn password_policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    /// Worker pool sharing this instance's hasher, for async callers.
    #[must_use]
    pub fn hashing_pool(&self, max_concurrent: usize) -> HashingPool {
        HashingPool::new(self.hasher.clone(), max_concurrent)
    }

    #[instrument(skip_all)]
    pub fn validate_password(&self, password: &str) -> PolicyReport {
        let report = policy::validate(password, &self.policy);
        if !report.valid {
            debug!(violations = ?report.violations, "password rejected by policy");
        }
        report
    }

    /// # Errors
    ///
    /// See [`CredentialHasher::hash`].
    #[instrument(skip_all)]
    pub fn hash_password(&self, password: &str) -> Result<Credential, CredentialError> {
        self.hasher.hash(password)
    }

    /// # Errors
    ///
    /// See [`CredentialHasher::verify`]. A wrong password is `Ok(false)`.
    #[instrument(skip_all)]
    pub fn verify_password(
        &self,
        password: &str,
        credential: &Credential,
    ) -> Result<bool, CredentialError> {
        self.hasher.verify(password, credential)
    }

    /// # Errors
    ///
    /// See [`TokenService::issue`].
    #[instrument(skip_all, fields(sub = %claims.sub, role = %claims.role))]
    pub fn issue_token(&self, claims: &Claims, ttl: Duration) -> Result<String, TokenError> {
        self.tokens.issue(claims, ttl)
    }

    /// Issue a token with the configured session lifetime.
    ///
    /// # Errors
    ///
    /// See [`TokenService::issue`].
    pub fn issue_session_token(&self, claims: &Claims) -> Result<String, TokenError> {
        self.issue_token(claims, self.session_ttl)
    }

    /// # Errors
    ///
    /// See [`TokenService::verify`].
    #[instrument(skip_all)]
    pub fn verify_token(&self, token: &str) -> Result<VerifiedClaims, TokenError> {
        self.tokens.verify(token)
    }

    pub fn define_role<I, P>(&self, name: impl Into<String>, permissions: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.roles.define_role(name, permissions);
    }

    #[must_use]
    pub fn check_permission(&self, role: &str, permission: &str) -> bool {
        self.roles.check_permission(role, permission)
    }

    /// Verify `token` and check its role for `permission`.
    ///
    /// # Errors
    ///
    /// Any token verification failure. An authentic token whose role lacks
    /// the permission is `Ok(false)`.
    #[instrument(skip(self, token))]
    pub fn authorize(&self, token: &str, permission: &str) -> Result<bool, TokenError> {
        let claims = self.tokens.verify(token).inspect_err(|err| {
            warn!(error = %err, "token rejected");
        })?;
        let granted = self.roles.check_permission(claims.role(), permission);
        if !granted {
            info!(sub = %claims.sub(), role = %claims.role(), "permission denied");
        }
        Ok(granted)
    }

    /// Start enrollment for `account`. `issuer` defaults to the configured one.
    ///
    /// # Errors
    ///
    /// See [`MfaService::generate_secret`].
    #[instrument(skip(self))]
    pub fn generate_mfa_secret(
        &self,
        account: &str,
        issuer: Option<&str>,
    ) -> Result<GeneratedSecret, MfaError> {
        self.mfa
            .generate_secret(account, issuer.unwrap_or(&self.mfa_issuer))
    }

    /// # Errors
    ///
    /// See [`MfaService::verify_enrollment`].
    #[instrument(skip_all, fields(account = %enrollment.secret().account()))]
    pub fn verify_mfa_enrollment(
        &self,
        enrollment: &mut MfaEnrollment,
        code: &str,
    ) -> Result<bool, MfaError> {
        self.mfa.verify_enrollment(enrollment, code)
    }

    /// # Errors
    ///
    /// See [`MfaService::challenge`].
    #[instrument(skip_all, fields(account = %enrollment.secret().account()))]
    pub fn challenge_mfa(&self, enrollment: &MfaEnrollment, code: &str) -> Result<bool, MfaError> {
        self.mfa.challenge(enrollment, code)
    }
}
