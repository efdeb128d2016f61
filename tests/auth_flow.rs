#![allow(clippy::unwrap_used)]

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use secrecy::SecretSlice;
use sentinel::{
    Claims, Credential, KdfParams, MfaError, MfaService, MfaState, RoleStore, Sentinel,
    SentinelConfig, TokenError, Violation,
};

fn sentinel() -> Sentinel {
    let kdf = KdfParams::default().with_memory_kib(64).with_iterations(1);
    let config = SentinelConfig::new(SecretSlice::from(b"an-hmac-key-of-at-least-32-bytes!".to_vec()))
        .with_kdf(kdf);
    Sentinel::new(config, Arc::new(RoleStore::new())).unwrap()
}

fn now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap()
}

#[test]
fn register_login_and_authorize() {
    let sentinel = sentinel();
    sentinel.define_role("admin", ["users:read", "users:write"]);

    let weak = sentinel.validate_password("short1!");
    assert!(!weak.valid);
    assert_eq!(
        weak.violations,
        vec![Violation::TooShort, Violation::MissingUppercase]
    );

    let password = "Password123!";
    assert!(sentinel.validate_password(password).valid);

    // Stored as text, loaded back later.
    let stored = sentinel.hash_password(password).unwrap().to_phc_string();
    let credential = Credential::from_phc_string(&stored).unwrap();
    assert!(sentinel.verify_password(password, &credential).unwrap());
    assert!(!sentinel.verify_password("Password123?", &credential).unwrap());

    let token = sentinel
        .issue_token(&Claims::new("u1", "admin"), Duration::from_secs(3600))
        .unwrap();
    let claims = sentinel.verify_token(&token).unwrap();
    assert_eq!(claims.sub(), "u1");
    assert_eq!(claims.role(), "admin");
    assert!(claims.exp > claims.iat);

    assert!(sentinel.check_permission(claims.role(), "users:write"));
    assert!(!sentinel.check_permission("missing", "users:read"));
    assert!(sentinel.authorize(&token, "users:read").unwrap());
}

#[test]
fn zero_ttl_token_is_expired() {
    let sentinel = sentinel();
    let token = sentinel
        .issue_token(&Claims::new("u1", "admin"), Duration::ZERO)
        .unwrap();
    assert!(matches!(
        sentinel.verify_token(&token),
        Err(TokenError::Expired)
    ));
}

#[test]
fn tokens_from_another_key_are_rejected() {
    let issuer = sentinel();
    let other = Sentinel::new(
        SentinelConfig::new(SecretSlice::from(vec![1u8; 32])),
        Arc::new(RoleStore::new()),
    )
    .unwrap();

    let token = other
        .issue_session_token(&Claims::new("mallory", "admin"))
        .unwrap();
    assert!(matches!(
        issuer.verify_token(&token),
        Err(TokenError::SignatureMismatch)
    ));
}

#[test]
fn mfa_enrollment_then_challenge() {
    let sentinel = sentinel();
    let codes = MfaService::default();

    let generated = sentinel.generate_mfa_secret("alice", Some("Acme")).unwrap();
    let secret_b32 = generated.enrollment.secret().secret_base32().unwrap();
    assert_eq!(
        generated.provisioning_uri,
        format!("otpauth://totp/Acme:alice?secret={secret_b32}&issuer=Acme&digits=6&period=30")
    );

    let mut enrollment = generated.enrollment;
    assert!(matches!(
        sentinel.challenge_mfa(&enrollment, "000000"),
        Err(MfaError::NotEnrolled(MfaState::PendingVerification))
    ));

    assert!(!sentinel.verify_mfa_enrollment(&mut enrollment, "12345").unwrap());
    assert_eq!(enrollment.state(), MfaState::PendingVerification);

    let code = codes.code_at(enrollment.secret(), now()).unwrap();
    assert!(sentinel.verify_mfa_enrollment(&mut enrollment, &code).unwrap());
    assert_eq!(enrollment.state(), MfaState::Enrolled);

    let code = codes.code_at(enrollment.secret(), now()).unwrap();
    assert!(sentinel.challenge_mfa(&enrollment, &code).unwrap());
}

#[tokio::test]
async fn hashing_pool_matches_inline_hasher() {
    let sentinel = sentinel();
    let pool = sentinel.hashing_pool(4);

    let credential = pool
        .hash(secrecy::SecretString::from("Password123!".to_string()))
        .await
        .unwrap();
    assert!(sentinel.verify_password("Password123!", &credential).unwrap());
    assert!(pool
        .verify(secrecy::SecretString::from("Password123!".to_string()), credential)
        .await
        .unwrap());
}
