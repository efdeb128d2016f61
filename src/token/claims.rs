use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ALG_HS256: &str = "HS256";
pub const TYP_JWT: &str = "JWT";

/// Claim names owned by the token service; callers cannot set them as extras.
pub const RESERVED_CLAIMS: [&str; 4] = ["sub", "role", "iat", "exp"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
}

impl TokenHeader {
    pub(crate) fn hs256() -> Self {
        Self {
            alg: ALG_HS256.to_string(),
            typ: TYP_JWT.to_string(),
        }
    }
}

/// Caller-supplied claims: who the token is for and which role they act as.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    #[must_use]
    pub fn new(sub: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            role: role.into(),
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    pub(crate) fn reserved_extra(&self) -> Option<&str> {
        self.extra
            .keys()
            .map(String::as_str)
            .find(|name| RESERVED_CLAIMS.contains(name))
    }
}

/// Claims recovered from a token whose signature and lifetime checked out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifiedClaims {
    #[serde(flatten)]
    pub claims: Claims,
    pub iat: i64,
    pub exp: i64,
}

impl VerifiedClaims {
    #[must_use]
    pub fn sub(&self) -> &str {
        &self.claims.sub
    }

    #[must_use]
    pub fn role(&self) -> &str {
        &self.claims.role
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.extra.get(name)
    }
}
