use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Account, Role},
};

pub const TOKEN_ISSUER: &str = "puchealth.issuer";
pub const TOKEN_AUDIENCE: &str = "puchealth";

/// Claims
///
/// Payload of the bearer tokens minted at login. Every claim is required when a token is
/// validated; `role` must name one of the fixed roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the account id.
    pub sub: Uuid,
    /// Display name of the account.
    pub unique_name: String,
    pub email: String,
    pub role: String,
    pub iss: String,
    pub aud: String,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: usize,
    /// Issued At (iat)
    pub iat: usize,
}

/// TokenIssuer
///
/// Mints and validates HS256 tokens with a process-wide symmetric key. Tokens carry a fixed
/// issuer and audience and expire 24 hours after issue unless a different lifetime is set.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: TimeDelta,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: TimeDelta::hours(24),
        }
    }

    pub fn with_lifetime(mut self, lifetime: TimeDelta) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// issue
    ///
    /// Builds the claims for `account` acting under `role` and signs them.
    pub fn issue(&self, account: &Account, role: Role) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: account.id,
            unique_name: account.name.clone(),
            email: account.email.clone(),
            role: role.name().to_string(),
            iss: TOKEN_ISSUER.to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
            exp: (now + self.lifetime).timestamp().max(0) as usize,
            iat: now.timestamp().max(0) as usize,
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    /// validate
    ///
    /// Checks signature, issuer, audience and expiry. Any failure yields `None`; callers map
    /// that to a uniform 401 and never learn which check failed.
    pub fn validate(&self, token: &str) -> Option<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_audience(&[TOKEN_AUDIENCE]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.validate_exp = true;

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!(reason = ?e.kind(), "Rejected bearer token");
                None
            }
        }
    }
}

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request, built from validated claims. Handlers
/// take the acting account from here, never from request parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn from_claims(claims: Claims) -> Option<Self> {
        Some(Self {
            role: Role::from_name(&claims.role)?,
            id: claims.sub,
            name: claims.unique_name,
            email: claims.email,
        })
    }
}

/// AuthUser Extractor Implementation
///
/// The authorization gate validates the token once and stores the identity in the request
/// extensions; this extractor only reads it back. Rejection: 401 when no identity is present
/// (a handler reached without passing through the gate).
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
