//! Token encode/decode (HS256).

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use orgdir_core::AppError;
use serde::Serialize;
use uuid::Uuid;

use super::models::{Actor, TokenClaims};

/// Token handed to the client after login or org selection.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
    pub org_id: Option<Uuid>,
    pub org_owner: bool,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry_minutes: i64,
}

impl TokenService {
    pub fn new(secret: &str, expiry_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry_minutes,
        }
    }

    pub fn issue(&self, actor: &Actor) -> Result<IssuedToken, AppError> {
        let now = Utc::now();
        let exp = (now + Duration::minutes(self.expiry_minutes)).timestamp();
        let claims = TokenClaims {
            sub: actor.user_id,
            org: actor.org_id,
            org_owner: actor.is_org_owner,
            org_admin: actor.is_platform_admin,
            scopes: actor.org_id.map(|_| actor.scopes.clone()),
            iat: now.timestamp(),
            exp,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))?;

        Ok(IssuedToken {
            token,
            expires_at: exp,
            org_id: claims.org,
            org_owner: claims.org_owner,
        })
    }

    pub fn decode(&self, token: &str) -> Result<TokenClaims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<TokenClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                AppError::Unauthorized("Invalid or expired token".to_string())
            })
    }
}
