//! Device bearer-token verification.
//!
//! Devices authenticate with HS256 JWTs minted at enrollment by the device
//! directory (external). The API only verifies signatures and claims; it
//! never issues tokens.

use std::sync::Arc;

use axum::http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::AppError;

/// Identity of a verified device credential
#[derive(Debug, Clone)]
pub struct AuthenticatedDevice {
    pub device_id: String,
    pub member_id: String,
    pub org_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeviceClaims {
    /// Device id
    pub sub: String,
    pub member_id: String,
    pub org_id: String,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Clone)]
pub struct DeviceTokenVerifier {
    decoding_key: DecodingKey,
    config: Arc<AppConfig>,
}

impl DeviceTokenVerifier {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(config.device_jwt_secret.as_bytes()),
            config,
        }
    }

    pub fn verify_device_token(&self, token: &str) -> Result<AuthenticatedDevice, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.device_jwt_issuer.as_str()]);
        validation.leeway = self.config.auth_clock_skew.as_secs();
        validation.validate_aud = false;

        let decoded = decode::<DeviceClaims>(token, &self.decoding_key, &validation)
            .map_err(|error| AppError::unauthorized(format!("Token validation failed: {error}")))?;

        let claims = decoded.claims;
        if claims.sub.trim().is_empty() {
            return Err(AppError::unauthorized("Token subject is missing"));
        }
        if claims.member_id.trim().is_empty() || claims.org_id.trim().is_empty() {
            return Err(AppError::unauthorized("Token member/org claims are missing"));
        }

        Ok(AuthenticatedDevice {
            device_id: claims.sub,
            member_id: claims.member_id,
            org_id: claims.org_id,
        })
    }
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get("authorization")
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("Authorization header is not valid UTF-8"))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AppError::unauthorized("Authorization header must be `Bearer <token>`"))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::unauthorized(
            "Authorization scheme must be `Bearer`",
        ));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::unauthorized("Bearer token is empty"));
    }

    Ok(token)
}
