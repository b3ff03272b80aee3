use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use super::model::{AppMetadata, AuthenticatedUser};
use crate::core::config::AuthConfig;
use crate::core::error::AppError;
use crate::shared::constants::ROLE_ADMIN;

/// Verifies HS256 access tokens minted by the auth provider
pub struct JwtValidator {
    decoding_key: DecodingKey,
    audience: String,
    leeway: u64,
    admin_role: String,
}

#[derive(Debug, Clone, Deserialize)]
struct Claims {
    sub: String,
    #[serde(rename = "exp")]
    _exp: u64,
    #[serde(default)]
    email: Option<String>,
    /// Single role name, e.g. "authenticated"
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    app_metadata: AppMetadata,
}

impl JwtValidator {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            audience: config.audience.clone(),
            leeway: config.jwt_leeway.as_secs(),
            admin_role: config.admin_role.clone(),
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);
        validation.leeway = self.leeway;
        validation.validate_nbf = true;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| AppError::Auth(e.to_string()))?
            .claims;

        if claims.sub.trim().is_empty() {
            return Err(AppError::Auth("Token subject is empty".to_string()));
        }

        let mut roles = claims.app_metadata.roles;
        roles.extend(claims.role);
        // The provider's admin role name is configurable; expose it under one name
        if self.admin_role != ROLE_ADMIN && roles.iter().any(|r| *r == self.admin_role) {
            roles.push(ROLE_ADMIN.to_string());
        }
        roles.sort();
        roles.dedup();

        Ok(AuthenticatedUser {
            sub: claims.sub,
            email: claims.email,
            roles,
        })
    }
}
