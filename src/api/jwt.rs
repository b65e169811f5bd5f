use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::warn;

use crate::api::constants::{TOKEN_TYPE_ACCESS, TOKEN_TYPE_REFRESH};
use crate::config::get_config;
use crate::storage::Plan;

/// Global cached JwtService instance
static JWT_SERVICE: OnceLock<JwtService> = OnceLock::new();

/// Get the cached JwtService instance
///
/// Built from the global config on first use.
pub fn get_jwt_service() -> &'static JwtService {
    JWT_SERVICE.get_or_init(JwtService::from_config)
}

/// Token claims, shared by access and refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub plan: Plan,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub token_type: String,
}

/// Access + refresh token pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// JWT Service for generating and validating tokens (HS256)
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_minutes: u64,
    refresh_token_days: u64,
}

impl JwtService {
    pub fn new(secret: &str, access_token_minutes: u64, refresh_token_days: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_minutes,
            refresh_token_days,
        }
    }

    /// Create JwtService from config
    ///
    /// An empty secret is replaced by a random one, so tokens do not survive
    /// a restart.
    pub fn from_config() -> Self {
        let config = get_config();
        let secret = if config.api.jwt_secret.is_empty() {
            warn!("JWT secret not configured, generating a random secret for this process");
            crate::utils::generate_secure_token(32)
        } else {
            config.api.jwt_secret.clone()
        };

        Self::new(
            &secret,
            config.api.access_token_minutes,
            config.api.refresh_token_days,
        )
    }

    pub fn access_token_minutes(&self) -> u64 {
        self.access_token_minutes
    }

    fn issue(
        &self,
        user_id: &str,
        plan: Plan,
        token_type: &str,
        lifetime: Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            plan,
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            token_type: token_type.to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
    }

    /// Generate Access Token (short-lived)
    pub fn generate_access_token(
        &self,
        user_id: &str,
        plan: Plan,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue(
            user_id,
            plan,
            TOKEN_TYPE_ACCESS,
            Duration::minutes(self.access_token_minutes as i64),
        )
    }

    /// Generate Refresh Token (long-lived)
    pub fn generate_refresh_token(
        &self,
        user_id: &str,
        plan: Plan,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue(
            user_id,
            plan,
            TOKEN_TYPE_REFRESH,
            Duration::days(self.refresh_token_days as i64),
        )
    }

    pub fn generate_pair(
        &self,
        user_id: &str,
        plan: Plan,
    ) -> Result<TokenPair, jsonwebtoken::errors::Error> {
        Ok(TokenPair {
            access_token: self.generate_access_token(user_id, plan)?,
            refresh_token: self.generate_refresh_token(user_id, plan)?,
        })
    }

    fn validate(
        &self,
        token: &str,
        expected_type: &str,
    ) -> Result<Claims, jsonwebtoken::errors::Error> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())?;

        if token_data.claims.token_type != expected_type {
            return Err(jsonwebtoken::errors::Error::from(
                jsonwebtoken::errors::ErrorKind::InvalidToken,
            ));
        }

        Ok(token_data.claims)
    }

    /// Validate Access Token
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        self.validate(token, TOKEN_TYPE_ACCESS)
    }

    /// Validate Refresh Token
    pub fn validate_refresh_token(
        &self,
        token: &str,
    ) -> Result<Claims, jsonwebtoken::errors::Error> {
        self.validate(token, TOKEN_TYPE_REFRESH)
    }
}
