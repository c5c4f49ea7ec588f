use actix_web::{dev::Payload, web, Error as ActixWebError};
use actix_web::{http, FromRequest, HttpMessage, HttpRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use uuid::Uuid;

use crate::core::config::JwtAuthConfig;
use crate::core::policy::{Capability, Role};
use crate::core::AppError;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtClaims {
    pub sub: String, // user ID
    pub username: String,
    pub role: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub token_type: TokenType,
    pub iat: usize,
    pub exp: usize, // expiration time
}

impl JwtClaims {
    pub fn access(
        config: &JwtAuthConfig,
        user_id: Uuid,
        username: &str,
        role: Role,
        permissions: Vec<String>,
    ) -> Self {
        Self::issue(
            user_id,
            username,
            role,
            permissions,
            TokenType::Access,
            config.token_expiration_time,
        )
    }

    pub fn refresh(config: &JwtAuthConfig, user_id: Uuid, username: &str, role: Role) -> Self {
        Self::issue(
            user_id,
            username,
            role,
            Vec::new(),
            TokenType::Refresh,
            config.refresh_token_expiration_time,
        )
    }

    fn issue(
        user_id: Uuid,
        username: &str,
        role: Role,
        permissions: Vec<String>,
        token_type: TokenType,
        lifetime_minutes: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            username: username.to_string(),
            role: role.as_str().to_string(),
            permissions,
            token_type,
            iat: now.timestamp() as usize,
            exp: (now + Duration::minutes(lifetime_minutes)).timestamp() as usize,
        }
    }
}

/// Authenticated caller of a protected route.
#[derive(Debug)]
pub struct JwtMiddleware {
    pub user_id: Uuid,
    pub role: Role,
    pub claims: JwtClaims,
}

impl JwtMiddleware {
    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.role.can(capability) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = %self.user_id,
                role = %self.role,
                ?capability,
                "access denied"
            );
            Err(AppError::forbidden_error(
                "You do not have access to this feature",
            ))
        }
    }
}

impl FromRequest for JwtMiddleware {
    type Error = ActixWebError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req).map_err(ActixWebError::from))
    }
}

fn authenticate(req: &HttpRequest) -> Result<JwtMiddleware, AppError> {
    let config = req
        .app_data::<web::Data<JwtAuthConfig>>()
        .ok_or_else(|| AppError::internal_error("JWT configuration is not registered"))?;

    let header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .ok_or_else(|| AppError::unauthorized("Authorization token is required"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("Invalid token format"))?;

    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::unauthorized("Invalid token format"))?;

    let claims = decode_jwt_token(config, token)?;
    if claims.token_type != TokenType::Access {
        return Err(AppError::unauthorized("Invalid token"));
    }

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::unauthorized("Invalid user ID in token"))?;
    let role: Role = claims
        .role
        .parse()
        .map_err(|_| AppError::unauthorized("Invalid role in token"))?;

    req.extensions_mut().insert(claims.clone());

    Ok(JwtMiddleware {
        user_id,
        role,
        claims,
    })
}

pub fn generate_jwt_token(config: &JwtAuthConfig, claims: &JwtClaims) -> Result<String, AppError> {
    let header = Header::default();
    let encoding_key = EncodingKey::from_secret(config.secret.expose_secret().as_bytes());

    encode(&header, claims, &encoding_key)
        .map_err(|_| AppError::internal_error("Failed to generate JWT token"))
}

pub fn decode_jwt_token(config: &JwtAuthConfig, token: &str) -> Result<JwtClaims, AppError> {
    decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(config.secret.expose_secret().as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired token"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AppErrorType;
    use secrecy::Secret;

    fn config() -> JwtAuthConfig {
        JwtAuthConfig {
            secret: Secret::new("test-secret".to_string()),
            token_expiration_time: 60,
            refresh_token_expiration_time: 120,
        }
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let claims = JwtClaims::access(&config(), Uuid::new_v4(), "ani", Role::Student, vec![]);
        let token = generate_jwt_token(&config(), &claims).unwrap();

        let other = JwtAuthConfig {
            secret: Secret::new("another-secret".to_string()),
            ..config()
        };
        let error = decode_jwt_token(&other, &token).unwrap_err();
        assert_eq!(error.error_type, AppErrorType::AuthError);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let mut claims =
            JwtClaims::access(&config(), Uuid::new_v4(), "ani", Role::Student, vec![]);
        claims.exp = (Utc::now() - Duration::hours(2)).timestamp() as usize;
        let token = generate_jwt_token(&config(), &claims).unwrap();

        assert!(decode_jwt_token(&config(), &token).is_err());
    }

    #[test]
    fn refresh_tokens_outlive_access_tokens() {
        let user_id = Uuid::new_v4();
        let access = JwtClaims::access(&config(), user_id, "ani", Role::Lecturer, vec![]);
        let refresh = JwtClaims::refresh(&config(), user_id, "ani", Role::Lecturer);

        assert_eq!(refresh.token_type, TokenType::Refresh);
        assert!(refresh.exp > access.exp);
    }
}
