use uuid::Uuid;

use crate::config::Config;

pub mod api;

/// Represents the currently authenticated user.
///
/// Populated by the bearer-token middleware; every owner-scoped query keys off
/// `user_id`. Token issuance belongs to the external identity provider — this
/// layer only verifies and trusts what the token carries.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
}

impl CurrentUser {
    /// Creates a new CurrentUser instance.
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// Authentication state holding the shared JWT secret.
#[derive(Clone)]
pub struct AuthState {
    pub jwt_secret: String,
}

impl AuthState {
    /// Creates a new AuthState from the application config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct Claims {
    pub exp: usize,    // Expiry time of the token
    pub iat: usize,    // Issued at time of the token
    pub sub: Uuid,     // Id of the authenticated user
}

/// Encodes a JWT for the given user id.
///
/// Kept for tests and operational tooling; production tokens come from the
/// identity provider that shares `jwt_secret` with this service.
pub async fn encode_jwt(user_id: Uuid, jwt_secret: &str) -> anyhow::Result<String> {
    let now = chrono::Utc::now();
    let expire = chrono::Duration::hours(24);
    let exp = (now + expire).timestamp() as usize;
    let iat = now.timestamp() as usize;
    let claims = Claims {
        exp,
        iat,
        sub: user_id,
    };
    let jwt = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(jwt_secret.as_bytes()),
    )?;
    Ok(jwt)
}

pub async fn decode_jwt(token: &str, jwt_secret: &str) -> anyhow::Result<Claims> {
    let token_data = jsonwebtoken::decode(
        token,
        &jsonwebtoken::DecodingKey::from_secret(jwt_secret.as_bytes()),
        &jsonwebtoken::Validation::default(),
    )?;
    Ok(token_data.claims)
}
