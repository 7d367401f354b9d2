use super::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Correlation id shared by the access and refresh token of one issued pair.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenFamily(pub uuid::Uuid);

impl TokenFamily {
    pub fn new_random() -> Self {
        TokenFamily(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for TokenFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshToken(pub String);

impl RefreshToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub token_family: TokenFamily,
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

/// What a caller learns from a verified access token.
#[derive(Debug, Clone)]
pub struct AccessTokenClaims {
    pub user_id: UserId,
    pub token_family: TokenFamily,
    pub username: String,
    pub email: String,
    pub chat_id: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// What a caller learns from a verified refresh token.
#[derive(Debug, Clone)]
pub struct RefreshTokenClaims {
    pub user_id: UserId,
    pub token_family: TokenFamily,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}
