use crate::application_port::{AuthError, TokenCodec};
use crate::domain_model::*;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on token lifetimes; expiry arithmetic past it may overflow.
const MAX_TOKEN_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Base64 encoded HS256 key.
    pub secret: String,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    sub: String,
    family: TokenFamily,
    kind: TokenKind,
    username: String,
    email: String,
    chat_id: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
}

// Identity and expiry only.
#[derive(Debug, Serialize, Deserialize)]
struct RefreshClaims {
    sub: String,
    family: TokenFamily,
    kind: TokenKind,
    email: String,
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
}

pub struct JwtHs256Codec {
    cfg: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtHs256Codec {
    pub fn try_new(cfg: JwtConfig) -> Result<Self, AuthError> {
        if cfg.secret.trim().is_empty() {
            return Err(AuthError::InternalError("signing secret is empty".to_string()));
        }
        if cfg.access_ttl > MAX_TOKEN_TTL || cfg.refresh_ttl > MAX_TOKEN_TTL {
            return Err(AuthError::InternalError("token ttl is out of range".to_string()));
        }
        let encoding_key = EncodingKey::from_base64_secret(&cfg.secret)
            .map_err(|e| AuthError::InternalError(format!("signing secret: {e}")))?;
        let decoding_key = DecodingKey::from_base64_secret(&cfg.secret)
            .map_err(|e| AuthError::InternalError(format!("signing secret: {e}")))?;

        // Expiry is checked by `check_expiry`: zero leeway, `exp == now` already expired.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_audience(&[cfg.audience.as_str()]);
        validation.set_issuer(&[cfg.issuer.as_str()]);

        Ok(JwtHs256Codec {
            cfg,
            encoding_key,
            decoding_key,
            validation,
        })
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::InternalError(format!("sign token: {e}")))
    }

    fn encode_access(
        &self,
        user: &User,
        family: TokenFamily,
        now: DateTime<Utc>,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError> {
        let exp_dt = now + self.cfg.access_ttl;
        let claims = AccessClaims {
            sub: user.user_id.to_string(),
            family,
            kind: TokenKind::Access,
            username: user.username.clone(),
            email: user.email.clone(),
            chat_id: user.chat_id,
            created_at: user.created_at,
            updated_at: user.updated_at,
            exp: exp_dt.timestamp(),
            iat: now.timestamp(),
            iss: self.cfg.issuer.clone(),
            aud: self.cfg.audience.clone(),
        };
        Ok((AccessToken(self.sign(&claims)?), exp_dt))
    }

    fn encode_refresh(
        &self,
        user: &User,
        family: TokenFamily,
        now: DateTime<Utc>,
    ) -> Result<(RefreshToken, DateTime<Utc>), AuthError> {
        let exp_dt = now + self.cfg.refresh_ttl;
        let claims = RefreshClaims {
            sub: user.user_id.to_string(),
            family,
            kind: TokenKind::Refresh,
            email: user.email.clone(),
            exp: exp_dt.timestamp(),
            iat: now.timestamp(),
            iss: self.cfg.issuer.clone(),
            aud: self.cfg.audience.clone(),
        };
        Ok((RefreshToken(self.sign(&claims)?), exp_dt))
    }

    fn issue_pair_at(&self, user: &User, now: DateTime<Utc>) -> Result<AuthTokens, AuthError> {
        let token_family = TokenFamily::new_random();
        let (access_token, access_exp) = self.encode_access(user, token_family, now)?;
        let (refresh_token, refresh_exp) = self.encode_refresh(user, token_family, now)?;
        Ok(AuthTokens {
            token_family,
            access_token,
            refresh_token,
            access_token_expires_at: access_exp,
            refresh_token_expires_at: refresh_exp,
        })
    }

    fn decode_access_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<AccessTokenClaims, AuthError> {
        let claims = decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| AuthError::TokenInvalid)?
            .claims;
        if claims.kind != TokenKind::Access {
            return Err(AuthError::TokenInvalid);
        }
        let expires_at = check_expiry(claims.exp, now)?;

        Ok(AccessTokenClaims {
            user_id: parse_user_id(&claims.sub)?,
            token_family: claims.family,
            username: claims.username,
            email: claims.email,
            chat_id: claims.chat_id,
            created_at: claims.created_at,
            updated_at: claims.updated_at,
            expires_at,
        })
    }

    fn decode_refresh_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<RefreshTokenClaims, AuthError> {
        let claims = decode::<RefreshClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| AuthError::TokenInvalid)?
            .claims;
        if claims.kind != TokenKind::Refresh {
            return Err(AuthError::TokenInvalid);
        }
        let expires_at = check_expiry(claims.exp, now)?;

        Ok(RefreshTokenClaims {
            user_id: parse_user_id(&claims.sub)?,
            token_family: claims.family,
            email: claims.email,
            expires_at,
        })
    }
}

fn check_expiry(exp: i64, now: DateTime<Utc>) -> Result<DateTime<Utc>, AuthError> {
    if exp <= now.timestamp() {
        return Err(AuthError::TokenExpired);
    }
    DateTime::from_timestamp(exp, 0).ok_or(AuthError::TokenInvalid)
}

#[inline]
fn parse_user_id(sub: &str) -> Result<UserId, AuthError> {
    sub.parse::<UserId>().map_err(|_| AuthError::TokenInvalid)
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs256Codec {
    async fn issue_pair(&self, user: &User) -> Result<AuthTokens, AuthError> {
        self.issue_pair_at(user, Utc::now())
    }

    async fn issue_access_token(
        &self,
        user: &User,
        family: TokenFamily,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError> {
        self.encode_access(user, family, Utc::now())
    }

    async fn verify_access_token(
        &self,
        token: &AccessToken,
    ) -> Result<AccessTokenClaims, AuthError> {
        self.decode_access_at(&token.0, Utc::now())
    }

    async fn verify_refresh_token(
        &self,
        token: &RefreshToken,
    ) -> Result<RefreshTokenClaims, AuthError> {
        self.decode_refresh_at(&token.0, Utc::now())
    }
}
