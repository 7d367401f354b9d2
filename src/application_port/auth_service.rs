use crate::domain_model::*;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user already exists")]
    UserExists,
    #[error("user not found")]
    UserNotFound,
    #[error("token invalid")]
    TokenInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

/// How a caller proves who they are on login or signup.
#[derive(Debug, Clone)]
pub enum Credential {
    Email { email: String, password: String },
    /// Federated login. Accepted on the wire, not yet backed by any provider.
    OAuth { provider: String, token: String },
}

#[derive(Debug, Clone)]
pub struct SignupInput {
    pub username: String,
    pub chat_id: u64,
    pub credential: Credential,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub credential: Credential,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub user_id: UserId,
    pub tokens: AuthTokens,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

impl HealthStatus {
    pub const OK: HealthStatus = HealthStatus { status: "OK" };
}

#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    /// Mint an access/refresh pair sharing a fresh token family.
    async fn issue_pair(&self, user: &User) -> Result<AuthTokens, AuthError>;
    /// Mint an access token inside an already issued family.
    async fn issue_access_token(
        &self,
        user: &User,
        family: TokenFamily,
    ) -> Result<(AccessToken, chrono::DateTime<chrono::Utc>), AuthError>;
    async fn verify_access_token(&self, token: &AccessToken)
    -> Result<AccessTokenClaims, AuthError>;
    async fn verify_refresh_token(
        &self,
        token: &RefreshToken,
    ) -> Result<RefreshTokenClaims, AuthError>;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn signup(&self, request: SignupInput) -> Result<LoginResult, AuthError>;
    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError>;
    async fn refresh_token(&self, refresh_token: &str) -> Result<AuthTokens, AuthError>;
    async fn logout(&self, user_id: UserId) -> Result<(), AuthError>;
    async fn user_info(&self, user_id: UserId) -> Result<UserProfile, AuthError>;
    async fn verify_token(&self, token: &str) -> Result<UserId, AuthError>;
    async fn health_check(&self) -> Result<HealthStatus, AuthError>;
}
