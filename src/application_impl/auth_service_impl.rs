use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use crate::validation::is_valid_email;
use std::sync::Arc;

pub struct RealAuthService {
    user_repo: Arc<dyn UserRepo>,
    session_cache: Arc<dyn SessionCache>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
}

impl RealAuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        session_cache: Arc<dyn SessionCache>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
    ) -> Self {
        Self {
            user_repo,
            session_cache,
            credential_hasher,
            token_codec,
        }
    }

    fn email_credential(credential: Credential) -> Result<(String, String), AuthError> {
        match credential {
            Credential::Email { email, password } => {
                if !is_valid_email(&email) {
                    return Err(AuthError::InvalidInput("malformed email".to_string()));
                }
                if password.is_empty() {
                    return Err(AuthError::InvalidInput("password is required".to_string()));
                }
                Ok((email, password))
            }
            Credential::OAuth { provider, .. } => Err(AuthError::InvalidInput(format!(
                "oauth provider `{provider}` is not supported"
            ))),
        }
    }

    async fn load_user_by_email(&self, email: &str) -> Result<User, AuthError> {
        self.user_repo
            .get_user_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn load_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.user_repo
            .get_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn check_password(&self, password: &str, password_hash: &str) -> Result<(), AuthError> {
        if self
            .credential_hasher
            .verify_password(password, password_hash)
            .await?
        {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }

    /// Mint a fresh pair and make it the identity's only session.
    async fn start_session(&self, user: &User) -> Result<AuthTokens, AuthError> {
        let tokens = self.token_codec.issue_pair(user).await?;
        self.session_cache
            .set(&user.email, &tokens.refresh_token, &user.password_hash)
            .await?;
        Ok(tokens)
    }

    /// Hand out the cached refresh token again, with a new access token in its family.
    ///
    /// `None` when the cached token no longer verifies.
    async fn resume_session(
        &self,
        user: &User,
        refresh_token: RefreshToken,
    ) -> Result<Option<AuthTokens>, AuthError> {
        let claims = match self.token_codec.verify_refresh_token(&refresh_token).await {
            Ok(claims) => claims,
            Err(AuthError::TokenExpired | AuthError::TokenInvalid) => return Ok(None),
            Err(e) => return Err(e),
        };
        if claims.user_id != user.user_id {
            return Ok(None);
        }

        let (access_token, access_exp) = self
            .token_codec
            .issue_access_token(user, claims.token_family)
            .await?;

        Ok(Some(AuthTokens {
            token_family: claims.token_family,
            access_token,
            refresh_token,
            access_token_expires_at: access_exp,
            refresh_token_expires_at: claims.expires_at,
        }))
    }

    async fn login_by_email(&self, email: &str, password: &str) -> Result<LoginResult, AuthError> {
        if let Some(session) = self.session_cache.get(email).await? {
            self.check_password(password, &session.password_hash).await?;
            let user = self.load_user_by_email(email).await?;

            if let Some(tokens) = self.resume_session(&user, session.refresh_token).await? {
                debug!(user_id = %user.user_id, "login resumed cached session");
                return Ok(LoginResult {
                    user_id: user.user_id,
                    tokens,
                });
            }

            debug!(user_id = %user.user_id, "cached session is stale, starting a new one");
            let tokens = self.start_session(&user).await?;
            return Ok(LoginResult {
                user_id: user.user_id,
                tokens,
            });
        }

        let user = self.load_user_by_email(email).await?;
        self.check_password(password, &user.password_hash).await?;

        let tokens = self.start_session(&user).await?;
        info!(user_id = %user.user_id, "login started new session");

        Ok(LoginResult {
            user_id: user.user_id,
            tokens,
        })
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn signup(&self, request: SignupInput) -> Result<LoginResult, AuthError> {
        let SignupInput {
            username,
            chat_id,
            credential,
        } = request;

        if username.trim().is_empty() {
            return Err(AuthError::InvalidInput("username is required".to_string()));
        }
        let (email, password) = Self::email_credential(credential)?;

        let password_hash = self.credential_hasher.hash_password(&password).await?;
        let user_id = self
            .user_repo
            .create_user(NewUser {
                username,
                email: email.clone(),
                photo_url: None,
                chat_id,
                password_hash,
            })
            .await?;
        info!(%user_id, "user signed up");

        self.login_by_email(&email, &password).await
    }

    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError> {
        let (email, password) = Self::email_credential(request.credential)?;
        self.login_by_email(&email, &password).await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        let presented = RefreshToken(refresh_token.to_string());
        let claims = self.token_codec.verify_refresh_token(&presented).await?;

        // Only the token currently held by the session may rotate it.
        let session = self
            .session_cache
            .get(&claims.email)
            .await?
            .ok_or(AuthError::TokenInvalid)?;
        if session.refresh_token != presented {
            warn!(email = %claims.email, family = %claims.token_family, "refresh token replayed");
            return Err(AuthError::TokenInvalid);
        }

        let user = self.load_user_by_email(&claims.email).await?;
        let tokens = self.token_codec.issue_pair(&user).await?;

        // Invalidate before set: a failure in between leaves no session rather than a stale one.
        self.session_cache.invalidate(&user.email).await?;
        self.session_cache
            .set(&user.email, &tokens.refresh_token, &user.password_hash)
            .await?;
        debug!(user_id = %user.user_id, family = %tokens.token_family, "session rotated");

        Ok(tokens)
    }

    async fn logout(&self, user_id: UserId) -> Result<(), AuthError> {
        let user = self.load_user(user_id).await?;
        self.session_cache.invalidate(&user.email).await?;
        info!(%user_id, "logged out");
        Ok(())
    }

    async fn user_info(&self, user_id: UserId) -> Result<UserProfile, AuthError> {
        Ok(self.load_user(user_id).await?.into())
    }

    async fn verify_token(&self, token: &str) -> Result<UserId, AuthError> {
        let claims = self
            .token_codec
            .verify_access_token(&AccessToken(token.to_string()))
            .await?;
        Ok(claims.user_id)
    }

    async fn health_check(&self) -> Result<HealthStatus, AuthError> {
        if let Err(e) = self.user_repo.ping().await {
            error!(component = "database", error = %e, "health check failed");
            return Err(e);
        }
        if let Err(e) = self.session_cache.ping().await {
            error!(component = "cache", error = %e, "health check failed");
            return Err(e);
        }
        Ok(HealthStatus::OK)
    }
}
