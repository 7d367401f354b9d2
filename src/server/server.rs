use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::{Password, Settings};
use anyhow::anyhow;
use sqlx::{MySql, Pool};
use std::sync::Arc;

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::try_new(JwtConfig {
            issuer: settings.jwt.issuer.clone(),
            audience: settings.jwt.audience.clone(),
            access_ttl: settings.jwt.access_ttl(),
            refresh_ttl: settings.jwt.refresh_ttl(),
            secret: settings.jwt.secret.clone(),
        })?);
        let credential_hasher: Arc<dyn CredentialHasher> =
            Arc::new(build_hasher(&settings.password)?);

        let refresh_ttl = settings.jwt.refresh_ttl();
        let (user_repo, session_cache, pool) = match settings.storage.backend.as_str() {
            "fake" => {
                let user_repo: Arc<dyn UserRepo> = Arc::new(InMemoryUserRepo::new());
                let session_cache: Arc<dyn SessionCache> =
                    Arc::new(InMemorySessionCache::new(refresh_ttl));
                (user_repo, session_cache, None)
            }
            "real" => {
                let mysql_dsn = settings
                    .storage
                    .mysql_dsn
                    .as_deref()
                    .ok_or_else(|| anyhow!("storage.mysql_dsn is required"))?;
                let redis_dsn = settings
                    .storage
                    .redis_dsn
                    .as_deref()
                    .ok_or_else(|| anyhow!("storage.redis_dsn is required"))?;

                let pool = Pool::<MySql>::connect(mysql_dsn).await?;
                let redis_client = redis::Client::open(redis_dsn)?;
                let redis_manager = redis_client.get_connection_manager().await?;

                let user_repo: Arc<dyn UserRepo> = Arc::new(MySqlUserRepo::new(pool.clone()));
                let session_cache: Arc<dyn SessionCache> = Arc::new(RedisSessionCache::new(
                    redis_manager,
                    settings.storage.session_prefix.clone(),
                    refresh_ttl,
                ));
                (user_repo, session_cache, Some(pool))
            }
            other => return Err(anyhow!("Unknown storage backend: {}", other)),
        };

        if settings.storage.migrate {
            user_repo.migrate().await?;
            info!("user schema is up to date");
        }

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            user_repo,
            session_cache,
            credential_hasher,
            token_codec,
        ));

        info!(backend = %settings.storage.backend, "server started");

        Ok(Self { auth_service, pool })
    }

    /// A server around an already assembled service, with no pool to close.
    pub fn with_auth_service(auth_service: Arc<dyn AuthService>) -> Self {
        Self {
            auth_service,
            pool: None,
        }
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}

fn build_hasher(password: &Password) -> Result<Argon2PasswordHasher, AuthError> {
    match (password.memory_kib, password.iterations, password.parallelism) {
        (None, None, None) => Ok(Argon2PasswordHasher::new()),
        (m, t, p) => Argon2PasswordHasher::with_cost(
            m.unwrap_or(argon2::Params::DEFAULT_M_COST),
            t.unwrap_or(argon2::Params::DEFAULT_T_COST),
            p.unwrap_or(argon2::Params::DEFAULT_P_COST),
        ),
    }
}
