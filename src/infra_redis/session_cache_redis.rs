use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::time::Duration;

const REFRESH_FIELD: &str = "refresh";
const PASS_FIELD: &str = "pass";

/// One hash per identity at `<prefix>:<email>` holding the fields `refresh` and `pass`.
pub struct RedisSessionCache {
    conn: ConnectionManager,
    prefix: String,
    ttl: Duration,
}

impl RedisSessionCache {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>, ttl: Duration) -> Self {
        RedisSessionCache {
            conn,
            prefix: prefix.into(),
            ttl,
        }
    }

    fn key(&self, email: &str) -> String {
        session_key(&self.prefix, email)
    }

    fn ttl_secs(&self) -> i64 {
        // EXPIRE 0 deletes the key immediately.
        self.ttl.as_secs().max(1) as i64
    }
}

fn session_key(prefix: &str, email: &str) -> String {
    format!("{}:{}", prefix, email)
}

fn unavailable(e: redis::RedisError) -> AuthError {
    AuthError::Unavailable(format!("redis: {e}"))
}

/// A hash missing either field is treated as no session.
fn record_from_fields(mut fields: HashMap<String, String>) -> Option<SessionRecord> {
    let refresh = fields.remove(REFRESH_FIELD)?;
    let pass = fields.remove(PASS_FIELD)?;
    Some(SessionRecord {
        refresh_token: RefreshToken(refresh),
        password_hash: pass,
    })
}

#[async_trait::async_trait]
impl SessionCache for RedisSessionCache {
    async fn get(&self, email: &str) -> Result<Option<SessionRecord>, AuthError> {
        let key = self.key(email);
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn.hgetall(&key).await.map_err(unavailable)?;
        Ok(record_from_fields(fields))
    }

    async fn set(
        &self,
        email: &str,
        refresh_token: &RefreshToken,
        password_hash: &str,
    ) -> Result<(), AuthError> {
        let key = self.key(email);
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .del(&key)
            .ignore()
            .hset_multiple(
                &key,
                &[
                    (REFRESH_FIELD, refresh_token.as_str()),
                    (PASS_FIELD, password_hash),
                ],
            )
            .ignore()
            .expire(&key, self.ttl_secs())
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn invalidate(&self, email: &str) -> Result<(), AuthError> {
        let key = self.key(email);
        let mut conn = self.conn.clone();
        let _: () = conn.del(&key).await.map_err(unavailable)?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), AuthError> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        if pong != "PONG" {
            return Err(AuthError::Unavailable(format!("redis: unexpected PING reply {pong}")));
        }
        Ok(())
    }
}
