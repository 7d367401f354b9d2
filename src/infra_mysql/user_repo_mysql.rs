use super::util::store_error;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

const CREATE_USER_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS user (
    user_id       BINARY(16)      NOT NULL,
    username      VARCHAR(255)    NOT NULL,
    email         VARCHAR(100)    NOT NULL,
    photo_url     VARCHAR(255)    NULL,
    chat_id       BIGINT UNSIGNED NOT NULL DEFAULT 0,
    password_hash VARCHAR(255)    NOT NULL,
    created_at    TIMESTAMP(6)    NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
    updated_at    TIMESTAMP(6)    NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
    PRIMARY KEY (user_id),
    UNIQUE KEY uk_user_username (username),
    UNIQUE KEY uk_user_email (email)
)
"#;

const SELECT_USER: &str = r#"
SELECT user_id, username, email, photo_url, chat_id, password_hash, created_at, updated_at
FROM user
"#;

pub struct MySqlUserRepo {
    pool: MySqlPool,
}

impl MySqlUserRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserRepo { pool }
    }

    #[inline]
    fn uid_as_bytes(id: &UserId) -> &[u8] {
        id.0.as_bytes()
    }

    #[inline]
    fn uid_from_bytes(id: &[u8]) -> Result<UserId, AuthError> {
        Ok(UserId(
            Uuid::from_slice(id).map_err(|e| AuthError::InternalError(e.to_string()))?,
        ))
    }

    fn row_to_user(row: MySqlRow) -> Result<User, AuthError> {
        let decode = |e: sqlx::Error| AuthError::InternalError(format!("decode user row: {e}"));

        let user_id_bytes: Vec<u8> = row.try_get("user_id").map_err(decode)?;
        let username: String = row.try_get("username").map_err(decode)?;
        let email: String = row.try_get("email").map_err(decode)?;
        let photo_url: Option<String> = row.try_get("photo_url").map_err(decode)?;
        let chat_id: u64 = row.try_get("chat_id").map_err(decode)?;
        let password_hash: String = row.try_get("password_hash").map_err(decode)?;
        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode)?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(decode)?;

        Ok(User {
            user_id: Self::uid_from_bytes(&user_id_bytes)?,
            username,
            email,
            photo_url,
            chat_id,
            password_hash,
            created_at,
            updated_at,
        })
    }

    /// Run a single-row UPDATE; no matching row means the user does not exist.
    async fn update_one<'q>(
        &self,
        query: sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments>,
        context: &str,
    ) -> Result<(), AuthError> {
        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| store_error(context, e))?;
        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn create_user(&self, new_user: NewUser) -> Result<UserId, AuthError> {
        let user_id = UserId::new_random();

        sqlx::query(
            r#"
INSERT INTO user (user_id, username, email, photo_url, chat_id, password_hash)
VALUES (?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(Self::uid_as_bytes(&user_id))
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.photo_url)
        .bind(new_user.chat_id)
        .bind(&new_user.password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("insert user", e))?;

        Ok(user_id)
    }

    async fn get_user(&self, user_id: UserId) -> Result<Option<User>, AuthError> {
        let row_opt: Option<MySqlRow> = sqlx::query(&format!("{SELECT_USER} WHERE user_id = ?"))
            .bind(Self::uid_as_bytes(&user_id))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error("query user by id", e))?;

        row_opt.map(Self::row_to_user).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let row_opt: Option<MySqlRow> = sqlx::query(&format!("{SELECT_USER} WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error("query user by email", e))?;

        row_opt.map(Self::row_to_user).transpose()
    }

    async fn change_password(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> Result<(), AuthError> {
        let query = sqlx::query(
            "UPDATE user SET password_hash = ?, updated_at = CURRENT_TIMESTAMP(6) WHERE user_id = ?",
        )
        .bind(password_hash)
        .bind(Self::uid_as_bytes(&user_id));
        self.update_one(query, "update password").await
    }

    async fn change_email(&self, user_id: UserId, email: &str) -> Result<(), AuthError> {
        let query = sqlx::query(
            "UPDATE user SET email = ?, updated_at = CURRENT_TIMESTAMP(6) WHERE user_id = ?",
        )
        .bind(email)
        .bind(Self::uid_as_bytes(&user_id));
        self.update_one(query, "update email").await
    }

    async fn change_photo(&self, user_id: UserId, photo_url: &str) -> Result<(), AuthError> {
        let query = sqlx::query(
            "UPDATE user SET photo_url = ?, updated_at = CURRENT_TIMESTAMP(6) WHERE user_id = ?",
        )
        .bind(photo_url)
        .bind(Self::uid_as_bytes(&user_id));
        self.update_one(query, "update photo").await
    }

    async fn change_chat_id(&self, user_id: UserId, chat_id: u64) -> Result<(), AuthError> {
        let query = sqlx::query(
            "UPDATE user SET chat_id = ?, updated_at = CURRENT_TIMESTAMP(6) WHERE user_id = ?",
        )
        .bind(chat_id)
        .bind(Self::uid_as_bytes(&user_id));
        self.update_one(query, "update chat id").await
    }

    async fn ping(&self) -> Result<(), AuthError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("ping", e))?;
        Ok(())
    }

    async fn migrate(&self) -> Result<(), AuthError> {
        sqlx::query(CREATE_USER_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("create user table", e))?;
        Ok(())
    }
}
