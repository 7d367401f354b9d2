use crate::application_port::*;
use crate::domain_model::*;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub photo_url: Option<String>,
    pub chat_id: u64,
    pub password_hash: String,
}

#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    /// Insert a user. A taken username or email fails with `UserExists`.
    async fn create_user(&self, new_user: NewUser) -> Result<UserId, AuthError>;

    async fn get_user(&self, user_id: UserId) -> Result<Option<User>, AuthError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    async fn change_password(&self, user_id: UserId, password_hash: &str)
    -> Result<(), AuthError>;

    async fn change_email(&self, user_id: UserId, email: &str) -> Result<(), AuthError>;

    async fn change_photo(&self, user_id: UserId, photo_url: &str) -> Result<(), AuthError>;

    async fn change_chat_id(&self, user_id: UserId, chat_id: u64) -> Result<(), AuthError>;

    async fn ping(&self) -> Result<(), AuthError>;

    /// Create the backing schema if it is missing.
    async fn migrate(&self) -> Result<(), AuthError>;
}
