use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Process-local [`UserRepo`] with the same uniqueness rules as the SQL schema.
pub struct InMemoryUserRepo {
    users: DashMap<UserId, User>,
    by_email: DashMap<String, UserId>,
    by_username: DashMap<String, UserId>,
}

impl InMemoryUserRepo {
    pub fn new() -> Self {
        InMemoryUserRepo {
            users: DashMap::new(),
            by_email: DashMap::new(),
            by_username: DashMap::new(),
        }
    }

    fn claim(index: &DashMap<String, UserId>, key: &str, user_id: UserId) -> Result<(), AuthError> {
        match index.entry(key.to_string()) {
            Entry::Occupied(_) => Err(AuthError::UserExists),
            Entry::Vacant(slot) => {
                slot.insert(user_id);
                Ok(())
            }
        }
    }

    fn update<F>(&self, user_id: UserId, apply: F) -> Result<(), AuthError>
    where
        F: FnOnce(&mut User),
    {
        let mut user = self.users.get_mut(&user_id).ok_or(AuthError::UserNotFound)?;
        apply(user.value_mut());
        user.updated_at = Utc::now();
        Ok(())
    }
}

impl Default for InMemoryUserRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl UserRepo for InMemoryUserRepo {
    async fn create_user(&self, new_user: NewUser) -> Result<UserId, AuthError> {
        let user_id = UserId::new_random();

        Self::claim(&self.by_username, &new_user.username, user_id)?;
        if let Err(e) = Self::claim(&self.by_email, &new_user.email, user_id) {
            self.by_username.remove(&new_user.username);
            return Err(e);
        }

        let now = Utc::now();
        self.users.insert(
            user_id,
            User {
                user_id,
                username: new_user.username,
                email: new_user.email,
                photo_url: new_user.photo_url,
                chat_id: new_user.chat_id,
                password_hash: new_user.password_hash,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(user_id)
    }

    async fn get_user(&self, user_id: UserId) -> Result<Option<User>, AuthError> {
        Ok(self.users.get(&user_id).map(|user| user.clone()))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let Some(user_id) = self.by_email.get(email).map(|id| *id) else {
            return Ok(None);
        };
        self.get_user(user_id).await
    }

    async fn change_password(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> Result<(), AuthError> {
        self.update(user_id, |user| user.password_hash = password_hash.to_string())
    }

    async fn change_email(&self, user_id: UserId, email: &str) -> Result<(), AuthError> {
        let old_email = self
            .users
            .get(&user_id)
            .map(|user| user.email.clone())
            .ok_or(AuthError::UserNotFound)?;
        if old_email == email {
            return self.update(user_id, |_| {});
        }

        Self::claim(&self.by_email, email, user_id)?;
        self.update(user_id, |user| user.email = email.to_string())?;
        self.by_email.remove(&old_email);
        Ok(())
    }

    async fn change_photo(&self, user_id: UserId, photo_url: &str) -> Result<(), AuthError> {
        self.update(user_id, |user| user.photo_url = Some(photo_url.to_string()))
    }

    async fn change_chat_id(&self, user_id: UserId, chat_id: u64) -> Result<(), AuthError> {
        self.update(user_id, |user| user.chat_id = chat_id)
    }

    async fn ping(&self) -> Result<(), AuthError> {
        Ok(())
    }

    async fn migrate(&self) -> Result<(), AuthError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            photo_url: None,
            chat_id: 7,
            password_hash: "$argon2id$hash".to_string(),
        }
    }

    #[tokio::test]
    async fn create_then_lookup_both_ways() {
        let repo = InMemoryUserRepo::new();
        let id = repo
            .create_user(new_user("alice", "alice@example.com"))
            .await
            .unwrap();

        let by_id = repo.get_user(id).await.unwrap().unwrap();
        let by_email = repo
            .get_user_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_id.user_id, by_email.user_id);
        assert_eq!(by_id.username, "alice");
        assert_eq!(by_id.chat_id, 7);
        assert!(repo.get_user_by_email("bob@example.com").await.unwrap().is_none());
        assert!(repo.get_user(UserId::new_random()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_or_username_conflicts() {
        let repo = InMemoryUserRepo::new();
        repo.create_user(new_user("alice", "alice@example.com"))
            .await
            .unwrap();

        let same_email = repo.create_user(new_user("alice2", "alice@example.com")).await;
        assert!(matches!(same_email, Err(AuthError::UserExists)));

        let same_name = repo.create_user(new_user("alice", "other@example.com")).await;
        assert!(matches!(same_name, Err(AuthError::UserExists)));

        // The failed attempts released their claims.
        repo.create_user(new_user("alice2", "other@example.com"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn change_email_moves_the_index() {
        let repo = InMemoryUserRepo::new();
        let alice = repo
            .create_user(new_user("alice", "alice@example.com"))
            .await
            .unwrap();
        repo.create_user(new_user("bob", "bob@example.com"))
            .await
            .unwrap();

        let taken = repo.change_email(alice, "bob@example.com").await;
        assert!(matches!(taken, Err(AuthError::UserExists)));

        repo.change_email(alice, "alice@new.example.com").await.unwrap();
        assert!(repo.get_user_by_email("alice@example.com").await.unwrap().is_none());
        let moved = repo
            .get_user_by_email("alice@new.example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(moved.user_id, alice);
    }

    #[tokio::test]
    async fn mutations_bump_updated_at_and_reject_unknown_ids() {
        let repo = InMemoryUserRepo::new();
        let id = repo
            .create_user(new_user("alice", "alice@example.com"))
            .await
            .unwrap();
        let before = repo.get_user(id).await.unwrap().unwrap().updated_at;

        repo.change_photo(id, "https://cdn.example.com/a.png").await.unwrap();
        repo.change_chat_id(id, 99).await.unwrap();
        repo.change_password(id, "$argon2id$other").await.unwrap();

        let after = repo.get_user(id).await.unwrap().unwrap();
        assert_eq!(after.photo_url.as_deref(), Some("https://cdn.example.com/a.png"));
        assert_eq!(after.chat_id, 99);
        assert_eq!(after.password_hash, "$argon2id$other");
        assert!(after.updated_at >= before);

        let missing = repo.change_chat_id(UserId::new_random(), 1).await;
        assert!(matches!(missing, Err(AuthError::UserNotFound)));
    }
}
