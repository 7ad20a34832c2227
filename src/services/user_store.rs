use crate::models::User;
use crate::models::oauth::GoogleUserInfo;
use async_trait::async_trait;
use std::collections::HashMap;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum UserStoreError {
    #[error("cannot derive a username from email {0:?}")]
    InvalidEmail(String),

    #[error("email {0} already belongs to another Google account")]
    EmailTaken(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns the local user for a verified Google identity, creating it on first login.
    async fn get_or_create_google_user(&self, info: &GoogleUserInfo)
    -> Result<User, UserStoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserStoreError>;
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_or_create_google_user(
        &self,
        info: &GoogleUserInfo,
    ) -> Result<User, UserStoreError> {
        let now = OffsetDateTime::now_utc();
        let mut users = self.users.write().await;

        let by_sub = users
            .values()
            .find(|u| u.google_sub.as_deref() == Some(info.sub.as_str()))
            .map(|u| u.id);

        let existing = match by_sub {
            Some(id) => {
                // A changed Google email must not collide with another local account.
                if users
                    .values()
                    .any(|u| u.id != id && u.email.eq_ignore_ascii_case(&info.email))
                {
                    return Err(UserStoreError::EmailTaken(info.email.clone()));
                }
                Some(id)
            }
            None => match users
                .values()
                .find(|u| u.email.eq_ignore_ascii_case(&info.email))
            {
                Some(u) if u.google_sub.is_some() => {
                    tracing::warn!(user_id = %u.id, "email already linked to a different Google account");
                    return Err(UserStoreError::EmailTaken(info.email.clone()));
                }
                Some(u) => {
                    tracing::info!(user_id = %u.id, "linking Google account to existing user");
                    Some(u.id)
                }
                None => None,
            },
        };

        if let Some(id) = existing {
            if let Some(user) = users.get_mut(&id) {
                user.google_sub = Some(info.sub.clone());
                user.email = info.email.clone();
                if let Some(first) = &info.given_name {
                    user.first_name = first.clone();
                }
                if let Some(last) = &info.family_name {
                    user.last_name = last.clone();
                }
                user.last_login_at = Some(now);
                return Ok(user.clone());
            }
        }

        let base = username_base(&info.email)?;
        let username = unique_username(&base, |candidate| {
            users.values().any(|u| u.username == candidate)
        });

        let user = User {
            id: Uuid::new_v4(),
            username,
            email: info.email.clone(),
            first_name: info.given_name.clone().unwrap_or_default(),
            last_name: info.family_name.clone().unwrap_or_default(),
            google_sub: Some(info.sub.clone()),
            created_at: now,
            last_login_at: Some(now),
        };
        tracing::info!(user_id = %user.id, username = %user.username, "created user from Google login");

        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserStoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

fn username_base(email: &str) -> Result<String, UserStoreError> {
    let local = email.split('@').next().unwrap_or_default();
    let base: String = local
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '+'))
        .collect::<String>()
        .to_ascii_lowercase();

    if base.is_empty() {
        Err(UserStoreError::InvalidEmail(email.to_string()))
    } else {
        Ok(base)
    }
}

fn unique_username<F>(base: &str, taken: F) -> String
where
    F: Fn(&str) -> bool,
{
    if !taken(base) {
        return base.to_string();
    }
    (2u32..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken(candidate.as_str()))
        .unwrap_or_else(|| format!("{base}-{}", Uuid::new_v4().simple()))
}
