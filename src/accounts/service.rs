use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        jwt::{JwtKeys, TokenError},
        password::{PasswordError, PasswordHasher},
    },
    users::{
        model::{validate_registration, NewUser, PublicUser, Role},
        StoreError, UserStore,
    },
};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),
    #[error("Email already in use")]
    DuplicateEmail,
    /// Unknown email and wrong password are deliberately the same error.
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("User not found")]
    NotFound,
    #[error(transparent)]
    Store(StoreError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            // The unique index lost-race case lands here.
            StoreError::DuplicateEmail => AccountError::DuplicateEmail,
            other => AccountError::Store(other),
        }
    }
}

impl From<PasswordError> for AccountError {
    fn from(err: PasswordError) -> Self {
        AccountError::Internal(anyhow::Error::new(err).context("password hashing"))
    }
}

impl From<TokenError> for AccountError {
    fn from(err: TokenError) -> Self {
        AccountError::Internal(anyhow::Error::new(err).context("token signing"))
    }
}

/// Registration input, as received from the client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Login input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Returned by register and login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Registration, login and profile lookup over a [`UserStore`].
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    keys: JwtKeys,
}

impl AccountService {
    pub fn new(store: Arc<dyn UserStore>, hasher: PasswordHasher, keys: JwtKeys) -> Self {
        Self {
            store,
            hasher,
            keys,
        }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    pub async fn register(&self, input: Registration) -> Result<AuthResponse, AccountError> {
        let Registration {
            name,
            email,
            password,
        } = input;

        // Fast path only; the store's unique index is what actually guarantees
        // uniqueness under concurrent registrations.
        if self.store.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AccountError::DuplicateEmail);
        }

        validate_registration(&name, &email, &password).map_err(AccountError::Validation)?;

        let password_hash = self.hasher.hash_async(password).await?;
        let user = self
            .store
            .insert(NewUser {
                name,
                email,
                password_hash,
                role: Role::default(),
            })
            .await
            .map_err(|e| {
                if matches!(e, StoreError::DuplicateEmail) {
                    warn!("email taken by a concurrent registration");
                }
                AccountError::from(e)
            })?;

        let token = self.keys.sign(user.id)?;
        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(AuthResponse {
            token,
            user: user.into(),
        })
    }

    pub async fn login(&self, input: Credentials) -> Result<AuthResponse, AccountError> {
        let Some(user) = self.store.find_by_email(&input.email).await? else {
            warn!(email = %input.email, reason = "unknown email", "login rejected");
            return Err(AccountError::InvalidCredentials);
        };

        let ok = self
            .hasher
            .verify_async(input.password, user.password_hash.clone())
            .await?;
        if !ok {
            warn!(user_id = %user.id, reason = "wrong password", "login rejected");
            return Err(AccountError::InvalidCredentials);
        }

        let token = self.keys.sign(user.id)?;
        info!(user_id = %user.id, "user logged in");
        Ok(AuthResponse {
            token,
            user: user.into(),
        })
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<PublicUser, AccountError> {
        match self.store.find_by_id(user_id).await? {
            Some(user) => Ok(user.into()),
            None => {
                debug!(user_id = %user_id, "profile lookup missed");
                Err(AccountError::NotFound)
            }
        }
    }

    /// Returns the user id a bearer token was issued for.
    pub fn verify_token(&self, token: &str) -> Result<Uuid, TokenError> {
        self.keys.verify(token).map(|claims| claims.sub)
    }

    pub async fn shutdown(&self) {
        self.store.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use crate::users::MemoryUserStore;

    fn service() -> (AccountService, Arc<MemoryUserStore>) {
        let store = Arc::new(MemoryUserStore::new());
        let state = AppState::fake_with_store(store.clone());
        (state.accounts.clone(), store)
    }

    fn registration(email: &str) -> Registration {
        Registration {
            name: "Test User".into(),
            email: email.into(),
            password: "password123".into(),
        }
    }

    #[tokio::test]
    async fn register_issues_token_for_new_user() {
        let (svc, store) = service();
        let res = svc.register(registration("new@example.com")).await.unwrap();
        assert_eq!(res.user.email, "new@example.com");
        assert_eq!(res.user.role, Role::User);
        assert_eq!(svc.verify_token(&res.token).unwrap(), res.user.id);

        let stored = store.find_by_id(res.user.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "password123");
        assert!(!stored.password_hash.is_empty());
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let (svc, store) = service();
        svc.register(registration("dup@example.com")).await.unwrap();
        let err = svc.register(registration("dup@example.com")).await.unwrap_err();
        assert!(matches!(err, AccountError::DuplicateEmail));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn invalid_registration_is_not_persisted() {
        let (svc, store) = service();
        let err = svc
            .register(Registration {
                name: "x".into(),
                email: "not-an-email".into(),
                password: "password123".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Validation(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn taken_email_wins_over_validation_errors() {
        let (svc, store) = service();
        svc.register(registration("taken@example.com")).await.unwrap();
        let err = svc
            .register(Registration {
                name: "B".into(),
                email: "taken@example.com".into(),
                password: "123".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::DuplicateEmail));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn name_is_stored_as_sent() {
        let (svc, store) = service();
        let res = svc
            .register(Registration {
                name: "  Padded Name ".into(),
                email: "padded@example.com".into(),
                password: "password123".into(),
            })
            .await
            .unwrap();
        assert_eq!(res.user.name, "  Padded Name ");
        let stored = store.find_by_id(res.user.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "  Padded Name ");

        let err = svc
            .register(Registration {
                name: "   ".into(),
                email: "blank@example.com".into(),
                password: "password123".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Validation(_)));
    }

    #[tokio::test]
    async fn store_level_duplicate_maps_to_duplicate_email() {
        let err = AccountError::from(StoreError::DuplicateEmail);
        assert!(matches!(err, AccountError::DuplicateEmail));
    }

    #[tokio::test]
    async fn login_does_not_distinguish_unknown_email_from_wrong_password() {
        let (svc, _) = service();
        svc.register(registration("who@example.com")).await.unwrap();

        let wrong = svc
            .login(Credentials {
                email: "who@example.com".into(),
                password: "wrong-password".into(),
            })
            .await
            .unwrap_err();
        let unknown = svc
            .login(Credentials {
                email: "nobody@example.com".into(),
                password: "password123".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(wrong, AccountError::InvalidCredentials));
        assert!(matches!(unknown, AccountError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn unparseable_stored_hash_is_internal_on_login() {
        let (svc, store) = service();
        store
            .insert(NewUser {
                name: "Corrupt".into(),
                email: "corrupt@example.com".into(),
                password_hash: "not-a-phc-string".into(),
                role: Role::User,
            })
            .await
            .unwrap();

        let err = svc
            .login(Credentials {
                email: "corrupt@example.com".into(),
                password: "password123".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Internal(_)));
    }

    #[tokio::test]
    async fn login_then_profile_resolves_same_user() {
        let (svc, _) = service();
        let registered = svc.register(registration("me@example.com")).await.unwrap();
        let session = svc
            .login(Credentials {
                email: "me@example.com".into(),
                password: "password123".into(),
            })
            .await
            .unwrap();
        let user_id = svc.verify_token(&session.token).unwrap();
        let profile = svc.profile(user_id).await.unwrap();
        assert_eq!(profile, registered.user);
    }

    #[tokio::test]
    async fn profile_of_missing_user_is_not_found() {
        let (svc, _) = service();
        let err = svc.profile(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AccountError::NotFound));
    }

    #[tokio::test]
    async fn concurrent_registrations_with_same_email_admit_exactly_one() {
        let (svc, store) = service();
        let attempts = (0..8).map(|_| {
            let svc = svc.clone();
            tokio::spawn(async move { svc.register(registration("race@example.com")).await })
        });

        let mut ok = 0;
        for handle in attempts {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(AccountError::DuplicateEmail) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(store.len().await, 1);
    }
}
