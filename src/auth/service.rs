//! Credential service: register and authenticate users by email and password.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use tracing::{debug, info};

use super::AuthError;
use crate::db::{Store, StoreError};
use crate::models::{NewUser, UserRow};

/// Argon2id cost parameters. Both grow the work per hash; tests use tiny values.
#[derive(Debug, Clone, Copy)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
        }
    }
}

/// Hashes and verifies passwords with a fixed Argon2id configuration.
#[derive(Clone)]
pub struct PasswordHashing {
    params: Params,
    /// Verified against when the email is unknown, so both failure paths cost one hash.
    dummy_hash: Arc<str>,
}

impl PasswordHashing {
    pub fn new(cost: HashCost) -> Result<Self, AuthError> {
        let params = Params::new(cost.memory_kib, cost.iterations, Params::DEFAULT_P_COST, None)
            .map_err(|e| AuthError::Hashing(format!("params: {e}")))?;
        let mut hashing = Self {
            params,
            dummy_hash: Arc::from(""),
        };
        let dummy = hashing.hash("dummy password for timing")?;
        hashing.dummy_hash = Arc::from(dummy.as_str());
        Ok(hashing)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Hashing(format!("hash: {e}")))?
            .to_string();
        Ok(hash)
    }

    /// Cost parameters embedded in `hash` are used, so older hashes keep verifying after a cost change.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed =
            PasswordHash::new(hash).map_err(|e| AuthError::Hashing(format!("parse hash: {e}")))?;
        Ok(self
            .argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

/// Translates email/password credentials into stored identities.
#[derive(Clone)]
pub struct CredentialService {
    store: Arc<dyn Store>,
    hashing: PasswordHashing,
}

impl CredentialService {
    pub fn new(store: Arc<dyn Store>, hashing: PasswordHashing) -> Self {
        Self { store, hashing }
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<UserRow, AuthError> {
        if self.store.find_user_by_email(email).await?.is_some() {
            return Err(AuthError::DuplicateIdentity);
        }

        let password_hash = self.hash_blocking(password.to_string()).await?;
        let user = self
            .store
            .create_user(NewUser {
                email: email.to_string(),
                name: name.to_string(),
                password_hash,
            })
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration.
                StoreError::UniqueViolation => AuthError::DuplicateIdentity,
                other => AuthError::Persistence(other),
            })?;

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<UserRow, AuthError> {
        let user = self.store.find_user_by_email(email).await?;
        let hash = match &user {
            Some(u) => u.password_hash.clone(),
            None => self.hashing.dummy_hash.to_string(),
        };

        let matches = self.verify_blocking(password.to_string(), hash).await?;
        match user {
            Some(user) if matches => {
                debug!(user_id = %user.id, "credentials accepted");
                Ok(user)
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn hash_blocking(&self, password: String) -> Result<String, AuthError> {
        let hashing = self.hashing.clone();
        tokio::task::spawn_blocking(move || hashing.hash(&password))
            .await
            .map_err(|e| AuthError::Hashing(format!("join: {e}")))?
    }

    async fn verify_blocking(&self, password: String, hash: String) -> Result<bool, AuthError> {
        let hashing = self.hashing.clone();
        tokio::task::spawn_blocking(move || hashing.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::Hashing(format!("join: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn cheap() -> PasswordHashing {
        PasswordHashing::new(HashCost {
            memory_kib: 64,
            iterations: 1,
        })
        .unwrap()
    }

    fn service() -> CredentialService {
        CredentialService::new(Arc::new(MemoryStore::new()), cheap())
    }

    #[test]
    fn hash_and_verify_password() {
        let hashing = cheap();
        let hash = hashing.hash("mypassword").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hashing.verify("mypassword", &hash).unwrap());
        assert!(!hashing.verify("wrong", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let hashing = cheap();
        assert_ne!(hashing.hash("same").unwrap(), hashing.hash("same").unwrap());
    }

    #[test]
    fn zero_iterations_are_rejected() {
        let err = PasswordHashing::new(HashCost {
            memory_kib: 64,
            iterations: 0,
        });
        assert!(matches!(err, Err(AuthError::Hashing(_))));
    }

    #[tokio::test]
    async fn register_then_authenticate() {
        let svc = service();
        let user = svc.register("a@x.com", "secret123", "A").await.unwrap();
        assert_eq!(user.email, "a@x.com");
        assert_ne!(user.password_hash, "secret123");

        let found = svc.authenticate("a@x.com", "secret123").await.unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let svc = service();
        svc.register("a@x.com", "secret123", "A").await.unwrap();
        let err = svc.register("a@x.com", "other-pass", "B").await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateIdentity));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_fail_identically() {
        let svc = service();
        svc.register("a@x.com", "secret123", "A").await.unwrap();

        let wrong = svc.authenticate("a@x.com", "nope").await.unwrap_err();
        let unknown = svc.authenticate("ghost@x.com", "secret123").await.unwrap_err();
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn concurrent_registration_has_one_winner() {
        let svc = service();
        let (a, b) = tokio::join!(
            svc.register("race@x.com", "secret123", "A"),
            svc.register("race@x.com", "secret456", "B"),
        );
        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(AuthError::DuplicateIdentity))));
    }
}
