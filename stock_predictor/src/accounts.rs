//! Credential gate in front of the prediction page.
//!
//! Accounts and sessions live in memory only. Passwords are compared as
//! given; there is no hashing or persistence layer.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("email must not be empty")]
    EmptyEmail,

    #[error("password must not be empty")]
    EmptyPassword,

    #[error("an account for {0} already exists")]
    AlreadyRegistered(String),

    #[error("invalid email or password")]
    InvalidCredentials,
}

/// A registered account.
#[derive(Debug, Clone)]
pub struct User {
    pub email: String,
    password: Arc<SecretString>,
}

impl User {
    fn password_matches(&self, candidate: &str) -> bool {
        self.password.expose_secret() == candidate
    }
}

/// Emails are compared trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Storage of accounts keyed by normalized email.
pub trait UserStore: Send + Sync {
    fn create(&self, email: &str, password: SecretString) -> Result<User, AccountError>;
    fn lookup(&self, email: &str) -> Option<User>;
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for InMemoryUserStore {
    fn create(&self, email: &str, password: SecretString) -> Result<User, AccountError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AccountError::EmptyEmail);
        }
        if password.expose_secret().is_empty() {
            return Err(AccountError::EmptyPassword);
        }

        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        if users.contains_key(&email) {
            return Err(AccountError::AlreadyRegistered(email));
        }
        let user = User {
            email: email.clone(),
            password: Arc::new(password),
        };
        users.insert(email, user.clone());
        info!(email = %user.email, "account created");
        Ok(user)
    }

    fn lookup(&self, email: &str) -> Option<User> {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&normalize_email(email))
            .cloned()
    }
}

/// Outcome of presenting a session token at the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Granted { user: String },
    RedirectToLogin,
}

/// Live sessions, token → email.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, String>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks the credential against `store` and opens a session.
    pub fn login(
        &self,
        store: &dyn UserStore,
        email: &str,
        password: &SecretString,
    ) -> Result<String, AccountError> {
        let user = store
            .lookup(email)
            .filter(|u| u.password_matches(password.expose_secret()))
            .ok_or(AccountError::InvalidCredentials)?;

        let token = Uuid::new_v4().to_string();
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.clone(), user.email.clone());
        info!(email = %user.email, "session opened");
        Ok(token)
    }

    pub fn gate(&self, token: Option<&str>) -> Access {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        match token.and_then(|t| sessions.get(t)) {
            Some(email) => Access::Granted {
                user: email.clone(),
            },
            None => {
                debug!("no valid session, redirecting to login");
                Access::RedirectToLogin
            }
        }
    }

    /// Closes a session. Returns whether it existed.
    pub fn logout(&self, token: &str) -> bool {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token)
            .is_some()
    }
}
