use std::{
    collections::HashMap,
    sync::{mpsc, Arc, Mutex},
};

use uuid::Uuid;

use crate::{
    domain::ids::UserId,
    usecases::contracts::{AuthError, AuthProvider, AuthState, AuthUser},
};

/// In-process email/password accounts. Passwords are kept in memory as given.
#[derive(Clone, Default)]
pub struct MemoryAuth {
    inner: Arc<Mutex<AuthInner>>,
}

#[derive(Default)]
struct AuthInner {
    accounts: HashMap<String, Account>,
    current: Option<AuthUser>,
    listeners: Vec<mpsc::Sender<AuthState>>,
}

struct Account {
    user: AuthUser,
    password: String,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account_count(&self) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.accounts.len())
            .unwrap_or_default()
    }

    fn with_inner<T>(&self, f: impl FnOnce(&mut AuthInner) -> Result<T, AuthError>) -> Result<T, AuthError> {
        let mut inner = self.inner.lock().map_err(|_| {
            tracing::error!(code = "AUTH_LOCK_POISONED", "memory auth lock poisoned");
            AuthError::Unavailable
        })?;
        f(&mut inner)
    }
}

impl AuthInner {
    fn set_current(&mut self, user: Option<AuthUser>) {
        self.current = user;
        let state = match &self.current {
            Some(user) => AuthState::SignedIn(user.clone()),
            None => AuthState::SignedOut,
        };
        self.listeners
            .retain(|listener| listener.send(state.clone()).is_ok());
    }
}

fn account_key(email: &str) -> String {
    email.trim().to_lowercase()
}

impl AuthProvider for MemoryAuth {
    fn current_user(&self) -> Option<AuthUser> {
        self.inner.lock().ok().and_then(|inner| inner.current.clone())
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        self.with_inner(|inner| {
            let user = match inner.accounts.get(&account_key(email)) {
                Some(account) if account.password == password => account.user.clone(),
                _ => return Err(AuthError::InvalidCredentials),
            };
            inner.set_current(Some(user.clone()));
            tracing::info!(user_id = %user.id, "signed in");
            Ok(user)
        })
    }

    fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        self.with_inner(|inner| {
            let key = account_key(email);
            if inner.accounts.contains_key(&key) {
                return Err(AuthError::EmailInUse);
            }

            let id = UserId::parse(Uuid::new_v4().simple().to_string())
                .map_err(|_| AuthError::Unavailable)?;
            let user = AuthUser {
                id,
                email: email.trim().to_owned(),
            };
            inner.accounts.insert(
                key,
                Account {
                    user: user.clone(),
                    password: password.to_owned(),
                },
            );
            inner.set_current(Some(user.clone()));
            tracing::info!(user_id = %user.id, "account created");
            Ok(user)
        })
    }

    fn sign_out(&self) -> Result<(), AuthError> {
        self.with_inner(|inner| {
            inner.set_current(None);
            Ok(())
        })
    }

    fn auth_state_changes(&self) -> mpsc::Receiver<AuthState> {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut inner) = self.inner.lock() {
            let state = match &inner.current {
                Some(user) => AuthState::SignedIn(user.clone()),
                None => AuthState::SignedOut,
            };
            if tx.send(state).is_ok() {
                inner.listeners.push(tx);
            }
        }
        rx
    }
}
