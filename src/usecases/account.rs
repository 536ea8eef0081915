//! Account operations at the auth boundary: sign-up, sign-in, profile
//! completion and post-auth routing.

use crate::domain::user::{ProfileUpdate, User};

use super::{
    contracts::{AuthProvider, AuthState, AuthUser, DocumentStore, StoreError},
    error::{AccountError, ValidationError},
};

/// Where a client lands after an auth state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    SignIn,
    ProfileSetup(AuthUser),
    Main(User),
}

pub fn sign_up(
    auth: &dyn AuthProvider,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<AuthUser, AccountError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(ValidationError::EmptyCredentials.into());
    }
    if password != confirm_password {
        return Err(ValidationError::PasswordMismatch.into());
    }

    auth.sign_up(email, password).map_err(|error| {
        tracing::warn!(code = "SIGN_UP_FAILED", error = %error, "sign-up failed");
        error.into()
    })
}

pub fn sign_in(auth: &dyn AuthProvider, email: &str, password: &str) -> Result<AuthUser, AccountError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(ValidationError::EmptyCredentials.into());
    }

    auth.sign_in(email, password).map_err(|error| {
        tracing::warn!(code = "SIGN_IN_FAILED", error = %error, "sign-in failed");
        error.into()
    })
}

/// Creates or merges the user record for `account`. Presence fields are left
/// as they are.
pub fn complete_profile(
    store: &dyn DocumentStore,
    account: &AuthUser,
    username: &str,
    profile_image: Option<&str>,
) -> Result<User, AccountError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ValidationError::EmptyUsername.into());
    }

    let update = ProfileUpdate {
        username: username.to_owned(),
        email: Some(account.email.clone()),
        profile_image: profile_image
            .map(str::trim)
            .filter(|image| !image.is_empty())
            .map(str::to_owned),
    };

    let stored = store
        .merge_user(&account.id, &update)
        .and_then(|()| store.get_user(&account.id))
        .inspect_err(|error| {
            tracing::warn!(
                code = "PROFILE_SAVE_FAILED",
                user_id = %account.id,
                error = %error,
                "failed to save profile"
            );
        })?;

    stored.ok_or_else(|| StoreError::NotFound(format!("users/{}", account.id)).into())
}

/// Routes a signed-in account to profile setup until it has a username.
pub fn resolve_route(store: &dyn DocumentStore, state: &AuthState) -> Route {
    let account = match state {
        AuthState::SignedOut => return Route::SignIn,
        AuthState::SignedIn(account) => account,
    };

    match store.get_user(&account.id) {
        Ok(Some(user)) if user.has_profile() => Route::Main(user),
        Ok(_) => Route::ProfileSetup(account.clone()),
        Err(error) => {
            tracing::warn!(
                code = "PROFILE_LOAD_FAILED",
                user_id = %account.id,
                error = %error,
                "failed to load profile, asking for it again"
            );
            Route::ProfileSetup(account.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::{memory_auth::MemoryAuth, memory_store::MemoryStore},
        usecases::contracts::AuthError,
    };

    #[test]
    fn sign_up_rejects_mismatched_confirmation_before_any_call() {
        let auth = MemoryAuth::new();

        let result = sign_up(&auth, "a@example.com", "secret", "secrte");

        assert_eq!(
            result,
            Err(AccountError::Validation(ValidationError::PasswordMismatch))
        );
        assert_eq!(auth.account_count(), 0);
    }

    #[test]
    fn sign_up_rejects_blank_credentials() {
        let auth = MemoryAuth::new();

        assert_eq!(
            sign_up(&auth, "  ", "secret", "secret"),
            Err(AccountError::Validation(ValidationError::EmptyCredentials))
        );
        assert_eq!(
            sign_in(&auth, "a@example.com", ""),
            Err(AccountError::Validation(ValidationError::EmptyCredentials))
        );
    }

    #[test]
    fn sign_in_surfaces_auth_errors() {
        let auth = MemoryAuth::new();
        sign_up(&auth, "a@example.com", "secret", "secret").expect("sign up");

        assert_eq!(
            sign_in(&auth, "a@example.com", "wrong"),
            Err(AccountError::Auth(AuthError::InvalidCredentials))
        );
    }

    #[test]
    fn complete_profile_rejects_empty_username() {
        let store = MemoryStore::new();
        let auth = MemoryAuth::new();
        let account = sign_up(&auth, "a@example.com", "secret", "secret").expect("sign up");

        assert_eq!(
            complete_profile(&store, &account, "   ", None),
            Err(AccountError::Validation(ValidationError::EmptyUsername))
        );
        assert_eq!(store.get_user(&account.id).expect("get"), None);
    }

    #[test]
    fn route_follows_profile_completion() {
        let store = MemoryStore::new();
        let auth = MemoryAuth::new();
        assert_eq!(resolve_route(&store, &AuthState::SignedOut), Route::SignIn);

        let account = sign_up(&auth, "a@example.com", "secret", "secret").expect("sign up");
        let signed_in = AuthState::SignedIn(account.clone());
        assert_eq!(
            resolve_route(&store, &signed_in),
            Route::ProfileSetup(account.clone())
        );

        let user = complete_profile(&store, &account, " alice ", Some("https://img/a.png"))
            .expect("profile saved");
        assert_eq!(user.username, "alice");
        assert_eq!(user.email.as_deref(), Some("a@example.com"));
        assert_eq!(resolve_route(&store, &signed_in), Route::Main(user));
    }
}
