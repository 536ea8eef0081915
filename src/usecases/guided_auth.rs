use std::io;

use crate::domain::user::User;

use super::{
    account::{complete_profile, resolve_route, sign_in, sign_up, Route},
    contracts::{AuthError, AuthProvider, AuthState, AuthUser, DocumentStore, StoreError},
    error::{AccountError, ValidationError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub credential_attempts: usize,
    pub profile_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            credential_attempts: 3,
            profile_attempts: 3,
        }
    }
}

pub trait Terminal {
    fn print_line(&mut self, line: &str) -> io::Result<()>;
    fn prompt_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
    fn prompt_secret(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

pub struct StdTerminal;

impl Terminal for StdTerminal {
    fn print_line(&mut self, line: &str) -> io::Result<()> {
        println!("{line}");
        Ok(())
    }

    fn prompt_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        use std::io::Write;

        print!("{prompt}");
        io::stdout().flush()?;

        let mut line = String::new();
        let bytes = io::stdin().read_line(&mut line)?;
        if bytes == 0 {
            return Ok(None);
        }

        Ok(Some(line.trim().to_owned()))
    }

    fn prompt_secret(&mut self, prompt: &str) -> io::Result<Option<String>> {
        match rpassword::prompt_password(prompt) {
            Ok(password) => Ok(Some(password.trim().to_owned())),
            Err(source) if source.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(source) => Err(source),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuidedAuthOutcome {
    Authenticated(User),
    Exit,
}

/// Walks the user from whatever the auth state is now to a signed-in account
/// with a completed profile.
pub fn run_guided_auth(
    terminal: &mut dyn Terminal,
    auth: &dyn AuthProvider,
    store: &dyn DocumentStore,
    retry_policy: &RetryPolicy,
) -> io::Result<GuidedAuthOutcome> {
    let state = match auth.current_user() {
        Some(account) => AuthState::SignedIn(account),
        None => AuthState::SignedOut,
    };

    let account = match resolve_route(store, &state) {
        Route::Main(user) => return Ok(GuidedAuthOutcome::Authenticated(user)),
        Route::ProfileSetup(account) => account,
        Route::SignIn => {
            let Some(account) = collect_account(terminal, auth, retry_policy.credential_attempts)?
            else {
                return Ok(GuidedAuthOutcome::Exit);
            };
            account
        }
    };

    if let Route::Main(user) =
        resolve_route(store, &AuthState::SignedIn(account.clone()))
    {
        terminal.print_line(&format!("Welcome back, {}.", user.username))?;
        return Ok(GuidedAuthOutcome::Authenticated(user));
    }

    match collect_profile(terminal, store, &account, retry_policy.profile_attempts)? {
        Some(user) => {
            terminal.print_line(&format!("Profile saved. Hello, {}.", user.username))?;
            Ok(GuidedAuthOutcome::Authenticated(user))
        }
        None => Ok(GuidedAuthOutcome::Exit),
    }
}

fn collect_account(
    terminal: &mut dyn Terminal,
    auth: &dyn AuthProvider,
    attempts: usize,
) -> io::Result<Option<AuthUser>> {
    terminal.print_line("Not signed in.")?;

    for attempt in 1..=attempts {
        let Some(choice) = terminal.prompt_line("[s]ign in or [c]reate account? ")? else {
            terminal.print_line("Input cancelled (EOF).")?;
            return Ok(None);
        };
        let creating = choice.eq_ignore_ascii_case("c") || choice.eq_ignore_ascii_case("create");

        let Some(email) = terminal.prompt_line("Email: ")? else {
            terminal.print_line("Input cancelled (EOF).")?;
            return Ok(None);
        };
        let Some(password) = terminal.prompt_secret("Password: ")? else {
            terminal.print_line("Input cancelled (EOF).")?;
            return Ok(None);
        };

        let result = if creating {
            let Some(confirm) = terminal.prompt_secret("Confirm password: ")? else {
                terminal.print_line("Input cancelled (EOF).")?;
                return Ok(None);
            };
            sign_up(auth, &email, &password, &confirm)
        } else {
            sign_in(auth, &email, &password)
        };

        match result {
            Ok(account) => return Ok(Some(account)),
            Err(error) => {
                if !report_account_error(terminal, &error, attempt, attempts)? {
                    return Ok(None);
                }
            }
        }
    }

    terminal.print_line("Sign-in failed too many times. Run pairchat again to retry.")?;
    Ok(None)
}

fn collect_profile(
    terminal: &mut dyn Terminal,
    store: &dyn DocumentStore,
    account: &AuthUser,
    attempts: usize,
) -> io::Result<Option<User>> {
    terminal.print_line("Set up your profile.")?;

    for attempt in 1..=attempts {
        let Some(username) = terminal.prompt_line("Username: ")? else {
            terminal.print_line("Input cancelled (EOF).")?;
            return Ok(None);
        };
        let Some(image) = terminal.prompt_line("Profile image URL (optional): ")? else {
            terminal.print_line("Input cancelled (EOF).")?;
            return Ok(None);
        };

        match complete_profile(store, account, &username, Some(&image)) {
            Ok(user) => return Ok(Some(user)),
            Err(error) => {
                if !report_account_error(terminal, &error, attempt, attempts)? {
                    return Ok(None);
                }
            }
        }
    }

    terminal.print_line("Profile setup failed too many times. Run pairchat again to retry.")?;
    Ok(None)
}

/// Prints a user-facing line for `error`. Returns whether another attempt is
/// allowed.
fn report_account_error(
    terminal: &mut dyn Terminal,
    error: &AccountError,
    attempt: usize,
    max_attempts: usize,
) -> io::Result<bool> {
    let attempts_left = max_attempts.saturating_sub(attempt);

    let code = match error {
        AccountError::Validation(ValidationError::PasswordMismatch) => "ACCOUNT_PASSWORD_MISMATCH",
        AccountError::Validation(ValidationError::EmptyUsername) => "ACCOUNT_EMPTY_USERNAME",
        AccountError::Validation(_) => "ACCOUNT_INVALID_INPUT",
        AccountError::Auth(AuthError::InvalidCredentials) => "ACCOUNT_INVALID_CREDENTIALS",
        AccountError::Auth(AuthError::EmailInUse) => "ACCOUNT_EMAIL_IN_USE",
        AccountError::Auth(AuthError::Unavailable)
        | AccountError::Transport(StoreError::Unavailable) => "ACCOUNT_UNAVAILABLE",
        AccountError::Transport(_) => "ACCOUNT_TRANSIENT",
    };

    terminal.print_line(&format!("{code}: {error}. Attempts left: {attempts_left}"))?;
    Ok(attempts_left > 0)
}
