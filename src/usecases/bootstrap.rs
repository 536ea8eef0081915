use std::path::Path;

use crate::{
    backend::{memory_auth::MemoryAuth, memory_store::MemoryStore},
    domain::{ids::UserId, user::ProfileUpdate},
    infra::{self, config::FileConfigAdapter, contracts::ConfigAdapter, error::AppError},
    usecases::{context::AppContext, contracts::DocumentStore},
};

pub fn bootstrap(config_path: Option<&Path>) -> Result<AppContext, AppError> {
    let mut context = build_context(config_path)?;
    context.log_guard = infra::logging::init(&context.config.logging)?;

    let seeded = seed_directory(&context.store, &context.config.directory.seed_users);
    tracing::info!(seeded, "backend ready");

    Ok(context)
}

fn build_context(config_path: Option<&Path>) -> Result<AppContext, AppError> {
    let config_adapter = FileConfigAdapter::new(config_path);
    let config = config_adapter.load()?;

    Ok(AppContext::new(config, MemoryStore::new(), MemoryAuth::new()))
}

/// Registers the configured usernames as profiles without accounts, so a
/// fresh install has someone to talk to. Returns how many were stored.
pub fn seed_directory(store: &dyn DocumentStore, usernames: &[String]) -> usize {
    let mut seeded = 0;
    for username in usernames {
        let username = username.trim();
        if username.is_empty() {
            continue;
        }

        let Ok(id) = UserId::parse(format!("seed-{}", username.to_lowercase())) else {
            tracing::warn!(code = "SEED_USER_INVALID", username, "seed username rejected");
            continue;
        };
        let profile = ProfileUpdate {
            username: username.to_owned(),
            email: None,
            profile_image: None,
        };
        match store.merge_user(&id, &profile) {
            Ok(()) => seeded += 1,
            Err(error) => tracing::warn!(
                code = "SEED_USER_FAILED",
                username,
                error = %error,
                "failed to seed user"
            ),
        }
    }
    seeded
}
