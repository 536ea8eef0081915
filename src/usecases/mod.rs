//! Use case layer: application workflows and orchestration.

pub mod account;
pub mod bootstrap;
pub mod chat_session;
pub mod context;
pub mod contracts;
pub mod directory;
pub mod error;
pub mod guided_auth;
pub mod inbox;
pub mod logout;
pub mod presence;
pub mod search;
pub mod send_message;
pub mod subscription;

/// Returns the usecases module name for smoke checks.
pub fn module_name() -> &'static str {
    "usecases"
}
