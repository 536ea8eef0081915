//! In-process implementations of the store and auth contracts.

pub mod memory_auth;
pub mod memory_store;

/// Returns the backend module name for smoke checks.
pub fn module_name() -> &'static str {
    "backend"
}
