//! Domain layer: core entities and business rules.

pub mod chat;
pub mod chat_identity;
pub mod chat_list_state;
pub mod directory_state;
pub mod ids;
pub mod live_collection;
pub mod message;
pub mod open_chat_state;
pub mod user;

/// Returns the domain module name for smoke checks.
pub fn module_name() -> &'static str {
    "domain"
}
