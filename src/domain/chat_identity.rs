use super::ids::{ChatId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatIdentityError {
    #[error("a chat needs two distinct participants")]
    SameParticipant,
}

/// Derives the canonical chat key for a pair of users.
///
/// The ids are sorted before joining, so the result does not depend on which
/// side opens the chat.
pub fn derive_chat_id(a: &UserId, b: &UserId) -> Result<ChatId, ChatIdentityError> {
    if a == b {
        return Err(ChatIdentityError::SameParticipant);
    }

    let (first, second) = if a < b { (a, b) } else { (b, a) };
    Ok(ChatId::from_sorted(first, second))
}
