use crate::domain::chat_identity::ChatIdentityError;

use super::contracts::{AuthError, StoreError};

/// Input rejected before any remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("message text is empty")]
    EmptyMessage,
    #[error("media reference must be an http(s) URL")]
    InvalidMediaUrl,
    #[error("username is empty")]
    EmptyUsername,
    #[error("email and password are required")]
    EmptyCredentials,
    #[error("passwords don't match")]
    PasswordMismatch,
    #[error("cannot open a chat with yourself")]
    SelfChat,
}

impl From<ChatIdentityError> for ValidationError {
    fn from(error: ChatIdentityError) -> Self {
        match error {
            ChatIdentityError::SameParticipant => ValidationError::SelfChat,
        }
    }
}

/// Operation invoked in a session state that does not allow it. Callers
/// treat these as no-ops.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("no active session user")]
    NoSessionUser,
    #[error("no chat is open")]
    NoOpenChat,
    #[error("session user is not a participant of this chat")]
    NotAParticipant,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("delivery failed, try again: {0}")]
    Transport(#[from] StoreError),
    #[error(transparent)]
    State(#[from] StateError),
}

impl ChatError {
    /// Stable code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::Validation(_) => "VALIDATION_ERROR",
            ChatError::Transport(_) => "TRANSPORT_ERROR",
            ChatError::State(_) => "STATE_ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("sign-in failed: {0}")]
    Auth(#[from] AuthError),
    #[error("profile storage failed, try again: {0}")]
    Transport(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_participant_maps_to_self_chat() {
        let error: ValidationError = ChatIdentityError::SameParticipant.into();

        assert_eq!(error, ValidationError::SelfChat);
    }

    #[test]
    fn transport_errors_read_as_try_again() {
        let error = ChatError::from(StoreError::Unavailable);

        assert_eq!(error.code(), "TRANSPORT_ERROR");
        assert!(error.to_string().contains("try again"));
    }
}
