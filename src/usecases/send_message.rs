//! Use case for sending a message into a chat.
//!
//! One send is one atomic write batch: the message itself, the chat summary
//! and a relative increment of the receiver's unread counter.

use crate::domain::{
    chat::ChatFieldOp,
    ids::{ChatId, UserId},
    message::{preview_for, Message, MessageKind, NewMessage},
};

use super::{
    contracts::{DocumentStore, WriteBatch, WriteOp},
    error::{ChatError, ValidationError},
};

/// What the user is sending: typed text, or a reference produced by the
/// external upload widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingContent {
    Text(String),
    /// `kind` is `None` when the widget did not classify the upload.
    Media { url: String, kind: Option<MessageKind> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageCommand {
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: OutgoingContent,
}

/// Validates `command` and builds the batch without touching the store.
pub fn build_send_batch(command: SendMessageCommand) -> Result<WriteBatch, ValidationError> {
    let (content, kind) = normalize(command.content)?;
    let preview = preview_for(&kind, &content);

    Ok(WriteBatch::new()
        .with(WriteOp::AddMessage(NewMessage {
            chat_id: command.chat_id.clone(),
            sender_id: command.sender_id,
            receiver_id: command.receiver_id.clone(),
            content,
            kind,
        }))
        .with(WriteOp::UpdateChat {
            chat_id: command.chat_id,
            ops: vec![
                ChatFieldOp::SetLastMessage { preview },
                ChatFieldOp::IncrementUnread {
                    participant: command.receiver_id,
                    by: 1,
                },
            ],
        }))
}

/// Sends a message and returns it as stored.
///
/// Validation happens before any store call. A store failure abandons the
/// send; nothing is retried here.
pub fn send_message(store: &dyn DocumentStore, command: SendMessageCommand) -> Result<Message, ChatError> {
    let chat_id = command.chat_id.clone();
    let batch = build_send_batch(command).inspect_err(|error| {
        tracing::debug!(chat_id = %chat_id, error = %error, "message rejected before send");
    })?;

    let outcome = store.commit(batch).inspect_err(|error| {
        tracing::warn!(
            code = "SEND_MESSAGE_FAILED",
            chat_id = %chat_id,
            error = %error,
            "message delivery failed"
        );
    })?;

    outcome.added.into_iter().next().ok_or_else(|| {
        tracing::warn!(
            code = "SEND_MESSAGE_FAILED",
            chat_id = %chat_id,
            "store committed a send batch without the message"
        );
        ChatError::Transport(super::contracts::StoreError::Rejected {
            code: "MISSING_MESSAGE".to_owned(),
        })
    })
}

fn normalize(content: OutgoingContent) -> Result<(String, MessageKind), ValidationError> {
    match content {
        OutgoingContent::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(ValidationError::EmptyMessage);
            }
            Ok((text.to_owned(), MessageKind::Text))
        }
        OutgoingContent::Media { url, kind } => {
            let url = url.trim();
            if !is_http_url(url) {
                return Err(ValidationError::InvalidMediaUrl);
            }
            let kind = match kind {
                Some(MessageKind::Text) => return Err(ValidationError::InvalidMediaUrl),
                Some(kind) => kind,
                None => MessageKind::classify_upload(url),
            };
            Ok((url.to_owned(), kind))
        }
    }
}

fn is_http_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    ["http://", "https://"]
        .iter()
        .filter_map(|scheme| lower.strip_prefix(scheme))
        .any(|rest| !rest.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::memory_store::{FaultTarget, MemoryStore},
        test_support::{seeded_pair, uid},
        usecases::contracts::StoreError,
    };

    fn command(content: OutgoingContent) -> SendMessageCommand {
        SendMessageCommand {
            chat_id: ChatId::parse("alice_bob").expect("valid chat id"),
            sender_id: uid("alice"),
            receiver_id: uid("bob"),
            content,
        }
    }

    fn text(raw: &str) -> OutgoingContent {
        OutgoingContent::Text(raw.to_owned())
    }

    #[test]
    fn rejects_empty_message_text() {
        assert_eq!(
            build_send_batch(command(text(""))),
            Err(ValidationError::EmptyMessage)
        );
    }

    #[test]
    fn rejects_whitespace_only_message() {
        assert_eq!(
            build_send_batch(command(text("   \n\t  "))),
            Err(ValidationError::EmptyMessage)
        );
    }

    #[test]
    fn batch_carries_message_summary_and_relative_increment() {
        let batch = build_send_batch(command(text("  hi  "))).expect("valid text");

        assert_eq!(batch.len(), 2);
        match &batch.ops()[0] {
            WriteOp::AddMessage(message) => {
                assert_eq!(message.content, "hi");
                assert_eq!(message.kind, MessageKind::Text);
            }
            other => panic!("unexpected first op: {other:?}"),
        }
        match &batch.ops()[1] {
            WriteOp::UpdateChat { ops, .. } => assert_eq!(
                ops,
                &vec![
                    ChatFieldOp::SetLastMessage {
                        preview: "hi".to_owned()
                    },
                    ChatFieldOp::IncrementUnread {
                        participant: uid("bob"),
                        by: 1
                    },
                ]
            ),
            other => panic!("unexpected second op: {other:?}"),
        }
    }

    #[test]
    fn media_requires_http_url() {
        for url in ["", "ftp://x/a.png", "file:///tmp/a.png", "https://"] {
            assert_eq!(
                build_send_batch(command(OutgoingContent::Media {
                    url: url.to_owned(),
                    kind: None
                })),
                Err(ValidationError::InvalidMediaUrl),
                "failed for {url:?}"
            );
        }
    }

    #[test]
    fn unclassified_media_is_classified_from_url() {
        let batch = build_send_batch(command(OutgoingContent::Media {
            url: "HTTPS://cdn.example/clip.mp4".to_owned(),
            kind: None,
        }))
        .expect("valid media");

        match &batch.ops()[0] {
            WriteOp::AddMessage(message) => assert_eq!(message.kind, MessageKind::Video),
            other => panic!("unexpected first op: {other:?}"),
        }
    }

    #[test]
    fn send_appends_message_and_bumps_receiver_only() {
        let store = seeded_pair();

        let message = send_message(&store, command(text("hi"))).expect("send succeeds");

        assert_eq!(message.sender_id, uid("alice"));
        assert!(!message.read);
        let chat = store
            .get_chat(&message.chat_id)
            .expect("get chat")
            .expect("chat exists");
        assert_eq!(chat.unread_for(&uid("bob")), 1);
        assert_eq!(chat.unread_for(&uid("alice")), 0);
        assert_eq!(chat.last_message.as_deref(), Some("hi"));
        assert_eq!(chat.last_message_time, Some(message.timestamp));
    }

    #[test]
    fn transport_failure_leaves_no_partial_effect() {
        let store = seeded_pair();
        store.fail_next(FaultTarget::Commit);

        let result = send_message(&store, command(text("hi")));

        assert_eq!(result, Err(ChatError::Transport(StoreError::Unavailable)));
        let chat_id = ChatId::parse("alice_bob").expect("valid");
        assert!(store.messages_of(&chat_id).is_empty());
        let chat = store.get_chat(&chat_id).expect("get").expect("exists");
        assert_eq!(chat.unread_for(&uid("bob")), 0);
        assert_eq!(chat.last_message, None);
    }

    #[test]
    fn validation_failure_never_reaches_store() {
        let store = MemoryStore::new();

        let result = send_message(&store, command(text(" ")));

        assert_eq!(
            result,
            Err(ChatError::Validation(ValidationError::EmptyMessage))
        );
    }
}
