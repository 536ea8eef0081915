use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{
    ids::{ChatId, MessageId, UserId},
    live_collection::LiveDocument,
};

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];
const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "webm", "ogg"];
const FALLBACK_FILE_NAME: &str = "Shared file";

/// Kind of content a message carries. Non-text kinds carry a URL in
/// [`Message::content`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    File {
        #[serde(rename = "fileName")]
        file_name: String,
    },
}

impl MessageKind {
    /// Returns a display label for media kinds, or None for plain text.
    pub fn display_label(&self) -> Option<&'static str> {
        match self {
            MessageKind::Text => None,
            MessageKind::Image => Some("[Image]"),
            MessageKind::Video => Some("[Video]"),
            MessageKind::File { .. } => Some("[File]"),
        }
    }

    /// Classifies an uploaded media URL by its extension.
    pub fn classify_upload(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let last_segment = path.rsplit('/').next().unwrap_or(path);
        let extension = last_segment
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            return MessageKind::Image;
        }
        if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            return MessageKind::Video;
        }

        MessageKind::File {
            file_name: file_name_from_segment(last_segment),
        }
    }

    /// File kind named after the URL's last path segment.
    pub fn file_from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let last_segment = path.rsplit('/').next().unwrap_or(path);
        MessageKind::File {
            file_name: file_name_from_segment(last_segment),
        }
    }
}

fn file_name_from_segment(segment: &str) -> String {
    if segment.is_empty() || segment.contains(':') {
        FALLBACK_FILE_NAME.to_owned()
    } else {
        segment.to_owned()
    }
}

/// One entry of a chat's message log (`chats/{chatId}/messages`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(skip_serializing)]
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    #[serde(flatten)]
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

impl Message {
    /// Returns the display content: media label + reference, or just text.
    pub fn display_content(&self) -> String {
        match (&self.kind, self.kind.display_label()) {
            (MessageKind::File { file_name }, Some(label)) => {
                format!("{label} {file_name} ({})", self.content)
            }
            (_, Some(label)) => format!("{label} {}", self.content),
            (_, None) => self.content.clone(),
        }
    }

    /// Text stored as the chat's `lastMessage`.
    pub fn preview(&self) -> String {
        preview_for(&self.kind, &self.content)
    }

    pub fn is_from(&self, user: &UserId) -> bool {
        &self.sender_id == user
    }

    /// `read` only moves from false to true.
    pub fn mark_read(&mut self) -> bool {
        if self.read {
            return false;
        }
        self.read = true;
        true
    }
}

pub fn preview_for(kind: &MessageKind, content: &str) -> String {
    match kind {
        MessageKind::Text => content.to_owned(),
        MessageKind::File { file_name } => format!("[File] {file_name}"),
        other => other.display_label().unwrap_or_default().to_owned(),
    }
}

impl LiveDocument for Message {
    type Key = MessageId;
    type SortKey = DateTime<Utc>;

    fn key(&self) -> &Self::Key {
        &self.id
    }

    fn sort_key(&self) -> Self::SortKey {
        self.timestamp
    }
}

/// A message as submitted by a client, before the store assigns its id and
/// timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub kind: MessageKind,
}

impl NewMessage {
    pub fn into_message(self, id: MessageId, timestamp: DateTime<Utc>) -> Message {
        Message {
            id,
            chat_id: self.chat_id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            content: self.content,
            kind: self.kind,
            timestamp,
            read: false,
        }
    }
}
