//! Plain-text rendering for the console.
//!
//! Message lists get a date separator whenever the day changes, and
//! consecutive messages from one sender show the sender only once.

use chrono::{DateTime, Local, NaiveDate, Utc};

use crate::domain::{
    chat_list_state::ChatSummary,
    ids::UserId,
    message::Message,
    user::User,
};

/// Represents a visual element in the messages list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageListElement {
    DateSeparator(String),
    Message {
        time: String,
        sender: Option<String>,
        content: String,
        read_marker: Option<&'static str>,
    },
}

/// Builds a list of visual elements from messages, seen by `me`.
/// `display_name` resolves sender ids.
pub fn build_message_list_elements<'a>(
    messages: impl IntoIterator<Item = &'a Message>,
    me: &UserId,
    display_name: impl Fn(&UserId) -> String,
) -> Vec<MessageListElement> {
    let mut elements = Vec::new();
    let mut prev_date: Option<NaiveDate> = None;
    let mut prev_sender: Option<&UserId> = None;

    for message in messages {
        let msg_date = local_date(message.timestamp);

        if prev_date != Some(msg_date) {
            elements.push(MessageListElement::DateSeparator(format_date(msg_date)));
            prev_sender = None;
        }

        let sender = (prev_sender != Some(&message.sender_id)).then(|| {
            if message.is_from(me) {
                "You".to_owned()
            } else {
                display_name(&message.sender_id)
            }
        });

        // Outgoing messages show whether the peer has read them.
        let read_marker = message
            .is_from(me)
            .then_some(if message.read { "read" } else { "sent" });

        elements.push(MessageListElement::Message {
            time: format_time(message.timestamp),
            sender,
            content: message.display_content(),
            read_marker,
        });

        prev_date = Some(msg_date);
        prev_sender = Some(&message.sender_id);
    }

    elements
}

pub fn element_lines(element: &MessageListElement) -> Vec<String> {
    match element {
        MessageListElement::DateSeparator(date) => vec![format!("--- {date} ---")],
        MessageListElement::Message {
            time,
            sender,
            content,
            read_marker,
        } => {
            let mut lines = Vec::new();
            if let Some(sender) = sender {
                lines.push(format!("{time:>5} {sender}:"));
            }
            let suffix = read_marker.map(|marker| format!("  ({marker})")).unwrap_or_default();
            let content = if content.is_empty() {
                "[Empty message]"
            } else {
                content.as_str()
            };
            let indent = if sender.is_some() {
                "      ".to_owned()
            } else {
                format!("{time:>5} ")
            };
            lines.push(format!("{indent}{content}{suffix}"));
            lines
        }
    }
}

pub fn user_line(user: &User, placeholder_image: &str) -> String {
    let presence = if user.is_online {
        "online".to_owned()
    } else {
        match user.last_seen {
            Some(seen) => format!("last seen {}", format_datetime(seen)),
            None => "offline".to_owned(),
        }
    };
    format!(
        "{:<16} {:<24} {} [{}]",
        user.username,
        presence,
        user.status_label(),
        user.profile_image_or(placeholder_image)
    )
}

pub fn inbox_line(summary: &ChatSummary, peer_name: &str) -> String {
    let unread = match summary.unread_count {
        0 => String::new(),
        count => format!(" ({count} unread)"),
    };
    let when = summary
        .last_message_time
        .map(|time| format!(" {}", format_datetime(time)))
        .unwrap_or_default();
    let preview = summary
        .last_message_preview
        .as_deref()
        .unwrap_or("No messages yet");

    format!("{peer_name}{unread}{when}: {preview}")
}

fn local_date(timestamp: DateTime<Utc>) -> NaiveDate {
    timestamp.with_timezone(&Local).date_naive()
}

fn format_date(date: NaiveDate) -> String {
    date.format("%-d %b %Y").to_string()
}

fn format_time(timestamp: DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%H:%M").to_string()
}

fn format_datetime(timestamp: DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%-d %b %H:%M").to_string()
}
