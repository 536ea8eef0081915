//! Console input parsing.

use crate::domain::message::MessageKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Empty line: just pick up live changes.
    Refresh,
    Help,
    Users,
    Inbox,
    Open { username: String },
    Messages,
    Send { text: String },
    Upload { url: String, kind: Option<MessageKind> },
    Search { term: String },
    Clear,
    Read,
    Logout,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command /{0}, try /help")]
    Unknown(String),
    #[error("/{command} needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error("unknown media kind {0:?}, use image, video or file")]
    InvalidKind(String),
}

pub const HELP_LINES: [&str; 13] = [
    "/users                  list everyone else",
    "/inbox                  your chats, most recent first",
    "/open <username>        open the chat with a user",
    "/messages               show the open chat again",
    "<text> or /send <text>  send a message",
    "/upload <url> [kind]    send an uploaded image, video or file",
    "/search <term>          search users by name",
    "/clear                  delete the open chat's history",
    "/read                   mark incoming messages read",
    "/logout                 sign out",
    "/quit                   exit",
    "/help                   this list",
    "<empty line>            refresh",
];

pub fn parse(line: &str) -> Result<ConsoleCommand, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ConsoleCommand::Refresh);
    }

    let Some(rest) = line.strip_prefix('/') else {
        return Ok(ConsoleCommand::Send {
            text: line.to_owned(),
        });
    };

    let (command, argument) = match rest.split_once(char::is_whitespace) {
        Some((command, argument)) => (command, argument.trim()),
        None => (rest, ""),
    };

    match command.to_ascii_lowercase().as_str() {
        "help" | "h" => Ok(ConsoleCommand::Help),
        "users" => Ok(ConsoleCommand::Users),
        "inbox" => Ok(ConsoleCommand::Inbox),
        "messages" | "m" => Ok(ConsoleCommand::Messages),
        "open" | "o" => {
            let username = required(argument, "open", "a username")?;
            Ok(ConsoleCommand::Open { username })
        }
        "send" | "s" => {
            let text = required(argument, "send", "some text")?;
            Ok(ConsoleCommand::Send { text })
        }
        "upload" => parse_upload(argument),
        "search" => Ok(ConsoleCommand::Search {
            term: argument.to_owned(),
        }),
        "clear" => Ok(ConsoleCommand::Clear),
        "read" => Ok(ConsoleCommand::Read),
        "logout" => Ok(ConsoleCommand::Logout),
        "quit" | "q" | "exit" => Ok(ConsoleCommand::Quit),
        other => Err(CommandError::Unknown(other.to_owned())),
    }
}

fn required(argument: &str, command: &'static str, what: &'static str) -> Result<String, CommandError> {
    if argument.is_empty() {
        return Err(CommandError::MissingArgument {
            command,
            argument: what,
        });
    }
    Ok(argument.to_owned())
}

fn parse_upload(argument: &str) -> Result<ConsoleCommand, CommandError> {
    let mut parts = argument.split_whitespace();
    let url = parts.next().ok_or(CommandError::MissingArgument {
        command: "upload",
        argument: "a URL",
    })?;

    let kind = match parts.next() {
        None => None,
        Some(kind) => Some(match kind.to_ascii_lowercase().as_str() {
            "image" => MessageKind::Image,
            "video" => MessageKind::Video,
            "file" => MessageKind::file_from_url(url),
            _ => return Err(CommandError::InvalidKind(kind.to_owned())),
        }),
    };

    Ok(ConsoleCommand::Upload {
        url: url.to_owned(),
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_sent() {
        assert_eq!(
            parse("  hello there "),
            Ok(ConsoleCommand::Send {
                text: "hello there".to_owned()
            })
        );
    }

    #[test]
    fn empty_line_refreshes() {
        assert_eq!(parse("   "), Ok(ConsoleCommand::Refresh));
    }

    #[test]
    fn open_requires_username() {
        assert_eq!(
            parse("/open"),
            Err(CommandError::MissingArgument {
                command: "open",
                argument: "a username"
            })
        );
        assert_eq!(
            parse("/OPEN bob"),
            Ok(ConsoleCommand::Open {
                username: "bob".to_owned()
            })
        );
    }

    #[test]
    fn search_keeps_empty_term() {
        assert_eq!(
            parse("/search"),
            Ok(ConsoleCommand::Search {
                term: String::new()
            })
        );
        assert_eq!(
            parse("/search  Ali "),
            Ok(ConsoleCommand::Search {
                term: "Ali".to_owned()
            })
        );
    }

    #[test]
    fn upload_accepts_optional_kind() {
        assert_eq!(
            parse("/upload https://x/a.bin"),
            Ok(ConsoleCommand::Upload {
                url: "https://x/a.bin".to_owned(),
                kind: None
            })
        );
        assert_eq!(
            parse("/upload https://x/a.bin video"),
            Ok(ConsoleCommand::Upload {
                url: "https://x/a.bin".to_owned(),
                kind: Some(MessageKind::Video)
            })
        );
        assert_eq!(
            parse("/upload https://x/photo.png file"),
            Ok(ConsoleCommand::Upload {
                url: "https://x/photo.png".to_owned(),
                kind: Some(MessageKind::File {
                    file_name: "photo.png".to_owned()
                })
            })
        );
        assert_eq!(
            parse("/upload https://x/a.bin gif"),
            Err(CommandError::InvalidKind("gif".to_owned()))
        );
    }

    #[test]
    fn unknown_commands_are_reported() {
        assert_eq!(
            parse("/dance"),
            Err(CommandError::Unknown("dance".to_owned()))
        );
    }
}
