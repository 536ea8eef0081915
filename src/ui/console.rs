//! Line-oriented console: guided sign-in, then a command loop over one
//! signed-in session.

use std::{collections::HashSet, time::Duration};

use tokio::{runtime::Handle, sync::mpsc::UnboundedReceiver};

use crate::{
    domain::{
        chat_list_state::ChatListUiState,
        directory_state::DirectoryUiState,
        ids::{MessageId, UserId},
        message::Message,
        user::User,
    },
    infra::{config::AppConfig, error::AppError, notifier::TerminalNotifier},
    usecases::{
        chat_session::{ChatSessionController, SessionUser},
        contracts::{AuthProvider, AuthState, DocumentStore, Notifier},
        directory::DirectoryFeed,
        error::ChatError,
        guided_auth::{run_guided_auth, GuidedAuthOutcome, RetryPolicy, Terminal},
        inbox::InboxFeed,
        logout::{logout, SessionHandles},
        presence::{ExitFlush, PresenceTracker},
        search::{DebouncedSearch, SearchResults},
    },
};

use super::{
    commands::{parse, ConsoleCommand, HELP_LINES},
    render::{build_message_list_elements, element_lines, inbox_line, user_line},
};

/// Extra wait on top of the debounce window before giving up on results.
const SEARCH_SLACK: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    Logout,
    Quit,
}

enum Flow {
    Continue,
    Exit(SessionExit),
}

/// Alternates guided auth and console sessions until the user quits.
pub fn run_console<S>(
    terminal: &mut dyn Terminal,
    config: &AppConfig,
    runtime: Handle,
    auth: &dyn AuthProvider,
    store: S,
) -> Result<(), AppError>
where
    S: DocumentStore + Clone + Send + 'static,
{
    let auth_events = auth.auth_state_changes();

    loop {
        let outcome = run_guided_auth(terminal, auth, &store, &RetryPolicy::default())?;
        for state in auth_events.try_iter() {
            tracing::debug!(signed_in = matches!(state, AuthState::SignedIn(_)), "auth state changed");
        }

        let GuidedAuthOutcome::Authenticated(user) = outcome else {
            return Ok(());
        };

        let mut session =
            ConsoleSession::start(&mut *terminal, config, runtime.clone(), auth, store.clone(), user);
        match session.run()? {
            SessionExit::Logout => continue,
            SessionExit::Quit => return Ok(()),
        }
    }
}

pub struct ConsoleSession<'a, S> {
    terminal: &'a mut dyn Terminal,
    config: &'a AppConfig,
    runtime: Handle,
    auth: &'a dyn AuthProvider,
    me: User,
    controller: ChatSessionController<S>,
    presence: PresenceTracker<S>,
    directory: DirectoryFeed,
    inbox: InboxFeed,
    notifier: TerminalNotifier,
    search: DebouncedSearch,
    search_results: UnboundedReceiver<SearchResults>,
    shown: HashSet<MessageId>,
    presence_ok: bool,
}

impl<'a, S> ConsoleSession<'a, S>
where
    S: DocumentStore + Clone + Send + 'static,
{
    pub fn start(
        terminal: &'a mut dyn Terminal,
        config: &'a AppConfig,
        runtime: Handle,
        auth: &'a dyn AuthProvider,
        store: S,
        me: User,
    ) -> Self {
        let presence = PresenceTracker::new(store.clone());
        let presence_ok = match presence.set_online(&me.id, true) {
            Ok(()) => true,
            // Logged by the tracker; the session still starts.
            Err(_) => false,
        };

        let mut controller = ChatSessionController::new(store.clone());
        controller.start_session(SessionUser {
            id: me.id.clone(),
            username: me.username.clone(),
        });

        let directory = DirectoryFeed::start(&store, me.id.clone());
        let inbox = InboxFeed::start(&store, me.id.clone());

        let mut notifier = TerminalNotifier::new(config.notifications.enabled);
        notifier.request_permission();

        let (search, search_results) =
            DebouncedSearch::new(runtime.clone(), config.search.debounce());

        Self {
            terminal,
            config,
            runtime,
            auth,
            me,
            controller,
            presence,
            directory,
            inbox,
            notifier,
            search,
            search_results,
            shown: HashSet::new(),
            presence_ok,
        }
    }

    pub fn run(&mut self) -> Result<SessionExit, AppError> {
        self.terminal
            .print_line(&format!("Signed in as {}. Type /help for commands.", self.me.username))?;
        if !self.presence_ok {
            self.terminal
                .print_line("Could not update your presence, others may see you offline.")?;
        }

        loop {
            self.refresh()?;

            let prompt = match self.open_peer_name() {
                Some(peer) => format!("{peer}> "),
                None => "> ".to_owned(),
            };
            let Some(line) = self.terminal.prompt_line(&prompt)? else {
                self.exit_offline();
                return Ok(SessionExit::Quit);
            };

            let command = match parse(&line) {
                Ok(command) => command,
                Err(error) => {
                    self.terminal.print_line(&error.to_string())?;
                    continue;
                }
            };

            if let Flow::Exit(exit) = self.handle(command)? {
                return Ok(exit);
            }
        }
    }

    fn handle(&mut self, command: ConsoleCommand) -> Result<Flow, AppError> {
        match command {
            ConsoleCommand::Refresh => {}
            ConsoleCommand::Help => {
                for line in HELP_LINES {
                    self.terminal.print_line(line)?;
                }
            }
            ConsoleCommand::Users => self.print_users()?,
            ConsoleCommand::Inbox => self.print_inbox()?,
            ConsoleCommand::Open { username } => self.open(&username)?,
            ConsoleCommand::Messages => self.print_transcript()?,
            ConsoleCommand::Send { text } => {
                let result = self.controller.send_text(&text);
                self.report(result.map(|_| ()))?;
            }
            ConsoleCommand::Upload { url, kind } => {
                let result = self.controller.handle_media_upload_success(&url, kind);
                self.report(result.map(|_| ()))?;
            }
            ConsoleCommand::Search { term } => self.search(&term)?,
            ConsoleCommand::Clear => self.clear()?,
            ConsoleCommand::Read => match self.controller.mark_read() {
                Ok(count) => self
                    .terminal
                    .print_line(&format!("Marked {count} message(s) read."))?,
                Err(error) => self.report(Err(error))?,
            },
            ConsoleCommand::Logout => {
                self.search.cancel();
                let outcome = logout(
                    self.auth,
                    &self.presence,
                    &self.me.id,
                    SessionHandles {
                        controller: &mut self.controller,
                        directory: &mut self.directory,
                        inbox: &mut self.inbox,
                    },
                );
                if !outcome.presence_updated {
                    self.terminal
                        .print_line("Could not update your presence, others may still see you online.")?;
                }
                self.terminal.print_line("Signed out.")?;
                return Ok(Flow::Exit(SessionExit::Logout));
            }
            ConsoleCommand::Quit => {
                self.exit_offline();
                return Ok(Flow::Exit(SessionExit::Quit));
            }
        }
        Ok(Flow::Continue)
    }

    /// Pulls live changes: directory, inbox (with notifications), and new
    /// messages of the open chat.
    fn refresh(&mut self) -> Result<(), AppError> {
        self.directory.poll();

        let directory = self.directory.state();
        let open_chat = self.controller.open_chat_id().cloned();
        self.inbox
            .poll_and_notify(open_chat.as_ref(), &self.notifier, |id| {
                display_name(directory.get(id), id)
            });

        // Sends apply their own echo, so look at unseen ids rather than at
        // what this poll changed.
        self.controller.poll();
        let fresh: Vec<_> = self
            .controller
            .state()
            .messages()
            .filter(|message| !self.shown.contains(&message.id))
            .cloned()
            .collect();
        if fresh.is_empty() {
            return Ok(());
        }

        let lines = self.message_lines(fresh.iter());
        self.shown.extend(fresh.into_iter().map(|message| message.id));
        for line in lines {
            self.terminal.print_line(&line)?;
        }
        Ok(())
    }

    fn open(&mut self, username: &str) -> Result<(), AppError> {
        let Some(peer) = self
            .directory
            .state()
            .find_by_username(username)
            .map(|user| user.id.clone())
        else {
            self.terminal
                .print_line(&format!("No user named {username}. Try /users or /search."))?;
            return Ok(());
        };

        match self.controller.open_chat(&peer) {
            Ok(_) => {
                self.shown.clear();
                self.terminal.print_line(&format!("Chat with {username}"))?;
                self.print_transcript()
            }
            Err(error) => self.report(Err(error)),
        }
    }

    fn print_transcript(&mut self) -> Result<(), AppError> {
        if !self.controller.state().is_open() {
            self.terminal.print_line("No chat open. Use /open <username>.")?;
            return Ok(());
        }

        let messages: Vec<_> = self.controller.state().messages().cloned().collect();
        if messages.is_empty() {
            self.terminal.print_line("No messages yet. Say hi!")?;
            return Ok(());
        }

        let lines = self.message_lines(messages.iter());
        self.shown.extend(messages.into_iter().map(|message| message.id));
        for line in lines {
            self.terminal.print_line(&line)?;
        }
        Ok(())
    }

    fn message_lines<'m>(
        &self,
        messages: impl IntoIterator<Item = &'m Message>,
    ) -> Vec<String> {
        let directory = self.directory.state();
        build_message_list_elements(messages, &self.me.id, |id| {
            display_name(directory.get(id), id)
        })
        .iter()
        .flat_map(element_lines)
        .collect()
    }

    fn print_users(&mut self) -> Result<(), AppError> {
        let state = self.directory.state();
        let lines: Vec<String> = match state.ui_state() {
            DirectoryUiState::Loading => vec!["Loading users...".to_owned()],
            DirectoryUiState::Error => vec!["User directory unavailable.".to_owned()],
            DirectoryUiState::Empty => vec!["No other users yet.".to_owned()],
            DirectoryUiState::Ready => {
                let placeholder = &self.config.directory.default_profile_image;
                let lines: Vec<_> = state
                    .others()
                    .map(|user| user_line(user, placeholder))
                    .collect();
                if lines.is_empty() {
                    vec!["No other users yet.".to_owned()]
                } else {
                    lines
                }
            }
        };
        for line in lines {
            self.terminal.print_line(&line)?;
        }
        Ok(())
    }

    fn print_inbox(&mut self) -> Result<(), AppError> {
        let directory = self.directory.state();
        let state = self.inbox.state();
        let lines: Vec<String> = match state.ui_state() {
            ChatListUiState::Loading => vec!["Loading chats...".to_owned()],
            ChatListUiState::Error => vec!["Chats unavailable.".to_owned()],
            ChatListUiState::Empty => vec!["No chats yet. Use /open <username>.".to_owned()],
            ChatListUiState::Ready => state
                .summaries()
                .iter()
                .map(|summary| {
                    inbox_line(summary, &display_name(directory.get(&summary.peer), &summary.peer))
                })
                .collect(),
        };
        for line in lines {
            self.terminal.print_line(&line)?;
        }
        Ok(())
    }

    /// Feeds the term through the debouncer and waits for the one result set
    /// it produces.
    fn search(&mut self, term: &str) -> Result<(), AppError> {
        let candidates: Vec<User> = self.directory.state().others().cloned().collect();
        self.search.input(term, candidates, &self.me.id);

        let wait = self.config.search.debounce() + SEARCH_SLACK;
        let receiver = &mut self.search_results;
        let results = self
            .runtime
            .block_on(async { tokio::time::timeout(wait, receiver.recv()).await });

        let Ok(Some(results)) = results else {
            tracing::warn!(code = "SEARCH_TIMEOUT", "search produced no result in time");
            self.terminal.print_line("Search timed out, try again.")?;
            return Ok(());
        };

        if results.term.trim().is_empty() {
            self.terminal.print_line("Type a name to search, e.g. /search ali")?;
            return Ok(());
        }
        if results.users.is_empty() {
            self.terminal
                .print_line(&format!("No users match \"{}\".", results.term))?;
            return Ok(());
        }
        let placeholder = &self.config.directory.default_profile_image;
        for user in &results.users {
            self.terminal.print_line(&user_line(user, placeholder))?;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), AppError> {
        let Some(chat_id) = self.controller.open_chat_id().cloned() else {
            self.terminal.print_line("No chat open. Use /open <username>.")?;
            return Ok(());
        };
        let peer = self.open_peer_name().unwrap_or_default();

        let answer = self
            .terminal
            .prompt_line(&format!("Delete all messages with {peer}? [y/N] "))?;
        let confirmed = answer.is_some_and(|answer| {
            answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
        });
        if !confirmed {
            self.terminal.print_line("Kept the history.")?;
            return Ok(());
        }

        match self.controller.clear_chat(&chat_id) {
            Ok(outcome) => {
                self.shown.clear();
                self.terminal
                    .print_line(&format!("Deleted {} message(s).", outcome.deleted))?;
                Ok(())
            }
            Err(error) => self.report(Err(error)),
        }
    }

    fn report(&mut self, result: Result<(), ChatError>) -> Result<(), AppError> {
        let Err(error) = result else {
            return Ok(());
        };
        let line = match &error {
            ChatError::Transport(_) => "Message not delivered, try again.".to_owned(),
            ChatError::Validation(error) => format!("Not sent: {error}."),
            ChatError::State(error) => format!("Nothing to do: {error}."),
        };
        self.terminal.print_line(&line)?;
        Ok(())
    }

    fn open_peer_name(&self) -> Option<String> {
        let peer = self.controller.state().peer()?;
        Some(display_name(self.directory.state().get(peer), peer))
    }

    /// Best-effort offline write, then local teardown. The auth session is
    /// kept so the next start resumes it.
    fn exit_offline(&mut self) {
        self.search.cancel();
        let timeout = self.config.presence.exit_flush_timeout();
        let flush = self
            .runtime
            .block_on(self.presence.go_offline_on_exit(&self.me.id, timeout));
        if flush != ExitFlush::Flushed {
            tracing::debug!(?flush, "exit presence flush incomplete");
        }
        self.controller.end_session();
        self.directory.stop();
        self.inbox.stop();
    }
}

fn display_name(user: Option<&User>, id: &UserId) -> String {
    match user {
        Some(user) if !user.username.is_empty() => user.username.clone(),
        _ => id.to_string(),
    }
}
