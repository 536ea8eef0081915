//! Scripted two-user walkthrough on a fresh in-process backend. Prints what
//! each side sees as unread counters move.

use std::time::Duration;

use tokio::runtime::Handle;

use crate::{
    backend::{memory_auth::MemoryAuth, memory_store::MemoryStore},
    domain::{
        chat_identity::derive_chat_id,
        ids::{ChatId, UserId},
        user::User,
    },
    infra::{config::AppConfig, error::AppError},
    usecases::{
        account::{complete_profile, sign_up},
        chat_session::{ChatSessionController, SessionUser},
        contracts::{AuthProvider, DocumentStore},
        directory::DirectoryFeed,
        error::{ChatError, ValidationError},
        guided_auth::Terminal,
        search::DebouncedSearch,
    },
};

use super::render::{build_message_list_elements, element_lines};

pub fn run_demo(terminal: &mut dyn Terminal, runtime: &Handle, config: &AppConfig) -> Result<(), AppError> {
    let auth = MemoryAuth::new();
    let store = MemoryStore::new();

    let alice = create_account(&auth, &store, "alice")?;
    let bob = create_account(&auth, &store, "bob")?;
    let chat_id = derive_chat_id(&alice.id, &bob.id)
        .map_err(|error| ChatError::from(ValidationError::from(error)))?;

    let mut alice_chat = session(&store, &alice);
    let mut bob_chat = session(&store, &bob);

    alice_chat.open_chat(&bob.id)?;
    alice_chat.send_text("Hi Bob!")?;
    alice_chat.send_text("Are you there?")?;
    terminal.print_line("alice sent 2 messages")?;
    print_counters(terminal, &store, &chat_id, &alice, &bob)?;

    let mut directory = DirectoryFeed::start(&store, bob.id.clone());
    directory.poll();
    let (mut search, mut results) = DebouncedSearch::new(runtime.clone(), config.search.debounce());
    for term in ["a", "al", "ali"] {
        search.input(term, directory.state().others().cloned().collect(), &bob.id);
    }
    let wait = config.search.debounce() + Duration::from_millis(500);
    let found = runtime.block_on(async { tokio::time::timeout(wait, results.recv()).await });
    if let Ok(Some(found)) = found {
        let names: Vec<_> = found.users.iter().map(|user| user.username.as_str()).collect();
        terminal.print_line(&format!("bob searched {:?}: {}", found.term, names.join(", ")))?;
    }
    directory.stop();

    bob_chat.open_chat(&alice.id)?;
    terminal.print_line("bob opened the chat")?;
    print_counters(terminal, &store, &chat_id, &alice, &bob)?;

    bob_chat.send_text("Hey Alice")?;
    terminal.print_line("bob replied")?;
    print_counters(terminal, &store, &chat_id, &alice, &bob)?;

    alice_chat.poll();
    let marked = alice_chat.mark_read()?;
    terminal.print_line(&format!("alice marked {marked} message(s) read"))?;

    let names = [(alice.id.clone(), alice.username.clone()), (bob.id.clone(), bob.username.clone())];
    let elements = build_message_list_elements(alice_chat.state().messages(), &alice.id, |id| {
        names
            .iter()
            .find(|(known, _)| known == id)
            .map(|(_, name)| name.clone())
            .unwrap_or_else(|| id.to_string())
    });
    terminal.print_line("alice's view:")?;
    for line in elements.iter().flat_map(element_lines) {
        terminal.print_line(&line)?;
    }

    let cleared = alice_chat.clear_chat(&chat_id)?;
    terminal.print_line(&format!("alice cleared the chat ({} deleted)", cleared.deleted))?;
    print_counters(terminal, &store, &chat_id, &alice, &bob)?;

    alice_chat.end_session();
    bob_chat.end_session();
    Ok(())
}

fn create_account(auth: &MemoryAuth, store: &MemoryStore, name: &str) -> Result<User, AppError> {
    let password = format!("{name}-demo-pass");
    let account = sign_up(auth, &format!("{name}@example.com"), &password, &password)?;
    let user = complete_profile(store, &account, name, None)?;
    auth.sign_out().map_err(|error| AppError::Account(error.into()))?;
    Ok(user)
}

fn session(store: &MemoryStore, user: &User) -> ChatSessionController<MemoryStore> {
    let mut controller = ChatSessionController::new(store.clone());
    controller.start_session(SessionUser {
        id: user.id.clone(),
        username: user.username.clone(),
    });
    controller
}

fn print_counters(
    terminal: &mut dyn Terminal,
    store: &MemoryStore,
    chat_id: &ChatId,
    alice: &User,
    bob: &User,
) -> Result<(), AppError> {
    let chat = store.get_chat(chat_id).map_err(ChatError::from)?;
    let unread = |user: &UserId| chat.as_ref().map_or(0, |chat| chat.unread_for(user));
    let preview = chat
        .as_ref()
        .and_then(|chat| chat.last_message.clone())
        .unwrap_or_else(|| "-".to_owned());
    terminal.print_line(&format!(
        "  unread alice={} bob={} last={preview}",
        unread(&alice.id),
        unread(&bob.id)
    ))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tokio::runtime::Runtime;

    use super::*;
    use crate::test_support::ScriptedTerminal;

    #[test]
    fn walkthrough_moves_counters_as_described() {
        let runtime = Runtime::new().expect("runtime");
        let mut config = AppConfig::default();
        config.search.debounce_ms = 10;
        let mut terminal = ScriptedTerminal::new(Vec::new());

        run_demo(&mut terminal, runtime.handle(), &config).expect("demo runs");

        let lines = terminal.output;
        let counters: Vec<_> = lines
            .iter()
            .filter(|line| line.starts_with("  unread"))
            .map(String::as_str)
            .collect();
        assert_eq!(
            counters,
            vec![
                "  unread alice=0 bob=2 last=Are you there?",
                "  unread alice=0 bob=0 last=Are you there?",
                "  unread alice=1 bob=0 last=Hey Alice",
                "  unread alice=1 bob=0 last=-",
            ]
        );
        assert!(lines.iter().any(|line| line == "bob searched \"ali\": alice"));
        assert!(lines.iter().any(|line| line == "alice marked 1 message(s) read"));
        assert!(lines.iter().any(|line| line == "alice cleared the chat (3 deleted)"));
    }
}
