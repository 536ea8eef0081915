use std::{collections::VecDeque, io};

use chrono::Utc;

use crate::{
    backend::memory_store::MemoryStore,
    domain::{
        chat::Chat,
        chat_identity::derive_chat_id,
        ids::UserId,
        user::ProfileUpdate,
    },
    usecases::{contracts::DocumentStore, guided_auth::Terminal},
};

pub fn uid(raw: &str) -> UserId {
    UserId::parse(raw).expect("valid user id")
}

/// Registers a user whose id and username are both `name`.
pub fn register(store: &MemoryStore, name: &str) {
    store
        .merge_user(
            &uid(name),
            &ProfileUpdate {
                username: name.to_owned(),
                email: Some(format!("{name}@example.com")),
                profile_image: None,
            },
        )
        .expect("user should be stored");
}

/// Store with users `alice` and `bob` and their chat already created.
pub fn seeded_pair() -> MemoryStore {
    let store = MemoryStore::new();
    register(&store, "alice");
    register(&store, "bob");
    let chat_id = derive_chat_id(&uid("alice"), &uid("bob")).expect("distinct ids");
    store
        .merge_chat(Chat::seed(chat_id, Utc::now()))
        .expect("chat should be stored");
    store
}

/// Terminal fed from a script; `None` entries simulate EOF.
pub struct ScriptedTerminal {
    inputs: VecDeque<Option<String>>,
    pub output: Vec<String>,
}

impl ScriptedTerminal {
    pub fn new(inputs: Vec<Option<&str>>) -> Self {
        Self {
            inputs: inputs
                .into_iter()
                .map(|item| item.map(|value| value.to_owned()))
                .collect(),
            output: Vec::new(),
        }
    }

    pub fn lines(inputs: &[&str]) -> Self {
        Self::new(inputs.iter().map(|line| Some(*line)).collect())
    }

    pub fn printed(&self, needle: &str) -> bool {
        self.output.iter().any(|line| line.contains(needle))
    }
}

impl Terminal for ScriptedTerminal {
    fn print_line(&mut self, line: &str) -> io::Result<()> {
        self.output.push(line.to_owned());
        Ok(())
    }

    fn prompt_line(&mut self, _prompt: &str) -> io::Result<Option<String>> {
        Ok(self.inputs.pop_front().flatten())
    }

    fn prompt_secret(&mut self, _prompt: &str) -> io::Result<Option<String>> {
        Ok(self.inputs.pop_front().flatten())
    }
}
