//! Username search over the user directory.

use std::time::Duration;

use tokio::{
    runtime::Handle,
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};

use crate::domain::{ids::UserId, user::User};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Case-insensitive substring match on usernames, excluding `me`. An empty
/// term matches nobody.
pub fn search_directory<'a>(
    users: impl IntoIterator<Item = &'a User>,
    term: &str,
    me: &UserId,
) -> Vec<User> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    users
        .into_iter()
        .filter(|user| &user.id != me)
        .filter(|user| user.username.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResults {
    pub term: String,
    pub users: Vec<User>,
}

/// Runs a search only after `window` passes without new input. Each input
/// aborts the pending evaluation, so a burst yields one result set.
pub struct DebouncedSearch {
    runtime: Handle,
    window: Duration,
    pending: Option<JoinHandle<()>>,
    results: UnboundedSender<SearchResults>,
}

impl DebouncedSearch {
    pub fn new(runtime: Handle, window: Duration) -> (Self, UnboundedReceiver<SearchResults>) {
        let (results, rx) = mpsc::unbounded_channel();
        (
            Self {
                runtime,
                window,
                pending: None,
                results,
            },
            rx,
        )
    }

    /// Records one keystroke. `candidates` is the directory snapshot the
    /// query will run against.
    pub fn input(&mut self, term: &str, candidates: Vec<User>, me: &UserId) {
        self.cancel();

        let window = self.window;
        let results = self.results.clone();
        let term = term.to_owned();
        let me = me.clone();
        self.pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(window).await;
            let users = search_directory(&candidates, &term, &me);
            tracing::debug!(term = %term, matches = users.len(), "search evaluated");
            if results.send(SearchResults { term, users }).is_err() {
                tracing::debug!("search results receiver dropped");
            }
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

impl Drop for DebouncedSearch {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::uid;

    fn directory() -> Vec<User> {
        ["alice", "Alicia", "bob", "malik"]
            .into_iter()
            .map(|name| User::new(uid(&name.to_lowercase()), name))
            .collect()
    }

    fn names(users: &[User]) -> Vec<&str> {
        users.iter().map(|user| user.username.as_str()).collect()
    }

    #[test]
    fn matches_case_insensitive_substrings() {
        let users = directory();

        let found = search_directory(&users, "ALI", &uid("bob"));

        assert_eq!(names(&found), vec!["alice", "Alicia", "malik"]);
    }

    #[test]
    fn excludes_the_session_user() {
        let users = directory();

        let found = search_directory(&users, "ali", &uid("alice"));

        assert_eq!(names(&found), vec!["Alicia", "malik"]);
    }

    #[test]
    fn empty_term_matches_nobody() {
        let users = directory();

        assert!(search_directory(&users, "", &uid("bob")).is_empty());
        assert!(search_directory(&users, "   ", &uid("bob")).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_keystrokes_evaluates_only_the_last() {
        let (mut search, mut results) = DebouncedSearch::new(Handle::current(), DEFAULT_DEBOUNCE);
        let me = uid("alice");

        for term in ["a", "al", "ali"] {
            search.input(term, directory(), &me);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(Duration::from_millis(301)).await;

        let delivered = results.try_recv().expect("one result set");
        assert_eq!(delivered.term, "ali");
        assert_eq!(names(&delivered.users), vec!["Alicia", "malik"]);
        assert!(results.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_delivered_before_the_quiet_window() {
        let (mut search, mut results) = DebouncedSearch::new(Handle::current(), DEFAULT_DEBOUNCE);

        search.input("bob", directory(), &uid("alice"));
        tokio::time::sleep(Duration::from_millis(299)).await;
        assert!(results.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(results.try_recv().expect("delivered").term, "bob");
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_the_pending_query() {
        let (mut search, mut results) = DebouncedSearch::new(Handle::current(), DEFAULT_DEBOUNCE);

        search.input("bob", directory(), &uid("alice"));
        search.cancel();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(results.try_recv().is_err());
    }
}
