use super::{
    ids::UserId,
    live_collection::{Change, LiveCollection},
    user::User,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryUiState {
    Loading,
    Ready,
    Empty,
    Error,
}

/// Live view of the `users` collection as seen by one session user.
#[derive(Debug, Clone)]
pub struct DirectoryState {
    me: UserId,
    ui_state: DirectoryUiState,
    users: LiveCollection<User>,
}

impl DirectoryState {
    pub fn new(me: UserId) -> Self {
        Self {
            me,
            ui_state: DirectoryUiState::Loading,
            users: LiveCollection::default(),
        }
    }

    pub fn ui_state(&self) -> DirectoryUiState {
        self.ui_state.clone()
    }

    /// Everyone except the session user, in username order.
    pub fn others(&self) -> impl Iterator<Item = &User> + '_ {
        self.users.iter().filter(|user| user.id != self.me)
    }

    pub fn get(&self, id: &UserId) -> Option<&User> {
        self.users.get(id)
    }

    pub fn find_by_username(&self, username: &str) -> Option<&User> {
        self.others()
            .find(|user| user.username.eq_ignore_ascii_case(username))
    }

    pub fn apply_changes(&mut self, changes: Vec<Change<User>>) -> usize {
        let applied = self.users.apply_all(changes);
        self.refresh_ui_state();
        applied
    }

    pub fn set_error(&mut self) {
        self.ui_state = DirectoryUiState::Error;
        self.users.clear();
    }

    fn refresh_ui_state(&mut self) {
        self.ui_state = if self.others().next().is_some() {
            DirectoryUiState::Ready
        } else {
            DirectoryUiState::Empty
        };
    }
}
