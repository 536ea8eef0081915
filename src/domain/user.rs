use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{ids::UserId, live_collection::LiveDocument};

pub const DEFAULT_PROFILE_IMAGE: &str = "assets/default-profile.png";
pub const DEFAULT_STATUS_TEXT: &str = "Available";

/// Directory entry for one account, as stored in the `users` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(skip_serializing)]
    pub id: UserId,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub is_online: bool,
    pub last_seen: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: None,
            profile_image: None,
            status: None,
            is_online: false,
            last_seen: None,
        }
    }

    pub fn has_profile(&self) -> bool {
        !self.username.trim().is_empty()
    }

    pub fn profile_image_or<'a>(&'a self, placeholder: &'a str) -> &'a str {
        self.profile_image.as_deref().unwrap_or(placeholder)
    }

    pub fn status_label(&self) -> &str {
        self.status.as_deref().unwrap_or(DEFAULT_STATUS_TEXT)
    }
}

impl LiveDocument for User {
    type Key = UserId;
    type SortKey = (String, String);

    fn key(&self) -> &Self::Key {
        &self.id
    }

    fn sort_key(&self) -> Self::SortKey {
        (self.username.to_lowercase(), self.username.clone())
    }
}

/// Profile fields written on profile completion or edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub username: String,
    pub email: Option<String>,
    pub profile_image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(raw: &str) -> UserId {
        UserId::parse(raw).expect("valid user id")
    }

    #[test]
    fn falls_back_to_placeholder_image_and_default_status() {
        let user = User::new(uid("u1"), "alice");

        assert_eq!(user.profile_image_or(DEFAULT_PROFILE_IMAGE), DEFAULT_PROFILE_IMAGE);
        assert_eq!(user.status_label(), "Available");
    }

    #[test]
    fn blank_username_means_profile_incomplete() {
        let mut user = User::new(uid("u1"), "   ");
        assert!(!user.has_profile());

        user.username = "alice".to_owned();
        assert!(user.has_profile());
    }

    #[test]
    fn sorts_case_insensitively_by_username() {
        let lower = User::new(uid("u1"), "bob");
        let upper = User::new(uid("u2"), "Alice");

        assert!(upper.sort_key() < lower.sort_key());
    }

    #[test]
    fn serializes_with_store_field_names() {
        let mut user = User::new(uid("u1"), "alice");
        user.profile_image = Some("https://img/a.png".to_owned());
        user.is_online = true;

        let value = serde_json::to_value(&user).expect("user serializes");

        assert_eq!(value["username"], "alice");
        assert_eq!(value["profileImage"], "https://img/a.png");
        assert_eq!(value["isOnline"], true);
        assert!(value.get("lastSeen").is_some());
        assert!(value.get("id").is_none());
    }
}
