use std::path::PathBuf;

use serde::Deserialize;

use crate::infra::config::{
    AppConfig, DirectoryConfig, LogConfig, NotificationConfig, PresenceConfig, SearchConfig,
};

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub logging: Option<FileLogConfig>,
    pub search: Option<FileSearchConfig>,
    pub presence: Option<FilePresenceConfig>,
    pub directory: Option<FileDirectoryConfig>,
    pub notifications: Option<FileNotificationConfig>,
}

impl FileConfig {
    pub fn merge_into(self, config: &mut AppConfig) {
        if let Some(logging) = self.logging {
            logging.merge_into(&mut config.logging);
        }

        if let Some(search) = self.search {
            search.merge_into(&mut config.search);
        }

        if let Some(presence) = self.presence {
            presence.merge_into(&mut config.presence);
        }

        if let Some(directory) = self.directory {
            directory.merge_into(&mut config.directory);
        }

        if let Some(notifications) = self.notifications {
            notifications.merge_into(&mut config.notifications);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileLogConfig {
    pub level: Option<String>,
    pub file: Option<PathBuf>,
}

impl FileLogConfig {
    fn merge_into(self, config: &mut LogConfig) {
        if let Some(level) = self.level {
            config.level = level;
        }

        if let Some(file) = self.file {
            config.file = Some(file);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileSearchConfig {
    pub debounce_ms: Option<u64>,
}

impl FileSearchConfig {
    fn merge_into(self, config: &mut SearchConfig) {
        if let Some(debounce_ms) = self.debounce_ms {
            config.debounce_ms = debounce_ms;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FilePresenceConfig {
    pub exit_flush_timeout_ms: Option<u64>,
}

impl FilePresenceConfig {
    fn merge_into(self, config: &mut PresenceConfig) {
        if let Some(timeout_ms) = self.exit_flush_timeout_ms {
            config.exit_flush_timeout_ms = timeout_ms;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileDirectoryConfig {
    pub default_profile_image: Option<String>,
    pub seed_users: Option<Vec<String>>,
}

impl FileDirectoryConfig {
    fn merge_into(self, config: &mut DirectoryConfig) {
        if let Some(image) = self.default_profile_image {
            config.default_profile_image = image;
        }

        if let Some(seed_users) = self.seed_users {
            config.seed_users = seed_users;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileNotificationConfig {
    pub enabled: Option<bool>,
}

impl FileNotificationConfig {
    fn merge_into(self, config: &mut NotificationConfig) {
        if let Some(enabled) = self.enabled {
            config.enabled = enabled;
        }
    }
}
