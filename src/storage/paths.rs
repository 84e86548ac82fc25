//! Application paths for configuration.

use directories::ProjectDirs;
use std::path::PathBuf;

/// Application paths.
pub struct AppPaths {
    /// Configuration directory.
    pub config: PathBuf,
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

impl AppPaths {
    /// Create paths for the spendlog application.
    #[must_use]
    pub fn new() -> Self {
        ProjectDirs::from("dev", "spendlog", "spendlog").map_or_else(
            || Self {
                config: PathBuf::from(".spendlog"),
            },
            |proj_dirs| Self {
                config: proj_dirs.config_dir().to_path_buf(),
            },
        )
    }

    /// Path to the config file.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_lives_in_config_dir() {
        let paths = AppPaths::new();
        assert!(paths.config_file().starts_with(&paths.config));
        assert!(paths.config_file().ends_with("config.toml"));
    }
}
