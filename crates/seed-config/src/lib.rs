pub mod config;
pub mod local_storage;
pub mod manager;

pub use config::{
    ChatConfig, Config, ConfigError, ConfigResult, LogLevel, LoggingConfig, ServerConfig,
};
pub use local_storage::JsonFileStore;
pub use manager::ConfigManager;

use std::path::PathBuf;

/// The `~/.seed` directory
pub fn seed_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".seed"))
}

/// Default config file path
pub fn default_config_path() -> Option<PathBuf> {
    seed_dir().map(|dir| dir.join("config.json"))
}

/// Local storage file (session identity, theme)
pub fn default_local_storage_path() -> Option<PathBuf> {
    seed_dir().map(|dir| dir.join("local_storage.json"))
}

/// Create `~/.seed` and its `logs` directory
pub async fn init_seed_dirs() -> ConfigResult<()> {
    if let Some(seed) = seed_dir() {
        tokio::fs::create_dir_all(&seed).await?;
        tokio::fs::create_dir_all(seed.join("logs")).await?;
    }
    Ok(())
}

/// Expand a leading `~/` to the home directory
pub fn expand_tilde(path: &str) -> Option<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
        None => Some(PathBuf::from(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_dir() {
        let dir = seed_dir();
        assert!(dir.is_some());
        assert!(dir.unwrap().to_string_lossy().contains(".seed"));
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde("~/.seed/config.json").unwrap();
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert_eq!(expand_tilde("/tmp/x.log"), Some(PathBuf::from("/tmp/x.log")));
    }
}
