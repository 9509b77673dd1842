use serde::{Deserialize, Serialize};
use std::time::Duration;

use seed_core::ConversationConfig;

/// Top-level client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            server: ServerConfig::default(),
            chat: ChatConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Read a value by dotted key, e.g. `server.base_url`.
    pub fn get_value(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["version"] => Some(self.version.clone()),
            ["server", "base_url"] => Some(self.server.base_url.clone()),
            ["server", "timeout_secs"] => Some(self.server.timeout_secs.to_string()),
            ["server", "session_cookie"] => self.server.session_cookie.clone(),
            ["chat", "history_window"] => Some(self.chat.history_window.to_string()),
            ["chat", "typing_interval_ms"] => Some(self.chat.typing_interval_ms.to_string()),
            ["chat", "autosave_debounce_ms"] => Some(self.chat.autosave_debounce_ms.to_string()),
            ["chat", "greeting"] => Some(self.chat.greeting.clone()),
            ["logging", "level"] => Some(self.logging.level.to_string()),
            ["logging", "file"] => self.logging.file.clone(),
            ["logging", "json_format"] => Some(self.logging.json_format.to_string()),
            _ => None,
        }
    }

    /// Set a value by dotted key, parsing it for the field type.
    pub fn set_value(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["server", "base_url"] => {
                self.server.base_url = value.trim_end_matches('/').to_string();
            }
            ["server", "timeout_secs"] => {
                self.server.timeout_secs = parse_number(value)?;
            }
            ["server", "session_cookie"] => {
                self.server.session_cookie = Some(value.to_string());
            }
            ["chat", "history_window"] => {
                self.chat.history_window = parse_number(value)?;
            }
            ["chat", "typing_interval_ms"] => {
                self.chat.typing_interval_ms = parse_number(value)?;
            }
            ["chat", "autosave_debounce_ms"] => {
                self.chat.autosave_debounce_ms = parse_number(value)?;
            }
            ["chat", "greeting"] => {
                self.chat.greeting = value.to_string();
            }
            ["logging", "level"] => {
                self.logging.level = value.parse()?;
            }
            ["logging", "file"] => {
                self.logging.file = Some(value.to_string());
            }
            ["logging", "json_format"] => {
                self.logging.json_format = value.parse().map_err(|_| {
                    ConfigError::Validation(format!("Invalid boolean: {}", value))
                })?;
            }
            _ => return Err(ConfigError::KeyNotFound(key.to_string())),
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(value: &str) -> ConfigResult<T> {
    value
        .parse()
        .map_err(|_| ConfigError::Validation(format!("Invalid number: {}", value)))
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Backend origin, e.g. `http://127.0.0.1:8000`
    pub base_url: String,
    pub timeout_secs: u64,
    /// Value of the backend's session cookie, if already signed in elsewhere
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_cookie: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_secs: 120,
            session_cookie: None,
        }
    }
}

impl ServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Where the user signs in; the client never does it itself.
    pub fn login_url(&self) -> String {
        format!("{}/login", self.base_url.trim_end_matches('/'))
    }
}

/// Chat behaviour settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatConfig {
    /// Messages of context sent with each request
    pub history_window: usize,
    pub typing_interval_ms: u64,
    pub autosave_debounce_ms: u64,
    pub greeting: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        let defaults = ConversationConfig::default();
        Self {
            history_window: defaults.history_window,
            typing_interval_ms: defaults.typing_interval.as_millis() as u64,
            autosave_debounce_ms: defaults.autosave_debounce.as_millis() as u64,
            greeting: defaults.greeting,
        }
    }
}

impl ChatConfig {
    pub fn conversation_config(&self) -> ConversationConfig {
        ConversationConfig {
            history_window: self.history_window,
            typing_interval: Duration::from_millis(self.typing_interval_ms),
            autosave_debounce: Duration::from_millis(self.autosave_debounce_ms),
            greeting: self.greeting.clone(),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::Validation(format!("Invalid log level: {}", s))),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// Log file; the terminal itself is owned by the UI
    pub file: Option<String>,
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: Some("~/.seed/logs/seed.log".to_string()),
            json_format: false,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.chat.history_window, 13);
        assert_eq!(config.chat.typing_interval_ms, 20);
        assert_eq!(config.chat.autosave_debounce_ms, 1000);
    }

    #[test]
    fn test_get_and_set_value() {
        let mut config = Config::default();
        config.set_value("server.base_url", "http://seed.local/").unwrap();
        assert_eq!(config.get_value("server.base_url").unwrap(), "http://seed.local");
        assert_eq!(config.server.login_url(), "http://seed.local/login");

        config.set_value("chat.history_window", "5").unwrap();
        assert_eq!(config.chat.conversation_config().history_window, 5);

        assert!(config.set_value("chat.history_window", "many").is_err());
        assert!(matches!(
            config.set_value("nope.key", "1"),
            Err(ConfigError::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_partial_file_uses_section_defaults() {
        let config: Config = serde_json::from_str(r#"{"version":"0.1.0"}"#).unwrap();
        assert_eq!(config.chat, ChatConfig::default());
        assert_eq!(config.logging.level, LogLevel::Info);
    }
}
