//! Chat core configuration loaded from environment variables

use std::str::FromStr;
use std::time::Duration;

/// Limits and defaults for rooms, messages and connections
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Messages kept per room for replay to newcomers
    pub history_capacity: usize,
    pub max_username_chars: usize,
    pub max_message_chars: usize,
    pub max_room_name_chars: usize,
    /// Largest accepted `audioData` payload in bytes
    pub max_audio_bytes: usize,
    /// Frames buffered per connection before new frames are dropped
    pub outbound_queue: usize,
    pub write_timeout: Duration,
    /// Room used when a join frame names none
    pub default_room: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_capacity: 50,
            max_username_chars: 50,
            max_message_chars: 1000,
            max_room_name_chars: 50,
            max_audio_bytes: 1024 * 1024,
            outbound_queue: 64,
            write_timeout: Duration::from_secs(10),
            default_room: "main".to_string(),
        }
    }
}

impl ChatConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let default_room = std::env::var("CHAT_DEFAULT_ROOM")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.default_room);

        let config = Self {
            history_capacity: env_or("CHAT_HISTORY_CAPACITY", defaults.history_capacity),
            max_username_chars: env_or("CHAT_MAX_USERNAME_CHARS", defaults.max_username_chars),
            max_message_chars: env_or("CHAT_MAX_MESSAGE_CHARS", defaults.max_message_chars),
            max_room_name_chars: env_or("CHAT_MAX_ROOM_NAME_CHARS", defaults.max_room_name_chars),
            max_audio_bytes: env_or("CHAT_MAX_AUDIO_BYTES", defaults.max_audio_bytes),
            // A zero-capacity mpsc channel panics
            outbound_queue: env_or("CHAT_OUTBOUND_QUEUE", defaults.outbound_queue).max(1),
            write_timeout: Duration::from_secs(env_or(
                "CHAT_WRITE_TIMEOUT_SECS",
                defaults.write_timeout.as_secs(),
            )),
            default_room,
        };

        tracing::info!(
            history_capacity = config.history_capacity,
            max_username_chars = config.max_username_chars,
            max_message_chars = config.max_message_chars,
            outbound_queue = config.outbound_queue,
            default_room = %config.default_room,
            "Chat config loaded"
        );

        config
    }
}

/// Parse an environment variable, falling back to `default` when unset or invalid
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Boolean switch: anything but "0"/"false" enables
pub(crate) fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v != "0" && v.to_lowercase() != "false")
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let config = ChatConfig::default();
        assert_eq!(config.history_capacity, 50);
        assert_eq!(config.max_username_chars, 50);
        assert_eq!(config.max_message_chars, 1000);
        assert_eq!(config.default_room, "main");
    }

    #[test]
    #[serial]
    fn test_from_env_overrides_and_fallbacks() {
        std::env::set_var("CHAT_HISTORY_CAPACITY", "7");
        std::env::set_var("CHAT_MAX_MESSAGE_CHARS", "not-a-number");
        std::env::set_var("CHAT_OUTBOUND_QUEUE", "0");
        std::env::set_var("CHAT_DEFAULT_ROOM", "  lounge ");

        let config = ChatConfig::from_env();
        assert_eq!(config.history_capacity, 7);
        assert_eq!(config.max_message_chars, 1000);
        assert_eq!(config.outbound_queue, 1);
        assert_eq!(config.default_room, "lounge");

        std::env::remove_var("CHAT_HISTORY_CAPACITY");
        std::env::remove_var("CHAT_MAX_MESSAGE_CHARS");
        std::env::remove_var("CHAT_OUTBOUND_QUEUE");
        std::env::remove_var("CHAT_DEFAULT_ROOM");
    }

    #[test]
    #[serial]
    fn test_env_flag() {
        std::env::set_var("ROOMCHAT_TEST_FLAG", "false");
        assert!(!env_flag("ROOMCHAT_TEST_FLAG", true));
        std::env::set_var("ROOMCHAT_TEST_FLAG", "1");
        assert!(env_flag("ROOMCHAT_TEST_FLAG", false));
        std::env::remove_var("ROOMCHAT_TEST_FLAG");
        assert!(env_flag("ROOMCHAT_TEST_FLAG", true));
    }
}
