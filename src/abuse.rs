//! Content filtering and flood control for chat traffic
//!
//! - Deny-list filter applied to plain chat text (never to commands)
//! - Fixed-window rate limiting per client for message and audio frames

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::config::{env_flag, env_or};
use crate::types::ClientId;

/// Words rejected in chat text regardless of configuration
const DEFAULT_DENY_WORDS: &[&str] = &["shit", "fuck", "bitch", "asshole", "bastard", "cunt"];

/// Case-insensitive substring deny-list
#[derive(Debug, Clone)]
pub struct ContentFilter {
    /// Stored lowercased
    deny: Vec<String>,
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self::new(DEFAULT_DENY_WORDS.iter().copied())
    }
}

impl ContentFilter {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let deny = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { deny }
    }

    /// Built-in list extended by CHAT_DENY_WORDS (comma separated)
    pub fn from_env() -> Self {
        let extra = std::env::var("CHAT_DENY_WORDS").unwrap_or_default();
        let filter = Self::new(
            DEFAULT_DENY_WORDS
                .iter()
                .copied()
                .chain(extra.split(',')),
        );
        tracing::info!(words = filter.deny.len(), "Content filter loaded");
        filter
    }

    pub fn is_allowed(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        !self.deny.iter().any(|word| lower.contains(word.as_str()))
    }
}

/// Frames a client has sent in its current window
#[derive(Debug, Clone, Copy)]
struct FrameWindow {
    opened: Instant,
    frames: u32,
}

impl FrameWindow {
    fn open(now: Instant) -> Self {
        Self {
            opened: now,
            frames: 1,
        }
    }

    /// Count one more frame; false once the window is full
    fn admit(&mut self, now: Instant, max_frames: u32, span: Duration) -> bool {
        if now.duration_since(self.opened) >= span {
            *self = Self::open(now);
            return true;
        }
        if self.frames >= max_frames {
            return false;
        }
        self.frames += 1;
        true
    }
}

/// Per-client flood limiter for chat and audio frames.
///
/// Each client gets a fixed window that opens with its first frame; at most
/// `max_frames` are admitted until the window expires.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<ClientId, FrameWindow>>>,
    max_frames: u32,
    window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(20, Duration::from_secs(10))
    }
}

impl RateLimiter {
    pub fn new(max_frames: u32, window: Duration) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            max_frames,
            window,
        }
    }

    /// Record a frame from `client_id`; false means drop it
    pub async fn check(&self, client_id: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        match windows.get_mut(client_id) {
            Some(window) => window.admit(now, self.max_frames, self.window),
            None => {
                windows.insert(client_id.to_string(), FrameWindow::open(now));
                true
            }
        }
    }

    /// Called on leave and kick so the map only holds connected clients
    pub async fn forget(&self, client_id: &str) {
        self.windows.lock().await.remove(client_id);
    }
}

/// Flood control configuration
#[derive(Debug, Clone)]
pub struct FloodConfig {
    /// Rate limiter (None = disabled)
    pub rate_limiter: Option<RateLimiter>,
}

impl Default for FloodConfig {
    fn default() -> Self {
        Self {
            rate_limiter: Some(RateLimiter::default()),
        }
    }
}

impl FloodConfig {
    pub fn disabled() -> Self {
        Self { rate_limiter: None }
    }

    /// Load config from environment variables
    pub fn from_env() -> Self {
        let enabled = env_flag("FLOOD_LIMIT", true);

        let rate_limiter = if enabled {
            let max_frames = env_or("FLOOD_LIMIT_MAX", 20);
            let window_secs = env_or("FLOOD_LIMIT_WINDOW", 10);
            Some(RateLimiter::new(max_frames, Duration::from_secs(window_secs)))
        } else {
            None
        };

        tracing::info!(flood_limit_enabled = enabled, "Flood control config loaded");

        Self { rate_limiter }
    }

    /// Returns true when the frame may proceed
    pub async fn allow(&self, client_id: &str) -> bool {
        match &self.rate_limiter {
            Some(limiter) => limiter.check(client_id).await,
            None => true,
        }
    }

    pub async fn forget(&self, client_id: &str) {
        if let Some(limiter) = &self.rate_limiter {
            limiter.forget(client_id).await;
        }
    }
}
