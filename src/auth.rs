//! Admin credential table checked once at join time

use std::collections::HashMap;

/// Outcome of checking a join against the admin table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCheck {
    /// Name is not an admin name; joins as a regular user
    NotAdmin,
    /// Name and password match an entry
    Admin,
    /// Name is reserved for an admin but the password is missing or wrong
    Rejected,
}

/// Static username -> password table
#[derive(Debug, Clone, Default)]
pub struct AdminConfig {
    credentials: HashMap<String, String>,
}

impl AdminConfig {
    pub fn new<I, U, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = (U, P)>,
        U: Into<String>,
        P: Into<String>,
    {
        Self {
            credentials: entries
                .into_iter()
                .map(|(u, p)| (u.into(), p.into()))
                .collect(),
        }
    }

    /// Load the table from environment variables.
    ///
    /// ADMIN_USERNAME and ADMIN_PASSWORD must both be set to add a single entry;
    /// ADMIN_CREDENTIALS adds more as `name:password,name2:password2`.
    pub fn from_env() -> Self {
        let username = non_empty_env("ADMIN_USERNAME");
        let password = non_empty_env("ADMIN_PASSWORD");

        let mut credentials = HashMap::new();
        match (username, password) {
            (Some(u), Some(p)) => {
                credentials.insert(u, p);
            }
            (None, None) => {}
            _ => tracing::warn!("ADMIN_USERNAME and ADMIN_PASSWORD must both be set"),
        }

        if let Some(list) = non_empty_env("ADMIN_CREDENTIALS") {
            credentials.extend(parse_credentials(&list));
        }

        if credentials.is_empty() {
            tracing::warn!("No admin credentials configured - moderation commands are unavailable");
        } else {
            tracing::info!(admins = credentials.len(), "Admin credentials loaded");
        }

        Self { credentials }
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Classify a join attempt
    pub fn check(&self, username: &str, password: Option<&str>) -> AdminCheck {
        let Some(expected) = self.credentials.get(username) else {
            return AdminCheck::NotAdmin;
        };
        match password {
            Some(given) if constant_time_eq(expected.as_bytes(), given.as_bytes()) => {
                AdminCheck::Admin
            }
            _ => AdminCheck::Rejected,
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse `name:password` pairs separated by commas, skipping malformed entries
fn parse_credentials(list: &str) -> Vec<(String, String)> {
    list.split(',')
        .filter_map(|pair| {
            let (name, password) = pair.split_once(':')?;
            let name = name.trim();
            if name.is_empty() || password.is_empty() {
                tracing::warn!("Ignoring malformed ADMIN_CREDENTIALS entry");
                return None;
            }
            Some((name.to_string(), password.to_string()))
        })
        .collect()
}

/// Constant-time byte comparison to prevent timing attacks
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
