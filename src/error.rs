//! Errors surfaced to clients as `error` frames

use crate::protocol::ServerMessage;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("Username must not be empty")]
    InvalidName,
    #[error("You are banned from this server")]
    Banned,
    #[error("Invalid admin credentials")]
    AuthFailed,
    #[error("You don't have permission to use commands")]
    PermissionDenied,
    #[error("/{0} requires admin privileges")]
    AdminOnly(String),
    #[error("Unknown command /{0}. Type /help for a list of commands")]
    UnknownCommand(String),
    #[error("No user named {0} is in this room")]
    NotFound(String),
    #[error("Join a room first")]
    NotJoined,
    #[error("Usage: /{0} <username>")]
    MissingTarget(String),
}

impl ChatError {
    /// Stable wire code for the `error` frame
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::InvalidName => "INVALID_NAME",
            ChatError::Banned => "BANNED",
            ChatError::AuthFailed => "AUTH_FAILED",
            ChatError::PermissionDenied => "PERMISSION_DENIED",
            ChatError::AdminOnly(_) => "ADMIN_ONLY",
            ChatError::UnknownCommand(_) => "UNKNOWN_COMMAND",
            ChatError::NotFound(_) => "NOT_FOUND",
            ChatError::NotJoined => "NOT_JOINED",
            ChatError::MissingTarget(_) => "MISSING_TARGET",
        }
    }
}

impl From<ChatError> for ServerMessage {
    fn from(err: ChatError) -> Self {
        ServerMessage::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}
