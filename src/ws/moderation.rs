//! Slash-command handling
//!
//! Guests may not use any command. VIPs get the read-only commands, admins
//! get everything. Kick and ban only announce to the room when somebody was
//! actually removed.

use crate::error::ChatError;
use crate::protocol::ServerMessage;
use crate::state::{AppState, Client};
use crate::types::Tier;
use std::sync::Arc;

/// A parsed command line (without the leading `/`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Users,
    Kick(String),
    Ban(String),
    Unban(String),
    Vip(String),
    Unvip(String),
    Unknown(String),
}

impl Command {
    /// Everything after the command word is the target, so names with
    /// spaces work
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let (name, rest) = input
            .split_once(char::is_whitespace)
            .unwrap_or((input, ""));
        let target = rest.trim().to_string();

        match name.to_lowercase().as_str() {
            "help" => Command::Help,
            "users" => Command::Users,
            "kick" => Command::Kick(target),
            "ban" => Command::Ban(target),
            "unban" => Command::Unban(target),
            "vip" => Command::Vip(target),
            "unvip" => Command::Unvip(target),
            _ => Command::Unknown(name.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Command::Help => "help",
            Command::Users => "users",
            Command::Kick(_) => "kick",
            Command::Ban(_) => "ban",
            Command::Unban(_) => "unban",
            Command::Vip(_) => "vip",
            Command::Unvip(_) => "unvip",
            Command::Unknown(name) => name,
        }
    }

    /// Lowest tier allowed to run this command
    pub fn required_tier(&self) -> Tier {
        match self {
            Command::Help | Command::Users | Command::Unknown(_) => Tier::Vip,
            Command::Kick(_)
            | Command::Ban(_)
            | Command::Unban(_)
            | Command::Vip(_)
            | Command::Unvip(_) => Tier::Admin,
        }
    }
}

/// Command list shown by /help for a tier
pub fn help_lines(tier: Tier) -> Vec<String> {
    let mut lines = vec![
        "/help - Show this help".to_string(),
        "/users - List everyone in this room".to_string(),
    ];
    if tier == Tier::Admin {
        lines.extend(
            [
                "/kick <username> - Remove a user from the room",
                "/ban <username> - Remove a user and block the name from rejoining",
                "/unban <username> - Allow a banned name to join again",
                "/vip <username> - Grant VIP status",
                "/unvip <username> - Revoke VIP status",
            ]
            .map(String::from),
        );
    }
    lines
}

/// Run a command for the client and return the private reply, if any
pub async fn handle_command(
    state: &Arc<AppState>,
    room: &str,
    client_id: &str,
    input: &str,
) -> Option<ServerMessage> {
    let requester = state.lookup_client(room, client_id).await?;
    let command = Command::parse(input);

    tracing::info!(
        room = %room,
        username = %requester.username,
        command = command.name(),
        "Command received"
    );

    match execute(state, room, &requester, command).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::info!(username = %requester.username, "Command refused: {}", e);
            Some(e.into())
        }
    }
}

async fn execute(
    state: &Arc<AppState>,
    room: &str,
    requester: &Client,
    command: Command,
) -> Result<Option<ServerMessage>, ChatError> {
    let tier = requester.roles.tier();
    if tier == Tier::Guest {
        return Err(ChatError::PermissionDenied);
    }
    if tier < command.required_tier() {
        return Err(ChatError::AdminOnly(command.name().to_string()));
    }

    let moderator = requester.username.as_str();

    match command {
        Command::Help => Ok(Some(ServerMessage::Help {
            commands: help_lines(tier),
        })),

        Command::Users => Ok(Some(ServerMessage::UserList {
            users: state.room_members(room).await,
        })),

        Command::Kick(target) => {
            let target = require_target("kick", target)?;
            let removed = state
                .kick_by_name(room, &target, &format!("You have been kicked by {}", moderator))
                .await;
            if removed.is_empty() {
                return Err(ChatError::NotFound(target));
            }
            tracing::info!(username = %target, moderator, count = removed.len(), "Kicked");
            state
                .broadcast_system(room, format!("{} was kicked by {}", target, moderator))
                .await;
            Ok(None)
        }

        Command::Ban(target) => {
            let target = require_target("ban", target)?;
            state.ban_name(&target).await;
            let removed = state
                .kick_by_name(room, &target, &format!("You have been banned by {}", moderator))
                .await;
            tracing::info!(username = %target, moderator, count = removed.len(), "Banned");
            if removed.is_empty() {
                return Ok(Some(ServerMessage::system(format!(
                    "{} is not in this room; the name can no longer join",
                    target
                ))));
            }
            state
                .broadcast_system(room, format!("{} was banned by {}", target, moderator))
                .await;
            Ok(None)
        }

        Command::Unban(target) => {
            let target = require_target("unban", target)?;
            if !state.unban_name(&target).await {
                return Ok(Some(ServerMessage::system(format!(
                    "{} is not banned",
                    target
                ))));
            }
            tracing::info!(username = %target, moderator, "Unbanned");
            state
                .broadcast_system(room, format!("{} was unbanned by {}", target, moderator))
                .await;
            Ok(None)
        }

        Command::Vip(target) => {
            let target = require_target("vip", target)?;
            state.grant_vip(&target).await;
            let updated = state.push_vip_status(&target, true).await;
            tracing::info!(username = %target, moderator, online = updated, "VIP granted");
            state
                .broadcast_system(
                    room,
                    format!("{} is now a VIP (granted by {})", target, moderator),
                )
                .await;
            Ok(None)
        }

        Command::Unvip(target) => {
            let target = require_target("unvip", target)?;
            state.revoke_vip(&target).await;
            let updated = state.push_vip_status(&target, false).await;
            tracing::info!(username = %target, moderator, online = updated, "VIP revoked");
            state
                .broadcast_system(
                    room,
                    format!("{} is no longer a VIP (revoked by {})", target, moderator),
                )
                .await;
            Ok(None)
        }

        Command::Unknown(name) => Err(ChatError::UnknownCommand(name)),
    }
}

fn require_target(command: &str, target: String) -> Result<String, ChatError> {
    if target.is_empty() {
        Err(ChatError::MissingTarget(command.to_string()))
    } else {
        Ok(target)
    }
}
