//! Joining a room: the ended-room gate and the token request.

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::backend::{Backend, BackendError, TokenRequest};
use crate::metadata::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomAvailability {
    Active,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("Please enter your name.")]
    MissingName,
    #[error("Teacher has closed the meeting. You can no longer join this session.")]
    MeetingEnded,
    #[error("Could not get access token. Please try again.")]
    NoToken,
    #[error("Something went wrong. Please try again.")]
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinTicket {
    pub room: String,
    pub name: String,
    pub role: Role,
    pub token: String,
    pub url: Option<String>,
}

/// An unreachable backend does not keep anyone out.
pub async fn room_availability(backend: &dyn Backend, room: &str) -> RoomAvailability {
    match backend.room_status(room).await {
        Ok(status) if status.ended => RoomAvailability::Ended,
        Ok(_) => RoomAvailability::Active,
        Err(e) => {
            warn!("Room status check failed for {}, allowing join: {}", room, e);
            RoomAvailability::Active
        }
    }
}

pub async fn request_token(
    backend: &dyn Backend,
    room: &str,
    name: &str,
    role: Role,
) -> Result<JoinTicket, JoinError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(JoinError::MissingName);
    }

    let request = TokenRequest {
        name: name.to_string(),
        room: room.to_string(),
        role: role.as_str().to_string(),
    };

    let response = match backend.request_token(&request).await {
        Ok(response) => response,
        // The server answered, just without a usable token.
        Err(BackendError::Status { status, body }) => {
            warn!("Token request rejected ({}): {}", status, body);
            return Err(JoinError::NoToken);
        }
        Err(e) => {
            warn!("Token request failed: {}", e);
            return Err(JoinError::Failed);
        }
    };

    let token = response.token_str().ok_or(JoinError::NoToken)?.to_string();
    info!("Got access token for {} in {}", name, room);
    Ok(JoinTicket {
        room: room.to_string(),
        name: name.to_string(),
        role,
        token,
        url: response.url,
    })
}

/// Room-status gate followed by the token request.
pub async fn join(
    backend: &dyn Backend,
    room: &str,
    name: &str,
    role: Role,
) -> Result<JoinTicket, JoinError> {
    if name.trim().is_empty() {
        return Err(JoinError::MissingName);
    }
    if room_availability(backend, room).await == RoomAvailability::Ended {
        return Err(JoinError::MeetingEnded);
    }
    request_token(backend, room, name, role).await
}
