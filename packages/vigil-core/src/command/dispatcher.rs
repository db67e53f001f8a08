//! Starts asynchronous device commands.

use std::sync::Arc;

use super::{CommandState, CommandTicket};
use crate::cloud::{CommandKind, DeviceApi, DeviceType};
use crate::error::{VigilError, VigilResult};

/// Issues the "start command" request and validates the reply into a ticket.
#[derive(Clone)]
pub struct CommandDispatcher {
    api: Arc<dyn DeviceApi>,
    max_attempts: u32,
}

impl CommandDispatcher {
    /// Creates a dispatcher whose tickets carry `max_attempts` status requests.
    pub fn new(api: Arc<dyn DeviceApi>, max_attempts: u32) -> Self {
        Self { api, max_attempts }
    }

    /// Starts `kind` on a device.
    ///
    /// # Errors
    /// Returns `VigilError::CommandDispatch` if the request fails, the API
    /// answers with a non-success status, or the reply lacks a command id or
    /// an initial `new`/`pending` state.
    pub async fn dispatch(
        &self,
        network_id: u64,
        device_id: u64,
        device_type: DeviceType,
        kind: CommandKind,
    ) -> VigilResult<CommandTicket> {
        let response = self
            .api
            .start_command(network_id, device_id, device_type, kind)
            .await
            .map_err(|e| {
                log::warn!("[Command] Failed to start {} on {}: {}", kind, device_id, e);
                VigilError::CommandDispatch(e.to_string())
            })?;

        let reason = |detail: &str| match response.message.as_deref() {
            Some(message) => format!("{}: {}", detail, message),
            None => detail.to_string(),
        };

        let Some(id) = response.id else {
            return Err(VigilError::CommandDispatch(reason("reply has no command id")));
        };
        let Some(state) = response.state.as_deref().and_then(CommandState::from_initial) else {
            return Err(VigilError::CommandDispatch(reason(&format!(
                "unexpected initial state {:?}",
                response.state.as_deref().unwrap_or("")
            ))));
        };

        log::info!(
            "[Command] {} command {} started on {} {}",
            kind,
            id,
            device_type,
            device_id
        );
        Ok(CommandTicket::new(
            id,
            response.network_id.unwrap_or(network_id),
            device_id,
            device_type,
            kind,
            state,
            self.max_attempts,
        ))
    }
}
