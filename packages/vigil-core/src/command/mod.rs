//! Asynchronous device commands.
//!
//! Long-running device operations (thumbnail refresh, for now) follow a
//! dispatch-then-poll protocol: [`CommandDispatcher`] starts the command and
//! returns a [`CommandTicket`], [`CommandPoller`] queries its status on a
//! fixed interval until it completes or the attempt budget runs out.
//! [`CommandService`] composes both and reports outcomes as events.

mod dispatcher;
mod poller;
mod service;

pub use dispatcher::CommandDispatcher;
pub use poller::CommandPoller;
pub use service::CommandService;

use serde::Serialize;

use crate::cloud::{CommandKind, DeviceType};

/// Lifecycle of a [`CommandTicket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandState {
    New,
    Pending,
    Complete,
    Failed,
}

impl CommandState {
    /// Parses an initial state reported by the dispatch endpoint.
    #[must_use]
    pub fn from_initial(state: &str) -> Option<Self> {
        match state {
            "new" => Some(Self::New),
            "pending" => Some(Self::Pending),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

/// One in-flight device operation.
///
/// Created by the dispatcher; only the poller changes its state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandTicket {
    pub id: u64,
    pub network_id: u64,
    pub device_id: u64,
    pub device_type: DeviceType,
    pub kind: CommandKind,
    state: CommandState,
    attempts_remaining: u32,
    status: Option<i64>,
    status_message: Option<String>,
}

impl CommandTicket {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: u64,
        network_id: u64,
        device_id: u64,
        device_type: DeviceType,
        kind: CommandKind,
        state: CommandState,
        attempts_remaining: u32,
    ) -> Self {
        Self {
            id,
            network_id,
            device_id,
            device_type,
            kind,
            state,
            attempts_remaining,
            status: None,
            status_message: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> CommandState {
        self.state
    }

    /// Status requests the poller may still issue.
    #[must_use]
    pub fn attempts_remaining(&self) -> u32 {
        self.attempts_remaining
    }

    /// Last status code reported by the API (0 means success).
    #[must_use]
    pub fn status(&self) -> Option<i64> {
        self.status
    }

    #[must_use]
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// Uses up one attempt. Returns false when the budget is exhausted.
    pub(crate) fn take_attempt(&mut self) -> bool {
        if self.attempts_remaining == 0 {
            return false;
        }
        self.attempts_remaining -= 1;
        true
    }

    pub(crate) fn record_status(&mut self, status: Option<i64>, message: Option<String>) {
        self.status = status;
        if message.is_some() {
            self.status_message = message;
        }
    }

    pub(crate) fn set_state(&mut self, state: CommandState) {
        self.state = state;
    }
}

/// Result of polling a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The command completed successfully.
    Completed { attempts: u32 },
    /// The command completed with a non-success status.
    Rejected {
        attempts: u32,
        status: i64,
        message: Option<String>,
    },
    /// The attempt budget ran out before completion.
    TimedOut { attempts: u32 },
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cloud::{
        CloudError, CloudResult, CommandInitiateResponse, CommandStatusResponse, DeviceApi,
    };
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Device API replaying scripted responses. Once the status script is
    /// exhausted every request reports "not complete".
    pub(crate) struct ScriptedApi {
        pub start: Mutex<Option<CloudResult<CommandInitiateResponse>>>,
        pub statuses: Mutex<VecDeque<CloudResult<CommandStatusResponse>>>,
        pub start_calls: AtomicUsize,
        pub status_calls: AtomicUsize,
    }

    impl ScriptedApi {
        pub(crate) fn new(start: CloudResult<CommandInitiateResponse>) -> Self {
            Self {
                start: Mutex::new(Some(start)),
                statuses: Mutex::new(VecDeque::new()),
                start_calls: AtomicUsize::new(0),
                status_calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn accepted(id: u64) -> Self {
            Self::new(Ok(CommandInitiateResponse {
                id: Some(id),
                network_id: Some(2),
                command: Some("thumbnail".into()),
                state: Some("new".into()),
                message: None,
            }))
        }

        pub(crate) fn then_status(self, status: CloudResult<CommandStatusResponse>) -> Self {
            self.statuses.lock().push_back(status);
            self
        }

        pub(crate) fn status_calls(&self) -> usize {
            self.status_calls.load(Ordering::SeqCst)
        }
    }

    pub(crate) fn pending() -> CloudResult<CommandStatusResponse> {
        Ok(CommandStatusResponse {
            complete: false,
            status: None,
            status_message: Some("Command pending".into()),
        })
    }

    pub(crate) fn complete(status: i64) -> CloudResult<CommandStatusResponse> {
        Ok(CommandStatusResponse {
            complete: true,
            status: Some(status),
            status_message: Some("Command succeeded".into()),
        })
    }

    pub(crate) fn request_failed() -> CloudResult<CommandStatusResponse> {
        Err(CloudError::HttpStatus(503, "Service Unavailable".into()))
    }

    #[async_trait]
    impl DeviceApi for ScriptedApi {
        async fn start_command(
            &self,
            _network_id: u64,
            _device_id: u64,
            _device_type: DeviceType,
            _kind: CommandKind,
        ) -> CloudResult<CommandInitiateResponse> {
            self.start_calls.fetch_add(1, Ordering::SeqCst);
            self.start
                .lock()
                .take()
                .unwrap_or_else(|| Err(CloudError::Malformed("start already consumed".into())))
        }

        async fn command_status(
            &self,
            _network_id: u64,
            _command_id: u64,
        ) -> CloudResult<CommandStatusResponse> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            self.statuses.lock().pop_front().unwrap_or_else(pending)
        }

        fn thumbnail_url(&self, network_id: u64, device_id: u64, device_type: DeviceType) -> String {
            format!("https://media.test/{network_id}/{device_type}/{device_id}/thumbnail.jpg")
        }
    }

    pub(crate) fn ticket(attempts: u32) -> CommandTicket {
        CommandTicket::new(
            77,
            2,
            3,
            DeviceType::Doorbell,
            CommandKind::Thumbnail,
            CommandState::New,
            attempts,
        )
    }

    #[test]
    fn only_new_and_pending_are_initial_states() {
        assert_eq!(CommandState::from_initial("new"), Some(CommandState::New));
        assert_eq!(CommandState::from_initial("pending"), Some(CommandState::Pending));
        assert_eq!(CommandState::from_initial("complete"), None);
        assert_eq!(CommandState::from_initial(""), None);
    }

    #[test]
    fn attempts_are_bounded() {
        let mut ticket = ticket(2);
        assert!(ticket.take_attempt());
        assert!(ticket.take_attempt());
        assert!(!ticket.take_attempt());
        assert_eq!(ticket.attempts_remaining(), 0);
    }
}
