//! Fixed-interval command status polling.

use std::sync::Arc;
use std::time::Duration;

use super::{CommandState, CommandTicket, PollOutcome};
use crate::cloud::DeviceApi;
use crate::protocol_constants::COMMAND_STATUS_SUCCESS;

/// Polls a ticket until completion or until its attempt budget is spent.
///
/// Each attempt issues exactly one status request. A failed request counts
/// as "not complete" for that attempt. Attempts are separated by a constant
/// interval; there is no wait after the last one.
#[derive(Clone)]
pub struct CommandPoller {
    api: Arc<dyn DeviceApi>,
    interval: Duration,
}

impl CommandPoller {
    pub fn new(api: Arc<dyn DeviceApi>, interval: Duration) -> Self {
        Self { api, interval }
    }

    /// Polls `ticket`, consuming its remaining attempts.
    pub async fn poll(&self, ticket: &mut CommandTicket) -> PollOutcome {
        let mut attempts = 0;
        ticket.set_state(CommandState::Pending);

        while ticket.take_attempt() {
            attempts += 1;

            match self.api.command_status(ticket.network_id, ticket.id).await {
                Ok(status) if status.complete => {
                    ticket.record_status(status.status, status.status_message);
                    let code = status.status.unwrap_or(COMMAND_STATUS_SUCCESS);
                    if code == COMMAND_STATUS_SUCCESS {
                        log::info!(
                            "[Command] {} command {} complete after {} attempt(s)",
                            ticket.kind,
                            ticket.id,
                            attempts
                        );
                        ticket.set_state(CommandState::Complete);
                        return PollOutcome::Completed { attempts };
                    }
                    log::warn!(
                        "[Command] {} command {} finished with status {}",
                        ticket.kind,
                        ticket.id,
                        code
                    );
                    ticket.set_state(CommandState::Failed);
                    return PollOutcome::Rejected {
                        attempts,
                        status: code,
                        message: ticket.status_message().map(String::from),
                    };
                }
                Ok(status) => {
                    log::debug!(
                        "[Command] Command {} not complete (attempt {})",
                        ticket.id,
                        attempts
                    );
                    ticket.record_status(status.status, status.status_message);
                }
                Err(e) => {
                    log::debug!(
                        "[Command] Status request for {} failed (attempt {}): {}",
                        ticket.id,
                        attempts,
                        e
                    );
                }
            }

            if ticket.attempts_remaining() > 0 {
                tokio::time::sleep(self.interval).await;
            }
        }

        log::warn!(
            "[Command] {} command {} timed out after {} attempt(s)",
            ticket.kind,
            ticket.id,
            attempts
        );
        ticket.set_state(CommandState::Failed);
        PollOutcome::TimedOut { attempts }
    }
}
