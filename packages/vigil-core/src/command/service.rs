//! Dispatch-then-poll orchestration with event reporting.

use std::sync::Arc;

use super::{CommandDispatcher, CommandPoller, CommandTicket, PollOutcome};
use crate::cloud::{CommandKind, DeviceApi, DeviceType};
use crate::config::Config;
use crate::error::{VigilError, VigilResult};
use crate::events::{CommandEvent, EventEmitter};
use crate::utils::now_millis;

/// Runs device commands to completion and reports every outcome.
///
/// Every failure (dispatch error, rejection, timeout) is both returned and
/// emitted as [`CommandEvent::Failed`], so observers never miss one.
#[derive(Clone)]
pub struct CommandService {
    api: Arc<dyn DeviceApi>,
    dispatcher: CommandDispatcher,
    poller: CommandPoller,
    emitter: Arc<dyn EventEmitter>,
}

impl CommandService {
    pub fn new(api: Arc<dyn DeviceApi>, config: &Config, emitter: Arc<dyn EventEmitter>) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(Arc::clone(&api), config.poll_max_attempts),
            poller: CommandPoller::new(Arc::clone(&api), config.poll_interval()),
            api,
            emitter,
        }
    }

    /// Dispatches `kind` and polls it until it completes.
    ///
    /// # Errors
    /// `VigilError::CommandDispatch` if the command could not be started or
    /// finished with a non-success status, `VigilError::CommandTimeout` if
    /// it did not complete within the attempt budget.
    pub async fn run(
        &self,
        network_id: u64,
        device_id: u64,
        device_type: DeviceType,
        kind: CommandKind,
    ) -> VigilResult<CommandTicket> {
        let (ticket, attempts) = self
            .execute(network_id, device_id, device_type, kind)
            .await?;
        self.emit_completed(&ticket, attempts, None);
        Ok(ticket)
    }

    /// Refreshes a device thumbnail and returns the URL of the new image.
    ///
    /// # Errors
    /// Same as [`run`](Self::run).
    pub async fn try_refresh_thumbnail(
        &self,
        network_id: u64,
        device_id: u64,
        device_type: DeviceType,
    ) -> VigilResult<String> {
        let (ticket, attempts) = self
            .execute(network_id, device_id, device_type, CommandKind::Thumbnail)
            .await?;
        let url = self
            .api
            .thumbnail_url(ticket.network_id, device_id, device_type);
        self.emit_completed(&ticket, attempts, Some(url.clone()));
        Ok(url)
    }

    /// Like [`try_refresh_thumbnail`](Self::try_refresh_thumbnail), with the
    /// failure reported only through events and logs.
    pub async fn refresh_thumbnail(
        &self,
        network_id: u64,
        device_id: u64,
        device_type: DeviceType,
    ) -> Option<String> {
        self.try_refresh_thumbnail(network_id, device_id, device_type)
            .await
            .map_err(|e| log::warn!("[Command] Thumbnail refresh for {} failed: {}", device_id, e))
            .ok()
    }

    async fn execute(
        &self,
        network_id: u64,
        device_id: u64,
        device_type: DeviceType,
        kind: CommandKind,
    ) -> VigilResult<(CommandTicket, u32)> {
        let mut ticket = match self
            .dispatcher
            .dispatch(network_id, device_id, device_type, kind)
            .await
        {
            Ok(ticket) => ticket,
            Err(e) => {
                self.emit_failed(None, device_id, &e);
                return Err(e);
            }
        };

        self.emitter.emit_command(CommandEvent::Dispatched {
            command_id: ticket.id,
            network_id: ticket.network_id,
            device_id,
            device_type,
            kind,
            timestamp: now_millis(),
        });

        let error = match self.poller.poll(&mut ticket).await {
            PollOutcome::Completed { attempts } => return Ok((ticket, attempts)),
            PollOutcome::Rejected {
                status, message, ..
            } => VigilError::CommandDispatch(format!(
                "command {} finished with status {}{}",
                ticket.id,
                status,
                message.map(|m| format!(": {}", m)).unwrap_or_default()
            )),
            PollOutcome::TimedOut { attempts } => VigilError::CommandTimeout {
                command_id: ticket.id,
                attempts,
            },
        };
        self.emit_failed(Some(ticket.id), device_id, &error);
        Err(error)
    }

    fn emit_completed(&self, ticket: &CommandTicket, attempts: u32, url: Option<String>) {
        self.emitter.emit_command(CommandEvent::Completed {
            command_id: ticket.id,
            attempts,
            url,
            timestamp: now_millis(),
        });
    }

    fn emit_failed(&self, command_id: Option<u64>, device_id: u64, error: &VigilError) {
        self.emitter.emit_command(CommandEvent::Failed {
            command_id,
            device_id,
            code: error.code().to_string(),
            error: error.to_string(),
            timestamp: now_millis(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::CloudError;
    use crate::command::tests::{complete, pending, ScriptedApi};
    use crate::command::CommandState;
    use crate::events::emitter::tests::RecordingEmitter;

    fn service(api: ScriptedApi) -> (CommandService, Arc<ScriptedApi>, Arc<RecordingEmitter>) {
        let api = Arc::new(api);
        let emitter = Arc::new(RecordingEmitter::default());
        let config = Config {
            poll_interval_ms: 500,
            poll_max_attempts: 5,
            ..Config::default()
        };
        (
            CommandService::new(api.clone(), &config, emitter.clone()),
            api,
            emitter,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn thumbnail_refresh_returns_asset_url() {
        let (service, api, emitter) =
            service(ScriptedApi::accepted(41).then_status(pending()).then_status(complete(0)));

        let url = service.refresh_thumbnail(2, 3, DeviceType::Camera).await;

        assert_eq!(
            url.as_deref(),
            Some("https://media.test/2/camera/3/thumbnail.jpg")
        );
        assert_eq!(api.status_calls(), 2);
        let events = emitter.command.lock();
        assert!(matches!(events[0], CommandEvent::Dispatched { command_id: 41, .. }));
        assert!(matches!(
            &events[1],
            CommandEvent::Completed { attempts: 2, url: Some(_), .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_reported_not_swallowed() {
        let (service, api, emitter) = service(ScriptedApi::accepted(41));

        let err = service
            .try_refresh_thumbnail(2, 3, DeviceType::Doorbell)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            VigilError::CommandTimeout {
                command_id: 41,
                attempts: 5
            }
        );
        assert_eq!(api.status_calls(), 5);
        assert!(matches!(
            emitter.command.lock().last(),
            Some(CommandEvent::Failed { command_id: Some(41), code, .. }) if code == "command_timeout"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_thumbnail_hides_failure_behind_none() {
        let (service, api, emitter) =
            service(ScriptedApi::new(Err(CloudError::HttpStatus(500, "boom".into()))));

        assert!(service.refresh_thumbnail(2, 3, DeviceType::Owl).await.is_none());
        assert_eq!(api.status_calls(), 0);
        assert!(matches!(
            emitter.command.lock().as_slice(),
            [CommandEvent::Failed { command_id: None, .. }]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn run_returns_completed_ticket() {
        let (service, _api, _emitter) = service(ScriptedApi::accepted(5).then_status(complete(0)));
        let ticket = service
            .run(2, 3, DeviceType::Camera, CommandKind::Thumbnail)
            .await
            .unwrap();
        assert_eq!(ticket.state(), CommandState::Complete);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_command_carries_status() {
        let (service, _api, _emitter) = service(ScriptedApi::accepted(5).then_status(complete(3)));
        let err = service
            .run(2, 3, DeviceType::Camera, CommandKind::Thumbnail)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "command_dispatch_failed");
        assert!(err.to_string().contains("status 3"));
    }
}
