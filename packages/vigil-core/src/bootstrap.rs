//! Service wiring.
//!
//! The composition root: the one place where the REST client, the live-view
//! facade, the command service and the event bridge are created and wired
//! together.

use std::sync::Arc;

use crate::cloud::CloudClient;
use crate::command::CommandService;
use crate::config::Config;
use crate::context::AccountContext;
use crate::error::{VigilError, VigilResult};
use crate::events::BroadcastEventBridge;
use crate::liveview::{LiveView, SinkProvider, WebSocketConnector};

/// Container for the wired services.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// REST client bound to the account.
    pub cloud: Arc<CloudClient>,
    /// Live-view facade writing into sinks from the given provider.
    pub live_view: Arc<LiveView>,
    /// Dispatch-then-poll device commands.
    pub commands: CommandService,
    /// Event bridge every service emits through.
    pub event_bridge: Arc<BroadcastEventBridge>,
}

impl BootstrappedServices {
    /// Stops any live view. Pending commands end with their poll budget.
    pub fn shutdown(&self) {
        log::info!("[Bootstrap] Shutting down");
        self.live_view.stop();
    }
}

/// Bootstraps all services for one account.
///
/// # Errors
/// Returns `VigilError::InvalidRequest` if `config` is invalid or the HTTP
/// client cannot be built.
pub fn bootstrap_services(
    account: AccountContext,
    config: &Config,
    sinks: Arc<dyn SinkProvider>,
) -> VigilResult<BootstrappedServices> {
    config.validate().map_err(VigilError::InvalidRequest)?;
    log::debug!("[Bootstrap] Account {:?}", account);

    let cloud = Arc::new(
        CloudClient::new(account, config.clone())
            .map_err(|e| VigilError::InvalidRequest(format!("HTTP client: {}", e)))?,
    );
    let event_bridge = Arc::new(BroadcastEventBridge::new(config.event_channel_capacity));

    let live_view = Arc::new(LiveView::new(
        cloud.clone(),
        Arc::new(WebSocketConnector::new()),
        sinks,
        event_bridge.clone(),
    ));
    let commands = CommandService::new(cloud.clone(), config, event_bridge.clone());

    Ok(BootstrappedServices {
        cloud,
        live_view,
        commands,
        event_bridge,
    })
}
