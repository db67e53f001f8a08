//! Connection state machine for a live-view session.
//!
//! Every change of [`ConnectionState`] goes through [`ConnectionState::next`],
//! which returns `None` when an input does not apply to the current state.

use std::fmt;

use serde::Serialize;

/// Lifecycle of a live-view session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionState {
    /// No live view has been requested yet.
    #[default]
    Idle,
    /// Waiting for the REST API to return the connection descriptor.
    ResolvingConfig,
    /// Socket connect in progress.
    Connecting,
    /// Socket open, start frame sent, waiting for the start acknowledgement.
    AwaitingAck,
    /// Media is flowing and playback is running.
    Streaming,
    /// Media is flowing but local playback is paused.
    Paused,
    /// Teardown in progress.
    Stopping,
    /// Session ended normally (local stop, remote stop or peer close).
    Closed,
    /// Session ended because of an error.
    Failed,
}

/// Inputs that drive [`ConnectionState`] transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateInput {
    StartRequested,
    ConfigResolved,
    ConfigFailed,
    TransportOpened,
    StartAcked,
    StopAcked,
    PauseRequested,
    ResumeRequested,
    StopRequested,
    Released,
    TransportClosed,
    TransportFailed,
}

impl ConnectionState {
    /// Returns the state reached by applying `input`, or `None` if the input
    /// is ignored in this state.
    #[must_use]
    pub fn next(self, input: StateInput) -> Option<ConnectionState> {
        use ConnectionState::*;
        use StateInput::*;

        match (self, input) {
            (Idle | Closed | Failed, StartRequested) => Some(ResolvingConfig),
            (ResolvingConfig, ConfigResolved) => Some(Connecting),
            (ResolvingConfig, ConfigFailed) => Some(Failed),
            (Connecting, TransportOpened) => Some(AwaitingAck),
            (AwaitingAck | Paused, StartAcked) => Some(Streaming),
            (AwaitingAck | Streaming | Paused, StopAcked) => Some(Stopping),
            (Streaming, PauseRequested) => Some(Paused),
            (Paused, ResumeRequested) => Some(Streaming),
            (ResolvingConfig | Connecting | AwaitingAck | Streaming | Paused, StopRequested) => {
                Some(Stopping)
            }
            (Stopping, Released) => Some(Closed),
            (state, TransportClosed) if state.holds_socket() => Some(Closed),
            (Failed, TransportFailed) => None,
            (_, TransportFailed) => Some(Failed),
            _ => None,
        }
    }

    /// Returns true while the session may own a socket handle.
    #[must_use]
    pub const fn holds_socket(&self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::AwaitingAck | Self::Streaming | Self::Paused | Self::Stopping
        )
    }

    /// Returns true once the socket handshake completed and control frames can be sent.
    #[must_use]
    pub const fn is_transport_open(&self) -> bool {
        matches!(self, Self::AwaitingAck | Self::Streaming | Self::Paused)
    }

    /// Returns true if a session in this state blocks a new `start`.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self, Self::Idle | Self::Closed | Self::Failed)
    }

    /// Returns true for the end states of a session.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }

    /// Returns the state name in camelCase form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ResolvingConfig => "resolvingConfig",
            Self::Connecting => "connecting",
            Self::AwaitingAck => "awaitingAck",
            Self::Streaming => "streaming",
            Self::Paused => "paused",
            Self::Stopping => "stopping",
            Self::Closed => "closed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionState::*;
    use StateInput::*;

    const ALL: [ConnectionState; 9] = [
        Idle,
        ResolvingConfig,
        Connecting,
        AwaitingAck,
        Streaming,
        Paused,
        Stopping,
        Closed,
        Failed,
    ];

    #[test]
    fn happy_path_reaches_streaming() {
        let state = Idle
            .next(StartRequested)
            .and_then(|s| s.next(ConfigResolved))
            .and_then(|s| s.next(TransportOpened))
            .and_then(|s| s.next(StartAcked));
        assert_eq!(state, Some(Streaming));
    }

    #[test]
    fn start_ack_resumes_paused_session() {
        assert_eq!(Paused.next(StartAcked), Some(Streaming));
        assert_eq!(Streaming.next(StartAcked), None);
    }

    #[test]
    fn stop_ack_goes_through_stopping() {
        assert_eq!(Streaming.next(StopAcked), Some(Stopping));
        assert_eq!(Paused.next(StopAcked), Some(Stopping));
        assert_eq!(Stopping.next(Released), Some(Closed));
    }

    #[test]
    fn transport_error_forces_failed_from_any_state() {
        for state in ALL {
            if state == Failed {
                assert_eq!(state.next(TransportFailed), None);
            } else {
                assert_eq!(state.next(TransportFailed), Some(Failed), "from {state}");
            }
        }
    }

    #[test]
    fn transport_close_forces_closed_while_socket_is_held() {
        for state in ALL {
            let expected = state.holds_socket().then_some(Closed);
            assert_eq!(state.next(TransportClosed), expected, "from {state}");
        }
    }

    #[test]
    fn start_is_only_accepted_when_inactive() {
        for state in ALL {
            assert_eq!(
                state.next(StartRequested).is_some(),
                !state.is_active(),
                "from {state}"
            );
        }
    }

    #[test]
    fn pause_and_resume_only_toggle_streaming() {
        assert_eq!(Streaming.next(PauseRequested), Some(Paused));
        assert_eq!(Paused.next(ResumeRequested), Some(Streaming));
        assert_eq!(AwaitingAck.next(PauseRequested), None);
        assert_eq!(Streaming.next(ResumeRequested), None);
    }

    #[test]
    fn stop_is_ignored_once_terminal() {
        assert_eq!(Closed.next(StopRequested), None);
        assert_eq!(Failed.next(StopRequested), None);
        assert_eq!(Idle.next(StopRequested), None);
    }

    #[test]
    fn serializes_as_camel_case() {
        assert_eq!(
            serde_json::to_string(&AwaitingAck).unwrap(),
            "\"awaitingAck\""
        );
    }
}
