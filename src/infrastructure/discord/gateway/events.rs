use super::error::GatewayError;
use super::payloads::{PresenceUpdate, RequestGuildMembers};
use crate::domain::events::RawEvent;

/// Commands the application sends into the running connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCommand {
    /// Opcode 3.
    UpdatePresence(PresenceUpdate),
    /// Opcode 8.
    RequestGuildMembers(RequestGuildMembers),
    /// Close with 1000 and stop reconnecting.
    Shutdown,
}

/// Who ended a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOrigin {
    /// The server closed it or the transport failed.
    Remote,
    /// The connection closed it in response to the protocol
    /// (Reconnect, Invalid Session, zombie detection).
    Local,
    /// The application asked to shut down.
    User,
}

/// How a socket ended. The origin keeps a user shutdown apart from a
/// remote close carrying the same code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseEvent {
    /// Close frame code; absent when the transport died without one.
    pub code: Option<u16>,
    pub origin: CloseOrigin,
}

impl CloseEvent {
    #[must_use]
    pub const fn remote(code: Option<u16>) -> Self {
        Self {
            code,
            origin: CloseOrigin::Remote,
        }
    }

    #[must_use]
    pub const fn local(code: u16) -> Self {
        Self {
            code: Some(code),
            origin: CloseOrigin::Local,
        }
    }

    #[must_use]
    pub const fn user(code: u16) -> Self {
        Self {
            code: Some(code),
            origin: CloseOrigin::User,
        }
    }

    #[must_use]
    pub const fn is_user_requested(&self) -> bool {
        matches!(self.origin, CloseOrigin::User)
    }
}

/// Everything the gateway reports to its owner.
#[derive(Debug)]
pub enum GatewayEventKind {
    /// `READY` received; the session is now resumable.
    Connected {
        session_id: String,
        resume_url: String,
    },
    Resumed,
    /// A socket ended; `resuming` tells whether the next connect resumes.
    Disconnected {
        close: CloseEvent,
        resuming: bool,
    },
    Reconnecting {
        attempt: u32,
    },
    HeartbeatAck {
        latency_ms: u64,
    },
    /// Every dispatch, untranslated.
    Dispatch(RawEvent),
    /// The gateway gave up; no further events follow.
    Fatal(GatewayError),
    /// The gateway stopped after a shutdown request.
    Stopped,
}

impl GatewayEventKind {
    #[must_use]
    pub const fn is_connection_event(&self) -> bool {
        matches!(
            self,
            Self::Connected { .. }
                | Self::Resumed
                | Self::Disconnected { .. }
                | Self::Reconnecting { .. }
        )
    }

    /// Whether this is the last event the gateway sends.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Fatal(_) | Self::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_event_origin() {
        assert!(CloseEvent::user(1000).is_user_requested());
        assert!(!CloseEvent::remote(Some(1000)).is_user_requested());
        assert_eq!(CloseEvent::local(1001).code, Some(1001));
        assert_eq!(CloseEvent::remote(None).code, None);
    }

    #[test]
    fn test_event_classification() {
        assert!(GatewayEventKind::Resumed.is_connection_event());
        assert!(GatewayEventKind::Stopped.is_terminal());
        assert!(GatewayEventKind::Fatal(GatewayError::closed(4004)).is_terminal());
        assert!(!GatewayEventKind::HeartbeatAck { latency_ms: 1 }.is_terminal());
    }
}
