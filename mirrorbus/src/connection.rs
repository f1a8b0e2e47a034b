//! Connection lifecycle states.

use std::fmt;

/// Connection state of one side of the bridge.
///
/// ```text
/// ┌────────────┐  resume   ┌────────────┐        ┌───────────┐
/// │Disconnected├──────────►│ Connecting ├───────►│ Connected │
/// └────────────┘           └─────┬──────┘        └──┬─────┬──┘
///        ▲                       │ error            │     │
///        │                       ▼                  │     ▼
///        │                 ┌──────────┐             │ ┌───────────┐
///        └─────────────────┤  Failed  │◄────────────┘ │ Suspended │
///            pause         └──────────┘               └───────────┘
/// ```
///
/// Each side owns its state exclusively and drives transitions from the
/// transport's asynchronous completions; the other side never mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No transport session. The initial state.
    #[default]
    Disconnected,

    /// A connect was issued and has not completed yet.
    Connecting,

    /// The transport session is established.
    Connected,

    /// The transport paused the session; it may come back without a full
    /// reconnect.
    Suspended,

    /// The transport reported the session as failed.
    Failed,
}

impl ConnectionState {
    /// Whether store operations can be expected to reach the transport.
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Suspended => "suspended",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}
