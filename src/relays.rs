//! Relay port abstraction and relay command types.

use anyhow::Result;
use async_trait::async_trait;

/// Commanded state of one relay channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    On,
    Off,
}

/// One relay actuation: drive `channel` to `state`.
///
/// Channel ids are BCM pin numbers for the GPIO adapter; each id is owned by
/// exactly one zone (enforced at config validation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayCommand {
    pub channel: u8,
    pub state: RelayState,
}

impl RelayCommand {
    pub fn new(channel: u8, state: RelayState) -> Self {
        Self { channel, state }
    }
}

/// Trait for relay bank hardware implementations.
///
/// Writes are idempotent: re-asserting the current state of a channel is a
/// no-op at the hardware level.
///
/// # Example
///
/// ```no_run
/// use thermod::relays::{RelayPort, RelayState};
/// use anyhow::Result;
///
/// struct MockRelays;
///
/// #[async_trait::async_trait]
/// impl RelayPort for MockRelays {
///     async fn set(&self, channel: u8, state: RelayState) -> Result<()> { Ok(()) }
/// }
/// ```
#[async_trait]
pub trait RelayPort: Send + Sync {
    /// Drives a single relay channel to the given state.
    async fn set(&self, channel: u8, state: RelayState) -> Result<()>;
}
