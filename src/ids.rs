//! Identity and correlation types shared by both active objects (§4.5).

/// A request id, assigned by whichever AO originates a request. Echoed
/// verbatim in the corresponding reply so the originator can match it back
/// up (§4.5).
pub type RequestId = u32;

/// A device-AO transaction id. Strictly increasing within one device AO
/// instance; never reused (§3 invariant 1).
pub type TransactionId = u32;

/// A weak handle identifying the originator of a request, so a reply can be
/// routed back without either AO keeping the requester alive (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum AoId {
    /// An external client, identified by a driver-assigned slot number.
    Client(u8),
    /// The API AO singleton.
    Api,
    /// The device AO singleton.
    Device,
}

/// Which direction a transaction moves data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperationKind {
    /// Read from the slave's register into the caller's buffer.
    Read,
    /// Write the caller's buffer to the slave's register.
    Write,
}

/// Externally observable lifecycle status of an active object (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Status {
    /// Before the first status publication.
    #[default]
    Unknown,
    /// In `Disabled`.
    Disabled,
    /// In `Enabled` (either `Idle` or `Busy`).
    Enabled,
    /// In `Error`, and will not recover without an explicit `Enable` or
    /// `Disable`.
    FatalError,
}

/// The two timers every AO owns (§5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerKind {
    /// Bounds the wait for a single downstream reply.
    Lockup,
    /// Bounds total time spent in the `Busy` superstate.
    Busy,
}
