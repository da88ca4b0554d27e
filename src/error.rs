//! Error taxonomy observed by the HSM core.
//!
//! Mirrors the split the HAL itself uses for [`crate::i2c_link`]-adjacent
//! errors: one flat, `#[non_exhaustive]` enum for everything the state
//! machines can produce, plus a `Severity` used when an error is published
//! for observability rather than returned to a caller.

/// Every error condition the device AO or API AO can observe.
///
/// `MismatchRespId` is a warning, never returned to a caller nor used to
/// drive a transition; it is logged and otherwise ignored (§7 propagation
/// policy).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum HsmError {
    /// The lockup timer expired waiting for an I2C completion/error reply,
    /// and retries are exhausted.
    I2cTimeout,

    /// The I2C controller reported a hardware error for the in-flight
    /// transaction.
    I2cError {
        /// Opaque HAL error code as reported by the I2C controller AO.
        hal_code: u8,
    },

    /// A completion or error reply arrived whose echoed transaction id did
    /// not match the device AO's current transaction. Never surfaced to a
    /// caller; logged as a warning only.
    MismatchRespId,

    /// A read/write request arrived while the device AO was already busy
    /// with another transaction (a protocol violation from the API AO's
    /// point of view, since it is expected to defer).
    Busy,

    /// The API AO's deferred-request queue was full when a client request
    /// arrived while busy.
    QueueFull,

    /// The API AO's per-request watchdog expired before the device AO
    /// replied.
    BusyTimeout,

    /// The device AO reported an error (or failed to start) while the API
    /// AO was starting up.
    DeviceUnavailable,

    /// The API AO's startup lockup timer expired with retries exhausted.
    ApiTimeout,
}

impl core::fmt::Display for HsmError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HsmError::I2cTimeout => write!(f, "I2C operation timed out"),
            HsmError::I2cError { hal_code } => {
                write!(f, "I2C controller reported hardware error 0x{hal_code:02x}")
            }
            HsmError::MismatchRespId => write!(f, "reply transaction id did not match"),
            HsmError::Busy => write!(f, "device is busy with another transaction"),
            HsmError::QueueFull => write!(f, "deferred request queue is full"),
            HsmError::BusyTimeout => write!(f, "request watchdog expired"),
            HsmError::DeviceUnavailable => write!(f, "device driver is unavailable"),
            HsmError::ApiTimeout => write!(f, "startup timed out"),
        }
    }
}

impl core::error::Error for HsmError {}

/// Severity attached to a published [`GenericError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Severity {
    /// Logged for observability; no state transition results.
    Warning,
    /// Accompanies (or causes) a state transition.
    Error,
}

/// The generic-error signal published on the status bus (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub struct GenericError {
    /// The underlying error condition.
    pub code: HsmError,
    /// Which active object raised it.
    pub ao_name: &'static str,
    /// Warning vs. error.
    pub severity: Severity,
}

impl GenericError {
    /// Builds a published error record for the given AO.
    pub const fn new(code: HsmError, ao_name: &'static str, severity: Severity) -> Self {
        Self {
            code,
            ao_name,
            severity,
        }
    }
}
