//! Compile-time and runtime configuration for the HSM driver template.
//!
//! Most of the knobs in this module are the compile-time constants from the
//! peripheral-agnostic template: queue depths, buffer sizes and timeouts.
//! They are modeled as associated constants on [`HsmConfig`] (rather than
//! `const fn` parameters) so a concrete driver can override exactly the ones
//! it cares about while inheriting sane defaults for the rest, the same way
//! [`crate::i2c_link`] lets a concrete driver override only the addressing it
//! needs.

use fugit::MillisDurationU32;

/// Compile-time parameters shared by the device AO and the API AO.
///
/// A concrete peripheral driver implements this trait (usually on a
/// zero-sized marker type) to select its own queue depths and timeouts.
/// [`DefaultConfig`] reproduces the defaults called out by the template.
pub trait HsmConfig {
    /// Capacity of each active object's incoming event queue.
    const QUEUE_SIZE: usize = 10;

    /// Capacity of the API AO's deferred-request queue.
    const DEFERRED_QUEUE_SIZE: usize = 5;

    /// Capacity, in bytes, of a single read/write data buffer.
    const BUFFER_SIZE: usize = 20;

    /// Per-operation lockup timeout: how long the device AO waits for an
    /// I2C completion/error reply before retrying.
    const LOCKUP_TIME_MS: u32 = 20;

    /// Lockup timeout while the device AO is starting up.
    const DEVICE_INIT_LOCKUP_TIME_MS: u32 = 500;

    /// Lockup timeout while the API AO is starting up (waiting on the
    /// device AO to report ready).
    const API_INIT_LOCKUP_TIME_MS: u32 = 1000;

    /// Outer watchdog bounding time spent in the device AO's `Busy`
    /// superstate regardless of inner retry progress.
    const DEVICE_BUSY_TIME_MS: u32 = 100;

    /// Outer watchdog bounding time spent in the API AO's `Busy` superstate
    /// for a single forwarded client request.
    const API_BUSY_TIME_MS: u32 = 250;

    /// Maximum number of retries before a lockup/busy timeout is treated as
    /// exhausted.
    const I2C_ACTIVE_RETRIES: u8 = 10;

    /// Debug-verbosity level both AOs start at.
    const STARTING_DEBUG_LEVEL: u8 = 1;

    /// [`Self::LOCKUP_TIME_MS`] as a typed duration.
    fn lockup_time() -> MillisDurationU32 {
        MillisDurationU32::millis(Self::LOCKUP_TIME_MS)
    }

    /// [`Self::DEVICE_INIT_LOCKUP_TIME_MS`] as a typed duration.
    fn device_init_lockup_time() -> MillisDurationU32 {
        MillisDurationU32::millis(Self::DEVICE_INIT_LOCKUP_TIME_MS)
    }

    /// [`Self::API_INIT_LOCKUP_TIME_MS`] as a typed duration.
    fn api_init_lockup_time() -> MillisDurationU32 {
        MillisDurationU32::millis(Self::API_INIT_LOCKUP_TIME_MS)
    }

    /// [`Self::DEVICE_BUSY_TIME_MS`] as a typed duration.
    fn device_busy_time() -> MillisDurationU32 {
        MillisDurationU32::millis(Self::DEVICE_BUSY_TIME_MS)
    }

    /// [`Self::API_BUSY_TIME_MS`] as a typed duration.
    fn api_busy_time() -> MillisDurationU32 {
        MillisDurationU32::millis(Self::API_BUSY_TIME_MS)
    }
}

/// The constants called out by the template, unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub struct DefaultConfig;

impl HsmConfig for DefaultConfig {}

/// Runtime configuration for a device AO instance.
///
/// Unlike [`HsmConfig`], these are genuinely runtime values: the slave
/// address is board wiring, not a property of the template, and the debug
/// level is meant to be adjusted live via `DebugLevel` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct Config {
    /// 7-bit I2C slave address this device AO serializes transactions
    /// against.
    pub slave_address: u8,

    /// Initial debug-verbosity threshold.
    pub debug_level: u8,
}

impl Config {
    /// Creates a configuration for the given slave address, with the
    /// template's default starting debug level.
    pub const fn new(slave_address: u8) -> Self {
        Self {
            slave_address,
            debug_level: DefaultConfig::STARTING_DEBUG_LEVEL,
        }
    }

    /// Overrides the starting debug level.
    pub const fn with_debug_level(mut self, debug_level: u8) -> Self {
        self.debug_level = debug_level;
        self
    }
}
