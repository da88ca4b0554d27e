//! Wire shape exchanged with the external I2C controller collaborator (§6).
//!
//! The byte-level I2C peripheral driver is explicitly out of scope (§1
//! Non-goals): this module only describes the request/reply types the
//! device AO exchanges with it through [`crate::scheduler::Scheduler`].
//! Submission goes out via [`crate::scheduler::Scheduler::submit_i2c`];
//! replies come back as [`crate::device::DeviceEvent::I2cComplete`] /
//! [`crate::device::DeviceEvent::I2cError`]. A concrete firmware's
//! `Scheduler` impl is what actually talks to a real controller AO (an
//! interrupt-driven peripheral driver, e.g. the kind built on top of
//! `embedded-hal`); [`crate::sim::FakeScheduler`] stands in for it in tests.

use heapless::Vec;

use crate::ids::TransactionId;

/// Addressing mode of a register access. The template only uses 7-bit
/// addresses, but the wire shape leaves room for a concrete driver that
/// needs 16-bit register addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum RegAddrMode {
    /// 8-bit register address.
    EightBit,
    /// 16-bit register address.
    SixteenBit,
}

/// One leg of an I2C transaction: read the slave's register into a buffer,
/// or write a buffer to it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cOp<const N: usize> {
    /// Read `len` bytes from `reg_addr`.
    Read {
        /// Register address to read from.
        reg_addr: u16,
        /// Number of bytes to read.
        len: usize,
    },
    /// Write `data` to `reg_addr`.
    Write {
        /// Register address to write to.
        reg_addr: u16,
        /// Bytes to write.
        data: Vec<u8, N>,
    },
}

/// A replyable request posted to the I2C controller AO (§6).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cCommRequest<const N: usize> {
    /// Caller-supplied id echoed on the reply; the device AO uses its
    /// current `transaction_id` (§4.5).
    pub id: TransactionId,
    /// 7-bit slave address.
    pub slave_addr: u8,
    /// Register addressing mode in use.
    pub reg_addr_mode: RegAddrMode,
    /// The single read or write making up this transaction.
    pub op: I2cOp<N>,
}

/// Successful completion reply. `buffer` carries the bytes that were read
/// (for [`I2cOp::Read`]) or echoes the bytes that were written (for
/// [`I2cOp::Write`]), the same way an `embedded-hal`-style controller hands
/// a completed transfer's buffer back to its caller rather than requiring a
/// second round trip to fetch it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cCommComplete<const N: usize> {
    /// Echoes [`I2cCommRequest::id`].
    pub id: TransactionId,
    /// Resulting data for the transaction.
    pub buffer: Vec<u8, N>,
}

/// Error reply: the HAL reported a failure for this transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cCommError {
    /// Echoes [`I2cCommRequest::id`].
    pub id: TransactionId,
    /// Opaque HAL error code.
    pub hal_error_code: u8,
}

/// Bus-readiness status published by the I2C controller AO (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum I2cBusStatus {
    /// Neither internal nor external bus segments are ready.
    NoneReady,
    /// Only the internal bus segment is ready.
    InternalOnlyReady,
    /// Only the external bus segment is ready.
    ExternalOnlyReady,
    /// Both bus segments are ready.
    BothReady,
}

/// A reply from the I2C controller AO, as seen by the device AO.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cCommReply<const N: usize> {
    /// Transaction completed.
    Complete(I2cCommComplete<N>),
    /// Transaction failed.
    Error(I2cCommError),
}
