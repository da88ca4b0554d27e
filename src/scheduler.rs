//! Contract for the scheduler/OS collaborator (§5, §6).
//!
//! Everything the HSM core needs from "the rest of the firmware" — posting
//! an event to an AO's queue, arming/disarming a timer, publishing a status
//! or error signal, and submitting an I2C transaction — is gathered into a
//! single [`Scheduler`] trait. The device AO and API AO never touch a
//! concrete queue, alarm, or bus; they only ever call back into whatever
//! `Scheduler` implementation the surrounding firmware supplies. This keeps
//! the state machines themselves pure and synchronously testable (see
//! [`crate::sim`]).

use crate::error::GenericError;
use crate::i2c_link::I2cCommRequest;
use crate::ids::{AoId, OperationKind, RequestId, Status, TimerKind};
use heapless::Vec;

/// A reply delivered to whichever AO or client originated a request,
/// correlated by the echoed `request_id` (§4.5).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClientReply<const N: usize> {
    /// The operation completed; `buffer` holds the data that was read (for
    /// `Read`) or that was written (echoed back for `Write`, so the caller
    /// can confirm what went out).
    Response {
        /// Which operation this reply answers.
        op: OperationKind,
        /// The buffer descriptor supplied with the original request.
        buffer: Vec<u8, N>,
    },
    /// The operation failed; no side effects occurred on the bus beyond
    /// whatever partial transaction the controller already attempted.
    Error {
        /// Which operation this reply answers.
        op: OperationKind,
        /// Why it failed.
        error: crate::error::HsmError,
    },
}

/// Everything an active object needs from the scheduler/OS collaborator.
///
/// `N` is the per-transaction buffer capacity (`BUFFER_SIZE`, §6).
pub trait Scheduler<const N: usize> {
    /// Submits an I2C transaction to the controller AO. The reply arrives
    /// later via [`crate::device::DeviceEvent::I2cComplete`] /
    /// [`crate::device::DeviceEvent::I2cError`] posted back to the device
    /// AO's own queue.
    fn submit_i2c(&mut self, request: I2cCommRequest<N>);

    /// Delivers a correlated reply to the original requester, identified by
    /// `requester` and `request_id` (§4.5). A vanished requester is a
    /// logged drop (§9), which is a property of the concrete scheduler, not
    /// the HSM core.
    fn reply_to(&mut self, requester: AoId, request_id: u32, reply: ClientReply<N>);

    /// Arms `timer` owned by `owner` for `duration_ms` milliseconds,
    /// replacing any previous arming (§5). Expiry enqueues the
    /// corresponding `LockupTimeout` / `BusyTimeout` event to `owner`'s
    /// queue.
    fn arm_timer(&mut self, owner: AoId, timer: TimerKind, duration_ms: u32);

    /// Disarms `timer` owned by `owner`. A no-op if it was not armed (§5).
    fn disarm_timer(&mut self, owner: AoId, timer: TimerKind);

    /// Publishes a status transition for `owner` (§3 invariant 6).
    fn publish_status(&mut self, owner: AoId, status: Status);

    /// Publishes a [`GenericError`] for observability (§7).
    fn publish_error(&mut self, error: GenericError);

    /// Enables the device AO (used by the API AO's `Starting` state, §4.3).
    fn enable_device(&mut self);

    /// Posts a read request to the device AO's own queue on the API AO's
    /// behalf, tagged with the API AO's `request_id` so the eventual
    /// [`ClientReply`] routed back through [`Scheduler::reply_to`] can be
    /// matched against [`crate::api::ApiAo`]'s in-flight forward (§4.3,
    /// §4.5).
    fn forward_read_to_device(&mut self, request_id: RequestId, register: u16, len: usize);

    /// Posts a write request to the device AO's own queue on the API AO's
    /// behalf. See [`Scheduler::forward_read_to_device`].
    fn forward_write_to_device(&mut self, request_id: RequestId, register: u16, data: Vec<u8, N>);

    /// Self-posts `action` to be delivered to `target`'s own queue after
    /// any already-pending events, per the self-posted-action discipline
    /// (§9).
    fn self_post_device(&mut self, action: crate::device::DeviceAction);

    /// Self-posts `action` to the API AO's own queue.
    fn self_post_api(&mut self, action: crate::api::ApiAction);

    /// Current millisecond timebase (§6 Clock collaborator), used only to
    /// accumulate the API AO's idle/busy timing statistics (§3). Handlers
    /// never branch on its value; it is purely observational.
    fn now_ms(&self) -> u32;
}
