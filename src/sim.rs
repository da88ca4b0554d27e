//! Test-only [`Scheduler`] double (§10.4).
//!
//! Every external collaborator the HSM core needs — timers, the I2C
//! controller, the status/error bus, the two AOs' own queues — becomes a
//! plain recorded call here. There is no fake clock: timeouts are driven by
//! posting `LockupTimeout`/`BusyTimeout` events directly, the same way a
//! real alarm callback would post them, which keeps the boundary-scenario
//! tests free of any notion of wall-clock time.

use std::vec::Vec as StdVec;

use heapless::Vec;

use crate::error::GenericError;
use crate::i2c_link::I2cCommRequest;
use crate::ids::{AoId, RequestId, Status, TimerKind};
use crate::scheduler::{ClientReply, Scheduler};

/// One recorded [`Scheduler::reply_to`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply<const N: usize> {
    pub requester: AoId,
    pub request_id: RequestId,
    pub reply: ClientReply<N>,
}

/// A scripted, fully synchronous stand-in for the firmware's real scheduler.
/// Tests construct one, drive an AO's [`crate::device::DeviceAo::handle`] /
/// [`crate::api::ApiAo::handle`] against it, then assert on the recorded
/// vectors.
#[derive(Debug, Default)]
pub struct FakeScheduler<const N: usize> {
    pub i2c_submissions: StdVec<I2cCommRequest<N>>,
    pub replies: StdVec<Reply<N>>,
    pub errors: StdVec<GenericError>,
    pub statuses: StdVec<(AoId, Status)>,
    pub armed_timers: StdVec<(AoId, TimerKind, u32)>,
    pub arm_timer_calls: StdVec<(AoId, TimerKind, u32)>,
    pub device_enabled: bool,
    pub device_forward_reads: StdVec<(RequestId, u16, usize)>,
    pub device_forward_writes: StdVec<(RequestId, u16, Vec<u8, N>)>,
    pub pending_device: StdVec<crate::device::DeviceAction>,
    pub pending_api: StdVec<crate::api::ApiAction>,
    pub clock_ms: u32,
}

impl<const N: usize> FakeScheduler<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the fake clock so a test can assert on accumulated idle/busy
    /// time without a real timer.
    pub fn advance_ms(&mut self, delta: u32) {
        self.clock_ms += delta;
    }

    /// Whether `timer` is currently armed for `owner`.
    pub fn is_armed(&self, owner: AoId, timer: TimerKind) -> bool {
        self.armed_timers.iter().any(|(o, t, _)| *o == owner && *t == timer)
    }
}

impl<const N: usize> Scheduler<N> for FakeScheduler<N> {
    fn submit_i2c(&mut self, request: I2cCommRequest<N>) {
        self.i2c_submissions.push(request);
    }

    fn reply_to(&mut self, requester: AoId, request_id: u32, reply: ClientReply<N>) {
        self.replies.push(Reply { requester, request_id, reply });
    }

    fn arm_timer(&mut self, owner: AoId, timer: TimerKind, duration_ms: u32) {
        self.armed_timers.retain(|(o, t, _)| !(*o == owner && *t == timer));
        self.armed_timers.push((owner, timer, duration_ms));
        self.arm_timer_calls.push((owner, timer, duration_ms));
    }

    fn disarm_timer(&mut self, owner: AoId, timer: TimerKind) {
        self.armed_timers.retain(|(o, t, _)| !(*o == owner && *t == timer));
    }

    fn publish_status(&mut self, owner: AoId, status: Status) {
        self.statuses.push((owner, status));
    }

    fn publish_error(&mut self, error: GenericError) {
        self.errors.push(error);
    }

    fn enable_device(&mut self) {
        self.device_enabled = true;
    }

    fn forward_read_to_device(&mut self, request_id: RequestId, register: u16, len: usize) {
        self.device_forward_reads.push((request_id, register, len));
    }

    fn forward_write_to_device(&mut self, request_id: RequestId, register: u16, data: Vec<u8, N>) {
        self.device_forward_writes.push((request_id, register, data));
    }

    fn self_post_device(&mut self, action: crate::device::DeviceAction) {
        self.pending_device.push(action);
    }

    fn self_post_api(&mut self, action: crate::api::ApiAction) {
        self.pending_api.push(action);
    }

    fn now_ms(&self) -> u32 {
        self.clock_ms
    }
}
