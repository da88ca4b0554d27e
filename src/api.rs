//! The API AO: presents the enable/disable/status/read/write contract to
//! clients, deferring requests while the device AO is busy (§4.3).
//!
//! Structurally this mirrors [`crate::device::DeviceAo`] — same five-state
//! skeleton, same injected [`Scheduler`] — but its `Busy` superstate has a
//! single leaf (there is only ever one forwarded request in flight) and it
//! owns a bounded deferred-request queue instead of a transaction buffer.

use heapless::{Deque, Vec};

use crate::config::HsmConfig;
use crate::error::{GenericError, HsmError, Severity};
use crate::hsm::{self, Outcome, StateTree};
use crate::ids::{AoId, OperationKind, RequestId, Status, TimerKind};
use crate::retry::RetryCounter;
use crate::scheduler::{ClientReply, Scheduler};
use core::marker::PhantomData;

/// Current state of an API AO instance. `Enabled` and `Backstop` are
/// superstates, never held as `current` (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ApiState {
    /// Powered down; rejects requests with no reply.
    Disabled,
    /// Enabling the device AO and waiting for it to report ready.
    Starting,
    /// The device AO became unavailable, or startup timed out.
    Error,
    /// Enabled, no forwarded request outstanding.
    Idle,
    /// A request has been forwarded to the device AO.
    Busy,
    /// Superstate of `Idle`/`Busy`.
    Enabled,
    /// Shared root of the hierarchy.
    Backstop,
}

impl StateTree for ApiState {
    fn chain(self) -> &'static [Self] {
        use ApiState::*;
        match self {
            Disabled => &[Disabled, Backstop],
            Starting => &[Starting, Backstop],
            Error => &[Error, Backstop],
            Enabled => &[Enabled, Backstop],
            Idle => &[Idle, Enabled, Backstop],
            Busy => &[Busy, Enabled, Backstop],
            Backstop => &[Backstop],
        }
    }
}

/// Self-posted action signals (§9), analogous to
/// [`crate::device::DeviceAction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ApiAction {
    /// Submit the in-flight forwarded request to the device AO.
    Forward,
    /// A lockup/busy timeout was retried; redo the current state's entry
    /// work.
    Retry,
    /// Pop the next deferred request (if any) and forward it.
    Recall,
}

/// Events the API AO's queue carries (§4.3, §6).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ApiEvent<const N: usize> {
    /// Enter `Starting`.
    Enable,
    /// Unconditionally return to `Disabled`.
    Disable,
    /// Re-publish the current status.
    RequestStatus,
    /// Adjust the debug-verbosity threshold.
    DebugLevel(u8),
    /// Forward a read to the device AO, or defer it while busy.
    Read {
        /// Who to reply to.
        requester: AoId,
        /// Echoed back in the reply (§4.5).
        request_id: RequestId,
        /// Register address.
        register: u16,
        /// Number of bytes to read.
        len: usize,
    },
    /// Forward a write to the device AO, or defer it while busy.
    Write {
        /// Who to reply to.
        requester: AoId,
        /// Echoed back in the reply (§4.5).
        request_id: RequestId,
        /// Register address.
        register: u16,
        /// Bytes to write.
        data: Vec<u8, N>,
    },
    /// The device AO published a status transition.
    DeviceStatus(Status),
    /// The device AO replied to a request the API AO forwarded, echoing the
    /// `request_id` the API AO assigned it (§4.5).
    DeviceReply {
        /// Echoes the id the API AO assigned the forwarded request.
        request_id: RequestId,
        /// The device AO's reply.
        reply: ClientReply<N>,
    },
    /// The startup lockup timer expired.
    LockupTimeout,
    /// The per-request busy watchdog expired.
    BusyTimeout,
    /// A self-posted action (§9).
    Action(ApiAction),
}

struct Pending<const N: usize> {
    requester: AoId,
    request_id: RequestId,
    op: OperationKind,
    register: u16,
    data: Option<Vec<u8, N>>,
    len: usize,
}

/// The API active object. `Q` is the deferred-request queue depth
/// (`DEFERRED_QUEUE_SIZE`); `N` is the per-request buffer capacity
/// (`BUFFER_SIZE`), matching the device AO's own `N`.
pub struct ApiAo<C, const N: usize, const Q: usize> {
    state: ApiState,
    status: Status,
    debug_level: u8,
    retries: RetryCounter,
    next_forward_id: RequestId,
    inflight: Option<(RequestId, Pending<N>)>,
    deferred: Deque<Pending<N>, Q>,
    last_error: Option<HsmError>,
    leaf_entered_at_ms: u32,
    idle_ms_total: u32,
    busy_ms_total: u32,
    _config: PhantomData<C>,
}

impl<C: HsmConfig, const N: usize, const Q: usize> ApiAo<C, N, Q> {
    /// Builds an API AO, left in `Disabled`.
    pub fn new(debug_level: u8) -> Self {
        Self {
            state: ApiState::Disabled,
            status: Status::Unknown,
            debug_level,
            retries: RetryCounter::new(C::I2C_ACTIVE_RETRIES),
            next_forward_id: 0,
            inflight: None,
            deferred: Deque::new(),
            last_error: None,
            leaf_entered_at_ms: 0,
            idle_ms_total: 0,
            busy_ms_total: 0,
            _config: PhantomData,
        }
    }

    /// Current externally-observable status.
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Current state, mostly useful for tests.
    pub const fn state(&self) -> ApiState {
        self.state
    }

    /// Number of requests currently held in the deferred queue.
    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    /// The most recent error this API AO has observed, if any (§3 data
    /// model). Persists across requests as a diagnostic; only ever
    /// overwritten by a newer error, never cleared by ordinary progress.
    pub const fn last_error(&self) -> Option<HsmError> {
        self.last_error
    }

    /// Cumulative milliseconds spent in `Idle` so far (§3 per-AO timing
    /// statistics), accumulated from [`Scheduler::now_ms`] at each `Idle`
    /// exit.
    pub const fn idle_time_ms(&self) -> u32 {
        self.idle_ms_total
    }

    /// Cumulative milliseconds spent in `Busy` so far, accumulated from
    /// [`Scheduler::now_ms`] at each `Busy` exit.
    pub const fn busy_time_ms(&self) -> u32 {
        self.busy_ms_total
    }

    /// Runs `event` through the hierarchical dispatch/transition pipeline.
    pub fn handle(&mut self, event: ApiEvent<N>, sched: &mut impl Scheduler<N>) {
        let current = self.state;
        let target = hsm::dispatch(current, &event, |level, ev| self.dispatch_level(level, ev, &mut *sched));
        if let Some(target) = target {
            self.set_state(target, sched);
        }
    }

    fn set_state(&mut self, target: ApiState, sched: &mut impl Scheduler<N>) {
        let current = self.state;
        crate::log::hsm_trace!("api: {} -> {}", current, target);
        let (exit_levels, entry_levels) = hsm::transition_chains(current, target);
        for &level in exit_levels {
            self.exit(level, sched);
        }
        for &level in entry_levels.iter().rev() {
            self.enter(level, sched);
        }
        self.state = target;
    }

    fn dispatch_level(&mut self, level: ApiState, event: &ApiEvent<N>, sched: &mut impl Scheduler<N>) -> Outcome<ApiState> {
        match level {
            ApiState::Disabled => self.on_disabled(event),
            ApiState::Starting => self.on_starting(event, sched),
            ApiState::Error => self.on_error(event),
            ApiState::Enabled => self.on_enabled(event),
            ApiState::Idle => self.on_idle(event, sched),
            ApiState::Busy => self.on_busy(event, sched),
            ApiState::Backstop => self.on_backstop(event, sched),
        }
    }

    fn enter(&mut self, level: ApiState, sched: &mut impl Scheduler<N>) {
        match level {
            ApiState::Disabled => {
                self.status = Status::Disabled;
                sched.publish_status(AoId::Api, self.status);
            }
            ApiState::Starting => {
                self.retries.reset();
                sched.arm_timer(AoId::Api, TimerKind::Lockup, C::API_INIT_LOCKUP_TIME_MS);
                sched.enable_device();
            }
            ApiState::Error => {
                self.status = Status::FatalError;
                self.inflight = None;
                sched.publish_status(AoId::Api, self.status);
            }
            ApiState::Enabled => {
                self.status = Status::Enabled;
                sched.publish_status(AoId::Api, self.status);
            }
            ApiState::Idle => {
                self.retries.reset();
                self.leaf_entered_at_ms = sched.now_ms();
                if !self.deferred.is_empty() {
                    sched.self_post_api(ApiAction::Recall);
                }
            }
            ApiState::Busy => {
                self.leaf_entered_at_ms = sched.now_ms();
                sched.arm_timer(AoId::Api, TimerKind::Busy, C::API_BUSY_TIME_MS);
                sched.self_post_api(ApiAction::Forward);
            }
            ApiState::Backstop => {}
        }
    }

    fn exit(&mut self, level: ApiState, sched: &mut impl Scheduler<N>) {
        match level {
            ApiState::Idle => {
                self.idle_ms_total = self.idle_ms_total.saturating_add(sched.now_ms().saturating_sub(self.leaf_entered_at_ms));
            }
            ApiState::Busy => {
                self.busy_ms_total = self.busy_ms_total.saturating_add(sched.now_ms().saturating_sub(self.leaf_entered_at_ms));
                sched.disarm_timer(AoId::Api, TimerKind::Busy);
            }
            _ => {}
        }
    }

    fn on_backstop(&mut self, event: &ApiEvent<N>, sched: &mut impl Scheduler<N>) -> Outcome<ApiState> {
        match event {
            ApiEvent::RequestStatus => {
                sched.publish_status(AoId::Api, self.status);
                Outcome::Handled
            }
            ApiEvent::DebugLevel(level) => {
                self.debug_level = *level;
                Outcome::Handled
            }
            ApiEvent::Disable => Outcome::Transition(ApiState::Disabled),
            _ => {
                crate::log::hsm_debug!("api: dropping unhandled signal");
                Outcome::Handled
            }
        }
    }

    fn on_disabled(&mut self, event: &ApiEvent<N>) -> Outcome<ApiState> {
        match event {
            ApiEvent::Enable => Outcome::Transition(ApiState::Starting),
            ApiEvent::Disable => Outcome::Handled,
            ApiEvent::Read { .. } | ApiEvent::Write { .. } => {
                crate::log::hsm_debug!("api: rejecting request while disabled, no reply");
                Outcome::Handled
            }
            _ => Outcome::Bubble,
        }
    }

    fn on_starting(&mut self, event: &ApiEvent<N>, sched: &mut impl Scheduler<N>) -> Outcome<ApiState> {
        match event {
            ApiEvent::DeviceStatus(Status::Enabled) => Outcome::Transition(ApiState::Idle),
            ApiEvent::DeviceStatus(Status::Disabled) | ApiEvent::DeviceStatus(Status::FatalError) => {
                sched.publish_error(GenericError::new(HsmError::DeviceUnavailable, "api", Severity::Warning));
                if self.retries.try_retry() {
                    sched.self_post_api(ApiAction::Retry);
                    Outcome::Handled
                } else {
                    self.last_error = Some(HsmError::DeviceUnavailable);
                    Outcome::Transition(ApiState::Error)
                }
            }
            ApiEvent::Action(ApiAction::Retry) => {
                sched.arm_timer(AoId::Api, TimerKind::Lockup, C::API_INIT_LOCKUP_TIME_MS);
                sched.enable_device();
                Outcome::Handled
            }
            ApiEvent::LockupTimeout => {
                if self.retries.try_retry() {
                    sched.self_post_api(ApiAction::Retry);
                    Outcome::Handled
                } else {
                    self.last_error = Some(HsmError::ApiTimeout);
                    sched.publish_error(GenericError::new(HsmError::ApiTimeout, "api", Severity::Error));
                    Outcome::Transition(ApiState::Error)
                }
            }
            ApiEvent::Enable => Outcome::Handled,
            _ => Outcome::Bubble,
        }
    }

    fn on_error(&mut self, event: &ApiEvent<N>) -> Outcome<ApiState> {
        match event {
            ApiEvent::Disable => Outcome::Transition(ApiState::Disabled),
            ApiEvent::Enable => Outcome::Transition(ApiState::Starting),
            ApiEvent::Read { .. } | ApiEvent::Write { .. } => {
                crate::log::hsm_debug!("api: rejecting request in Error, no reply");
                Outcome::Handled
            }
            _ => Outcome::Bubble,
        }
    }

    fn on_enabled(&mut self, event: &ApiEvent<N>) -> Outcome<ApiState> {
        match event {
            ApiEvent::Enable => Outcome::Handled,
            _ => Outcome::Bubble,
        }
    }

    fn on_idle(&mut self, event: &ApiEvent<N>, _sched: &mut impl Scheduler<N>) -> Outcome<ApiState> {
        match event {
            ApiEvent::Read { requester, request_id, register, len } => {
                self.stage(
                    Pending { requester: *requester, request_id: *request_id, op: OperationKind::Read, register: *register, data: None, len: *len },
                );
                Outcome::Transition(ApiState::Busy)
            }
            ApiEvent::Write { requester, request_id, register, data } => {
                self.stage(Pending {
                    requester: *requester,
                    request_id: *request_id,
                    op: OperationKind::Write,
                    register: *register,
                    data: Some(data.clone()),
                    len: 0,
                });
                Outcome::Transition(ApiState::Busy)
            }
            ApiEvent::Action(ApiAction::Recall) => {
                if let Some(next) = self.deferred.pop_front() {
                    self.stage(next);
                    Outcome::Transition(ApiState::Busy)
                } else {
                    Outcome::Handled
                }
            }
            _ => Outcome::Bubble,
        }
    }

    fn stage(&mut self, pending: Pending<N>) {
        self.next_forward_id = self.next_forward_id.wrapping_add(1);
        self.inflight = Some((self.next_forward_id, pending));
    }

    fn on_busy(&mut self, event: &ApiEvent<N>, sched: &mut impl Scheduler<N>) -> Outcome<ApiState> {
        match event {
            ApiEvent::Action(ApiAction::Forward) => {
                if let Some((forward_id, pending)) = &self.inflight {
                    match pending.op {
                        OperationKind::Read => sched.forward_read_to_device(*forward_id, pending.register, pending.len),
                        OperationKind::Write => {
                            sched.forward_write_to_device(*forward_id, pending.register, pending.data.clone().unwrap_or_default())
                        }
                    }
                }
                Outcome::Handled
            }
            ApiEvent::Read { requester, request_id, register, len } => {
                self.defer_or_reject(Pending { requester: *requester, request_id: *request_id, op: OperationKind::Read, register: *register, data: None, len: *len }, sched);
                Outcome::Handled
            }
            ApiEvent::Write { requester, request_id, register, data } => {
                self.defer_or_reject(
                    Pending { requester: *requester, request_id: *request_id, op: OperationKind::Write, register: *register, data: Some(data.clone()), len: 0 },
                    sched,
                );
                Outcome::Handled
            }
            ApiEvent::DeviceReply { request_id, reply } => {
                if let Some((forward_id, pending)) = &self.inflight {
                    if *forward_id == *request_id {
                        let pending = self.inflight.take().unwrap().1;
                        sched.reply_to(pending.requester, pending.request_id, reply.clone());
                        return Outcome::Transition(ApiState::Idle);
                    }
                }
                crate::log::hsm_warn!("api: stale device reply ignored");
                sched.publish_error(GenericError::new(HsmError::MismatchRespId, "api", Severity::Warning));
                Outcome::Handled
            }
            ApiEvent::BusyTimeout => {
                self.last_error = Some(HsmError::BusyTimeout);
                if let Some((_, pending)) = self.inflight.take() {
                    sched.reply_to(pending.requester, pending.request_id, ClientReply::Error { op: pending.op, error: HsmError::BusyTimeout });
                }
                sched.publish_error(GenericError::new(HsmError::BusyTimeout, "api", Severity::Error));
                Outcome::Transition(ApiState::Idle)
            }
            _ => Outcome::Bubble,
        }
    }

    fn defer_or_reject(&mut self, pending: Pending<N>, sched: &mut impl Scheduler<N>) {
        let requester = pending.requester;
        let request_id = pending.request_id;
        let op = pending.op;
        if let Err(pending) = self.deferred.push_back(pending) {
            let _ = pending;
            sched.reply_to(requester, request_id, ClientReply::Error { op, error: HsmError::QueueFull });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultConfig;
    use crate::sim::FakeScheduler;

    type TestAo = ApiAo<DefaultConfig, 8, 2>;

    fn start(api: &mut TestAo, sched: &mut FakeScheduler<8>) {
        api.handle(ApiEvent::Enable, sched);
        assert!(sched.device_enabled);
        api.handle(ApiEvent::DeviceStatus(Status::Enabled), sched);
        assert_eq!(api.state(), ApiState::Idle);
    }

    #[test]
    fn starting_reaches_idle_once_device_reports_enabled() {
        let mut api = TestAo::new(1);
        let mut sched = FakeScheduler::<8>::new();
        start(&mut api, &mut sched);
        assert_eq!(api.status(), Status::Enabled);
    }

    #[test]
    fn single_request_forwards_and_replies() {
        let mut api = TestAo::new(1);
        let mut sched = FakeScheduler::<8>::new();
        start(&mut api, &mut sched);
        api.handle(ApiEvent::Read { requester: AoId::Client(0), request_id: 5, register: 0x10, len: 2 }, &mut sched);
        assert_eq!(api.state(), ApiState::Busy);
        api.handle(ApiEvent::Action(ApiAction::Forward), &mut sched);
        assert_eq!(sched.device_forward_reads.len(), 1);
        let forward_id = sched.device_forward_reads[0].0;
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&[1, 2]).unwrap();
        api.handle(
            ApiEvent::DeviceReply { request_id: forward_id, reply: ClientReply::Response { op: OperationKind::Read, buffer } },
            &mut sched,
        );
        assert_eq!(api.state(), ApiState::Idle);
        assert_eq!(sched.replies.len(), 1);
        assert_eq!(sched.replies[0].requester, AoId::Client(0));
        assert_eq!(sched.replies[0].request_id, 5);
    }

    #[test]
    fn requests_while_busy_are_deferred_and_recalled() {
        let mut api = TestAo::new(1);
        let mut sched = FakeScheduler::<8>::new();
        start(&mut api, &mut sched);
        api.handle(ApiEvent::Read { requester: AoId::Client(0), request_id: 1, register: 0x10, len: 1 }, &mut sched);
        api.handle(ApiEvent::Action(ApiAction::Forward), &mut sched);
        api.handle(ApiEvent::Write { requester: AoId::Client(1), request_id: 2, register: 0x11, data: Vec::new() }, &mut sched);
        assert_eq!(api.deferred_len(), 1);

        let forward_id = sched.device_forward_reads[0].0;
        api.handle(
            ApiEvent::DeviceReply { request_id: forward_id, reply: ClientReply::Response { op: OperationKind::Read, buffer: Vec::new() } },
            &mut sched,
        );
        assert_eq!(api.state(), ApiState::Busy);
        assert_eq!(api.deferred_len(), 0);
        api.handle(ApiEvent::Action(ApiAction::Forward), &mut sched);
        assert_eq!(sched.device_forward_writes.len(), 1);
    }

    #[test]
    fn deferred_queue_overflow_rejects_with_queue_full() {
        let mut api = TestAo::new(1);
        let mut sched = FakeScheduler::<8>::new();
        start(&mut api, &mut sched);
        api.handle(ApiEvent::Read { requester: AoId::Client(0), request_id: 1, register: 0x10, len: 1 }, &mut sched);
        for id in 0..=TestAo::deferred_capacity() {
            api.handle(
                ApiEvent::Read { requester: AoId::Client(1), request_id: id as u32 + 2, register: 0x10, len: 1 },
                &mut sched,
            );
        }
        assert_eq!(sched.replies.len(), 1);
        assert!(matches!(sched.replies[0].reply, ClientReply::Error { error: HsmError::QueueFull, .. }));
    }

    #[test]
    fn device_unavailable_during_starting_retries_then_errors() {
        let mut api = TestAo::new(1);
        let mut sched = FakeScheduler::<8>::new();
        api.handle(ApiEvent::Enable, &mut sched);
        for _ in 0..DefaultConfig::I2C_ACTIVE_RETRIES {
            api.handle(ApiEvent::DeviceStatus(Status::FatalError), &mut sched);
            api.handle(ApiEvent::Action(ApiAction::Retry), &mut sched);
        }
        api.handle(ApiEvent::DeviceStatus(Status::FatalError), &mut sched);
        assert_eq!(api.state(), ApiState::Error);
        assert_eq!(api.status(), Status::FatalError);
        assert_eq!(api.last_error(), Some(HsmError::DeviceUnavailable));
    }

    #[test]
    fn idle_and_busy_time_accumulate_and_last_error_persists() {
        let mut api = TestAo::new(1);
        let mut sched = FakeScheduler::<8>::new();
        start(&mut api, &mut sched);
        sched.advance_ms(10);
        api.handle(ApiEvent::Read { requester: AoId::Client(0), request_id: 1, register: 0x10, len: 1 }, &mut sched);
        assert_eq!(api.idle_time_ms(), 10);
        sched.advance_ms(5);
        api.handle(ApiEvent::Action(ApiAction::Forward), &mut sched);
        let forward_id = sched.device_forward_reads[0].0;
        api.handle(
            ApiEvent::DeviceReply { request_id: forward_id, reply: ClientReply::Response { op: OperationKind::Read, buffer: Vec::new() } },
            &mut sched,
        );
        assert_eq!(api.busy_time_ms(), 5);
        assert_eq!(api.last_error(), None);

        api.handle(ApiEvent::Read { requester: AoId::Client(0), request_id: 2, register: 0x10, len: 1 }, &mut sched);
        api.handle(ApiEvent::Action(ApiAction::Forward), &mut sched);
        api.handle(ApiEvent::BusyTimeout, &mut sched);
        assert_eq!(api.state(), ApiState::Idle);
        assert_eq!(api.last_error(), Some(HsmError::BusyTimeout));
    }

    #[test]
    fn busy_timeout_fails_immediately_without_retrying() {
        let mut api = TestAo::new(1);
        let mut sched = FakeScheduler::<8>::new();
        start(&mut api, &mut sched);
        api.handle(ApiEvent::Read { requester: AoId::Client(0), request_id: 1, register: 0x10, len: 1 }, &mut sched);
        api.handle(ApiEvent::Action(ApiAction::Forward), &mut sched);
        api.handle(ApiEvent::BusyTimeout, &mut sched);
        assert_eq!(api.state(), ApiState::Idle);
        assert_eq!(api.status(), Status::Enabled);
        assert_eq!(sched.errors.len(), 1);
        assert_eq!(sched.replies.len(), 1);
        assert!(matches!(sched.replies[0].reply, ClientReply::Error { error: HsmError::BusyTimeout, .. }));
        assert_eq!(api.last_error(), Some(HsmError::BusyTimeout));
    }
}

impl<C: HsmConfig, const N: usize, const Q: usize> ApiAo<C, N, Q> {
    #[cfg(test)]
    const fn deferred_capacity() -> usize {
        Q
    }
}
