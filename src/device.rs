//! The device AO: owns the I2C transaction lifecycle for one slave (§4.2).
//!
//! `DeviceAo` never touches a bus, timer or queue directly. Every side
//! effect — arming a timer, submitting a transaction, replying to a
//! requester — goes through the injected [`Scheduler`], which is also what
//! makes [`DeviceAo::handle`] trivial to drive from a `#[cfg(test)]` module
//! with a scripted fake instead of real hardware.

use heapless::Vec;

use crate::config::{Config, HsmConfig};
use crate::error::{GenericError, HsmError, Severity};
use crate::hsm::{self, Outcome, StateTree};
use crate::i2c_link::{I2cCommRequest, I2cOp, RegAddrMode};
use crate::ids::{AoId, OperationKind, RequestId, Status, TimerKind, TransactionId};
use crate::retry::RetryCounter;
use crate::scheduler::{ClientReply, Scheduler};
use core::marker::PhantomData;

/// Current state of a device AO instance.
///
/// `Busy`, `Enabled` and `Backstop` are superstates: a device AO is never
/// actually parked "in" one of them, but they appear in [`DeviceState::chain`]
/// as ancestors of the leaf states that are (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    /// Powered down; rejects requests with no reply.
    Disabled,
    /// Running init, waiting to self-post into `Idle`.
    Starting,
    /// A hard I2C error or exhausted startup retry was observed.
    Error,
    /// Enabled and ready to accept the next read/write.
    Idle,
    /// A read transaction is in flight.
    Read,
    /// A write transaction is in flight.
    Write,
    /// Superstate of `Read`/`Write`; owns the busy watchdog.
    Busy,
    /// Superstate of `Idle`/`Busy`.
    Enabled,
    /// Shared root of the hierarchy.
    Backstop,
}

impl StateTree for DeviceState {
    fn chain(self) -> &'static [Self] {
        use DeviceState::*;
        match self {
            Disabled => &[Disabled, Backstop],
            Starting => &[Starting, Backstop],
            Error => &[Error, Backstop],
            Enabled => &[Enabled, Backstop],
            Idle => &[Idle, Enabled, Backstop],
            Busy => &[Busy, Enabled, Backstop],
            Read => &[Read, Busy, Enabled, Backstop],
            Write => &[Write, Busy, Enabled, Backstop],
            Backstop => &[Backstop],
        }
    }
}

/// Self-posted action signals (§9): events a device AO posts to its own
/// queue so that entry-time work happens on the next dispatch cycle rather
/// than recursively inside the transition that triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceAction {
    /// Starting's init work is done; proceed to Idle.
    EnterIdle,
    /// (Re-)submit the in-flight read/write to the I2C controller.
    StartRw,
    /// A lockup/busy timeout was retried; redo whatever that state's entry
    /// work was.
    Retry,
}

/// Events the device AO's queue carries (§4.2, §6).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceEvent<const N: usize> {
    /// Enter `Starting`.
    Enable,
    /// Unconditionally return to `Disabled`, preempting anything in flight.
    Disable,
    /// Unconditionally return to `Disabled`, preempting anything in flight
    /// (§6). Distinct signal from `Disable` so a supervisory caller can tell
    /// "the client asked to stop" apart from "the device reported itself
    /// disabled" in a trace log, but handled identically: both abort
    /// whatever is in flight with no reply to the aborted requester.
    Stop,
    /// Re-publish the current status.
    RequestStatus,
    /// Adjust the debug-verbosity threshold.
    DebugLevel(u8),
    /// Read `len` bytes from `register`, replying to `requester`.
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
    /// Write `data` to `register`, replying to `requester`.
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
    /// The I2C controller finished the transaction tagged `id`.
    I2cComplete {
        /// Echoes the submitted transaction id.
        id: TransactionId,
        /// Resulting data.
        buffer: Vec<u8, N>,
    },
    /// The I2C controller failed the transaction tagged `id`.
    I2cError {
        /// Echoes the submitted transaction id.
        id: TransactionId,
        /// Opaque HAL error code.
        hal_code: u8,
    },
    /// The lockup timer expired.
    LockupTimeout,
    /// The busy watchdog expired.
    BusyTimeout,
    /// A self-posted action (§9).
    Action(DeviceAction),
}

struct Inflight<const N: usize> {
    op: OperationKind,
    requester: AoId,
    request_id: RequestId,
    register: u16,
    write_data: Option<Vec<u8, N>>,
    read_len: usize,
}

/// The device active object.
pub struct DeviceAo<C, const N: usize> {
    state: DeviceState,
    status: Status,
    slave_address: u8,
    debug_level: u8,
    transaction_id: TransactionId,
    retries: RetryCounter,
    inflight: Option<Inflight<N>>,
    last_error: Option<HsmError>,
    _config: PhantomData<C>,
}

impl<C: HsmConfig, const N: usize> DeviceAo<C, N> {
    /// Builds a device AO from `config`, left in `Disabled` (§4.2's shared
    /// `Initial` lifecycle is modeled as the constructor, since it does
    /// nothing observable beyond landing in `Disabled`).
    pub const fn new(config: Config) -> Self {
        Self {
            state: DeviceState::Disabled,
            status: Status::Unknown,
            slave_address: config.slave_address,
            debug_level: config.debug_level,
            transaction_id: 0,
            retries: RetryCounter::new(C::I2C_ACTIVE_RETRIES),
            inflight: None,
            last_error: None,
            _config: PhantomData,
        }
    }

    /// Current externally-observable status.
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Current state, mostly useful for tests.
    pub const fn state(&self) -> DeviceState {
        self.state
    }

    /// The most recent error this device AO has observed, if any (§3 data
    /// model). Persists across operations as a diagnostic; only ever
    /// overwritten by a newer error, never cleared by ordinary progress.
    pub const fn last_error(&self) -> Option<HsmError> {
        self.last_error
    }

    /// Runs `event` through the hierarchical dispatch/transition pipeline,
    /// calling back into `sched` for every side effect along the way.
    pub fn handle(&mut self, event: DeviceEvent<N>, sched: &mut impl Scheduler<N>) {
        let current = self.state;
        let target = hsm::dispatch(current, &event, |level, ev| self.dispatch_level(level, ev, &mut *sched));
        if let Some(target) = target {
            self.set_state(target, sched);
        }
    }

    fn set_state(&mut self, target: DeviceState, sched: &mut impl Scheduler<N>) {
        let current = self.state;
        crate::log::hsm_trace!("device: {} -> {}", current, target);
        let (exit_levels, entry_levels) = hsm::transition_chains(current, target);
        for &level in exit_levels {
            self.exit(level, sched);
        }
        for &level in entry_levels.iter().rev() {
            self.enter(level, sched);
        }
        self.state = target;
    }

    fn dispatch_level(&mut self, level: DeviceState, event: &DeviceEvent<N>, sched: &mut impl Scheduler<N>) -> Outcome<DeviceState> {
        match level {
            DeviceState::Disabled => self.on_disabled(event),
            DeviceState::Starting => self.on_starting(event, sched),
            DeviceState::Error => self.on_error(event),
            DeviceState::Enabled => self.on_enabled(event),
            DeviceState::Idle => self.on_idle(event),
            DeviceState::Busy => self.on_busy(event, sched),
            DeviceState::Read => self.on_rw(OperationKind::Read, event, sched),
            DeviceState::Write => self.on_rw(OperationKind::Write, event, sched),
            DeviceState::Backstop => self.on_backstop(event, sched),
        }
    }

    fn enter(&mut self, level: DeviceState, sched: &mut impl Scheduler<N>) {
        match level {
            DeviceState::Disabled => {
                self.status = Status::Disabled;
                sched.publish_status(AoId::Device, self.status);
            }
            DeviceState::Starting => {
                self.retries.reset();
                sched.arm_timer(AoId::Device, TimerKind::Lockup, C::DEVICE_INIT_LOCKUP_TIME_MS);
                sched.self_post_device(DeviceAction::EnterIdle);
            }
            DeviceState::Error => {
                self.status = Status::FatalError;
                self.inflight = None;
                sched.publish_status(AoId::Device, self.status);
            }
            DeviceState::Enabled => {
                self.status = Status::Enabled;
                sched.publish_status(AoId::Device, self.status);
            }
            DeviceState::Idle => {
                self.retries.reset();
                self.inflight = None;
                self.transaction_id = 0;
            }
            DeviceState::Busy => {
                sched.arm_timer(AoId::Device, TimerKind::Busy, C::DEVICE_BUSY_TIME_MS);
            }
            DeviceState::Read | DeviceState::Write => {
                sched.arm_timer(AoId::Device, TimerKind::Lockup, C::LOCKUP_TIME_MS);
                sched.self_post_device(DeviceAction::StartRw);
            }
            DeviceState::Backstop => {}
        }
    }

    fn exit(&mut self, level: DeviceState, sched: &mut impl Scheduler<N>) {
        match level {
            DeviceState::Busy => sched.disarm_timer(AoId::Device, TimerKind::Busy),
            DeviceState::Read | DeviceState::Write => sched.disarm_timer(AoId::Device, TimerKind::Lockup),
            _ => {}
        }
    }

    fn on_backstop(&mut self, event: &DeviceEvent<N>, sched: &mut impl Scheduler<N>) -> Outcome<DeviceState> {
        match event {
            DeviceEvent::RequestStatus => {
                sched.publish_status(AoId::Device, self.status);
                Outcome::Handled
            }
            DeviceEvent::DebugLevel(level) => {
                self.debug_level = *level;
                Outcome::Handled
            }
            DeviceEvent::Disable | DeviceEvent::Stop => Outcome::Transition(DeviceState::Disabled),
            _ => {
                crate::log::hsm_debug!("device: dropping unhandled signal");
                Outcome::Handled
            }
        }
    }

    fn on_disabled(&mut self, event: &DeviceEvent<N>) -> Outcome<DeviceState> {
        match event {
            DeviceEvent::Enable => Outcome::Transition(DeviceState::Starting),
            DeviceEvent::Disable | DeviceEvent::Stop => Outcome::Handled,
            DeviceEvent::Read { .. } | DeviceEvent::Write { .. } => {
                crate::log::hsm_debug!("device: rejecting request while disabled, no reply");
                Outcome::Handled
            }
            _ => Outcome::Bubble,
        }
    }

    fn on_starting(&mut self, event: &DeviceEvent<N>, sched: &mut impl Scheduler<N>) -> Outcome<DeviceState> {
        match event {
            DeviceEvent::Action(DeviceAction::EnterIdle) => Outcome::Transition(DeviceState::Idle),
            DeviceEvent::Action(DeviceAction::Retry) => {
                sched.arm_timer(AoId::Device, TimerKind::Lockup, C::DEVICE_INIT_LOCKUP_TIME_MS);
                sched.self_post_device(DeviceAction::EnterIdle);
                Outcome::Handled
            }
            DeviceEvent::LockupTimeout => {
                if self.retries.try_retry() {
                    sched.self_post_device(DeviceAction::Retry);
                    Outcome::Handled
                } else {
                    self.last_error = Some(HsmError::I2cTimeout);
                    sched.publish_error(GenericError::new(HsmError::I2cTimeout, "device", Severity::Error));
                    Outcome::Transition(DeviceState::Error)
                }
            }
            DeviceEvent::Enable => Outcome::Handled,
            _ => Outcome::Bubble,
        }
    }

    fn on_error(&mut self, event: &DeviceEvent<N>) -> Outcome<DeviceState> {
        match event {
            DeviceEvent::Disable | DeviceEvent::Stop => Outcome::Transition(DeviceState::Disabled),
            DeviceEvent::Enable => Outcome::Transition(DeviceState::Starting),
            DeviceEvent::Read { .. } | DeviceEvent::Write { .. } => {
                crate::log::hsm_debug!("device: rejecting request in Error, no reply");
                Outcome::Handled
            }
            _ => Outcome::Bubble,
        }
    }

    fn on_enabled(&mut self, event: &DeviceEvent<N>) -> Outcome<DeviceState> {
        match event {
            DeviceEvent::Enable => Outcome::Handled,
            _ => Outcome::Bubble,
        }
    }

    fn on_idle(&mut self, event: &DeviceEvent<N>) -> Outcome<DeviceState> {
        match event {
            DeviceEvent::Read { requester, request_id, register, len } => {
                self.inflight = Some(Inflight {
                    op: OperationKind::Read,
                    requester: *requester,
                    request_id: *request_id,
                    register: *register,
                    write_data: None,
                    read_len: *len,
                });
                Outcome::Transition(DeviceState::Read)
            }
            DeviceEvent::Write { requester, request_id, register, data } => {
                self.inflight = Some(Inflight {
                    op: OperationKind::Write,
                    requester: *requester,
                    request_id: *request_id,
                    register: *register,
                    write_data: Some(data.clone()),
                    read_len: 0,
                });
                Outcome::Transition(DeviceState::Write)
            }
            _ => Outcome::Bubble,
        }
    }

    fn on_busy(&mut self, event: &DeviceEvent<N>, sched: &mut impl Scheduler<N>) -> Outcome<DeviceState> {
        match event {
            DeviceEvent::Read { requester, request_id, .. } => {
                sched.reply_to(*requester, *request_id, ClientReply::Error { op: OperationKind::Read, error: HsmError::Busy });
                Outcome::Handled
            }
            DeviceEvent::Write { requester, request_id, .. } => {
                sched.reply_to(*requester, *request_id, ClientReply::Error { op: OperationKind::Write, error: HsmError::Busy });
                Outcome::Handled
            }
            DeviceEvent::BusyTimeout => {
                if self.retries.try_retry() {
                    sched.self_post_device(DeviceAction::Retry);
                    Outcome::Handled
                } else {
                    self.fail_inflight(HsmError::I2cTimeout, sched);
                    Outcome::Transition(DeviceState::Idle)
                }
            }
            _ => Outcome::Bubble,
        }
    }

    fn on_rw(&mut self, op: OperationKind, event: &DeviceEvent<N>, sched: &mut impl Scheduler<N>) -> Outcome<DeviceState> {
        match event {
            DeviceEvent::Action(DeviceAction::StartRw) => {
                self.transaction_id = self.transaction_id.wrapping_add(1);
                if self.transaction_id == 0 {
                    self.transaction_id = 1;
                }
                if let Some(inflight) = &self.inflight {
                    let i2c_op = match op {
                        OperationKind::Read => I2cOp::Read { reg_addr: inflight.register, len: inflight.read_len },
                        OperationKind::Write => I2cOp::Write {
                            reg_addr: inflight.register,
                            data: inflight.write_data.clone().unwrap_or_default(),
                        },
                    };
                    sched.submit_i2c(I2cCommRequest {
                        id: self.transaction_id,
                        slave_addr: self.slave_address,
                        reg_addr_mode: RegAddrMode::EightBit,
                        op: i2c_op,
                    });
                }
                Outcome::Handled
            }
            DeviceEvent::Action(DeviceAction::Retry) => {
                sched.arm_timer(AoId::Device, TimerKind::Lockup, C::LOCKUP_TIME_MS);
                sched.self_post_device(DeviceAction::StartRw);
                Outcome::Handled
            }
            DeviceEvent::I2cComplete { id, buffer } => {
                if *id == self.transaction_id {
                    if let Some(inflight) = self.inflight.take() {
                        sched.reply_to(inflight.requester, inflight.request_id, ClientReply::Response { op, buffer: buffer.clone() });
                    }
                    Outcome::Transition(DeviceState::Idle)
                } else {
                    crate::log::hsm_warn!("device: stale I2C completion ignored");
                    sched.publish_error(GenericError::new(HsmError::MismatchRespId, "device", Severity::Warning));
                    Outcome::Handled
                }
            }
            DeviceEvent::I2cError { id, hal_code } => {
                if *id == self.transaction_id {
                    self.fail_inflight(HsmError::I2cError { hal_code: *hal_code }, sched);
                    Outcome::Transition(DeviceState::Error)
                } else {
                    crate::log::hsm_warn!("device: stale I2C error ignored");
                    sched.publish_error(GenericError::new(HsmError::MismatchRespId, "device", Severity::Warning));
                    Outcome::Handled
                }
            }
            DeviceEvent::LockupTimeout => {
                if self.retries.try_retry() {
                    sched.self_post_device(DeviceAction::Retry);
                    Outcome::Handled
                } else {
                    self.fail_inflight(HsmError::I2cTimeout, sched);
                    Outcome::Transition(DeviceState::Idle)
                }
            }
            _ => Outcome::Bubble,
        }
    }

    fn fail_inflight(&mut self, error: HsmError, sched: &mut impl Scheduler<N>) {
        self.last_error = Some(error);
        if let Some(inflight) = self.inflight.take() {
            sched.reply_to(inflight.requester, inflight.request_id, ClientReply::Error { op: inflight.op, error });
        }
        sched.publish_error(GenericError::new(error, "device", Severity::Error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultConfig;
    use crate::sim::FakeScheduler;

    type TestAo = DeviceAo<DefaultConfig, 8>;

    #[test]
    fn enable_reaches_idle() {
        let mut dev = TestAo::new(Config::new(0x20));
        let mut sched = FakeScheduler::<8>::new();
        dev.handle(DeviceEvent::Enable, &mut sched);
        dev.handle(DeviceEvent::Action(DeviceAction::EnterIdle), &mut sched);
        assert_eq!(dev.state(), DeviceState::Idle);
        assert_eq!(dev.status(), Status::Enabled);
    }

    #[test]
    fn happy_path_read_replies_to_requester() {
        let mut dev = TestAo::new(Config::new(0x20));
        let mut sched = FakeScheduler::<8>::new();
        dev.handle(DeviceEvent::Enable, &mut sched);
        dev.handle(DeviceEvent::Action(DeviceAction::EnterIdle), &mut sched);
        dev.handle(
            DeviceEvent::Read { requester: AoId::Api, request_id: 7, register: 0x10, len: 2 },
            &mut sched,
        );
        dev.handle(DeviceEvent::Action(DeviceAction::StartRw), &mut sched);
        assert_eq!(dev.state(), DeviceState::Read);
        let id = dev.transaction_id;
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&[0xAB, 0xCD]).unwrap();
        dev.handle(DeviceEvent::I2cComplete { id, buffer }, &mut sched);
        assert_eq!(dev.state(), DeviceState::Idle);
        assert_eq!(sched.replies.len(), 1);
    }

    #[test]
    fn stale_completion_is_ignored() {
        let mut dev = TestAo::new(Config::new(0x20));
        let mut sched = FakeScheduler::<8>::new();
        dev.handle(DeviceEvent::Enable, &mut sched);
        dev.handle(DeviceEvent::Action(DeviceAction::EnterIdle), &mut sched);
        dev.handle(
            DeviceEvent::Read { requester: AoId::Api, request_id: 1, register: 0x10, len: 2 },
            &mut sched,
        );
        dev.handle(DeviceEvent::Action(DeviceAction::StartRw), &mut sched);
        let stale_id = dev.transaction_id.wrapping_sub(1);
        dev.handle(DeviceEvent::I2cComplete { id: stale_id, buffer: Vec::new() }, &mut sched);
        assert_eq!(dev.state(), DeviceState::Read);
        assert!(sched.replies.is_empty());
        assert_eq!(sched.errors.len(), 1);
    }

    #[test]
    fn i2c_hard_error_moves_to_error_state() {
        let mut dev = TestAo::new(Config::new(0x20));
        let mut sched = FakeScheduler::<8>::new();
        dev.handle(DeviceEvent::Enable, &mut sched);
        dev.handle(DeviceEvent::Action(DeviceAction::EnterIdle), &mut sched);
        dev.handle(
            DeviceEvent::Write { requester: AoId::Api, request_id: 1, register: 0x01, data: Vec::new() },
            &mut sched,
        );
        dev.handle(DeviceEvent::Action(DeviceAction::StartRw), &mut sched);
        let id = dev.transaction_id;
        dev.handle(DeviceEvent::I2cError { id, hal_code: 0x7 }, &mut sched);
        assert_eq!(dev.state(), DeviceState::Error);
        assert_eq!(dev.status(), Status::FatalError);
        assert_eq!(sched.errors.len(), 1);
        assert_eq!(dev.last_error(), Some(HsmError::I2cError { hal_code: 0x7 }));
        assert_eq!(sched.replies.len(), 1);
    }

    #[test]
    fn retry_exhaustion_gives_up_and_returns_to_idle() {
        let mut dev = TestAo::new(Config::new(0x20));
        let mut sched = FakeScheduler::<8>::new();
        dev.handle(DeviceEvent::Enable, &mut sched);
        dev.handle(DeviceEvent::Action(DeviceAction::EnterIdle), &mut sched);
        dev.handle(
            DeviceEvent::Read { requester: AoId::Api, request_id: 9, register: 0x10, len: 1 },
            &mut sched,
        );
        dev.handle(DeviceEvent::Action(DeviceAction::StartRw), &mut sched);
        for _ in 0..DefaultConfig::I2C_ACTIVE_RETRIES {
            dev.handle(DeviceEvent::LockupTimeout, &mut sched);
            dev.handle(DeviceEvent::Action(DeviceAction::Retry), &mut sched);
        }
        dev.handle(DeviceEvent::LockupTimeout, &mut sched);
        assert_eq!(dev.state(), DeviceState::Idle);
        assert_eq!(sched.replies.len(), 1);
    }

    #[test]
    fn rw_retry_rearms_lockup_timer() {
        let mut dev = TestAo::new(Config::new(0x20));
        let mut sched = FakeScheduler::<8>::new();
        dev.handle(DeviceEvent::Enable, &mut sched);
        dev.handle(DeviceEvent::Action(DeviceAction::EnterIdle), &mut sched);
        dev.handle(
            DeviceEvent::Read { requester: AoId::Api, request_id: 9, register: 0x10, len: 1 },
            &mut sched,
        );
        dev.handle(DeviceEvent::Action(DeviceAction::StartRw), &mut sched);
        assert!(sched.is_armed(AoId::Device, TimerKind::Lockup));
        let arms_before = sched.arm_timer_calls.len();

        dev.handle(DeviceEvent::LockupTimeout, &mut sched);
        dev.handle(DeviceEvent::Action(DeviceAction::Retry), &mut sched);
        assert!(sched.is_armed(AoId::Device, TimerKind::Lockup), "retry must re-arm the lockup timer");
        assert_eq!(sched.arm_timer_calls.len(), arms_before + 1, "retry must issue a fresh arm_timer call, not rely on the original arm");
    }

    #[test]
    fn busy_rejects_concurrent_requests() {
        let mut dev = TestAo::new(Config::new(0x20));
        let mut sched = FakeScheduler::<8>::new();
        dev.handle(DeviceEvent::Enable, &mut sched);
        dev.handle(DeviceEvent::Action(DeviceAction::EnterIdle), &mut sched);
        dev.handle(
            DeviceEvent::Read { requester: AoId::Api, request_id: 1, register: 0x10, len: 1 },
            &mut sched,
        );
        dev.handle(DeviceEvent::Action(DeviceAction::StartRw), &mut sched);
        dev.handle(
            DeviceEvent::Write { requester: AoId::Api, request_id: 2, register: 0x11, data: Vec::new() },
            &mut sched,
        );
        assert_eq!(dev.state(), DeviceState::Read);
        assert_eq!(sched.replies.len(), 1);
    }

    #[test]
    fn disable_preempts_in_flight_transaction() {
        let mut dev = TestAo::new(Config::new(0x20));
        let mut sched = FakeScheduler::<8>::new();
        dev.handle(DeviceEvent::Enable, &mut sched);
        dev.handle(DeviceEvent::Action(DeviceAction::EnterIdle), &mut sched);
        dev.handle(
            DeviceEvent::Read { requester: AoId::Api, request_id: 1, register: 0x10, len: 1 },
            &mut sched,
        );
        dev.handle(DeviceEvent::Action(DeviceAction::StartRw), &mut sched);
        dev.handle(DeviceEvent::Disable, &mut sched);
        assert_eq!(dev.state(), DeviceState::Disabled);
        assert_eq!(dev.status(), Status::Disabled);
    }

    #[test]
    fn stop_preempts_in_flight_transaction_like_disable() {
        let mut dev = TestAo::new(Config::new(0x20));
        let mut sched = FakeScheduler::<8>::new();
        dev.handle(DeviceEvent::Enable, &mut sched);
        dev.handle(DeviceEvent::Action(DeviceAction::EnterIdle), &mut sched);
        dev.handle(
            DeviceEvent::Read { requester: AoId::Api, request_id: 1, register: 0x10, len: 1 },
            &mut sched,
        );
        dev.handle(DeviceEvent::Action(DeviceAction::StartRw), &mut sched);
        dev.handle(DeviceEvent::Stop, &mut sched);
        assert_eq!(dev.state(), DeviceState::Disabled);
        assert_eq!(dev.status(), Status::Disabled);
    }
}
