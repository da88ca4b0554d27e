//! A reusable two-layer hierarchical-state-machine template for an
//! I2C-attached peripheral on a constrained embedded system.
//!
//! Two active objects cooperate over injected [`scheduler::Scheduler`]
//! callbacks rather than any owned queue or timer:
//!
//! - [`device::DeviceAo`] owns the I2C transaction lifecycle for one slave
//!   address: arming retries, correlating completion/error replies against
//!   its current transaction id, and serializing one read or write at a
//!   time.
//! - [`api::ApiAo`] presents the enable/disable/status/read/write contract
//!   to clients, forwarding requests to the device AO and deferring new
//!   ones while a forwarded request is outstanding.
//!
//! Both AOs are built from the same small hierarchical-dispatch primitives
//! in [`hsm`], so a transition from a leaf state up through its superstates
//! runs exit/entry in the usual least-common-ancestor order. Everything
//! that would otherwise require a real I2C peripheral, OS timer or
//! interrupt-shared queue is abstracted behind [`scheduler::Scheduler`]
//! (with [`i2c_link`] describing the wire shape it carries), which the
//! `sim` test module implements with plain recorded calls.
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![doc = document_features::document_features!()]

pub mod api;
pub mod config;
pub mod device;
pub mod error;
pub mod hsm;
pub mod i2c_link;
pub mod ids;
pub mod retry;
pub mod scheduler;

mod log;

#[cfg(test)]
mod sim;

pub use api::{ApiAo, ApiEvent, ApiState};
pub use config::{Config, DefaultConfig, HsmConfig};
pub use device::{DeviceAo, DeviceEvent, DeviceState};
pub use error::{GenericError, HsmError, Severity};
pub use ids::{AoId, OperationKind, RequestId, Status, TimerKind, TransactionId};
pub use scheduler::{ClientReply, Scheduler};
