//! Internal dual-logging facade (§10.1).
//!
//! Every dropped-unknown-signal, `MismatchRespId` warning and debug-level
//! rejection in the HSM core goes through these macros instead of a
//! hand-rolled `cfg_if!` at each call site. With the `defmt` feature enabled
//! they forward to `defmt`; with `log` they forward to the `log` crate;
//! with neither, they compile away to nothing (the common case for a final
//! release image that has decided it doesn't want either backend).

#[allow(unused_macros)]
macro_rules! hsm_trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "defmt")]
        ::defmt::trace!($($arg)*);
        #[cfg(all(feature = "log", not(feature = "defmt")))]
        ::log::trace!($($arg)*);
    };
}

#[allow(unused_macros)]
macro_rules! hsm_debug {
    ($($arg:tt)*) => {
        #[cfg(feature = "defmt")]
        ::defmt::debug!($($arg)*);
        #[cfg(all(feature = "log", not(feature = "defmt")))]
        ::log::debug!($($arg)*);
    };
}

#[allow(unused_macros)]
macro_rules! hsm_warn {
    ($($arg:tt)*) => {
        #[cfg(feature = "defmt")]
        ::defmt::warn!($($arg)*);
        #[cfg(all(feature = "log", not(feature = "defmt")))]
        ::log::warn!($($arg)*);
    };
}

#[allow(unused_macros)]
macro_rules! hsm_error {
    ($($arg:tt)*) => {
        #[cfg(feature = "defmt")]
        ::defmt::error!($($arg)*);
        #[cfg(all(feature = "log", not(feature = "defmt")))]
        ::log::error!($($arg)*);
    };
}

pub(crate) use hsm_debug;
pub(crate) use hsm_error;
pub(crate) use hsm_trace;
pub(crate) use hsm_warn;
