//! Software timer scheduling for bare-metal targets
//!
//! A single hardware timer's worth of deferred-callback scheduling:
//! - Monotonic 32-bit tick base built from an 8-bit free-running counter
//! - Sorted intrusive queue of caller-owned timer events
//! - Compare-match driven dispatch with wraparound-safe tick arithmetic
//! - RC oscillator self-calibration against a trusted reference clock
//!
//! Hardware register access is injected behind capability traits so the
//! scheduling and calibration logic runs unmodified against a simulated
//! clock on the host.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

// ============ Critical Section ============

#[cfg(target_arch = "arm")]
mod cs_impl {
    use cortex_m::interrupt;
    use cortex_m::register::primask;
    use critical_section::{set_impl, Impl, RawRestoreState};

    struct SingleCoreCriticalSection;
    set_impl!(SingleCoreCriticalSection);

    unsafe impl Impl for SingleCoreCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            let was_active = primask::read().is_active();
            interrupt::disable();
            was_active
        }

        unsafe fn release(was_active: RawRestoreState) {
            if was_active {
                unsafe { interrupt::enable() }
            }
        }
    }
}

// ============ Modules ============

pub mod log;
mod lang_items;

pub mod core;
pub mod hal;

#[cfg(feature = "cal")]
pub mod cal;

// ============ Re-exports ============

pub use core::config;
pub use core::config::*;
pub use core::critical;
pub use core::error;
pub use core::error::Error;
pub use core::types;
pub use core::types::*;
pub use core::time;
pub use core::time::{tick_delta, tick_interval, TimeBase};
pub use core::timer;
pub use core::timer::{Dispatcher, Timer, TimerEvent, TimerHandleFn};

#[cfg(feature = "cal")]
pub use cal::{Calibrator, RcCal};
