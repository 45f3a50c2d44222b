//! Compile-time configuration
//!
//! These constants fix the tick geometry and the calibration acceptance
//! window. They mirror a 256-count hardware counter overflowing every
//! 8 seconds, with the oscillator under calibration expected to produce
//! 125000 counts per reference window.

use crate::types::Tick;

/// Width of the hardware free-running counter, in counts per overflow
pub const CFG_COUNTER_PERIOD: Tick = 0x100;

/// Tick rate of the time base in Hz (256 counts per 8 second overflow)
pub const CFG_TICKS_PER_SECOND: Tick = CFG_COUNTER_PERIOD / 8;

/// Minimum lead programmed into the compare register
///
/// Reprogramming the compare register itself consumes time; a target
/// closer than this could be missed and only fire a full counter lap
/// later.
pub const CFG_COMPARE_MIN_LEAD: u8 = 2;

/// Oscillator counts expected in one reference window when on frequency
pub const CFG_CAL_NOMINAL_TICKS: u32 = 125_000;

/// Acceptance half-window: +/-1% of nominal
pub const CFG_CAL_TOLERANCE_TICKS: u32 = CFG_CAL_NOMINAL_TICKS / 100;

/// Neighbor samples taken after the binary search bottoms out
pub const CFG_CAL_NEIGHBOR_SAMPLES: u8 = 5;

/// Reference ticks between `start()` and the bootstrap edge
pub const CFG_CAL_BOOTSTRAP_TICKS: u8 = 3;

/// Reference ticks added when re-arming for another measurement round
pub const CFG_CAL_REMEASURE_TICKS: u8 = 2;
