//! Hardware capability traits
//!
//! The scheduler and calibrator never touch registers directly; the
//! platform hands them a capability implementing one of these traits.
//! Ownership is by value, so a second scheduler over the same counter
//! cannot be constructed without forging a second capability token.
//!
//! A simulated backend for host testing lives in [`sim`].

#[cfg(not(target_arch = "arm"))]
pub mod sim;

/// Free-running counter feeding the tick base and the timer dispatcher
///
/// The counter is 8 bits wide, wraps freely, raises an overflow
/// interrupt at each wrap and a compare-match interrupt when it reaches
/// the programmed compare value.
pub trait TickHw {
    /// Arm the counter: start it from zero and enable the overflow and
    /// compare-match interrupts.
    fn start(&mut self);

    /// Current counter value
    fn count(&self) -> u8;

    /// True while an overflow has occurred but its interrupt has not
    /// yet been serviced
    fn overflow_pending(&self) -> bool;

    /// Program the compare-match target
    fn set_compare(&mut self, value: u8);
}

/// Counters and trim register used by the calibrator
///
/// Two clock domains meet here: the trusted reference counter runs from
/// its own slow clock, the measured counter from the oscillator under
/// calibration. Writes to the reference compare register cross into the
/// reference domain and are only guaranteed visible there once
/// [`ref_compare_sync`](CalHw::ref_compare_sync) returns.
pub trait CalHw {
    /// Current reference counter value
    fn ref_count(&self) -> u8;

    /// Last value written to the reference compare register
    fn ref_compare(&self) -> u8;

    /// Program the reference compare target
    ///
    /// Call [`ref_compare_sync`](CalHw::ref_compare_sync) first; writing
    /// over an uncommitted value is lost in the reference domain.
    fn set_ref_compare(&mut self, value: u8);

    /// Commit barrier: return once any previous reference compare write
    /// has been acknowledged by the reference clock domain
    fn ref_compare_sync(&mut self);

    /// Enable the reference compare-match interrupt
    fn ref_irq_enable(&mut self);

    /// Disable the reference compare-match interrupt
    fn ref_irq_disable(&mut self);

    /// Clear a stale reference compare-match flag
    fn ref_irq_clear(&mut self);

    /// Start the measured counter and its overflow interrupt
    fn osc_start(&mut self);

    /// Halt the measured counter and mask its overflow interrupt
    fn osc_stop(&mut self);

    /// Zero the measured counter
    fn osc_zero(&mut self);

    /// Current measured counter value
    fn osc_count(&self) -> u8;

    /// True while a measured-counter overflow is pending and unserviced
    fn osc_overflow_pending(&self) -> bool;

    /// Current trim register value
    fn trim(&self) -> u8;

    /// Write the trim register
    fn set_trim(&mut self, value: u8);

    /// Factory-programmed trim value from read-only calibration storage
    fn factory_trim(&self) -> u8;
}
