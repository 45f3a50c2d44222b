//! RC oscillator calibration
//!
//! Counts the oscillator-under-test against windows of a trusted
//! reference clock, then binary-searches the trim register and finally
//! scans the nearest neighbors of the search result. A run either lands
//! the measured count within +/-1% of nominal (`Pass`) or restores the
//! factory trim (`Fail`).
//!
//! The reference counter lives in its own clock domain: every write to
//! its compare register is preceded by a commit barrier, because an
//! unacknowledged write is not yet visible on the reference side.

use crate::config::{
    CFG_CAL_BOOTSTRAP_TICKS, CFG_CAL_NEIGHBOR_SAMPLES, CFG_CAL_NOMINAL_TICKS,
    CFG_CAL_REMEASURE_TICKS, CFG_CAL_TOLERANCE_TICKS,
};
use crate::core::cs_cell::CsCell;
use crate::critical::critical_section;
use crate::error::{Error, Result};
use crate::hal::CalHw;
use crate::types::{CalPhase, CalResult};

/// Lowest acceptable measurement
#[inline]
fn min_ticks() -> u32 {
    CFG_CAL_NOMINAL_TICKS - CFG_CAL_TOLERANCE_TICKS
}

/// Highest acceptable measurement
#[inline]
fn max_ticks() -> u32 {
    CFG_CAL_NOMINAL_TICKS + CFG_CAL_TOLERANCE_TICKS
}

/// Calibration core: hardware capability plus run state
///
/// Methods take `&mut self` and expect to run inside a critical
/// section; [`Calibrator`] provides that wrapping.
pub struct RcCal<H: CalHw> {
    hw: H,
    phase: CalPhase,
    result: CalResult,
    /// Binary-search step, halved each measurement
    step_size: u8,
    /// Neighbor-scan index, 0..CFG_CAL_NEIGHBOR_SAMPLES
    ncount: u8,
    /// Measured-counter overflows in the open window
    ovf_count: u32,
    /// Last accumulated measurement
    measure: u32,
}

impl<H: CalHw> RcCal<H> {
    pub const fn new(hw: H) -> Self {
        RcCal {
            hw,
            phase: CalPhase::Off,
            result: CalResult::Na,
            step_size: 0,
            ncount: 0,
            ovf_count: 0,
            measure: 0,
        }
    }

    /// Begin a calibration run
    ///
    /// Arms the bootstrap reference edge a few ticks out so the first
    /// measurement window opens on a clean boundary. Rejects if a run
    /// is already in flight.
    pub fn start(&mut self) -> Result<()> {
        if self.phase != CalPhase::Off {
            return Err(Error::CalActive);
        }

        self.result = CalResult::Na;
        self.phase = CalPhase::Start;
        self.measure = 0;

        self.hw.ref_compare_sync();
        let count = self.hw.ref_count();
        self.hw.set_ref_compare(count.wrapping_add(CFG_CAL_BOOTSTRAP_TICKS));

        self.hw.ref_irq_clear();
        self.hw.ref_irq_enable();

        Ok(())
    }

    /// Is a run in flight?
    #[inline]
    pub fn is_active(&self) -> bool {
        self.phase != CalPhase::Off
    }

    /// Outcome of the last completed run
    #[inline]
    pub fn result(&self) -> CalResult {
        self.result
    }

    /// Last accumulated measurement
    #[inline]
    pub fn measurement(&self) -> u32 {
        self.measure
    }

    /// Measured-counter overflow interrupt entry
    #[inline]
    pub fn on_osc_overflow(&mut self) {
        self.ovf_count = self.ovf_count.wrapping_add(1);
    }

    /// Reference compare-match interrupt entry: drive the state machine
    ///
    /// The bootstrap edge initializes the search and falls through to
    /// opening the first window in the same invocation.
    pub fn on_ref_compare(&mut self) {
        if self.phase == CalPhase::Start {
            self.step_size = u8::MAX >> 1;
            self.hw.set_trim(self.step_size);
            self.ncount = 0;
            self.phase = CalPhase::Setup;
        }

        match self.phase {
            CalPhase::Setup => {
                self.hw.osc_zero();
                self.hw.osc_start();
                self.ovf_count = 0;

                self.phase = CalPhase::Handle;

                self.hw.ref_compare_sync();
                let compare = self.hw.ref_compare();
                self.hw.set_ref_compare(compare.wrapping_add(1));
            }

            CalPhase::Handle => {
                // halt the measured counter before reading it out
                self.hw.osc_stop();

                // capture the measurement, compensating for an overflow
                // that hit exactly at the window edge and has not been
                // serviced
                let mut measure = self.ovf_count << 8;
                measure = measure.wrapping_add(self.hw.osc_count() as u32);
                if self.hw.osc_overflow_pending() {
                    measure = measure.wrapping_add(0x100);
                }
                self.measure = measure;

                self.step_size >>= 1;

                if measure >= min_ticks() && measure <= max_ticks() {
                    self.result = CalResult::Pass;
                    self.phase = CalPhase::Off;
                    self.hw.ref_irq_disable();
                    crate::info!(
                        "calibration pass: trim={=u8} measure={=u32}",
                        self.hw.trim(),
                        measure
                    );
                } else if self.step_size > 0 || self.ncount < CFG_CAL_NEIGHBOR_SAMPLES {
                    if self.step_size > 0 {
                        let trim = self.hw.trim();

                        if measure < min_ticks() {
                            self.hw.set_trim(trim.wrapping_add(self.step_size));
                        } else {
                            self.hw.set_trim(trim.wrapping_sub(self.step_size));
                        }
                    } else {
                        // scan the nearest neighbors of the search
                        // result, re-testing it along the way
                        let trim = self.hw.trim();

                        if self.ncount == 0 {
                            let trim = if trim < 2 {
                                0
                            } else if trim > 253 {
                                250
                            } else {
                                trim - 2
                            };
                            self.hw.set_trim(trim);
                        } else {
                            self.hw.set_trim(trim.wrapping_add(1));
                        }

                        self.ncount += 1;
                    }

                    // measure again
                    self.hw.ref_compare_sync();
                    let compare = self.hw.ref_compare();
                    self.hw
                        .set_ref_compare(compare.wrapping_add(CFG_CAL_REMEASURE_TICKS));
                    self.phase = CalPhase::Setup;
                } else {
                    // neighbor scan exhausted: restore the factory trim
                    let factory = self.hw.factory_trim();
                    self.hw.set_trim(factory);

                    self.result = CalResult::Fail;
                    self.phase = CalPhase::Off;
                    self.hw.ref_irq_disable();
                    crate::warn!("calibration fail: factory trim {=u8} restored", factory);
                }
            }

            CalPhase::Off | CalPhase::Start => {}
        }
    }
}

/// Shareable calibrator instance
///
/// Owns an [`RcCal`] behind a [`CsCell`]; safe to place in a `static`
/// and touch from both foreground code and the two interrupt entry
/// points ([`on_ref_compare`](Calibrator::on_ref_compare),
/// [`on_osc_overflow`](Calibrator::on_osc_overflow)).
pub struct Calibrator<H: CalHw> {
    inner: CsCell<RcCal<H>>,
}

impl<H: CalHw> Calibrator<H> {
    /// Create a calibrator over a calibration hardware capability
    pub const fn new(hw: H) -> Self {
        Calibrator {
            inner: CsCell::new(RcCal::new(hw)),
        }
    }

    /// Start the calibration procedure
    ///
    /// Exactly one run may be in flight; starting while active is
    /// rejected with [`Error::CalActive`].
    pub fn start(&self) -> Result<()> {
        critical_section(|cs| self.inner.get(cs).start())
    }

    /// Is calibration in progress?
    pub fn is_active(&self) -> bool {
        critical_section(|cs| self.inner.get(cs).is_active())
    }

    /// Last calibration result
    pub fn result(&self) -> CalResult {
        critical_section(|cs| self.inner.get(cs).result())
    }

    /// Last accumulated measurement, read atomically
    pub fn measurement(&self) -> u32 {
        critical_section(|cs| self.inner.get(cs).measurement())
    }

    /// Reference compare-match interrupt entry point
    pub fn on_ref_compare(&self) {
        critical_section(|cs| self.inner.get(cs).on_ref_compare());
    }

    /// Measured-counter overflow interrupt entry point
    pub fn on_osc_overflow(&self) {
        critical_section(|cs| self.inner.get(cs).on_osc_overflow());
    }

    /// Access the hardware capability
    ///
    /// For platform glue and simulation; runs inside a critical section.
    pub fn with_hw<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut H) -> R,
    {
        critical_section(|cs| f(&mut self.inner.get(cs).hw))
    }
}
