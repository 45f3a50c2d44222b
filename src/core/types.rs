//! Core type definitions

/// Tick counter type
///
/// Ticks live on a 32-bit circular time axis; the longest representable
/// interval is half the axis (2^31 ticks).
pub type Tick = u32;

/// Calibration result, polled by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CalResult {
    /// No completed run, or a run is still in flight
    Na = 0,
    /// Oscillator trimmed to within +/-1% of nominal
    Pass = 1,
    /// Trim range exhausted without reaching the window
    Fail = 2,
}

/// Calibration state machine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CalPhase {
    /// No run in flight; `CalResult` carries the last outcome
    Off = 0,
    /// Waiting for the bootstrap reference edge
    Start = 1,
    /// Waiting for the edge that opens a measurement window
    Setup = 2,
    /// Counting; next edge closes the window and evaluates it
    Handle = 3,
}
