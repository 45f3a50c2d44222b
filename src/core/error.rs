//! Error types
//!
//! Uses Rust's Result pattern for the recoverable conditions. Fatal
//! usage errors (re-linking timer storage that is already queued) are
//! asserts, not error values: the list pointers would be inconsistent
//! and there is no safe continuation.

/// Recoverable error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Error {
    /// A calibration run is already in flight
    CalActive = 1,
}

/// Result type alias for crate operations
pub type Result<T> = core::result::Result<T, Error>;
