//! Critical section handling
//!
//! The only mutual-exclusion primitive in the crate: disable interrupts,
//! perform a bounded read-modify-write sequence, restore the previous
//! interrupt-enable state. Foreground code and interrupt handlers share
//! every mutable structure through these sections, so nesting must
//! restore rather than unconditionally re-enable.

/// RAII guard for critical sections
///
/// Creating the guard disables interrupts; dropping it restores the
/// interrupt-enable state captured at entry.
pub struct CriticalSection {
    #[cfg_attr(not(target_arch = "arm"), allow(dead_code))]
    was_active: bool,
}

impl CriticalSection {
    /// Enter a critical section by disabling interrupts.
    ///
    /// Returns a guard that restores the prior interrupt state when
    /// dropped. Safe to nest.
    #[inline(always)]
    pub fn enter() -> Self {
        #[cfg(target_arch = "arm")]
        let was_active = {
            let active = cortex_m::register::primask::read().is_active();
            cortex_m::interrupt::disable();
            active
        };

        #[cfg(not(target_arch = "arm"))]
        let was_active = false;

        CriticalSection { was_active }
    }
}

impl Drop for CriticalSection {
    #[inline(always)]
    fn drop(&mut self) {
        #[cfg(target_arch = "arm")]
        {
            if self.was_active {
                unsafe { cortex_m::interrupt::enable() };
            }
        }
    }
}

/// Execute a closure with interrupts disabled
///
/// The closure receives a reference to the critical section guard,
/// which can be used to access [`CsCell`](crate::core::cs_cell::CsCell)
/// protected data.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&CriticalSection) -> R,
{
    let cs = CriticalSection::enter();
    f(&cs)
}
