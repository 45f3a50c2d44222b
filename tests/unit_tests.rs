//! Unit tests for the timer scheduler and calibrator
//!
//! These run on the host against the simulated hardware backend: tests
//! step the simulated counters by hand and deliver the interrupts each
//! step reports, exactly as the vector table would on a real target.

use ticktimer::hal::sim::SimTimer;
use ticktimer::Timer;

/// Step the simulated counter `ticks` times, delivering interrupts
fn advance(timer: &Timer<SimTimer>, ticks: u32) {
    for _ in 0..ticks {
        let irq = timer.with_hw(|hw| hw.step());

        if irq.overflow {
            timer.on_overflow();
        }

        if irq.compare {
            timer.on_compare_match();
        }
    }
}

#[cfg(test)]
mod delta_tests {
    use ticktimer::{tick_delta, tick_interval, Tick};

    #[test]
    fn test_zero_delta() {
        for t in [0, 1, 0x8000_0000, Tick::MAX] {
            assert_eq!(tick_delta(t, t), 0);
        }
    }

    #[test]
    fn test_exact_recovery_across_wrap() {
        // true differences under 2^31 are recovered regardless of where
        // the readings sit on the circular axis
        for base in [0u32, 1000, Tick::MAX - 5, Tick::MAX] {
            for diff in [1u32, 2, 255, 256, 100_000, 0x7FFF_FFFF] {
                let deadline = base.wrapping_add(diff);
                assert_eq!(tick_delta(deadline, base), diff as i32);
                assert_eq!(tick_delta(base, deadline), -(diff as i32));
            }
        }
    }

    #[test]
    fn test_interval_between_readings() {
        let t1: Tick = Tick::MAX - 20;
        let t2 = t1.wrapping_add(300);
        assert_eq!(tick_interval(t1, t2), 300);
    }
}

#[cfg(test)]
mod timebase_tests {
    use super::advance;
    use ticktimer::hal::sim::SimTimer;
    use ticktimer::Timer;

    #[test]
    fn test_monotonic_across_overflow() {
        static TIMER: Timer<SimTimer> = Timer::new(SimTimer::new());

        assert!(!TIMER.is_running());
        TIMER.start();
        assert!(TIMER.is_running());
        assert_eq!(TIMER.now(), 0);

        advance(&TIMER, 255);
        assert_eq!(TIMER.now(), 255);

        advance(&TIMER, 1);
        assert_eq!(TIMER.now(), 256);

        advance(&TIMER, 600);
        assert_eq!(TIMER.now(), 856);
    }

    #[test]
    fn test_now_accounts_for_pending_overflow() {
        static TIMER: Timer<SimTimer> = Timer::new(SimTimer::new());

        TIMER.start();
        advance(&TIMER, 255);

        // counter wraps while the overflow interrupt is still pending
        TIMER.with_hw(|hw| {
            hw.count = 0;
            hw.overflow = true;
        });
        assert_eq!(TIMER.now(), 256);

        // reading must agree once the interrupt has been serviced
        TIMER.with_hw(|hw| hw.overflow = false);
        TIMER.on_overflow();
        assert_eq!(TIMER.now(), 256);
    }
}

#[cfg(test)]
mod scheduler_tests {
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Mutex;

    use super::advance;
    use ticktimer::hal::sim::SimTimer;
    use ticktimer::{Timer, TimerEvent};

    #[test]
    fn test_two_timers_fire_in_deadline_order() {
        static TIMER: Timer<SimTimer> = Timer::new(SimTimer::new());
        static ORDER: Mutex<Vec<u32>> = Mutex::new(Vec::new());

        fn fast(_: &mut TimerEvent) {
            ORDER.lock().unwrap().push(50);
        }

        fn slow(_: &mut TimerEvent) {
            ORDER.lock().unwrap().push(100);
        }

        TIMER.start();

        let mut a = TimerEvent::new();
        let mut b = TimerEvent::new();
        TIMER.set(&mut a, 50, fast);
        TIMER.set(&mut b, 100, slow);

        advance(&TIMER, 100);

        assert_eq!(*ORDER.lock().unwrap(), vec![50, 100]);

        // queue drained: nothing further fires
        advance(&TIMER, 600);
        assert_eq!(ORDER.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_fires_within_reprogram_slack() {
        static TIMER: Timer<SimTimer> = Timer::new(SimTimer::new());
        static FIRED_AT: AtomicU32 = AtomicU32::new(0);

        fn record(_: &mut TimerEvent) {
            FIRED_AT.store(TIMER.now(), Ordering::SeqCst);
        }

        TIMER.start();
        advance(&TIMER, 37);

        let t0 = TIMER.now();
        let mut ev = TimerEvent::new();
        TIMER.set(&mut ev, 10, record);

        advance(&TIMER, 20);

        let fired = FIRED_AT.load(Ordering::SeqCst);
        assert!(fired >= t0 + 10, "fired early: {} < {}", fired, t0 + 10);
        assert!(fired <= t0 + 12, "fired late: {} > {}", fired, t0 + 12);
    }

    #[test]
    fn test_interval_longer_than_counter_period() {
        static TIMER: Timer<SimTimer> = Timer::new(SimTimer::new());
        static FIRED_AT: AtomicU32 = AtomicU32::new(0);

        fn record(_: &mut TimerEvent) {
            FIRED_AT.store(TIMER.now(), Ordering::SeqCst);
        }

        TIMER.start();

        let mut ev = TimerEvent::new();
        TIMER.set(&mut ev, 300, record);

        advance(&TIMER, 305);

        let fired = FIRED_AT.load(Ordering::SeqCst);
        assert!((300..=302).contains(&fired), "fired at {}", fired);
    }

    #[test]
    fn test_cleared_timer_never_fires() {
        static TIMER: Timer<SimTimer> = Timer::new(SimTimer::new());
        static FIRED: AtomicBool = AtomicBool::new(false);

        fn mark(_: &mut TimerEvent) {
            FIRED.store(true, Ordering::SeqCst);
        }

        TIMER.start();

        let mut ev = TimerEvent::new();
        TIMER.set(&mut ev, 50, mark);

        advance(&TIMER, 30);
        TIMER.clear(&mut ev);
        advance(&TIMER, 100);

        assert!(!FIRED.load(Ordering::SeqCst));

        // clearing unlinked storage is a no-op
        TIMER.clear(&mut ev);
        assert!(!FIRED.load(Ordering::SeqCst));
    }

    #[test]
    #[should_panic(expected = "already linked")]
    fn test_double_set_is_fatal() {
        static TIMER: Timer<SimTimer> = Timer::new(SimTimer::new());

        fn noop(_: &mut TimerEvent) {}

        TIMER.start();

        let mut ev = TimerEvent::new();
        TIMER.set(&mut ev, 50, noop);
        TIMER.set(&mut ev, 60, noop);
    }

    #[test]
    fn test_handler_reregisters_own_storage() {
        static TIMER: Timer<SimTimer> = Timer::new(SimTimer::new());
        static COUNT: AtomicU32 = AtomicU32::new(0);

        fn periodic(ev: &mut TimerEvent) {
            // the dispatcher unlinks before invoking, so this does not
            // trip the double-link check
            if COUNT.fetch_add(1, Ordering::SeqCst) + 1 < 3 {
                TIMER.set(ev, 10, periodic);
            }
        }

        TIMER.start();

        let mut ev = TimerEvent::new();
        TIMER.set(&mut ev, 10, periodic);

        advance(&TIMER, 50);

        assert_eq!(COUNT.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_mixed_set_clear_fire_order() {
        static TIMER: Timer<SimTimer> = Timer::new(SimTimer::new());
        static ORDER: Mutex<Vec<u32>> = Mutex::new(Vec::new());

        fn record(_: &mut TimerEvent) {
            ORDER.lock().unwrap().push(TIMER.now());
        }

        TIMER.start();

        let mut a = TimerEvent::new();
        let mut b = TimerEvent::new();
        let mut c = TimerEvent::new();
        let mut d = TimerEvent::new();
        let mut e = TimerEvent::new();

        TIMER.set(&mut a, 40, record);
        TIMER.set(&mut b, 10, record);
        TIMER.set(&mut c, 25, record);
        TIMER.set(&mut d, 25, record);
        TIMER.set(&mut e, 70, record);
        TIMER.clear(&mut c);

        advance(&TIMER, 100);

        let order = ORDER.lock().unwrap();
        assert_eq!(*order, vec![10, 25, 40, 70]);
    }
}

#[cfg(feature = "cal")]
#[cfg(test)]
mod cal_tests {
    use ticktimer::hal::sim::SimCal;
    use ticktimer::{CalResult, Calibrator, Error};

    const FACTORY_TRIM: u8 = 93;

    /// Run a calibration against a model of the oscillator: `model`
    /// maps a trim value to the counts accumulated in one reference
    /// window. Returns the number of measurement windows taken.
    fn run_cal(cal: &Calibrator<SimCal>, model: fn(u8) -> u32, max_windows: u32) -> u32 {
        cal.start().unwrap();
        cal.on_ref_compare(); // bootstrap edge opens the first window

        let mut windows = 0;

        while cal.is_active() && windows < max_windows {
            let ticks = model(cal.with_hw(|hw| hw.trim));

            cal.with_hw(|hw| hw.osc_count = (ticks & 0xff) as u8);
            for _ in 0..(ticks >> 8) {
                cal.on_osc_overflow();
            }

            windows += 1;
            cal.on_ref_compare(); // close the window and evaluate

            if cal.is_active() {
                cal.on_ref_compare(); // open the next window
            }
        }

        windows
    }

    #[test]
    fn test_in_tolerance_passes_first_window() {
        static CAL: Calibrator<SimCal> = Calibrator::new(SimCal::new(FACTORY_TRIM));

        let windows = run_cal(&CAL, |_| 125_000, 20);

        assert_eq!(windows, 1);
        assert_eq!(CAL.result(), CalResult::Pass);
        assert_eq!(CAL.measurement(), 125_000);
        assert!(!CAL.is_active());
        assert!(!CAL.with_hw(|hw| hw.ref_irq_enabled));
    }

    #[test]
    fn test_half_speed_oscillator_fails_to_factory_trim() {
        static CAL: Calibrator<SimCal> = Calibrator::new(SimCal::new(FACTORY_TRIM));

        // 50% below nominal, immune to trim: binary search walks to the
        // top of the range, the neighbor scan exhausts, the run fails
        let windows = run_cal(&CAL, |_| 62_500, 40);

        assert!(windows <= 13, "took {} windows", windows);
        assert_eq!(CAL.result(), CalResult::Fail);
        assert_eq!(CAL.with_hw(|hw| hw.trim), FACTORY_TRIM);
        assert!(!CAL.is_active());
        assert!(!CAL.with_hw(|hw| hw.ref_irq_enabled));
    }

    #[test]
    fn test_binary_search_converges() {
        static CAL: Calibrator<SimCal> = Calibrator::new(SimCal::new(FACTORY_TRIM));

        // monotonic oscillator: in tolerance for trim 80..=87
        fn model(trim: u8) -> u32 {
            100_000 + 300 * trim as u32
        }

        let windows = run_cal(&CAL, model, 20);

        assert_eq!(CAL.result(), CalResult::Pass);
        assert_eq!(CAL.with_hw(|hw| hw.trim), 80);
        assert_eq!(CAL.measurement(), 124_000);
        assert_eq!(windows, 4);
    }

    #[test]
    fn test_compare_writes_wait_for_commit() {
        static CAL: Calibrator<SimCal> = Calibrator::new(SimCal::new(FACTORY_TRIM));

        run_cal(&CAL, |_| 62_500, 40);

        // every reference compare write crossed the domain behind the
        // commit barrier; none clobbered an unacknowledged write
        assert_eq!(CAL.with_hw(|hw| hw.lost_writes), 0);
        assert!(CAL.with_hw(|hw| hw.sync_calls) > 0);
    }

    #[test]
    fn test_measurement_compensates_pending_overflow() {
        static CAL: Calibrator<SimCal> = Calibrator::new(SimCal::new(FACTORY_TRIM));

        CAL.start().unwrap();
        CAL.on_ref_compare(); // open the window

        // 488 counter periods elapse; the last overflow is still
        // pending when the window closes
        for _ in 0..487 {
            CAL.on_osc_overflow();
        }
        CAL.with_hw(|hw| {
            hw.osc_count = 0;
            hw.osc_overflow = true;
        });

        CAL.on_ref_compare(); // close and evaluate

        assert_eq!(CAL.measurement(), 488 << 8);
        assert_eq!(CAL.result(), CalResult::Pass);
    }

    #[test]
    fn test_start_while_active_is_rejected() {
        static CAL: Calibrator<SimCal> = Calibrator::new(SimCal::new(FACTORY_TRIM));

        CAL.start().unwrap();
        assert!(CAL.is_active());
        assert_eq!(CAL.start(), Err(Error::CalActive));

        // the in-flight run is undisturbed
        assert!(CAL.is_active());
        assert_eq!(CAL.result(), CalResult::Na);
    }
}
