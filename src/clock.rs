//! Injectable wall-clock, so `last_used` normalization is deterministic in tests.

use chrono::Utc;

pub trait Clock: std::fmt::Debug {
    fn now(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 { Utc::now().timestamp() }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> i64 { self.0 }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fixed_clock_is_fixed() {
        let clock = FixedClock(1_700_000_000);
        assert_eq!(1_700_000_000, clock.now());
        assert_eq!(clock.now(), clock.now());
    }
}
