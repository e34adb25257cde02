// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Time point and time duration values with normalized second/nanosecond
//! split. Both keep the invariant `0 <= nanos < NANOS_IN_SEC` after every
//! operation, borrowing from the seconds field when the nanoseconds would
//! go negative.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Nanoseconds per second.
pub const NANOS_IN_SEC: i64 = 1_000_000_000;

/// Offset of the DTN epoch (2000-01-01T00:00:00Z) from the Unix epoch.
pub const DTN_EPOCH_UNIX_SECS: i64 = 946_684_800;

/// Signed time duration, normalized so `0 <= nanos() < 1e9`.
///
/// A negative duration carries a negative seconds field with a
/// non-negative nanoseconds remainder (e.g. -1.25 s is secs=-2, nanos=75e7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeDuration {
    secs: i64,
    nanos: u32,
}

impl TimeDuration {
    pub const ZERO: TimeDuration = TimeDuration { secs: 0, nanos: 0 };

    /// Build from a possibly denormalized second/nanosecond pair.
    pub fn new(secs: i64, nanos: i64) -> Self {
        let mut s = secs + nanos / NANOS_IN_SEC;
        let mut n = nanos % NANOS_IN_SEC;
        if n < 0 {
            s -= 1;
            n += NANOS_IN_SEC;
        }
        TimeDuration {
            secs: s,
            nanos: n as u32,
        }
    }

    pub fn from_secs(secs: i64) -> Self {
        TimeDuration { secs, nanos: 0 }
    }

    pub fn from_millis(ms: i64) -> Self {
        TimeDuration::new(ms / 1000, (ms % 1000) * 1_000_000)
    }

    pub fn from_micros(us: i64) -> Self {
        TimeDuration::new(us / 1_000_000, (us % 1_000_000) * 1000)
    }

    pub fn secs(&self) -> i64 {
        self.secs
    }

    pub fn nanos(&self) -> u32 {
        self.nanos
    }

    pub fn is_zero(&self) -> bool {
        self.secs == 0 && self.nanos == 0
    }

    pub fn is_negative(&self) -> bool {
        self.secs < 0
    }

    /// Total seconds as a float, for scalar arithmetic.
    pub fn as_secs_f64(&self) -> f64 {
        self.secs as f64 + f64::from(self.nanos) / NANOS_IN_SEC as f64
    }

    /// Build from fractional seconds. Returns `None` for non-finite input
    /// or magnitudes outside the representable range.
    pub fn try_from_secs_f64(secs: f64) -> Option<Self> {
        if !secs.is_finite() || secs.abs() >= i64::MAX as f64 {
            return None;
        }
        let whole = secs.floor();
        let frac = ((secs - whole) * NANOS_IN_SEC as f64).round() as i64;
        Some(TimeDuration::new(whole as i64, frac))
    }

    pub fn checked_add(&self, other: &TimeDuration) -> Option<TimeDuration> {
        let secs = self.secs.checked_add(other.secs)?;
        Some(TimeDuration::new(
            secs,
            i64::from(self.nanos) + i64::from(other.nanos),
        ))
    }

    pub fn checked_sub(&self, other: &TimeDuration) -> Option<TimeDuration> {
        let secs = self.secs.checked_sub(other.secs)?;
        Some(TimeDuration::new(
            secs,
            i64::from(self.nanos) - i64::from(other.nanos),
        ))
    }

    pub fn checked_neg(&self) -> Option<TimeDuration> {
        let secs = self.secs.checked_neg()?;
        Some(TimeDuration::new(secs, -i64::from(self.nanos)))
    }

    /// Multiply by a float scalar. Non-finite scalars yield `None`.
    pub fn checked_mul_f64(&self, scalar: f64) -> Option<TimeDuration> {
        if !scalar.is_finite() {
            return None;
        }
        TimeDuration::try_from_secs_f64(self.as_secs_f64() * scalar)
    }

    /// Divide by a float scalar. Zero or non-finite scalars yield `None`.
    pub fn checked_div_f64(&self, scalar: f64) -> Option<TimeDuration> {
        if !scalar.is_finite() || scalar == 0.0 {
            return None;
        }
        TimeDuration::try_from_secs_f64(self.as_secs_f64() / scalar)
    }

    /// Convert to a std `Duration`, clamping negatives to zero.
    pub fn to_std_clamped(&self) -> Duration {
        if self.secs < 0 {
            Duration::ZERO
        } else {
            Duration::new(self.secs as u64, self.nanos)
        }
    }
}

impl fmt::Display for TimeDuration {
    /// ISO 8601 duration form, e.g. `PT2.500S` or `-PT0.100S`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (sign, secs, nanos) = if self.secs < 0 && self.nanos > 0 {
            ("-", -(self.secs + 1), NANOS_IN_SEC as u32 - self.nanos)
        } else if self.secs < 0 {
            ("-", -self.secs, 0)
        } else {
            ("", self.secs, self.nanos)
        };
        if nanos == 0 {
            write!(f, "{}PT{}S", sign, secs)
        } else {
            let frac = format!("{:09}", nanos);
            write!(f, "{}PT{}.{}S", sign, secs, frac.trim_end_matches('0'))
        }
    }
}

impl TimeDuration {
    /// Parse a restricted ISO 8601 duration: `[-]PT<secs>[.<frac>]S`,
    /// optionally with `<n>H` and `<n>M` components.
    pub fn parse(text: &str) -> Option<Self> {
        let (neg, rest) = match text.strip_prefix('-') {
            Some(r) => (true, r),
            None => (false, text),
        };
        let rest = rest.strip_prefix("PT")?;
        let mut secs: i64 = 0;
        let mut nanos: i64 = 0;
        let mut num = String::new();
        for ch in rest.chars() {
            match ch {
                '0'..='9' | '.' => num.push(ch),
                'H' => {
                    secs += num.parse::<i64>().ok()?.checked_mul(3600)?;
                    num.clear();
                }
                'M' => {
                    secs += num.parse::<i64>().ok()?.checked_mul(60)?;
                    num.clear();
                }
                'S' => {
                    if let Some((whole, frac)) = num.split_once('.') {
                        secs += whole.parse::<i64>().ok()?;
                        let mut digits = frac.to_string();
                        while digits.len() < 9 {
                            digits.push('0');
                        }
                        nanos = digits[..9].parse::<i64>().ok()?;
                    } else {
                        secs += num.parse::<i64>().ok()?;
                    }
                    num.clear();
                }
                _ => return None,
            }
        }
        if !num.is_empty() {
            return None;
        }
        let td = TimeDuration::new(secs, nanos);
        if neg {
            td.checked_neg()
        } else {
            Some(td)
        }
    }
}

/// Absolute time point as an offset from the DTN epoch (2000-01-01T00:00:00Z),
/// normalized the same way as [`TimeDuration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimePoint {
    secs: i64,
    nanos: u32,
}

impl TimePoint {
    pub const EPOCH: TimePoint = TimePoint { secs: 0, nanos: 0 };

    pub fn new(secs: i64, nanos: i64) -> Self {
        let td = TimeDuration::new(secs, nanos);
        TimePoint {
            secs: td.secs,
            nanos: td.nanos,
        }
    }

    pub fn secs(&self) -> i64 {
        self.secs
    }

    pub fn nanos(&self) -> u32 {
        self.nanos
    }

    /// The current wall-clock instant.
    pub fn now() -> Self {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => TimePoint::new(
                d.as_secs() as i64 - DTN_EPOCH_UNIX_SECS,
                i64::from(d.subsec_nanos()),
            ),
            // clock before 1970 is not expected; saturate at the DTN epoch
            Err(_) => TimePoint::EPOCH,
        }
    }

    pub fn checked_add(&self, td: &TimeDuration) -> Option<TimePoint> {
        let secs = self.secs.checked_add(td.secs)?;
        Some(TimePoint::new(
            secs,
            i64::from(self.nanos) + i64::from(td.nanos),
        ))
    }

    pub fn checked_sub_td(&self, td: &TimeDuration) -> Option<TimePoint> {
        let secs = self.secs.checked_sub(td.secs)?;
        Some(TimePoint::new(
            secs,
            i64::from(self.nanos) - i64::from(td.nanos),
        ))
    }

    pub fn checked_sub(&self, other: &TimePoint) -> Option<TimeDuration> {
        let secs = self.secs.checked_sub(other.secs)?;
        Some(TimeDuration::new(
            secs,
            i64::from(self.nanos) - i64::from(other.nanos),
        ))
    }

    /// Duration from `earlier` to `self`, zero if `self` is not later.
    pub fn saturating_since(&self, earlier: &TimePoint) -> TimeDuration {
        match self.checked_sub(earlier) {
            Some(td) if !td.is_negative() => td,
            _ => TimeDuration::ZERO,
        }
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nanos == 0 {
            write!(f, "{}", self.secs)
        } else {
            let frac = format!("{:09}", self.nanos);
            write!(f, "{}.{}", self.secs, frac.trim_end_matches('0'))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_normalizes_nanos() {
        let td = TimeDuration::new(0, 2_500_000_000);
        assert_eq!(td.secs(), 2);
        assert_eq!(td.nanos(), 500_000_000);
    }

    #[test]
    fn test_duration_normalizes_negative_nanos() {
        let td = TimeDuration::new(1, -250_000_000);
        assert_eq!(td.secs(), 0);
        assert_eq!(td.nanos(), 750_000_000);
    }

    #[test]
    fn test_duration_sub_borrows() {
        let a = TimeDuration::from_millis(100);
        let b = TimeDuration::from_millis(250);
        let diff = a.checked_sub(&b).expect("sub should succeed");
        assert!(diff.is_negative());
        assert_eq!(diff.secs(), -1);
        assert_eq!(diff.nanos(), 850_000_000);
    }

    #[test]
    fn test_duration_display_roundtrip() {
        for ms in [0i64, 100, 1000, 2500, -100, -2500] {
            let td = TimeDuration::from_millis(ms);
            let text = td.to_string();
            let back = TimeDuration::parse(&text).expect("parse should succeed");
            assert_eq!(back, td, "roundtrip of {}", text);
        }
    }

    #[test]
    fn test_duration_parse_iso_components() {
        let td = TimeDuration::parse("PT1H2M3S").expect("parse should succeed");
        assert_eq!(td.secs(), 3723);
        let td = TimeDuration::parse("PT0.1S").expect("parse should succeed");
        assert_eq!(td.nanos(), 100_000_000);
    }

    #[test]
    fn test_duration_scalar_guards() {
        let td = TimeDuration::from_secs(10);
        assert!(td.checked_mul_f64(f64::NAN).is_none());
        assert!(td.checked_mul_f64(f64::INFINITY).is_none());
        assert!(td.checked_div_f64(0.0).is_none());
        let half = td.checked_div_f64(2.0).expect("div should succeed");
        assert_eq!(half.secs(), 5);
    }

    #[test]
    fn test_timepoint_arithmetic() {
        let tp = TimePoint::new(100, 0);
        let later = tp
            .checked_add(&TimeDuration::from_millis(1500))
            .expect("add should succeed");
        assert_eq!(later.secs(), 101);
        assert_eq!(later.nanos(), 500_000_000);

        let diff = later.checked_sub(&tp).expect("sub should succeed");
        assert_eq!(diff, TimeDuration::from_millis(1500));
    }
}
