//! Timestamp sources for validity intervals.
//!
//! Timestamps are truncated to microseconds so they survive a round trip
//! through fixed-width RFC 3339 columns unchanged.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, SubsecRound as _, TimeDelta, Utc};

/// The smallest step between two distinct timestamps.
pub fn tick() -> TimeDelta { TimeDelta::microseconds(1) }

/// A UTC wall-clock source.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// `Utc::now()` at microsecond precision.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }
}

/// Wraps a clock so successive readings strictly increase, even if the wall
/// clock stalls or steps backwards.
#[derive(Debug, Default)]
pub struct MonotonicClock<C = SystemClock> {
  inner: C,
  last:  Mutex<Option<DateTime<Utc>>>,
}

impl<C: Clock> MonotonicClock<C> {
  pub fn new(inner: C) -> Self { Self { inner, last: Mutex::new(None) } }
}

impl<C: Clock> Clock for MonotonicClock<C> {
  fn now(&self) -> DateTime<Utc> {
    let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
    let mut now = self.inner.now();
    if let Some(prev) = *last
      && now <= prev
    {
      now = prev + tick();
    }
    *last = Some(now);
    now
  }
}

/// A clock that only moves when told to. Useful for point-in-time tests.
#[derive(Debug)]
pub struct ManualClock {
  now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
  pub fn new(start: DateTime<Utc>) -> Self {
    Self { now: Mutex::new(start.trunc_subsecs(6)) }
  }

  pub fn set(&self, at: DateTime<Utc>) {
    *self.now.lock().unwrap_or_else(PoisonError::into_inner) = at.trunc_subsecs(6);
  }

  pub fn advance(&self, by: TimeDelta) {
    let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
    *now = (*now + by).trunc_subsecs(6);
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl<T: Clock + ?Sized> Clock for std::sync::Arc<T> {
  fn now(&self) -> DateTime<Utc> { (**self).now() }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn monotonic_clock_never_repeats() {
    let frozen = ManualClock::new(Utc.timestamp_opt(1_000, 0).unwrap());
    let clock = MonotonicClock::new(frozen);
    let a = clock.now();
    let b = clock.now();
    let c = clock.now();
    assert!(a < b && b < c);
    assert_eq!(b - a, tick());
  }

  #[test]
  fn monotonic_clock_ignores_backward_steps() {
    let manual = std::sync::Arc::new(ManualClock::new(Utc.timestamp_opt(1_000, 0).unwrap()));
    let clock = MonotonicClock::new(manual.clone());
    let first = clock.now();
    manual.set(Utc.timestamp_opt(10, 0).unwrap());
    assert!(clock.now() > first);
  }

  #[test]
  fn system_clock_is_microsecond_precise() {
    let now = SystemClock.now();
    assert_eq!(now.timestamp_subsec_nanos() % 1_000, 0);
  }
}
