//! Clock abstraction so expiry checks stay testable without real waits.

// self
use crate::_prelude::*;

/// Source of the current instant used for every expiry decision.
///
/// The provider takes the clock at construction, so tests can drive token
/// lifetimes with [`ManualClock`] instead of sleeping.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns the current instant.
	fn now(&self) -> OffsetDateTime;
}

/// Default wall-clock implementation.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Manually driven clock for tests and simulations.
#[derive(Clone, Debug)]
pub struct ManualClock(Arc<RwLock<OffsetDateTime>>);
impl ManualClock {
	/// Creates a clock frozen at the provided instant.
	pub fn starting_at(instant: OffsetDateTime) -> Self {
		Self(Arc::new(RwLock::new(instant)))
	}

	/// Moves the clock to an absolute instant.
	pub fn set(&self, instant: OffsetDateTime) {
		*self.0.write() = instant;
	}

	/// Advances the clock by the provided delta.
	pub fn advance(&self, delta: Duration) {
		let mut guard = self.0.write();

		*guard += delta;
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.0.read()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn manual_clock_moves_only_when_told() {
		let clock = ManualClock::starting_at(macros::datetime!(2025-06-01 12:00 UTC));

		assert_eq!(clock.now(), macros::datetime!(2025-06-01 12:00 UTC));

		clock.advance(Duration::minutes(30));

		assert_eq!(clock.now(), macros::datetime!(2025-06-01 12:30 UTC));

		clock.set(macros::datetime!(2025-06-02 00:00 UTC));

		assert_eq!(clock.now(), macros::datetime!(2025-06-02 00:00 UTC));
	}
}
