//! Optional observability helpers for refresh episodes.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `oauth2_m2m.refresh` with a `stage` (call
//!   site) field, plus warnings for discarded store records.
//! - Enable `metrics` to increment the `oauth2_m2m_refresh_total` counter for every refresh
//!   lifecycle event, labeled by `event`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Refresh lifecycle events observed by the coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshEvent {
	/// A caller found the cached token acceptable and skipped the network.
	Reused,
	/// A new refresh episode started.
	Attempt,
	/// A caller piggy-backed on an episode started by a concurrent caller.
	Coalesced,
	/// An episode committed a fresh token.
	Success,
	/// An episode failed and the error was broadcast to its waiters.
	Failure,
}
impl RefreshEvent {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RefreshEvent::Reused => "reused",
			RefreshEvent::Attempt => "attempt",
			RefreshEvent::Coalesced => "coalesced",
			RefreshEvent::Success => "success",
			RefreshEvent::Failure => "failure",
		}
	}
}
impl Display for RefreshEvent {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
