// self
use crate::obs::RefreshEvent;

/// Records a refresh lifecycle event via the global metrics recorder (when enabled).
pub fn record_refresh_event(event: RefreshEvent) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("oauth2_m2m_refresh_total", "event" => event.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = event;
	}
}
