//! Single-flight refresh coordination.
//!
//! The coordinator decides whether the cached token is acceptable for the
//! requested scope set and, when it is not, guarantees that exactly one
//! network exchange runs per refresh episode no matter how many callers
//! discover the stale token at the same instant. Concurrent callers subscribe
//! to the in-flight episode and receive its outcome verbatim; a caller that
//! exceeds the bounded wait fails locally without cancelling the exchange.

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::ops::Deref;
// crates.io
use tokio::sync::broadcast;
// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	clock::Clock,
	http::TokenHttpClient,
	oauth,
	obs::{self, RefreshEvent, RefreshSpan},
	provider::RequestContext,
	state::TokenState,
};

/// Bounded wait applied to callers coalesced onto an in-flight refresh. The
/// exchange itself is bounded separately by the transport's request timeout.
pub const REFRESH_WAIT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

const ABANDONED_EXCHANGE: &str = "the refresh task stopped without reporting an outcome";

/// Outcome broadcast to every caller of a refresh episode.
type RefreshOutcome = Result<()>;

/// Two-state flag serializing refresh episodes.
///
/// Holding the sender inside the `Refreshing` arm ties the subscription point
/// to the same lock that guards the flag, so a caller either subscribes
/// before the outcome broadcast or observes `Idle` and re-evaluates the
/// committed token state. A bare boolean could not express that.
enum RefreshPhase {
	Idle,
	Refreshing(broadcast::Sender<RefreshOutcome>),
}

/// Owns the token lifecycle for one client-id/secret/scope-set tuple.
///
/// Internally shared; clones coordinate against the same state, so the
/// single-flight guarantee spans every handle.
#[derive(Clone)]
pub(crate) struct RefreshCoordinator(Arc<CoordinatorInner>);

pub(crate) struct CoordinatorInner {
	pub(crate) state: TokenState,
	pub(crate) metrics: RefreshMetrics,
	pub(crate) clock: Arc<dyn Clock>,
	pub(crate) scopes: ScopeSet,
	http: Arc<dyn TokenHttpClient>,
	token_endpoint: Url,
	client_id: String,
	client_secret: String,
	phase: Mutex<RefreshPhase>,
}
impl RefreshCoordinator {
	pub(crate) fn new(
		state: TokenState,
		clock: Arc<dyn Clock>,
		http: Arc<dyn TokenHttpClient>,
		token_endpoint: Url,
		client_id: String,
		client_secret: String,
		scopes: ScopeSet,
	) -> Self {
		Self(Arc::new(CoordinatorInner {
			state,
			metrics: RefreshMetrics::default(),
			clock,
			scopes,
			http,
			token_endpoint,
			client_id,
			client_secret,
			phase: Mutex::new(RefreshPhase::Idle),
		}))
	}

	/// Guarantees the cached token is acceptable for `requested`, refreshing
	/// it through at most one network exchange per episode.
	pub(crate) async fn ensure_fresh(
		&self,
		requested: &ScopeSet,
		ctx: &RequestContext,
	) -> Result<()> {
		let span = RefreshSpan::new("ensure_fresh");

		span.instrument(self.ensure_fresh_inner(requested, ctx)).await
	}

	async fn ensure_fresh_inner(&self, requested: &ScopeSet, ctx: &RequestContext) -> Result<()> {
		if self.token_usable(requested, ctx) {
			self.metrics.record_reuse();
			obs::record_refresh_event(RefreshEvent::Reused);

			return Ok(());
		}

		enum Role {
			Initiator(broadcast::Receiver<RefreshOutcome>),
			Waiter(broadcast::Receiver<RefreshOutcome>),
		}

		let role = {
			let mut phase = self.phase.lock();

			// An episode that was in flight while this caller evaluated the
			// cache may have committed by now; look again under the lock.
			if self.token_usable(requested, ctx) {
				self.metrics.record_reuse();
				obs::record_refresh_event(RefreshEvent::Reused);

				return Ok(());
			}

			match &*phase {
				RefreshPhase::Refreshing(outcome_tx) => Role::Waiter(outcome_tx.subscribe()),
				RefreshPhase::Idle => {
					let (outcome_tx, outcome_rx) = broadcast::channel(1);

					*phase = RefreshPhase::Refreshing(outcome_tx.clone());

					self.metrics.record_attempt();
					obs::record_refresh_event(RefreshEvent::Attempt);
					self.spawn_exchange(outcome_tx);

					Role::Initiator(outcome_rx)
				},
			}
		};

		match role {
			Role::Initiator(mut outcome_rx) => match outcome_rx.recv().await {
				Ok(outcome) => outcome,
				Err(_) => Err(Error::oauth(ABANDONED_EXCHANGE)),
			},
			Role::Waiter(mut outcome_rx) => {
				self.metrics.record_coalesced();
				obs::record_refresh_event(RefreshEvent::Coalesced);

				match tokio::time::timeout(REFRESH_WAIT_TIMEOUT, outcome_rx.recv()).await {
					Ok(Ok(outcome)) => outcome,
					Ok(Err(_)) => Err(Error::oauth(ABANDONED_EXCHANGE)),
					Err(_) => Err(Error::RefreshWaitTimeout),
				}
			},
		}
	}

	/// Runs the exchange in a detached task: callers abandoning their wait
	/// never cancel it, and its result still reaches the token state and any
	/// remaining waiters.
	fn spawn_exchange(&self, outcome_tx: broadcast::Sender<RefreshOutcome>) {
		let this = Arc::clone(&self.0);

		tokio::spawn(async move {
			let outcome = this.execute_exchange().await;

			match &outcome {
				Ok(()) => {
					this.metrics.record_success();
					obs::record_refresh_event(RefreshEvent::Success);
				},
				Err(_) => {
					this.metrics.record_failure();
					obs::record_refresh_event(RefreshEvent::Failure);
				},
			}

			// The flag must read `Idle` before the outcome goes out, so a
			// caller arriving after the broadcast re-evaluates the committed
			// token state instead of subscribing to a finished episode.
			let mut phase = this.phase.lock();

			*phase = RefreshPhase::Idle;

			let _ = outcome_tx.send(outcome);
		});
	}
}
impl Deref for RefreshCoordinator {
	type Target = CoordinatorInner;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("token_endpoint", &self.token_endpoint.as_str())
			.field("client_id", &self.client_id)
			.field("scopes", &self.scopes)
			.finish()
	}
}
impl CoordinatorInner {
	/// Acceptance predicate: the cached token is usable iff it exists, has
	/// not expired, the request context carries no prior authentication
	/// failure, and its granted scopes equal the requested set exactly.
	fn token_usable(&self, requested: &ScopeSet, ctx: &RequestContext) -> bool {
		if ctx.had_auth_failure() {
			return false;
		}

		self.state.current().is_some_and(|token| {
			!token.is_expired_at(self.clock.now()) && token.scopes == *requested
		})
	}

	async fn execute_exchange(&self) -> Result<()> {
		let form =
			oauth::client_credentials_form(&self.client_id, &self.client_secret, &self.scopes);
		let reply = self
			.http
			.post_token_request(&self.token_endpoint, &form)
			.await
			.map_err(Error::from_transport)?;
		let raw = oauth::decode_token_reply(reply)?;

		self.state.update(raw, self.clock.now());

		Ok(())
	}
}
