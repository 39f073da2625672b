//! Machine-to-machine authentication provider facade.
//!
//! [`M2mAuthProvider`] is the entry point consumed by an outer request
//! pipeline: it answers login-state queries and exposes the per-request hook
//! that refreshes the cached token when needed and writes the resulting
//! `Authorization` header. One provider instance serves exactly one
//! client-id/secret/scope-set tuple.

// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	clock::{Clock, SystemClock},
	error::BuildError,
	http::TokenHttpClient,
	oauth,
	refresh::{RefreshCoordinator, RefreshMetrics},
	state::TokenState,
	store::{FileStore, TokenStore, file::DEFAULT_STORE_PATH},
};

/// Name of the header written by [`M2mAuthProvider::apply_auth`].
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Stable label identifying this provider kind to the outer pipeline.
pub const PROVIDER_NAME: &str = "m2m-client-credentials";

/// Describes how to attach an `Authorization` header to an outbound request
/// without constraining the HTTP client type.
///
/// The trait is intentionally minimal so implementers can integrate with any
/// request builder (`reqwest`, a bespoke SDK, etc.) while keeping this crate
/// free of those dependencies on the signing side.
pub trait OutboundRequest {
	/// Sets the named header, replacing any previous value.
	fn set_header(&mut self, name: &str, value: &str);
}

/// Execution context of one outbound request attempt.
///
/// The outer pipeline records an authentication failure here before retrying
/// a request; the provider then refreshes the token even when the cached one
/// looks valid.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
	last_error: Option<Error>,
}
impl RequestContext {
	/// Creates a context with no recorded failures.
	pub fn new() -> Self {
		Self::default()
	}

	/// Records an authentication failure observed on a previous attempt of
	/// this request.
	pub fn record_auth_failure(&mut self, error: Error) {
		self.last_error = Some(error);
	}

	/// Returns the last recorded authentication failure, if any.
	pub fn last_auth_failure(&self) -> Option<&Error> {
		self.last_error.as_ref()
	}

	pub(crate) fn had_auth_failure(&self) -> bool {
		self.last_error.is_some()
	}
}

/// Authentication provider for machine-to-machine (client-credentials) use.
///
/// Cheap to clone; clones share the same token state and refresh coordinator,
/// so concurrent requests across clones still coalesce onto one exchange.
#[derive(Clone, Debug)]
pub struct M2mAuthProvider {
	coordinator: RefreshCoordinator,
}
impl M2mAuthProvider {
	/// Starts building a provider for the given credentials.
	///
	/// The token endpoint is derived from `auth_base_url` as
	/// `{auth_base_url}/oauth2/token`.
	pub fn builder(
		auth_base_url: Url,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> M2mAuthProviderBuilder {
		M2mAuthProviderBuilder {
			auth_base_url,
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			scopes: Vec::new(),
			store: None,
			http_client: None,
			clock: None,
		}
	}

	/// Guarantees the cached token is acceptable for the configured scopes,
	/// refreshing it if needed, then writes the `Authorization` header.
	///
	/// On refresh failure the error is propagated and the header is never
	/// silently omitted.
	pub async fn apply_auth<R>(&self, request: &mut R, ctx: &RequestContext) -> Result<()>
	where
		R: OutboundRequest + ?Sized,
	{
		self.ensure_fresh(ctx).await?;

		let token = self.coordinator.state.current().ok_or(Error::NotAuthenticated)?;

		request.set_header(AUTHORIZATION_HEADER, &token.authorization_value());

		Ok(())
	}

	/// Guarantees the cached token is acceptable for the configured scopes,
	/// running at most one network exchange per refresh episode.
	pub async fn ensure_fresh(&self, ctx: &RequestContext) -> Result<()> {
		self.coordinator.ensure_fresh(&self.coordinator.scopes, ctx).await
	}

	/// Returns `true` iff a cached token exists and has not expired. No I/O
	/// and no network call.
	pub fn is_logged_in(&self) -> bool {
		self.coordinator
			.state
			.current()
			.is_some_and(|token| !token.is_expired_at(self.coordinator.clock.now()))
	}

	/// Returns the expiry instant of the cached token.
	///
	/// Fails with [`Error::NotAuthenticated`] when no token has ever been
	/// cached.
	pub fn token_expiry(&self) -> Result<OffsetDateTime> {
		self.coordinator.state.current().map(|token| token.expires_at).ok_or(Error::NotAuthenticated)
	}

	/// This provider always supports silent renewal; no interactive re-auth
	/// is ever required.
	pub fn can_be_renewed(&self) -> bool {
		true
	}

	/// Returns the stable name of this provider kind.
	pub fn name(&self) -> &'static str {
		PROVIDER_NAME
	}

	/// Returns the refresh counters recorded by this provider.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.coordinator.metrics
	}
}

/// Validating builder returned by [`M2mAuthProvider::builder`].
#[derive(Clone)]
pub struct M2mAuthProviderBuilder {
	auth_base_url: Url,
	client_id: String,
	client_secret: String,
	scopes: Vec<String>,
	store: Option<Arc<dyn TokenStore>>,
	http_client: Option<Arc<dyn TokenHttpClient>>,
	clock: Option<Arc<dyn Clock>>,
}
impl M2mAuthProviderBuilder {
	/// Sets the scopes requested with every token (defaults to none).
	pub fn scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes = scopes.into_iter().map(Into::into).collect();

		self
	}

	/// Replaces the token store (defaults to a [`FileStore`] rooted at
	/// [`DEFAULT_STORE_PATH`]).
	pub fn store(mut self, store: Arc<dyn TokenStore>) -> Self {
		self.store = Some(store);

		self
	}

	/// Replaces the HTTP transport (defaults to the reqwest-backed client
	/// when the `reqwest` feature is enabled).
	pub fn http_client(mut self, http_client: Arc<dyn TokenHttpClient>) -> Self {
		self.http_client = Some(http_client);

		self
	}

	/// Replaces the clock used for expiry decisions (defaults to the system
	/// clock).
	pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = Some(clock);

		self
	}

	/// Validates the configuration and constructs the provider, loading any
	/// persisted token from the store.
	pub fn build(self) -> Result<M2mAuthProvider, BuildError> {
		let scopes = ScopeSet::new(self.scopes)?;
		let token_endpoint = oauth::token_endpoint(&self.auth_base_url)
			.map_err(|source| BuildError::InvalidBaseUrl { source })?;
		let store: Arc<dyn TokenStore> = match self.store {
			Some(store) => store,
			None => Arc::new(
				FileStore::open(DEFAULT_STORE_PATH)
					.map_err(|source| BuildError::StoreOpen { source })?,
			),
		};
		let http_client: Arc<dyn TokenHttpClient> = match self.http_client {
			Some(http_client) => http_client,
			#[cfg(feature = "reqwest")]
			None => Arc::new(crate::http::ReqwestHttpClient::default()),
			#[cfg(not(feature = "reqwest"))]
			None => return Err(BuildError::MissingHttpClient),
		};
		let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
		let state = TokenState::load(store);
		let coordinator = RefreshCoordinator::new(
			state,
			clock,
			http_client,
			token_endpoint,
			self.client_id,
			self.client_secret,
			scopes,
		);

		Ok(M2mAuthProvider { coordinator })
	}
}
impl Debug for M2mAuthProviderBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("M2mAuthProviderBuilder")
			.field("auth_base_url", &self.auth_base_url.as_str())
			.field("client_id", &self.client_id)
			.field("client_secret_set", &!self.client_secret.is_empty())
			.field("scopes", &self.scopes)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{
		clock::ManualClock,
		http::{HttpFuture, HttpReply},
		store::MemoryStore,
	};

	#[derive(Debug, Default)]
	struct RecordingRequest {
		headers: Vec<(String, String)>,
	}
	impl OutboundRequest for RecordingRequest {
		fn set_header(&mut self, name: &str, value: &str) {
			self.headers.push((name.to_owned(), value.to_owned()));
		}
	}

	struct StubHttpClient {
		calls: AtomicUsize,
		body: &'static str,
	}
	impl StubHttpClient {
		fn new(body: &'static str) -> Self {
			Self { calls: AtomicUsize::new(0), body }
		}
	}
	impl TokenHttpClient for StubHttpClient {
		fn post_token_request(&self, _: &Url, _: &[(String, String)]) -> HttpFuture<'_> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let reply = HttpReply { status: 200, body: self.body.as_bytes().to_vec() };

			Box::pin(async move { Ok(reply) })
		}
	}

	fn build_provider(clock: ManualClock) -> (M2mAuthProvider, Arc<StubHttpClient>) {
		let http = Arc::new(StubHttpClient::new(
			"{\"access_token\":\"T1\",\"expires_in\":3600,\"scope\":\"read\",\"token_type\":\"Bearer\"}",
		));
		let provider = M2mAuthProvider::builder(
			Url::parse("https://auth.example.com").expect("Base URL fixture should parse."),
			"42",
			"s",
		)
		.scopes(["read"])
		.store(Arc::new(MemoryStore::default()))
		.http_client(http.clone())
		.clock(Arc::new(clock))
		.build()
		.expect("Provider fixture should build.");

		(provider, http)
	}

	fn fixture_clock() -> ManualClock {
		ManualClock::starting_at(macros::datetime!(2025-01-01 00:00 UTC))
	}

	#[tokio::test]
	async fn apply_auth_writes_the_authorization_header() {
		let (provider, _http) = build_provider(fixture_clock());
		let mut request = RecordingRequest::default();

		provider
			.apply_auth(&mut request, &RequestContext::default())
			.await
			.expect("apply_auth should succeed against the stub endpoint.");

		assert_eq!(
			request.headers,
			vec![(AUTHORIZATION_HEADER.to_owned(), "Bearer T1".to_owned())],
		);
	}

	#[tokio::test]
	async fn login_state_follows_the_clock() {
		let clock = fixture_clock();
		let (provider, _http) = build_provider(clock.clone());

		assert!(!provider.is_logged_in(), "No token has been fetched yet.");

		provider
			.ensure_fresh(&RequestContext::default())
			.await
			.expect("Initial refresh should succeed.");

		assert!(provider.is_logged_in());

		clock.advance(Duration::hours(2));

		assert!(!provider.is_logged_in(), "An expired token does not count as logged in.");
	}

	#[tokio::test]
	async fn token_expiry_reports_not_authenticated_before_any_fetch() {
		let (provider, _http) = build_provider(fixture_clock());

		assert_eq!(
			provider.token_expiry().expect_err("Expiry requires a cached token."),
			Error::NotAuthenticated,
		);

		provider
			.ensure_fresh(&RequestContext::default())
			.await
			.expect("Initial refresh should succeed.");

		assert_eq!(
			provider.token_expiry().expect("Expiry should be known once a token is cached."),
			macros::datetime!(2025-01-01 01:00 UTC),
		);
	}

	#[test]
	fn provider_constants_are_stable() {
		let (provider, _http) = build_provider(fixture_clock());

		assert!(provider.can_be_renewed());
		assert_eq!(provider.name(), PROVIDER_NAME);
	}

	#[tokio::test]
	async fn a_persisted_token_survives_a_provider_restart() {
		let store: Arc<dyn TokenStore> = Arc::new(MemoryStore::default());
		let http = Arc::new(StubHttpClient::new(
			"{\"access_token\":\"T1\",\"expires_in\":3600,\"scope\":\"read\",\"token_type\":\"Bearer\"}",
		));
		let clock = fixture_clock();
		let build = |store: Arc<dyn TokenStore>, clock: ManualClock| {
			M2mAuthProvider::builder(
				Url::parse("https://auth.example.com").expect("Base URL fixture should parse."),
				"42",
				"s",
			)
			.scopes(["read"])
			.store(store)
			.http_client(http.clone())
			.clock(Arc::new(clock))
			.build()
			.expect("Provider fixture should build.")
		};
		let first = build(store.clone(), clock.clone());

		first
			.ensure_fresh(&RequestContext::default())
			.await
			.expect("Initial refresh should succeed.");
		drop(first);

		let second = build(store, clock);

		assert!(second.is_logged_in(), "The restarted provider should reuse the stored token.");
		assert_eq!(http.calls.load(Ordering::SeqCst), 1);

		let mut request = RecordingRequest::default();

		second
			.apply_auth(&mut request, &RequestContext::default())
			.await
			.expect("apply_auth should reuse the persisted token.");

		assert_eq!(http.calls.load(Ordering::SeqCst), 1, "No second exchange is needed.");
	}

	#[test]
	fn invalid_scopes_fail_the_build() {
		let result = M2mAuthProvider::builder(
			Url::parse("https://auth.example.com").expect("Base URL fixture should parse."),
			"42",
			"s",
		)
		.scopes(["has space"])
		.store(Arc::new(MemoryStore::default()))
		.build();

		assert!(matches!(result, Err(BuildError::InvalidScope(_))));
	}
}
