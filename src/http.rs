//! Transport primitives for the token exchange.
//!
//! The module exposes [`TokenHttpClient`], the provider's only dependency on
//! an HTTP stack. Implementations POST a multipart form to the token endpoint
//! and hand back the raw status and body; protocol-level decoding lives in
//! [`oauth`](crate::oauth) so custom transports never re-implement it.

// std
use std::ops::Deref;
// self
use crate::{_prelude::*, error::TransportError};

/// Fixed timeout applied to every token endpoint request, independent of how
/// long waiters are willing to block on the in-flight refresh.
pub const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(20);

/// Boxed future returned by [`TokenHttpClient::post_token_request`].
pub type HttpFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpReply, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing the token exchange.
///
/// Callers provide an implementation behind `Arc<dyn TokenHttpClient>` at
/// construction; the refresh coordinator owns request encoding and response
/// decoding. Implementations must enforce [`REQUEST_TIMEOUT`] on each call
/// and should not follow redirects, matching OAuth 2.0 guidance that token
/// endpoints return results directly instead of delegating to another URI.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// POSTs the form (as multipart/form-data) to the token endpoint and
	/// returns the raw reply. Non-2xx statuses are not errors at this layer;
	/// only transport-level failures are.
	fn post_token_request(&self, endpoint: &Url, form: &[(String, String)]) -> HttpFuture<'_>;
}

/// Raw reply captured from the token endpoint for protocol-level decoding.
#[derive(Clone, Debug)]
pub struct HttpReply {
	/// HTTP status code returned by the token endpoint.
	pub status: u16,
	/// Raw response body bytes.
	pub body: Vec<u8>,
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	fn post_token_request(&self, endpoint: &Url, form: &[(String, String)]) -> HttpFuture<'_> {
		let client = self.0.clone();
		let endpoint = endpoint.clone();
		let fields = form.to_vec();

		Box::pin(async move {
			let mut multipart = reqwest::multipart::Form::new();

			for (name, value) in fields {
				multipart = multipart.text(name, value);
			}

			let response = client
				.post(endpoint)
				.multipart(multipart)
				.timeout(REQUEST_TIMEOUT)
				.send()
				.await
				.map_err(TransportError::from)?;
			let status = response.status().as_u16();
			let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

			Ok(HttpReply { status, body })
		})
	}
}
