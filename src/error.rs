//! Provider-level error types shared across the refresh coordinator and stores.

// self
use crate::_prelude::*;

/// Provider-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by the provider's public APIs.
///
/// The four variants map one-to-one onto the failure classes callers must tell
/// apart programmatically; matching on message strings is never required. The
/// enum is [`Clone`] so a refresh outcome can be broadcast verbatim to every
/// caller coalesced onto the same in-flight exchange.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum Error {
	/// No token has ever been cached by this provider.
	///
	/// Raised only by status queries such as
	/// [`token_expiry`](crate::provider::M2mAuthProvider::token_expiry);
	/// [`apply_auth`](crate::provider::M2mAuthProvider::apply_auth) always
	/// attempts a refresh first and never reports this variant.
	#[error("Not authenticated: no access token has been issued yet.")]
	NotAuthenticated,
	/// The token endpoint rejected the exchange with a structured RFC 6749
	/// §5.2 error body. All fields are carried verbatim from the server.
	#[error("Token exchange rejected by the OAuth 2.0 server: {error}: {error_description}.")]
	TokenExchange {
		/// Machine-readable error code as defined in RFC 6749 §5.2/§7.2.
		error: String,
		/// Human-readable text with additional information about the error.
		error_description: String,
		/// Optional human-readable hint about how to fix the error.
		error_hint: Option<String>,
	},
	/// The exchange failed without a structured error body: transport failure,
	/// malformed response, or a non-JSON payload.
	#[error("Unexpected error while communicating with the OAuth 2.0 server: {message}.")]
	Oauth {
		/// Short description of the transport or decoding failure.
		message: String,
	},
	/// A waiter exceeded the bounded wait for an in-flight refresh.
	///
	/// Distinct from [`Error::TokenExchange`] and [`Error::Oauth`]: no server
	/// interaction produced this failure for the waiting caller, and the
	/// in-flight exchange keeps running regardless.
	#[error("Timed out waiting for the in-flight token refresh to complete.")]
	RefreshWaitTimeout,
}
impl Error {
	/// Builds an [`Error::Oauth`] from a short failure description.
	pub fn oauth(message: impl Into<String>) -> Self {
		Self::Oauth { message: message.into() }
	}

	/// Flattens a transport failure into a broadcastable [`Error::Oauth`].
	pub(crate) fn from_transport(err: TransportError) -> Self {
		let TransportError::Network { source } = &err;

		Self::oauth(format!("{err} {source}"))
	}
}

/// Transport-level failures reported by [`TokenHttpClient`](crate::http::TokenHttpClient)
/// implementations.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure (DNS, TCP, TLS, or a
	/// request that hit the fixed timeout).
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Validation failures raised while constructing a provider.
#[derive(Debug, ThisError)]
pub enum BuildError {
	/// Auth base URL cannot host the token endpoint path.
	#[error("Auth base URL cannot host the token endpoint.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Configured scopes failed normalization.
	#[error("Configured scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// The default file store could not be opened.
	#[error("Failed to open the token store directory.")]
	StoreOpen {
		/// Underlying filesystem failure.
		#[source]
		source: std::io::Error,
	},
	/// No HTTP client was configured and no default transport is available.
	#[error("No HTTP client was configured for the token endpoint.")]
	MissingHttpClient,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn variants_are_distinguishable_without_string_matching() {
		let exchange = Error::TokenExchange {
			error: "invalid_client".into(),
			error_description: "bad secret".into(),
			error_hint: None,
		};

		assert!(matches!(exchange, Error::TokenExchange { .. }));
		assert!(matches!(Error::oauth("boom"), Error::Oauth { .. }));
		assert!(matches!(Error::NotAuthenticated, Error::NotAuthenticated));
		assert!(matches!(Error::RefreshWaitTimeout, Error::RefreshWaitTimeout));
	}

	#[test]
	fn transport_failures_flatten_into_oauth_errors() {
		let transport = TransportError::network(std::io::Error::other("connection reset"));
		let err = Error::from_transport(transport);

		assert!(matches!(&err, Error::Oauth { message } if message.contains("connection reset")));

		let cloned = err.clone();

		assert_eq!(cloned, err);
	}
}
