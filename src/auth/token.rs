//! Wire-shape and cached-shape token models.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSecret},
};

/// Token as returned by the token endpoint, before the absolute expiry has
/// been stamped. Transient; consumed once by [`Token::issued`].
#[derive(Clone, Deserialize)]
pub struct RawToken {
	/// The access token value.
	pub access_token: String,
	/// Number of seconds before the token expires, relative to the fetch
	/// instant.
	pub expires_in: i64,
	/// Space-separated list of granted scopes. Servers may omit the field
	/// entirely, which reads as no scopes.
	#[serde(default)]
	pub scope: String,
	/// The type of the token, typically `Bearer`.
	pub token_type: String,
}
impl Debug for RawToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RawToken")
			.field("access_token", &"<redacted>")
			.field("expires_in", &self.expires_in)
			.field("scope", &self.scope)
			.field("token_type", &self.token_type)
			.finish()
	}
}

/// Token in its cached and persisted shape.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Absolute expiry instant, stamped once at fetch time.
	pub expires_at: OffsetDateTime,
	/// Normalized scopes granted to this token.
	pub scopes: ScopeSet,
	/// The type of the token, typically `Bearer`.
	pub token_type: String,
}
impl Token {
	/// Converts the wire shape into the cached shape.
	///
	/// `expires_at` is computed here as `fetched_at + expires_in` and never
	/// recomputed afterwards.
	pub fn issued(raw: RawToken, fetched_at: OffsetDateTime) -> Self {
		Self {
			access_token: TokenSecret::new(raw.access_token),
			expires_at: fetched_at + Duration::seconds(raw.expires_in),
			scopes: ScopeSet::parse_wire(&raw.scope),
			token_type: raw.token_type,
		}
	}

	/// Returns `true` once the expiry instant has been reached at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Formats the `Authorization` header value carried by outbound requests.
	pub fn authorization_value(&self) -> String {
		format!("{} {}", self.token_type, self.access_token.expose())
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("access_token", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.field("scopes", &self.scopes)
			.field("token_type", &self.token_type)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn raw(scope: &str) -> RawToken {
		RawToken {
			access_token: "T1".into(),
			expires_in: 3_600,
			scope: scope.into(),
			token_type: "Bearer".into(),
		}
	}

	#[test]
	fn issuing_stamps_absolute_expiry_once() {
		let fetched_at = macros::datetime!(2025-01-01 00:00 UTC);
		let token = Token::issued(raw("read write"), fetched_at);

		assert_eq!(token.expires_at, macros::datetime!(2025-01-01 01:00 UTC));
		assert_eq!(token.scopes.iter().collect::<Vec<_>>(), vec!["read", "write"]);
		assert!(!token.is_expired_at(macros::datetime!(2025-01-01 00:59 UTC)));
		assert!(token.is_expired_at(macros::datetime!(2025-01-01 01:00 UTC)));
	}

	#[test]
	fn empty_wire_scope_yields_empty_set() {
		let token = Token::issued(raw(""), macros::datetime!(2025-01-01 00:00 UTC));

		assert!(token.scopes.is_empty());
	}

	#[test]
	fn authorization_value_joins_type_and_secret() {
		let token = Token::issued(raw("read"), macros::datetime!(2025-01-01 00:00 UTC));

		assert_eq!(token.authorization_value(), "Bearer T1");
	}

	#[test]
	fn debug_output_redacts_the_secret() {
		let token = Token::issued(raw("read"), macros::datetime!(2025-01-01 00:00 UTC));
		let rendered = format!("{token:?}");

		assert!(rendered.contains("<redacted>"));
		assert!(!rendered.contains("T1"));
	}
}
