//! Token endpoint protocol: request encoding and response decoding.
//!
//! Everything wire-shaped lives here so transports stay byte-oriented and the
//! refresh coordinator stays protocol-oriented.

// self
use crate::{
	_prelude::*,
	auth::{RawToken, ScopeSet},
	http::HttpReply,
};

/// Path of the token endpoint relative to the auth base URL.
pub const TOKEN_ENDPOINT_PATH: &str = "oauth2/token";

/// RFC 6749 §5.2/§7.2 error body returned by the token endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct OauthErrorBody {
	/// Machine-readable error code.
	pub error: String,
	/// Human-readable description; servers may omit it.
	#[serde(default)]
	pub error_description: String,
	/// Optional human-readable hint about how to fix the error.
	pub error_hint: Option<String>,
}

/// Resolves the token endpoint URL from the configured auth base URL.
pub fn token_endpoint(auth_base_url: &Url) -> Result<Url, url::ParseError> {
	let mut base = auth_base_url.clone();

	// `Url::join` drops the final path segment unless the base ends with a
	// slash, which would swallow part of a configured base path.
	if !base.path().ends_with('/') {
		base.set_path(&format!("{}/", base.path()));
	}

	base.join(TOKEN_ENDPOINT_PATH)
}

/// Builds the multipart form fields for a client-credentials exchange.
///
/// The `scope` field is present only when the requested scope set is
/// non-empty, joined by single spaces.
pub fn client_credentials_form(
	client_id: &str,
	client_secret: &str,
	scopes: &ScopeSet,
) -> Vec<(String, String)> {
	let mut form = vec![
		("grant_type".into(), "client_credentials".into()),
		("client_id".into(), client_id.into()),
		("client_secret".into(), client_secret.into()),
	];

	if !scopes.is_empty() {
		form.push(("scope".into(), scopes.normalized()));
	}

	form
}

/// Decodes a token endpoint reply into the wire token or the matching error.
///
/// A 2xx reply with a malformed body and a non-2xx reply without a structured
/// RFC 6749 error body both map to [`Error::Oauth`]; a structured error body
/// maps to [`Error::TokenExchange`] with its fields carried verbatim.
pub fn decode_token_reply(reply: HttpReply) -> Result<RawToken> {
	if (200..300).contains(&reply.status) {
		let de = &mut serde_json::Deserializer::from_slice(&reply.body);

		serde_path_to_error::deserialize(de)
			.map_err(|e| Error::oauth(format!("malformed token endpoint response: {e}")))
	} else {
		match serde_json::from_slice::<OauthErrorBody>(&reply.body) {
			Ok(body) => Err(Error::TokenExchange {
				error: body.error,
				error_description: body.error_description,
				error_hint: body.error_hint,
			}),
			Err(_) => Err(Error::oauth(format!(
				"token endpoint returned status {} without a structured error body",
				reply.status
			))),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn reply(status: u16, body: &str) -> HttpReply {
		HttpReply { status, body: body.as_bytes().to_vec() }
	}

	#[test]
	fn endpoint_resolution_preserves_base_paths() {
		let bare = Url::parse("https://auth.example.com").expect("Base URL should parse.");

		assert_eq!(
			token_endpoint(&bare).expect("Endpoint should resolve.").as_str(),
			"https://auth.example.com/oauth2/token",
		);

		let nested = Url::parse("https://example.com/tenants/42").expect("Base URL should parse.");

		assert_eq!(
			token_endpoint(&nested).expect("Endpoint should resolve.").as_str(),
			"https://example.com/tenants/42/oauth2/token",
		);
	}

	#[test]
	fn form_includes_scope_only_when_non_empty() {
		let scoped = ScopeSet::new(["write", "read"]).expect("Scope fixture should be valid.");
		let form = client_credentials_form("42", "s", &scoped);

		assert_eq!(form[0], ("grant_type".to_owned(), "client_credentials".to_owned()));
		assert_eq!(form[1], ("client_id".to_owned(), "42".to_owned()));
		assert_eq!(form[2], ("client_secret".to_owned(), "s".to_owned()));
		assert_eq!(form[3], ("scope".to_owned(), "read write".to_owned()));

		let unscoped = client_credentials_form("42", "s", &ScopeSet::default());

		assert_eq!(unscoped.len(), 3);
		assert!(unscoped.iter().all(|(name, _)| name != "scope"));
	}

	#[test]
	fn success_body_decodes_into_raw_token() {
		let raw = decode_token_reply(reply(
			200,
			"{\"access_token\":\"T1\",\"expires_in\":3600,\"scope\":\"read\",\"token_type\":\"Bearer\"}",
		))
		.expect("Well-formed success body should decode.");

		assert_eq!(raw.access_token, "T1");
		assert_eq!(raw.expires_in, 3_600);
		assert_eq!(raw.scope, "read");
		assert_eq!(raw.token_type, "Bearer");
	}

	#[test]
	fn missing_scope_field_defaults_to_empty() {
		let raw = decode_token_reply(reply(
			200,
			"{\"access_token\":\"T1\",\"expires_in\":60,\"token_type\":\"Bearer\"}",
		))
		.expect("Success body without scope should decode.");

		assert_eq!(raw.scope, "");
	}

	#[test]
	fn structured_error_body_carries_fields_verbatim() {
		let err = decode_token_reply(reply(
			400,
			"{\"error\":\"invalid_client\",\"error_description\":\"bad secret\"}",
		))
		.expect_err("Structured error bodies must surface as errors.");

		match err {
			Error::TokenExchange { error, error_description, error_hint } => {
				assert_eq!(error, "invalid_client");
				assert_eq!(error_description, "bad secret");
				assert_eq!(error_hint, None);
			},
			other => panic!("Expected a token exchange error, got {other:?}."),
		}
	}

	#[test]
	fn unstructured_failures_map_to_unknown_oauth_errors() {
		let non_json = decode_token_reply(reply(502, "<html>Bad Gateway</html>"))
			.expect_err("Non-JSON error bodies must surface as errors.");

		assert!(matches!(non_json, Error::Oauth { .. }));

		let malformed_success = decode_token_reply(reply(200, "{\"access_token\":42}"))
			.expect_err("Malformed success bodies must surface as errors.");

		assert!(matches!(&malformed_success, Error::Oauth { message } if message.contains("access_token")));
	}
}
