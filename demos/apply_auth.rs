//! Demonstrates fetching, caching, and attaching a client-credentials token
//! with the default reqwest transport and an in-memory store.

// std
use std::{error::Error as StdError, sync::Arc};
// crates.io
use httpmock::prelude::*;
// self
use oauth2_m2m::{
	provider::{M2mAuthProvider, OutboundRequest, RequestContext},
	store::MemoryStore,
	url::Url,
};

#[derive(Debug, Default)]
struct DemoRequest {
	headers: Vec<(String, String)>,
}
impl OutboundRequest for DemoRequest {
	fn set_header(&mut self, name: &str, value: &str) {
		self.headers.push((name.to_owned(), value.to_owned()));
	}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn StdError>> {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"expires_in\":900,\"scope\":\"email.read profile.read\",\"token_type\":\"Bearer\"}",
			);
		})
		.await;
	let provider =
		M2mAuthProvider::builder(Url::parse(&server.base_url())?, "demo-client", "super-secret")
			.scopes(["email.read", "profile.read"])
			.store(Arc::new(MemoryStore::default()))
			.build()?;
	let mut request = DemoRequest::default();

	provider.apply_auth(&mut request, &RequestContext::default()).await?;

	println!("Attached header: {}: {}.", request.headers[0].0, request.headers[0].1);
	println!("Logged in: {}. Expires at: {}.", provider.is_logged_in(), provider.token_expiry()?);

	token_mock.assert_async().await;

	Ok(())
}
