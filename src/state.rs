//! In-memory token state with write-through persistence.

// self
use crate::{
	_prelude::*,
	auth::{RawToken, Token},
	obs,
	store::{TOKEN_KEY, TokenStore},
};

/// Holds the deserialized token and keeps the backing store in sync.
///
/// Loaded once at construction and written through on every update. The value
/// is shared behind a read-write lock: the refresh coordinator is the single
/// writer, while any number of request paths read the last committed token.
pub struct TokenState {
	store: Arc<dyn TokenStore>,
	current: RwLock<Option<Token>>,
}
impl TokenState {
	/// Loads the state from the provided store.
	///
	/// A stored value that fails to decode is treated as "no cached token"
	/// and removed from the store, so a corrupt entry never fails
	/// construction and never triggers a second decode attempt on the next
	/// start.
	pub fn load(store: Arc<dyn TokenStore>) -> Self {
		let current = store.get(TOKEN_KEY).and_then(|blob| {
			match serde_json::from_str::<Token>(&blob) {
				Ok(token) => Some(token),
				Err(error) => {
					obs::record_discarded_token(&error);
					store.remove(TOKEN_KEY);

					None
				},
			}
		});

		Self { store, current: RwLock::new(current) }
	}

	/// Returns the in-memory token, if any. No I/O.
	pub fn current(&self) -> Option<Token> {
		self.current.read().clone()
	}

	/// Converts the wire token into the cached shape, writes it through to
	/// the store, and replaces the in-memory value. This is the only mutator.
	pub fn update(&self, raw: RawToken, now: OffsetDateTime) -> Token {
		let token = Token::issued(raw, now);

		match serde_json::to_string(&token) {
			Ok(blob) => self.store.set(TOKEN_KEY, &blob),
			Err(error) => obs::record_store_failure("encode", &error),
		}

		*self.current.write() = Some(token.clone());

		token
	}
}
impl Debug for TokenState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenState").field("current", &self.current.read()).finish()
	}
}
