//! Thread-safe in-memory [`TokenStore`] implementation for local development and tests.

// std
use std::collections::HashMap;
// self
use crate::{_prelude::*, store::TokenStore};

/// Thread-safe storage backend that keeps values in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<HashMap<String, String>>>);
impl TokenStore for MemoryStore {
	fn get(&self, key: &str) -> Option<String> {
		self.0.read().get(key).cloned()
	}

	fn set(&self, key: &str, value: &str) {
		self.0.write().insert(key.to_owned(), value.to_owned());
	}

	fn remove(&self, key: &str) {
		self.0.write().remove(key);
	}
}
