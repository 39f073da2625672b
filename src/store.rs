//! Storage contracts and built-in stores for the cached token record.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Well-known key under which the serialized token record lives.
pub const TOKEN_KEY: &str = "token";

/// Persistence contract for the cached token record.
///
/// Implementations provide last-write-wins semantics per key; the provider
/// never performs compound read-modify-write across two keys. Any conforming
/// implementation (file, OS keystore, in-memory map for tests) is
/// substitutable at construction. Stored values carry no schema version:
/// unreadable values are discarded by the caller, not migrated.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Returns the value stored under `key`, if present.
	fn get(&self, key: &str) -> Option<String>;

	/// Stores `value` under `key`, replacing any previous value.
	fn set(&self, key: &str, value: &str);

	/// Removes the value stored under `key`, if any.
	fn remove(&self, key: &str);
}
