//! Simple file-backed [`TokenStore`] for lightweight deployments and bots.

// std
use std::{
	fs::{self, File},
	io::{self, ErrorKind, Write},
	path::PathBuf,
};
// self
use crate::{obs, store::TokenStore};

/// Default directory used when no store is configured.
pub const DEFAULT_STORE_PATH: &str = "reyah-m2m-storage";

/// Persists each key as its own file under a backing directory.
///
/// Writes go through a sibling temp file followed by a rename, so a crash
/// mid-write never leaves a half-written record behind. I/O failures after
/// construction are best-effort: they are logged through the observability
/// layer and the store behaves as if the key were absent.
#[derive(Clone, Debug)]
pub struct FileStore {
	dir: PathBuf,
}
impl FileStore {
	/// Opens a store rooted at the provided directory, creating it on demand.
	pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
		let dir = dir.into();

		fs::create_dir_all(&dir)?;

		Ok(Self { dir })
	}

	fn entry_path(&self, key: &str) -> PathBuf {
		self.dir.join(key)
	}

	fn write_entry(&self, key: &str, value: &str) -> io::Result<()> {
		let path = self.entry_path(key);
		let mut tmp_path = path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path)?;

			file.write_all(value.as_bytes())?;
			file.sync_all()?;
		}

		fs::rename(&tmp_path, &path)
	}
}
impl TokenStore for FileStore {
	fn get(&self, key: &str) -> Option<String> {
		fs::read_to_string(self.entry_path(key)).ok()
	}

	fn set(&self, key: &str, value: &str) {
		if let Err(error) = self.write_entry(key, value) {
			obs::record_store_failure("set", &error);
		}
	}

	fn remove(&self, key: &str) {
		if let Err(error) = fs::remove_file(self.entry_path(key))
			&& error.kind() != ErrorKind::NotFound
		{
			obs::record_store_failure("remove", &error);
		}
	}
}
