use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

pub const DEFAULT_PUBLISH_DIR: &str = "publish";

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
	#[error("failed to access {path}: {source}")]
	Io {
		path: PathBuf,
		source: std::io::Error,
	},
	#[error("{path} is not a json object: {source}")]
	Json {
		path: PathBuf,
		source: serde_json::Error,
	},
}

/// Deployment records, one `<network>.json` file per network, each mapping a
/// module key to whatever that module's script chose to remember.
#[derive(Debug, Clone)]
pub struct ResourceStore {
	dir: PathBuf,
}

impl Default for ResourceStore {
	fn default() -> Self {
		Self::new(DEFAULT_PUBLISH_DIR)
	}
}

impl ResourceStore {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	pub fn path(&self, network: &str) -> PathBuf {
		self.dir.join(format!("{network}.json"))
	}

	/// Whole document for `network`; a missing or blank file reads as `{}`.
	fn read_network(&self, network: &str) -> Result<Map<String, Value>, PersistError> {
		let path = self.path(network);
		let content = match std::fs::read_to_string(&path) {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
			Err(source) => return Err(PersistError::Io { path, source }),
		};
		if content.trim().is_empty() {
			return Ok(Map::new());
		}
		serde_json::from_str(&content).map_err(|source| PersistError::Json { path, source })
	}

	/// Record stored under `key`, or an empty object.
	pub fn read_module_resource(
		&self,
		network: &str,
		key: &str,
	) -> Result<Map<String, Value>, PersistError> {
		let mut doc = self.read_network(network)?;
		Ok(match doc.remove(key) {
			Some(Value::Object(record)) => record,
			_ => Map::new(),
		})
	}

	/// Replace the record under `key`, leaving other keys untouched.
	pub fn save_module_resource(
		&self,
		network: &str,
		key: &str,
		record: Map<String, Value>,
	) -> Result<(), PersistError> {
		let mut doc = self.read_network(network)?;
		doc.insert(key.to_owned(), Value::Object(record));

		let path = self.path(network);
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent).map_err(|source| PersistError::Io {
				path: parent.to_owned(),
				source,
			})?;
		}
		let bytes = to_pretty_json(&doc).map_err(|source| PersistError::Json {
			path: path.clone(),
			source,
		})?;
		std::fs::write(&path, bytes).map_err(|source| PersistError::Io {
			path: path.clone(),
			source,
		})?;
		debug!(path = %path.display(), key, "saved module resource");
		Ok(())
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}
}

/// Pretty JSON with a four-space indent.
fn to_pretty_json<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
	let mut out = Vec::new();
	let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
	let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
	value.serialize(&mut ser)?;
	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn object(v: Value) -> Map<String, Value> {
		match v {
			Value::Object(m) => m,
			_ => panic!("not an object"),
		}
	}

	#[test]
	fn missing_or_blank_file_reads_empty() {
		let dir = tempfile::tempdir().unwrap();
		let store = ResourceStore::new(dir.path().join("publish"));
		assert!(store.read_module_resource("devnet", "passport_mint").unwrap().is_empty());

		std::fs::create_dir_all(store.dir()).unwrap();
		std::fs::write(store.path("devnet"), "  \n").unwrap();
		assert!(store.read_module_resource("devnet", "passport_mint").unwrap().is_empty());
	}

	#[test]
	fn save_creates_dirs_and_keeps_other_keys() {
		let dir = tempfile::tempdir().unwrap();
		let store = ResourceStore::new(dir.path().join("nested").join("publish"));

		store
			.save_module_resource("testnet", "passport_mint", object(json!({ "a": 1 })))
			.unwrap();
		store
			.save_module_resource("testnet", "passport_stake", object(json!({ "b": 2 })))
			.unwrap();
		store
			.save_module_resource("testnet", "passport_mint", object(json!({ "a": 3 })))
			.unwrap();

		assert_eq!(
			Value::Object(store.read_module_resource("testnet", "passport_mint").unwrap()),
			json!({ "a": 3 })
		);
		assert_eq!(
			Value::Object(store.read_module_resource("testnet", "passport_stake").unwrap()),
			json!({ "b": 2 })
		);

		let raw = std::fs::read_to_string(store.path("testnet")).unwrap();
		assert!(raw.contains("\n    \"passport_mint\": {\n        \"a\": 3"));
	}

	#[test]
	fn corrupt_file_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let store = ResourceStore::new(dir.path());
		std::fs::write(store.path("devnet"), "[1, 2").unwrap();
		assert!(matches!(
			store.read_module_resource("devnet", "x"),
			Err(PersistError::Json { .. })
		));
	}
}
