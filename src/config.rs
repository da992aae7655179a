use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::account::{self, KeyError, LocalAccount};
use crate::move_types::{AccountAddress, ParseError};

/// Overrides the REST endpoint of every profile when set.
pub const NODE_URL_ENV: &str = "APTOS_NODE_URL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("no config file found (looked in {0:?})")]
	NotFound(Vec<PathBuf>),
	#[error("failed to read {path}: {source}")]
	Read {
		path: PathBuf,
		source: std::io::Error,
	},
	#[error("invalid config yaml: {0}")]
	Yaml(#[from] serde_yaml::Error),
	#[error("profile {0:?} not found in config")]
	MissingProfile(String),
	#[error("profile {profile:?} has no private key")]
	MissingKey { profile: String },
	#[error("profile {profile:?}: {source}")]
	Key { profile: String, source: KeyError },
	#[error("profile {profile:?}: {source}")]
	Address { profile: String, source: ParseError },
	#[error("profile {profile:?} has an invalid rest_url: {source}")]
	Url { profile: String, source: url::ParseError },
}

/// The `.aptos/config.yaml` document written by the Aptos CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
	#[serde(default)]
	pub profiles: BTreeMap<String, Profile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
	#[serde(default)]
	pub rest_url: Option<String>,
	#[serde(default)]
	pub private_key: Option<String>,
	#[serde(default)]
	pub account: Option<String>,
	#[serde(default)]
	pub faucet_url: Option<String>,
}

impl Config {
	/// Relative location of the config inside a project or home directory.
	pub fn relative_path() -> PathBuf {
		Path::new(".aptos").join("config.yaml")
	}

	/// Candidate config files in lookup order: the working directory, then home.
	pub fn search_paths() -> Vec<PathBuf> {
		let mut paths = vec![Self::relative_path()];
		if let Some(home) = dirs::home_dir() {
			paths.push(home.join(Self::relative_path()));
		}
		paths
	}

	/// Load the first config file found on [`Config::search_paths`].
	pub fn load() -> Result<Self, ConfigError> {
		let paths = Self::search_paths();
		match paths.iter().find(|p| p.exists()) {
			Some(path) => Self::load_from(path),
			None => Err(ConfigError::NotFound(paths)),
		}
	}

	pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
		let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
			path: path.to_owned(),
			source,
		})?;
		Self::from_yaml_str(&content)
	}

	pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
		Ok(serde_yaml::from_str(content)?)
	}

	pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
		self.profiles
			.get(name)
			.ok_or_else(|| ConfigError::MissingProfile(name.to_owned()))
	}

	/// Signing account for the named profile.
	pub fn account(&self, name: &str) -> Result<LocalAccount, ConfigError> {
		self.profile(name)?.account(name)
	}

	/// REST endpoint for the named profile, honoring [`NODE_URL_ENV`].
	pub fn rest_url(&self, name: &str) -> Result<Url, ConfigError> {
		let env = std::env::var(NODE_URL_ENV).ok();
		self.profile(name)?.rest_url(name, env.as_deref())
	}
}

impl Profile {
	/// Build the account; an explicit `account` entry wins over the address
	/// derived from the key, since keys can be rotated.
	pub fn account(&self, profile: &str) -> Result<LocalAccount, ConfigError> {
		let key = self.private_key.as_deref().ok_or_else(|| ConfigError::MissingKey {
			profile: profile.to_owned(),
		})?;
		let key = account::parse_private_key(key).map_err(|source| ConfigError::Key {
			profile: profile.to_owned(),
			source,
		})?;
		match self.account.as_deref() {
			Some(address) => {
				let address: AccountAddress =
					address.parse().map_err(|source| ConfigError::Address {
						profile: profile.to_owned(),
						source,
					})?;
				Ok(LocalAccount::with_address(address, key))
			}
			None => Ok(LocalAccount::from_signing_key(key)),
		}
	}

	/// Versioned API base for this profile. A bare host, as the Aptos CLI
	/// writes it, gets the [`API_VERSION_PATH`] prefix; any other path is
	/// kept as given.
	pub fn rest_url(&self, profile: &str, override_url: Option<&str>) -> Result<Url, ConfigError> {
		let raw = override_url
			.or(self.rest_url.as_deref())
			.unwrap_or(DEVNET_REST_URL);
		let mut url: Url = raw.parse().map_err(|source| ConfigError::Url {
			profile: profile.to_owned(),
			source,
		})?;
		if matches!(url.path(), "" | "/") {
			url.set_path(API_VERSION_PATH);
		}
		Ok(url)
	}
}

pub const DEVNET_REST_URL: &str = "https://fullnode.devnet.aptoslabs.com";
pub const API_VERSION_PATH: &str = "/v1";

#[cfg(test)]
mod tests {
	use super::*;

	const YAML: &str = r#"
profiles:
  default:
    private_key: "0x05abd7c927e66846e537a4385fdc12064c8a14fb75068192b87c397f9b1936b5"
    public_key: "0xf5939323197c31b8f96c02e65a7334f1beba81a2110464bdbae305da10dd81fd"
    account: bb4ad45e2cda42e006e7215e88a65a1f38f06480c63a0dbe04422c6e486e58fa
    rest_url: "https://fullnode.devnet.aptoslabs.com"
    faucet_url: "https://faucet.devnet.aptoslabs.com"
  rotated:
    private_key: "0x05abd7c927e66846e537a4385fdc12064c8a14fb75068192b87c397f9b1936b5"
    account: "0xaa"
  keyless:
    account: "0xbb"
"#;

	#[test]
	fn profiles_parse() {
		let c = Config::from_yaml_str(YAML).unwrap();
		assert_eq!(c.profiles.len(), 3);
		let account = c.account("default").unwrap();
		assert_eq!(
			account.address().to_string(),
			"0xbb4ad45e2cda42e006e7215e88a65a1f38f06480c63a0dbe04422c6e486e58fa"
		);
	}

	#[test]
	fn explicit_account_wins_over_derived_address() {
		let c = Config::from_yaml_str(YAML).unwrap();
		let account = c.account("rotated").unwrap();
		assert_eq!(account.address(), "0xaa".parse().unwrap());
		assert!(account.signing_key().is_some());
	}

	#[test]
	fn missing_profile_and_key_are_errors() {
		let c = Config::from_yaml_str(YAML).unwrap();
		assert!(matches!(c.account("nobody"), Err(ConfigError::MissingProfile(_))));
		assert!(matches!(c.account("keyless"), Err(ConfigError::MissingKey { .. })));
	}

	#[test]
	fn rest_url_selection() {
		let c = Config::from_yaml_str(YAML).unwrap();
		let p = c.profile("default").unwrap();
		assert_eq!(
			p.rest_url("default", None).unwrap().as_str(),
			"https://fullnode.devnet.aptoslabs.com/v1"
		);
		assert_eq!(
			p.rest_url("default", Some("http://localhost:8080/v1")).unwrap().as_str(),
			"http://localhost:8080/v1"
		);
		// Profiles without a URL fall back to devnet.
		let p = c.profile("rotated").unwrap();
		assert_eq!(
			p.rest_url("rotated", None).unwrap().as_str(),
			"https://fullnode.devnet.aptoslabs.com/v1"
		);
		// Hosts gain the API prefix, explicit paths are kept.
		assert_eq!(
			p.rest_url("rotated", Some("http://127.0.0.1:8080/")).unwrap().as_str(),
			"http://127.0.0.1:8080/v1"
		);
		assert_eq!(
			p.rest_url("rotated", Some("https://node.example/api/v1/")).unwrap().as_str(),
			"https://node.example/api/v1/"
		);
	}

	#[test]
	fn load_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.yaml");
		std::fs::write(&path, YAML).unwrap();
		let c = Config::load_from(&path).unwrap();
		assert!(c.profiles.contains_key("keyless"));

		let missing = dir.path().join("nope.yaml");
		assert!(matches!(Config::load_from(&missing), Err(ConfigError::Read { .. })));
	}
}
