pub mod coin;
pub mod farm;
pub mod passport_mine;
pub mod passport_mine_legacy;
pub mod passport_mint;
pub mod passport_stake;
pub mod passport_token;
pub mod presale;

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::account::LocalAccount;
use crate::config::Config;
use crate::module_client::ModuleRef;
use crate::persist::ResourceStore;
use crate::rest::{RestClient, TransactionResult};

/// Comma-separated list of optional script steps to run, e.g. `deploy,stake`.
pub const STEPS_ENV: &str = "KEPLER_STEPS";

/// Optional steps enabled for this run. Scripts always run their default
/// sequence; these add the steps that are normally left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Steps(BTreeSet<String>);

impl Steps {
	pub fn parse(raw: &str) -> Self {
		Self(
			raw.split(',')
				.map(|s| s.trim().to_ascii_lowercase())
				.filter(|s| !s.is_empty())
				.collect(),
		)
	}

	pub fn from_env() -> Self {
		std::env::var(STEPS_ENV)
			.map(|raw| Self::parse(&raw))
			.unwrap_or_default()
	}

	pub fn enabled(&self, step: &str) -> bool {
		self.0.contains(step)
	}

	/// Warn about requested steps the running script does not have.
	pub fn check(&self, known: &[&str]) {
		for step in self.0.iter().filter(|s| !known.contains(&s.as_str())) {
			warn!(step = %step, known = ?known, env = STEPS_ENV, "unknown step requested, ignored");
		}
	}
}

/// Everything a script needs once its profile has been resolved.
pub struct ScriptContext {
	pub profile: String,
	pub config: Config,
	pub rest: RestClient,
	pub deployer: LocalAccount,
	pub store: ResourceStore,
	pub steps: Steps,
}

impl ScriptContext {
	pub fn load(profile: &str) -> Result<Self> {
		let config = Config::load().context("loading .aptos/config.yaml")?;
		Self::from_config(profile, config)
	}

	pub fn from_config(profile: &str, config: Config) -> Result<Self> {
		let url = config.rest_url(profile)?;
		let deployer = config.account(profile)?;
		let rest = RestClient::new(url.clone())?;
		info!(profile, node = %url, deployer = %deployer.address(), "loaded profile");
		Ok(Self {
			profile: profile.to_owned(),
			config,
			rest,
			deployer,
			store: ResourceStore::default(),
			steps: Steps::from_env(),
		})
	}

	/// Network name used for network-dependent settings and persisted records.
	pub fn network(&self) -> &str {
		&self.profile
	}

	/// Another named account from the same config, e.g. `bob` or `vault`.
	pub fn account(&self, name: &str) -> Result<LocalAccount> {
		self.config
			.account(name)
			.with_context(|| format!("account {name:?} is required by this script"))
	}

	/// `<deployer>::<name>`
	pub fn module(&self, name: &str) -> Result<ModuleRef> {
		Ok(ModuleRef::new(self.deployer.address(), name)?)
	}
}

/// Log the outcome of a step that may have been skipped as already done.
pub fn report(step: &str, result: &Option<TransactionResult>) {
	match result {
		Some(r) => info!(step, hash = %r.hash, success = r.success, vm_status = %r.vm_status, "submitted"),
		None => info!(step, "already done, skipped"),
	}
}
