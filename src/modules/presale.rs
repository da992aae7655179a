//! veKEPL presale: buy locked tokens with a payment coin, claim KEPL later.

use serde::Deserialize;
use tracing::{debug, info};

use crate::account::LocalAccount;
use crate::module_client::{EntryCall, ModuleClient, ModuleRef};
use crate::move_types::{AccountAddress, MoveValue, TypeTag};
use crate::rest::types::number_or_string;
use crate::rest::{RestClient, Result, SignerCapability, TransactionResult};

/// Micro-units per APT, the granularity of every amount below.
pub const APT: u64 = 1_000_000;

/// Coin types the sale is parameterised over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresaleTypes {
	pub currency: TypeTag,
	pub vekepl: TypeTag,
	pub kepl: TypeTag,
}

/// Sale parameters, in on-chain argument order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresaleValues {
	pub base_price: u64,
	pub claim_start_time: u64,
	pub commission_rate: u64,
	pub fee_wallet: AccountAddress,
	pub sale_amount_per_round: u64,
	pub claim_interval: u64,
	pub min_buy_amount: u64,
	pub max_buy_amount: u64,
	pub referrer_min_buy_amount: u64,
}

impl PresaleValues {
	fn to_args(&self) -> Vec<MoveValue> {
		vec![
			MoveValue::U64(self.base_price),
			MoveValue::U64(self.claim_start_time),
			MoveValue::U64(self.commission_rate),
			MoveValue::Address(self.fee_wallet),
			MoveValue::U64(self.sale_amount_per_round),
			MoveValue::U64(self.claim_interval),
			MoveValue::U64(self.min_buy_amount),
			MoveValue::U64(self.max_buy_amount),
			MoveValue::U64(self.referrer_min_buy_amount),
		]
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresaleSettings {
	pub types: PresaleTypes,
	pub values: PresaleValues,
}

impl PresaleSettings {
	/// Mainnet parameters, or the short test schedule on any other network.
	pub fn for_network(network: &str, types: PresaleTypes, fee_wallet: AccountAddress) -> Self {
		let values = match network {
			"mainnet" => PresaleValues {
				base_price: APT / 10,
				claim_start_time: 1_664_553_599,
				commission_rate: 5,
				fee_wallet,
				sale_amount_per_round: 100_000 * APT,
				claim_interval: 30 * 24 * 3600,
				min_buy_amount: 2_000 * APT,
				max_buy_amount: 100_000 * APT,
				referrer_min_buy_amount: 10_000 * APT,
			},
			_ => PresaleValues {
				base_price: APT / 100_000,
				claim_start_time: 9_658_733_411,
				commission_rate: 5,
				fee_wallet,
				sale_amount_per_round: 10 * APT,
				claim_interval: 20,
				min_buy_amount: APT / 5,
				max_buy_amount: APT,
				referrer_min_buy_amount: APT,
			},
		};
		Self { types, values }
	}
}

/// `0x1::type_info::TypeInfo`; module and struct names arrive hex-encoded.
#[derive(Debug, Clone, Deserialize)]
pub struct TypeInfo {
	pub account_address: AccountAddress,
	pub module_name: String,
	pub struct_name: String,
}

impl TypeInfo {
	/// Decode into a struct type tag, `None` if the names are not valid hex/UTF-8.
	pub fn to_type_tag(&self) -> Option<TypeTag> {
		let module = decode_hex_utf8(&self.module_name)?;
		let name = decode_hex_utf8(&self.struct_name)?;
		format!("{}::{module}::{name}", self.account_address.to_short_string())
			.parse()
			.ok()
	}
}

fn decode_hex_utf8(s: &str) -> Option<String> {
	let bytes = hex::decode(s.trim_start_matches("0x")).ok()?;
	String::from_utf8(bytes).ok()
}

/// On-chain `ModuleStorage`.
#[derive(Debug, Clone, Deserialize)]
pub struct PresaleStorage {
	pub currency: TypeInfo,
	pub vekepl: TypeInfo,
	pub kepl: TypeInfo,
	#[serde(deserialize_with = "number_or_string")]
	pub base_price: u64,
	#[serde(deserialize_with = "number_or_string")]
	pub claim_start_time: u64,
	#[serde(deserialize_with = "number_or_string")]
	pub commission_rate: u64,
	pub fee_wallet: AccountAddress,
	#[serde(deserialize_with = "number_or_string")]
	pub sale_amount_per_round: u64,
	#[serde(deserialize_with = "number_or_string")]
	pub claim_interval: u64,
	#[serde(deserialize_with = "number_or_string")]
	pub min_buy_amount: u64,
	#[serde(deserialize_with = "number_or_string")]
	pub max_buy_amount: u64,
	#[serde(rename = "refeerer_min_buy_amount", deserialize_with = "number_or_string")]
	pub referrer_min_buy_amount: u64,
	pub signer_capability: Option<SignerCapability>,
}

impl PresaleStorage {
	pub fn values(&self) -> PresaleValues {
		PresaleValues {
			base_price: self.base_price,
			claim_start_time: self.claim_start_time,
			commission_rate: self.commission_rate,
			fee_wallet: self.fee_wallet,
			sale_amount_per_round: self.sale_amount_per_round,
			claim_interval: self.claim_interval,
			min_buy_amount: self.min_buy_amount,
			max_buy_amount: self.max_buy_amount,
			referrer_min_buy_amount: self.referrer_min_buy_amount,
		}
	}
}

/// True when any coin type or value stored on chain differs from `desired`.
pub fn needs_update(storage: &PresaleStorage, desired: &PresaleSettings) -> bool {
	let types = [
		(&storage.currency, &desired.types.currency),
		(&storage.vekepl, &desired.types.vekepl),
		(&storage.kepl, &desired.types.kepl),
	];
	if types
		.iter()
		.any(|(on_chain, want)| on_chain.to_type_tag().as_ref() != Some(*want))
	{
		return true;
	}
	storage.values() != desired.values
}

#[derive(Debug, Clone)]
pub enum PresaleCall {
	Initialize {
		settings: PresaleSettings,
		seed: u64,
	},
	UpdateConfig {
		settings: PresaleSettings,
	},
	BuyVekepl {
		currency: TypeTag,
		vekepl: TypeTag,
		payment: u64,
		lock_periods: u64,
		referrer: AccountAddress,
	},
	ClaimKepl {
		vekepl: TypeTag,
		kepl: TypeTag,
	},
}

impl EntryCall for PresaleCall {
	fn function(&self) -> &'static str {
		match self {
			Self::Initialize { .. } => "initialize",
			Self::UpdateConfig { .. } => "update_config",
			Self::BuyVekepl { .. } => "buy_vekepl",
			Self::ClaimKepl { .. } => "claim_kepl",
		}
	}

	fn type_args(&self) -> Vec<TypeTag> {
		match self {
			Self::Initialize { settings, .. } | Self::UpdateConfig { settings } => vec![
				settings.types.currency.clone(),
				settings.types.vekepl.clone(),
				settings.types.kepl.clone(),
			],
			Self::BuyVekepl {
				currency, vekepl, ..
			} => vec![currency.clone(), vekepl.clone()],
			Self::ClaimKepl { vekepl, kepl } => vec![vekepl.clone(), kepl.clone()],
		}
	}

	fn args(&self) -> Vec<MoveValue> {
		match self {
			Self::Initialize { settings, seed } => {
				let mut args = settings.values.to_args();
				args.push(MoveValue::U64(*seed));
				args
			}
			Self::UpdateConfig { settings } => settings.values.to_args(),
			Self::BuyVekepl {
				payment,
				lock_periods,
				referrer,
				..
			} => vec![
				MoveValue::U64(*payment),
				MoveValue::U64(*lock_periods),
				MoveValue::Address(*referrer),
			],
			Self::ClaimKepl { .. } => vec![],
		}
	}
}

pub struct PresaleClient<'a> {
	module: ModuleClient<'a>,
	settings: PresaleSettings,
}

impl<'a> PresaleClient<'a> {
	pub fn new(rest: &'a RestClient, module: ModuleRef, settings: PresaleSettings) -> Self {
		Self {
			module: ModuleClient::new(rest, module),
			settings,
		}
	}

	pub fn settings(&self) -> &PresaleSettings {
		&self.settings
	}

	pub fn module(&self) -> &ModuleClient<'a> {
		&self.module
	}

	pub async fn module_storage(&self) -> Result<Option<PresaleStorage>> {
		self.module
			.query_module_resource_as(self.module.deployer(), "ModuleStorage")
			.await
	}

	pub async fn is_initialized(&self) -> Result<bool> {
		Ok(self
			.module
			.query_module_resource(self.module.deployer(), "ModuleStorage")
			.await?
			.is_some())
	}

	/// Initialize the sale unless `ModuleStorage` exists. The resource signer
	/// seed is the current time in milliseconds.
	pub async fn initialize(&self, deployer: &LocalAccount) -> Result<Option<TransactionResult>> {
		if self.is_initialized().await? {
			return Ok(None);
		}
		let call = PresaleCall::Initialize {
			settings: self.settings.clone(),
			seed: chrono::Utc::now().timestamp_millis().max(0) as u64,
		};
		info!(values = ?self.settings.values, "initializing presale");
		self.module.execute(deployer, &call).await.map(Some)
	}

	/// Push the configured settings when they differ from what is on chain.
	pub async fn update_config(&self, deployer: &LocalAccount) -> Result<Option<TransactionResult>> {
		match self.module_storage().await? {
			Some(storage) if !needs_update(&storage, &self.settings) => {
				debug!("presale config up to date");
				return Ok(None);
			}
			_ => {}
		}
		let call = PresaleCall::UpdateConfig {
			settings: self.settings.clone(),
		};
		info!(values = ?self.settings.values, "updating presale config");
		self.module.execute(deployer, &call).await.map(Some)
	}

	pub async fn buy_vekepl(
		&self,
		user: &LocalAccount,
		payment: u64,
		lock_periods: u64,
		referrer: AccountAddress,
	) -> Result<TransactionResult> {
		let call = PresaleCall::BuyVekepl {
			currency: self.settings.types.currency.clone(),
			vekepl: self.settings.types.vekepl.clone(),
			payment,
			lock_periods,
			referrer,
		};
		self.module.execute(user, &call).await
	}

	pub async fn claim_kepl(&self, user: &LocalAccount) -> Result<TransactionResult> {
		let call = PresaleCall::ClaimKepl {
			vekepl: self.settings.types.vekepl.clone(),
			kepl: self.settings.types.kepl.clone(),
		};
		self.module.execute(user, &call).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::rest::tests::{fast_client, mock_chain_state, mock_submissions, TEST_KEY};
	use crate::transaction::TransactionPayload;
	use httpmock::prelude::*;
	use serde_json::{json, Value};

	fn types() -> PresaleTypes {
		PresaleTypes {
			currency: "0x1::aptos_coin::AptosCoin".parse().unwrap(),
			vekepl: "0xcafe::VeKEPL::T".parse().unwrap(),
			kepl: "0xcafe::KEPL::T".parse().unwrap(),
		}
	}

	fn vault() -> AccountAddress {
		"0xbeef".parse().unwrap()
	}

	fn type_info(module: &str, name: &str, address: &str) -> Value {
		json!({
			"account_address": address,
			"module_name": format!("0x{}", hex::encode(module)),
			"struct_name": format!("0x{}", hex::encode(name)),
		})
	}

	fn storage_json(settings: &PresaleSettings) -> Value {
		let v = &settings.values;
		json!({
			"currency": type_info("aptos_coin", "AptosCoin", "0x1"),
			"vekepl": type_info("VeKEPL", "T", "0xcafe"),
			"kepl": type_info("KEPL", "T", "0xcafe"),
			"base_price": v.base_price.to_string(),
			"claim_start_time": v.claim_start_time.to_string(),
			"commission_rate": v.commission_rate,
			"fee_wallet": v.fee_wallet.to_string(),
			"sale_amount_per_round": v.sale_amount_per_round.to_string(),
			"claim_interval": v.claim_interval.to_string(),
			"min_buy_amount": v.min_buy_amount.to_string(),
			"max_buy_amount": v.max_buy_amount.to_string(),
			"refeerer_min_buy_amount": v.referrer_min_buy_amount.to_string(),
			"signer_capability": { "account": "0xd00d" },
		})
	}

	#[test]
	fn network_settings() {
		let main = PresaleSettings::for_network("mainnet", types(), vault());
		assert_eq!(main.values.base_price, 100_000);
		assert_eq!(main.values.claim_interval, 2_592_000);
		assert_eq!(main.values.min_buy_amount, 2_000_000_000);

		let test = PresaleSettings::for_network("devnet", types(), vault());
		assert_eq!(test.values.base_price, 10);
		assert_eq!(test.values.min_buy_amount, 200_000);
		assert_eq!(test.values.max_buy_amount, 1_000_000);
		assert_eq!(test.values.fee_wallet, vault());
	}

	#[test]
	fn stored_config_comparison() {
		let desired = PresaleSettings::for_network("devnet", types(), vault());
		let storage: PresaleStorage = serde_json::from_value(storage_json(&desired)).unwrap();
		assert_eq!(storage.vekepl.to_type_tag(), Some(desired.types.vekepl.clone()));
		assert!(!needs_update(&storage, &desired));

		let mainnet = PresaleSettings::for_network("mainnet", types(), vault());
		assert!(needs_update(&storage, &mainnet));

		let mut other_coin = desired.clone();
		other_coin.types.kepl = "0xcafe::PreKEPL::T".parse().unwrap();
		assert!(needs_update(&storage, &other_coin));
	}

	#[test]
	fn initialize_appends_seed() {
		let rest = RestClient::new("http://localhost".parse().unwrap()).unwrap();
		let settings = PresaleSettings::for_network("devnet", types(), vault());
		let client = PresaleClient::new(
			&rest,
			ModuleRef::new("0xcafe".parse().unwrap(), "presale_007").unwrap(),
			settings.clone(),
		);
		let call = PresaleCall::Initialize { settings, seed: 9 };
		let TransactionPayload::EntryFunction(f) = client.module().payload(&call).unwrap();
		assert_eq!(f.ty_args().len(), 3);
		assert_eq!(f.args().len(), 10);
		assert_eq!(f.args()[3], vault().as_bytes().to_vec());
		assert_eq!(f.args()[9], 9u64.to_le_bytes().to_vec());
	}

	#[tokio::test]
	async fn update_is_skipped_when_config_matches() {
		let server = MockServer::start_async().await;
		let account = LocalAccount::from_private_key_hex(TEST_KEY).unwrap();
		mock_chain_state(&server, &account).await;
		let settings = PresaleSettings::for_network("devnet", types(), vault());
		let body = storage_json(&settings);
		server
			.mock_async(|when, then| {
				when.method(GET).path_contains("ModuleStorage");
				then.status(200).json_body(json!({
					"type": "0xcafe::presale_007::ModuleStorage",
					"data": body,
				}));
			})
			.await;
		let submit = mock_submissions(&server, "0x77").await;

		let rest = fast_client(&server);
		let client = PresaleClient::new(
			&rest,
			ModuleRef::new(account.address(), "presale_007").unwrap(),
			settings,
		);
		assert!(client.initialize(&account).await.unwrap().is_none());
		assert!(client.update_config(&account).await.unwrap().is_none());
		submit.assert_hits_async(0).await;

		let changed = PresaleClient::new(
			&rest,
			ModuleRef::new(account.address(), "presale_007").unwrap(),
			PresaleSettings::for_network("mainnet", types(), vault()),
		);
		assert!(changed.update_config(&account).await.unwrap().is_some());
		submit.assert_hits_async(1).await;
	}
}
