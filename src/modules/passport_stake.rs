//! NFT staking: lock passports from a registered collection and draw
//! periodic rewards.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::account::LocalAccount;
use crate::module_client::{EntryCall, ModuleClient, ModuleRef};
use crate::move_types::{AccountAddress, MoveValue, TypeTag};
use crate::rest::types::number_or_string;
use crate::rest::{RestClient, Result, SignerCapability, TableRef, TransactionResult};

use super::token::TokenId;

pub const APT: u64 = 1_000_000;

/// Reward schedule for a newly added collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionTerms {
	pub total_reward_per_drawing: u64,
	/// Seconds.
	pub min_stake_time: u64,
	/// Seconds.
	pub lock_unit_span: u64,
}

impl Default for CollectionTerms {
	fn default() -> Self {
		Self {
			total_reward_per_drawing: 10_000 * APT,
			min_stake_time: 10,
			lock_unit_span: 30,
		}
	}
}

/// A collection as `(creator, name)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInfo {
	pub creator: AccountAddress,
	pub name: String,
}

impl CollectionInfo {
	/// Recover the collection from the record saved by the passport mint
	/// deployment: `kepler_collection_config.data` carries the resource
	/// signer account and the hex-encoded name.
	pub fn from_mint_record(record: &Map<String, Value>) -> Option<Self> {
		let data = record.get("kepler_collection_config")?.get("data")?;
		let creator = data
			.get("resource_signer_cap")?
			.get("account")?
			.as_str()?
			.parse()
			.ok()?;
		let name_hex = data.get("name")?.as_str()?;
		let name = String::from_utf8(hex::decode(name_hex.trim_start_matches("0x")).ok()?).ok()?;
		Some(Self { creator, name })
	}
}

#[derive(Debug, Clone)]
pub enum StakeCall {
	Initialize {
		reward: TypeTag,
		seed: u64,
	},
	AddCollection {
		reward: TypeTag,
		collection: CollectionInfo,
		terms: CollectionTerms,
	},
	Stake {
		collection: CollectionInfo,
		token_name: String,
		property_version: u64,
		lock_units: u64,
	},
	Unstake {
		collection: CollectionInfo,
		token_name: String,
		property_version: u64,
	},
	Draw {
		collection: CollectionInfo,
	},
	Claim {
		reward: TypeTag,
		collection: CollectionInfo,
	},
}

impl EntryCall for StakeCall {
	fn function(&self) -> &'static str {
		match self {
			Self::Initialize { .. } => "initialize",
			Self::AddCollection { .. } => "add_collection",
			Self::Stake { .. } => "stake",
			Self::Unstake { .. } => "unstake",
			Self::Draw { .. } => "draw",
			Self::Claim { .. } => "claim",
		}
	}

	fn type_args(&self) -> Vec<TypeTag> {
		match self {
			Self::Initialize { reward, .. }
			| Self::AddCollection { reward, .. }
			| Self::Claim { reward, .. } => vec![reward.clone()],
			_ => vec![],
		}
	}

	fn args(&self) -> Vec<MoveValue> {
		let collection_args = |c: &CollectionInfo| {
			vec![MoveValue::Address(c.creator), MoveValue::utf8(&c.name)]
		};
		match self {
			Self::Initialize { seed, .. } => vec![MoveValue::U64Bytes(*seed)],
			Self::AddCollection {
				collection, terms, ..
			} => {
				let mut args = collection_args(collection);
				args.extend([
					MoveValue::U64(terms.total_reward_per_drawing),
					MoveValue::U64(terms.min_stake_time),
					MoveValue::U64(terms.lock_unit_span),
				]);
				args
			}
			Self::Stake {
				collection,
				token_name,
				property_version,
				lock_units,
			} => {
				let mut args = collection_args(collection);
				args.extend([
					MoveValue::utf8(token_name),
					MoveValue::U64(*property_version),
					MoveValue::U64(*lock_units),
				]);
				args
			}
			Self::Unstake {
				collection,
				token_name,
				property_version,
			} => {
				let mut args = collection_args(collection);
				args.extend([MoveValue::utf8(token_name), MoveValue::U64(*property_version)]);
				args
			}
			Self::Draw { collection } | Self::Claim { collection, .. } => {
				collection_args(collection)
			}
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleStore {
	pub collections: TableRef,
	pub resource_signer_capability: SignerCapability,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Escrow {
	pub token_id: TokenId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserStore {
	#[serde(default)]
	pub escrows: Vec<Escrow>,
	#[serde(deserialize_with = "number_or_string")]
	pub pending_reward: u64,
}

/// Table key of the `collections` table.
#[derive(Debug, Clone, Serialize)]
struct CollectionId {
	creator: AccountAddress,
	/// `vector<u8>` rendered as `0x`-prefixed hex.
	name: String,
}

pub struct PassportStakeClient<'a> {
	module: ModuleClient<'a>,
	reward: TypeTag,
}

impl<'a> PassportStakeClient<'a> {
	pub fn new(rest: &'a RestClient, module: ModuleRef, reward: TypeTag) -> Self {
		Self {
			module: ModuleClient::new(rest, module),
			reward,
		}
	}

	pub fn module(&self) -> &ModuleClient<'a> {
		&self.module
	}

	pub async fn module_store(&self) -> Result<Option<ModuleStore>> {
		self.module
			.query_module_resource_as(self.module.deployer(), "ModuleStore")
			.await
	}

	pub async fn user_store(&self, user: AccountAddress) -> Result<Option<UserStore>> {
		self.module.query_module_resource_as(user, "UserStore").await
	}

	/// The `CollectionData` entry for `collection` in the `collections` table.
	pub async fn collection_data(
		&self,
		collections: &TableRef,
		collection: &CollectionInfo,
	) -> Result<Option<Value>> {
		let key = CollectionId {
			creator: collection.creator,
			name: format!("0x{}", hex::encode(collection.name.as_bytes())),
		};
		self.module
			.rest()
			.fetch_table_item(
				&collections.handle,
				&self.module.struct_type("CollectionId"),
				&self.module.struct_type("CollectionData"),
				&key,
			)
			.await
	}

	pub async fn initialize(&self, deployer: &LocalAccount) -> Result<Option<TransactionResult>> {
		if self
			.module
			.query_module_resource(self.module.deployer(), "ModuleStore")
			.await?
			.is_some()
		{
			return Ok(None);
		}
		let call = StakeCall::Initialize {
			reward: self.reward.clone(),
			seed: chrono::Utc::now().timestamp_millis().max(0) as u64,
		};
		info!(reward = %self.reward, "initializing passport stake");
		self.module.execute(deployer, &call).await.map(Some)
	}

	/// Register `collection` for staking unless it already has data.
	pub async fn add_collection(
		&self,
		deployer: &LocalAccount,
		collections: &TableRef,
		collection: &CollectionInfo,
		terms: &CollectionTerms,
	) -> Result<Option<TransactionResult>> {
		if self.collection_data(collections, collection).await?.is_some() {
			return Ok(None);
		}
		let call = StakeCall::AddCollection {
			reward: self.reward.clone(),
			collection: collection.clone(),
			terms: terms.clone(),
		};
		self.module.execute(deployer, &call).await.map(Some)
	}

	pub async fn stake(
		&self,
		user: &LocalAccount,
		collection: &CollectionInfo,
		token_name: &str,
		property_version: u64,
		lock_units: u64,
	) -> Result<TransactionResult> {
		let call = StakeCall::Stake {
			collection: collection.clone(),
			token_name: token_name.to_owned(),
			property_version,
			lock_units,
		};
		self.module.execute(user, &call).await
	}

	pub async fn unstake(&self, user: &LocalAccount, token: &TokenId) -> Result<TransactionResult> {
		let call = StakeCall::Unstake {
			collection: CollectionInfo {
				creator: token.token_data_id.creator,
				name: token.token_data_id.collection.clone(),
			},
			token_name: token.token_data_id.name.clone(),
			property_version: token.property_version,
		};
		self.module.execute(user, &call).await
	}

	pub async fn draw(
		&self,
		deployer: &LocalAccount,
		collection: &CollectionInfo,
	) -> Result<TransactionResult> {
		let call = StakeCall::Draw {
			collection: collection.clone(),
		};
		self.module.execute(deployer, &call).await
	}

	/// Claim pending rewards; skipped when there are none.
	pub async fn claim(
		&self,
		user: &LocalAccount,
		collection: &CollectionInfo,
	) -> Result<Option<TransactionResult>> {
		match self.user_store(user.address()).await? {
			Some(store) if store.pending_reward > 0 => {}
			_ => return Ok(None),
		}
		let call = StakeCall::Claim {
			reward: self.reward.clone(),
			collection: collection.clone(),
		};
		self.module.execute(user, &call).await.map(Some)
	}
}
