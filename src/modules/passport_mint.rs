//! Passport minting with server-signed purchase authorizations.

use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::Deserialize;
use tracing::info;

use crate::account::LocalAccount;
use crate::crypto;
use crate::module_client::{EntryCall, ModuleClient, ModuleRef};
use crate::move_types::{AccountAddress, MoveValue, TypeTag};
use crate::rest::{Resource, RestClient, Result, TableRef, TransactionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuyType {
	/// Public sale.
	Pb = 1,
	/// Promotion sale.
	Pt = 2,
	/// OG list.
	Og = 3,
}

impl BuyType {
	pub fn code(self) -> u64 {
		self as u64
	}
}

/// Prices and supplies for the Kepler passport collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeplerPassportSale {
	pub pb_price: u64,
	pub pb_supply: u64,
	pub pt_stage1_supply: u64,
	pub pt_stage1_price: u64,
	pub pt_stage2_supply: u64,
	pub pt_stage2_price: u64,
	pub og_price: u64,
	pub og_supply: u64,
	pub og_start_time: u64,
}

impl Default for KeplerPassportSale {
	fn default() -> Self {
		const UNIT: u64 = 1_000_000;
		Self {
			pb_price: 14 * UNIT / 10,
			pb_supply: 100,
			pt_stage1_supply: 2000,
			pt_stage1_price: 12 * UNIT / 10,
			pt_stage2_supply: 2000,
			pt_stage2_price: 13 * UNIT / 10,
			og_price: UNIT,
			og_supply: 500,
			og_start_time: 0,
		}
	}
}

#[derive(Debug, Clone)]
pub enum PassportMintCall {
	Initialize {
		coin: TypeTag,
		signer_public_key: VerifyingKey,
		vault: AccountAddress,
	},
	CreateCollection {
		name: String,
		description: String,
		uri: String,
		seed: u64,
	},
	ConfigureKeplerPassport {
		collection: String,
		sale: KeplerPassportSale,
	},
	Buy {
		coin: TypeTag,
		buyer: AccountAddress,
		referrer: AccountAddress,
		buy_type: BuyType,
		amount: u64,
		signature: [u8; 64],
	},
}

impl EntryCall for PassportMintCall {
	fn function(&self) -> &'static str {
		match self {
			Self::Initialize { .. } => "initialize",
			Self::CreateCollection { .. } => "create_collection",
			Self::ConfigureKeplerPassport { .. } => "configure_kepler_passport",
			Self::Buy { .. } => "buy",
		}
	}

	fn type_args(&self) -> Vec<TypeTag> {
		match self {
			Self::Initialize { coin, .. } | Self::Buy { coin, .. } => vec![coin.clone()],
			_ => vec![],
		}
	}

	fn args(&self) -> Vec<MoveValue> {
		match self {
			Self::Initialize {
				signer_public_key,
				vault,
				..
			} => vec![
				MoveValue::Bytes(signer_public_key.to_bytes().to_vec()),
				MoveValue::Address(*vault),
			],
			Self::CreateCollection {
				name,
				description,
				uri,
				seed,
			} => vec![
				MoveValue::utf8(name),
				MoveValue::utf8(description),
				MoveValue::utf8(uri),
				MoveValue::U64Bytes(*seed),
			],
			Self::ConfigureKeplerPassport { collection, sale } => vec![
				MoveValue::utf8(collection),
				MoveValue::U64(sale.pb_price),
				MoveValue::U64(sale.pb_supply),
				MoveValue::U64(sale.pt_stage1_supply),
				MoveValue::U64(sale.pt_stage1_price),
				MoveValue::U64(sale.pt_stage2_supply),
				MoveValue::U64(sale.pt_stage2_price),
				MoveValue::U64(sale.og_price),
				MoveValue::U64(sale.og_supply),
				MoveValue::U64(sale.og_start_time),
			],
			// Every field travels as raw bytes so the module can rebuild the
			// signed message verbatim.
			Self::Buy {
				buyer,
				referrer,
				buy_type,
				amount,
				signature,
				..
			} => vec![
				MoveValue::Bytes(buyer.as_bytes().to_vec()),
				MoveValue::Bytes(referrer.as_bytes().to_vec()),
				MoveValue::U64Bytes(buy_type.code()),
				MoveValue::U64Bytes(*amount),
				MoveValue::Bytes(signature.to_vec()),
			],
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModuleStorage {
	pub resource_accounts: TableRef,
}

pub struct PassportMintClient<'a> {
	module: ModuleClient<'a>,
	coin: TypeTag,
	authorizer: SigningKey,
	vault: AccountAddress,
}

impl<'a> PassportMintClient<'a> {
	/// `authorizer` signs purchase messages; its public key is registered at
	/// initialization. Sale proceeds go to `vault`.
	pub fn new(
		rest: &'a RestClient,
		module: ModuleRef,
		coin: TypeTag,
		authorizer: SigningKey,
		vault: AccountAddress,
	) -> Self {
		Self {
			module: ModuleClient::new(rest, module),
			coin,
			authorizer,
			vault,
		}
	}

	pub fn module(&self) -> &ModuleClient<'a> {
		&self.module
	}

	pub async fn module_storage(&self) -> Result<Option<ModuleStorage>> {
		self.module
			.query_module_resource_as(self.module.deployer(), "ModuleStorage")
			.await
	}

	/// Raw `ModuleStorage`, as persisted after a deployment.
	pub async fn module_storage_resource(&self) -> Result<Option<Resource>> {
		self.module
			.query_module_resource(self.module.deployer(), "ModuleStorage")
			.await
	}

	pub async fn kepler_passport_config(&self) -> Result<Option<Resource>> {
		self.module
			.query_module_resource(self.module.deployer(), "KeplerPassportConfig")
			.await
	}

	pub async fn resource_account(&self, collection: &str) -> Result<Option<AccountAddress>> {
		match self.module_storage().await? {
			Some(storage) => {
				self.module
					.resource_account(&storage.resource_accounts, collection)
					.await
			}
			None => Ok(None),
		}
	}

	/// `CollectionConfig` under the collection's resource account.
	pub async fn collection_config(&self, collection: &str) -> Result<Option<Resource>> {
		match self.resource_account(collection).await? {
			Some(account) => {
				self.module
					.query_module_resource(account, "CollectionConfig")
					.await
			}
			None => Ok(None),
		}
	}

	pub async fn initialize(&self, deployer: &LocalAccount) -> Result<Option<TransactionResult>> {
		if self.module_storage_resource().await?.is_some() {
			return Ok(None);
		}
		let call = PassportMintCall::Initialize {
			coin: self.coin.clone(),
			signer_public_key: self.authorizer.verifying_key(),
			vault: self.vault,
		};
		info!(vault = %self.vault, "initializing passport mint");
		self.module.execute(deployer, &call).await.map(Some)
	}

	/// Create the collection unless it already has a `CollectionConfig`.
	pub async fn create_collection(
		&self,
		deployer: &LocalAccount,
		name: &str,
		description: &str,
		uri: &str,
	) -> Result<Option<TransactionResult>> {
		if self.collection_config(name).await?.is_some() {
			return Ok(None);
		}
		let call = PassportMintCall::CreateCollection {
			name: name.to_owned(),
			description: description.to_owned(),
			uri: uri.to_owned(),
			seed: chrono::Utc::now().timestamp_millis().max(0) as u64,
		};
		self.module.execute(deployer, &call).await.map(Some)
	}

	/// Configure the sale; skipped when a config exists unless `force` is set.
	pub async fn configure_kepler_passport(
		&self,
		deployer: &LocalAccount,
		collection: &str,
		sale: &KeplerPassportSale,
		force: bool,
	) -> Result<Option<TransactionResult>> {
		if !force && self.kepler_passport_config().await?.is_some() {
			return Ok(None);
		}
		let call = PassportMintCall::ConfigureKeplerPassport {
			collection: collection.to_owned(),
			sale: sale.clone(),
		};
		self.module.execute(deployer, &call).await.map(Some)
	}

	/// Signed `buy` call for `buyer`, without submitting it.
	pub fn buy_call(
		&self,
		buyer: AccountAddress,
		referrer: AccountAddress,
		buy_type: BuyType,
		amount: u64,
	) -> PassportMintCall {
		let message = crypto::mint_purchase_message(&buyer, &referrer, buy_type.code(), amount);
		PassportMintCall::Buy {
			coin: self.coin.clone(),
			buyer,
			referrer,
			buy_type,
			amount,
			signature: crypto::sign_authorization(&self.authorizer, &message),
		}
	}

	pub async fn buy(
		&self,
		buyer: &LocalAccount,
		referrer: AccountAddress,
		buy_type: BuyType,
		amount: u64,
	) -> Result<TransactionResult> {
		let call = self.buy_call(buyer.address(), referrer, buy_type, amount);
		self.module.execute(buyer, &call).await
	}
}
