//! Passport sale with per-collection token data and promotional pricing.

use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::Deserialize;
use tracing::info;

use crate::account::LocalAccount;
use crate::crypto;
use crate::module_client::{EntryCall, ModuleClient, ModuleRef};
use crate::move_types::{AccountAddress, MoveValue, TypeTag};
use crate::rest::{Resource, RestClient, Result, TableRef, TransactionResult};

const TOKEN_IMAGE_BASE: &str = "https://storage.googleapis.com/keplernft/passport/kepler";

/// Image URI of passport number `id`, e.g. `.../K0042.png`.
pub fn token_uri(id: u32) -> String {
	format!("{TOKEN_IMAGE_BASE}/K{id:04}.png")
}

#[derive(Debug, Clone)]
pub enum PassportMineCall {
	Initialize {
		coin: TypeTag,
		signer_public_key: VerifyingKey,
	},
	ConfigureKeplerPassportPublicSale {
		collection: String,
		price: u64,
		max_supply: u64,
	},
	ConfigureKeplerPassportPromotionSale {
		collection: String,
		stage1_supply: u64,
		stage1_price: u64,
		stage2_supply: u64,
		stage2_price: u64,
	},
	ConfigurePromotionPassportSale {
		collection: String,
		public_price: u64,
		promotion_price: u64,
		max_supply: u64,
	},
	VerifySignature {
		order_id: u64,
		amount: u64,
		public_key: VerifyingKey,
		signature: [u8; 64],
	},
	BuyKeplerPassport {
		coin: TypeTag,
		amount: u64,
		is_promotional: bool,
		referrer: AccountAddress,
		signature: [u8; 64],
	},
	CreateCollection {
		name: String,
		description: String,
		uri: String,
	},
	CreateTokendata {
		collection: String,
		name: String,
		description: String,
		uri: String,
	},
	MintToken {
		coin: TypeTag,
		collection: String,
		name: String,
	},
}

impl EntryCall for PassportMineCall {
	fn function(&self) -> &'static str {
		match self {
			Self::Initialize { .. } => "initialize",
			Self::ConfigureKeplerPassportPublicSale { .. } => "configure_kepler_passport_public_sale",
			Self::ConfigureKeplerPassportPromotionSale { .. } => {
				"configure_kepler_passport_promotion_sale"
			}
			Self::ConfigurePromotionPassportSale { .. } => "configure_promotion_passport_sale",
			Self::VerifySignature { .. } => "verify_signature",
			Self::BuyKeplerPassport { .. } => "buy_kepler_passport",
			Self::CreateCollection { .. } => "create_collection",
			Self::CreateTokendata { .. } => "create_tokendata",
			Self::MintToken { .. } => "mint_token",
		}
	}

	fn type_args(&self) -> Vec<TypeTag> {
		match self {
			Self::Initialize { coin, .. }
			| Self::BuyKeplerPassport { coin, .. }
			| Self::MintToken { coin, .. } => vec![coin.clone()],
			_ => vec![],
		}
	}

	fn args(&self) -> Vec<MoveValue> {
		use MoveValue::{Bytes, U64Bytes, U64};
		match self {
			Self::Initialize {
				signer_public_key, ..
			} => vec![Bytes(signer_public_key.to_bytes().to_vec())],
			Self::ConfigureKeplerPassportPublicSale {
				collection,
				price,
				max_supply,
			} => vec![MoveValue::utf8(collection), U64(*price), U64(*max_supply)],
			Self::ConfigureKeplerPassportPromotionSale {
				collection,
				stage1_supply,
				stage1_price,
				stage2_supply,
				stage2_price,
			} => vec![
				MoveValue::utf8(collection),
				U64(*stage1_supply),
				U64(*stage1_price),
				U64(*stage2_supply),
				U64(*stage2_price),
			],
			Self::ConfigurePromotionPassportSale {
				collection,
				public_price,
				promotion_price,
				max_supply,
			} => vec![
				MoveValue::utf8(collection),
				U64(*public_price),
				U64(*promotion_price),
				U64(*max_supply),
			],
			Self::VerifySignature {
				order_id,
				amount,
				public_key,
				signature,
			} => vec![
				U64Bytes(*order_id),
				U64Bytes(*amount),
				Bytes(public_key.to_bytes().to_vec()),
				Bytes(signature.to_vec()),
			],
			Self::BuyKeplerPassport {
				amount,
				is_promotional,
				referrer,
				signature,
				..
			} => vec![
				U64Bytes(*amount),
				U64Bytes(*is_promotional as u64),
				Bytes(referrer.as_bytes().to_vec()),
				Bytes(signature.to_vec()),
			],
			Self::CreateCollection {
				name,
				description,
				uri,
			} => vec![
				MoveValue::utf8(name),
				MoveValue::utf8(description),
				MoveValue::utf8(uri),
			],
			Self::CreateTokendata {
				collection,
				name,
				description,
				uri,
			} => vec![
				MoveValue::utf8(collection),
				MoveValue::utf8(name),
				MoveValue::utf8(description),
				MoveValue::utf8(uri),
			],
			Self::MintToken {
				collection, name, ..
			} => vec![MoveValue::utf8(collection), MoveValue::utf8(name)],
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct GlobalStorage {
	pub resource_accounts: TableRef,
}

pub struct PassportMineClient<'a> {
	module: ModuleClient<'a>,
	coin: TypeTag,
	authorizer: SigningKey,
}

impl<'a> PassportMineClient<'a> {
	pub fn new(rest: &'a RestClient, module: ModuleRef, coin: TypeTag, authorizer: SigningKey) -> Self {
		Self {
			module: ModuleClient::new(rest, module),
			coin,
			authorizer,
		}
	}

	pub fn module(&self) -> &ModuleClient<'a> {
		&self.module
	}

	pub async fn global_storage(&self) -> Result<Option<GlobalStorage>> {
		self.module
			.query_module_resource_as(self.module.deployer(), "GlobalStorage")
			.await
	}

	pub async fn resource_account(&self, collection: &str) -> Result<Option<AccountAddress>> {
		match self.global_storage().await? {
			Some(storage) => {
				self.module
					.resource_account(&storage.resource_accounts, collection)
					.await
			}
			None => Ok(None),
		}
	}

	pub async fn kepler_collection(&self, collection: &str) -> Result<Option<Resource>> {
		match self.resource_account(collection).await? {
			Some(account) => {
				self.module
					.query_module_resource(account, "KeplerCollection")
					.await
			}
			None => Ok(None),
		}
	}

	pub async fn initialize(&self, deployer: &LocalAccount) -> Result<Option<TransactionResult>> {
		if self
			.module
			.query_module_resource(self.module.deployer(), "GlobalStorage")
			.await?
			.is_some()
		{
			return Ok(None);
		}
		let call = PassportMineCall::Initialize {
			coin: self.coin.clone(),
			signer_public_key: self.authorizer.verifying_key(),
		};
		info!("initializing passport mine");
		self.module.execute(deployer, &call).await.map(Some)
	}

	pub async fn create_collection(
		&self,
		deployer: &LocalAccount,
		name: &str,
		description: &str,
		uri: &str,
	) -> Result<Option<TransactionResult>> {
		if self.kepler_collection(name).await?.is_some() {
			return Ok(None);
		}
		let call = PassportMineCall::CreateCollection {
			name: name.to_owned(),
			description: description.to_owned(),
			uri: uri.to_owned(),
		};
		self.module.execute(deployer, &call).await.map(Some)
	}

	pub async fn configure_kepler_passport_public_sale(
		&self,
		deployer: &LocalAccount,
		collection: &str,
		price: u64,
		max_supply: u64,
	) -> Result<TransactionResult> {
		let call = PassportMineCall::ConfigureKeplerPassportPublicSale {
			collection: collection.to_owned(),
			price,
			max_supply,
		};
		self.module.execute(deployer, &call).await
	}

	/// Two promotional stages, each with its own supply and price.
	pub async fn configure_kepler_passport_promotion_sale(
		&self,
		deployer: &LocalAccount,
		collection: &str,
		stage1: (u64, u64),
		stage2: (u64, u64),
	) -> Result<TransactionResult> {
		let call = PassportMineCall::ConfigureKeplerPassportPromotionSale {
			collection: collection.to_owned(),
			stage1_supply: stage1.0,
			stage1_price: stage1.1,
			stage2_supply: stage2.0,
			stage2_price: stage2.1,
		};
		self.module.execute(deployer, &call).await
	}

	pub async fn configure_promotion_passport_sale(
		&self,
		deployer: &LocalAccount,
		collection: &str,
		public_price: u64,
		promotion_price: u64,
		max_supply: u64,
	) -> Result<TransactionResult> {
		let call = PassportMineCall::ConfigurePromotionPassportSale {
			collection: collection.to_owned(),
			public_price,
			promotion_price,
			max_supply,
		};
		self.module.execute(deployer, &call).await
	}

	/// Ask the module to check a signature over `order_id || amount`.
	pub async fn verify_signature(
		&self,
		deployer: &LocalAccount,
		order_id: u64,
		amount: u64,
	) -> Result<TransactionResult> {
		let message = crypto::order_message(order_id, amount);
		let call = PassportMineCall::VerifySignature {
			order_id,
			amount,
			public_key: self.authorizer.verifying_key(),
			signature: crypto::sign_authorization(&self.authorizer, &message),
		};
		self.module.execute(deployer, &call).await
	}

	pub fn buy_call(&self, amount: u64, is_promotional: bool, referrer: AccountAddress) -> PassportMineCall {
		let message = crypto::passport_purchase_message(amount, is_promotional, &referrer);
		PassportMineCall::BuyKeplerPassport {
			coin: self.coin.clone(),
			amount,
			is_promotional,
			referrer,
			signature: crypto::sign_authorization(&self.authorizer, &message),
		}
	}

	pub async fn buy_kepler_passport(
		&self,
		buyer: &LocalAccount,
		amount: u64,
		is_promotional: bool,
		referrer: AccountAddress,
	) -> Result<TransactionResult> {
		let call = self.buy_call(amount, is_promotional, referrer);
		self.module.execute(buyer, &call).await
	}

	pub async fn create_tokendata(
		&self,
		deployer: &LocalAccount,
		collection: &str,
		name: &str,
		description: &str,
		uri: &str,
	) -> Result<TransactionResult> {
		let call = PassportMineCall::CreateTokendata {
			collection: collection.to_owned(),
			name: name.to_owned(),
			description: description.to_owned(),
			uri: uri.to_owned(),
		};
		self.module.execute(deployer, &call).await
	}

	pub async fn mint_token(
		&self,
		buyer: &LocalAccount,
		collection: &str,
		name: &str,
	) -> Result<TransactionResult> {
		let call = PassportMineCall::MintToken {
			coin: self.coin.clone(),
			collection: collection.to_owned(),
			name: name.to_owned(),
		};
		self.module.execute(buyer, &call).await
	}
}
