//! The earlier passport sale module: Kepler and Universe passports sold
//! against allow-list signatures that bind the buyer address.

use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::Deserialize;
use tracing::info;

use crate::account::LocalAccount;
use crate::crypto;
use crate::module_client::{EntryCall, ModuleClient, ModuleRef};
use crate::move_types::{AccountAddress, MoveValue, TypeTag};
use crate::rest::{Resource, RestClient, Result, TableRef, TransactionResult};

const UNIT: u64 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeplerPassportTerms {
	pub public_price: u64,
	pub public_max_supply: u64,
	pub promotion_stage1_supply: u64,
	pub promotion_stage1_price: u64,
	pub promotion_stage2_supply: u64,
	pub promotion_stage2_price: u64,
}

impl Default for KeplerPassportTerms {
	fn default() -> Self {
		Self {
			public_price: 14 * UNIT / 10,
			public_max_supply: 100,
			promotion_stage1_supply: 1000,
			promotion_stage1_price: 12 * UNIT / 10,
			promotion_stage2_supply: 3000,
			promotion_stage2_price: 13 * UNIT / 10,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniversePassportTerms {
	pub public_price: u64,
	pub promotion_price: u64,
	pub max_supply: u64,
}

impl Default for UniversePassportTerms {
	fn default() -> Self {
		Self {
			public_price: 36 * UNIT / 10,
			promotion_price: 33 * UNIT / 10,
			max_supply: 1000,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Passport {
	Kepler,
	Universe,
}

#[derive(Debug, Clone)]
pub enum LegacyMineCall {
	Initialize {
		coin: TypeTag,
		signer_public_key: VerifyingKey,
		vault: AccountAddress,
	},
	ConfigureKeplerPassport {
		collection: String,
		terms: KeplerPassportTerms,
	},
	ConfigureUniversePassport {
		collection: String,
		terms: UniversePassportTerms,
	},
	VerifySignature {
		order_id: u64,
		amount: u64,
		public_key: VerifyingKey,
		signature: [u8; 64],
	},
	Buy {
		passport: Passport,
		coin: TypeTag,
		buyer: AccountAddress,
		amount: u64,
		is_promotional: bool,
		referrer: AccountAddress,
		signature: [u8; 64],
	},
	CreateCollection {
		name: String,
		description: String,
		uri: String,
		seed: u64,
	},
}

impl EntryCall for LegacyMineCall {
	fn function(&self) -> &'static str {
		match self {
			Self::Initialize { .. } => "initialize",
			Self::ConfigureKeplerPassport { .. } => "configure_kepler_passport",
			// Spelled this way on chain.
			Self::ConfigureUniversePassport { .. } => "configure_uinverse_passport",
			Self::VerifySignature { .. } => "verify_signature",
			Self::Buy {
				passport: Passport::Kepler,
				..
			} => "buy_kepler_passport",
			Self::Buy {
				passport: Passport::Universe,
				..
			} => "buy_universe_passport",
			Self::CreateCollection { .. } => "create_collection",
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
			Self::ConfigureKeplerPassport { collection, terms } => vec![
				MoveValue::utf8(collection),
				MoveValue::U64(terms.public_price),
				MoveValue::U64(terms.public_max_supply),
				MoveValue::U64(terms.promotion_stage1_supply),
				MoveValue::U64(terms.promotion_stage1_price),
				MoveValue::U64(terms.promotion_stage2_supply),
				MoveValue::U64(terms.promotion_stage2_price),
			],
			Self::ConfigureUniversePassport { collection, terms } => vec![
				MoveValue::utf8(collection),
				MoveValue::U64(terms.public_price),
				MoveValue::U64(terms.promotion_price),
				MoveValue::U64(terms.max_supply),
			],
			Self::VerifySignature {
				order_id,
				amount,
				public_key,
				signature,
			} => vec![
				MoveValue::U64Bytes(*order_id),
				MoveValue::U64Bytes(*amount),
				MoveValue::Bytes(public_key.to_bytes().to_vec()),
				MoveValue::Bytes(signature.to_vec()),
			],
			Self::Buy {
				buyer,
				amount,
				is_promotional,
				referrer,
				signature,
				..
			} => vec![
				MoveValue::Bytes(buyer.as_bytes().to_vec()),
				MoveValue::U64Bytes(*amount),
				MoveValue::U64Bytes(*is_promotional as u64),
				MoveValue::Bytes(referrer.as_bytes().to_vec()),
				MoveValue::Bytes(signature.to_vec()),
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
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModuleStorage {
	pub resource_accounts: TableRef,
}

pub struct LegacyMineClient<'a> {
	module: ModuleClient<'a>,
	coin: TypeTag,
	authorizer: SigningKey,
	vault: AccountAddress,
}

impl<'a> LegacyMineClient<'a> {
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

	pub async fn kepler_passport_config(&self) -> Result<Option<Resource>> {
		self.module
			.query_module_resource(self.module.deployer(), "KeplerPassportConfig")
			.await
	}

	pub async fn kepler_promotion_sale_storage(&self) -> Result<Option<Resource>> {
		self.module
			.query_module_resource(self.module.deployer(), "KeplerPassportPromotionSaleStorage")
			.await
	}

	pub async fn universe_passport_config(&self) -> Result<Option<Resource>> {
		self.module
			.query_module_resource(self.module.deployer(), "UniversePassportConfig")
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
		if self
			.module
			.query_module_resource(self.module.deployer(), "ModuleStorage")
			.await?
			.is_some()
		{
			return Ok(None);
		}
		let call = LegacyMineCall::Initialize {
			coin: self.coin.clone(),
			signer_public_key: self.authorizer.verifying_key(),
			vault: self.vault,
		};
		info!(vault = %self.vault, "initializing legacy passport mine");
		self.module.execute(deployer, &call).await.map(Some)
	}

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
		let call = LegacyMineCall::CreateCollection {
			name: name.to_owned(),
			description: description.to_owned(),
			uri: uri.to_owned(),
			seed: chrono::Utc::now().timestamp_millis().max(0) as u64,
		};
		self.module.execute(deployer, &call).await.map(Some)
	}

	pub async fn configure_kepler_passport(
		&self,
		deployer: &LocalAccount,
		collection: &str,
		terms: &KeplerPassportTerms,
		force: bool,
	) -> Result<Option<TransactionResult>> {
		if !force && self.kepler_passport_config().await?.is_some() {
			return Ok(None);
		}
		let call = LegacyMineCall::ConfigureKeplerPassport {
			collection: collection.to_owned(),
			terms: terms.clone(),
		};
		self.module.execute(deployer, &call).await.map(Some)
	}

	pub async fn configure_universe_passport(
		&self,
		deployer: &LocalAccount,
		collection: &str,
		terms: &UniversePassportTerms,
		force: bool,
	) -> Result<Option<TransactionResult>> {
		if !force && self.universe_passport_config().await?.is_some() {
			return Ok(None);
		}
		let call = LegacyMineCall::ConfigureUniversePassport {
			collection: collection.to_owned(),
			terms: terms.clone(),
		};
		self.module.execute(deployer, &call).await.map(Some)
	}

	pub async fn verify_signature(
		&self,
		deployer: &LocalAccount,
		order_id: u64,
		amount: u64,
	) -> Result<TransactionResult> {
		let message = crypto::order_message(order_id, amount);
		let call = LegacyMineCall::VerifySignature {
			order_id,
			amount,
			public_key: self.authorizer.verifying_key(),
			signature: crypto::sign_authorization(&self.authorizer, &message),
		};
		self.module.execute(deployer, &call).await
	}

	pub fn buy_call(
		&self,
		passport: Passport,
		buyer: AccountAddress,
		amount: u64,
		is_promotional: bool,
		referrer: AccountAddress,
	) -> LegacyMineCall {
		let message = crypto::allowlist_purchase_message(&buyer, amount, is_promotional, &referrer);
		LegacyMineCall::Buy {
			passport,
			coin: self.coin.clone(),
			buyer,
			amount,
			is_promotional,
			referrer,
			signature: crypto::sign_authorization(&self.authorizer, &message),
		}
	}

	pub async fn buy(
		&self,
		passport: Passport,
		buyer: &LocalAccount,
		amount: u64,
		is_promotional: bool,
		referrer: AccountAddress,
	) -> Result<TransactionResult> {
		let call = self.buy_call(passport, buyer.address(), amount, is_promotional, referrer);
		self.module.execute(buyer, &call).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::account::parse_private_key;
	use crate::rest::tests::{fast_client, mock_chain_state, mock_submissions, TEST_KEY};
	use crate::transaction::TransactionPayload;
	use httpmock::prelude::*;
	use serde_json::json;

	fn client<'a>(rest: &'a RestClient, deployer: AccountAddress) -> LegacyMineClient<'a> {
		LegacyMineClient::new(
			rest,
			ModuleRef::new(deployer, "passport_mine_006").unwrap(),
			"0x1::aptos_coin::AptosCoin".parse().unwrap(),
			parse_private_key(TEST_KEY).unwrap(),
			"0xbeef".parse().unwrap(),
		)
	}

	#[test]
	fn universe_configure_keeps_chain_spelling() {
		let call = LegacyMineCall::ConfigureUniversePassport {
			collection: "Universe Passport".into(),
			terms: UniversePassportTerms::default(),
		};
		assert_eq!(call.function(), "configure_uinverse_passport");
		assert_eq!(
			call.args()[1..],
			[MoveValue::U64(3_600_000), MoveValue::U64(3_300_000), MoveValue::U64(1000)]
		);
	}

	#[test]
	fn buy_signature_matches_allowlist_vector() {
		let rest = RestClient::new("http://localhost".parse().unwrap()).unwrap();
		let mine = client(&rest, "0xcafe".parse().unwrap());
		let buyer: AccountAddress = "0xbb4ad45e2cda42e006e7215e88a65a1f38f06480c63a0dbe04422c6e486e58fa"
			.parse()
			.unwrap();
		let call = mine.buy_call(Passport::Universe, buyer, 1, true, buyer);
		assert_eq!(call.function(), "buy_universe_passport");

		let LegacyMineCall::Buy { signature, .. } = &call else {
			panic!("not a buy call");
		};
		let message = crypto::allowlist_purchase_message(&buyer, 1, true, &buyer);
		assert_eq!(
			*signature,
			crypto::sign_authorization(&parse_private_key(TEST_KEY).unwrap(), &message)
		);

		let TransactionPayload::EntryFunction(f) = mine.module().payload(&call).unwrap();
		assert_eq!(f.args().len(), 5);
		assert_eq!(&f.args()[0][1..], buyer.as_bytes());
	}

	#[tokio::test]
	async fn configure_is_skipped_unless_forced() {
		let server = MockServer::start_async().await;
		let account = LocalAccount::from_private_key_hex(TEST_KEY).unwrap();
		mock_chain_state(&server, &account).await;
		server
			.mock_async(|when, then| {
				when.method(GET).path_contains("KeplerPassportConfig");
				then.status(200).json_body(json!({
					"type": "0xcafe::passport_mine_006::KeplerPassportConfig",
					"data": {}
				}));
			})
			.await;
		let submit = mock_submissions(&server, "0x02").await;

		let rest = fast_client(&server);
		let mine = client(&rest, account.address());
		let terms = KeplerPassportTerms::default();
		assert!(mine
			.configure_kepler_passport(&account, "Kepler Passport", &terms, false)
			.await
			.unwrap()
			.is_none());
		assert!(mine
			.configure_kepler_passport(&account, "Kepler Passport", &terms, true)
			.await
			.unwrap()
			.is_some());
		submit.assert_hits_async(1).await;
	}
}
