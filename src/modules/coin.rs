//! Managed coins issued through `0x1::managed_coin`.

use serde::Deserialize;
use tracing::info;

use crate::account::LocalAccount;
use crate::module_client::{EntryCall, ModuleClient, ModuleRef};
use crate::move_types::{AccountAddress, MoveValue, ParseError, StructTag, TypeTag};
use crate::rest::types::deserialize_from_string;
use crate::rest::{RestClient, Result, TransactionResult};

/// `<issuer>::<symbol>::T`
pub fn coin_type(issuer: AccountAddress, symbol: &str) -> Result<TypeTag, ParseError> {
	format!("{}::{symbol}::T", issuer.to_short_string()).parse()
}

pub fn coin_store_type(coin: &TypeTag) -> String {
	format!("0x1::coin::CoinStore<{coin}>")
}

/// `0x1::coin::CoinStore<coin>` as a tag, for comparing against the type a
/// node reports back.
pub fn coin_store_tag(coin: &TypeTag) -> Result<StructTag, ParseError> {
	ModuleRef::new(AccountAddress::ONE, "coin")?.struct_tag("CoinStore", vec![coin.clone()])
}

#[derive(Debug, Clone)]
pub enum CoinCall {
	Register { coin: TypeTag },
	Mint { coin: TypeTag, to: AccountAddress, amount: u64 },
}

impl EntryCall for CoinCall {
	fn function(&self) -> &'static str {
		match self {
			Self::Register { .. } => "register",
			Self::Mint { .. } => "mint",
		}
	}

	fn type_args(&self) -> Vec<TypeTag> {
		match self {
			Self::Register { coin } | Self::Mint { coin, .. } => vec![coin.clone()],
		}
	}

	fn args(&self) -> Vec<MoveValue> {
		match self {
			Self::Register { .. } => vec![],
			Self::Mint { to, amount, .. } => vec![MoveValue::Address(*to), MoveValue::U64(*amount)],
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinStore {
	pub coin: CoinValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinValue {
	#[serde(deserialize_with = "deserialize_from_string")]
	pub value: u64,
}

/// One managed coin, `<issuer>::<symbol>::T`.
pub struct CoinClient<'a> {
	module: ModuleClient<'a>,
	coin: TypeTag,
}

impl<'a> CoinClient<'a> {
	pub fn new(rest: &'a RestClient, issuer: AccountAddress, symbol: &str) -> Result<Self> {
		Ok(Self {
			module: ModuleClient::new(rest, ModuleRef::new(AccountAddress::ONE, "managed_coin")?),
			coin: coin_type(issuer, symbol)?,
		})
	}

	pub fn coin_type(&self) -> &TypeTag {
		&self.coin
	}

	pub async fn is_registered(&self, owner: AccountAddress) -> Result<bool> {
		let store = self
			.module
			.rest()
			.fetch_resource(owner, &coin_store_type(&self.coin))
			.await?;
		let expected = coin_store_tag(&self.coin)?;
		Ok(match store {
			Some(resource) => matches!(
				resource.resource_type.parse::<TypeTag>(),
				Ok(TypeTag::Struct(tag)) if *tag == expected
			),
			None => false,
		})
	}

	/// Balance of `owner`, zero when no store is registered.
	pub async fn balance(&self, owner: AccountAddress) -> Result<u64> {
		let store: Option<CoinStore> = self
			.module
			.rest()
			.fetch_resource_as(owner, &coin_store_type(&self.coin))
			.await?;
		Ok(store.map(|s| s.coin.value).unwrap_or(0))
	}

	pub async fn register(&self, account: &LocalAccount) -> Result<TransactionResult> {
		let call = CoinCall::Register {
			coin: self.coin.clone(),
		};
		self.module.execute(account, &call).await
	}

	/// Register `account` unless its store already exists.
	pub async fn ensure_registered(&self, account: &LocalAccount) -> Result<Option<TransactionResult>> {
		if self.is_registered(account.address()).await? {
			return Ok(None);
		}
		info!(account = %account.address(), coin = %self.coin, "registering coin store");
		self.register(account).await.map(Some)
	}

	/// Mint from the issuer's account into `to`.
	pub async fn mint(
		&self,
		minter: &LocalAccount,
		to: AccountAddress,
		amount: u64,
	) -> Result<TransactionResult> {
		let call = CoinCall::Mint {
			coin: self.coin.clone(),
			to,
			amount,
		};
		self.module.execute(minter, &call).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::rest::tests::{fast_client, mock_chain_state, mock_submissions, TEST_KEY};
	use crate::transaction::TransactionPayload;
	use httpmock::prelude::*;
	use serde_json::json;

	const ISSUER: &str = "0xcafe";

	#[test]
	fn coin_types() {
		let t = coin_type(ISSUER.parse().unwrap(), "KEME").unwrap();
		assert_eq!(t.to_string(), "0xcafe::KEME::T");
		assert_eq!(coin_store_type(&t), "0x1::coin::CoinStore<0xcafe::KEME::T>");
	}

	#[test]
	fn mint_encodes_recipient_then_amount() {
		let rest = RestClient::new("http://localhost".parse().unwrap()).unwrap();
		let coin = CoinClient::new(&rest, ISSUER.parse().unwrap(), "KEME").unwrap();
		let call = CoinCall::Mint {
			coin: coin.coin_type().clone(),
			to: AccountAddress::ONE,
			amount: 100,
		};
		let TransactionPayload::EntryFunction(f) = coin.module.payload(&call).unwrap();
		assert_eq!(f.function_id().to_string(), "0x1::managed_coin::mint");
		assert_eq!(f.args()[0], AccountAddress::ONE.as_bytes().to_vec());
		assert_eq!(f.args()[1], 100u64.to_le_bytes().to_vec());
	}

	#[tokio::test]
	async fn unregistered_store_has_zero_balance() {
		let server = MockServer::start_async().await;
		server
			.mock_async(|when, then| {
				when.method(GET).path_contains("/resource/");
				then.status(404);
			})
			.await;
		let rest = fast_client(&server);
		let coin = CoinClient::new(&rest, ISSUER.parse().unwrap(), "KEME").unwrap();
		assert!(!coin.is_registered(AccountAddress::ONE).await.unwrap());
		assert_eq!(coin.balance(AccountAddress::ONE).await.unwrap(), 0);
	}

	#[tokio::test]
	async fn registered_store_skips_registration() {
		let server = MockServer::start_async().await;
		let account = LocalAccount::from_private_key_hex(TEST_KEY).unwrap();
		mock_chain_state(&server, &account).await;
		server
			.mock_async(|when, then| {
				when.method(GET).path_contains("CoinStore");
				then.status(200).json_body(json!({
					"type": "0x1::coin::CoinStore<0xcafe::KEME::T>",
					"data": { "coin": { "value": "250" }, "frozen": false }
				}));
			})
			.await;
		let submit = mock_submissions(&server, "0x1234").await;

		let rest = fast_client(&server);
		let coin = CoinClient::new(&rest, ISSUER.parse().unwrap(), "KEME").unwrap();
		assert_eq!(coin.balance(account.address()).await.unwrap(), 250);
		assert!(coin.ensure_registered(&account).await.unwrap().is_none());
		submit.assert_hits_async(0).await;
	}

	#[tokio::test]
	async fn store_type_is_compared_structurally() {
		let server = MockServer::start_async().await;
		server
			.mock_async(|when, then| {
				when.method(GET).path_contains("CoinStore");
				then.status(200).json_body(json!({
					"type": "0x0000000000000000000000000000000000000000000000000000000000000001::coin::CoinStore<0x000000000000000000000000000000000000000000000000000000000000cafe::KEME::T>",
					"data": { "coin": { "value": "0" }, "frozen": false }
				}));
			})
			.await;
		let rest = fast_client(&server);
		let coin = CoinClient::new(&rest, ISSUER.parse().unwrap(), "KEME").unwrap();
		assert!(coin.is_registered(AccountAddress::ONE).await.unwrap());

		let other = CoinClient::new(&rest, ISSUER.parse().unwrap(), "KEPL").unwrap();
		assert!(!other.is_registered(AccountAddress::ONE).await.unwrap());
	}

	#[test]
	fn store_tag_matches_store_type() {
		let t = coin_type(ISSUER.parse().unwrap(), "KEME").unwrap();
		let tag = coin_store_tag(&t).unwrap();
		assert_eq!(tag.to_string(), coin_store_type(&t));
		assert_eq!(tag.type_args, vec![t]);
	}
}
