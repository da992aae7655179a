//! The framework token standard at `0x3`: collections, tokens, the
//! offer/claim transfer flow and two-signer direct transfers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::account::LocalAccount;
use crate::module_client::{EntryCall, ModuleClient, ModuleRef, STRING_TYPE};
use crate::move_types::{AccountAddress, MoveValue};
use crate::rest::types::{deserialize_from_string, number_or_string};
use crate::rest::{RestClient, Result, TableRef, TransactionResult};

/// `0x3::token::TokenDataId`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDataId {
	pub creator: AccountAddress,
	pub collection: String,
	pub name: String,
}

/// `0x3::token::TokenId`. The REST API renders `property_version` as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenId {
	pub token_data_id: TokenDataId,
	#[serde(
		serialize_with = "serialize_as_string",
		deserialize_with = "number_or_string"
	)]
	pub property_version: u64,
}

fn serialize_as_string<S: serde::Serializer>(n: &u64, serializer: S) -> Result<S::Ok, S::Error> {
	serializer.collect_str(n)
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenBalance {
	pub id: TokenId,
	#[serde(deserialize_with = "deserialize_from_string")]
	pub amount: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct Collections {
	collection_data: TableRef,
}

#[derive(Debug, Clone, Deserialize)]
struct TokenStore {
	tokens: TableRef,
}

#[derive(Debug, Clone)]
pub enum TokenCall {
	CreateCollectionScript {
		name: String,
		description: String,
		uri: String,
		maximum: u64,
		/// description, uri, maximum
		mutate_setting: [bool; 3],
	},
	CreateTokenScript {
		collection: String,
		name: String,
		description: String,
		balance: u64,
		maximum: u64,
		uri: String,
		royalty_payee: AccountAddress,
		royalty_points_denominator: u64,
		royalty_points_numerator: u64,
		/// maximum, uri, royalty, description, properties
		mutate_setting: [bool; 5],
	},
	/// Signed by both the sender and the receiver.
	DirectTransferScript { token: TokenId, amount: u64 },
}

impl EntryCall for TokenCall {
	fn function(&self) -> &'static str {
		match self {
			Self::CreateCollectionScript { .. } => "create_collection_script",
			Self::CreateTokenScript { .. } => "create_token_script",
			Self::DirectTransferScript { .. } => "direct_transfer_script",
		}
	}

	fn args(&self) -> Vec<MoveValue> {
		match self {
			Self::CreateCollectionScript {
				name,
				description,
				uri,
				maximum,
				mutate_setting,
			} => vec![
				MoveValue::String(name.clone()),
				MoveValue::String(description.clone()),
				MoveValue::String(uri.clone()),
				MoveValue::U64(*maximum),
				MoveValue::BoolVector(mutate_setting.to_vec()),
			],
			Self::CreateTokenScript {
				collection,
				name,
				description,
				balance,
				maximum,
				uri,
				royalty_payee,
				royalty_points_denominator,
				royalty_points_numerator,
				mutate_setting,
			} => vec![
				MoveValue::String(collection.clone()),
				MoveValue::String(name.clone()),
				MoveValue::String(description.clone()),
				MoveValue::U64(*balance),
				MoveValue::U64(*maximum),
				MoveValue::String(uri.clone()),
				MoveValue::Address(*royalty_payee),
				MoveValue::U64(*royalty_points_denominator),
				MoveValue::U64(*royalty_points_numerator),
				MoveValue::BoolVector(mutate_setting.to_vec()),
				// No property map.
				MoveValue::StringVector(vec![]),
				MoveValue::BytesVector(vec![]),
				MoveValue::StringVector(vec![]),
			],
			Self::DirectTransferScript { token, amount } => {
				let mut args = token_args(token).to_vec();
				args.push(MoveValue::U64(*amount));
				args
			}
		}
	}
}

fn token_args(token: &TokenId) -> [MoveValue; 4] {
	[
		MoveValue::Address(token.token_data_id.creator),
		MoveValue::String(token.token_data_id.collection.clone()),
		MoveValue::String(token.token_data_id.name.clone()),
		MoveValue::U64(token.property_version),
	]
}

/// Calls on `0x3::token_transfers`.
#[derive(Debug, Clone)]
pub enum TransferCall {
	Offer {
		receiver: AccountAddress,
		token: TokenId,
		amount: u64,
	},
	Claim {
		sender: AccountAddress,
		token: TokenId,
	},
}

impl EntryCall for TransferCall {
	fn function(&self) -> &'static str {
		match self {
			Self::Offer { .. } => "offer_script",
			Self::Claim { .. } => "claim_script",
		}
	}

	fn args(&self) -> Vec<MoveValue> {
		match self {
			Self::Offer {
				receiver,
				token,
				amount,
			} => {
				let mut args = vec![MoveValue::Address(*receiver)];
				args.extend(token_args(token));
				args.push(MoveValue::U64(*amount));
				args
			}
			Self::Claim { sender, token } => {
				let mut args = vec![MoveValue::Address(*sender)];
				args.extend(token_args(token));
				args
			}
		}
	}
}

pub struct TokenClient<'a> {
	token: ModuleClient<'a>,
	transfers: ModuleClient<'a>,
}

impl<'a> TokenClient<'a> {
	pub fn new(rest: &'a RestClient) -> Result<Self> {
		Ok(Self {
			token: ModuleClient::new(rest, ModuleRef::new(AccountAddress::THREE, "token")?),
			transfers: ModuleClient::new(
				rest,
				ModuleRef::new(AccountAddress::THREE, "token_transfers")?,
			),
		})
	}

	/// A collection with no supply cap and immutable metadata.
	pub async fn create_collection(
		&self,
		creator: &LocalAccount,
		name: &str,
		description: &str,
		uri: &str,
	) -> Result<TransactionResult> {
		let call = TokenCall::CreateCollectionScript {
			name: name.to_owned(),
			description: description.to_owned(),
			uri: uri.to_owned(),
			maximum: u64::MAX,
			mutate_setting: [false; 3],
		};
		self.token.execute(creator, &call).await
	}

	/// A token of `supply` units with no royalty, paid to the creator.
	pub async fn create_token(
		&self,
		creator: &LocalAccount,
		collection: &str,
		name: &str,
		description: &str,
		supply: u64,
		uri: &str,
	) -> Result<TransactionResult> {
		let call = TokenCall::CreateTokenScript {
			collection: collection.to_owned(),
			name: name.to_owned(),
			description: description.to_owned(),
			balance: supply,
			maximum: u64::MAX,
			uri: uri.to_owned(),
			royalty_payee: creator.address(),
			royalty_points_denominator: 0,
			royalty_points_numerator: 0,
			mutate_setting: [false; 5],
		};
		self.token.execute(creator, &call).await
	}

	pub async fn offer(
		&self,
		sender: &LocalAccount,
		receiver: AccountAddress,
		token: &TokenId,
		amount: u64,
	) -> Result<TransactionResult> {
		let call = TransferCall::Offer {
			receiver,
			token: token.clone(),
			amount,
		};
		self.transfers.execute(sender, &call).await
	}

	pub async fn claim(
		&self,
		receiver: &LocalAccount,
		sender: AccountAddress,
		token: &TokenId,
	) -> Result<TransactionResult> {
		let call = TransferCall::Claim {
			sender,
			token: token.clone(),
		};
		self.transfers.execute(receiver, &call).await
	}

	/// Move `amount` of `token` in one transaction signed by both sides.
	pub async fn direct_transfer(
		&self,
		sender: &LocalAccount,
		receiver: &LocalAccount,
		token: &TokenId,
		amount: u64,
	) -> Result<TransactionResult> {
		let call = TokenCall::DirectTransferScript {
			token: token.clone(),
			amount,
		};
		self.token
			.execute_multi_agent(sender, &[receiver], &call)
			.await
	}

	/// `CollectionData` for `creator`'s collection `name`.
	pub async fn collection_data(
		&self,
		creator: AccountAddress,
		name: &str,
	) -> Result<Option<Value>> {
		let Some(collections) = self
			.token
			.query_module_resource_as::<Collections>(creator, "Collections")
			.await?
		else {
			return Ok(None);
		};
		self.token
			.rest()
			.fetch_table_item(
				&collections.collection_data.handle,
				STRING_TYPE,
				"0x3::token::CollectionData",
				&name,
			)
			.await
	}

	/// Units of `token` held by `owner`; zero without a token store or entry.
	pub async fn token_balance(&self, owner: AccountAddress, token: &TokenId) -> Result<u64> {
		let Some(store) = self
			.token
			.query_module_resource_as::<TokenStore>(owner, "TokenStore")
			.await?
		else {
			return Ok(0);
		};
		let item = self
			.token
			.rest()
			.fetch_table_item(
				&store.tokens.handle,
				"0x3::token::TokenId",
				"0x3::token::Token",
				token,
			)
			.await?;
		match item {
			Some(value) => {
				let balance: TokenBalance = serde_json::from_value(value)?;
				Ok(balance.amount)
			}
			None => Ok(0),
		}
	}
}
