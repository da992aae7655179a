use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use super::error::Result;
use super::types::number_or_string;
use crate::move_types::AccountAddress;

const MAINNET_INDEXER: &str = "https://wqb9q2zgw7i7-mainnet.hasura.app/v1/graphql";
const TESTNET_INDEXER: &str = "https://knmpjhsurbz8-testnet.hasura.app/v1/graphql";

const ACCOUNT_TOKENS_QUERY: &str = "query AccountTokensData($owner_address: String, $limit: Int, $offset: Int) {
  current_token_ownerships(
    where: {owner_address: {_eq: $owner_address}, amount: {_gt: \"0\"}}
    limit: $limit
    offset: $offset
  ) {
    token_data_id_hash
    name
    collection_name
    table_type
    property_version
    amount
  }
}";

/// A token currently held by an account, as reported by the indexer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OwnedToken {
	pub token_data_id_hash: String,
	pub name: String,
	pub collection_name: String,
	#[serde(default)]
	pub table_type: Option<String>,
	#[serde(deserialize_with = "number_or_string")]
	pub property_version: u64,
	#[serde(deserialize_with = "number_or_string")]
	pub amount: u64,
}

#[derive(Deserialize)]
struct GraphqlResponse {
	data: Option<OwnershipData>,
}

#[derive(Deserialize)]
struct OwnershipData {
	current_token_ownerships: Vec<OwnedToken>,
}

/// GraphQL client for the token-ownership indexer.
#[derive(Debug, Clone)]
pub struct IndexerClient {
	url: Url,
	http: reqwest::Client,
}

impl IndexerClient {
	pub fn new(url: Url) -> Self {
		Self {
			url,
			http: reqwest::Client::new(),
		}
	}

	/// The hosted indexer for `network`; anything but mainnet uses testnet.
	pub fn for_network(network: &str) -> Result<Self> {
		let url = match network {
			"mainnet" => MAINNET_INDEXER,
			_ => TESTNET_INDEXER,
		};
		Ok(Self::new(url.parse()?))
	}

	/// Tokens with a positive balance held by `owner`. A non-200 answer
	/// yields an empty list.
	pub async fn owned_tokens(&self, owner: AccountAddress, limit: u32) -> Result<Vec<OwnedToken>> {
		let body = json!({
			"operationName": "AccountTokensData",
			"variables": {
				"owner_address": owner.to_string(),
				"limit": limit,
				"offset": 0,
			},
			"query": ACCOUNT_TOKENS_QUERY,
		});
		debug!(url = %self.url, %owner, "querying owned tokens");
		let response = self.http.post(self.url.clone()).json(&body).send().await?;
		if response.status() != reqwest::StatusCode::OK {
			return Ok(Vec::new());
		}
		let parsed: GraphqlResponse = response.json().await?;
		Ok(parsed
			.data
			.map(|d| d.current_token_ownerships)
			.unwrap_or_default())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use httpmock::prelude::*;

	#[tokio::test]
	async fn owned_tokens_are_parsed() {
		let server = MockServer::start_async().await;
		server
			.mock_async(|when, then| {
				when.method(POST).path("/v1/graphql").body_contains("AccountTokensData");
				then.status(200).json_body(serde_json::json!({
					"data": {
						"current_token_ownerships": [{
							"token_data_id_hash": "0x11",
							"name": "Kepler Passport #1",
							"collection_name": "Kepler Passport",
							"table_type": "0x3::token::TokenStore",
							"property_version": 0,
							"amount": "1"
						}]
					}
				}));
			})
			.await;

		let client = IndexerClient::new(server.url("/v1/graphql").parse().unwrap());
		let tokens = client.owned_tokens(AccountAddress::ONE, 100).await.unwrap();
		assert_eq!(tokens.len(), 1);
		assert_eq!(tokens[0].collection_name, "Kepler Passport");
		assert_eq!(tokens[0].amount, 1);
	}

	#[tokio::test]
	async fn indexer_errors_yield_no_tokens() {
		let server = MockServer::start_async().await;
		server
			.mock_async(|when, then| {
				when.method(POST);
				then.status(503);
			})
			.await;

		let client = IndexerClient::new(server.url("/v1/graphql").parse().unwrap());
		assert!(client.owned_tokens(AccountAddress::ONE, 100).await.unwrap().is_empty());
	}

	#[test]
	fn network_selects_endpoint() {
		let c = IndexerClient::for_network("mainnet").unwrap();
		assert_eq!(c.url.as_str(), MAINNET_INDEXER);
		let c = IndexerClient::for_network("devnet").unwrap();
		assert_eq!(c.url.as_str(), TESTNET_INDEXER);
	}
}
