pub mod error;
pub mod indexer;
pub mod types;

use std::time::{Duration, Instant};

use reqwest::{header::CONTENT_TYPE, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

pub use error::{RestError, Result};
pub use types::{
	AccountData, LedgerInfo, ModuleMetadata, PendingTransaction, Resource, SignerCapability,
	TableRef, TransactionRecord, TransactionResult, TransactionStatus,
};

use crate::account::LocalAccount;
use crate::move_types::AccountAddress;
use crate::transaction::{
	AccountAuthenticator, Ed25519Authenticator, MultiAgentRawTransaction, RawTransaction,
	SignedTransaction, TransactionAuthenticator, TransactionPayload,
};
use types::TableItemRequest;

const BCS_SIGNED_TRANSACTION: &str = "application/x.aptos.signed_transaction+bcs";
const USER_AGENT: &str = concat!("kepler-scripts/", env!("CARGO_PKG_VERSION"));

/// Gas, expiration and confirmation settings applied to every submission.
#[derive(Debug, Clone)]
pub struct TransactionOptions {
	pub max_gas_amount: u64,
	pub gas_unit_price: u64,
	/// Seconds from now until the transaction expires.
	pub expiration_secs: u64,
	pub poll_interval: Duration,
	pub confirm_timeout: Duration,
	pub request_timeout: Duration,
}

impl Default for TransactionOptions {
	fn default() -> Self {
		Self {
			max_gas_amount: 200_000,
			gas_unit_price: 100,
			expiration_secs: 20,
			poll_interval: Duration::from_millis(500),
			confirm_timeout: Duration::from_secs(30),
			request_timeout: Duration::from_secs(10),
		}
	}
}

/// Client for a fullnode REST endpoint: read queries plus the
/// build/sign/submit/confirm pipeline.
///
/// Not-found responses on read paths are expected outcomes and come back
/// as `None`, an empty list or [`TransactionStatus::Pending`]. Every other
/// non-success status is returned as [`RestError::Api`] with the body
/// attached; nothing is retried.
#[derive(Debug, Clone)]
pub struct RestClient {
	base_url: Url,
	http: reqwest::Client,
	options: TransactionOptions,
}

impl RestClient {
	/// `base_url` must already carry the API version (`.../v1`); request
	/// paths are appended to it unchanged. [`Profile::rest_url`] adds the
	/// version to bare hosts.
	///
	/// [`Profile::rest_url`]: crate::config::Profile::rest_url
	pub fn new(base_url: Url) -> Result<Self> {
		Self::with_options(base_url, TransactionOptions::default())
	}

	pub fn with_options(base_url: Url, options: TransactionOptions) -> Result<Self> {
		if base_url.cannot_be_a_base() {
			return Err(RestError::BaseUrl(base_url.to_string()));
		}
		let http = reqwest::Client::builder()
			.timeout(options.request_timeout)
			.user_agent(USER_AGENT)
			.build()?;
		Ok(Self {
			base_url,
			http,
			options,
		})
	}

	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	pub fn options(&self) -> &TransactionOptions {
		&self.options
	}

	/// `base_url` with `segments` appended, each percent-encoded.
	fn endpoint(&self, segments: &[&str]) -> Result<Url> {
		let mut url = self.base_url.clone();
		url.path_segments_mut()
			.map_err(|_| RestError::BaseUrl(self.base_url.to_string()))?
			.pop_if_empty()
			.extend(segments);
		Ok(url)
	}

	/// GET `url`; `Ok(None)` on 404, `RestError::Api` on any other failure.
	async fn get_optional<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>> {
		debug!(%url, "GET");
		let response = self.http.get(url).send().await?;
		let status = response.status();
		if status == StatusCode::NOT_FOUND {
			return Ok(None);
		}
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(RestError::Api { status, body });
		}
		Ok(Some(response.json().await?))
	}

	async fn get_required<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
		match self.get_optional(url.clone()).await? {
			Some(value) => Ok(value),
			None => Err(RestError::Api {
				status: StatusCode::NOT_FOUND,
				body: format!("{url} not found"),
			}),
		}
	}

	// -- Chain state --

	pub async fn ledger_info(&self) -> Result<LedgerInfo> {
		self.get_required(self.base_url.clone()).await
	}

	pub async fn account(&self, address: AccountAddress) -> Result<AccountData> {
		let url = self.endpoint(&["accounts", &address.to_string()])?;
		self.get_required(url).await
	}

	pub async fn account_sequence_number(&self, address: AccountAddress) -> Result<u64> {
		Ok(self.account(address).await?.sequence_number)
	}

	// -- Read queries --

	pub async fn fetch_transaction(&self, hash: &str) -> Result<TransactionStatus> {
		let url = self.endpoint(&["transactions", hash])?;
		let status = match self.get_optional::<TransactionRecord>(url).await? {
			Some(record) if !record.is_pending() => TransactionStatus::Committed(record),
			_ => TransactionStatus::Pending,
		};
		Ok(status)
	}

	pub async fn fetch_resource(
		&self,
		address: AccountAddress,
		resource_type: &str,
	) -> Result<Option<Resource>> {
		let url = self.endpoint(&["accounts", &address.to_string(), "resource", resource_type])?;
		self.get_optional(url).await
	}

	/// [`fetch_resource`](Self::fetch_resource) with `data` decoded into `T`.
	pub async fn fetch_resource_as<T: DeserializeOwned>(
		&self,
		address: AccountAddress,
		resource_type: &str,
	) -> Result<Option<T>> {
		self.fetch_resource(address, resource_type)
			.await?
			.map(|r| r.data_as())
			.transpose()
	}

	pub async fn fetch_modules(&self, address: AccountAddress) -> Result<Vec<ModuleMetadata>> {
		let url = self.endpoint(&["accounts", &address.to_string(), "modules"])?;
		Ok(self.get_optional(url).await?.unwrap_or_default())
	}

	/// Look up a table entry. Any non-200 answer is treated as a miss.
	pub async fn fetch_table_item<K: Serialize>(
		&self,
		handle: &str,
		key_type: &str,
		value_type: &str,
		key: &K,
	) -> Result<Option<Value>> {
		let url = self.endpoint(&["tables", handle, "item"])?;
		let body = TableItemRequest {
			key_type,
			value_type,
			key,
		};
		debug!(%url, key_type, value_type, "POST table item");
		let response = self.http.post(url).json(&body).send().await?;
		if response.status() != StatusCode::OK {
			return Ok(None);
		}
		Ok(Some(response.json().await?))
	}

	// -- Write path --

	/// Assemble a raw transaction for `sender` at its current sequence number.
	pub async fn build_transaction(
		&self,
		sender: AccountAddress,
		payload: TransactionPayload,
	) -> Result<RawTransaction> {
		let sequence_number = self.account_sequence_number(sender).await?;
		let chain_id = self.ledger_info().await?.chain_id;
		let expiration_timestamp_secs =
			chrono::Utc::now().timestamp().max(0) as u64 + self.options.expiration_secs;

		Ok(RawTransaction {
			sender,
			sequence_number,
			payload,
			max_gas_amount: self.options.max_gas_amount,
			gas_unit_price: self.options.gas_unit_price,
			expiration_timestamp_secs,
			chain_id,
		})
	}

	pub fn sign_transaction(
		&self,
		account: &LocalAccount,
		raw_txn: RawTransaction,
	) -> Result<SignedTransaction> {
		let message = raw_txn.signing_message()?;
		Ok(SignedTransaction {
			raw_txn,
			authenticator: TransactionAuthenticator::Ed25519(ed25519_authenticator(
				account, &message,
			)?),
		})
	}

	/// Sign `raw_txn` as `sender` together with every account in `secondary`.
	pub fn sign_multi_agent_transaction(
		&self,
		sender: &LocalAccount,
		secondary: &[&LocalAccount],
		raw_txn: RawTransaction,
	) -> Result<SignedTransaction> {
		let with_data = MultiAgentRawTransaction {
			raw_txn,
			secondary_signer_addresses: secondary.iter().map(|a| a.address()).collect(),
		};
		let message = with_data.signing_message()?;
		let sender = AccountAuthenticator::Ed25519(ed25519_authenticator(sender, &message)?);
		let secondary_signers = secondary
			.iter()
			.map(|a| ed25519_authenticator(a, &message).map(AccountAuthenticator::Ed25519))
			.collect::<Result<Vec<_>>>()?;
		Ok(SignedTransaction {
			raw_txn: with_data.raw_txn,
			authenticator: TransactionAuthenticator::MultiAgent {
				sender,
				secondary_signer_addresses: with_data.secondary_signer_addresses,
				secondary_signers,
			},
		})
	}

	/// Submit a signed transaction; the node's rejection body is returned
	/// verbatim on failure.
	pub async fn submit(&self, txn: &SignedTransaction) -> Result<PendingTransaction> {
		let url = self.endpoint(&["transactions"])?;
		let response = self
			.http
			.post(url)
			.header(CONTENT_TYPE, BCS_SIGNED_TRANSACTION)
			.body(txn.to_bcs()?)
			.send()
			.await?;
		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(RestError::Rejected { status, body });
		}
		Ok(response.json().await?)
	}

	/// Poll until the transaction is committed or the confirm timeout elapses.
	pub async fn wait_for_transaction(&self, hash: &str) -> Result<TransactionRecord> {
		let start = Instant::now();
		loop {
			if let TransactionStatus::Committed(record) = self.fetch_transaction(hash).await? {
				return Ok(record);
			}
			if start.elapsed() >= self.options.confirm_timeout {
				return Err(RestError::Timeout {
					hash: hash.to_owned(),
				});
			}
			tokio::time::sleep(self.options.poll_interval).await;
		}
	}

	/// Build, sign, submit and wait. The returned result is terminal; an
	/// on-chain abort comes back with `success == false` (see
	/// [`TransactionResult::ensure_success`]).
	pub async fn submit_and_confirm(
		&self,
		account: &LocalAccount,
		payload: TransactionPayload,
		show_diagnostics: bool,
	) -> Result<TransactionResult> {
		let function = payload.function_id();
		let raw_txn = self.build_transaction(account.address(), payload).await?;
		debug!(%function, sequence_number = raw_txn.sequence_number, "submitting");
		let signed = self.sign_transaction(account, raw_txn)?;
		self.confirm(&signed, show_diagnostics).await
	}

	/// [`submit_and_confirm`](Self::submit_and_confirm) for a payload that
	/// `secondary` accounts must co-sign, such as a direct token transfer.
	pub async fn submit_multi_agent_and_confirm(
		&self,
		sender: &LocalAccount,
		secondary: &[&LocalAccount],
		payload: TransactionPayload,
		show_diagnostics: bool,
	) -> Result<TransactionResult> {
		let function = payload.function_id();
		let raw_txn = self.build_transaction(sender.address(), payload).await?;
		debug!(
			%function,
			sequence_number = raw_txn.sequence_number,
			secondary_signers = secondary.len(),
			"submitting multi-agent"
		);
		let signed = self.sign_multi_agent_transaction(sender, secondary, raw_txn)?;
		self.confirm(&signed, show_diagnostics).await
	}

	async fn confirm(
		&self,
		signed: &SignedTransaction,
		show_diagnostics: bool,
	) -> Result<TransactionResult> {
		let function = signed.raw_txn.payload.function_id();
		let pending = self.submit(signed).await?;
		let result = TransactionResult::from(self.wait_for_transaction(&pending.hash).await?);
		if show_diagnostics {
			info!(
				%function,
				hash = %result.hash,
				success = result.success,
				vm_status = %result.vm_status,
				"transaction confirmed"
			);
		}
		Ok(result)
	}
}

fn ed25519_authenticator(account: &LocalAccount, message: &[u8]) -> Result<Ed25519Authenticator> {
	let (public_key, signature) = account
		.sign(message)
		.ok_or(RestError::MissingKey(account.address()))?;
	Ok(Ed25519Authenticator {
		public_key,
		signature,
	})
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crate::move_types::FunctionId;
	use crate::transaction::EntryFunction;
	use httpmock::prelude::*;
	use serde_json::json;

	pub(crate) const TEST_KEY: &str =
		"0x05abd7c927e66846e537a4385fdc12064c8a14fb75068192b87c397f9b1936b5";

	pub(crate) fn fast_client(server: &MockServer) -> RestClient {
		let options = TransactionOptions {
			poll_interval: Duration::from_millis(20),
			confirm_timeout: Duration::from_secs(2),
			..TransactionOptions::default()
		};
		RestClient::with_options(server.base_url().parse().unwrap(), options).unwrap()
	}

	/// Mocks for the account and ledger lookups made while building a transaction.
	pub(crate) async fn mock_chain_state(server: &MockServer, account: &LocalAccount) {
		let path = format!("/accounts/{}", account.address());
		server
			.mock_async(|when, then| {
				when.method(GET).path(path);
				then.status(200).json_body(json!({
					"sequence_number": "7",
					"authentication_key": account.address().to_string(),
				}));
			})
			.await;
		server
			.mock_async(|when, then| {
				when.method(GET).path("/");
				then.status(200).json_body(json!({
					"chain_id": 4,
					"epoch": "1",
					"ledger_version": "100",
					"ledger_timestamp": "1700000000000000",
				}));
			})
			.await;
	}

	pub(crate) fn committed(hash: &str, success: bool) -> Value {
		let vm_status = if success {
			"Executed successfully"
		} else {
			"Move abort in 0xa::m: 0x1"
		};
		json!({
			"type": "user_transaction",
			"hash": hash,
			"version": "101",
			"success": success,
			"vm_status": vm_status,
		})
	}

	/// Accept every submission as `hash` and report it committed successfully.
	/// The returned mock counts POSTs.
	pub(crate) async fn mock_submissions<'a>(server: &'a MockServer, hash: &str) -> httpmock::Mock<'a> {
		let submit = server
			.mock_async(|when, then| {
				when.method(POST).path("/transactions");
				then.status(202).json_body(json!({ "hash": hash }));
			})
			.await;
		let path = format!("/transactions/{hash}");
		server
			.mock_async(|when, then| {
				when.method(GET).path(path);
				then.status(200).json_body(committed(hash, true));
			})
			.await;
		submit
	}

	fn register_payload() -> TransactionPayload {
		let id: FunctionId = "0x1::managed_coin::register".parse().unwrap();
		TransactionPayload::EntryFunction(EntryFunction::new(
			id.module,
			id.name,
			vec!["0x1::my_coin::T".parse().unwrap()],
			vec![],
		))
	}

	#[tokio::test]
	async fn missing_resource_is_none() {
		let server = MockServer::start_async().await;
		server
			.mock_async(|when, then| {
				when.method(GET).path_contains("/resource/");
				then.status(404).body(r#"{"error_code":"resource_not_found"}"#);
			})
			.await;

		let client = fast_client(&server);
		let resource = client
			.fetch_resource(AccountAddress::ONE, "0x1::coin::CoinStore<0x1::my_coin::T>")
			.await
			.unwrap();
		assert!(resource.is_none());
	}

	#[tokio::test]
	async fn server_errors_are_fatal_with_body() {
		let server = MockServer::start_async().await;
		server
			.mock_async(|when, then| {
				when.method(GET).path_contains("/resource/");
				then.status(500).body("boom");
			})
			.await;

		let client = fast_client(&server);
		let err = client
			.fetch_resource(AccountAddress::ONE, "0x1::account::Account")
			.await
			.unwrap_err();
		match err {
			RestError::Api { status, body } => {
				assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
				assert_eq!(body, "boom");
			}
			other => panic!("unexpected {other:?}"),
		}
	}

	#[test]
	fn endpoint_segments_are_percent_encoded() {
		let client = RestClient::new("https://fullnode.devnet.aptoslabs.com/v1/".parse().unwrap()).unwrap();
		let url = client
			.endpoint(&["accounts", "0x1", "resource", "0x1::coin::CoinStore<0x1::my_coin::T>"])
			.unwrap();
		assert_eq!(
			url.as_str(),
			"https://fullnode.devnet.aptoslabs.com/v1/accounts/0x1/resource/0x1::coin::CoinStore%3C0x1::my_coin::T%3E"
		);

		let bare = RestClient::new("https://fullnode.devnet.aptoslabs.com".parse().unwrap()).unwrap();
		assert_eq!(
			bare.endpoint(&["transactions", "0xabc"]).unwrap().as_str(),
			"https://fullnode.devnet.aptoslabs.com/transactions/0xabc"
		);
	}

	#[tokio::test]
	async fn resource_is_returned() {
		let server = MockServer::start_async().await;
		let mock = server
			.mock_async(|when, then| {
				when.method(GET).path_contains("CoinStore");
				then.status(200).json_body(json!({
					"type": "0x1::coin::CoinStore<0x1::my_coin::T>",
					"data": { "coin": { "value": "5" } }
				}));
			})
			.await;

		let client = fast_client(&server);
		let resource = client
			.fetch_resource(AccountAddress::ONE, "0x1::coin::CoinStore<0x1::my_coin::T>")
			.await
			.unwrap()
			.unwrap();
		assert_eq!(resource.data["coin"]["value"], "5");
		mock.assert_async().await;
	}

	#[tokio::test]
	async fn missing_modules_is_empty() {
		let server = MockServer::start_async().await;
		server
			.mock_async(|when, then| {
				when.method(GET).path_contains("/modules");
				then.status(404);
			})
			.await;

		let client = fast_client(&server);
		assert!(client.fetch_modules(AccountAddress::ONE).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn modules_are_listed() {
		let server = MockServer::start_async().await;
		server
			.mock_async(|when, then| {
				when.method(GET).path_contains("/modules");
				then.status(200).json_body(json!([{
					"bytecode": "0xa11ceb0b",
					"abi": {
						"address": "0x1",
						"name": "coin",
						"friends": [],
						"exposed_functions": [
							{ "name": "transfer", "visibility": "public", "is_entry": true }
						],
						"structs": []
					}
				}]));
			})
			.await;

		let client = fast_client(&server);
		let modules = client.fetch_modules(AccountAddress::ONE).await.unwrap();
		assert_eq!(modules.len(), 1);
		let abi = modules[0].abi.as_ref().unwrap();
		assert_eq!(abi.name, "coin");
		assert!(abi.exposed_functions[0].is_entry);
	}

	#[tokio::test]
	async fn table_miss_is_none() {
		let server = MockServer::start_async().await;
		let mock = server
			.mock_async(|when, then| {
				when.method(POST)
					.path("/tables/0x99/item")
					.json_body(json!({
						"key_type": "0x1::string::String",
						"value_type": "address",
						"key": "Kepler Passport",
					}));
				then.status(404).body(r#"{"error_code":"table_item_not_found"}"#);
			})
			.await;

		let client = fast_client(&server);
		let item = client
			.fetch_table_item("0x99", "0x1::string::String", "address", &"Kepler Passport")
			.await
			.unwrap();
		assert!(item.is_none());
		mock.assert_async().await;
	}

	#[tokio::test]
	async fn unindexed_transaction_is_pending() {
		let server = MockServer::start_async().await;
		server
			.mock_async(|when, then| {
				when.method(GET).path("/transactions/0xabc");
				then.status(404);
			})
			.await;

		let client = fast_client(&server);
		let status = client.fetch_transaction("0xabc").await.unwrap();
		assert!(matches!(status, TransactionStatus::Pending));
	}

	#[tokio::test]
	async fn submit_and_confirm_polls_through_pending() {
		let server = MockServer::start_async().await;
		let account = LocalAccount::from_private_key_hex(TEST_KEY).unwrap();
		mock_chain_state(&server, &account).await;

		let submit = server
			.mock_async(|when, then| {
				when.method(POST)
					.path("/transactions")
					.header("content-type", BCS_SIGNED_TRANSACTION);
				then.status(202).json_body(json!({ "hash": "0xfeed" }));
			})
			.await;
		let pending = server
			.mock_async(|when, then| {
				when.method(GET).path("/transactions/0xfeed");
				then.status(404);
			})
			.await;

		let client = fast_client(&server);
		let task = {
			let client = client.clone();
			let account = account.clone();
			tokio::spawn(async move {
				client
					.submit_and_confirm(&account, register_payload(), true)
					.await
			})
		};

		// Let the pipeline observe the not-yet-indexed state before it lands.
		tokio::time::sleep(Duration::from_millis(150)).await;
		assert!(pending.hits_async().await >= 1);
		pending.delete_async().await;
		server
			.mock_async(|when, then| {
				when.method(GET).path("/transactions/0xfeed");
				then.status(200).json_body(committed("0xfeed", true));
			})
			.await;

		let result = task.await.unwrap().unwrap();
		assert_eq!(result.hash, "0xfeed");
		assert!(result.success);
		assert_eq!(result.version, Some(101));
		submit.assert_async().await;
	}

	#[tokio::test]
	async fn aborted_transactions_return_normally() {
		let server = MockServer::start_async().await;
		let account = LocalAccount::from_private_key_hex(TEST_KEY).unwrap();
		mock_chain_state(&server, &account).await;
		server
			.mock_async(|when, then| {
				when.method(POST).path("/transactions");
				then.status(202).json_body(json!({ "hash": "0xdead" }));
			})
			.await;
		server
			.mock_async(|when, then| {
				when.method(GET).path("/transactions/0xdead");
				then.status(200).json_body(committed("0xdead", false));
			})
			.await;

		let client = fast_client(&server);
		let result = client
			.submit_and_confirm(&account, register_payload(), false)
			.await
			.unwrap();
		assert!(!result.success);
		assert!(matches!(result.ensure_success(), Err(RestError::Aborted { .. })));
	}

	#[tokio::test]
	async fn rejection_body_is_surfaced() {
		let server = MockServer::start_async().await;
		let account = LocalAccount::from_private_key_hex(TEST_KEY).unwrap();
		mock_chain_state(&server, &account).await;
		server
			.mock_async(|when, then| {
				when.method(POST).path("/transactions");
				then.status(400).body(r#"{"message":"SEQUENCE_NUMBER_TOO_OLD"}"#);
			})
			.await;

		let client = fast_client(&server);
		let err = client
			.submit_and_confirm(&account, register_payload(), false)
			.await
			.unwrap_err();
		match err {
			RestError::Rejected { body, .. } => assert!(body.contains("SEQUENCE_NUMBER_TOO_OLD")),
			other => panic!("unexpected {other:?}"),
		}
	}

	#[tokio::test]
	async fn confirmation_times_out() {
		let server = MockServer::start_async().await;
		let account = LocalAccount::from_private_key_hex(TEST_KEY).unwrap();
		mock_chain_state(&server, &account).await;
		server
			.mock_async(|when, then| {
				when.method(POST).path("/transactions");
				then.status(202).json_body(json!({ "hash": "0xslow" }));
			})
			.await;
		server
			.mock_async(|when, then| {
				when.method(GET).path("/transactions/0xslow");
				then.status(200)
					.json_body(json!({ "type": "pending_transaction", "hash": "0xslow" }));
			})
			.await;

		let options = TransactionOptions {
			poll_interval: Duration::from_millis(10),
			confirm_timeout: Duration::from_millis(100),
			..TransactionOptions::default()
		};
		let client = RestClient::with_options(server.base_url().parse().unwrap(), options).unwrap();
		let err = client
			.submit_and_confirm(&account, register_payload(), false)
			.await
			.unwrap_err();
		assert!(matches!(err, RestError::Timeout { hash } if hash == "0xslow"));
	}

	#[tokio::test]
	async fn watch_only_account_cannot_submit() {
		let server = MockServer::start_async().await;
		let account = LocalAccount::watch_only(AccountAddress::ONE);
		mock_chain_state(&server, &account).await;

		let client = fast_client(&server);
		let err = client
			.submit_and_confirm(&account, register_payload(), false)
			.await
			.unwrap_err();
		assert!(matches!(err, RestError::MissingKey(a) if a == AccountAddress::ONE));
	}
}
