use std::{fmt::Display, str::FromStr};

use serde::{de, de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::error::{RestError, Result};

/// The REST API renders u64 values as decimal strings.
pub fn deserialize_from_string<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: FromStr,
	T::Err: Display,
{
	let s = String::deserialize(deserializer)?;
	s.parse::<T>().map_err(de::Error::custom)
}

pub fn deserialize_option_from_string<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
	D: Deserializer<'de>,
	T: FromStr,
	T::Err: Display,
{
	Option::<String>::deserialize(deserializer)?
		.map(|s| s.parse::<T>().map_err(de::Error::custom))
		.transpose()
}

/// Accepts a u64 rendered either as a JSON number or a decimal string.
pub fn number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Raw {
		Number(u64),
		Text(String),
	}
	match Raw::deserialize(deserializer)? {
		Raw::Number(n) => Ok(n),
		Raw::Text(s) => s.parse().map_err(de::Error::custom),
	}
}

/// Ledger index returned by `GET /`.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerInfo {
	pub chain_id: u8,
	#[serde(deserialize_with = "deserialize_from_string")]
	pub ledger_version: u64,
	#[serde(deserialize_with = "deserialize_from_string")]
	pub ledger_timestamp: u64,
}

/// `GET accounts/{address}`
#[derive(Debug, Clone, Deserialize)]
pub struct AccountData {
	#[serde(deserialize_with = "deserialize_from_string")]
	pub sequence_number: u64,
	pub authentication_key: String,
}

/// Response to a successful `POST transactions`.
#[derive(Debug, Clone, Deserialize)]
pub struct PendingTransaction {
	pub hash: String,
}

/// `GET transactions/{hash}` once the transaction has been indexed.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionRecord {
	#[serde(rename = "type")]
	pub kind: String,
	pub hash: String,
	#[serde(default)]
	pub success: Option<bool>,
	#[serde(default)]
	pub vm_status: Option<String>,
	#[serde(default, deserialize_with = "deserialize_option_from_string")]
	pub version: Option<u64>,
}

impl TransactionRecord {
	pub fn is_pending(&self) -> bool {
		self.kind == "pending_transaction"
	}
}

#[derive(Debug, Clone)]
pub enum TransactionStatus {
	/// Not yet indexed or still in the mempool.
	Pending,
	Committed(TransactionRecord),
}

/// Terminal outcome of [`RestClient::submit_and_confirm`](super::RestClient::submit_and_confirm).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionResult {
	pub hash: String,
	pub success: bool,
	pub vm_status: String,
	pub version: Option<u64>,
}

impl From<TransactionRecord> for TransactionResult {
	fn from(record: TransactionRecord) -> Self {
		Self {
			hash: record.hash,
			success: record.success.unwrap_or(false),
			vm_status: record.vm_status.unwrap_or_default(),
			version: record.version,
		}
	}
}

impl TransactionResult {
	/// Turn an on-chain abort into [`RestError::Aborted`].
	pub fn ensure_success(self) -> Result<Self> {
		if self.success {
			Ok(self)
		} else {
			Err(RestError::Aborted {
				hash: self.hash,
				vm_status: self.vm_status,
			})
		}
	}
}

/// `GET accounts/{address}/resource/{type}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
	#[serde(rename = "type")]
	pub resource_type: String,
	pub data: Value,
}

impl Resource {
	pub fn data_as<T: DeserializeOwned>(&self) -> Result<T> {
		Ok(T::deserialize(&self.data)?)
	}
}

/// `GET accounts/{address}/modules`
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleMetadata {
	pub bytecode: String,
	#[serde(default)]
	pub abi: Option<ModuleAbi>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModuleAbi {
	pub address: String,
	pub name: String,
	#[serde(default)]
	pub friends: Vec<String>,
	#[serde(default)]
	pub exposed_functions: Vec<ExposedFunction>,
	#[serde(default)]
	pub structs: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExposedFunction {
	pub name: String,
	pub visibility: String,
	#[serde(default)]
	pub is_entry: bool,
}

/// A `0x1::table::Table` field inside a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
	pub handle: String,
}

/// `0x1::account::SignerCapability` (and similar `{ account }` wrappers).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerCapability {
	pub account: String,
}

/// Body of `POST tables/{handle}/item`.
#[derive(Debug, Serialize)]
pub(crate) struct TableItemRequest<'a, K: Serialize> {
	pub key_type: &'a str,
	pub value_type: &'a str,
	pub key: &'a K,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn committed_record_parses() {
		let json = r#"{
			"type": "user_transaction",
			"hash": "0xabc",
			"version": "42",
			"success": true,
			"vm_status": "Executed successfully",
			"gas_used": "9"
		}"#;
		let record: TransactionRecord = serde_json::from_str(json).unwrap();
		assert!(!record.is_pending());
		let result = TransactionResult::from(record);
		assert_eq!(result.version, Some(42));
		assert!(result.success);
		assert!(result.ensure_success().is_ok());
	}

	#[test]
	fn pending_record_has_no_outcome() {
		let json = r#"{ "type": "pending_transaction", "hash": "0xabc" }"#;
		let record: TransactionRecord = serde_json::from_str(json).unwrap();
		assert!(record.is_pending());
		assert!(record.success.is_none());
		assert!(record.version.is_none());
	}

	#[test]
	fn aborted_result_surfaces_vm_status() {
		let result = TransactionResult {
			hash: "0x1".into(),
			success: false,
			vm_status: "Move abort: 0x3".into(),
			version: Some(1),
		};
		match result.ensure_success() {
			Err(RestError::Aborted { vm_status, .. }) => assert_eq!(vm_status, "Move abort: 0x3"),
			other => panic!("unexpected {other:?}"),
		}
	}

	#[test]
	fn resource_data_is_typed_on_demand() {
		#[derive(Deserialize)]
		struct Store {
			pools: TableRef,
			#[serde(deserialize_with = "deserialize_from_string")]
			total: u64,
		}
		let resource: Resource = serde_json::from_value(serde_json::json!({
			"type": "0xa::farm::GlobalStorage",
			"data": { "pools": { "handle": "0x77" }, "total": "12" }
		}))
		.unwrap();
		let store: Store = resource.data_as().unwrap();
		assert_eq!(store.pools.handle, "0x77");
		assert_eq!(store.total, 12);
	}
}
