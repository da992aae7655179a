use ed25519_dalek::VerifyingKey;
use serde::ser::{SerializeStruct, SerializeStructVariant};
use serde::{Serialize, Serializer};
use sha3::{Digest, Sha3_256};

use crate::move_types::{AccountAddress, FunctionId, Identifier, ModuleId, TypeTag};

const RAW_TRANSACTION_SALT: &[u8] = b"APTOS::RawTransaction";
const RAW_TRANSACTION_WITH_DATA_SALT: &[u8] = b"APTOS::RawTransactionWithData";

/// A call to a public entry function, arguments already BCS-encoded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EntryFunction {
	module: ModuleId,
	function: Identifier,
	ty_args: Vec<TypeTag>,
	args: Vec<Vec<u8>>,
}

impl EntryFunction {
	pub fn new(
		module: ModuleId,
		function: Identifier,
		ty_args: Vec<TypeTag>,
		args: Vec<Vec<u8>>,
	) -> Self {
		Self {
			module,
			function,
			ty_args,
			args,
		}
	}

	pub fn function_id(&self) -> FunctionId {
		FunctionId {
			module: self.module.clone(),
			name: self.function.clone(),
		}
	}

	pub fn ty_args(&self) -> &[TypeTag] {
		&self.ty_args
	}

	pub fn args(&self) -> &[Vec<u8>] {
		&self.args
	}
}

/// Only entry-function payloads are produced by these scripts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionPayload {
	EntryFunction(EntryFunction),
}

impl TransactionPayload {
	pub fn function_id(&self) -> FunctionId {
		match self {
			Self::EntryFunction(f) => f.function_id(),
		}
	}
}

impl Serialize for TransactionPayload {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self {
			// Variants 0 (Script) and 1 (ModuleBundle) are never sent.
			Self::EntryFunction(f) => {
				serializer.serialize_newtype_variant("TransactionPayload", 2, "EntryFunction", f)
			}
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RawTransaction {
	pub sender: AccountAddress,
	pub sequence_number: u64,
	pub payload: TransactionPayload,
	pub max_gas_amount: u64,
	pub gas_unit_price: u64,
	pub expiration_timestamp_secs: u64,
	pub chain_id: u8,
}

impl RawTransaction {
	/// `sha3_256("APTOS::RawTransaction") || bcs(self)`, the bytes an
	/// Ed25519 authenticator signs.
	pub fn signing_message(&self) -> Result<Vec<u8>, bcs::Error> {
		let mut message = Sha3_256::digest(RAW_TRANSACTION_SALT).to_vec();
		message.extend(bcs::to_bytes(self)?);
		Ok(message)
	}
}

/// `RawTransactionWithData::MultiAgent`: the transaction plus the other
/// accounts that must sign it. Sender and secondary signers all sign this.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultiAgentRawTransaction {
	pub raw_txn: RawTransaction,
	pub secondary_signer_addresses: Vec<AccountAddress>,
}

impl MultiAgentRawTransaction {
	/// `sha3_256("APTOS::RawTransactionWithData") || bcs(self)`
	pub fn signing_message(&self) -> Result<Vec<u8>, bcs::Error> {
		let mut message = Sha3_256::digest(RAW_TRANSACTION_WITH_DATA_SALT).to_vec();
		message.extend(bcs::to_bytes(self)?);
		Ok(message)
	}
}

impl Serialize for MultiAgentRawTransaction {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut sv =
			serializer.serialize_struct_variant("RawTransactionWithData", 0, "MultiAgent", 2)?;
		sv.serialize_field("raw_txn", &self.raw_txn)?;
		sv.serialize_field("secondary_signer_addresses", &self.secondary_signer_addresses)?;
		sv.end()
	}
}

/// An Ed25519 public key and signature, both length-prefixed byte strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ed25519Authenticator {
	pub public_key: VerifyingKey,
	pub signature: [u8; 64],
}

impl Serialize for Ed25519Authenticator {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut st = serializer.serialize_struct("Ed25519Authenticator", 2)?;
		st.serialize_field("public_key", &self.public_key.to_bytes().to_vec())?;
		st.serialize_field("signature", &self.signature.to_vec())?;
		st.end()
	}
}

/// Per-account signature inside a multi-agent authenticator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum AccountAuthenticator {
	Ed25519(Ed25519Authenticator),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionAuthenticator {
	Ed25519(Ed25519Authenticator),
	MultiAgent {
		sender: AccountAuthenticator,
		secondary_signer_addresses: Vec<AccountAddress>,
		secondary_signers: Vec<AccountAuthenticator>,
	},
}

impl Serialize for TransactionAuthenticator {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		// Variant 1 (MultiEd25519) is never produced.
		match self {
			Self::Ed25519(auth) => {
				serializer.serialize_newtype_variant("TransactionAuthenticator", 0, "Ed25519", auth)
			}
			Self::MultiAgent {
				sender,
				secondary_signer_addresses,
				secondary_signers,
			} => {
				let mut sv = serializer.serialize_struct_variant(
					"TransactionAuthenticator",
					2,
					"MultiAgent",
					3,
				)?;
				sv.serialize_field("sender", sender)?;
				sv.serialize_field("secondary_signer_addresses", secondary_signer_addresses)?;
				sv.serialize_field("secondary_signers", secondary_signers)?;
				sv.end()
			}
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SignedTransaction {
	pub raw_txn: RawTransaction,
	pub authenticator: TransactionAuthenticator,
}

impl SignedTransaction {
	pub fn to_bcs(&self) -> Result<Vec<u8>, bcs::Error> {
		bcs::to_bytes(self)
	}
}
