use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use sha3::{Digest, Sha3_256};

use crate::move_types::AccountAddress;

/// Authentication-key scheme byte for single Ed25519 keys.
const ED25519_SCHEME: u8 = 0x00;

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
	#[error("private key is not valid hex: {0}")]
	Hex(#[from] hex::FromHexError),
	#[error("private key must be 32 bytes, got {0}")]
	Length(usize),
}

/// An account the scripts act as: an address plus, for accounts we can
/// author transactions from, an Ed25519 signing key.
#[derive(Clone)]
pub struct LocalAccount {
	address: AccountAddress,
	key: Option<SigningKey>,
}

impl LocalAccount {
	/// Account whose address is derived from the key's authentication key.
	pub fn from_signing_key(key: SigningKey) -> Self {
		Self {
			address: derive_address(&key.verifying_key()),
			key: Some(key),
		}
	}

	/// Account with a known address (e.g. after a key rotation).
	pub fn with_address(address: AccountAddress, key: SigningKey) -> Self {
		Self {
			address,
			key: Some(key),
		}
	}

	/// Address-only account; it can be queried but cannot sign.
	pub fn watch_only(address: AccountAddress) -> Self {
		Self { address, key: None }
	}

	pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
		parse_private_key(hex_key).map(Self::from_signing_key)
	}

	pub fn address(&self) -> AccountAddress {
		self.address
	}

	pub fn signing_key(&self) -> Option<&SigningKey> {
		self.key.as_ref()
	}

	pub fn public_key(&self) -> Option<VerifyingKey> {
		self.key.as_ref().map(SigningKey::verifying_key)
	}

	/// Sign `message`, or `None` for a watch-only account.
	pub fn sign(&self, message: &[u8]) -> Option<(VerifyingKey, [u8; 64])> {
		let key = self.key.as_ref()?;
		Some((key.verifying_key(), key.sign(message).to_bytes()))
	}
}

impl std::fmt::Debug for LocalAccount {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LocalAccount")
			.field("address", &self.address)
			.field("has_key", &self.key.is_some())
			.finish()
	}
}

/// `sha3_256(public_key || 0x00)`, the address of a fresh single-key account.
pub fn derive_address(public_key: &VerifyingKey) -> AccountAddress {
	let mut h = Sha3_256::new();
	h.update(public_key.as_bytes());
	h.update([ED25519_SCHEME]);
	AccountAddress::new(h.finalize().into())
}

/// Parse a hex private key as written in `.aptos/config.yaml`. Accepts the
/// `0x` and `ed25519-priv-0x` markers and 64-byte secret keys whose first
/// half is the seed.
pub fn parse_private_key(hex_key: &str) -> Result<SigningKey, KeyError> {
	let trimmed = hex_key.trim();
	let digits = trimmed
		.strip_prefix("ed25519-priv-")
		.unwrap_or(trimmed);
	let digits = digits.strip_prefix("0x").unwrap_or(digits);
	let bytes = hex::decode(digits)?;
	let seed: [u8; 32] = match bytes.len() {
		32 | 64 => bytes[..32].try_into().map_err(|_| KeyError::Length(bytes.len()))?,
		n => return Err(KeyError::Length(n)),
	};
	Ok(SigningKey::from_bytes(&seed))
}
