use ed25519_dalek::{Signer, SigningKey};

use crate::move_types::AccountAddress;

// -- Fixed-width integers --

/// Big-endian bytes of `n`, the layout on-chain verifiers expect inside
/// `vector<u8>` arguments.
pub fn encode_u64_be(n: u64) -> [u8; 8] {
	n.to_be_bytes()
}

/// Inverse of [`encode_u64_be`]; `None` unless exactly 8 bytes are given.
pub fn decode_u64_be(bytes: &[u8]) -> Option<u64> {
	let arr: [u8; 8] = bytes.try_into().ok()?;
	Some(u64::from_be_bytes(arr))
}

// -- Authorization messages --

/// A canonical byte message for off-chain purchase authorization: fields are
/// appended in call-site order with no separators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationMessage(Vec<u8>);

impl AuthorizationMessage {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn u64(mut self, n: u64) -> Self {
		self.0.extend_from_slice(&encode_u64_be(n));
		self
	}

	pub fn flag(self, value: bool) -> Self {
		self.u64(value as u64)
	}

	pub fn address(mut self, address: &AccountAddress) -> Self {
		self.0.extend_from_slice(address.as_bytes());
		self
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}
}

/// `order_id || amount`, checked by `verify_signature`.
pub fn order_message(order_id: u64, amount: u64) -> AuthorizationMessage {
	AuthorizationMessage::new().u64(order_id).u64(amount)
}

/// `amount || is_promotional || referrer`, checked by `buy_kepler_passport`.
pub fn passport_purchase_message(
	amount: u64,
	is_promotional: bool,
	referrer: &AccountAddress,
) -> AuthorizationMessage {
	AuthorizationMessage::new()
		.u64(amount)
		.flag(is_promotional)
		.address(referrer)
}

/// `buyer || referrer || buy_type || amount`, checked by the mint module's `buy`.
pub fn mint_purchase_message(
	buyer: &AccountAddress,
	referrer: &AccountAddress,
	buy_type: u64,
	amount: u64,
) -> AuthorizationMessage {
	AuthorizationMessage::new()
		.address(buyer)
		.address(referrer)
		.u64(buy_type)
		.u64(amount)
}

/// `buyer || amount || is_promotional || referrer`, the allow-list layout
/// issued by the sale server.
pub fn allowlist_purchase_message(
	buyer: &AccountAddress,
	amount: u64,
	is_promotional: bool,
	referrer: &AccountAddress,
) -> AuthorizationMessage {
	AuthorizationMessage::new()
		.address(buyer)
		.u64(amount)
		.flag(is_promotional)
		.address(referrer)
}

/// Detached Ed25519 signature over the message bytes.
pub fn sign_authorization(key: &SigningKey, message: &AuthorizationMessage) -> [u8; 64] {
	key.sign(message.as_bytes()).to_bytes()
}
