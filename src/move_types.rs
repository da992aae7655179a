use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

pub const ADDRESS_LENGTH: usize = 32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
	#[error("invalid account address {0:?}")]
	Address(String),
	#[error("invalid identifier {0:?}")]
	Identifier(String),
	#[error("invalid type tag {input:?}: {reason}")]
	TypeTag { input: String, reason: &'static str },
	#[error("invalid function id {0:?}, expected <address>::<module>::<function>")]
	FunctionId(String),
}

// -- Addresses --

/// A 32-byte on-chain account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountAddress([u8; ADDRESS_LENGTH]);

impl AccountAddress {
	pub const ZERO: Self = Self([0u8; ADDRESS_LENGTH]);
	pub const ONE: Self = Self::from_u8(1);
	pub const THREE: Self = Self::from_u8(3);

	const fn from_u8(v: u8) -> Self {
		let mut bytes = [0u8; ADDRESS_LENGTH];
		bytes[ADDRESS_LENGTH - 1] = v;
		Self(bytes)
	}

	pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
		Self(bytes)
	}

	pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
		&self.0
	}

	/// `0x` followed by the hex digits with leading zeros trimmed, the form the
	/// REST API uses inside type names (`0x1::coin::CoinStore<..>`).
	pub fn to_short_string(&self) -> String {
		let full = hex::encode(self.0);
		let trimmed = full.trim_start_matches('0');
		if trimmed.is_empty() {
			"0x0".into()
		} else {
			format!("0x{trimmed}")
		}
	}
}

impl FromStr for AccountAddress {
	type Err = ParseError;

	/// Accepts `0x`-prefixed or bare hex; short forms are left-padded with zeros.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let digits = s.strip_prefix("0x").unwrap_or(s);
		if digits.is_empty() || digits.len() > ADDRESS_LENGTH * 2 {
			return Err(ParseError::Address(s.to_owned()));
		}
		let padded = format!("{digits:0>64}");
		let mut bytes = [0u8; ADDRESS_LENGTH];
		hex::decode_to_slice(&padded, &mut bytes).map_err(|_| ParseError::Address(s.to_owned()))?;
		Ok(Self(bytes))
	}
}

impl fmt::Display for AccountAddress {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", hex::encode(self.0))
	}
}

impl fmt::Debug for AccountAddress {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(self, f)
	}
}

impl Serialize for AccountAddress {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		if serializer.is_human_readable() {
			serializer.serialize_str(&self.to_string())
		} else {
			// BCS: fixed 32 bytes, no length prefix.
			self.0.serialize(serializer)
		}
	}
}

impl<'de> Deserialize<'de> for AccountAddress {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		if deserializer.is_human_readable() {
			let s = String::deserialize(deserializer)?;
			s.parse().map_err(de::Error::custom)
		} else {
			<[u8; ADDRESS_LENGTH]>::deserialize(deserializer).map(Self)
		}
	}
}

// -- Identifiers --

/// A Move identifier: module, struct or function name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Identifier(String);

impl Identifier {
	pub fn new(name: impl Into<String>) -> Result<Self, ParseError> {
		let name = name.into();
		if is_valid_identifier(&name) {
			Ok(Self(name))
		} else {
			Err(ParseError::Identifier(name))
		}
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for Identifier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

fn is_valid_identifier(s: &str) -> bool {
	let mut chars = s.chars();
	match chars.next() {
		Some(c) if c.is_ascii_alphabetic() => {}
		Some('_') if s.len() > 1 => {}
		_ => return false,
	}
	chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ModuleId {
	pub address: AccountAddress,
	pub name: Identifier,
}

impl fmt::Display for ModuleId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}::{}", self.address.to_short_string(), self.name)
	}
}

// -- Type tags --

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct StructTag {
	pub address: AccountAddress,
	pub module: Identifier,
	pub name: Identifier,
	pub type_args: Vec<TypeTag>,
}

/// Variant order is the BCS discriminant and must not change.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TypeTag {
	Bool,
	U8,
	U64,
	U128,
	Address,
	Signer,
	Vector(Box<TypeTag>),
	Struct(Box<StructTag>),
	U16,
	U32,
	U256,
}

impl fmt::Display for StructTag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}::{}::{}", self.address.to_short_string(), self.module, self.name)?;
		if !self.type_args.is_empty() {
			f.write_str("<")?;
			for (i, arg) in self.type_args.iter().enumerate() {
				if i > 0 {
					f.write_str(", ")?;
				}
				write!(f, "{arg}")?;
			}
			f.write_str(">")?;
		}
		Ok(())
	}
}

impl fmt::Display for TypeTag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Bool => f.write_str("bool"),
			Self::U8 => f.write_str("u8"),
			Self::U16 => f.write_str("u16"),
			Self::U32 => f.write_str("u32"),
			Self::U64 => f.write_str("u64"),
			Self::U128 => f.write_str("u128"),
			Self::U256 => f.write_str("u256"),
			Self::Address => f.write_str("address"),
			Self::Signer => f.write_str("signer"),
			Self::Vector(inner) => write!(f, "vector<{inner}>"),
			Self::Struct(tag) => write!(f, "{tag}"),
		}
	}
}

impl FromStr for TypeTag {
	type Err = ParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut parser = TypeTagParser { input: s, pos: 0 };
		let tag = parser.type_tag()?;
		parser.skip_whitespace();
		if parser.pos != s.len() {
			return Err(parser.error("trailing characters"));
		}
		Ok(tag)
	}
}

impl FromStr for StructTag {
	type Err = ParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.parse::<TypeTag>()? {
			TypeTag::Struct(tag) => Ok(*tag),
			_ => Err(ParseError::TypeTag {
				input: s.to_owned(),
				reason: "expected a struct type",
			}),
		}
	}
}

struct TypeTagParser<'a> {
	input: &'a str,
	pos: usize,
}

impl<'a> TypeTagParser<'a> {
	fn error(&self, reason: &'static str) -> ParseError {
		ParseError::TypeTag {
			input: self.input.to_owned(),
			reason,
		}
	}

	fn skip_whitespace(&mut self) {
		let rest = &self.input[self.pos..];
		self.pos += rest.len() - rest.trim_start().len();
	}

	fn word(&mut self) -> &'a str {
		self.skip_whitespace();
		let rest = &self.input[self.pos..];
		let len = rest
			.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
			.unwrap_or(rest.len());
		self.pos += len;
		&rest[..len]
	}

	fn eat(&mut self, token: &str) -> bool {
		self.skip_whitespace();
		if self.input[self.pos..].starts_with(token) {
			self.pos += token.len();
			true
		} else {
			false
		}
	}

	fn expect(&mut self, token: &str, reason: &'static str) -> Result<(), ParseError> {
		if self.eat(token) {
			Ok(())
		} else {
			Err(self.error(reason))
		}
	}

	fn identifier(&mut self) -> Result<Identifier, ParseError> {
		Identifier::new(self.word()).map_err(|_| self.error("invalid identifier"))
	}

	fn type_tag(&mut self) -> Result<TypeTag, ParseError> {
		let word = self.word();
		let tag = match word {
			"bool" => TypeTag::Bool,
			"u8" => TypeTag::U8,
			"u16" => TypeTag::U16,
			"u32" => TypeTag::U32,
			"u64" => TypeTag::U64,
			"u128" => TypeTag::U128,
			"u256" => TypeTag::U256,
			"address" => TypeTag::Address,
			"signer" => TypeTag::Signer,
			"vector" => {
				self.expect("<", "expected '<' after vector")?;
				let inner = self.type_tag()?;
				self.expect(">", "unclosed vector type")?;
				TypeTag::Vector(Box::new(inner))
			}
			"" => return Err(self.error("expected a type")),
			address => {
				let address = address
					.parse()
					.map_err(|_| self.error("invalid struct address"))?;
				self.expect("::", "expected '::' after address")?;
				let module = self.identifier()?;
				self.expect("::", "expected '::' after module")?;
				let name = self.identifier()?;
				let mut type_args = Vec::new();
				if self.eat("<") {
					loop {
						type_args.push(self.type_tag()?);
						if self.eat(">") {
							break;
						}
						self.expect(",", "expected ',' or '>' in type arguments")?;
					}
				}
				TypeTag::Struct(Box::new(StructTag {
					address,
					module,
					name,
					type_args,
				}))
			}
		};
		Ok(tag)
	}
}

// -- Function ids --

/// `<address>::<module>::<function>`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionId {
	pub module: ModuleId,
	pub name: Identifier,
}

impl FromStr for FunctionId {
	type Err = ParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let err = || ParseError::FunctionId(s.to_owned());
		let mut parts = s.split("::");
		let (Some(address), Some(module), Some(name), None) =
			(parts.next(), parts.next(), parts.next(), parts.next())
		else {
			return Err(err());
		};
		Ok(Self {
			module: ModuleId {
				address: address.parse().map_err(|_| err())?,
				name: Identifier::new(module).map_err(|_| err())?,
			},
			name: Identifier::new(name).map_err(|_| err())?,
		})
	}
}

impl fmt::Display for FunctionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}::{}", self.module, self.name)
	}
}

// -- Argument values --

/// The closed set of entry-function argument shapes used by the scripts.
/// Every variant goes through [`MoveValue::to_bcs`], the one argument
/// serializer shared by all module payloads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoveValue {
	U64(u64),
	Address(AccountAddress),
	/// `vector<u8>`
	Bytes(Vec<u8>),
	/// A u64 passed as `vector<u8>` holding its 8 big-endian bytes.
	U64Bytes(u64),
	/// `0x1::string::String`
	String(String),
	BoolVector(Vec<bool>),
	StringVector(Vec<String>),
	BytesVector(Vec<Vec<u8>>),
}

impl MoveValue {
	/// UTF-8 bytes of `s` as a `vector<u8>` argument.
	pub fn utf8(s: &str) -> Self {
		Self::Bytes(s.as_bytes().to_vec())
	}

	pub fn to_bcs(&self) -> Result<Vec<u8>, bcs::Error> {
		match self {
			Self::U64(v) => bcs::to_bytes(v),
			Self::Address(v) => bcs::to_bytes(v),
			Self::Bytes(v) => bcs::to_bytes(v),
			Self::U64Bytes(v) => bcs::to_bytes(&crate::crypto::encode_u64_be(*v).to_vec()),
			Self::String(v) => bcs::to_bytes(v),
			Self::BoolVector(v) => bcs::to_bytes(v),
			Self::StringVector(v) => bcs::to_bytes(v),
			Self::BytesVector(v) => bcs::to_bytes(v),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn short_addresses_are_padded() {
		let a: AccountAddress = "0x1".parse().unwrap();
		assert_eq!(a, AccountAddress::ONE);
		assert_eq!(a.to_short_string(), "0x1");
		assert_eq!(
			a.to_string(),
			"0x0000000000000000000000000000000000000000000000000000000000000001"
		);
		assert_eq!(AccountAddress::ZERO.to_short_string(), "0x0");
	}

	#[test]
	fn address_rejects_garbage() {
		assert!("0x".parse::<AccountAddress>().is_err());
		assert!("0xzz".parse::<AccountAddress>().is_err());
		assert!(format!("0x{}", "1".repeat(65)).parse::<AccountAddress>().is_err());
	}

	#[test]
	fn address_bcs_is_fixed_width() {
		let bytes = bcs::to_bytes(&AccountAddress::ONE).unwrap();
		assert_eq!(bytes.len(), 32);
		assert_eq!(bytes[31], 1);
	}

	#[test]
	fn nested_type_tag_parses_and_displays() {
		let s = "0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>";
		let tag: TypeTag = s.parse().unwrap();
		assert_eq!(tag.to_string(), s);

		let TypeTag::Struct(store) = tag else { panic!("expected struct") };
		assert_eq!(store.module.as_str(), "coin");
		assert_eq!(store.type_args.len(), 1);
	}

	#[test]
	fn multiple_type_args_and_vectors() {
		let tag: TypeTag = "0xab::m::Pair<vector<u8>, 0x1::string::String>".parse().unwrap();
		assert_eq!(tag.to_string(), "0xab::m::Pair<vector<u8>, 0x1::string::String>");
		assert!("vector<u8".parse::<TypeTag>().is_err());
		assert!("0x1::coin".parse::<TypeTag>().is_err());
		assert!("u64 extra".parse::<TypeTag>().is_err());
	}

	#[test]
	fn type_tag_bcs_layout() {
		// Struct variant (7), 32-byte address, then length-prefixed names.
		let tag: TypeTag = "0x1::m::T".parse().unwrap();
		let bytes = bcs::to_bytes(&tag).unwrap();
		assert_eq!(bytes[0], 7);
		assert_eq!(bytes[32], 1);
		assert_eq!(&bytes[33..], &[1, b'm', 1, b'T', 0]);

		assert_eq!(bcs::to_bytes(&TypeTag::U64).unwrap(), vec![2]);
		assert_eq!(bcs::to_bytes(&TypeTag::U16).unwrap(), vec![8]);
	}

	#[test]
	fn function_id_parses() {
		let id: FunctionId = "0x1::managed_coin::register".parse().unwrap();
		assert_eq!(id.module.address, AccountAddress::ONE);
		assert_eq!(id.name.as_str(), "register");
		assert_eq!(id.to_string(), "0x1::managed_coin::register");
		assert!("0x1::managed_coin".parse::<FunctionId>().is_err());
	}

	#[test]
	fn identifiers_are_validated() {
		assert!(Identifier::new("passport_mint_003").is_ok());
		assert!(Identifier::new("KEME").is_ok());
		assert!(Identifier::new("3abc").is_err());
		assert!(Identifier::new("_").is_err());
		assert!(Identifier::new("a-b").is_err());
	}

	#[test]
	fn argument_encodings() {
		assert_eq!(MoveValue::U64(1).to_bcs().unwrap(), vec![1, 0, 0, 0, 0, 0, 0, 0]);
		assert_eq!(MoveValue::utf8("ab").to_bcs().unwrap(), vec![2, b'a', b'b']);
		assert_eq!(
			MoveValue::U64Bytes(1).to_bcs().unwrap(),
			vec![8, 0, 0, 0, 0, 0, 0, 0, 1]
		);
		assert_eq!(MoveValue::Address(AccountAddress::ONE).to_bcs().unwrap().len(), 32);
		assert_eq!(
			MoveValue::BoolVector(vec![false, true]).to_bcs().unwrap(),
			vec![2, 0, 1]
		);
	}
}
