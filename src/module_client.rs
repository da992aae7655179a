use serde::de::DeserializeOwned;
use tracing::debug;

use crate::account::LocalAccount;
use crate::move_types::{
	AccountAddress, FunctionId, Identifier, ModuleId, MoveValue, ParseError, StructTag, TypeTag,
};
use crate::rest::{Resource, RestClient, Result, TableRef, TransactionResult};
use crate::transaction::{EntryFunction, TransactionPayload};

/// `<address>::<module>`, the home of a deployed module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRef {
	pub address: AccountAddress,
	pub name: Identifier,
}

impl ModuleRef {
	pub fn new(address: AccountAddress, name: &str) -> Result<Self, ParseError> {
		Ok(Self {
			address,
			name: Identifier::new(name)?,
		})
	}

	pub fn module_id(&self) -> ModuleId {
		ModuleId {
			address: self.address,
			name: self.name.clone(),
		}
	}

	/// Fully-qualified name of a struct declared by this module.
	pub fn struct_type(&self, name: &str) -> String {
		format!("{}::{}", self.module_id(), name)
	}

	pub fn struct_tag(&self, name: &str, type_args: Vec<TypeTag>) -> Result<StructTag, ParseError> {
		Ok(StructTag {
			address: self.address,
			module: self.name.clone(),
			name: Identifier::new(name)?,
			type_args,
		})
	}

	pub fn function_id(&self, function: &str) -> Result<FunctionId, ParseError> {
		Ok(FunctionId {
			module: self.module_id(),
			name: Identifier::new(function)?,
		})
	}
}

/// One entry function of a module, with its type and value arguments.
///
/// Implemented by each module's closed call enum so that every payload goes
/// through [`ModuleClient::payload`] and the shared [`MoveValue`] encoder.
pub trait EntryCall {
	fn function(&self) -> &'static str;

	fn type_args(&self) -> Vec<TypeTag> {
		Vec::new()
	}

	fn args(&self) -> Vec<MoveValue>;
}

/// A [`RestClient`] bound to one deployed module.
#[derive(Debug, Clone)]
pub struct ModuleClient<'a> {
	rest: &'a RestClient,
	module: ModuleRef,
}

impl<'a> ModuleClient<'a> {
	pub fn new(rest: &'a RestClient, module: ModuleRef) -> Self {
		Self { rest, module }
	}

	pub fn rest(&self) -> &'a RestClient {
		self.rest
	}

	pub fn module(&self) -> &ModuleRef {
		&self.module
	}

	/// Address the module is published under.
	pub fn deployer(&self) -> AccountAddress {
		self.module.address
	}

	pub fn struct_type(&self, name: &str) -> String {
		self.module.struct_type(name)
	}

	/// Encode `call` as an entry-function payload on this module.
	pub fn payload<C: EntryCall>(&self, call: &C) -> Result<TransactionPayload> {
		let args = call
			.args()
			.iter()
			.map(MoveValue::to_bcs)
			.collect::<Result<Vec<_>, _>>()?;
		Ok(TransactionPayload::EntryFunction(EntryFunction::new(
			self.module.module_id(),
			Identifier::new(call.function())?,
			call.type_args(),
			args,
		)))
	}

	/// Submit `call` from `account` and wait for it. Aborts come back as a
	/// failed [`TransactionResult`].
	pub async fn submit<C: EntryCall>(
		&self,
		account: &LocalAccount,
		call: &C,
		show_diagnostics: bool,
	) -> Result<TransactionResult> {
		let payload = self.payload(call)?;
		debug!(module = %self.module.module_id(), function = call.function(), "built payload");
		self.rest
			.submit_and_confirm(account, payload, show_diagnostics)
			.await
	}

	/// Like [`submit`](Self::submit), with an on-chain abort turned into an error.
	pub async fn execute<C: EntryCall>(
		&self,
		account: &LocalAccount,
		call: &C,
	) -> Result<TransactionResult> {
		self.submit(account, call, true).await?.ensure_success()
	}

	/// [`execute`](Self::execute) for a call that also needs the
	/// `secondary` accounts' signatures.
	pub async fn execute_multi_agent<C: EntryCall>(
		&self,
		sender: &LocalAccount,
		secondary: &[&LocalAccount],
		call: &C,
	) -> Result<TransactionResult> {
		let payload = self.payload(call)?;
		debug!(
			module = %self.module.module_id(),
			function = call.function(),
			"built multi-agent payload"
		);
		self.rest
			.submit_multi_agent_and_confirm(sender, secondary, payload, true)
			.await?
			.ensure_success()
	}

	/// `owner`'s instance of `<module>::<struct_name>`, if any.
	pub async fn query_module_resource(
		&self,
		owner: AccountAddress,
		struct_name: &str,
	) -> Result<Option<Resource>> {
		self.rest
			.fetch_resource(owner, &self.struct_type(struct_name))
			.await
	}

	pub async fn query_module_resource_as<T: DeserializeOwned>(
		&self,
		owner: AccountAddress,
		struct_name: &str,
	) -> Result<Option<T>> {
		self.rest
			.fetch_resource_as(owner, &self.struct_type(struct_name))
			.await
	}

	/// Look up the resource account created for `collection` in a
	/// `Table<String, address>`.
	pub async fn resource_account(
		&self,
		table: &TableRef,
		collection: &str,
	) -> Result<Option<AccountAddress>> {
		let item = self
			.rest
			.fetch_table_item(&table.handle, STRING_TYPE, "address", &collection)
			.await?;
		Ok(item.map(serde_json::from_value).transpose()?)
	}
}

pub const STRING_TYPE: &str = "0x1::string::String";
