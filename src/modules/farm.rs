//! Lock-up staking farm with boosted, vesting rewards.

use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::account::LocalAccount;
use crate::module_client::{EntryCall, ModuleClient, ModuleRef, STRING_TYPE};
use crate::move_types::{AccountAddress, MoveValue, TypeTag};
use crate::rest::{Resource, RestClient, Result, TableRef, TransactionResult};

pub const UNIT: u64 = 1_000_000;

/// Values passed to `initialize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FarmSettings {
	pub rewards_per_second: u64,
	/// Seconds in one lock unit.
	pub lock_unit_duration: u64,
	pub lock_unit_multiplier: u64,
	pub max_lock_units: u64,
	pub locked_reward_withdraw_interval: u64,
	pub locked_reward_multiplier: u64,
	pub locked_reward_withdraw_count: u64,
	/// Reward tokens pre-minted to the farm's resource account.
	pub reward_token_amount: u64,
}

impl FarmSettings {
	/// Twelve lock units reaching a 2x multiplier; locked rewards vest in
	/// twelve withdrawals.
	pub fn standard() -> Self {
		let max_lock_units = 12;
		let max_multiplier = 2;
		Self {
			rewards_per_second: UNIT / 1000,
			lock_unit_duration: 6,
			lock_unit_multiplier: max_multiplier * UNIT / max_lock_units,
			max_lock_units,
			locked_reward_withdraw_interval: 5,
			locked_reward_multiplier: (max_multiplier * UNIT + max_lock_units / 2) / max_lock_units,
			locked_reward_withdraw_count: 12,
			reward_token_amount: 223_372_036_854_775_800,
		}
	}
}

#[derive(Debug, Clone)]
pub enum FarmCall {
	Initialize {
		reward: TypeTag,
		seed: Vec<u8>,
		settings: FarmSettings,
	},
	AddPool {
		stake: TypeTag,
		pool_weight: u64,
	},
	Stake {
		stake: TypeTag,
		amount: u64,
		lock_units: u64,
	},
	Unstake {
		stake: TypeTag,
		deposit_id: u64,
	},
	Claim {
		reward: TypeTag,
		stake: TypeTag,
		deposit_id: u64,
	},
	Withdraw {
		reward: TypeTag,
		stake: TypeTag,
		claim_id: u64,
	},
}

impl EntryCall for FarmCall {
	fn function(&self) -> &'static str {
		match self {
			Self::Initialize { .. } => "initialize",
			Self::AddPool { .. } => "add_pool",
			Self::Stake { .. } => "stake",
			Self::Unstake { .. } => "unstake",
			Self::Claim { .. } => "claim",
			Self::Withdraw { .. } => "withdraw",
		}
	}

	fn type_args(&self) -> Vec<TypeTag> {
		match self {
			Self::Initialize { reward, .. } => vec![reward.clone()],
			Self::AddPool { stake, .. } | Self::Stake { stake, .. } | Self::Unstake { stake, .. } => {
				vec![stake.clone()]
			}
			Self::Claim { reward, stake, .. } | Self::Withdraw { reward, stake, .. } => {
				vec![reward.clone(), stake.clone()]
			}
		}
	}

	fn args(&self) -> Vec<MoveValue> {
		match self {
			Self::Initialize { seed, settings, .. } => vec![
				MoveValue::Bytes(seed.clone()),
				MoveValue::U64(settings.rewards_per_second),
				MoveValue::U64(settings.lock_unit_duration),
				MoveValue::U64(settings.lock_unit_multiplier),
				MoveValue::U64(settings.max_lock_units),
				MoveValue::U64(settings.locked_reward_withdraw_interval),
				MoveValue::U64(settings.locked_reward_multiplier),
				MoveValue::U64(settings.locked_reward_withdraw_count),
				MoveValue::U64(settings.reward_token_amount),
			],
			Self::AddPool { pool_weight, .. } => vec![MoveValue::U64(*pool_weight)],
			Self::Stake {
				amount, lock_units, ..
			} => vec![MoveValue::U64(*amount), MoveValue::U64(*lock_units)],
			Self::Unstake { deposit_id, .. } | Self::Claim { deposit_id, .. } => {
				vec![MoveValue::U64(*deposit_id)]
			}
			Self::Withdraw { claim_id, .. } => vec![MoveValue::U64(*claim_id)],
		}
	}
}

/// The parts of `GlobalStorage` the scripts read.
#[derive(Debug, Clone, Deserialize)]
pub struct GlobalStorage {
	pub pools: TableRef,
}

pub struct FarmClient<'a> {
	module: ModuleClient<'a>,
}

impl<'a> FarmClient<'a> {
	pub fn new(rest: &'a RestClient, module: ModuleRef) -> Self {
		Self {
			module: ModuleClient::new(rest, module),
		}
	}

	pub fn module(&self) -> &ModuleClient<'a> {
		&self.module
	}

	pub async fn global_storage(&self) -> Result<Option<GlobalStorage>> {
		self.module
			.query_module_resource_as(self.module.deployer(), "GlobalStorage")
			.await
	}

	pub async fn resource_account(&self) -> Result<Option<Resource>> {
		self.module
			.query_module_resource(self.module.deployer(), "ResourceAccount")
			.await
	}

	pub async fn user_storage(&self, user: AccountAddress) -> Result<Option<Resource>> {
		self.module.query_module_resource(user, "UserStorage").await
	}

	/// The pool for the stake coin with `symbol`, if one was added.
	pub async fn pool(&self, symbol: &str) -> Result<Option<Value>> {
		let Some(storage) = self.global_storage().await? else {
			return Ok(None);
		};
		self.module
			.rest()
			.fetch_table_item(
				&storage.pools.handle,
				STRING_TYPE,
				&self.module.struct_type("Pool"),
				&symbol,
			)
			.await
	}

	/// Initialize the farm unless `GlobalStorage` already exists. The resource
	/// signer seed is the module name.
	pub async fn initialize(
		&self,
		deployer: &LocalAccount,
		reward: &TypeTag,
		settings: &FarmSettings,
	) -> Result<Option<TransactionResult>> {
		if self.global_storage().await?.is_some() {
			return Ok(None);
		}
		let call = FarmCall::Initialize {
			reward: reward.clone(),
			seed: self.module.module().name.as_str().as_bytes().to_vec(),
			settings: settings.clone(),
		};
		info!(?settings, "initializing farm");
		self.module.execute(deployer, &call).await.map(Some)
	}

	/// Add a pool for `stake` unless one is registered under `symbol`.
	pub async fn add_pool(
		&self,
		deployer: &LocalAccount,
		stake: &TypeTag,
		symbol: &str,
		pool_weight: u64,
	) -> Result<Option<TransactionResult>> {
		if self.pool(symbol).await?.is_some() {
			return Ok(None);
		}
		let call = FarmCall::AddPool {
			stake: stake.clone(),
			pool_weight,
		};
		self.module.execute(deployer, &call).await.map(Some)
	}

	pub async fn stake(
		&self,
		user: &LocalAccount,
		stake: &TypeTag,
		amount: u64,
		lock_units: u64,
	) -> Result<TransactionResult> {
		let call = FarmCall::Stake {
			stake: stake.clone(),
			amount,
			lock_units,
		};
		self.module.execute(user, &call).await
	}

	pub async fn unstake(
		&self,
		user: &LocalAccount,
		stake: &TypeTag,
		deposit_id: u64,
	) -> Result<TransactionResult> {
		let call = FarmCall::Unstake {
			stake: stake.clone(),
			deposit_id,
		};
		self.module.execute(user, &call).await
	}

	pub async fn claim(
		&self,
		user: &LocalAccount,
		reward: &TypeTag,
		stake: &TypeTag,
		deposit_id: u64,
	) -> Result<TransactionResult> {
		let call = FarmCall::Claim {
			reward: reward.clone(),
			stake: stake.clone(),
			deposit_id,
		};
		self.module.execute(user, &call).await
	}

	pub async fn withdraw(
		&self,
		user: &LocalAccount,
		reward: &TypeTag,
		stake: &TypeTag,
		claim_id: u64,
	) -> Result<TransactionResult> {
		let call = FarmCall::Withdraw {
			reward: reward.clone(),
			stake: stake.clone(),
			claim_id,
		};
		self.module.execute(user, &call).await
	}
}
