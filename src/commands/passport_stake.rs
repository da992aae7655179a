use anyhow::{Context, Result};
use tracing::info;

use super::{passport_mint, report, ScriptContext};
use crate::account::LocalAccount;
use crate::modules::coin::{coin_type, CoinClient};
use crate::modules::passport_stake::{
	CollectionInfo, CollectionTerms, PassportStakeClient, APT,
};
use crate::rest::indexer::IndexerClient;

const MODULE: &str = "passport_stake_003";
pub const RESOURCE_KEY: &str = "passport_stake";
const REWARD_SYMBOL: &str = "PreKEPL";
const TOKEN_QUERY_LIMIT: u32 = 993;

/// Optional steps selected through `KEPLER_STEPS`, run in this order.
pub const STEPS: &[&str] = &["deploy", "stake", "unstake", "draw"];

/// Claim `bob`'s pending staking reward on the minted Kepler collection.
///
/// `deploy` registers the collection for staking and funds the reward pool.
/// `stake`, `unstake` and `draw` run a round for `bob` before the claim.
pub async fn run(profile: &str) -> Result<()> {
	let ctx = ScriptContext::load(profile)?;
	ctx.steps.check(STEPS);
	let bob = ctx.account("bob")?;

	let mint_record = ctx
		.store
		.read_module_resource(ctx.network(), passport_mint::RESOURCE_KEY)?;
	let collection = CollectionInfo::from_mint_record(&mint_record).with_context(|| {
		format!(
			"no passport_mint record in {}; run passport_mint first",
			ctx.store.path(ctx.network()).display()
		)
	})?;
	info!(creator = %collection.creator, name = %collection.name, "staking collection");

	let reward = coin_type(ctx.deployer.address(), REWARD_SYMBOL)?;
	let stake = PassportStakeClient::new(&ctx.rest, ctx.module(MODULE)?, reward);

	if ctx.steps.enabled("deploy") {
		deploy(&ctx, &stake, &collection).await?;
	}
	if ctx.steps.enabled("stake") {
		stake_first_token(&ctx, &stake, &bob, &collection).await?;
	}
	if ctx.steps.enabled("unstake") {
		unstake_first_escrow(&stake, &bob).await?;
	}
	if ctx.steps.enabled("draw") {
		let result = stake.draw(&ctx.deployer, &collection).await?;
		info!(hash = %result.hash, "drew rewards");
	}
	report("claim", &stake.claim(&bob, &collection).await?);
	Ok(())
}

async fn deploy(
	ctx: &ScriptContext,
	stake: &PassportStakeClient<'_>,
	collection: &CollectionInfo,
) -> Result<()> {
	report("initialize", &stake.initialize(&ctx.deployer).await?);
	let module_store = stake
		.module_store()
		.await?
		.context("ModuleStore missing after initialize")?;
	report(
		"add_collection",
		&stake
			.add_collection(
				&ctx.deployer,
				&module_store.collections,
				collection,
				&CollectionTerms::default(),
			)
			.await?,
	);

	let mut record = ctx.store.read_module_resource(ctx.network(), RESOURCE_KEY)?;
	record.insert("module_store".into(), serde_json::to_value(&module_store)?);
	let collection_data = stake
		.collection_data(&module_store.collections, collection)
		.await?;
	record.insert(
		"kepler_collection_data".into(),
		collection_data.unwrap_or_default(),
	);
	ctx.store
		.save_module_resource(ctx.network(), RESOURCE_KEY, record)?;

	let reward_coin = CoinClient::new(&ctx.rest, ctx.deployer.address(), REWARD_SYMBOL)?;
	reward_coin
		.mint(
			&ctx.deployer,
			module_store.resource_signer_capability.account.parse()?,
			APT * 100_000_000,
		)
		.await?;
	Ok(())
}

async fn stake_first_token(
	ctx: &ScriptContext,
	stake: &PassportStakeClient<'_>,
	user: &LocalAccount,
	collection: &CollectionInfo,
) -> Result<()> {
	let indexer = IndexerClient::for_network(ctx.network())?;
	let tokens = indexer
		.owned_tokens(user.address(), TOKEN_QUERY_LIMIT)
		.await?;
	let Some(token) = tokens
		.iter()
		.find(|t| t.collection_name == collection.name && t.amount > 0)
	else {
		info!(user = %user.address(), "no passport to stake");
		return Ok(());
	};
	stake
		.stake(user, collection, &token.name, token.property_version, 1)
		.await?;
	Ok(())
}

async fn unstake_first_escrow(stake: &PassportStakeClient<'_>, user: &LocalAccount) -> Result<()> {
	let Some(store) = stake.user_store(user.address()).await? else {
		info!(user = %user.address(), "no user store, nothing to unstake");
		return Ok(());
	};
	if let Some(escrow) = store.escrows.first() {
		stake.unstake(user, &escrow.token_id).await?;
	}
	Ok(())
}
