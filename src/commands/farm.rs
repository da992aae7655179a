use anyhow::Result;
use tracing::info;

use super::{report, ScriptContext};
use crate::modules::coin::coin_type;
use crate::modules::farm::{FarmClient, FarmSettings};

const MODULE: &str = "farm_003";
const STAKE_SYMBOL: &str = "KEME";

/// Deploy the farm with the deployer's coin as both reward and stake token,
/// then stake from `bob`.
pub async fn run(profile: &str) -> Result<()> {
	let ctx = ScriptContext::load(profile)?;
	let tester = ctx.account("bob")?;
	let farm = FarmClient::new(&ctx.rest, ctx.module(MODULE)?);
	let coin = coin_type(ctx.deployer.address(), STAKE_SYMBOL)?;

	report(
		"initialize",
		&farm.initialize(&ctx.deployer, &coin, &FarmSettings::standard()).await?,
	);
	report(
		"add_pool",
		&farm.add_pool(&ctx.deployer, &coin, STAKE_SYMBOL, 100).await?,
	);
	farm.stake(&tester, &coin, 123, 5).await?;

	info!(pool = ?farm.pool(STAKE_SYMBOL).await?, "pool");
	info!(user_storage = ?farm.user_storage(tester.address()).await?, "user storage");
	info!(resource_account = ?farm.resource_account().await?, "resource account");
	Ok(())
}
