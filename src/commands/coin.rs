use anyhow::Result;
use tracing::info;

use super::{report, ScriptContext};
use crate::modules::coin::CoinClient;

pub const SYMBOL: &str = "KEME";

/// Register `bob` for the deployer's coin and mint a few units to it.
pub async fn run(profile: &str) -> Result<()> {
	let ctx = ScriptContext::load(profile)?;
	let tester = ctx.account("bob")?;
	let coin = CoinClient::new(&ctx.rest, ctx.deployer.address(), SYMBOL)?;
	info!(deployer = %ctx.deployer.address(), tester = %tester.address(), coin = %coin.coin_type());

	report("register", &coin.ensure_registered(&tester).await?);
	info!(balance = coin.balance(tester.address()).await?, "before mint");
	coin.mint(&ctx.deployer, tester.address(), 100).await?;
	info!(balance = coin.balance(tester.address()).await?, "after mint");
	Ok(())
}
