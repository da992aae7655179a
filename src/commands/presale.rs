use anyhow::Result;
use tracing::info;

use super::{report, ScriptContext};
use crate::modules::coin::{coin_type, CoinClient};
use crate::modules::presale::{PresaleClient, PresaleSettings, PresaleTypes};
use crate::move_types::AccountAddress;

const MODULE: &str = "presale_007";
const LOCK_PERIODS: u64 = 6;

/// Initialize or reconfigure the presale, then buy and claim from `bob`.
pub async fn run(profile: &str) -> Result<()> {
	let ctx = ScriptContext::load(profile)?;
	let bob = ctx.account("bob")?;
	let vault = ctx.account("vault")?;
	let deployer = ctx.deployer.address();

	let types = PresaleTypes {
		currency: "0x1::aptos_coin::AptosCoin".parse()?,
		vekepl: coin_type(deployer, "VeKEPL")?,
		kepl: coin_type(deployer, "KEPL")?,
	};
	let settings = PresaleSettings::for_network(ctx.network(), types, vault.address());
	let min_buy = settings.values.min_buy_amount;
	let presale = PresaleClient::new(&ctx.rest, ctx.module(MODULE)?, settings);

	report("initialize", &presale.initialize(&ctx.deployer).await?);
	report("update_config", &presale.update_config(&ctx.deployer).await?);
	if ctx.network() != "mainnet" {
		info!(storage = ?presale.module_storage().await?, "module storage");
	}

	let vekepl = CoinClient::new(&ctx.rest, deployer, "VeKEPL")?;
	info!(balance = vekepl.balance(bob.address()).await?, "veKEPL before buy");
	presale
		.buy_vekepl(&bob, min_buy + 1, LOCK_PERIODS, AccountAddress::ZERO)
		.await?;
	info!(balance = vekepl.balance(bob.address()).await?, "veKEPL after buy");

	presale.claim_kepl(&bob).await?;
	Ok(())
}
