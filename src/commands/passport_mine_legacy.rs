use anyhow::{Context, Result};

use super::{report, ScriptContext};
use crate::modules::passport_mine_legacy::{
	KeplerPassportTerms, LegacyMineClient, Passport, UniversePassportTerms,
};

const MODULE: &str = "passport_mine_006";
const KEPLER: &str = "Kepler Passport";
const UNIVERSE: &str = "Universe Passport";
const COLLECTION_URI: &str = "https://www.kepler.homes/";

/// Deploy both passport collections on the earlier sale module and buy a
/// promotional Universe passport for `bob`, referred by `tom`.
pub async fn run(profile: &str) -> Result<()> {
	let ctx = ScriptContext::load(profile)?;
	let authorizer = ctx.account("alice")?;
	let bob = ctx.account("bob")?;
	let tom = ctx.account("tom")?;
	let vault = ctx.account("vault")?;
	let signing_key = authorizer
		.signing_key()
		.cloned()
		.context("alice must hold a private key to authorize purchases")?;

	let mine = LegacyMineClient::new(
		&ctx.rest,
		ctx.module(MODULE)?,
		"0x1::aptos_coin::AptosCoin".parse()?,
		signing_key,
		vault.address(),
	);

	report("initialize", &mine.initialize(&ctx.deployer).await?);
	for name in [KEPLER, UNIVERSE] {
		let description = format!("{name} description");
		report(
			"create_collection",
			&mine
				.create_collection(&ctx.deployer, name, &description, COLLECTION_URI)
				.await?,
		);
	}
	report(
		"configure_kepler_passport",
		&mine
			.configure_kepler_passport(&ctx.deployer, KEPLER, &KeplerPassportTerms::default(), false)
			.await?,
	);
	report(
		"configure_universe_passport",
		&mine
			.configure_universe_passport(
				&ctx.deployer,
				UNIVERSE,
				&UniversePassportTerms::default(),
				false,
			)
			.await?,
	);

	mine.buy(Passport::Universe, &bob, 1, true, tom.address())
		.await?;
	Ok(())
}
