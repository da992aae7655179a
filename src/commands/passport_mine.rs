use anyhow::{Context, Result};
use rand::Rng;
use tracing::info;

use super::{report, ScriptContext};
use crate::account::LocalAccount;
use crate::modules::passport_mine::{token_uri, PassportMineClient};

const MODULE: &str = "passport_mine_011";
const COLLECTION: &str = "Kepler Passport A";
const COLLECTION_URI: &str = "https://www.kepler.homes/";
const PASSPORT_COUNT: u32 = 5000;

/// Optional steps selected through `KEPLER_STEPS`.
pub const STEPS: &[&str] = &["configure", "mint_token"];

/// Deploy the current passport sale and buy one promotional passport for
/// `bob`, referred by the deployer.
///
/// `configure` sets the sale prices before the collection is created and
/// `mint_token` mints a randomly numbered passport to `bob` at the end.
pub async fn run(profile: &str) -> Result<()> {
	let ctx = ScriptContext::load(profile)?;
	ctx.steps.check(STEPS);
	let authorizer = ctx.account("alice")?;
	let bob = ctx.account("bob")?;
	let signing_key = authorizer
		.signing_key()
		.cloned()
		.context("alice must hold a private key to authorize purchases")?;

	let mine = PassportMineClient::new(
		&ctx.rest,
		ctx.module(MODULE)?,
		"0x1::aptos_coin::AptosCoin".parse()?,
		signing_key,
	);

	report("initialize", &mine.initialize(&ctx.deployer).await?);
	if ctx.steps.enabled("configure") {
		configure_sales(&mine, &ctx.deployer).await?;
	}
	report(
		"create_collection",
		&mine
			.create_collection(
				&ctx.deployer,
				COLLECTION,
				&format!("{COLLECTION} description"),
				COLLECTION_URI,
			)
			.await?,
	);

	let result = mine
		.buy_kepler_passport(&bob, 1, true, ctx.deployer.address())
		.await?;
	info!(hash = %result.hash, "bought kepler passport");
	info!(collection = ?mine.kepler_collection(COLLECTION).await?, "kepler collection");

	if ctx.steps.enabled("mint_token") {
		mint_random_passport(&mine, &ctx.deployer, &bob).await?;
	}
	Ok(())
}

async fn configure_sales(mine: &PassportMineClient<'_>, deployer: &LocalAccount) -> Result<()> {
	let public = mine
		.configure_kepler_passport_public_sale(deployer, COLLECTION, 200, 1000)
		.await?;
	info!(hash = %public.hash, "configured public sale");
	let promotion = mine
		.configure_kepler_passport_promotion_sale(deployer, COLLECTION, (1000, 100), (1000, 120))
		.await?;
	info!(hash = %promotion.hash, "configured promotion stages");
	let passport = mine
		.configure_promotion_passport_sale(deployer, COLLECTION, 111, 222, 1000)
		.await?;
	info!(hash = %passport.hash, "configured promotion passport sale");
	Ok(())
}

async fn mint_random_passport(
	mine: &PassportMineClient<'_>,
	deployer: &LocalAccount,
	buyer: &LocalAccount,
) -> Result<()> {
	let id = rand::thread_rng().gen_range(1..=PASSPORT_COUNT);
	let name = format!("{COLLECTION} #{id}");
	let uri = token_uri(id);
	info!(%name, %uri, "minting passport");
	mine.create_tokendata(
		deployer,
		COLLECTION,
		&name,
		&format!("{name} description"),
		&uri,
	)
	.await?;
	let result = mine.mint_token(buyer, COLLECTION, &name).await?;
	info!(hash = %result.hash, buyer = %buyer.address(), "minted passport");
	Ok(())
}
