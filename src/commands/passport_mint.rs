use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::info;

use super::{report, ScriptContext};
use crate::modules::passport_mint::{BuyType, KeplerPassportSale, PassportMintClient};
use crate::move_types::AccountAddress;

const MODULE: &str = "passport_mint_003";
pub const RESOURCE_KEY: &str = "passport_mint";
pub const COLLECTION: &str = "Kepler Passport";
const COLLECTION_URI: &str = "https://www.kepler.homes/";

/// Deploy the mint module and the Kepler collection, record them under
/// `publish/<profile>.json`, then buy one public-sale passport for `bob`.
pub async fn run(profile: &str) -> Result<()> {
	let ctx = ScriptContext::load(profile)?;
	let authorizer = ctx.account("alice")?;
	let bob = ctx.account("bob")?;
	let vault = ctx.account("vault")?;
	let signing_key = authorizer
		.signing_key()
		.cloned()
		.context("alice must hold a private key to authorize purchases")?;

	let mint = PassportMintClient::new(
		&ctx.rest,
		ctx.module(MODULE)?,
		"0x1::aptos_coin::AptosCoin".parse()?,
		signing_key,
		vault.address(),
	);

	report("initialize", &mint.initialize(&ctx.deployer).await?);
	report(
		"create_collection",
		&mint
			.create_collection(
				&ctx.deployer,
				COLLECTION,
				&format!("{COLLECTION} description"),
				COLLECTION_URI,
			)
			.await?,
	);
	report(
		"configure_kepler_passport",
		&mint
			.configure_kepler_passport(&ctx.deployer, COLLECTION, &KeplerPassportSale::default(), false)
			.await?,
	);

	let mut record = ctx.store.read_module_resource(ctx.network(), RESOURCE_KEY)?;
	if let Some(storage) = mint.module_storage_resource().await? {
		record.insert("module_storage".into(), serde_json::to_value(storage)?);
	}
	if let Some(config) = mint.collection_config(COLLECTION).await? {
		record.insert("kepler_collection_config".into(), serde_json::to_value(config)?);
	}
	save(&ctx, record)?;

	mint.buy(&bob, AccountAddress::ZERO, BuyType::Pb, 1).await?;
	Ok(())
}

fn save(ctx: &ScriptContext, record: Map<String, Value>) -> Result<()> {
	ctx.store
		.save_module_resource(ctx.network(), RESOURCE_KEY, record)?;
	info!(path = %ctx.store.path(ctx.network()).display(), "saved deployment record");
	Ok(())
}
