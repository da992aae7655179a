use anyhow::Result;
use tracing::info;

use super::ScriptContext;
use crate::modules::token::{TokenClient, TokenDataId, TokenId};

const COLLECTION: &str = "Deployer's Collection";
const TOKEN: &str = "Deployer's Token";

/// Mint a single token on `0x3::token`, move it to `bob` with an offer
/// followed by a claim, then have `bob` hand it back in one co-signed
/// direct transfer.
pub async fn run(profile: &str) -> Result<()> {
	let ctx = ScriptContext::load(profile)?;
	let bob = ctx.account("bob")?;
	let tokens = TokenClient::new(&ctx.rest)?;
	let deployer = ctx.deployer.address();

	let token = TokenId {
		token_data_id: TokenDataId {
			creator: deployer,
			collection: COLLECTION.to_owned(),
			name: TOKEN.to_owned(),
		},
		property_version: 0,
	};

	if tokens.collection_data(deployer, COLLECTION).await?.is_none() {
		let tx = tokens
			.create_collection(
				&ctx.deployer,
				COLLECTION,
				"Deployer's simple collection",
				"https://alice.com",
			)
			.await?;
		info!(hash = %tx.hash, "created collection");
		let tx = tokens
			.create_token(
				&ctx.deployer,
				COLLECTION,
				TOKEN,
				"Deployer's simple token",
				1,
				"https://aptos.dev/img/nyan.jpeg",
			)
			.await?;
		info!(hash = %tx.hash, "created token");
	}
	info!(collection = ?tokens.collection_data(deployer, COLLECTION).await?, "collection data");
	info!(balance = tokens.token_balance(deployer, &token).await?, "deployer before transfer");

	let tx = tokens.offer(&ctx.deployer, bob.address(), &token, 1).await?;
	info!(hash = %tx.hash, "offered");
	let tx = tokens.claim(&bob, deployer, &token).await?;
	info!(hash = %tx.hash, "claimed");

	info!(balance = tokens.token_balance(deployer, &token).await?, "deployer after claim");
	info!(balance = tokens.token_balance(bob.address(), &token).await?, "bob after claim");

	let tx = tokens.direct_transfer(&bob, &ctx.deployer, &token, 1).await?;
	info!(hash = %tx.hash, "transferred back");
	info!(balance = tokens.token_balance(deployer, &token).await?, "deployer after direct transfer");
	Ok(())
}
