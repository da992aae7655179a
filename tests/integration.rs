//! Integration tests that hit a live Aptos fullnode.
//!
//! These are marked `#[ignore]` by default because they require network
//! access. Run them explicitly with:
//!
//!   cargo test --test integration -- --ignored
//!
//! `APTOS_NODE_URL` overrides the devnet fullnode.

use kepler_scripts::config::{Profile, NODE_URL_ENV};
use kepler_scripts::modules::coin::coin_store_type;
use kepler_scripts::move_types::AccountAddress;
use kepler_scripts::rest::RestClient;

fn client() -> RestClient {
	let env = std::env::var(NODE_URL_ENV).ok();
	let url = Profile::default()
		.rest_url("devnet", env.as_deref())
		.expect("invalid node url");
	RestClient::new(url).expect("failed to build client")
}

#[tokio::test]
#[ignore]
async fn ledger_version_is_positive() {
	let info = client().ledger_info().await.expect("failed to fetch ledger info");
	assert!(info.ledger_version > 0, "ledger version should be positive");
}

#[tokio::test]
#[ignore]
async fn framework_modules_are_published() {
	let modules = client()
		.fetch_modules(AccountAddress::ONE)
		.await
		.expect("failed to fetch modules");
	assert!(!modules.is_empty(), "0x1 should publish the framework");
}

#[tokio::test]
#[ignore]
async fn missing_resource_is_none() {
	let resource = client()
		.fetch_resource(
			AccountAddress::ONE,
			"0x1::kepler_missing_module::NoSuchResource",
		)
		.await
		.expect("lookup should not error");
	assert!(resource.is_none());
}

#[tokio::test]
#[ignore]
async fn unknown_account_has_no_coin_store() {
	let unknown: AccountAddress = "0xdeadbeefdeadbeef".parse().unwrap();
	let coin = "0x1::aptos_coin::AptosCoin".parse().unwrap();
	let store = client()
		.fetch_resource(unknown, &coin_store_type(&coin))
		.await
		.expect("lookup should not error");
	assert!(store.is_none());
}
