use clap::Parser;
use kepler_scripts::cli::{init_tracing, ScriptArgs};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
	let args = ScriptArgs::parse();
	init_tracing()?;
	kepler_scripts::commands::farm::run(&args.profile).await
}
