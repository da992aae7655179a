use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Selects the log formatter: `json` for JSON lines, anything else compact.
pub const LOG_FORMAT_ENV: &str = "KEPLER_LOG_FORMAT";

/// Arguments shared by every deployment script.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct ScriptArgs {
	/// Profile in `.aptos/config.yaml`; also names the network for
	/// network-dependent settings and the `publish/<profile>.json` record.
	pub profile: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
	#[default]
	Compact,
	Json,
}

impl LogFormat {
	pub fn from_env() -> Self {
		Self::parse(std::env::var(LOG_FORMAT_ENV).ok().as_deref())
	}

	fn parse(value: Option<&str>) -> Self {
		match value.map(str::trim) {
			Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
			_ => Self::Compact,
		}
	}
}

/// Install the global subscriber. `RUST_LOG` overrides the default `info`
/// level and [`LOG_FORMAT_ENV`] picks the formatter.
pub fn init_tracing() -> anyhow::Result<()> {
	let filter = EnvFilter::builder()
		.with_default_directive(LevelFilter::INFO.into())
		.from_env_lossy();
	match LogFormat::from_env() {
		LogFormat::Json => {
			let subscriber = tracing_subscriber::fmt()
				.json()
				.with_level(true)
				.with_target(true)
				.with_env_filter(filter)
				.finish();
			tracing::subscriber::set_global_default(subscriber)?;
		}
		LogFormat::Compact => {
			let subscriber = tracing_subscriber::fmt()
				.compact()
				.with_level(true)
				.with_file(true)
				.with_line_number(true)
				.with_target(true)
				.with_env_filter(filter)
				.finish();
			tracing::subscriber::set_global_default(subscriber)?;
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn profile_is_the_only_argument() {
		let args = ScriptArgs::try_parse_from(["farm", "testnet"]).unwrap();
		assert_eq!(args.profile, "testnet");

		assert!(ScriptArgs::try_parse_from(["farm"]).is_err());
		assert!(ScriptArgs::try_parse_from(["farm", "a", "b"]).is_err());
		assert!(ScriptArgs::try_parse_from(["farm", "mainnet", "--quiet"]).is_err());
	}

	#[test]
	fn log_format_values() {
		assert_eq!(LogFormat::parse(None), LogFormat::Compact);
		assert_eq!(LogFormat::parse(Some("json")), LogFormat::Json);
		assert_eq!(LogFormat::parse(Some(" JSON ")), LogFormat::Json);
		assert_eq!(LogFormat::parse(Some("pretty")), LogFormat::Compact);
	}
}
