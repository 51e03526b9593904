use std::path::PathBuf;

use clap::{
	Parser,
	builder::{
		Styles,
		styling::{AnsiColor, Effects},
	},
};

/// `<package version>-<git sha>-<target triple>`, stamped by the build script.
const LONG_VERSION: &str = concat!(
	env!("CARGO_PKG_VERSION"),
	"-",
	env!("VERGEN_GIT_SHA"),
	"-",
	env!("VERGEN_CARGO_TARGET_TRIPLE"),
);

/// Admission layer in front of the image search index.
#[derive(Debug, Parser)]
#[command(version = LONG_VERSION, rename_all = "kebab", styles = help_styles())]
pub struct Args {
	/// TOML configuration for the listener, tiers and throttles.
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

fn help_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Blue.on_default() | Effects::BOLD | Effects::UNDERLINE)
		.usage(AnsiColor::Blue.on_default() | Effects::BOLD)
		.literal(AnsiColor::Magenta.on_default())
		.placeholder(AnsiColor::BrightBlack.on_default())
		.error(AnsiColor::Red.on_default() | Effects::BOLD)
		.invalid(AnsiColor::Red.on_default())
		.valid(AnsiColor::Green.on_default())
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;

	use super::*;

	#[test]
	fn command_definition_is_consistent() {
		Args::command().debug_assert();
	}

	#[test]
	fn config_path_is_required() {
		assert!(Args::try_parse_from(["quarry-api"]).is_err());

		let args = Args::try_parse_from(["quarry-api", "-c", "quarry.toml"])
			.expect("Short config flag must parse.");

		assert_eq!(args.config, PathBuf::from("quarry.toml"));
	}

	#[test]
	fn version_carries_build_metadata() {
		assert!(LONG_VERSION.starts_with(env!("CARGO_PKG_VERSION")));
		assert!(LONG_VERSION.matches('-').count() >= 2);
	}
}
