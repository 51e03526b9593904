mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Auth, Config, Index, Quota, Search, Service, StaticToken, Throttle, TierLimits,
};

use std::{collections::BTreeMap, fs, mem, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse(&raw).map_err(|err| match err {
		Error::ParseConfig { source, .. } => Error::ParseConfig { path: path.to_path_buf(), source },
		other => other,
	})
}

/// Parses, normalizes and validates a TOML document.
pub fn parse(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: Default::default(), source: err })?;

	normalize(&mut cfg)?;

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.search.max_depth == 0 {
		return Err(Error::Validation {
			message: "search.max_depth must be greater than zero.".to_string(),
		});
	}
	if cfg.search.max_page_size == 0 {
		return Err(Error::Validation {
			message: "search.max_page_size must be greater than zero.".to_string(),
		});
	}
	if !(1..=cfg.search.max_page_size).contains(&cfg.search.default_page_size) {
		return Err(Error::Validation {
			message: "search.default_page_size must be in the range 1-search.max_page_size."
				.to_string(),
		});
	}
	if cfg.search.index_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "search.index_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.index.api_base.trim().is_empty() {
		return Err(Error::Validation {
			message: "index.api_base must be non-empty.".to_string(),
		});
	}
	if cfg.index.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "index.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.quota.tiers.is_empty() {
		return Err(Error::Validation {
			message: "quota.tiers must define at least one tier.".to_string(),
		});
	}

	for (name, limits) in &cfg.quota.tiers {
		if name.trim().is_empty() {
			return Err(Error::Validation {
				message: "quota.tiers names must be non-empty.".to_string(),
			});
		}

		for (label, value) in [
			("burst_ceiling", limits.burst_ceiling),
			("burst_horizon_secs", limits.burst_horizon_secs),
			("sustained_ceiling", limits.sustained_ceiling),
			("sustained_horizon_secs", limits.sustained_horizon_secs),
		] {
			if value == 0 {
				return Err(Error::Validation {
					message: format!("quota.tiers.{name}.{label} must be greater than zero."),
				});
			}
		}
	}

	for (label, throttle) in
		[("registration", &cfg.registration), ("status_throttle", &cfg.status_throttle)]
	{
		if throttle.ceiling == 0 {
			return Err(Error::Validation {
				message: format!("{label}.ceiling must be greater than zero."),
			});
		}
		if throttle.horizon_secs == 0 {
			return Err(Error::Validation {
				message: format!("{label}.horizon_secs must be greater than zero."),
			});
		}
	}

	for (idx, row) in cfg.auth.tokens.iter().enumerate() {
		for (label, value) in
			[("token", &row.token), ("client_id", &row.client_id), ("tier", &row.tier)]
		{
			if value.trim().is_empty() {
				return Err(Error::Validation {
					message: format!("auth.tokens[{idx}].{label} must be non-empty."),
				});
			}
		}
	}

	Ok(())
}

/// Tier names compare case-insensitively: both the quota table keys and the token rows are
/// lowercased.
fn normalize(cfg: &mut Config) -> Result<()> {
	if cfg.index.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
		cfg.index.api_key = None;
	}

	let mut tiers = BTreeMap::new();

	for (name, limits) in mem::take(&mut cfg.quota.tiers) {
		let normalized = tier_name(&name);

		if tiers.insert(normalized.clone(), limits).is_some() {
			return Err(Error::Validation {
				message: format!("quota.tiers defines '{normalized}' more than once."),
			});
		}
	}

	cfg.quota.tiers = tiers;

	for row in &mut cfg.auth.tokens {
		row.tier = tier_name(&row.tier);
	}

	Ok(())
}

fn tier_name(raw: &str) -> String {
	raw.trim().to_ascii_lowercase()
}
