use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub search: Search,
	pub index: Index,
	pub quota: Quota,
	#[serde(default = "default_registration")]
	pub registration: Throttle,
	#[serde(default = "default_status_throttle")]
	pub status_throttle: Throttle,
	#[serde(default)]
	pub auth: Auth,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Search {
	/// Deepest result offset the index serves for ranked queries.
	#[serde(default = "default_max_depth")]
	pub max_depth: u64,
	#[serde(default = "default_page_size")]
	pub default_page_size: u64,
	#[serde(default = "default_max_page_size")]
	pub max_page_size: u64,
	pub index_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Index {
	pub api_base: String,
	pub path: String,
	pub api_key: Option<String>,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Quota {
	/// Seconds between background compaction passes. Zero disables the task.
	#[serde(default)]
	pub compaction_interval_secs: u64,
	/// Keyed by tier name, e.g. "standard" or "enhanced".
	pub tiers: BTreeMap<String, TierLimits>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TierLimits {
	pub burst_ceiling: u64,
	pub burst_horizon_secs: u64,
	pub sustained_ceiling: u64,
	pub sustained_horizon_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Throttle {
	pub ceiling: u64,
	pub horizon_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Auth {
	#[serde(default)]
	pub tokens: Vec<StaticToken>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StaticToken {
	pub token: String,
	pub client_id: String,
	pub tier: String,
}

fn default_max_depth() -> u64 {
	5_000
}

fn default_page_size() -> u64 {
	20
}

fn default_max_page_size() -> u64 {
	500
}

fn default_registration() -> Throttle {
	Throttle { ceiling: 3, horizon_secs: 86_400 }
}

fn default_status_throttle() -> Throttle {
	Throttle { ceiling: 1, horizon_secs: 1 }
}
