mod error;

pub use error::{Error, Result};
pub use quarry_quota::ManualClock;

use std::{
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use serde_json::Value;
use time::{OffsetDateTime, macros::datetime};

use quarry_config::Config;
use quarry_domain::{PageWindow, SearchTerms};
use quarry_providers::IndexPage;
use quarry_quota::MemoryWindowStore;
use quarry_service::{
	BoxFuture, Collaborators, IndexFailure, MemoryCredentialIssuer, QuarryService, SearchIndex,
	StaticTokenResolver,
};

pub const STANDARD_TOKEN: &str = "DLBYIcfnKfolaXKcmMC8RIDCavc2hW";
pub const STANDARD_CLIENT: &str = "pm8GMaIXIhkjQ4iDfXLOvVUUcIKGYRnMlZYApbda";
pub const ENHANCED_TOKEN: &str = "VbnHl0bUNkTQy3NFUCSpztMS2e3Zgx";
pub const ENHANCED_CLIENT: &str = "enhanced-client";
/// Resolves to a tier with no configured limits.
pub const ORPHAN_TOKEN: &str = "orphan-token";

const TEST_CONFIG: &str = r#"
[service]
http_bind = "127.0.0.1:0"
log_level = "debug"

[search]
max_depth         = 5000
default_page_size = 20
max_page_size     = 500
index_timeout_ms  = 200

[index]
api_base   = "http://127.0.0.1:9"
path       = "/image/_query"
timeout_ms = 200

[quota]
compaction_interval_secs = 0

[quota.tiers.standard]
burst_ceiling          = 100
burst_horizon_secs     = 60
sustained_ceiling      = 10000
sustained_horizon_secs = 86400

[quota.tiers.enhanced]
burst_ceiling          = 200
burst_horizon_secs     = 60
sustained_ceiling      = 20000
sustained_horizon_secs = 86400

[[auth.tokens]]
token     = "DLBYIcfnKfolaXKcmMC8RIDCavc2hW"
client_id = "pm8GMaIXIhkjQ4iDfXLOvVUUcIKGYRnMlZYApbda"
tier      = "standard"

[[auth.tokens]]
token     = "VbnHl0bUNkTQy3NFUCSpztMS2e3Zgx"
client_id = "enhanced-client"
tier      = "enhanced"

[[auth.tokens]]
token     = "orphan-token"
client_id = "orphan-client"
tier      = "platinum"
"#;

/// A validated configuration with standard and enhanced tiers and three static tokens.
pub fn test_config() -> Result<Config> {
	Ok(quarry_config::parse(TEST_CONFIG)?)
}

/// Fixed starting instant for [`ManualClock`]-driven tests.
pub fn test_epoch() -> OffsetDateTime {
	datetime!(2024-05-01 12:00 UTC)
}

enum StubReply {
	Page(IndexPage),
	Fail(IndexFailure),
	Stall(Duration),
}

/// A scripted [`SearchIndex`] that counts calls and remembers the windows it was asked for.
pub struct StubIndex {
	reply: Mutex<StubReply>,
	calls: AtomicUsize,
	windows: Mutex<Vec<PageWindow>>,
}
impl StubIndex {
	/// Answers every query with `total_hits` and `results`.
	pub fn returning(total_hits: u64, results: Vec<Value>) -> Self {
		Self::with_reply(StubReply::Page(IndexPage { total_hits, results }))
	}

	pub fn failing(failure: IndexFailure) -> Self {
		Self::with_reply(StubReply::Fail(failure))
	}

	/// Sleeps for `delay` before answering with an empty page.
	pub fn stalling(delay: Duration) -> Self {
		Self::with_reply(StubReply::Stall(delay))
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn windows(&self) -> Vec<PageWindow> {
		self.windows.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	pub fn set_page(&self, total_hits: u64, results: Vec<Value>) {
		*self.reply.lock().unwrap_or_else(|err| err.into_inner()) =
			StubReply::Page(IndexPage { total_hits, results });
	}

	fn with_reply(reply: StubReply) -> Self {
		Self { reply: Mutex::new(reply), calls: AtomicUsize::new(0), windows: Mutex::new(Vec::new()) }
	}
}
impl SearchIndex for StubIndex {
	fn query<'a>(
		&'a self,
		_terms: &'a SearchTerms,
		window: PageWindow,
	) -> BoxFuture<'a, std::result::Result<IndexPage, IndexFailure>> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.windows.lock().unwrap_or_else(|err| err.into_inner()).push(window);

		let reply = match &*self.reply.lock().unwrap_or_else(|err| err.into_inner()) {
			StubReply::Page(page) => Ok(page.clone()),
			StubReply::Fail(failure) => Err(failure.clone()),
			StubReply::Stall(delay) => {
				let delay = *delay;

				return Box::pin(async move {
					tokio::time::sleep(delay).await;

					Ok(IndexPage::default())
				});
			},
		};

		Box::pin(async move { reply })
	}
}

/// A service wired to in-memory collaborators and a manual clock.
pub struct TestHarness {
	pub service: Arc<QuarryService>,
	pub index: Arc<StubIndex>,
	pub issuer: Arc<MemoryCredentialIssuer>,
	pub store: Arc<MemoryWindowStore>,
	pub clock: ManualClock,
}
impl TestHarness {
	pub fn new(cfg: Config, index: StubIndex) -> Self {
		let index = Arc::new(index);
		let issuer = Arc::new(MemoryCredentialIssuer::new());
		let store = Arc::new(MemoryWindowStore::new());
		let clock = ManualClock::new(test_epoch());
		let collaborators = Collaborators::new(
			index.clone(),
			Arc::new(StaticTokenResolver::from_config(&cfg.auth)),
			issuer.clone(),
		);
		let service = Arc::new(QuarryService::with_store(
			cfg,
			collaborators,
			store.clone(),
			Arc::new(clock.clone()),
		));

		Self { service, index, issuer, store, clock }
	}

	/// [`test_config`] with a stub index answering `total_hits` empty results.
	pub fn with_hits(total_hits: u64) -> Result<Self> {
		Ok(Self::new(test_config()?, StubIndex::returning(total_hits, Vec::new())))
	}
}

/// Owned query-string pairs, as the HTTP layer hands them to the service.
pub fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
	pairs.iter().map(|(name, value)| (name.to_string(), value.to_string())).collect()
}
