pub mod index;
pub mod issuer;
pub mod rate_limit;
pub mod register;
pub mod search;
pub mod tokens;

mod error;

pub use error::{Error, Result};
pub use index::{HttpIndex, IndexFailure};
pub use issuer::{IssuedCredentials, MemoryCredentialIssuer};
pub use rate_limit::RateLimitStatus;
pub use register::{RegistrationRequest, RegistrationResponse};
pub use search::SearchResponse;
pub use tokens::StaticTokenResolver;

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use tokio::task::JoinHandle;

use quarry_config::Config;
use quarry_domain::{ClientIdentity, DepthCap, PageBounds, PageWindow, SearchTerms};
use quarry_providers::IndexPage;
use quarry_quota::{
	Clock, MemoryWindowStore, QuotaLedger, SystemClock, Throttle, TierTable, WindowStore,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The ranked full-text index. Receives bounded offsets only.
pub trait SearchIndex
where
	Self: Send + Sync,
{
	fn query<'a>(
		&'a self,
		terms: &'a SearchTerms,
		window: PageWindow,
	) -> BoxFuture<'a, std::result::Result<IndexPage, IndexFailure>>;
}

/// Maps an opaque access token to the client it was issued to. `None` means unknown or expired.
pub trait TokenResolver
where
	Self: Send + Sync,
{
	fn resolve<'a>(
		&'a self,
		token: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Option<ClientIdentity>>>;
}

/// Mints and stores client credentials for a validated registration.
pub trait CredentialIssuer
where
	Self: Send + Sync,
{
	fn issue<'a>(
		&'a self,
		registration: &'a register::Registration,
	) -> BoxFuture<'a, color_eyre::Result<IssuedCredentials>>;
}

#[derive(Clone)]
pub struct Collaborators {
	pub index: Arc<dyn SearchIndex>,
	pub tokens: Arc<dyn TokenResolver>,
	pub issuer: Arc<dyn CredentialIssuer>,
}
impl Collaborators {
	pub fn new(
		index: Arc<dyn SearchIndex>,
		tokens: Arc<dyn TokenResolver>,
		issuer: Arc<dyn CredentialIssuer>,
	) -> Self {
		Self { index, tokens, issuer }
	}

	/// HTTP index from `[index]`, static tokens from `[auth]`, in-memory issuer.
	pub fn from_config(cfg: &Config) -> Self {
		Self {
			index: Arc::new(HttpIndex::new(cfg.index.clone())),
			tokens: Arc::new(StaticTokenResolver::from_config(&cfg.auth)),
			issuer: Arc::new(MemoryCredentialIssuer::new()),
		}
	}
}

pub struct QuarryService {
	pub cfg: Config,
	pub collaborators: Collaborators,
	ledger: QuotaLedger,
	registration: Throttle,
	status: Throttle,
	store: Arc<dyn WindowStore>,
	clock: Arc<dyn Clock>,
	depth_cap: DepthCap,
	bounds: PageBounds,
}
impl QuarryService {
	pub fn new(cfg: Config, collaborators: Collaborators) -> Self {
		Self::with_store(cfg, collaborators, Arc::new(MemoryWindowStore::new()), Arc::new(SystemClock))
	}

	/// Builds the service over an explicit window store and clock.
	pub fn with_store(
		cfg: Config,
		collaborators: Collaborators,
		store: Arc<dyn WindowStore>,
		clock: Arc<dyn Clock>,
	) -> Self {
		let ledger = QuotaLedger::new(
			store.clone(),
			clock.clone(),
			TierTable::from_config(&cfg.quota),
		);
		let registration = Throttle::registration(&cfg.registration, store.clone(), clock.clone());
		let status = Throttle::status(&cfg.status_throttle, store.clone(), clock.clone());
		let depth_cap = DepthCap::new(cfg.search.max_depth);
		let bounds = PageBounds {
			default_page_size: cfg.search.default_page_size,
			max_page_size: cfg.search.max_page_size,
		};

		Self { cfg, collaborators, ledger, registration, status, store, clock, depth_cap, bounds }
	}

	pub fn ledger(&self) -> &QuotaLedger {
		&self.ledger
	}

	pub fn registration_throttle(&self) -> &Throttle {
		&self.registration
	}

	pub fn depth_cap(&self) -> DepthCap {
		self.depth_cap
	}

	/// Starts background window compaction when `quota.compaction_interval_secs` is non-zero.
	pub fn spawn_compaction(&self) -> Option<JoinHandle<()>> {
		let secs = self.cfg.quota.compaction_interval_secs;

		if secs == 0 {
			return None;
		}

		Some(quarry_quota::spawn_compaction(
			self.store.clone(),
			self.clock.clone(),
			Duration::from_secs(secs),
		))
	}

	async fn resolve_identity(&self, token: Option<&str>) -> Result<ClientIdentity> {
		let Some(token) = token.map(str::trim).filter(|token| !token.is_empty()) else {
			return Err(Error::IdentityUnresolved);
		};

		match self.collaborators.tokens.resolve(token).await? {
			Some(identity) if !identity.client_id.trim().is_empty() => Ok(identity),
			_ => Err(Error::IdentityUnresolved),
		}
	}
}
