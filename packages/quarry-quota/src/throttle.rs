use std::sync::Arc;

use time::Duration;

use crate::{
	clock::Clock,
	store::{WindowKey, WindowLimit, WindowStore},
};

pub const REGISTRATION_SCOPE: &str = "registration";
pub const STATUS_SCOPE: &str = "rate_limit_status";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
	Allowed { remaining: u64 },
	Denied { retry_after: Duration },
}
impl ThrottleDecision {
	pub fn is_allowed(&self) -> bool {
		matches!(self, Self::Allowed { .. })
	}
}

/// A single-scope window keyed by requester rather than by authenticated client.
///
/// Shares the window store with the quota ledger; `check` admits and records in one atomic step.
pub struct Throttle {
	scope: String,
	limit: WindowLimit,
	store: Arc<dyn WindowStore>,
	clock: Arc<dyn Clock>,
}
impl Throttle {
	pub fn new(
		scope: impl Into<String>,
		limit: WindowLimit,
		store: Arc<dyn WindowStore>,
		clock: Arc<dyn Clock>,
	) -> Self {
		Self { scope: scope.into(), limit, store, clock }
	}

	/// Gate in front of credential issuance.
	pub fn registration(
		cfg: &quarry_config::Throttle,
		store: Arc<dyn WindowStore>,
		clock: Arc<dyn Clock>,
	) -> Self {
		Self::new(REGISTRATION_SCOPE, WindowLimit::new(cfg.ceiling, cfg.horizon_secs), store, clock)
	}

	pub fn status(
		cfg: &quarry_config::Throttle,
		store: Arc<dyn WindowStore>,
		clock: Arc<dyn Clock>,
	) -> Self {
		Self::new(STATUS_SCOPE, WindowLimit::new(cfg.ceiling, cfg.horizon_secs), store, clock)
	}

	pub fn limit(&self) -> WindowLimit {
		self.limit
	}

	pub fn check(&self, requester: &str) -> ThrottleDecision {
		let key = self.key(requester);
		let acquired = self.store.try_acquire(&key, self.clock.now(), self.limit);

		match acquired.reservation {
			Some(_) => ThrottleDecision::Allowed { remaining: acquired.state.remaining() },
			None => {
				let retry_after = acquired.state.retry_after.unwrap_or(self.limit.horizon);

				tracing::info!(scope = %self.scope, %requester, "Request throttled.");

				ThrottleDecision::Denied { retry_after }
			},
		}
	}

	/// Attempts counted against `requester` right now.
	pub fn usage(&self, requester: &str) -> u64 {
		self.store.state(&self.key(requester), self.clock.now(), self.limit).count
	}

	fn key(&self, requester: &str) -> WindowKey {
		WindowKey::new(self.scope.as_str(), requester)
	}
}
