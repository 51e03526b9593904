use std::{collections::BTreeMap, fmt, mem, sync::Arc};

use serde::Serialize;
use time::Duration;

use crate::{
	Error, Result,
	clock::Clock,
	store::{CompactionReport, WindowKey, WindowLimit, WindowState, WindowStore},
};
use quarry_config::{Quota, TierLimits};
use quarry_domain::ClientIdentity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
	Burst,
	Sustained,
}
impl Scope {
	pub const ALL: [Self; 2] = [Self::Burst, Self::Sustained];

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Burst => "burst",
			Self::Sustained => "sustained",
		}
	}
}

/// Maps a tier name to its ceilings and horizons. Adding a tier is a configuration change only.
#[derive(Debug, Clone, Default)]
pub struct TierTable {
	tiers: BTreeMap<String, TierLimits>,
}
impl TierTable {
	pub fn new(tiers: BTreeMap<String, TierLimits>) -> Self {
		Self { tiers }
	}

	pub fn from_config(quota: &Quota) -> Self {
		Self::new(quota.tiers.clone())
	}

	pub fn limits(&self, tier: &str) -> Result<&TierLimits> {
		self.tiers.get(tier).ok_or_else(|| Error::UnknownTier { tier: tier.to_string() })
	}

	pub fn window_limit(&self, tier: &str, scope: Scope) -> Result<WindowLimit> {
		let limits = self.limits(tier)?;

		Ok(match scope {
			Scope::Burst => WindowLimit::new(limits.burst_ceiling, limits.burst_horizon_secs),
			Scope::Sustained =>
				WindowLimit::new(limits.sustained_ceiling, limits.sustained_horizon_secs),
		})
	}
}

/// Slots held for an admitted request. Hand it to [`QuotaLedger::record`] once the work is done.
///
/// Dropping a permit that was never recorded gives its slots back, so work abandoned midway
/// (a cancelled future, an early return) is never charged.
#[must_use = "an admitted permit must be recorded or released"]
pub struct Permit {
	store: Arc<dyn WindowStore>,
	reservations: Vec<(WindowKey, u64)>,
}
impl Permit {
	fn commit(mut self) -> usize {
		mem::take(&mut self.reservations).len()
	}
}
impl fmt::Debug for Permit {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Permit").field("reservations", &self.reservations).finish_non_exhaustive()
	}
}
impl Drop for Permit {
	fn drop(&mut self) {
		for (key, id) in self.reservations.drain(..) {
			self.store.release(&key, id);
		}
	}
}

#[derive(Debug)]
pub struct Admission {
	pub allowed: bool,
	pub burst: WindowState,
	pub sustained: WindowState,
	permit: Option<Permit>,
}
impl Admission {
	pub fn into_permit(self) -> Option<Permit> {
		self.permit
	}

	/// Longest wait among the windows that are at their ceiling.
	pub fn retry_after(&self) -> Option<Duration> {
		[self.burst.retry_after, self.sustained.retry_after].into_iter().flatten().max()
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QuotaUsage {
	pub burst: u64,
	pub sustained: u64,
}

/// Burst and sustained sliding-window accounting per (tier, client).
pub struct QuotaLedger {
	store: Arc<dyn WindowStore>,
	clock: Arc<dyn Clock>,
	tiers: TierTable,
}
impl QuotaLedger {
	pub fn new(store: Arc<dyn WindowStore>, clock: Arc<dyn Clock>, tiers: TierTable) -> Self {
		Self { store, clock, tiers }
	}

	pub fn tiers(&self) -> &TierTable {
		&self.tiers
	}

	pub fn key(identity: &ClientIdentity, scope: Scope) -> WindowKey {
		WindowKey::new(format!("{}_{}", identity.tier, scope.as_str()), identity.client_id.as_str())
	}

	/// Reserves one slot in both scopes, or none.
	///
	/// Each scope is checked and reserved atomically. A sustained denial gives back the burst
	/// slot it already took, so a denied admission never leaves a trace.
	pub fn admit(&self, identity: &ClientIdentity) -> Result<Admission> {
		let burst_limit = self.tiers.window_limit(&identity.tier, Scope::Burst)?;
		let sustained_limit = self.tiers.window_limit(&identity.tier, Scope::Sustained)?;
		let burst_key = Self::key(identity, Scope::Burst);
		let sustained_key = Self::key(identity, Scope::Sustained);
		let now = self.clock.now();
		let burst = self.store.try_acquire(&burst_key, now, burst_limit);
		let Some(burst_id) = burst.reservation else {
			tracing::info!(
				client_id = %identity.client_id,
				tier = %identity.tier,
				count = burst.state.count,
				"Burst quota exhausted."
			);

			return Ok(Admission {
				allowed: false,
				burst: burst.state,
				sustained: self.store.state(&sustained_key, now, sustained_limit),
				permit: None,
			});
		};
		let sustained = self.store.try_acquire(&sustained_key, now, sustained_limit);
		let Some(sustained_id) = sustained.reservation else {
			self.store.release(&burst_key, burst_id);

			tracing::info!(
				client_id = %identity.client_id,
				tier = %identity.tier,
				count = sustained.state.count,
				"Sustained quota exhausted."
			);

			return Ok(Admission {
				allowed: false,
				burst: self.store.state(&burst_key, now, burst_limit),
				sustained: sustained.state,
				permit: None,
			});
		};

		Ok(Admission {
			allowed: true,
			burst: burst.state,
			sustained: sustained.state,
			permit: Some(Permit {
				store: self.store.clone(),
				reservations: vec![(burst_key, burst_id), (sustained_key, sustained_id)],
			}),
		})
	}

	/// Commits the slots held by `permit`.
	pub fn record(&self, permit: Permit) {
		let windows = permit.commit();

		tracing::debug!(windows, "Quota consumption recorded.");
	}

	/// Returns the slots held by `permit` to their windows.
	pub fn release(&self, permit: Permit) {
		drop(permit);
	}

	/// Live request counts for both scopes. Read-only; a client with no history reports zeros.
	pub fn inspect(&self, identity: &ClientIdentity) -> Result<QuotaUsage> {
		let now = self.clock.now();
		let mut usage = QuotaUsage::default();

		for scope in Scope::ALL {
			let limit = self.tiers.window_limit(&identity.tier, scope)?;
			let count = self.store.state(&Self::key(identity, scope), now, limit).count;

			match scope {
				Scope::Burst => usage.burst = count,
				Scope::Sustained => usage.sustained = count,
			}
		}

		Ok(usage)
	}

	pub fn compact(&self) -> CompactionReport {
		self.store.compact(self.clock.now())
	}
}

#[cfg(test)]
mod tests {
	use std::thread;

	use time::macros::datetime;

	use super::*;
	use crate::{clock::ManualClock, store::MemoryWindowStore};

	fn tiers() -> TierTable {
		let mut tiers = BTreeMap::new();

		tiers.insert(
			"standard".to_string(),
			TierLimits {
				burst_ceiling: 3,
				burst_horizon_secs: 60,
				sustained_ceiling: 5,
				sustained_horizon_secs: 86_400,
			},
		);
		tiers.insert(
			"enhanced".to_string(),
			TierLimits {
				burst_ceiling: 6,
				burst_horizon_secs: 60,
				sustained_ceiling: 10,
				sustained_horizon_secs: 86_400,
			},
		);

		TierTable::new(tiers)
	}

	fn ledger() -> (QuotaLedger, ManualClock) {
		let clock = ManualClock::new(datetime!(2024-05-01 12:00 UTC));
		let ledger =
			QuotaLedger::new(Arc::new(MemoryWindowStore::new()), Arc::new(clock.clone()), tiers());

		(ledger, clock)
	}

	fn admit_and_record(ledger: &QuotaLedger, identity: &ClientIdentity) -> bool {
		let admission = ledger.admit(identity).expect("Tier must be known.");
		let allowed = admission.allowed;

		if let Some(permit) = admission.into_permit() {
			ledger.record(permit);
		}

		allowed
	}

	#[test]
	fn burst_ceiling_denies_and_reopens_after_horizon() {
		let (ledger, clock) = ledger();
		let client = ClientIdentity::new("client-a", "standard");

		for _ in 0..3 {
			assert!(admit_and_record(&ledger, &client));
		}

		let denied = ledger.admit(&client).expect("Tier must be known.");

		assert!(!denied.allowed);
		assert_eq!(denied.burst.count, 3);
		assert_eq!(denied.retry_after(), Some(Duration::seconds(60)));

		clock.advance(Duration::seconds(60));

		assert!(admit_and_record(&ledger, &client));
	}

	#[test]
	fn sustained_denial_returns_burst_slot() {
		let (ledger, clock) = ledger();
		let client = ClientIdentity::new("client-a", "standard");

		for _ in 0..5 {
			assert!(admit_and_record(&ledger, &client));
			clock.advance(Duration::seconds(61));
		}

		let denied = ledger.admit(&client).expect("Tier must be known.");

		assert!(!denied.allowed);
		assert_eq!(denied.sustained.count, 5);
		assert_eq!(denied.burst.count, 0);
		assert_eq!(ledger.inspect(&client).expect("Tier must be known."), QuotaUsage {
			burst: 0,
			sustained: 5
		});
	}

	#[test]
	fn tiers_and_clients_are_isolated() {
		let (ledger, _clock) = ledger();
		let standard = ClientIdentity::new("client-a", "standard");
		let enhanced = ClientIdentity::new("client-a", "enhanced");
		let other = ClientIdentity::new("client-b", "standard");

		for _ in 0..3 {
			assert!(admit_and_record(&ledger, &standard));
		}

		assert!(!admit_and_record(&ledger, &standard));
		assert!(admit_and_record(&ledger, &enhanced));
		assert!(admit_and_record(&ledger, &other));
	}

	#[test]
	fn released_permit_is_not_counted() {
		let (ledger, _clock) = ledger();
		let client = ClientIdentity::new("client-a", "standard");
		let permit = ledger
			.admit(&client)
			.expect("Tier must be known.")
			.into_permit()
			.expect("Expected a permit.");

		assert_eq!(ledger.inspect(&client).expect("Tier must be known.").burst, 1);

		ledger.release(permit);

		assert_eq!(
			ledger.inspect(&client).expect("Tier must be known."),
			QuotaUsage::default()
		);
	}

	#[test]
	fn dropped_permit_gives_slots_back() {
		let (ledger, _clock) = ledger();
		let client = ClientIdentity::new("client-a", "standard");
		let permit = ledger
			.admit(&client)
			.expect("Tier must be known.")
			.into_permit()
			.expect("Expected a permit.");

		assert_eq!(ledger.inspect(&client).expect("Tier must be known."), QuotaUsage {
			burst: 1,
			sustained: 1
		});

		drop(permit);

		assert_eq!(ledger.inspect(&client).expect("Tier must be known."), QuotaUsage::default());

		assert!(admit_and_record(&ledger, &client));
		assert_eq!(ledger.inspect(&client).expect("Tier must be known."), QuotaUsage {
			burst: 1,
			sustained: 1
		});
	}

	#[test]
	fn unknown_tier_is_a_configuration_error() {
		let (ledger, _clock) = ledger();
		let client = ClientIdentity::new("client-a", "platinum");

		assert!(matches!(ledger.admit(&client), Err(Error::UnknownTier { tier }) if tier == "platinum"));
		assert!(matches!(ledger.inspect(&client), Err(Error::UnknownTier { .. })));
	}

	#[test]
	fn inspect_is_idempotent_and_zero_without_history() {
		let (ledger, clock) = ledger();
		let client = ClientIdentity::new("client-a", "enhanced");

		assert_eq!(ledger.inspect(&client).expect("Tier must be known."), QuotaUsage::default());

		assert!(admit_and_record(&ledger, &client));
		clock.advance(Duration::seconds(10));

		let first = ledger.inspect(&client).expect("Tier must be known.");
		let second = ledger.inspect(&client).expect("Tier must be known.");

		assert_eq!(first, second);
		assert_eq!(first, QuotaUsage { burst: 1, sustained: 1 });
	}

	#[test]
	fn window_boundary_is_exclusive() {
		let (ledger, clock) = ledger();
		let client = ClientIdentity::new("client-a", "standard");

		assert!(admit_and_record(&ledger, &client));

		clock.advance(Duration::seconds(60) - Duration::milliseconds(1));

		assert_eq!(ledger.inspect(&client).expect("Tier must be known.").burst, 1);

		clock.advance(Duration::milliseconds(1));

		assert_eq!(ledger.inspect(&client).expect("Tier must be known.").burst, 0);
		assert_eq!(ledger.inspect(&client).expect("Tier must be known.").sustained, 1);
	}

	#[test]
	fn concurrent_admissions_never_exceed_ceiling() {
		let (ledger, _clock) = ledger();
		let ledger = Arc::new(ledger);
		let client = ClientIdentity::new("client-a", "enhanced");
		let admitted = thread::scope(|scope| {
			let handles: Vec<_> = (0..64)
				.map(|_| {
					let ledger = Arc::clone(&ledger);
					let client = client.clone();

					scope.spawn(move || admit_and_record(&ledger, &client))
				})
				.collect();

			handles
				.into_iter()
				.map(|handle| handle.join().expect("Admission thread panicked."))
				.filter(|allowed| *allowed)
				.count()
		});

		assert_eq!(admitted, 6);
		assert_eq!(ledger.inspect(&client).expect("Tier must be known.").burst, 6);
	}

	#[test]
	fn compaction_preserves_counts() {
		let (ledger, clock) = ledger();
		let client = ClientIdentity::new("client-a", "standard");

		assert!(admit_and_record(&ledger, &client));

		clock.advance(Duration::seconds(120));

		let before = ledger.inspect(&client).expect("Tier must be known.");
		let report = ledger.compact();

		assert_eq!(report.purged_entries, 1);
		assert_eq!(ledger.inspect(&client).expect("Tier must be known."), before);
	}
}
