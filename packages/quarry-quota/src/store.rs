use std::{
	collections::VecDeque,
	fmt,
	sync::atomic::{AtomicU64, Ordering},
};

use dashmap::DashMap;
use time::{Duration, OffsetDateTime};

/// Storage key for one sliding window: a scope (e.g. `standard_burst`) and the subject counted in
/// it (a client id or a requester address).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowKey {
	pub scope: String,
	pub subject: String,
}
impl WindowKey {
	pub fn new(scope: impl Into<String>, subject: impl Into<String>) -> Self {
		Self { scope: scope.into(), subject: subject.into() }
	}
}
impl fmt::Display for WindowKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "throttle_{}_{}", self.scope, self.subject)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLimit {
	pub ceiling: u64,
	pub horizon: Duration,
}
impl WindowLimit {
	pub fn new(ceiling: u64, horizon_secs: u64) -> Self {
		Self { ceiling, horizon: Duration::seconds(horizon_secs.min(i64::MAX as u64) as i64) }
	}
}

/// Snapshot of one window after a decision or a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
	/// Live entries, i.e. those younger than the horizon.
	pub count: u64,
	pub ceiling: u64,
	/// Time until the window drops back below its ceiling. `None` while under the ceiling.
	pub retry_after: Option<Duration>,
}
impl WindowState {
	pub fn remaining(&self) -> u64 {
		self.ceiling.saturating_sub(self.count)
	}
}

/// Outcome of [`WindowStore::try_acquire`]. `reservation` is set only when an entry was appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acquired {
	pub reservation: Option<u64>,
	pub state: WindowState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactionReport {
	pub purged_entries: usize,
	pub dropped_windows: usize,
}

/// Backing storage for sliding windows.
///
/// An entry stamped at `t` is live at `now` iff `now - t < horizon`. Implementations must make
/// `try_acquire` atomic per key: the expiry, the ceiling comparison and the append happen under
/// one lock, so concurrent callers can never push a window past its ceiling.
pub trait WindowStore
where
	Self: Send + Sync,
{
	/// Drops expired entries, then appends one stamped `now` if fewer than `limit.ceiling` are
	/// live.
	fn try_acquire(&self, key: &WindowKey, now: OffsetDateTime, limit: WindowLimit) -> Acquired;

	/// Removes a reservation made by `try_acquire`. Unknown ids are ignored.
	fn release(&self, key: &WindowKey, reservation: u64);

	/// Counts live entries without mutating anything.
	fn state(&self, key: &WindowKey, now: OffsetDateTime, limit: WindowLimit) -> WindowState;

	/// Physically removes expired entries and empty windows. Never changes what `state` reports
	/// for a live entry.
	fn compact(&self, now: OffsetDateTime) -> CompactionReport;
}

#[derive(Debug, Clone, Copy)]
struct Stamp {
	id: u64,
	at: OffsetDateTime,
}

#[derive(Debug)]
struct Window {
	horizon: Duration,
	// Sorted by `at`.
	stamps: VecDeque<Stamp>,
}
impl Window {
	fn expire(&mut self, now: OffsetDateTime) -> usize {
		let before = self.stamps.len();

		while self.stamps.front().is_some_and(|stamp| now - stamp.at >= self.horizon) {
			self.stamps.pop_front();
		}

		before - self.stamps.len()
	}

	fn insert(&mut self, stamp: Stamp) {
		let pos = self.stamps.partition_point(|existing| existing.at <= stamp.at);

		self.stamps.insert(pos, stamp);
	}
}

/// In-process [`WindowStore`] backed by a sharded concurrent map.
#[derive(Debug, Default)]
pub struct MemoryWindowStore {
	windows: DashMap<WindowKey, Window>,
	next_id: AtomicU64,
}
impl MemoryWindowStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn window_count(&self) -> usize {
		self.windows.len()
	}

	/// Physically stored entries for `key`, expired ones included.
	pub fn stored_entries(&self, key: &WindowKey) -> usize {
		self.windows.get(key).map(|window| window.stamps.len()).unwrap_or(0)
	}
}
impl WindowStore for MemoryWindowStore {
	fn try_acquire(&self, key: &WindowKey, now: OffsetDateTime, limit: WindowLimit) -> Acquired {
		// The entry guard holds the shard write lock until it drops.
		let mut window = self
			.windows
			.entry(key.clone())
			.or_insert_with(|| Window { horizon: limit.horizon, stamps: VecDeque::new() });

		window.horizon = limit.horizon;
		window.expire(now);

		if (window.stamps.len() as u64) >= limit.ceiling {
			let state = live_state(&window.stamps, now, limit);

			return Acquired { reservation: None, state };
		}

		let id = self.next_id.fetch_add(1, Ordering::Relaxed);

		window.insert(Stamp { id, at: now });

		Acquired { reservation: Some(id), state: live_state(&window.stamps, now, limit) }
	}

	fn release(&self, key: &WindowKey, reservation: u64) {
		if let Some(mut window) = self.windows.get_mut(key)
			&& let Some(pos) = window.stamps.iter().rposition(|stamp| stamp.id == reservation)
		{
			window.stamps.remove(pos);
		}
	}

	fn state(&self, key: &WindowKey, now: OffsetDateTime, limit: WindowLimit) -> WindowState {
		match self.windows.get(key) {
			Some(window) => live_state(&window.stamps, now, limit),
			None => WindowState { count: 0, ceiling: limit.ceiling, retry_after: None },
		}
	}

	fn compact(&self, now: OffsetDateTime) -> CompactionReport {
		let mut report = CompactionReport::default();

		self.windows.retain(|_, window| {
			report.purged_entries += window.expire(now);

			if window.stamps.is_empty() {
				report.dropped_windows += 1;

				false
			} else {
				true
			}
		});

		report
	}
}

fn live_state(stamps: &VecDeque<Stamp>, now: OffsetDateTime, limit: WindowLimit) -> WindowState {
	let live: Vec<OffsetDateTime> = stamps
		.iter()
		.filter(|stamp| now - stamp.at < limit.horizon)
		.map(|stamp| stamp.at)
		.collect();
	let count = live.len() as u64;
	// The window reopens once enough of the oldest live entries age out.
	let retry_after = if count >= limit.ceiling && limit.ceiling > 0 {
		let blocking = live[(count - limit.ceiling) as usize];

		Some((limit.horizon - (now - blocking)).max(Duration::ZERO))
	} else {
		None
	};

	WindowState { count, ceiling: limit.ceiling, retry_after }
}
