use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::MissedTickBehavior};

use crate::{clock::Clock, store::WindowStore};

/// Periodically drops expired entries and empty windows from `store`.
///
/// Expiry is already applied lazily on every access; this only bounds memory held by clients
/// that stopped calling.
pub fn spawn_compaction(
	store: Arc<dyn WindowStore>,
	clock: Arc<dyn Clock>,
	every: Duration,
) -> JoinHandle<()> {
	tokio::spawn(async move {
		let mut ticker = tokio::time::interval(every);

		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
		// The first tick completes immediately.
		ticker.tick().await;

		loop {
			ticker.tick().await;

			let report = store.compact(clock.now());

			tracing::debug!(
				purged_entries = report.purged_entries,
				dropped_windows = report.dropped_windows,
				"Quota windows compacted."
			);
		}
	})
}
