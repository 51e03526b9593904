pub mod clock;
pub mod compaction;
pub mod ledger;
pub mod store;
pub mod throttle;

mod error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use compaction::spawn_compaction;
pub use error::{Error, Result};
pub use ledger::{Admission, Permit, QuotaLedger, QuotaUsage, Scope, TierTable};
pub use store::{
	Acquired, CompactionReport, MemoryWindowStore, WindowKey, WindowLimit, WindowState,
	WindowStore,
};
pub use throttle::{Throttle, ThrottleDecision};
