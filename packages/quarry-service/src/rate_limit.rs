use serde::{Deserialize, Serialize};

use crate::{Error, QuarryService, Result};
use quarry_quota::ThrottleDecision;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
	pub requests_this_minute: u64,
	pub requests_today: u64,
	pub rate_limit_model: String,
}

impl QuarryService {
	/// Reports the caller's own burst and sustained usage without consuming either.
	///
	/// The endpoint has its own per-requester throttle, which is charged before the token is
	/// looked at.
	pub async fn rate_limit_status(
		&self,
		requester: &str,
		token: Option<&str>,
	) -> Result<RateLimitStatus> {
		if let ThrottleDecision::Denied { retry_after } = self.status.check(requester) {
			return Err(Error::QuotaExceeded { retry_after });
		}

		let identity = self.resolve_identity(token).await?;
		let usage = self.ledger.inspect(&identity).inspect_err(|err| {
			tracing::error!(client_id = %identity.client_id, error = %err, "Quota tier misconfigured.");
		})?;

		Ok(RateLimitStatus {
			requests_this_minute: usage.burst,
			requests_today: usage.sustained,
			rate_limit_model: identity.tier,
		})
	}
}
