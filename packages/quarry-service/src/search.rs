use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, QuarryService, Result};
use quarry_domain::parse_search_request;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
	pub result_count: u64,
	pub page_count: u64,
	pub results: Vec<Value>,
}

impl QuarryService {
	/// Validates `params`, meters authenticated callers, and fetches one bounded page.
	///
	/// A request without a token is served unmetered. A token that does not resolve is refused.
	/// Quota is only consumed when the index actually answers.
	pub async fn search(
		&self,
		params: &[(String, String)],
		token: Option<&str>,
	) -> Result<SearchResponse> {
		let identity = match token {
			Some(token) => Some(self.resolve_identity(Some(token)).await?),
			None => None,
		};
		let request = parse_search_request(
			params.iter().map(|(name, value)| (name.as_str(), value.as_str())),
			self.bounds,
		)?;
		let window = self.depth_cap.window(request.page, request.page_size).inspect_err(|err| {
			tracing::info!(
				page = request.page,
				page_size = request.page_size,
				offset = err.offset,
				"Deep pagination rejected."
			);
		})?;
		let permit = match identity.as_ref() {
			Some(identity) => {
				let admission = self.ledger.admit(identity)?;

				if !admission.allowed {
					let retry_after = admission.retry_after().unwrap_or_default();

					return Err(Error::QuotaExceeded { retry_after });
				}

				admission.into_permit()
			},
			None => None,
		};
		let timeout = Duration::from_millis(self.cfg.search.index_timeout_ms);
		let outcome =
			tokio::time::timeout(timeout, self.collaborators.index.query(&request.terms, window))
				.await;
		let page = match outcome {
			Ok(Ok(page)) => page,
			Ok(Err(failure)) => {
				if let Some(permit) = permit {
					self.ledger.release(permit);
				}

				tracing::warn!(retryable = failure.retryable, error = %failure.message, "Index query failed.");

				return Err(Error::IndexUnavailable {
					message: failure.message,
					retryable: failure.retryable,
				});
			},
			Err(_) => {
				if let Some(permit) = permit {
					self.ledger.release(permit);
				}

				tracing::warn!(timeout_ms = self.cfg.search.index_timeout_ms, "Index query timed out.");

				return Err(Error::IndexUnavailable {
					message: "Index query timed out.".to_string(),
					retryable: true,
				});
			},
		};

		if let Some(permit) = permit {
			self.ledger.record(permit);
		}

		Ok(SearchResponse {
			result_count: page.total_hits,
			page_count: self.depth_cap.page_count(page.total_hits, request.page_size),
			results: page.results,
		})
	}
}
