use quarry_domain::{PageWindow, SearchTerms};
use quarry_providers::IndexPage;

use crate::{BoxFuture, SearchIndex};

/// Why the index could not answer. `retryable` failures (timeouts, unreachable, 5xx) never
/// count against a client's quota.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFailure {
	pub message: String,
	pub retryable: bool,
}
impl IndexFailure {
	pub fn retryable(message: impl Into<String>) -> Self {
		Self { message: message.into(), retryable: true }
	}

	pub fn fatal(message: impl Into<String>) -> Self {
		Self { message: message.into(), retryable: false }
	}
}

impl From<quarry_providers::Error> for IndexFailure {
	fn from(err: quarry_providers::Error) -> Self {
		Self { retryable: err.is_retryable(), message: err.to_string() }
	}
}

/// [`SearchIndex`] backed by the JSON-over-HTTP index client.
pub struct HttpIndex {
	cfg: quarry_config::Index,
}
impl HttpIndex {
	pub fn new(cfg: quarry_config::Index) -> Self {
		Self { cfg }
	}
}
impl SearchIndex for HttpIndex {
	fn query<'a>(
		&'a self,
		terms: &'a SearchTerms,
		window: PageWindow,
	) -> BoxFuture<'a, Result<IndexPage, IndexFailure>> {
		Box::pin(async move {
			quarry_providers::index::query(&self.cfg, terms, window.offset, window.limit)
				.await
				.map_err(IndexFailure::from)
		})
	}
}
