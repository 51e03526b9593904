use std::collections::BTreeMap;

use time::Duration;

use quarry_domain::{DeepPaginationError, ValidationErrors};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0}")]
	Validation(ValidationErrors),
	#[error(transparent)]
	DeepPagination(#[from] DeepPaginationError),
	#[error("Request was throttled. Expected available in {} seconds.", retry_after_secs(.retry_after))]
	QuotaExceeded { retry_after: Duration },
	#[error("Forbidden")]
	IdentityUnresolved,
	#[error("{message}")]
	Configuration { message: String },
	#[error("Search index error: {message}")]
	IndexUnavailable { message: String, retryable: bool },
	#[error("Invalid registration.")]
	InvalidRegistration { fields: BTreeMap<String, Vec<String>> },
	#[error("Collaborator error: {message}")]
	Collaborator { message: String },
}
impl Error {
	/// Whole seconds a client should wait, rounded up. Zero for errors that are not rate limits.
	pub fn retry_after_secs(&self) -> u64 {
		match self {
			Self::QuotaExceeded { retry_after } => retry_after_secs(retry_after),
			_ => 0,
		}
	}
}

impl From<ValidationErrors> for Error {
	fn from(err: ValidationErrors) -> Self {
		Self::Validation(err)
	}
}

impl From<quarry_quota::Error> for Error {
	fn from(err: quarry_quota::Error) -> Self {
		match err {
			quarry_quota::Error::UnknownTier { .. } => Self::Configuration { message: err.to_string() },
		}
	}
}

impl From<color_eyre::Report> for Error {
	fn from(err: color_eyre::Report) -> Self {
		Self::Collaborator { message: err.to_string() }
	}
}

fn retry_after_secs(retry_after: &Duration) -> u64 {
	let millis = u64::try_from(retry_after.whole_milliseconds().max(0)).unwrap_or(u64::MAX);

	millis.div_ceil(1_000)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rounds_retry_after_up_to_whole_seconds() {
		let err = Error::QuotaExceeded { retry_after: Duration::milliseconds(1_200) };

		assert_eq!(err.retry_after_secs(), 2);
		assert_eq!(err.to_string(), "Request was throttled. Expected available in 2 seconds.");
		assert_eq!(Error::IdentityUnresolved.retry_after_secs(), 0);

		let err = Error::QuotaExceeded { retry_after: Duration::seconds(i64::MAX) };

		assert_eq!(err.retry_after_secs(), u64::MAX.div_ceil(1_000));
	}

	#[test]
	fn unknown_tier_maps_to_configuration() {
		let err: Error = quarry_quota::Error::UnknownTier { tier: "gold".to_string() }.into();

		assert!(matches!(err, Error::Configuration { .. }));
		assert_eq!(err.to_string(), "Unknown API key rate limit type 'gold'.");
	}
}
