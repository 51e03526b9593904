use serde::{Deserialize, Serialize};

/// An authenticated client as resolved from its access token.
///
/// `tier` names a rate-limit profile. It is kept as the raw name so that a tier the quota table
/// does not know about surfaces as a configuration fault instead of failing resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientIdentity {
	pub client_id: String,
	pub tier: String,
}
impl ClientIdentity {
	pub fn new(client_id: impl Into<String>, tier: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), tier: tier.into() }
	}
}
