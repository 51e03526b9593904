use std::collections::HashMap;

use quarry_config::Auth;
use quarry_domain::ClientIdentity;

use crate::{BoxFuture, TokenResolver};

/// Resolves tokens listed under `[[auth.tokens]]`.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenResolver {
	tokens: HashMap<String, ClientIdentity>,
}
impl StaticTokenResolver {
	pub fn new(tokens: HashMap<String, ClientIdentity>) -> Self {
		Self { tokens }
	}

	pub fn from_config(auth: &Auth) -> Self {
		let tokens = auth
			.tokens
			.iter()
			.map(|row| (row.token.clone(), ClientIdentity::new(row.client_id.as_str(), row.tier.as_str())))
			.collect();

		Self { tokens }
	}

	pub fn insert(&mut self, token: impl Into<String>, identity: ClientIdentity) {
		self.tokens.insert(token.into(), identity);
	}
}
impl TokenResolver for StaticTokenResolver {
	fn resolve<'a>(
		&'a self,
		token: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Option<ClientIdentity>>> {
		let identity = self.tokens.get(token).cloned();

		Box::pin(async move { Ok(identity) })
	}
}
