use std::sync::Arc;

use quarry_config::Config;
use quarry_service::{Collaborators, QuarryService};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<QuarryService>,
}
impl AppState {
	/// Wires the bundled collaborators described by `config`.
	pub fn new(config: Config) -> Self {
		let collaborators = Collaborators::from_config(&config);

		Self { service: Arc::new(QuarryService::new(config, collaborators)) }
	}

	pub fn from_service(service: Arc<QuarryService>) -> Self {
		Self { service }
	}
}
