use std::sync::Mutex;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::{BoxFuture, CredentialIssuer, register::Registration};

/// Credentials handed back to a newly registered client. The secret is shown exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCredentials {
	pub client_id: String,
	pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct RegisteredApplication {
	pub client_id: String,
	/// blake3 digest of the client secret, hex encoded.
	pub secret_digest: String,
	pub name: String,
	pub description: String,
	pub email: String,
	pub created_at: OffsetDateTime,
}

/// Keeps registered applications in process memory. Only the secret's digest is retained.
#[derive(Debug, Default)]
pub struct MemoryCredentialIssuer {
	applications: Mutex<Vec<RegisteredApplication>>,
}
impl MemoryCredentialIssuer {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn applications(&self) -> Vec<RegisteredApplication> {
		self.applications.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	/// Checks `secret` against the stored digest for `client_id`.
	pub fn verify(&self, client_id: &str, secret: &str) -> bool {
		let digest = secret_digest(secret);

		self.applications
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.iter()
			.any(|app| app.client_id == client_id && app.secret_digest == digest)
	}
}
impl CredentialIssuer for MemoryCredentialIssuer {
	fn issue<'a>(
		&'a self,
		registration: &'a Registration,
	) -> BoxFuture<'a, color_eyre::Result<IssuedCredentials>> {
		let client_id = Uuid::new_v4().simple().to_string();
		let client_secret =
			format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
		let application = RegisteredApplication {
			client_id: client_id.clone(),
			secret_digest: secret_digest(&client_secret),
			name: registration.name.clone(),
			description: registration.description.clone(),
			email: registration.email.clone(),
			created_at: OffsetDateTime::now_utc(),
		};

		self.applications.lock().unwrap_or_else(|err| err.into_inner()).push(application);

		Box::pin(async move { Ok(IssuedCredentials { client_id, client_secret }) })
	}
}

fn secret_digest(secret: &str) -> String {
	blake3::hash(secret.as_bytes()).to_hex().to_string()
}
