use std::{collections::BTreeMap, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, QuarryService, Result};
use quarry_quota::ThrottleDecision;

const MAX_NAME_CHARS: usize = 150;
const MAX_DESCRIPTION_CHARS: usize = 10_000;
const MAX_EMAIL_CHARS: usize = 254;

static EMAIL: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").ok());

/// Raw registration body; every field is optional so missing ones can be reported by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationRequest {
	pub name: Option<String>,
	pub description: Option<String>,
	pub email: Option<String>,
}

/// A registration that passed field validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
	pub name: String,
	pub description: String,
	pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationResponse {
	pub client_id: String,
	pub client_secret: String,
	pub name: String,
}

impl RegistrationRequest {
	/// Field-keyed validation, reporting every bad field at once.
	pub fn validate(self) -> std::result::Result<Registration, BTreeMap<String, Vec<String>>> {
		let mut fields = BTreeMap::new();
		let name = check_text(&mut fields, "name", self.name, MAX_NAME_CHARS);
		let description =
			check_text(&mut fields, "description", self.description, MAX_DESCRIPTION_CHARS);
		let email = check_text(&mut fields, "email", self.email, MAX_EMAIL_CHARS);

		if let Some(email) = email.as_deref()
			&& !EMAIL.as_ref().is_some_and(|re| re.is_match(email))
		{
			push(&mut fields, "email", "Enter a valid email address.");
		}
		if !fields.is_empty() {
			return Err(fields);
		}

		match (name, description, email) {
			(Some(name), Some(description), Some(email)) =>
				Ok(Registration { name, description, email }),
			_ => Err(fields),
		}
	}
}

impl QuarryService {
	/// Issues credentials, at most `registration.ceiling` times per requester per horizon.
	///
	/// The throttle runs before body validation, so rejected bodies still use up an attempt.
	pub async fn register(
		&self,
		requester: &str,
		req: RegistrationRequest,
	) -> Result<RegistrationResponse> {
		if let ThrottleDecision::Denied { retry_after } = self.registration.check(requester) {
			return Err(Error::QuotaExceeded { retry_after });
		}

		let registration =
			req.validate().map_err(|fields| Error::InvalidRegistration { fields })?;
		let issued = self.collaborators.issuer.issue(&registration).await?;

		tracing::info!(client_id = %issued.client_id, name = %registration.name, "Client registered.");

		Ok(RegistrationResponse {
			client_id: issued.client_id,
			client_secret: issued.client_secret,
			name: registration.name,
		})
	}
}

fn check_text(
	fields: &mut BTreeMap<String, Vec<String>>,
	field: &str,
	value: Option<String>,
	max_chars: usize,
) -> Option<String> {
	let Some(value) = value else {
		push(fields, field, "This field is required.");

		return None;
	};
	let trimmed = value.trim();

	if trimmed.is_empty() {
		push(fields, field, "This field may not be blank.");

		return None;
	}
	if trimmed.chars().count() > max_chars {
		push(fields, field, &format!("Ensure this field has no more than {max_chars} characters."));

		return None;
	}

	Some(trimmed.to_string())
}

fn push(fields: &mut BTreeMap<String, Vec<String>>, field: &str, message: &str) {
	fields.entry(field.to_string()).or_default().push(message.to_string());
}
