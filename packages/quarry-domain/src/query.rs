use std::num::IntErrorKind;

use serde::Serialize;

pub const PAGE_PARAM: &str = "page";
pub const PAGE_SIZE_PARAM: &str = "pagesize";

const LICENSES: [&str; 8] = ["by", "by-sa", "by-nd", "by-nc", "by-nc-sa", "by-nc-nd", "cc0", "pdm"];
const LICENSE_TYPES: [&str; 2] = ["commercial", "modification"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBounds {
	pub default_page_size: u64,
	pub max_page_size: u64,
}
impl Default for PageBounds {
	fn default() -> Self {
		Self { default_page_size: 20, max_page_size: 500 }
	}
}

/// Structured terms and filters forwarded to the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchTerms {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub q: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub creator: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tags: Option<String>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub licenses: Vec<String>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub license_types: Vec<String>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub providers: Vec<String>,
}
impl SearchTerms {
	pub fn is_empty(&self) -> bool {
		self.q.is_none()
			&& self.creator.is_none()
			&& self.title.is_none()
			&& self.tags.is_none()
			&& self.licenses.is_empty()
			&& self.license_types.is_empty()
			&& self.providers.is_empty()
	}
}

/// A validated request. `page >= 1` and `page_size` is within the configured bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
	pub terms: SearchTerms,
	pub page: u64,
	pub page_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", .messages.join(" "))]
pub struct ValidationErrors {
	messages: Vec<String>,
}
impl ValidationErrors {
	pub fn messages(&self) -> &[String] {
		&self.messages
	}

	pub fn into_messages(self) -> Vec<String> {
		self.messages
	}
}

/// Parses raw query parameters into a [`SearchRequest`].
///
/// Every offending parameter is reported, not just the first. Pagination values are never
/// errors: a missing or unusable `page` becomes 1 and a missing or out-of-range `pagesize`
/// becomes the configured default. When a parameter repeats, the last value wins.
pub fn parse_search_request<'a, I>(
	params: I,
	bounds: PageBounds,
) -> Result<SearchRequest, ValidationErrors>
where
	I: IntoIterator<Item = (&'a str, &'a str)>,
{
	let mut terms = SearchTerms::default();
	let mut raw_page = None;
	let mut raw_page_size = None;
	let mut messages = Vec::new();

	for (name, value) in params {
		match name {
			"q" => terms.q = non_blank(value),
			"creator" => terms.creator = non_blank(value),
			"title" => terms.title = non_blank(value),
			"tags" => terms.tags = non_blank(value),
			"li" => terms.licenses = parse_choices(name, value, &LICENSES, &mut messages),
			"lt" => terms.license_types = parse_choices(name, value, &LICENSE_TYPES, &mut messages),
			"provider" => terms.providers = split_list(value).map(str::to_string).collect(),
			PAGE_PARAM => raw_page = Some(value),
			PAGE_SIZE_PARAM => raw_page_size = Some(value),
			unknown => messages.push(format!("Unknown query parameter '{unknown}'.")),
		}
	}

	if terms.is_empty() {
		messages.push(
			"At least one search term or filter is required (q, creator, title, tags, li, lt, provider)."
				.to_string(),
		);
	}
	if !messages.is_empty() {
		return Err(ValidationErrors { messages });
	}

	Ok(SearchRequest {
		terms,
		page: repair_page(raw_page),
		page_size: repair_page_size(raw_page_size, bounds),
	})
}

/// A positive page too large to represent saturates instead of being repaired, so the depth
/// check still rejects it.
pub fn repair_page(raw: Option<&str>) -> u64 {
	match raw.map(|value| value.trim().parse::<i64>()) {
		Some(Ok(page)) if page >= 1 => page as u64,
		Some(Err(err)) if *err.kind() == IntErrorKind::PosOverflow => u64::MAX,
		_ => 1,
	}
}

pub fn repair_page_size(raw: Option<&str>, bounds: PageBounds) -> u64 {
	match raw.map(|value| value.trim().parse::<i64>()) {
		Some(Ok(size)) if size >= 1 && size as u64 <= bounds.max_page_size => size as u64,
		_ => bounds.default_page_size,
	}
}

fn non_blank(value: &str) -> Option<String> {
	let trimmed = value.trim();

	if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
	value.split(',').map(str::trim).filter(|item| !item.is_empty())
}

fn parse_choices(
	name: &str,
	value: &str,
	allowed: &[&str],
	messages: &mut Vec<String>,
) -> Vec<String> {
	let mut accepted = Vec::new();

	for item in split_list(value) {
		let lowered = item.to_ascii_lowercase();

		if allowed.contains(&lowered.as_str()) {
			if !accepted.contains(&lowered) {
				accepted.push(lowered);
			}
		} else {
			messages.push(format!(
				"Invalid value '{item}' for '{name}'; expected one of {}.",
				allowed.join(", ")
			));
		}
	}

	accepted
}
