use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::{Error, Result};
use quarry_domain::SearchTerms;

/// One page of ranked documents plus the index's total hit count for the query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexPage {
	pub total_hits: u64,
	pub results: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct QueryBody<'a> {
	terms: &'a SearchTerms,
	offset: u64,
	limit: u64,
}

pub async fn query(
	cfg: &quarry_config::Index,
	terms: &SearchTerms,
	offset: u64,
	limit: u64,
) -> Result<IndexPage> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base.trim_end_matches('/'), cfg.path);
	let res = client
		.post(url)
		.headers(crate::auth_headers(cfg.api_key.as_deref(), &cfg.default_headers)?)
		.json(&QueryBody { terms, offset, limit })
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;
	let page = parse_index_response(json)?;

	tracing::debug!(offset, limit, total_hits = page.total_hits, "Index page fetched.");

	Ok(page)
}

/// Accepts either `{total_hits, results}` or an Elasticsearch-style `{hits: {total, hits}}` body.
fn parse_index_response(json: Value) -> Result<IndexPage> {
	if let Some(total_hits) = json.get("total_hits").and_then(Value::as_u64) {
		let results = json
			.get("results")
			.and_then(Value::as_array)
			.cloned()
			.ok_or_else(|| invalid("Index response is missing results array."))?;

		return Ok(IndexPage { total_hits, results });
	}

	let hits = json.get("hits").ok_or_else(|| invalid("Index response is missing hits."))?;
	let total = hits.get("total").ok_or_else(|| invalid("Index response is missing hits.total."))?;
	let total_hits = total
		.as_u64()
		.or_else(|| total.get("value").and_then(Value::as_u64))
		.ok_or_else(|| invalid("Index hits.total must be a non-negative integer."))?;
	let results = hits
		.get("hits")
		.and_then(Value::as_array)
		.ok_or_else(|| invalid("Index response is missing hits.hits array."))?
		.iter()
		.map(|hit| hit.get("_source").cloned().unwrap_or_else(|| hit.clone()))
		.collect();

	Ok(IndexPage { total_hits, results })
}

fn invalid(message: &str) -> Error {
	Error::InvalidResponse { message: message.to_string() }
}
