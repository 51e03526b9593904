use std::{convert::Infallible, net::SocketAddr};

use axum::{
	Json, Router,
	extract::{
		ConnectInfo, FromRequestParts, Query, State,
		rejection::{JsonRejection, QueryRejection},
	},
	http::{HeaderValue, StatusCode, header, request::Parts},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde_json::{Value, json};

use crate::state::AppState;
use quarry_service::{
	Error as ServiceError, RateLimitStatus, RegistrationRequest, RegistrationResponse,
	SearchResponse,
};

const FORWARDED_FOR: &str = "x-forwarded-for";
const ANONYMOUS: &str = "anonymous";

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/healthcheck", get(health))
		.route("/image/search", get(search))
		.route("/v1/rate_limit", get(rate_limit))
		.route("/oauth2/register", post(register))
		.with_state(state)
}

/// Who is asking: the first `X-Forwarded-For` hop, else the peer address, else `anonymous`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester(pub String);
impl<S> FromRequestParts<S> for Requester
where
	S: Send + Sync,
{
	type Rejection = Infallible;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		if let Some(first) = parts
			.headers
			.get(FORWARDED_FOR)
			.and_then(|value| value.to_str().ok())
			.and_then(|value| value.split(',').next())
			.map(str::trim)
			.filter(|value| !value.is_empty())
		{
			return Ok(Self(first.to_string()));
		}
		if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
			return Ok(Self(addr.ip().to_string()));
		}

		Ok(Self(ANONYMOUS.to_string()))
	}
}

/// The bearer token, if an `Authorization` header was sent.
///
/// A header with another scheme yields an empty token, which never resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub Option<String>);
impl BearerToken {
	fn as_deref(&self) -> Option<&str> {
		self.0.as_deref()
	}
}
impl<S> FromRequestParts<S> for BearerToken
where
	S: Send + Sync,
{
	type Rejection = Infallible;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
			return Ok(Self(None));
		};
		let raw = value.to_str().unwrap_or_default().trim();
		let token = match raw.split_once(' ') {
			Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
			_ => "",
		};

		Ok(Self(Some(token.to_string())))
	}
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	token: BearerToken,
	params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
	let Query(params) = params.map_err(|rejection| {
		ApiError::new(StatusCode::BAD_REQUEST, json!({ "validation_error": rejection.body_text() }))
	})?;
	let response = state.service.search(&params, token.as_deref()).await?;

	Ok(Json(response))
}

async fn rate_limit(
	State(state): State<AppState>,
	Requester(requester): Requester,
	token: BearerToken,
) -> Result<Json<RateLimitStatus>, ApiError> {
	let response = state.service.rate_limit_status(&requester, token.as_deref()).await?;

	Ok(Json(response))
}

async fn register(
	State(state): State<AppState>,
	Requester(requester): Requester,
	payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegistrationResponse>), ApiError> {
	let Json(payload) = payload.map_err(|rejection| {
		ApiError::new(StatusCode::BAD_REQUEST, json!({ "detail": rejection.body_text() }))
	})?;
	let response = state.service.register(&requester, payload).await?;

	Ok((StatusCode::CREATED, Json(response)))
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	body: Value,
	retry_after: Option<u64>,
}
impl ApiError {
	fn new(status: StatusCode, body: Value) -> Self {
		Self { status, body, retry_after: None }
	}
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::Validation(_) | ServiceError::DeepPagination(_) =>
				Self::new(StatusCode::BAD_REQUEST, json!({ "validation_error": err.to_string() })),
			ServiceError::QuotaExceeded { .. } => Self {
				status: StatusCode::TOO_MANY_REQUESTS,
				body: json!({ "detail": err.to_string() }),
				retry_after: Some(err.retry_after_secs()),
			},
			ServiceError::IdentityUnresolved => Self::new(StatusCode::FORBIDDEN, json!("Forbidden")),
			ServiceError::Configuration { message } => {
				tracing::error!(error = %message, "Configuration error.");

				Self::new(StatusCode::INTERNAL_SERVER_ERROR, json!("Unknown API key rate limit type"))
			},
			ServiceError::IndexUnavailable { message, retryable } => {
				let status =
					if retryable { StatusCode::SERVICE_UNAVAILABLE } else { StatusCode::BAD_GATEWAY };

				Self::new(status, json!({ "detail": message }))
			},
			ServiceError::InvalidRegistration { fields } =>
				Self::new(StatusCode::BAD_REQUEST, json!(fields)),
			ServiceError::Collaborator { message } => {
				tracing::error!(error = %message, "Collaborator failed.");

				Self::new(StatusCode::INTERNAL_SERVER_ERROR, json!({ "detail": "Internal error." }))
			},
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let mut response = (self.status, Json(self.body)).into_response();

		if let Some(secs) = self.retry_after {
			response.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from(secs));
		}

		response
	}
}
