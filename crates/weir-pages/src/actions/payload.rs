//! Action dispatch payload, client to server.
//!
//! JSON requests carry [`DispatchPayload`] verbatim. Form submissions carry
//! the metadata in headers and the form fields as the body; the fields
//! become a single `{"type": "submit", "formData": {..}}` argument.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Header naming the action of a form submission.
pub const ACTION_HEADER: &str = "x-weir-action";
/// Header naming the indicator element of a form submission.
pub const INDICATOR_HEADER: &str = "x-weir-indicator";
/// Header carrying the nested action ids of a form submission, as JSON.
pub const NESTED_ACTIONS_HEADER: &str = "x-weir-nested-actions";

/// One action call as sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchPayload {
	pub action_id: String,
	#[serde(default)]
	pub is_form_data: bool,
	#[serde(default)]
	pub indicator_id: Option<String>,
	#[serde(default)]
	pub nested_action_ids: Vec<String>,
	#[serde(default)]
	pub args: Vec<Value>,
}

impl DispatchPayload {
	pub fn new(action_id: impl Into<String>) -> Self {
		Self {
			action_id: action_id.into(),
			is_form_data: false,
			indicator_id: None,
			nested_action_ids: Vec::new(),
			args: Vec::new(),
		}
	}

	pub fn arg(mut self, arg: Value) -> Self {
		self.args.push(arg);
		self
	}

	pub fn nested<I, S>(mut self, ids: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.nested_action_ids = ids.into_iter().map(Into::into).collect();
		self
	}

	pub fn indicator(mut self, element_id: impl Into<String>) -> Self {
		self.indicator_id = Some(element_id.into());
		self
	}

	/// Builds the payload of a form submission from its fields.
	pub fn from_form_fields(
		action_id: impl Into<String>,
		fields: Vec<(String, String)>,
	) -> Self {
		let mut payload = Self::new(action_id).arg(submit_event(fields));
		payload.is_form_data = true;
		payload
	}
}

/// The event argument standing in for a submitted form.
pub fn submit_event(fields: Vec<(String, String)>) -> Value {
	let mut event = Map::new();
	event.insert("type".to_string(), Value::from("submit"));
	event.insert("formData".to_string(), form_data_value(fields));
	Value::Object(event)
}

/// Form fields as a JSON object. Repeated field names collect into an
/// array.
pub fn form_data_value(fields: Vec<(String, String)>) -> Value {
	let mut form = Map::new();
	for (name, value) in fields {
		match form.get_mut(&name) {
			Some(Value::Array(values)) => values.push(Value::String(value)),
			Some(existing) => {
				let first = existing.take();
				*existing = Value::Array(vec![first, Value::String(value)]);
			}
			None => {
				form.insert(name, Value::String(value));
			}
		}
	}
	Value::Object(form)
}

/// Errors raised while reading an action request.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
	#[error("action body exceeds the limit of {limit} bytes")]
	TooLarge { limit: usize },

	#[error("could not read action body: {0}")]
	Body(String),

	#[error("unsupported action content type `{0}`")]
	UnsupportedContentType(String),

	#[error("invalid action payload: {0}")]
	Json(#[from] serde_json::Error),

	#[error("invalid form body: {0}")]
	Form(String),

	#[error("form submission without `x-weir-action` header")]
	MissingAction,

	#[error("invalid `{0}` header")]
	InvalidHeader(&'static str),
}

#[cfg(not(target_arch = "wasm32"))]
mod server {
	use weir_http::{BoxError, HttpBody, Request};

	use super::*;
	use crate::transfer::STORE_HEADER;

	/// A parsed action request.
	#[derive(Debug, Clone)]
	pub struct ActionRequest {
		pub payload: DispatchPayload,
		/// Raw store manifest header, if the client sent one.
		pub store_header: Option<String>,
	}

	impl ActionRequest {
		/// Reads an incoming request, buffering no more than
		/// `max_body_bytes` of its body.
		pub async fn read<B>(request: http::Request<B>, max_body_bytes: usize) -> Result<Self, PayloadError>
		where
			B: HttpBody,
			B::Error: Into<BoxError>,
		{
			let request = Request::from_http(request, max_body_bytes)
				.await
				.map_err(|error| match error {
					weir_http::Error::BodyTooLarge { limit } => PayloadError::TooLarge { limit },
					other => PayloadError::Body(other.to_string()),
				})?;
			Self::from_request(&request, max_body_bytes)
		}

		/// Reads the payload from a JSON or form-encoded body.
		///
		/// The body is already buffered, so the size limit is checked after
		/// the fact; [`read`](Self::read) enforces it while reading.
		pub fn from_request(request: &Request, max_body_bytes: usize) -> Result<Self, PayloadError> {
			if request.body.len() > max_body_bytes {
				return Err(PayloadError::TooLarge {
					limit: max_body_bytes,
				});
			}
			let media_type = request.content_type().unwrap_or_default();
			let payload = match media_type.as_str() {
				"application/json" => serde_json::from_slice(&request.body)?,
				"application/x-www-form-urlencoded" => form_payload(request)?,
				_ => return Err(PayloadError::UnsupportedContentType(media_type)),
			};
			Ok(Self {
				payload,
				store_header: request.header_str(STORE_HEADER).map(str::to_string),
			})
		}
	}

	fn form_payload(request: &Request) -> Result<DispatchPayload, PayloadError> {
		let action_id = request
			.header_str(ACTION_HEADER)
			.filter(|id| !id.is_empty())
			.ok_or(PayloadError::MissingAction)?;
		let fields: Vec<(String, String)> = serde_urlencoded::from_bytes(&request.body)
			.map_err(|e| PayloadError::Form(e.to_string()))?;

		let mut payload = DispatchPayload::from_form_fields(action_id, fields);
		payload.indicator_id = request.header_str(INDICATOR_HEADER).map(str::to_string);
		if let Some(nested) = request.header_str(NESTED_ACTIONS_HEADER) {
			payload.nested_action_ids = serde_json::from_str(nested)
				.map_err(|_| PayloadError::InvalidHeader(NESTED_ACTIONS_HEADER))?;
		}
		Ok(payload)
	}
}

#[cfg(not(target_arch = "wasm32"))]
pub use server::ActionRequest;
