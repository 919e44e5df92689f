//! Action requests as the client runtime posts them.

use http::Method;
use serde_json::Value;
use weir_http::Request;
use weir_pages::actions::{
	ACTION_HEADER, DispatchPayload, INDICATOR_HEADER, NESTED_ACTIONS_HEADER,
};
use weir_pages::store::STORE_HEADER;

enum Body {
	Json,
	Form(Vec<(String, String)>),
}

/// Builder for action [`Request`]s.
///
/// Building panics on invalid input; a broken request is a test setup
/// error.
///
/// ```
/// use serde_json::json;
/// use weir_test::MockActionRequest;
///
/// let request = MockActionRequest::new("cart.add")
///     .arg(json!(3))
///     .nested(["cart.recount"])
///     .build();
/// assert_eq!(request.content_type().as_deref(), Some("application/json"));
/// ```
pub struct MockActionRequest {
	payload: DispatchPayload,
	body: Body,
	store: Option<String>,
	uri: String,
}

impl MockActionRequest {
	/// A JSON action call with no arguments.
	pub fn new(action_id: impl Into<String>) -> Self {
		Self {
			payload: DispatchPayload::new(action_id),
			body: Body::Json,
			store: None,
			uri: "/_weir/action".to_string(),
		}
	}

	/// A form submission carrying `fields`.
	pub fn form<I, K, V>(action_id: impl Into<String>, fields: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let fields = fields
			.into_iter()
			.map(|(k, v)| (k.into(), v.into()))
			.collect();
		let mut request = Self::new(action_id);
		request.payload.is_form_data = true;
		request.body = Body::Form(fields);
		request
	}

	pub fn arg(mut self, arg: Value) -> Self {
		self.payload.args.push(arg);
		self
	}

	pub fn nested<I, S>(mut self, ids: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.payload = self.payload.nested(ids);
		self
	}

	pub fn indicator(mut self, element_id: impl Into<String>) -> Self {
		self.payload = self.payload.indicator(element_id);
		self
	}

	/// Sends `header` as the store manifest, verbatim.
	pub fn store_header(mut self, header: impl Into<String>) -> Self {
		self.store = Some(header.into());
		self
	}

	/// Sends the given `[key, value]` entries as the store manifest.
	pub fn store_entries(self, entries: &[(&str, Value)]) -> Self {
		let json = serde_json::to_string(entries)
			.unwrap_or_else(|err| panic!("MockActionRequest: unserializable store: {err}"));
		self.store_header(urlencoding::encode(&json).into_owned())
	}

	pub fn uri(mut self, uri: impl Into<String>) -> Self {
		self.uri = uri.into();
		self
	}

	/// The payload as it would be sent for a JSON call.
	pub fn payload(&self) -> &DispatchPayload {
		&self.payload
	}

	pub fn build(self) -> Request {
		let mut builder = Request::builder().method(Method::POST).uri(self.uri);
		if let Some(store) = &self.store {
			builder = builder.header(STORE_HEADER, store);
		}
		let builder = match self.body {
			Body::Json => builder
				.json(&self.payload)
				.unwrap_or_else(|err| panic!("MockActionRequest: {err}")),
			Body::Form(fields) => {
				let body = serde_urlencoded::to_string(&fields)
					.unwrap_or_else(|err| panic!("MockActionRequest: bad form fields: {err}"));
				let mut builder = builder
					.header("content-type", "application/x-www-form-urlencoded")
					.header(ACTION_HEADER, &self.payload.action_id)
					.body(body);
				if let Some(indicator) = &self.payload.indicator_id {
					builder = builder.header(INDICATOR_HEADER, indicator);
				}
				if !self.payload.nested_action_ids.is_empty() {
					let nested = serde_json::to_string(&self.payload.nested_action_ids)
						.unwrap_or_else(|err| panic!("MockActionRequest: {err}"));
					builder = builder.header(NESTED_ACTIONS_HEADER, &nested);
				}
				builder
			}
		};
		builder
			.build()
			.unwrap_or_else(|err| panic!("MockActionRequest: invalid request: {err}"))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;
	use weir_pages::actions::ActionRequest;

	#[rstest]
	fn test_json_request_parses_back() {
		// Arrange
		let request = MockActionRequest::new("cart.add").arg(json!(3)).nested(["cart.recount"]).build();

		// Act
		let parsed = ActionRequest::from_request(&request, 1024).unwrap();

		// Assert
		assert_eq!(parsed.payload.action_id, "cart.add");
		assert_eq!(parsed.payload.args, vec![json!(3)]);
		assert_eq!(parsed.payload.nested_action_ids, vec!["cart.recount".to_string()]);
		assert!(parsed.store_header.is_none());
	}

	#[rstest]
	fn test_form_request_parses_back() {
		// Arrange
		let request = MockActionRequest::form("profile.save", [("name", "Ada"), ("tag", "a"), ("tag", "b")])
			.indicator("spinner")
			.store_entries(&[("count", json!(1))])
			.build();

		// Act
		let parsed = ActionRequest::from_request(&request, 1024).unwrap();

		// Assert
		assert!(parsed.payload.is_form_data);
		assert_eq!(parsed.payload.indicator_id.as_deref(), Some("spinner"));
		assert_eq!(
			parsed.payload.args,
			vec![json!({"type": "submit", "formData": {"name": "Ada", "tag": ["a", "b"]}})]
		);
		assert_eq!(parsed.store_header.as_deref(), Some("%5B%5B%22count%22%2C1%5D%5D"));
	}
}
