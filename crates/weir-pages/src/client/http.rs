//! Client side of the action transport.

use std::sync::Arc;

use http::{HeaderMap, StatusCode, header};
use parking_lot::Mutex;
use serde::Deserialize;

use super::ClientError;
use super::dispatch::DispatchCall;
use super::dom::DomHost;
use crate::actions::{RENDER_MODE_HEADER, RERENDER_HEADER};
use crate::signal::{RenderMode, RenderScope};
use crate::ssr::STORE_SCRIPT_ID;
use crate::store::{STORE_HEADER, unescape_manifest_value};

/// Default path actions are posted to.
pub const DEFAULT_ACTION_ENDPOINT: &str = "/_weir/action";

/// The client's copy of the store manifest.
///
/// The client never decodes sensitive values; it only echoes the latest
/// manifest the server sent. Cloning shares the copy.
#[derive(Debug, Clone, Default)]
pub struct ClientStore {
	manifest: Arc<Mutex<Option<String>>>,
}

impl ClientStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Seeds the store from the manifest embedded in the document.
	pub fn from_dom<D: DomHost>(dom: &D) -> Self {
		let store = Self::new();
		if let Some(script) = dom.element_by_id(STORE_SCRIPT_ID) {
			let json = dom.text_content(&script);
			store.replace(urlencoding::encode(json.trim()).into_owned());
		}
		store
	}

	/// Header value to send, if any manifest is known.
	pub fn header(&self) -> Option<String> {
		self.manifest.lock().clone()
	}

	pub fn replace(&self, header: String) {
		*self.manifest.lock() = Some(header);
	}

	/// Keeps the manifest of a response, when it carries one.
	pub fn update_from(&self, headers: &HeaderMap) {
		if let Some(value) = headers.get(STORE_HEADER).and_then(|v| v.to_str().ok()) {
			self.replace(value.to_string());
		}
	}

	/// The manifest entries, decoded from the header form.
	pub fn entries(&self) -> Result<Vec<(String, serde_json::Value)>, ClientError> {
		let Some(header) = self.header() else {
			return Ok(Vec::new());
		};
		let json = urlencoding::decode(&header).map_err(|e| ClientError::Store(e.to_string()))?;
		let entries: Vec<(String, serde_json::Value)> = serde_json::from_str(&json)?;
		Ok(entries
			.into_iter()
			.map(|(key, value)| (key, unescape_manifest_value(value)))
			.collect())
	}
}

/// What the client should do after an action call.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
	Navigate(String),
	/// Replace the rendered scope with `html`.
	Rerender {
		scope: RenderScope,
		mode: RenderMode,
		html: String,
	},
	Empty,
	NotFound,
	Failed {
		status: u16,
		message: String,
	},
}

#[derive(Deserialize)]
struct ControlObject {
	action: String,
	#[serde(default)]
	params: Vec<String>,
}

/// Maps an action response to an [`ActionOutcome`].
pub fn interpret_response(status: StatusCode, headers: &HeaderMap, body: String) -> ActionOutcome {
	if status == StatusCode::NOT_FOUND {
		return ActionOutcome::NotFound;
	}
	if !status.is_success() {
		return ActionOutcome::Failed {
			status: status.as_u16(),
			message: body,
		};
	}

	let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
	if let Some(scope) = header_str(RERENDER_HEADER) {
		let scope = match scope {
			"component" => RenderScope::Component,
			_ => RenderScope::Page,
		};
		let mode = match header_str(RENDER_MODE_HEADER) {
			Some("transition") => RenderMode::Transition,
			_ => RenderMode::Reactivity,
		};
		return ActionOutcome::Rerender {
			scope,
			mode,
			html: body,
		};
	}

	let is_json = header_str(header::CONTENT_TYPE.as_str())
		.is_some_and(|ct| ct.starts_with("application/json"));
	if is_json
		&& let Ok(control) = serde_json::from_str::<ControlObject>(&body)
		&& control.action == "navigate"
		&& let Some(url) = control.params.into_iter().next()
	{
		return ActionOutcome::Navigate(url);
	}
	ActionOutcome::Empty
}

/// Posts action calls and interprets the replies.
#[derive(Debug, Clone)]
pub struct ActionClient {
	http: reqwest::Client,
	endpoint: String,
	store: ClientStore,
}

impl ActionClient {
	pub fn new(endpoint: impl Into<String>, store: ClientStore) -> Self {
		Self {
			http: reqwest::Client::new(),
			endpoint: endpoint.into(),
			store,
		}
	}

	pub fn store(&self) -> &ClientStore {
		&self.store
	}

	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}

	/// Sends `call` with the current store manifest and keeps the manifest
	/// of the reply.
	pub async fn send(&self, call: DispatchCall) -> Result<ActionOutcome, ClientError> {
		let payload = call.into_payload();
		let mut request = self.http.post(&self.endpoint).json(&payload);
		if let Some(store) = self.store.header() {
			request = request.header(STORE_HEADER, store);
		}
		let response = request.send().await?;
		let status = response.status();
		let headers = response.headers().clone();
		self.store.update_from(&headers);
		let body = response.text().await?;
		Ok(interpret_response(status, &headers, body))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::client::parse::parse_html;
	use http::HeaderValue;
	use rstest::rstest;

	fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
		let mut map = HeaderMap::new();
		for (name, value) in pairs {
			map.insert(*name, HeaderValue::from_static(value));
		}
		map
	}

	#[rstest]
	fn test_navigate_object() {
		// Act
		let outcome = interpret_response(
			StatusCode::OK,
			&headers(&[("content-type", "application/json")]),
			r#"{"action":"navigate","params":["/x"]}"#.into(),
		);

		// Assert
		assert_eq!(outcome, ActionOutcome::Navigate("/x".into()));
	}

	#[rstest]
	fn test_rerender_headers() {
		// Act
		let outcome = interpret_response(
			StatusCode::OK,
			&headers(&[(RERENDER_HEADER, "component"), (RENDER_MODE_HEADER, "transition")]),
			"<span>7</span>".into(),
		);

		// Assert
		assert_eq!(
			outcome,
			ActionOutcome::Rerender {
				scope: RenderScope::Component,
				mode: RenderMode::Transition,
				html: "<span>7</span>".into()
			}
		);
	}

	#[rstest]
	#[case(StatusCode::OK, "", ActionOutcome::Empty)]
	#[case(StatusCode::NOT_FOUND, "", ActionOutcome::NotFound)]
	#[case(StatusCode::INTERNAL_SERVER_ERROR, "boom", ActionOutcome::Failed { status: 500, message: "boom".into() })]
	fn test_bare_statuses(#[case] status: StatusCode, #[case] body: &str, #[case] expected: ActionOutcome) {
		// Act
		let outcome = interpret_response(status, &HeaderMap::new(), body.to_string());

		// Assert
		assert_eq!(outcome, expected);
	}

	#[rstest]
	fn test_store_seeded_from_document_and_replaced() {
		// Arrange
		let dom = parse_html(r#"<script type="application/json" id="weir-store">[["count",1]]</script>"#).unwrap();
		let store = ClientStore::from_dom(&dom);

		// Act
		let seeded = store.entries().unwrap();
		store.update_from(&headers(&[(STORE_HEADER, "%5B%5B%22count%22%2C2%5D%5D")]));

		// Assert
		assert_eq!(seeded, [("count".to_string(), serde_json::json!(1))]);
		assert_eq!(store.entries().unwrap(), [("count".to_string(), serde_json::json!(2))]);
	}

	#[rstest]
	fn test_escaped_string_read_back_plain() {
		// Arrange
		let store = ClientStore::default();
		let manifest = r#"[["note","__weir_raw:__weir_enc:hi"],["token","__weir_enc:AAAA"]]"#;
		store.replace(urlencoding::encode(manifest).into_owned());

		// Act
		let entries = store.entries().unwrap();

		// Assert
		assert_eq!(
			entries,
			[
				("note".to_string(), serde_json::json!("__weir_enc:hi")),
				("token".to_string(), serde_json::json!("__weir_enc:AAAA"))
			]
		);
	}
}
