//! Event argument serialization.
//!
//! Host values are first lifted into [`ArgValue`], a typed union, and then
//! folded into JSON with [`ArgValue::to_wire`]. References that cannot
//! cross the wire (DOM nodes other than the event target, the window) are
//! dropped; events are flattened into plain field maps.

use serde_json::{Map, Value};

use crate::actions::payload::form_data_value;

/// A value handed to an action listener, before serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
	Null,
	Bool(bool),
	Number(f64),
	String(String),
	List(Vec<ArgValue>),
	Map(Vec<(String, ArgValue)>),
	Event(EventArg),
	/// A DOM node that is not the event target.
	Node,
	Window,
}

/// A DOM event, flattened.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventArg {
	/// Event type, e.g. `click`.
	pub kind: String,
	/// Set for `CustomEvent`s, whose `detail` is carried along.
	pub custom: bool,
	pub detail: Option<Box<ArgValue>>,
	pub target: Option<TargetInfo>,
	/// Fields of the submitted form, for `submit` events.
	pub form_data: Option<Vec<(String, String)>>,
	/// Other plain fields, e.g. `key` or `clientX`.
	pub fields: Vec<(String, ArgValue)>,
}

/// The parts of an event target worth sending.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TargetInfo {
	pub tag_name: String,
	pub id: Option<String>,
	pub name: Option<String>,
	pub value: Option<String>,
	pub checked: Option<bool>,
}

impl EventArg {
	pub fn new(kind: impl Into<String>) -> Self {
		Self {
			kind: kind.into(),
			..Self::default()
		}
	}

	pub fn custom(kind: impl Into<String>, detail: ArgValue) -> Self {
		Self {
			kind: kind.into(),
			custom: true,
			detail: Some(Box::new(detail)),
			..Self::default()
		}
	}

	pub fn submit(form_data: Vec<(String, String)>) -> Self {
		Self {
			kind: "submit".to_string(),
			form_data: Some(form_data),
			..Self::default()
		}
	}

	pub fn target(mut self, target: TargetInfo) -> Self {
		self.target = Some(target);
		self
	}

	pub fn field(mut self, name: impl Into<String>, value: ArgValue) -> Self {
		self.fields.push((name.into(), value));
		self
	}

	fn to_wire(&self) -> Value {
		let mut map = Map::new();
		map.insert("type".to_string(), Value::from(self.kind.as_str()));
		if self.custom {
			map.insert("isCustom".to_string(), Value::Bool(true));
			if let Some(detail) = &self.detail {
				map.insert("detail".to_string(), detail.to_wire().unwrap_or(Value::Null));
			}
		}
		if let Some(target) = &self.target {
			map.insert("target".to_string(), target.to_wire());
		}
		if let Some(fields) = &self.form_data {
			map.insert("formData".to_string(), form_data_value(fields.clone()));
		}
		for (name, value) in &self.fields {
			if let Some(value) = value.to_wire() {
				map.entry(name.clone()).or_insert(value);
			}
		}
		Value::Object(map)
	}
}

impl TargetInfo {
	fn to_wire(&self) -> Value {
		let mut map = Map::new();
		map.insert("tagName".to_string(), Value::from(self.tag_name.as_str()));
		let optional = [("id", &self.id), ("name", &self.name), ("value", &self.value)];
		for (key, value) in optional {
			if let Some(value) = value {
				map.insert(key.to_string(), Value::from(value.as_str()));
			}
		}
		if let Some(checked) = self.checked {
			map.insert("checked".to_string(), Value::Bool(checked));
		}
		Value::Object(map)
	}
}

impl ArgValue {
	/// JSON form of the value; `None` for values that are stripped.
	pub fn to_wire(&self) -> Option<Value> {
		match self {
			ArgValue::Null => Some(Value::Null),
			ArgValue::Bool(b) => Some(Value::Bool(*b)),
			ArgValue::Number(n) => Some(
				serde_json::Number::from_f64(*n)
					.map(Value::Number)
					.unwrap_or(Value::Null),
			),
			ArgValue::String(s) => Some(Value::String(s.clone())),
			ArgValue::List(items) => Some(Value::Array(items.iter().filter_map(ArgValue::to_wire).collect())),
			ArgValue::Map(entries) => Some(Value::Object(
				entries
					.iter()
					.filter_map(|(k, v)| v.to_wire().map(|v| (k.clone(), v)))
					.collect(),
			)),
			ArgValue::Event(event) => Some(event.to_wire()),
			ArgValue::Node | ArgValue::Window => None,
		}
	}

	/// Top-level argument: stripped values become `null` so positions hold.
	pub fn into_arg(self) -> Value {
		self.to_wire().unwrap_or(Value::Null)
	}
}

impl From<Value> for ArgValue {
	fn from(value: Value) -> Self {
		match value {
			Value::Null => ArgValue::Null,
			Value::Bool(b) => ArgValue::Bool(b),
			Value::Number(n) => ArgValue::Number(n.as_f64().unwrap_or_default()),
			Value::String(s) => ArgValue::String(s),
			Value::Array(items) => ArgValue::List(items.into_iter().map(ArgValue::from).collect()),
			Value::Object(map) => ArgValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect()),
		}
	}
}

impl From<EventArg> for ArgValue {
	fn from(event: EventArg) -> Self {
		ArgValue::Event(event)
	}
}
