//! Props passed to component invocations.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Component input as a JSON object.
///
/// ```
/// use weir_pages::component::Props;
///
/// let props = Props::new().with("title", "Cart").with("count", 3);
/// assert_eq!(props.get::<u32>("count"), Some(3));
/// assert_eq!(props.get_str("title"), Some("Cart"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Props(Map<String, Value>);

impl Props {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a property. Values that fail to serialize are stored as null.
	pub fn with(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
		let value = serde_json::to_value(value).unwrap_or(Value::Null);
		self.0.insert(key.into(), value);
		self
	}

	/// Typed read; `None` when absent or of another shape.
	pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
		self.0
			.get(key)
			.and_then(|v| serde_json::from_value(v.clone()).ok())
	}

	pub fn get_str(&self, key: &str) -> Option<&str> {
		self.0.get(key).and_then(Value::as_str)
	}

	pub fn raw(&self, key: &str) -> Option<&Value> {
		self.0.get(key)
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl From<Map<String, Value>> for Props {
	fn from(map: Map<String, Value>) -> Self {
		Self(map)
	}
}
