//! Compiled action bindings.
//!
//! An element opts into server actions by carrying a binding key
//! (`data-action="{key}"`). The key indexes a [`BindingTable`] built once,
//! ahead of rendering, which lists what each event on that element does.
//! The table subset actually used by a response is embedded next to the
//! markup, and the client consults it by key instead of inspecting
//! element attributes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Attribute carrying an element's binding key until it is registered.
pub const ACTION_ATTR: &str = "data-action";

/// Id of the script element embedding the binding table.
pub const BINDINGS_SCRIPT_ID: &str = "weir-actions";

/// One event wired to one server action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionBinding {
	/// DOM event name, e.g. `click` or `submit`.
	pub event: String,
	pub action_id: String,
	/// Actions the bound action is statically known to invoke.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub nested_action_ids: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub debounce_ms: Option<u64>,
	/// Element shown as pending while the call is in flight.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub indicator_id: Option<String>,
}

impl ActionBinding {
	pub fn new(event: impl Into<String>, action_id: impl Into<String>) -> Self {
		Self {
			event: event.into(),
			action_id: action_id.into(),
			nested_action_ids: Vec::new(),
			debounce_ms: None,
			indicator_id: None,
		}
	}

	pub fn nested<I, S>(mut self, ids: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.nested_action_ids = ids.into_iter().map(Into::into).collect();
		self
	}

	pub fn debounce(mut self, millis: u64) -> Self {
		self.debounce_ms = Some(millis);
		self
	}

	pub fn indicator(mut self, element_id: impl Into<String>) -> Self {
		self.indicator_id = Some(element_id.into());
		self
	}

	/// True for form submissions, whose payload carries form data.
	pub fn is_form_submit(&self) -> bool {
		self.event == "submit"
	}
}

/// Binding key to the bindings of that element, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingTable(IndexMap<String, Vec<ActionBinding>>);

impl BindingTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder form of [`insert`](Self::insert).
	pub fn bind(mut self, key: impl Into<String>, binding: ActionBinding) -> Self {
		self.insert(key, binding);
		self
	}

	/// Appends a binding under `key`. A later binding for an event already
	/// bound under that key replaces the earlier one.
	pub fn insert(&mut self, key: impl Into<String>, binding: ActionBinding) {
		let bindings = self.0.entry(key.into()).or_default();
		match bindings.iter_mut().find(|b| b.event == binding.event) {
			Some(existing) => *existing = binding,
			None => bindings.push(binding),
		}
	}

	pub fn get(&self, key: &str) -> Option<&[ActionBinding]> {
		self.0.get(key).map(Vec::as_slice)
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.0.keys().map(String::as_str)
	}

	/// Every action id reachable from the table, nested ids included.
	pub fn action_ids(&self) -> impl Iterator<Item = &str> {
		self.0.values().flatten().flat_map(|b| {
			std::iter::once(b.action_id.as_str()).chain(b.nested_action_ids.iter().map(String::as_str))
		})
	}

	/// The entries for `keys` that exist, in the order given.
	pub fn subset<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> BindingTable {
		let mut subset = BindingTable::new();
		for key in keys {
			if let Some(bindings) = self.0.get(key)
				&& !subset.0.contains_key(key)
			{
				subset.0.insert(key.to_string(), bindings.clone());
			}
		}
		subset
	}

	/// Adds the entries of `other`; its keys win.
	pub fn merge(&mut self, other: BindingTable) {
		for (key, bindings) in other.0 {
			self.0.insert(key, bindings);
		}
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn to_json(&self) -> serde_json::Result<String> {
		serde_json::to_string(self)
	}

	pub fn from_json(json: &str) -> serde_json::Result<Self> {
		serde_json::from_str(json)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_wire_shape_is_camel_case_and_sparse() {
		// Arrange
		let table = BindingTable::new()
			.bind("k1", ActionBinding::new("click", "cart.add").nested(["cart.count"]))
			.bind("k2", ActionBinding::new("input", "search").debounce(300));

		// Act
		let json = table.to_json().unwrap();

		// Assert
		assert_eq!(
			json,
			r#"{"k1":[{"event":"click","actionId":"cart.add","nestedActionIds":["cart.count"]}],"k2":[{"event":"input","actionId":"search","debounceMs":300}]}"#
		);
		assert_eq!(BindingTable::from_json(&json).unwrap(), table);
	}

	#[rstest]
	fn test_same_event_rebinds() {
		// Arrange
		let mut table = BindingTable::new();
		table.insert("k", ActionBinding::new("click", "a"));
		table.insert("k", ActionBinding::new("mouseover", "b"));

		// Act
		table.insert("k", ActionBinding::new("click", "c"));

		// Assert
		let ids: Vec<_> = table.get("k").unwrap().iter().map(|b| b.action_id.as_str()).collect();
		assert_eq!(ids, ["c", "b"]);
	}

	#[rstest]
	fn test_subset_skips_unknown_and_duplicates() {
		// Arrange
		let table = BindingTable::new()
			.bind("a", ActionBinding::new("click", "x"))
			.bind("b", ActionBinding::new("click", "y"));

		// Act
		let subset = table.subset(["b", "missing", "b"]);

		// Assert
		assert_eq!(subset.keys().collect::<Vec<_>>(), ["b"]);
	}

	#[rstest]
	fn test_action_ids_include_nested() {
		// Arrange
		let table = BindingTable::new().bind(
			"form",
			ActionBinding::new("submit", "save").nested(["validate", "notify"]),
		);

		// Act
		let ids: Vec<_> = table.action_ids().collect();

		// Assert
		assert_eq!(ids, ["save", "validate", "notify"]);
		assert!(table.get("form").unwrap()[0].is_form_submit());
	}
}
