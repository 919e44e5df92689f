//! Runtime settings and the loader that assembles them.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::ConfigError;
use crate::sources::{ConfigSource, DefaultSource, EnvSource, TomlFileSource};

/// Secret key material for encrypted store entries.
///
/// Wiped from memory on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct StoreSecret(String);

impl StoreSecret {
	pub fn new(secret: impl Into<String>) -> Self {
		Self(secret.into())
	}

	pub fn expose(&self) -> &str {
		&self.0
	}
}

impl std::fmt::Debug for StoreSecret {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str("StoreSecret(**redacted**)")
	}
}

impl<'de> Deserialize<'de> for StoreSecret {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		String::deserialize(deserializer).map(StoreSecret)
	}
}

/// Settings consumed by the page renderer and the action resolver.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PagesSettings {
	/// Non-production mode. Error messages reach response bodies only when set.
	pub debug: bool,
	pub default_locale: String,
	pub store_secret: Option<StoreSecret>,
	/// Id of the element that wraps the rendered root in the document.
	pub app_root_id: String,
	pub max_action_body_bytes: usize,
	pub max_nested_depth: usize,
	/// Bounded capacity of the render output channel.
	pub channel_capacity: usize,
}

impl PagesSettings {
	pub fn is_production(&self) -> bool {
		!self.debug
	}

	pub fn with_debug(mut self, debug: bool) -> Self {
		self.debug = debug;
		self
	}

	pub fn with_store_secret(mut self, secret: impl Into<String>) -> Self {
		self.store_secret = Some(StoreSecret::new(secret));
		self
	}
}

impl Default for PagesSettings {
	fn default() -> Self {
		Self {
			debug: false,
			default_locale: "en".to_string(),
			store_secret: None,
			app_root_id: "app".to_string(),
			max_action_body_bytes: 1024 * 1024,
			max_nested_depth: 16,
			channel_capacity: 32,
		}
	}
}

/// Merges [`ConfigSource`]s by priority and deserializes the result.
#[derive(Default)]
pub struct SettingsLoader {
	sources: Vec<Box<dyn ConfigSource>>,
}

impl SettingsLoader {
	pub fn new() -> Self {
		Self::default()
	}

	/// Loader with the standard stack: `weir.toml` in `dir` (optional) and
	/// `WEIR_` environment variables.
	pub fn standard(dir: impl AsRef<std::path::Path>) -> Self {
		Self::new()
			.add_source(DefaultSource::new())
			.add_source(TomlFileSource::new(dir.as_ref().join("weir.toml")))
			.add_source(EnvSource::new())
	}

	pub fn add_source(mut self, source: impl ConfigSource + 'static) -> Self {
		self.sources.push(Box::new(source));
		self
	}

	/// Merged key/value view, higher priority sources winning.
	pub fn merged(&self) -> Result<IndexMap<String, Value>, ConfigError> {
		let mut ordered: Vec<&dyn ConfigSource> = self.sources.iter().map(|s| s.as_ref()).collect();
		ordered.sort_by_key(|s| s.priority());

		let mut merged = IndexMap::new();
		for source in ordered {
			let values = source.load().map_err(|error| ConfigError::Source {
				source_name: source.description(),
				error,
			})?;
			tracing::debug!(
				source = %source.description(),
				keys = values.len(),
				"loaded settings source"
			);
			merged.extend(values);
		}
		Ok(merged)
	}

	/// Deserializes the merged view into `T`, unknown keys ignored.
	pub fn load<T: serde::de::DeserializeOwned>(&self) -> Result<T, ConfigError> {
		let merged = self.merged()?;
		let object: serde_json::Map<String, Value> = merged.into_iter().collect();
		Ok(serde_json::from_value(Value::Object(object))?)
	}
}
