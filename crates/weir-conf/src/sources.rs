//! Configuration sources.

use indexmap::IndexMap;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

/// One layer of settings.
pub trait ConfigSource: Send + Sync {
	/// Reads the layer as flat key/value pairs.
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError>;

	/// Merge priority; higher layers override lower ones.
	fn priority(&self) -> u8;

	/// Human-readable name used in load errors.
	fn description(&self) -> String;
}

/// Failure to read one layer.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Parse error: {0}")]
	Parse(String),

	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("required file missing: {0}")]
	Missing(String),
}

/// Environment variable configuration source.
///
/// Keys are stripped of the prefix and lower-cased, so `WEIR_STORE_SECRET`
/// becomes `store_secret`.
pub struct EnvSource {
	prefix: String,
}

impl EnvSource {
	/// Create a source reading variables that start with `WEIR_`.
	pub fn new() -> Self {
		Self {
			prefix: "WEIR_".to_string(),
		}
	}

	/// Set a different prefix filter
	///
	/// # Examples
	///
	/// ```
	/// use weir_conf::EnvSource;
	///
	/// let source = EnvSource::new().with_prefix("SHOP_");
	/// ```
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = prefix.into();
		self
	}

	fn parse_value(key: &str, value: String) -> Value {
		if key == "debug" {
			return match value.trim().to_lowercase().as_str() {
				"true" | "1" | "yes" | "on" => Value::Bool(true),
				"false" | "0" | "no" | "off" => Value::Bool(false),
				_ => Value::String(value),
			};
		}
		// Secrets stay strings even when they look numeric.
		if key.ends_with("secret") {
			return Value::String(value);
		}
		if let Ok(num) = value.parse::<i64>() {
			Value::Number(num.into())
		} else if let Ok(b) = value.parse::<bool>() {
			Value::Bool(b)
		} else {
			Value::String(value)
		}
	}
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigSource for EnvSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError> {
		let mut config = IndexMap::new();

		for (key, value) in std::env::vars() {
			let Some(clean_key) = key.strip_prefix(&self.prefix) else {
				continue;
			};
			let lower_key = clean_key.to_lowercase();
			let parsed = Self::parse_value(&lower_key, value);
			config.insert(lower_key, parsed);
		}

		Ok(config)
	}

	fn priority(&self) -> u8 {
		100
	}

	fn description(&self) -> String {
		format!("Environment variables (prefix: {})", self.prefix)
	}
}

/// Settings from a TOML file, `weir.toml` by convention.
pub struct TomlFileSource {
	path: PathBuf,
	required: bool,
}

impl TomlFileSource {
	/// Create a source for an optional TOML file.
	///
	/// # Examples
	///
	/// ```
	/// use weir_conf::TomlFileSource;
	///
	/// let source = TomlFileSource::new("weir.toml");
	/// ```
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			required: false,
		}
	}

	/// Fail loading when the file does not exist.
	pub fn required(mut self) -> Self {
		self.required = true;
		self
	}
}

impl ConfigSource for TomlFileSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError> {
		if !self.path.exists() {
			if self.required {
				return Err(SourceError::Missing(self.path.display().to_string()));
			}
			return Ok(IndexMap::new());
		}

		let content = fs::read_to_string(&self.path)?;
		let toml_value: toml::Value = toml::from_str(&content)?;
		let json_value = serde_json::to_value(toml_value)?;

		let map = json_value
			.as_object()
			.ok_or_else(|| SourceError::Parse("Expected table at root".to_string()))?;

		Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
	}

	fn priority(&self) -> u8 {
		50
	}

	fn description(&self) -> String {
		format!("TOML file: {}", self.path.display())
	}
}

/// Fixed default values.
pub struct DefaultSource {
	values: IndexMap<String, Value>,
}

impl DefaultSource {
	/// Create an empty default source.
	pub fn new() -> Self {
		Self {
			values: IndexMap::new(),
		}
	}

	/// Adds a default for `key`.
	///
	/// # Examples
	///
	/// ```
	/// use weir_conf::DefaultSource;
	/// use serde_json::Value;
	///
	/// let source = DefaultSource::new()
	///     .with_value("default_locale", Value::String("fr".into()));
	/// ```
	pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
		self.values.insert(key.into(), value);
		self
	}
}

impl Default for DefaultSource {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigSource for DefaultSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError> {
		Ok(self.values.clone())
	}

	fn priority(&self) -> u8 {
		0
	}

	fn description(&self) -> String {
		"built-in defaults".to_string()
	}
}
