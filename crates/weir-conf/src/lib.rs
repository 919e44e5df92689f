//! # weir-conf
//!
//! Layered settings for the weir runtime.
//!
//! Settings are assembled from [`ConfigSource`]s merged by ascending
//! priority, so later sources override earlier ones:
//!
//! | Source | Priority |
//! |--------|----------|
//! | [`DefaultSource`] | 0 |
//! | [`TomlFileSource`] | 50 |
//! | [`EnvSource`] | 100 |
//!
//! ```
//! use weir_conf::{PagesSettings, SettingsLoader, DefaultSource};
//! use serde_json::Value;
//!
//! let settings: PagesSettings = SettingsLoader::new()
//!     .add_source(DefaultSource::new().with_value("debug", Value::Bool(true)))
//!     .load()
//!     .unwrap();
//! assert!(settings.debug);
//! ```

mod settings;
mod sources;

pub use settings::{PagesSettings, SettingsLoader, StoreSecret};
pub use sources::{ConfigSource, DefaultSource, EnvSource, SourceError, TomlFileSource};

/// Errors raised while assembling settings.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("failed to load {source_name}: {error}")]
	Source {
		source_name: String,
		#[source]
		error: SourceError,
	},

	#[error("invalid settings: {0}")]
	Invalid(#[from] serde_json::Error),
}
