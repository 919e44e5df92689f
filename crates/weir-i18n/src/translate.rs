//! The translate handle.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::MessageCatalog;

/// Interpolation parameters, `{name}` placeholders in messages.
pub type Params = serde_json::Map<String, Value>;

/// Handle the renderer calls without knowing how messages are stored.
pub trait Translate: Send + Sync {
	/// Locale this handle translates into.
	fn locale(&self) -> &str;

	/// Translates `key`, substituting `{name}` placeholders from `params`.
	///
	/// Unknown keys translate to themselves.
	fn translate(&self, key: &str, params: &Params) -> String;
}

/// Handle that echoes keys back.
#[derive(Debug, Clone)]
pub struct NoTranslations {
	locale: String,
}

impl NoTranslations {
	pub fn new(locale: impl Into<String>) -> Self {
		Self {
			locale: locale.into(),
		}
	}
}

impl Translate for NoTranslations {
	fn locale(&self) -> &str {
		&self.locale
	}

	fn translate(&self, key: &str, params: &Params) -> String {
		interpolate(key, params)
	}
}

/// Catalogs for every known locale, falling back to a default locale.
///
/// ```
/// use weir_i18n::{Catalogs, MessageCatalog, Params, Translate};
///
/// let mut en = MessageCatalog::new("en");
/// en.add_translation("greet", "Hello, {name}!");
/// let catalogs = Catalogs::new("en").with_catalog(en);
///
/// let mut params = Params::new();
/// params.insert("name".into(), "Ada".into());
/// let handle = catalogs.handle("de");
/// assert_eq!(handle.translate("greet", &params), "Hello, Ada!");
/// ```
#[derive(Debug)]
pub struct Catalogs {
	default_locale: String,
	catalogs: RwLock<HashMap<String, MessageCatalog>>,
}

impl Catalogs {
	pub fn new(default_locale: impl Into<String>) -> Arc<Self> {
		Arc::new(Self {
			default_locale: default_locale.into(),
			catalogs: RwLock::new(HashMap::new()),
		})
	}

	/// Adds or replaces the catalog for its locale.
	pub fn with_catalog(self: Arc<Self>, catalog: MessageCatalog) -> Arc<Self> {
		self.insert(catalog);
		self
	}

	pub fn insert(&self, catalog: MessageCatalog) {
		self.catalogs
			.write()
			.insert(catalog.locale().to_string(), catalog);
	}

	/// Per-request handle for `locale`.
	pub fn handle(self: &Arc<Self>, locale: &str) -> Arc<dyn Translate> {
		Arc::new(LocalizedHandle {
			catalogs: Arc::clone(self),
			locale: locale.to_string(),
		})
	}

	fn lookup(&self, locale: &str, key: &str, count: Option<usize>) -> Option<String> {
		let catalogs = self.catalogs.read();
		let base = locale.split(['-', '_']).next().unwrap_or(locale);
		[locale, base, self.default_locale.as_str()]
			.into_iter()
			.filter_map(|l| catalogs.get(l))
			.find_map(|catalog| match count {
				Some(n) => catalog
					.get_plural(key, n)
					.or_else(|| catalog.get(key))
					.map(str::to_string),
				None => catalog.get(key).map(str::to_string),
			})
	}
}

struct LocalizedHandle {
	catalogs: Arc<Catalogs>,
	locale: String,
}

impl Translate for LocalizedHandle {
	fn locale(&self) -> &str {
		&self.locale
	}

	fn translate(&self, key: &str, params: &Params) -> String {
		let count = params
			.get("count")
			.and_then(Value::as_u64)
			.map(|n| n as usize);
		let message = self
			.catalogs
			.lookup(&self.locale, key, count)
			.unwrap_or_else(|| key.to_string());
		interpolate(&message, params)
	}
}

fn interpolate(message: &str, params: &Params) -> String {
	if params.is_empty() {
		return message.to_string();
	}
	let mut out = message.to_string();
	for (name, value) in params {
		let placeholder = format!("{{{name}}}");
		let text = match value {
			Value::String(s) => s.clone(),
			other => other.to_string(),
		};
		out = out.replace(&placeholder, &text);
	}
	out
}
