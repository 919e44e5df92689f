//! Message catalog for storing translations

use std::collections::HashMap;

use serde_json::Value;

use crate::CatalogError;

/// A message catalog containing translations for a specific locale
///
/// # Example
/// ```
/// use weir_i18n::MessageCatalog;
///
/// let mut catalog = MessageCatalog::new("fr");
/// catalog.add_translation("cart.title", "Panier");
/// catalog.add_plural("cart.items", vec!["{count} article", "{count} articles"]);
///
/// assert_eq!(catalog.get("cart.title"), Some("Panier"));
/// assert_eq!(catalog.get_plural("cart.items", 1), Some("{count} article"));
/// assert_eq!(catalog.get_plural("cart.items", 5), Some("{count} articles"));
/// ```
#[derive(Debug, Clone)]
pub struct MessageCatalog {
	locale: String,
	messages: HashMap<String, String>,
	plurals: HashMap<String, Vec<String>>,
}

impl MessageCatalog {
	/// Create a new message catalog for the given locale
	pub fn new(locale: &str) -> Self {
		Self {
			locale: locale.to_string(),
			messages: HashMap::new(),
			plurals: HashMap::new(),
		}
	}

	/// Loads a catalog from a flat JSON object.
	///
	/// String values are simple translations, arrays of strings are plural
	/// forms.
	pub fn from_json(locale: &str, json: &str) -> Result<Self, CatalogError> {
		let entries: serde_json::Map<String, Value> = serde_json::from_str(json)?;
		let mut catalog = Self::new(locale);
		for (key, value) in entries {
			match value {
				Value::String(s) => catalog.add_translation(key, s),
				Value::Array(forms) => {
					let forms = forms
						.into_iter()
						.map(|f| match f {
							Value::String(s) => Ok(s),
							_ => Err(CatalogError::InvalidEntry(key.clone())),
						})
						.collect::<Result<Vec<_>, _>>()?;
					catalog.plurals.insert(key, forms);
				}
				_ => return Err(CatalogError::InvalidEntry(key)),
			}
		}
		Ok(catalog)
	}

	/// Get the locale for this catalog
	pub fn locale(&self) -> &str {
		&self.locale
	}

	/// Add a simple translation
	pub fn add_translation(&mut self, message: impl Into<String>, translation: impl Into<String>) {
		self.messages.insert(message.into(), translation.into());
	}

	/// Add plural forms, ordered by the locale's plural rule index.
	pub fn add_plural(&mut self, key: impl Into<String>, forms: Vec<&str>) {
		self.plurals
			.insert(key.into(), forms.iter().map(|s| s.to_string()).collect());
	}

	/// Get a translation
	pub fn get(&self, message: &str) -> Option<&str> {
		self.messages.get(message).map(String::as_str)
	}

	/// Get a plural translation
	pub fn get_plural(&self, key: &str, count: usize) -> Option<&str> {
		let forms = self.plurals.get(key)?;
		let index = self.plural_form(count);
		forms
			.get(index)
			.or_else(|| forms.last())
			.map(String::as_str)
	}

	/// Plural form index for `count`.
	fn plural_form(&self, count: usize) -> usize {
		let lang = self.locale.split(['-', '_']).next().unwrap_or(&self.locale);

		match lang {
			"ja" | "zh" | "ko" | "vi" | "th" | "id" | "ms" | "tr" => 0,
			"fr" => usize::from(count > 1),
			"ru" | "uk" | "be" | "sr" | "hr" | "bs" => {
				let n100 = count % 100;
				let n10 = count % 10;
				if n10 == 1 && n100 != 11 {
					0
				} else if (2..=4).contains(&n10) && !(10..20).contains(&n100) {
					1
				} else {
					2
				}
			}
			_ => usize::from(count != 1),
		}
	}
}
