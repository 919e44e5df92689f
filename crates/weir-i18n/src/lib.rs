//! Internationalization for weir.
//!
//! The renderer only needs one capability from this crate: the
//! [`Translate`] handle, `translate(key, params) -> String`. [`Catalogs`]
//! provides it on top of per-locale [`MessageCatalog`]s.

mod catalog;
mod translate;

pub use catalog::MessageCatalog;
pub use translate::{Catalogs, NoTranslations, Params, Translate};

/// Errors raised while loading catalogs.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
	#[error("invalid catalog JSON: {0}")]
	Json(#[from] serde_json::Error),

	#[error("catalog entry `{0}` must be a string or an array of strings")]
	InvalidEntry(String),
}
