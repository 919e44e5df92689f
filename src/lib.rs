//! # weir
//!
//! Streaming server rendering with out-of-order suspense, server actions
//! and store transfer between server and client.
//!
//! ## Feature Flags
//!
//! - `full` (default): everything below
//! - `minimal`: the rendering runtime only (`pages`)
//! - `pages`: components, streaming renderer, actions and the client runtime
//! - `conf`: layered settings (defaults, `weir.toml`, `WEIR_` variables)
//! - `i18n`: message catalogs for the render context
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use weir::prelude::*;
//!
//! let settings: PagesSettings = SettingsLoader::standard(".").load()?;
//! let pages = Pages::new(ActionRegistry::with_inventory(), &settings);
//!
//! let cx = RenderContext::builder(RouteMatch::new("/")).build();
//! let reply = pages.render_page(home(), cx).await;
//! ```

#[cfg(feature = "conf")]
pub use weir_conf as conf;
#[cfg(all(feature = "pages", not(target_arch = "wasm32")))]
pub use weir_http as http;
#[cfg(feature = "i18n")]
pub use weir_i18n as i18n;

#[cfg(feature = "pages")]
pub mod pages;

pub mod prelude;

#[cfg(feature = "conf")]
pub use weir_conf::{PagesSettings, SettingsLoader};
#[cfg(all(feature = "pages", not(target_arch = "wasm32")))]
pub use weir_http::{Reply, Request, Response};
