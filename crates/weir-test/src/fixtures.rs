//! rstest fixtures.
//!
//! ```rust,ignore
//! use weir_test::fixtures::*;
//!
//! #[rstest]
//! fn test_debug_off(settings: PagesSettings) {
//!     assert!(!settings.debug);
//! }
//! ```

use rstest::fixture;
use weir_conf::PagesSettings;
use weir_pages::actions::ActionRegistry;
use weir_pages::context::{RenderContext, RouteMatch};

/// Default settings: debug off, no store secret.
#[fixture]
pub fn settings() -> PagesSettings {
	PagesSettings::default()
}

/// Settings with debug on, so 500 bodies carry the failure message.
#[fixture]
pub fn debug_settings() -> PagesSettings {
	PagesSettings::default().with_debug(true)
}

/// Render context for `/` with an empty store.
#[fixture]
pub fn render_context() -> RenderContext {
	RenderContext::builder(RouteMatch::new("/")).build()
}

/// An empty registry; tests add their actions with the builder methods.
#[fixture]
pub fn action_registry() -> ActionRegistry {
	ActionRegistry::new()
}
