//! Commonly used items.

#[cfg(feature = "conf")]
pub use weir_conf::{PagesSettings, SettingsLoader};

#[cfg(all(feature = "pages", not(target_arch = "wasm32")))]
pub use weir_http::{Reply, Request, Response};

#[cfg(feature = "pages")]
pub use weir_pages::actions::{ActionBinding, BindingTable};
#[cfg(feature = "pages")]
pub use weir_pages::component::{Component, FnComponent, IntoPage, Page, PageElement, Props, Rendered};
#[cfg(feature = "pages")]
pub use weir_pages::context::{RenderContext, RouteMatch};
#[cfg(feature = "pages")]
pub use weir_pages::signal::{
	ControlSignal, Interrupt, RenderMode, RenderScope, navigate, not_found, rerender,
};

#[cfg(all(feature = "pages", not(target_arch = "wasm32")))]
pub use weir_pages::actions::{ActionContext, ActionRegistry, ActionResult};
#[cfg(all(feature = "pages", not(target_arch = "wasm32")))]
pub use weir_pages::pages::Pages;

#[cfg(feature = "i18n")]
pub use weir_i18n::Translate;
