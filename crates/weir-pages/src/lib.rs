//! weir pages: streaming server rendering and server actions.
//!
//! ## Architecture
//!
//! - [`component`]: components, page trees and props
//! - [`context`]: the per-request render context
//! - [`store`]: the two-partition request store
//! - [`signal`]: control signals raised by components and actions
//! - [`ssr`]: streaming rendering with out-of-order suspense
//! - [`transfer`]: store manifests on the wire (server only)
//! - [`actions`]: bindings, payloads and the action resolver
//! - [`client`]: the client runtime (native parts are testable in-process)
//! - [`pages`]: request-level entry points (server only)
//!
//! ## Example
//!
//! ```no_run
//! use weir_conf::PagesSettings;
//! use weir_pages::actions::ActionRegistry;
//! use weir_pages::component::Page;
//! use weir_pages::context::{RenderContext, RouteMatch};
//! use weir_pages::pages::Pages;
//!
//! # async fn demo() {
//! let pages = Pages::new(ActionRegistry::with_inventory(), &PagesSettings::default());
//! let cx = RenderContext::builder(RouteMatch::new("/")).build();
//! let reply = pages.render_page(Page::element("h1").child("Hello").into(), cx).await;
//! assert!(reply.is_streaming());
//! # }
//! ```

pub mod logging;

pub mod component;
pub mod context;
pub mod signal;
pub mod store;

pub mod actions;
pub mod ssr;
#[cfg(not(target_arch = "wasm32"))]
pub mod transfer;

pub mod client;

#[cfg(not(target_arch = "wasm32"))]
pub mod pages;

pub use component::{Component, ComponentRef, FnComponent, Page, PageElement, Props, Rendered};
pub use context::{RenderContext, RouteMatch};
pub use signal::{ControlSignal, Interrupt, RenderError, RenderMode, RenderScope};
pub use store::{Partition, STORE_HEADER, Store};

#[cfg(not(target_arch = "wasm32"))]
pub use pages::Pages;
#[cfg(not(target_arch = "wasm32"))]
pub use ssr::{SsrOptions, StreamingRenderer};
#[cfg(not(target_arch = "wasm32"))]
pub use transfer::StoreTransfer;

// Inventory re-export so `ActionDef` submissions resolve from user crates.
#[cfg(not(target_arch = "wasm32"))]
#[doc(hidden)]
pub use inventory;

#[doc(hidden)]
pub mod __private {
	pub use tracing;
	#[cfg(target_arch = "wasm32")]
	pub use web_sys;
}
