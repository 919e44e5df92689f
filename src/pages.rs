//! Streaming rendering, server actions and the client runtime.
//!
//! Everything here comes from `weir-pages`; see the crate documentation
//! for the module map.
//!
//! ```rust,ignore
//! use weir::pages::component::{FnComponent, Page, Props};
//!
//! let clock = FnComponent::new("Clock", |_, _| Page::element("time").child("12:00").into());
//! let root = Page::component(clock, Props::new());
//! ```

pub use weir_pages::*;
