//! # weir test
//!
//! Testing utilities for weir applications.
//!
//! - [`fixtures`]: rstest fixtures for settings, contexts and registries
//! - [`MockActionRequest`]: builds action requests as a client would post them
//! - [`collect_stream`] and [`render_to_dom`]: render helpers
//! - [`TraceLog`]: an ordered log shared between actions and assertions
//!
//! ## Example
//!
//! ```rust,ignore
//! use weir_test::fixtures::*;
//! use weir_test::MockActionRequest;
//!
//! #[rstest]
//! #[tokio::test]
//! async fn test_add_to_cart(settings: PagesSettings, render_context: RenderContext) {
//!     let pages = Pages::new(ActionRegistry::with_inventory(), &settings);
//!     let request = MockActionRequest::new("cart.add").arg(json!(3)).build();
//!     let reply = pages.handle_action(&request, render_context).await;
//!     assert_eq!(reply.status(), StatusCode::OK);
//! }
//! ```

pub mod fixtures;
pub mod mock_request;
pub mod render;
pub mod trace;

pub use mock_request::MockActionRequest;
pub use render::{collect_stream, render_to_dom, render_to_string};
pub use trace::TraceLog;
