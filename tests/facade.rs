//! The facade exposes a working render path through its prelude.

#![cfg(all(feature = "full", not(target_arch = "wasm32")))]

use http::StatusCode;
use rstest::rstest;
use weir::prelude::*;

#[rstest]
#[tokio::test]
async fn test_prelude_renders_and_resolves_actions() {
	// Arrange
	let registry = ActionRegistry::new().action("ping", |_, _| async { Err(navigate("/pong")) });
	let pages = Pages::new(registry, &PagesSettings::default());
	let greeting = FnComponent::new("Greeting", |props, _| {
		let name = props.get_str("name").unwrap_or("world").to_string();
		Page::element("p").child(format!("Hello, {name}")).into()
	});
	let root = Page::component(greeting, Props::new().with("name", "weir"));
	let request = weir_test::MockActionRequest::new("ping").build();

	// Act
	let page = pages
		.render_page(root, RenderContext::builder(RouteMatch::new("/")).build())
		.await;
	let action = pages
		.handle_action(&request, RenderContext::builder(RouteMatch::new("/")).build())
		.await;

	// Assert
	let html = String::from_utf8(page.into_body_bytes().await.unwrap().to_vec()).unwrap();
	assert!(html.contains("<p>Hello, weir</p>"));
	assert_eq!(action.status(), StatusCode::OK);
}
