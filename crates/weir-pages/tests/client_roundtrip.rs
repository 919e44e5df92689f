//! Server-rendered documents driven by the client runtime.

#![cfg(not(target_arch = "wasm32"))]

use std::cell::RefCell;
use std::rc::Rc;

use http::{HeaderMap, StatusCode};
use rstest::rstest;
use serde_json::json;
use weir_conf::PagesSettings;
use weir_http::Request;
use weir_pages::actions::{ActionBinding, ActionRegistry, BindingTable};
use weir_pages::client::{
	ActionOutcome, ActionRuntime, ClientStore, DispatchCall, DomHost, VirtualClock,
	interpret_response, parse_html,
};
use weir_pages::component::Page;
use weir_pages::context::{RenderContext, RouteMatch};
use weir_pages::pages::Pages;
use weir_pages::signal::navigate;
use weir_test::fixtures::{render_context, settings};

fn bindings() -> BindingTable {
	BindingTable::new()
		.bind("buy", ActionBinding::new("click", "cart.add"))
		.bind("leave", ActionBinding::new("click", "session.end"))
}

fn registry() -> ActionRegistry {
	ActionRegistry::new()
		.action("cart.add", |args, cx| async move {
			let count = cx.store().get_as::<i64>("items").unwrap_or(0);
			cx.set("items", count + args.len() as i64);
			Ok(None)
		})
		.action("session.end", |_, _| async { Err(navigate("/bye")) })
}

fn fresh_context() -> RenderContext {
	RenderContext::builder(RouteMatch::new("/")).build()
}

async fn render_document(pages: &Pages, cx: RenderContext) -> String {
	let page = Page::element("div")
		.child(Page::element("button").action("buy").child("Buy"))
		.into();
	let reply = pages.render_page(page, cx).await;
	String::from_utf8(reply.into_body_bytes().await.unwrap().to_vec()).unwrap()
}

#[rstest]
#[tokio::test]
async fn test_click_posts_action_and_keeps_store(settings: PagesSettings, render_context: RenderContext) {
	// Arrange
	let pages = Pages::new(registry(), &settings).bindings(bindings());
	render_context.set("items", 1);
	render_context.transfer_to_client(&["items"]);
	let html = render_document(&pages, render_context).await;
	let mut dom = parse_html(&html).unwrap();
	let store = ClientStore::from_dom(&dom);
	let calls = Rc::new(RefCell::new(Vec::<DispatchCall>::new()));
	let sink = calls.clone();
	let runtime = ActionRuntime::new(
		BindingTable::from_dom(&dom).unwrap(),
		move |call| sink.borrow_mut().push(call),
		VirtualClock::new(),
	);
	runtime.register_actions(&mut dom);
	let button = dom.elements_by_tag("button")[0];

	// Act
	dom.dispatch_event(button, "click", json!({"type": "click"}));
	let call = calls.borrow_mut().remove(0);
	let request = Request::builder()
		.header("x-weir-store", &store.header().unwrap())
		.json(&call.into_payload())
		.unwrap()
		.build()
		.unwrap();
	let reply = pages.handle_action(&request, fresh_context()).await;
	store.update_from(reply.headers());

	// Assert
	assert_eq!(reply.status(), StatusCode::OK);
	assert_eq!(store.entries().unwrap(), [("items".to_string(), json!(2))]);
	assert!(!html.contains("session.end"));
}

#[rstest]
fn test_register_after_rerender_only_binds_new_elements() {
	// Arrange
	let mut dom = parse_html(r#"<div id="app"><button data-action="buy">Buy</button></div>"#).unwrap();
	let runtime = ActionRuntime::new(bindings(), |_: DispatchCall| {}, VirtualClock::new());
	runtime.register_actions(&mut dom);
	let app = dom.element_by_id("app").unwrap();
	weir_pages::client::parse_into(&mut dom, app, r#"<a data-action="leave">Log out</a>"#).unwrap();

	// Act
	let added = runtime.register_actions(&mut dom);
	let again = runtime.register_actions(&mut dom);

	// Assert
	assert_eq!((added, again), (1, 0));
	assert_eq!(runtime.registered(), 2);
	assert_eq!(dom.listener_count(dom.elements_by_tag("button")[0]), 1);
}

#[rstest]
#[tokio::test]
async fn test_navigate_reply_interpreted_by_client(settings: PagesSettings, render_context: RenderContext) {
	// Arrange
	let pages = Pages::new(registry(), &settings);
	let request = Request::builder()
		.json(&json!({"actionId": "session.end"}))
		.unwrap()
		.build()
		.unwrap();

	// Act
	let reply = pages.handle_action(&request, render_context).await;
	let status = reply.status();
	let headers: HeaderMap = reply.headers().clone();
	let body = String::from_utf8(reply.into_body_bytes().await.unwrap().to_vec()).unwrap();

	// Assert
	assert_eq!(
		interpret_response(status, &headers, body),
		ActionOutcome::Navigate("/bye".into())
	);
}
