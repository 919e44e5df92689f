//! Browser host for the client runtime.
//!
//! [`start`] reads the binding table and store manifest embedded in the
//! document, registers action listeners, resolves suspense payloads
//! already present, and then repeats both on every mutation batch.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use serde_json::{Value, json};
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use web_sys::{
	CustomEvent, CustomEventInit, Document, Element, Event, FormData, HtmlFormElement,
	HtmlInputElement, HtmlTemplateElement, MutationObserver, MutationObserverInit, Node,
};

use super::ClientError;
use super::dispatch::{ActionRuntime, DispatchCall, Scheduler};
use super::dom::{DomHost, Listener};
use super::event::{ArgValue, EventArg, TargetInfo};
use super::http::{ActionClient, ActionOutcome, ClientStore};
use super::suspense::resolve_suspense;
use crate::actions::binding::BindingTable;
use crate::signal::RenderScope;
use crate::{error_log, info_log, warn_log};

/// Name of the event fired on the document for every re-render reply.
pub const RERENDER_EVENT: &str = "weir:rerender";

/// [`DomHost`] over the live document.
pub struct WebDom {
	document: Document,
	listeners: Vec<Closure<dyn FnMut(Event)>>,
}

impl WebDom {
	pub fn new(document: Document) -> Self {
		Self {
			document,
			listeners: Vec::new(),
		}
	}

	fn element(node: &Node) -> Option<&Element> {
		node.dyn_ref::<Element>()
	}
}

fn collect_nodes(list: web_sys::NodeList) -> Vec<Node> {
	(0..list.length()).filter_map(|i| list.item(i)).collect()
}

fn collect_elements(list: web_sys::HtmlCollection) -> Vec<Node> {
	(0..list.length())
		.filter_map(|i| list.item(i))
		.map(Node::from)
		.collect()
}

impl DomHost for WebDom {
	type Node = Node;

	fn element_by_id(&self, id: &str) -> Option<Node> {
		if let Some(element) = self.document.get_element_by_id(id) {
			return Some(element.into());
		}
		let templates = self.document.get_elements_by_tag_name("template");
		(0..templates.length())
			.filter_map(|i| templates.item(i))
			.filter_map(|t| t.dyn_into::<HtmlTemplateElement>().ok())
			.find_map(|t| t.content().get_element_by_id(id))
			.map(Node::from)
	}

	fn elements_with_attr(&self, name: &str) -> Vec<Node> {
		self.document
			.query_selector_all(&format!("[{name}]"))
			.map(collect_nodes)
			.unwrap_or_default()
	}

	fn elements_by_tag(&self, tag: &str) -> Vec<Node> {
		collect_elements(self.document.get_elements_by_tag_name(tag))
	}

	fn attr(&self, node: &Node, name: &str) -> Option<String> {
		Self::element(node)?.get_attribute(name)
	}

	fn set_attr(&mut self, node: &Node, name: &str, value: &str) {
		if let Some(element) = Self::element(node)
			&& element.set_attribute(name, value).is_err()
		{
			warn_log!("could not set attribute `{}`", name);
		}
	}

	fn remove_attr(&mut self, node: &Node, name: &str) {
		if let Some(element) = Self::element(node)
			&& element.remove_attribute(name).is_err()
		{
			warn_log!("could not remove attribute `{}`", name);
		}
	}

	fn text_content(&self, node: &Node) -> String {
		node.text_content().unwrap_or_default()
	}

	fn take_template_content(&mut self, template: &Node) -> Vec<Node> {
		let Some(template) = template.dyn_ref::<HtmlTemplateElement>() else {
			return Vec::new();
		};
		let content = template.content();
		let nodes = collect_nodes(content.child_nodes());
		for node in &nodes {
			let _ = content.remove_child(node);
		}
		nodes
	}

	fn replace_with(&mut self, old: &Node, nodes: Vec<Node>) {
		let Some(parent) = old.parent_node() else {
			return;
		};
		for node in &nodes {
			if parent.insert_before(node, Some(old)).is_err() {
				warn_log!("could not insert resolved content");
			}
		}
		let _ = parent.remove_child(old);
	}

	fn remove(&mut self, node: &Node) {
		if let Some(parent) = node.parent_node() {
			let _ = parent.remove_child(node);
		}
	}

	fn add_listener(&mut self, node: &Node, event: &str, listener: Listener) {
		let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
			if event.type_() == "submit" {
				event.prevent_default();
			}
			listener(serialize_event(&event));
		});
		if node
			.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
			.is_err()
		{
			warn_log!("could not listen for `{}`", event);
			return;
		}
		self.listeners.push(closure);
	}
}

fn js_to_arg(value: &JsValue) -> ArgValue {
	if value.is_instance_of::<Node>() || value.is_instance_of::<web_sys::Window>() {
		return ArgValue::Node;
	}
	js_sys::JSON::stringify(value)
		.ok()
		.and_then(|s| s.as_string())
		.and_then(|s| serde_json::from_str::<Value>(&s).ok())
		.map(ArgValue::from)
		.unwrap_or(ArgValue::Null)
}

fn target_info(element: &Element) -> TargetInfo {
	let input = element.dyn_ref::<HtmlInputElement>();
	TargetInfo {
		tag_name: element.tag_name(),
		id: Some(element.id()).filter(|id| !id.is_empty()),
		name: element.get_attribute("name"),
		value: input.map(HtmlInputElement::value),
		checked: input
			.filter(|i| matches!(i.type_().as_str(), "checkbox" | "radio"))
			.map(HtmlInputElement::checked),
	}
}

fn form_fields(form: &HtmlFormElement) -> Vec<(String, String)> {
	let Ok(data) = FormData::new_with_form(form) else {
		return Vec::new();
	};
	let Ok(Some(entries)) = js_sys::try_iter(data.as_ref()) else {
		return Vec::new();
	};
	entries
		.filter_map(Result::ok)
		.filter_map(|entry| {
			let pair = entry.dyn_into::<js_sys::Array>().ok()?;
			Some((pair.get(0).as_string()?, pair.get(1).as_string()?))
		})
		.collect()
}

/// Flattens a DOM event into its wire form.
pub fn serialize_event(event: &Event) -> Value {
	let target = event.target().and_then(|t| t.dyn_into::<Element>().ok());
	let mut arg = match event.dyn_ref::<CustomEvent>() {
		Some(custom) => EventArg::custom(event.type_(), js_to_arg(&custom.detail())),
		None => EventArg::new(event.type_()),
	};
	if let Some(form) = target.as_ref().and_then(|t| t.dyn_ref::<HtmlFormElement>()) {
		arg.form_data = Some(form_fields(form));
	}
	if let Some(target) = &target {
		arg = arg.target(target_info(target));
	}
	ArgValue::from(arg).into_arg()
}

/// [`Scheduler`] over `setTimeout`.
#[derive(Clone, Default)]
pub struct GlooScheduler {
	timers: Rc<RefCell<HashMap<u64, Timeout>>>,
	next: Rc<RefCell<u64>>,
}

impl Scheduler for GlooScheduler {
	type Handle = u64;

	fn schedule(&self, delay_ms: u64, task: Box<dyn FnOnce()>) -> u64 {
		let id = {
			let mut next = self.next.borrow_mut();
			*next += 1;
			*next
		};
		let timers = self.timers.clone();
		let delay = u32::try_from(delay_ms).unwrap_or(u32::MAX);
		let timeout = Timeout::new(delay, move || {
			// The timeout is running; forgetting it keeps its closure alive
			// until the call returns.
			if let Some(fired) = timers.borrow_mut().remove(&id) {
				fired.forget();
			}
			task();
		});
		self.timers.borrow_mut().insert(id, timeout);
		id
	}

	fn cancel(&self, handle: u64) {
		if let Some(timeout) = self.timers.borrow_mut().remove(&handle) {
			timeout.cancel();
		}
	}
}

/// A started client runtime. Dropping it stops observing mutations.
pub struct WebRuntime {
	runtime: ActionRuntime<GlooScheduler>,
	dom: Rc<RefCell<WebDom>>,
	observer: MutationObserver,
	_callback: Closure<dyn FnMut(js_sys::Array, MutationObserver)>,
}

impl WebRuntime {
	pub fn runtime(&self) -> &ActionRuntime<GlooScheduler> {
		&self.runtime
	}

	/// Registers actions and resolves suspense payloads now.
	pub fn scan(&self) {
		scan(&self.runtime, &mut self.dom.borrow_mut());
	}
}

impl Drop for WebRuntime {
	fn drop(&mut self) {
		self.observer.disconnect();
	}
}

fn scan(runtime: &ActionRuntime<GlooScheduler>, dom: &mut WebDom) {
	runtime.register_actions(dom);
	let report = resolve_suspense(dom);
	for (slot, url) in report.navigations {
		info_log!("suspense slot {} requested navigation to {}", slot, url);
		navigate(&url);
	}
}

fn navigate(url: &str) {
	if let Some(window) = web_sys::window()
		&& window.location().set_href(url).is_err()
	{
		error_log!("navigation to {} failed", url);
	}
}

fn apply_outcome(document: &Document, app_root_id: &str, outcome: ActionOutcome) {
	match outcome {
		ActionOutcome::Navigate(url) => navigate(&url),
		ActionOutcome::Rerender { scope, mode, html } => {
			if scope == RenderScope::Page
				&& let Some(root) = document.get_element_by_id(app_root_id)
			{
				root.set_inner_html(&html);
			}
			let detail = json!({ "scope": scope.as_str(), "mode": mode.as_str(), "html": html });
			let init = CustomEventInit::new();
			if let Ok(detail) = js_sys::JSON::parse(&detail.to_string()) {
				init.set_detail(&detail);
			}
			if let Ok(event) = CustomEvent::new_with_event_init_dict(RERENDER_EVENT, &init) {
				let _ = document.dispatch_event(&event);
			}
		}
		ActionOutcome::Empty => {}
		ActionOutcome::NotFound => warn_log!("action not found"),
		ActionOutcome::Failed { status, message } => {
			error_log!("action failed with {}: {}", status, message)
		}
	}
}

fn set_busy(document: &Document, indicator: Option<&str>, busy: bool) {
	let Some(element) = indicator.and_then(|id| document.get_element_by_id(id)) else {
		return;
	};
	let _ = if busy {
		element.set_attribute("aria-busy", "true")
	} else {
		element.remove_attribute("aria-busy")
	};
}

/// Starts the client runtime on the current document.
pub fn start(endpoint: &str, app_root_id: &str) -> Result<WebRuntime, ClientError> {
	let document = web_sys::window()
		.and_then(|w| w.document())
		.ok_or_else(|| ClientError::Js("no document".to_string()))?;
	let dom = Rc::new(RefCell::new(WebDom::new(document.clone())));
	let table = BindingTable::from_dom(&*dom.borrow())?;
	let client = ActionClient::new(endpoint, ClientStore::from_dom(&*dom.borrow()));

	let app_root_id = app_root_id.to_string();
	let dispatch_document = document.clone();
	let dispatcher = move |call: DispatchCall| {
		let client = client.clone();
		let document = dispatch_document.clone();
		let app_root_id = app_root_id.clone();
		wasm_bindgen_futures::spawn_local(async move {
			let indicator = call.indicator_id.clone();
			set_busy(&document, indicator.as_deref(), true);
			match client.send(call).await {
				Ok(outcome) => apply_outcome(&document, &app_root_id, outcome),
				Err(error) => error_log!("action request failed: {}", error),
			}
			set_busy(&document, indicator.as_deref(), false);
		});
	};
	let runtime = ActionRuntime::new(table, dispatcher, GlooScheduler::default());
	scan(&runtime, &mut dom.borrow_mut());

	let callback = {
		let runtime = runtime.clone();
		let dom = dom.clone();
		Closure::<dyn FnMut(js_sys::Array, MutationObserver)>::new(
			move |_records: js_sys::Array, _observer: MutationObserver| {
				scan(&runtime, &mut dom.borrow_mut());
			},
		)
	};
	let observer = MutationObserver::new(callback.as_ref().unchecked_ref())
		.map_err(|e| ClientError::Js(format!("{e:?}")))?;
	let options = MutationObserverInit::new();
	options.set_child_list(true);
	options.set_subtree(true);
	observer
		.observe_with_options(&document, &options)
		.map_err(|e| ClientError::Js(format!("{e:?}")))?;

	Ok(WebRuntime {
		runtime,
		dom,
		observer,
		_callback: callback,
	})
}
