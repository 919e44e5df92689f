//! Client action dispatch.
//!
//! An [`ActionRuntime`] owns everything action registration needs: the
//! binding table, the element registrations made so far, pending debounce
//! timers, the dispatcher and the scheduler. Hosts call
//! [`ActionRuntime::register_actions`] once per mutation batch.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use serde_json::Value;

use super::ClientError;
use super::dom::DomHost;
use crate::actions::binding::{ACTION_ATTR, ActionBinding, BINDINGS_SCRIPT_ID, BindingTable};
use crate::actions::payload::DispatchPayload;
use crate::{debug_log, warn_log};

/// One triggered action, as handed to a [`Dispatcher`].
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchCall {
	pub action_id: String,
	pub is_form_submit: bool,
	pub indicator_id: Option<String>,
	pub nested_action_ids: Vec<String>,
	/// Serialized event arguments.
	pub args: Vec<Value>,
}

impl DispatchCall {
	pub fn from_binding(binding: &ActionBinding, args: Vec<Value>) -> Self {
		Self {
			action_id: binding.action_id.clone(),
			is_form_submit: binding.is_form_submit(),
			indicator_id: binding.indicator_id.clone(),
			nested_action_ids: binding.nested_action_ids.clone(),
			args,
		}
	}

	pub fn into_payload(self) -> DispatchPayload {
		DispatchPayload {
			action_id: self.action_id,
			is_form_data: self.is_form_submit,
			indicator_id: self.indicator_id,
			nested_action_ids: self.nested_action_ids,
			args: self.args,
		}
	}
}

/// Sends triggered actions to the server.
pub trait Dispatcher {
	fn dispatch(&self, call: DispatchCall);
}

impl<F: Fn(DispatchCall)> Dispatcher for F {
	fn dispatch(&self, call: DispatchCall) {
		self(call)
	}
}

/// Runs delayed tasks for debouncing.
pub trait Scheduler {
	type Handle;

	fn schedule(&self, delay_ms: u64, task: Box<dyn FnOnce()>) -> Self::Handle;

	/// Cancels a task that has not run yet. Cancelling a task that already
	/// ran does nothing.
	fn cancel(&self, handle: Self::Handle);
}

/// Deterministic [`Scheduler`] driven by [`advance`](Self::advance).
#[derive(Clone, Default)]
pub struct VirtualClock {
	state: Rc<RefCell<ClockState>>,
}

#[derive(Default)]
struct ClockState {
	now: u64,
	next_id: u64,
	tasks: BTreeMap<(u64, u64), Box<dyn FnOnce()>>,
}

/// Handle of a task scheduled on a [`VirtualClock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerId {
	due: u64,
	id: u64,
}

impl VirtualClock {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn now(&self) -> u64 {
		self.state.borrow().now
	}

	pub fn pending(&self) -> usize {
		self.state.borrow().tasks.len()
	}

	/// Moves time forward by `ms`, running due tasks in due order.
	pub fn advance(&self, ms: u64) {
		let target = self.state.borrow().now + ms;
		loop {
			let next = {
				let mut state = self.state.borrow_mut();
				let due = state.tasks.first_key_value().map(|(&(due, _), _)| due);
				match due {
					Some(due) if due <= target => {
						state.now = due;
						state.tasks.pop_first().map(|(_, task)| task)
					}
					_ => None,
				}
			};
			match next {
				Some(task) => task(),
				None => break,
			}
		}
		self.state.borrow_mut().now = target;
	}
}

impl Scheduler for VirtualClock {
	type Handle = TimerId;

	fn schedule(&self, delay_ms: u64, task: Box<dyn FnOnce()>) -> TimerId {
		let mut state = self.state.borrow_mut();
		state.next_id += 1;
		let handle = TimerId {
			due: state.now + delay_ms,
			id: state.next_id,
		};
		state.tasks.insert((handle.due, handle.id), task);
		handle
	}

	fn cancel(&self, handle: TimerId) {
		self.state.borrow_mut().tasks.remove(&(handle.due, handle.id));
	}
}

impl std::fmt::Debug for VirtualClock {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("VirtualClock")
			.field("now", &self.now())
			.field("pending", &self.pending())
			.finish()
	}
}

type TimerKey = (u64, String);

struct RuntimeState<S: Scheduler> {
	table: BindingTable,
	registered: u64,
	timers: HashMap<TimerKey, S::Handle>,
}

/// Registers action listeners and routes their triggers to a dispatcher.
///
/// Cloning shares the runtime.
pub struct ActionRuntime<S: Scheduler> {
	state: Rc<RefCell<RuntimeState<S>>>,
	dispatcher: Rc<dyn Dispatcher>,
	scheduler: Rc<S>,
}

impl<S: Scheduler> Clone for ActionRuntime<S> {
	fn clone(&self) -> Self {
		Self {
			state: self.state.clone(),
			dispatcher: self.dispatcher.clone(),
			scheduler: self.scheduler.clone(),
		}
	}
}

impl<S: Scheduler + 'static> ActionRuntime<S> {
	pub fn new(table: BindingTable, dispatcher: impl Dispatcher + 'static, scheduler: S) -> Self {
		Self {
			state: Rc::new(RefCell::new(RuntimeState {
				table,
				registered: 0,
				timers: HashMap::new(),
			})),
			dispatcher: Rc::new(dispatcher),
			scheduler: Rc::new(scheduler),
		}
	}

	/// Adds bindings received later, e.g. with a re-rendered fragment.
	pub fn extend_table(&self, table: BindingTable) {
		self.state.borrow_mut().table.merge(table);
	}

	/// Elements registered so far.
	pub fn registered(&self) -> u64 {
		self.state.borrow().registered
	}

	/// Wires a listener per bound event on every element still carrying a
	/// binding key, then removes the key so the element is never wired
	/// twice. Returns the number of listeners added.
	pub fn register_actions<D: DomHost>(&self, dom: &mut D) -> usize {
		let mut added = 0;
		for node in dom.elements_with_attr(ACTION_ATTR) {
			let Some(key) = dom.attr(&node, ACTION_ATTR) else {
				continue;
			};
			dom.remove_attr(&node, ACTION_ATTR);

			let (element, bindings) = {
				let mut state = self.state.borrow_mut();
				let Some(bindings) = state.table.get(&key).map(<[ActionBinding]>::to_vec) else {
					warn_log!("no action bindings for key `{}`", key);
					continue;
				};
				state.registered += 1;
				(state.registered, bindings)
			};

			for binding in bindings {
				let runtime = self.clone();
				let event = binding.event.clone();
				dom.add_listener(
					&node,
					&event,
					Box::new(move |arg| runtime.trigger(element, &binding, arg)),
				);
				added += 1;
			}
		}
		debug_log!("registered {} action listeners", added);
		added
	}

	/// Handles one event on registered element `element`.
	pub fn trigger(&self, element: u64, binding: &ActionBinding, arg: Value) {
		let call = DispatchCall::from_binding(binding, vec![arg]);
		let key: TimerKey = (element, binding.event.clone());

		if let Some(handle) = self.state.borrow_mut().timers.remove(&key) {
			self.scheduler.cancel(handle);
		}

		match binding.debounce_ms {
			Some(delay) if delay > 0 => {
				let runtime = self.clone();
				let timer_key = key.clone();
				let handle = self.scheduler.schedule(
					delay,
					Box::new(move || {
						runtime.state.borrow_mut().timers.remove(&timer_key);
						runtime.dispatcher.dispatch(call);
					}),
				);
				self.state.borrow_mut().timers.insert(key, handle);
			}
			_ => self.dispatcher.dispatch(call),
		}
	}
}

impl<S: Scheduler> std::fmt::Debug for ActionRuntime<S> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.state.borrow();
		f.debug_struct("ActionRuntime")
			.field("bindings", &state.table.len())
			.field("registered", &state.registered)
			.field("timers", &state.timers.len())
			.finish_non_exhaustive()
	}
}

impl BindingTable {
	/// Reads the table embedded in the document, or an empty table when
	/// the document embeds none.
	pub fn from_dom<D: DomHost>(dom: &D) -> Result<Self, ClientError> {
		match dom.element_by_id(BINDINGS_SCRIPT_ID) {
			Some(script) => Ok(BindingTable::from_json(&dom.text_content(&script))?),
			None => Ok(BindingTable::new()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::client::dom::{MemoryDom, NodeId};
	use crate::client::parse::parse_html;
	use rstest::{fixture, rstest};
	use serde_json::json;

	type Calls = Rc<RefCell<Vec<DispatchCall>>>;

	fn recorder() -> (Calls, impl Fn(DispatchCall)) {
		let calls: Calls = Rc::new(RefCell::new(Vec::new()));
		let sink = calls.clone();
		(calls, move |call| sink.borrow_mut().push(call))
	}

	#[fixture]
	fn table() -> BindingTable {
		BindingTable::new()
			.bind("buy", ActionBinding::new("click", "cart.add").nested(["cart.count"]))
			.bind("search", ActionBinding::new("input", "search").debounce(300).indicator("spin"))
			.bind("form", ActionBinding::new("submit", "signup"))
	}

	fn element(dom: &MemoryDom, tag: &str) -> NodeId {
		dom.elements_by_tag(tag)[0]
	}

	#[rstest]
	fn test_register_twice_is_idempotent(table: BindingTable) {
		// Arrange
		let mut dom = parse_html(r#"<button data-action="buy">Buy</button><input data-action="search">"#).unwrap();
		let (calls, dispatch) = recorder();
		let runtime = ActionRuntime::new(table, dispatch, VirtualClock::new());

		// Act
		let first = runtime.register_actions(&mut dom);
		let second = runtime.register_actions(&mut dom);
		let button = element(&dom, "button");
		dom.dispatch_event(button, "click", json!({"type": "click"}));

		// Assert
		assert_eq!((first, second), (2, 0));
		assert_eq!(dom.listener_count(button), 1);
		assert!(dom.elements_with_attr(ACTION_ATTR).is_empty());
		assert_eq!(calls.borrow().len(), 1);
		assert_eq!(calls.borrow()[0].nested_action_ids, ["cart.count"]);
	}

	#[rstest]
	fn test_debounce_keeps_only_the_last_trigger(table: BindingTable) {
		// Arrange
		let mut dom = parse_html(r#"<input data-action="search">"#).unwrap();
		let (calls, dispatch) = recorder();
		let clock = VirtualClock::new();
		let runtime = ActionRuntime::new(table, dispatch, clock.clone());
		runtime.register_actions(&mut dom);
		let input = element(&dom, "input");

		// Act
		dom.dispatch_event(input, "input", json!("r"));
		clock.advance(200);
		dom.dispatch_event(input, "input", json!("ru"));
		clock.advance(299);
		let before = calls.borrow().len();
		clock.advance(1);

		// Assert
		assert_eq!(before, 0);
		let calls = calls.borrow();
		assert_eq!(calls.len(), 1);
		assert_eq!(calls[0].args, [json!("ru")]);
		assert_eq!(calls[0].indicator_id.as_deref(), Some("spin"));
		assert_eq!(clock.pending(), 0);
	}

	#[rstest]
	fn test_submit_is_flagged_as_form(table: BindingTable) {
		// Arrange
		let mut dom = parse_html(r#"<form data-action="form"></form>"#).unwrap();
		let (calls, dispatch) = recorder();
		let runtime = ActionRuntime::new(table, dispatch, VirtualClock::new());
		runtime.register_actions(&mut dom);

		// Act
		dom.dispatch_event(element(&dom, "form"), "submit", json!({"type": "submit"}));

		// Assert
		let payload = calls.borrow()[0].clone().into_payload();
		assert!(payload.is_form_data);
		assert_eq!(payload.action_id, "signup");
	}

	#[rstest]
	fn test_unknown_key_is_skipped(table: BindingTable) {
		// Arrange
		let mut dom = parse_html(r#"<a data-action="nope"></a>"#).unwrap();
		let runtime = ActionRuntime::new(table, |_: DispatchCall| {}, VirtualClock::new());

		// Act
		let added = runtime.register_actions(&mut dom);

		// Assert
		assert_eq!(added, 0);
		assert_eq!(runtime.registered(), 0);
	}

	#[rstest]
	fn test_table_read_from_document() {
		// Arrange
		let dom = parse_html(
			r#"<script type="application/json" id="weir-actions">{"k":[{"event":"click","actionId":"a"}]}</script>"#,
		)
		.unwrap();

		// Act
		let table = BindingTable::from_dom(&dom).unwrap();

		// Assert
		assert_eq!(table.get("k").unwrap()[0].action_id, "a");
	}
}
