//! Server-side action resolution.
//!
//! One inbound call walks `RECEIVED -> STORE_HYDRATED -> EXECUTING ->
//! (AWAITING_NESTED)* -> RESOLVED -> RESPONDED`:
//!
//! 1. the payload names the action, its arguments and the nested actions
//!    it may call;
//! 2. the client store manifest is decoded into the request store;
//! 3. the body runs with an [`ActionContext`];
//! 4. a nested call starts as soon as the body invokes it; the body joins
//!    it with [`ActionContext::wait_action_call_promises`], in invocation
//!    order;
//! 5. calls still outstanding are joined whatever the body returned, then
//!    the body's result or control signal becomes a [`Resolution`];
//! 6. the resolution becomes a reply carrying the outbound store.

use std::ops::Deref;
use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use weir_conf::PagesSettings;
use weir_http::{BoxError, Reply, Response, StreamBody, StreamingResponse};

use super::payload::{ActionRequest, PayloadError};
use super::record::{ActionCallRecord, ActionState};
use super::registry::ActionRegistry;
use super::{RENDER_MODE_HEADER, RERENDER_HEADER};
use crate::component::{ComponentRef, Page, Props};
use crate::context::RenderContext;
use crate::signal::{ControlSignal, Interrupt, RenderMode, RenderScope};
use crate::ssr::{SsrOptions, StreamingRenderer};
use crate::transfer::{STORE_HEADER, StoreTransfer, TransferError};

/// Errors that stop an action call before its body runs.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
	#[error(transparent)]
	Payload(#[from] PayloadError),

	#[error("unknown action `{0}`")]
	UnknownAction(String),

	#[error(transparent)]
	Store(#[from] TransferError),
}

impl ActionError {
	pub fn status(&self) -> http::StatusCode {
		match self {
			ActionError::Payload(PayloadError::TooLarge { .. }) => http::StatusCode::PAYLOAD_TOO_LARGE,
			ActionError::UnknownAction(_) => http::StatusCode::NOT_FOUND,
			ActionError::Payload(_) | ActionError::Store(_) => http::StatusCode::BAD_REQUEST,
		}
	}
}

/// How an action call ended.
#[derive(Debug)]
pub enum Resolution {
	/// The body returned a response; it is sent unchanged.
	Response(Response),
	Navigate(String),
	Rerender { scope: RenderScope, mode: RenderMode },
	NotFound,
	/// A user error, with its message.
	Failed(String),
	/// The body returned nothing.
	Empty,
}

/// A resolved call, ready to be turned into a reply.
#[derive(Debug)]
pub struct Resolved {
	pub record: ActionCallRecord,
	pub resolution: Resolution,
	pub cx: RenderContext,
	/// Component owning the action, re-rendered for component rerenders.
	pub owner: Option<ComponentRef>,
}

/// A nested invocation already running on the runtime.
struct NestedCall {
	owner: String,
	action_id: String,
	task: JoinHandle<Result<(), Interrupt>>,
}

struct ChainState {
	record: ActionCallRecord,
	calls: Vec<NestedCall>,
}

/// State shared by every action of one chain.
struct Chain {
	registry: Arc<ActionRegistry>,
	original_action_id: String,
	allowed: Vec<String>,
	max_depth: usize,
	state: Mutex<ChainState>,
}

impl Chain {
	fn take_call(&self, owner: Option<&str>) -> Option<NestedCall> {
		let mut state = self.state.lock();
		let position = match owner {
			Some(name) => state.calls.iter().position(|call| call.owner == name)?,
			None if state.calls.is_empty() => return None,
			None => 0,
		};
		Some(state.calls.remove(position))
	}

	fn enter(&self, next: ActionState, action_id: &str) {
		let mut state = self.state.lock();
		if state.record.advance(next) {
			debug!(
				state = %next,
				action_id = %action_id,
				original_action_id = %self.original_action_id,
				"action state"
			);
		}
	}
}

/// What an action body sees: the request's render context plus chain
/// information and nested-call control.
///
/// Dereferences to [`RenderContext`], so store and i18n calls work
/// directly on it.
#[derive(Clone)]
pub struct ActionContext {
	render: RenderContext,
	action_id: String,
	depth: usize,
	chain: Arc<Chain>,
}

impl ActionContext {
	pub fn action_id(&self) -> &str {
		&self.action_id
	}

	/// Id of the first action in the current chain. Stable across nested
	/// invocations.
	pub fn original_action_id(&self) -> &str {
		&self.chain.original_action_id
	}

	/// True when this action started the chain.
	pub fn is_chain_initiator(&self) -> bool {
		self.action_id == self.chain.original_action_id
	}

	/// 0 for the initiator, 1 for its nested actions, and so on.
	pub fn depth(&self) -> usize {
		self.depth
	}

	pub fn render_context(&self) -> &RenderContext {
		&self.render
	}

	/// Ids this chain is allowed to invoke.
	pub fn nested_action_ids(&self) -> &[String] {
		&self.chain.allowed
	}

	/// Snapshot of the call record.
	pub fn record(&self) -> ActionCallRecord {
		self.chain.state.lock().record.clone()
	}

	/// Records an invocation of `action_id` and starts it. Its store writes
	/// are visible as soon as it makes them; join it with
	/// [`wait_action_call_promises`](Self::wait_action_call_promises).
	pub fn call_action(&self, action_id: &str, args: Vec<Value>) -> Result<(), Interrupt> {
		if !self.chain.allowed.iter().any(|id| id == action_id) {
			return Err(Interrupt::error(format!(
				"action `{action_id}` is not a declared nested action of `{}`",
				self.chain.original_action_id
			)));
		}
		let Some(def) = self.chain.registry.get(action_id).cloned() else {
			return Err(Interrupt::error(format!("unknown nested action `{action_id}`")));
		};
		if self.depth + 1 > self.chain.max_depth {
			return Err(Interrupt::error(format!(
				"action chain deeper than {} levels",
				self.chain.max_depth
			)));
		}

		let child = ActionContext {
			render: self.render.clone(),
			action_id: action_id.to_string(),
			depth: self.depth + 1,
			chain: self.chain.clone(),
		};
		let body = (def.handler)(args, child.clone());
		let task = tokio::spawn(async move {
			match body.await {
				Ok(_) => child.wait_nested().await,
				Err(interrupt) => Err(interrupt),
			}
		});
		self.chain.state.lock().calls.push(NestedCall {
			owner: self.action_id.clone(),
			action_id: action_id.to_string(),
			task,
		});
		Ok(())
	}

	/// Joins every call recorded by the action `name`, one after the other
	/// in invocation order, including calls they record in turn. The first
	/// failure stops the join and is returned.
	pub async fn wait_action_call_promises(&self, name: &str) -> Result<(), Interrupt> {
		while let Some(call) = self.chain.take_call(Some(name)) {
			self.join(call).await?;
		}
		Ok(())
	}

	/// [`wait_action_call_promises`](Self::wait_action_call_promises) for
	/// this action's own calls.
	pub async fn wait_nested(&self) -> Result<(), Interrupt> {
		let name = self.action_id.clone();
		self.wait_action_call_promises(&name).await
	}

	async fn join(&self, call: NestedCall) -> Result<(), Interrupt> {
		self.chain.state.lock().record.note_awaited(&call.action_id);
		self.chain.enter(ActionState::AwaitingNested, &call.action_id);

		let result = match call.task.await {
			Ok(result) => result,
			Err(error) => Err(Interrupt::error(format!(
				"nested action `{}` did not finish: {error}",
				call.action_id
			))),
		};

		let resumed = if self.depth == 0 {
			ActionState::Executing
		} else {
			ActionState::AwaitingNested
		};
		self.chain.enter(resumed, &self.action_id);
		result
	}

	/// Joins every call still outstanding in the chain, whoever recorded
	/// it. All of them are joined; the first failure is returned.
	async fn settle(&self) -> Result<(), Interrupt> {
		let mut first = Ok(());
		while let Some(call) = self.chain.take_call(None) {
			let action_id = call.action_id.clone();
			if let Err(interrupt) = self.join(call).await {
				if first.is_ok() {
					first = Err(interrupt);
				} else {
					warn!(action_id = %action_id, error = %interrupt, "nested action failed after an earlier failure");
				}
			}
		}
		first
	}
}

/// Aborts nested calls still running when a resolution is abandoned.
struct OutstandingCalls(Arc<Chain>);

impl Drop for OutstandingCalls {
	fn drop(&mut self) {
		for call in self.0.state.lock().calls.drain(..) {
			call.task.abort();
		}
	}
}

impl Deref for ActionContext {
	type Target = RenderContext;

	fn deref(&self) -> &Self::Target {
		&self.render
	}
}

impl std::fmt::Debug for ActionContext {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ActionContext")
			.field("action_id", &self.action_id)
			.field("original_action_id", &self.chain.original_action_id)
			.field("depth", &self.depth)
			.finish_non_exhaustive()
	}
}

/// Resolves action calls and turns them into replies.
#[derive(Debug, Clone)]
pub struct ActionResolver {
	registry: Arc<ActionRegistry>,
	transfer: StoreTransfer,
	renderer: StreamingRenderer,
	debug: bool,
	max_nested_depth: usize,
}

impl ActionResolver {
	pub fn new(registry: Arc<ActionRegistry>) -> Self {
		Self {
			registry,
			transfer: StoreTransfer::new(None),
			renderer: StreamingRenderer::new(SsrOptions::new()),
			debug: false,
			max_nested_depth: 16,
		}
	}

	pub fn from_settings(registry: Arc<ActionRegistry>, settings: &PagesSettings) -> Self {
		let transfer = StoreTransfer::new(settings.store_secret.as_ref());
		let options = SsrOptions::from_settings(settings).fragment();
		Self {
			registry,
			transfer,
			renderer: StreamingRenderer::new(options),
			debug: settings.debug,
			max_nested_depth: settings.max_nested_depth,
		}
	}

	/// Surface user error messages in 500 bodies.
	pub fn debug(mut self, debug: bool) -> Self {
		self.debug = debug;
		self
	}

	pub fn max_nested_depth(mut self, depth: usize) -> Self {
		self.max_nested_depth = depth;
		self
	}

	pub fn transfer(mut self, transfer: StoreTransfer) -> Self {
		self.transfer = transfer;
		self
	}

	/// Renderer used for rerender replies.
	pub fn renderer(mut self, renderer: StreamingRenderer) -> Self {
		self.renderer = renderer;
		self
	}

	pub fn registry(&self) -> &ActionRegistry {
		&self.registry
	}

	/// Resolves and responds; errors before execution become 4xx replies.
	pub async fn handle(&self, request: ActionRequest, cx: RenderContext) -> Reply {
		match self.resolve(request, cx).await {
			Ok(resolved) => self.respond(resolved),
			Err(error) => self.reject(&error),
		}
	}

	/// Runs the action named by `request` to its resolution.
	pub async fn resolve(&self, request: ActionRequest, cx: RenderContext) -> Result<Resolved, ActionError> {
		let ActionRequest {
			payload,
			store_header,
		} = request;
		let action_id = payload.action_id.clone();
		debug!(state = %ActionState::Received, action_id = %action_id, "action state");

		let def = self
			.registry
			.get(&action_id)
			.cloned()
			.ok_or_else(|| ActionError::UnknownAction(action_id.clone()))?;

		if let Some(header) = store_header {
			self.transfer.inbound(&header, &mut cx.store())?;
		}

		let chain = Arc::new(Chain {
			registry: self.registry.clone(),
			original_action_id: action_id.clone(),
			allowed: payload.nested_action_ids,
			max_depth: self.max_nested_depth,
			state: Mutex::new(ChainState {
				record: ActionCallRecord::new(action_id.clone(), payload.is_form_data),
				calls: Vec::new(),
			}),
		});
		chain.enter(ActionState::StoreHydrated, &action_id);
		let _outstanding = OutstandingCalls(chain.clone());

		let action_cx = ActionContext {
			render: cx.clone(),
			action_id: action_id.clone(),
			depth: 0,
			chain: chain.clone(),
		};
		chain.enter(ActionState::Executing, &action_id);
		let result = (def.handler)(payload.args, action_cx.clone()).await;
		// Calls the body never joined still finish before the reply. A body
		// that already failed or signalled keeps its own outcome.
		let settled = action_cx.settle().await;
		let result = match (result, settled) {
			(Ok(response), Ok(())) => Ok(response),
			(Ok(_), Err(interrupt)) => Err(interrupt),
			(Err(interrupt), settled) => {
				if let Err(nested) = settled {
					warn!(action_id = %action_id, error = %nested, "nested action failed after the body returned");
				}
				Err(interrupt)
			}
		};
		chain.enter(ActionState::Resolved, &action_id);

		let resolution = match result {
			Ok(Some(response)) => Resolution::Response(response),
			Ok(None) => Resolution::Empty,
			Err(Interrupt::Signal(signal)) => {
				debug!(action_id = %action_id, signal = %signal, "action raised a control signal");
				match signal {
					ControlSignal::Navigate(url) => Resolution::Navigate(url),
					ControlSignal::Rerender { scope, mode } => Resolution::Rerender { scope, mode },
					ControlSignal::NotFound => Resolution::NotFound,
				}
			}
			Err(Interrupt::Error(message)) => {
				error!(action_id = %action_id, error = %message, "action failed");
				Resolution::Failed(message)
			}
		};

		let record = chain.state.lock().record.clone();
		Ok(Resolved {
			record,
			resolution,
			cx,
			owner: def.owner,
		})
	}

	/// Turns a resolution into the reply sent to the client.
	pub fn respond(&self, resolved: Resolved) -> Reply {
		let Resolved {
			mut record,
			resolution,
			cx,
			owner,
		} = resolved;

		let reply = match resolution {
			Resolution::Response(response) => Reply::Full(response),
			Resolution::Navigate(url) => {
				let body = json!({ "action": "navigate", "params": [url] });
				match Response::ok().with_json(&body) {
					Ok(response) => self.with_store(response, &cx),
					Err(error) => self.failure(&error.to_string()),
				}
			}
			Resolution::Rerender { scope, mode } => self.rerender(scope, mode, owner, &cx),
			Resolution::NotFound => Reply::Full(Response::not_found()),
			Resolution::Failed(message) => self.failure(&message),
			Resolution::Empty => self.with_store(Response::ok(), &cx),
		};

		if record.advance(ActionState::Responded) {
			debug!(
				state = %ActionState::Responded,
				action_id = %record.action_id,
				status = reply.status().as_u16(),
				"action state"
			);
		}
		reply
	}

	/// Reply for a call rejected before its body ran.
	pub fn reject(&self, error: &ActionError) -> Reply {
		debug!(error = %error, "action rejected");
		let response = Response::new(error.status());
		Reply::Full(if self.debug {
			response.with_body(error.to_string())
		} else {
			response
		})
	}

	fn failure(&self, message: &str) -> Reply {
		let response = Response::internal_server_error();
		Reply::Full(if self.debug {
			response.with_body(message.to_string())
		} else {
			response
		})
	}

	fn with_store(&self, response: Response, cx: &RenderContext) -> Reply {
		match self.transfer.outbound(&cx.store()) {
			Ok(header) => Reply::Full(response.with_header(STORE_HEADER, &header)),
			Err(error) => {
				error!(error = %error, "could not encode the client store");
				self.failure(&error.to_string())
			}
		}
	}

	fn rerender(
		&self,
		scope: RenderScope,
		mode: RenderMode,
		owner: Option<ComponentRef>,
		cx: &RenderContext,
	) -> Reply {
		let page = cx.route().page.clone();
		let target = match scope {
			RenderScope::Component => owner.or(page),
			RenderScope::Page => page,
		};
		let Some(target) = target else {
			error!(scope = scope.as_str(), "rerender requested with nothing to re-render");
			return self.failure("nothing to re-render");
		};
		let store = match self.transfer.outbound(&cx.store()) {
			Ok(store) => store,
			Err(error) => {
				error!(error = %error, "could not encode the client store");
				return self.failure(&error.to_string());
			}
		};

		let stream = self
			.renderer
			.render(Page::component(target, Props::new()), cx.clone());
		let body: StreamBody = Box::pin(stream.map(|chunk| chunk.map_err(|e| -> BoxError { Box::new(e) })));
		Reply::Streaming(
			StreamingResponse::new(body)
				.media_type("text/html; charset=utf-8")
				.with_header(RERENDER_HEADER, scope.as_str())
				.with_header(RENDER_MODE_HEADER, mode.as_str())
				.with_header(STORE_HEADER, &store),
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::actions::payload::DispatchPayload;
	use crate::component::FnComponent;
	use crate::context::RouteMatch;
	use crate::signal::{navigate, not_found, rerender};
	use crate::store::Partition;
	use rstest::{fixture, rstest};

	#[fixture]
	fn cx() -> RenderContext {
		RenderContext::builder(RouteMatch::new("/")).build()
	}

	fn request(payload: DispatchPayload) -> ActionRequest {
		ActionRequest {
			payload,
			store_header: None,
		}
	}

	fn trace_registry(trace: Arc<Mutex<Vec<String>>>) -> ActionRegistry {
		let a_trace = trace.clone();
		let b_trace = trace;
		ActionRegistry::new()
			.action("a", move |_, cx| {
				let trace = a_trace.clone();
				async move {
					trace.lock().push("a starts".into());
					cx.call_action("b", vec![])?;
					cx.wait_action_call_promises("a").await?;
					trace.lock().push("a completes".into());
					Ok(None)
				}
			})
			.action("b", move |_, cx| {
				let trace = b_trace.clone();
				async move {
					trace.lock().push(format!("b starts (initiator: {})", cx.is_chain_initiator()));
					trace.lock().push("b completes".into());
					Ok(None)
				}
			})
	}

	#[rstest]
	#[tokio::test]
	async fn test_nested_call_joins_in_order(cx: RenderContext) {
		// Arrange
		let trace = Arc::new(Mutex::new(Vec::new()));
		let resolver = ActionResolver::new(Arc::new(trace_registry(trace.clone())));

		// Act
		let resolved = resolver
			.resolve(request(DispatchPayload::new("a").nested(["b"])), cx)
			.await
			.unwrap();

		// Assert
		assert_eq!(
			*trace.lock(),
			["a starts", "b starts (initiator: false)", "b completes", "a completes"]
		);
		assert_eq!(resolved.record.awaited, ["b"]);
		assert!(matches!(resolved.resolution, Resolution::Empty));
		assert_eq!(
			resolved.record.history,
			[
				ActionState::Received,
				ActionState::StoreHydrated,
				ActionState::Executing,
				ActionState::AwaitingNested,
				ActionState::Executing,
				ActionState::Resolved
			]
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_undeclared_nested_call_fails(cx: RenderContext) {
		// Arrange
		let trace = Arc::new(Mutex::new(Vec::new()));
		let resolver = ActionResolver::new(Arc::new(trace_registry(trace)));

		// Act
		let resolved = resolver.resolve(request(DispatchPayload::new("a")), cx).await.unwrap();

		// Assert
		assert!(matches!(resolved.resolution, Resolution::Failed(m) if m.contains("not a declared nested action")));
	}

	#[rstest]
	#[tokio::test]
	async fn test_unawaited_calls_drain_after_body(cx: RenderContext) {
		// Arrange
		let ran = Arc::new(Mutex::new(Vec::new()));
		let seen = ran.clone();
		let registry = ActionRegistry::new()
			.action("parent", |_, cx| async move {
				cx.call_action("child", vec![Value::from(1)])?;
				cx.call_action("child", vec![Value::from(2)])?;
				Ok(None)
			})
			.action("child", move |args, _| {
				let seen = seen.clone();
				async move {
					seen.lock().push(args[0].clone());
					Ok(None)
				}
			});
		let resolver = ActionResolver::new(Arc::new(registry));

		// Act
		resolver
			.resolve(request(DispatchPayload::new("parent").nested(["child"])), cx)
			.await
			.unwrap();

		// Assert
		assert_eq!(*ran.lock(), [Value::from(1), Value::from(2)]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_nested_call_finishes_when_body_signals(cx: RenderContext) {
		// Arrange
		let registry = ActionRegistry::new()
			.action("parent", |_, cx| async move {
				cx.call_action("child", vec![])?;
				Err(navigate("/done"))
			})
			.action("child", |_, cx| async move {
				tokio::task::yield_now().await;
				cx.set("child", "ran");
				Ok(None)
			});
		let resolver = ActionResolver::new(Arc::new(registry));

		// Act
		let resolved = resolver
			.resolve(request(DispatchPayload::new("parent").nested(["child"])), cx.clone())
			.await
			.unwrap();

		// Assert
		assert!(matches!(&resolved.resolution, Resolution::Navigate(url) if url == "/done"));
		assert_eq!(cx.get("child"), Some(Value::from("ran")));
		assert_eq!(resolved.record.awaited, ["child"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_nested_call_starts_before_join(cx: RenderContext) {
		// Arrange
		let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
		let started_tx = Arc::new(Mutex::new(Some(started_tx)));
		let started_rx = Arc::new(Mutex::new(Some(started_rx)));
		let registry = ActionRegistry::new()
			.action("parent", move |_, cx| {
				let started = started_rx.lock().take();
				async move {
					cx.call_action("child", vec![])?;
					let seen = match started {
						Some(rx) => tokio::time::timeout(std::time::Duration::from_secs(5), rx)
							.await
							.is_ok(),
						None => false,
					};
					cx.set("started_before_join", seen);
					cx.wait_nested().await.map(|_| None)
				}
			})
			.action("child", move |_, _| {
				let started = started_tx.lock().take();
				async move {
					if let Some(tx) = started {
						let _ = tx.send(());
					}
					Ok(None)
				}
			});
		let resolver = ActionResolver::new(Arc::new(registry));

		// Act
		resolver
			.resolve(request(DispatchPayload::new("parent").nested(["child"])), cx.clone())
			.await
			.unwrap();

		// Assert
		assert_eq!(cx.get("started_before_join"), Some(Value::from(true)));
	}

	#[rstest]
	#[tokio::test]
	async fn test_failed_nested_call_fails_parent(cx: RenderContext) {
		// Arrange
		let registry = ActionRegistry::new()
			.action("parent", |_, cx| async move {
				cx.call_action("child", vec![])?;
				Ok(None)
			})
			.action("child", |_, _| async { Err(Interrupt::error("child broke")) });
		let resolver = ActionResolver::new(Arc::new(registry));

		// Act
		let resolved = resolver
			.resolve(request(DispatchPayload::new("parent").nested(["child"])), cx)
			.await
			.unwrap();

		// Assert
		assert!(matches!(&resolved.resolution, Resolution::Failed(m) if m == "child broke"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_chain_depth_is_bounded(cx: RenderContext) {
		// Arrange
		let registry = ActionRegistry::new().action("loop", |_, cx| async move {
			cx.call_action("loop", vec![])?;
			cx.wait_nested().await.map(|_| None)
		});
		let resolver = ActionResolver::new(Arc::new(registry)).max_nested_depth(3);

		// Act
		let resolved = resolver
			.resolve(request(DispatchPayload::new("loop").nested(["loop"])), cx)
			.await
			.unwrap();

		// Assert
		assert!(matches!(resolved.resolution, Resolution::Failed(m) if m.contains("deeper than 3")));
	}

	#[rstest]
	#[tokio::test]
	async fn test_navigate_becomes_json(cx: RenderContext) {
		// Arrange
		let registry = ActionRegistry::new().action("go", |_, _| async { Err(navigate("/x")) });
		let resolver = ActionResolver::new(Arc::new(registry));

		// Act
		let reply = resolver.handle(request(DispatchPayload::new("go")), cx).await;

		// Assert
		assert_eq!(reply.status(), http::StatusCode::OK);
		assert_eq!(reply.header_str("content-type"), Some("application/json"));
		assert!(reply.header_str(STORE_HEADER).is_some());
		let body: Value = serde_json::from_slice(&reply.into_body_bytes().await.unwrap()).unwrap();
		assert_eq!(body, json!({"action": "navigate", "params": ["/x"]}));
	}

	#[rstest]
	#[case(false, "")]
	#[case(true, "boom")]
	#[tokio::test]
	async fn test_user_error_is_500(cx: RenderContext, #[case] debug: bool, #[case] expected: &str) {
		// Arrange
		let registry = ActionRegistry::new().action("fail", |_, _| async { Err(Interrupt::error("boom")) });
		let resolver = ActionResolver::new(Arc::new(registry)).debug(debug);

		// Act
		let reply = resolver.handle(request(DispatchPayload::new("fail")), cx).await;

		// Assert
		assert_eq!(reply.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(reply.into_body_bytes().await.unwrap(), expected.as_bytes());
	}

	#[rstest]
	#[tokio::test]
	async fn test_not_found_and_unknown(cx: RenderContext) {
		// Arrange
		let registry = ActionRegistry::new().action("missing", |_, _| async { Err(not_found()) });
		let resolver = ActionResolver::new(Arc::new(registry));

		// Act
		let signalled = resolver
			.handle(request(DispatchPayload::new("missing")), cx.clone())
			.await;
		let unknown = resolver.handle(request(DispatchPayload::new("nope")), cx).await;

		// Assert
		assert_eq!(signalled.status(), http::StatusCode::NOT_FOUND);
		assert!(signalled.header_str(STORE_HEADER).is_none());
		assert_eq!(unknown.status(), http::StatusCode::NOT_FOUND);
	}

	#[rstest]
	#[tokio::test]
	async fn test_explicit_response_passes_through(cx: RenderContext) {
		// Arrange
		let registry = ActionRegistry::new().action("teapot", |_, _| async {
			Ok(Some(Response::new(http::StatusCode::IM_A_TEAPOT).with_body("short and stout")))
		});
		let resolver = ActionResolver::new(Arc::new(registry));

		// Act
		let reply = resolver.handle(request(DispatchPayload::new("teapot")), cx).await;

		// Assert
		assert_eq!(reply.status(), http::StatusCode::IM_A_TEAPOT);
		assert!(reply.header_str(STORE_HEADER).is_none());
	}

	#[rstest]
	#[tokio::test]
	async fn test_store_hydrated_before_body_and_sent_back(cx: RenderContext) {
		// Arrange
		let registry = ActionRegistry::new().action("inc", |_, cx| async move {
			let count = cx.store().get_as::<i64>("count").unwrap_or(0);
			cx.set("count", count + 1);
			Ok(None)
		});
		let resolver = ActionResolver::new(Arc::new(registry));
		let header = urlencoding::encode("[[\"count\",41]]").into_owned();
		let request = ActionRequest {
			payload: DispatchPayload::new("inc"),
			store_header: Some(header),
		};

		// Act
		let reply = resolver.handle(request, cx.clone()).await;

		// Assert
		assert_eq!(reply.status(), http::StatusCode::OK);
		assert_eq!(cx.get("count"), Some(Value::from(42)));
		assert_eq!(cx.store().partition_of("count"), Some(Partition::Client));
		let sent = urlencoding::decode(reply.header_str(STORE_HEADER).unwrap()).unwrap().into_owned();
		assert_eq!(sent, "[[\"count\",42]]");
	}

	#[rstest]
	#[tokio::test]
	async fn test_bad_store_header_is_400(cx: RenderContext) {
		// Arrange
		let registry = ActionRegistry::new().action("noop", |_, _| async { Ok(None) });
		let resolver = ActionResolver::new(Arc::new(registry));
		let request = ActionRequest {
			payload: DispatchPayload::new("noop"),
			store_header: Some("not-json".into()),
		};

		// Act
		let reply = resolver.handle(request, cx).await;

		// Assert
		assert_eq!(reply.status(), http::StatusCode::BAD_REQUEST);
	}

	#[rstest]
	#[tokio::test]
	async fn test_component_rerender_streams_owner() {
		// Arrange
		let counter = FnComponent::new("Counter", |_, cx| {
			let count = cx.get("count").unwrap_or(Value::from(0));
			Page::element("span").child(count.to_string()).into()
		});
		let registry = ActionRegistry::new().owned_action("bump", counter, |_, cx| async move {
			cx.set("count", 7);
			Err(rerender(RenderScope::Component, RenderMode::Transition))
		});
		let resolver = ActionResolver::new(Arc::new(registry));
		let cx = RenderContext::builder(RouteMatch::new("/")).build();

		// Act
		let reply = resolver.handle(request(DispatchPayload::new("bump")), cx).await;

		// Assert
		assert!(reply.is_streaming());
		assert_eq!(reply.header_str(RERENDER_HEADER), Some("component"));
		assert_eq!(reply.header_str(RENDER_MODE_HEADER), Some("transition"));
		let html = reply.into_body_bytes().await.unwrap();
		assert_eq!(html, "<span>7</span>".as_bytes());
	}
}
