//! Streaming renderer with out-of-order suspense resolution.
//!
//! A render pass walks the page tree depth-first and writes HTML into a
//! buffer that is flushed to a bounded channel at suspense placeholders and
//! after each item of a streaming sequence. Pending components with a
//! suspense fallback get a placeholder right away; their bodies resolve in
//! independently spawned tasks, each of which renders its content into its
//! own buffer and emits it as one atomic late payload. Late payloads are
//! forwarded, in resolution order, once the main pass has finished.
//!
//! A user error inside an error boundary rewinds the buffer to where the
//! boundary started, drops the suspense slots queued since, and writes the
//! error fallback instead. Boundaries never hold back a flush: the first
//! flush inside one wraps its output in a placeholder slot, and a failure
//! after that aborts the boundary's suspense tasks, closes what was sent
//! and delivers the fallback as that slot's late payload. Control signals
//! are never caught.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::future::{BoxFuture, Future};
use futures::stream::{Stream, StreamExt};
use indexmap::IndexSet;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, warn};
use weir_conf::PagesSettings;

use super::document::{DocumentShell, bindings_script};
use super::markers::{
	STREAM_ATTR, SlotId, SlotScope, navigate_payload, placeholder_open, success_payload,
};
use crate::actions::binding::BindingTable;
use crate::component::{ComponentInvocation, Page, Rendered, html_escape};
use crate::context::RenderContext;
use crate::signal::{ControlSignal, Interrupt, RenderError};
use crate::transfer::StoreTransfer;

/// Options for a render pass.
#[derive(Debug, Clone)]
pub struct SsrOptions {
	/// Number of chunks buffered between the renderer and the consumer.
	pub channel_capacity: usize,
	/// Wraps the output in a full document when set.
	pub shell: Option<DocumentShell>,
	/// Table the embedded binding subset is taken from.
	pub bindings: Arc<BindingTable>,
	/// Encodes the client store embedded in documents.
	pub transfer: StoreTransfer,
}

impl Default for SsrOptions {
	fn default() -> Self {
		Self {
			channel_capacity: 32,
			shell: None,
			bindings: Arc::new(BindingTable::new()),
			transfer: StoreTransfer::new(None),
		}
	}
}

impl SsrOptions {
	/// Fragment output, no bindings, no store secret.
	pub fn new() -> Self {
		Self::default()
	}

	/// Channel capacity, root id and store secret from settings.
	pub fn from_settings(settings: &PagesSettings) -> Self {
		Self {
			channel_capacity: settings.channel_capacity,
			shell: Some(DocumentShell::new().app_root(settings.app_root_id.clone())),
			bindings: Arc::new(BindingTable::new()),
			transfer: StoreTransfer::new(settings.store_secret.as_ref()),
		}
	}

	pub fn document(mut self, shell: DocumentShell) -> Self {
		self.shell = Some(shell);
		self
	}

	/// Renders a bare fragment, as used for re-renders.
	pub fn fragment(mut self) -> Self {
		self.shell = None;
		self
	}

	pub fn channel_capacity(mut self, capacity: usize) -> Self {
		self.channel_capacity = capacity;
		self
	}

	pub fn bindings(mut self, bindings: Arc<BindingTable>) -> Self {
		self.bindings = bindings;
		self
	}

	pub fn transfer(mut self, transfer: StoreTransfer) -> Self {
		self.transfer = transfer;
		self
	}

	/// Closing markup: data scripts, plus the document end for documents.
	fn tail(&self, used_keys: &IndexSet<String>, cx: &RenderContext) -> Result<String, RenderError> {
		let used = self.bindings.subset(used_keys.iter().map(String::as_str));
		let bindings_json = if used.is_empty() {
			None
		} else {
			Some(used.to_json().map_err(|e| RenderError::Embed(e.to_string()))?)
		};
		match &self.shell {
			Some(shell) => {
				let store_json = self
					.transfer
					.outbound_json(&cx.store())
					.map_err(|e| RenderError::Embed(e.to_string()))?;
				Ok(shell.close(bindings_json.as_deref(), &store_json))
			}
			None => Ok(bindings_json
				.map(|json| bindings_script(&json))
				.unwrap_or_default()),
		}
	}
}

/// Renders page trees into HTML byte streams.
///
/// ## Example
///
/// ```no_run
/// use weir_pages::component::Page;
/// use weir_pages::context::{RenderContext, RouteMatch};
/// use weir_pages::ssr::{SsrOptions, StreamingRenderer};
///
/// # async fn demo() -> Result<(), weir_pages::signal::RenderError> {
/// let renderer = StreamingRenderer::new(SsrOptions::new());
/// let cx = RenderContext::builder(RouteMatch::new("/")).build();
/// let html = renderer
///     .render_to_string(Page::element("p").child("hi").into(), cx)
///     .await?;
/// assert_eq!(html, "<p>hi</p>");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct StreamingRenderer {
	options: SsrOptions,
}

impl StreamingRenderer {
	pub fn new(options: SsrOptions) -> Self {
		Self { options }
	}

	pub fn options(&self) -> &SsrOptions {
		&self.options
	}

	/// Starts rendering `root` on the current tokio runtime.
	///
	/// Dropping the returned stream aborts the render and every suspense
	/// task it spawned.
	pub fn render(&self, root: Page, cx: RenderContext) -> RenderStream {
		let (tx, rx) = mpsc::channel(self.options.channel_capacity.max(1));
		let tasks = TaskRegistry::default();
		tasks.spawn(drive(root, cx, self.options.clone(), tx, tasks.clone()));
		RenderStream {
			inner: ReceiverStream::new(rx),
			tasks,
		}
	}

	/// Renders to completion and concatenates the chunks.
	pub async fn render_to_string(&self, root: Page, cx: RenderContext) -> Result<String, RenderError> {
		let mut stream = self.render(root, cx);
		let mut html = String::new();
		while let Some(chunk) = stream.next().await {
			html.push_str(&String::from_utf8_lossy(&chunk?));
		}
		Ok(html)
	}
}

/// HTML chunks of one render pass.
///
/// Ends after the last chunk, or after the first error.
pub struct RenderStream {
	inner: ReceiverStream<Result<Bytes, RenderError>>,
	tasks: TaskRegistry,
}

impl Stream for RenderStream {
	type Item = Result<Bytes, RenderError>;

	fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		self.inner.poll_next_unpin(cx)
	}
}

impl Drop for RenderStream {
	fn drop(&mut self) {
		self.tasks.abort_all();
	}
}

impl std::fmt::Debug for RenderStream {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RenderStream").finish_non_exhaustive()
	}
}

#[derive(Default)]
struct Registry {
	handles: Vec<AbortHandle>,
	closed: bool,
}

/// Abort handles of every task belonging to one render.
#[derive(Clone, Default)]
struct TaskRegistry(Arc<Mutex<Registry>>);

impl TaskRegistry {
	fn spawn<F>(&self, future: F) -> AbortHandle
	where
		F: Future<Output = ()> + Send + 'static,
	{
		let handle = tokio::spawn(future).abort_handle();
		let mut registry = self.0.lock();
		if registry.closed {
			handle.abort();
		} else {
			registry.handles.push(handle.clone());
		}
		handle
	}

	fn abort_all(&self) {
		let mut registry = self.0.lock();
		registry.closed = true;
		for handle in registry.handles.drain(..) {
			handle.abort();
		}
	}
}

/// Why a pass stopped early.
#[derive(Debug)]
enum Halt {
	Failed {
		component: String,
		interrupt: Interrupt,
	},
	Closed,
}

impl Halt {
	fn failed(component: &str, interrupt: Interrupt) -> Self {
		Halt::Failed {
			component: component.to_string(),
			interrupt,
		}
	}

	fn into_error(self) -> RenderError {
		match self {
			Halt::Failed {
				component,
				interrupt,
			} => RenderError::from_interrupt(&component, interrupt),
			Halt::Closed => RenderError::Closed,
		}
	}
}

/// A suspense body waiting to be resolved.
struct Deferred {
	slot: SlotId,
	scope: SlotScope,
	invocation: ComponentInvocation,
	body: BoxFuture<'static, Result<Page, Interrupt>>,
	/// Nearest enclosing error boundary.
	boundary: Option<ComponentInvocation>,
}

/// Output of one resolved slot.
struct Late {
	html: String,
	keys: Vec<String>,
}

/// What suspense tasks share.
#[derive(Clone)]
struct TaskEnv {
	cx: RenderContext,
	late: mpsc::UnboundedSender<Result<Late, RenderError>>,
	tasks: TaskRegistry,
}

/// Where a pass sends flushed chunks. Detached passes have none and
/// buffer everything.
struct Sink {
	tx: mpsc::Sender<Result<Bytes, RenderError>>,
	env: TaskEnv,
}

#[derive(Clone, Copy)]
struct Checkpoint {
	out: usize,
	keys: usize,
	deferred: usize,
	open: usize,
	spawned: usize,
}

/// Slot wrapping a boundary whose output was partly flushed.
struct Committed {
	slot: SlotId,
	scope: SlotScope,
	/// Index of the wrapper in the open-element stack.
	wrapper: usize,
}

/// An error boundary being rendered.
struct Frame {
	checkpoint: Checkpoint,
	scope: SlotScope,
	committed: Option<Committed>,
}

/// Buffered output of a detached pass.
struct Detached {
	html: String,
	keys: Vec<String>,
	deferred: Vec<Deferred>,
}

struct Pass {
	cx: RenderContext,
	out: String,
	keys: Vec<String>,
	deferred: Vec<Deferred>,
	/// Open error boundaries, outermost first.
	frames: Vec<Frame>,
	/// Tags of open elements, outermost first.
	open: Vec<String>,
	/// How many of `open` have their opening tag already flushed.
	flushed_open: usize,
	/// Suspense tasks spawned while a boundary was open.
	spawned: Vec<AbortHandle>,
	boundary: Option<ComponentInvocation>,
	sink: Option<Sink>,
}

impl Pass {
	fn new(cx: RenderContext, sink: Option<Sink>) -> Self {
		Self {
			cx,
			out: String::new(),
			keys: Vec::new(),
			deferred: Vec::new(),
			frames: Vec::new(),
			open: Vec::new(),
			flushed_open: 0,
			spawned: Vec::new(),
			boundary: None,
			sink,
		}
	}

	fn write<'a>(&'a mut self, page: &'a Page, scope: &'a SlotScope) -> BoxFuture<'a, Result<(), Halt>> {
		Box::pin(async move {
			match page {
				Page::Element(el) => {
					if let Some(key) = el.action_key() {
						self.keys.push(key.to_string());
					}
					el.write_open(&mut self.out);
					let tracked = !el.is_void();
					if tracked {
						self.open.push(el.tag_name().to_string());
					}
					for child in el.child_pages() {
						self.write(child, scope).await?;
					}
					el.write_close(&mut self.out);
					if tracked {
						self.pop_open();
					}
				}
				Page::Text(text) => self.out.push_str(&html_escape(text)),
				Page::RawHtml(markup) => self.out.push_str(markup),
				Page::Fragment(children) => {
					for child in children {
						self.write(child, scope).await?;
					}
				}
				Page::Empty => {}
				Page::Component(invocation) => self.write_component(invocation, scope).await?,
			}
			Ok(())
		})
	}

	async fn write_component(
		&mut self,
		invocation: &ComponentInvocation,
		scope: &SlotScope,
	) -> Result<(), Halt> {
		if !invocation.component.meta().error_boundary {
			return self.evaluate(invocation, scope).await;
		}

		let checkpoint = self.checkpoint();
		self.frames.push(Frame {
			checkpoint,
			scope: scope.clone(),
			committed: None,
		});
		let outer = self.boundary.replace(invocation.clone());
		let result = self.evaluate(invocation, scope).await;
		self.boundary = outer;
		let Some(frame) = self.frames.pop() else {
			return result;
		};

		let (component, interrupt) = match result {
			Ok(()) => {
				self.close_frame(&frame);
				return Ok(());
			}
			Err(Halt::Failed {
				component,
				interrupt: interrupt @ Interrupt::Error(_),
			}) => (component, interrupt),
			Err(halt) => return Err(halt),
		};

		let fallback = invocation
			.component
			.error(&interrupt, &invocation.props, &self.cx);
		let Some(fallback) = fallback else {
			if frame.committed.is_none() {
				self.rewind(frame.checkpoint);
			}
			return Err(Halt::Failed {
				component,
				interrupt,
			});
		};
		warn!(
			boundary = invocation.component.name(),
			component = %component,
			error = %interrupt,
			"error boundary rendered its fallback"
		);

		match &frame.committed {
			None => {
				self.rewind(frame.checkpoint);
				self.write(&fallback, scope).await?;
			}
			Some(committed) => {
				self.abandon(frame.checkpoint, committed);
				self.send_fallback(committed, &fallback).await?;
			}
		}
		self.forget_spawned();
		Ok(())
	}

	async fn evaluate(&mut self, invocation: &ComponentInvocation, scope: &SlotScope) -> Result<(), Halt> {
		let component = &invocation.component;
		let name = component.name();
		match component.render(&invocation.props, &self.cx) {
			Rendered::Ready(page) => self.write(&page, scope).await,
			Rendered::Failed(interrupt) => Err(Halt::failed(name, interrupt)),
			Rendered::Pending(body) => match component.suspense(&invocation.props, &self.cx) {
				Some(fallback) => {
					let (slot, slot_scope) = scope.allocate();
					debug!(component = name, slot = %slot, "suspense placeholder");
					self.out.push_str(&placeholder_open(&slot));
					self.open.push("div".to_string());
					self.write(&fallback, &slot_scope).await?;
					self.out.push_str("</div>");
					self.pop_open();
					self.deferred.push(Deferred {
						slot,
						scope: slot_scope,
						invocation: invocation.clone(),
						body,
						boundary: self.boundary.clone(),
					});
					self.flush().await
				}
				None => {
					let page = body.await.map_err(|i| Halt::failed(name, i))?;
					self.write(&page, scope).await
				}
			},
			Rendered::Sequence(mut items) => {
				self.out
					.push_str(&format!("<div {STREAM_ATTR}=\"{}\">", html_escape(name)));
				self.open.push("div".to_string());
				self.flush().await?;
				while let Some(item) = items.next().await {
					let page = item.map_err(|i| Halt::failed(name, i))?;
					self.write(&page, scope).await?;
					self.flush().await?;
				}
				self.out.push_str("</div>");
				self.pop_open();
				Ok(())
			}
		}
	}

	fn checkpoint(&self) -> Checkpoint {
		Checkpoint {
			out: self.out.len(),
			keys: self.keys.len(),
			deferred: self.deferred.len(),
			open: self.open.len(),
			spawned: self.spawned.len(),
		}
	}

	fn pop_open(&mut self) {
		self.open.pop();
		self.flushed_open = self.flushed_open.min(self.open.len());
	}

	/// Drops everything a boundary wrote since `checkpoint`. Only valid
	/// while nothing of it was flushed.
	fn rewind(&mut self, checkpoint: Checkpoint) {
		self.out.truncate(checkpoint.out);
		self.keys.truncate(checkpoint.keys);
		self.open.truncate(checkpoint.open);
		self.flushed_open = self.flushed_open.min(self.open.len());
		for abandoned in self.deferred.drain(checkpoint.deferred..) {
			debug!(slot = %abandoned.slot, "suspense slot abandoned by error boundary");
		}
	}

	/// Abandons a failed boundary whose output was partly flushed: drops
	/// what is still buffered, aborts its suspense tasks and closes the
	/// elements already sent, its wrapper included.
	fn abandon(&mut self, checkpoint: Checkpoint, committed: &Committed) {
		self.out.clear();
		self.keys.truncate(checkpoint.keys);
		for abandoned in self.deferred.drain(..) {
			debug!(slot = %abandoned.slot, "suspense slot abandoned by error boundary");
		}
		let from = checkpoint.spawned.min(self.spawned.len());
		for handle in self.spawned.drain(from..) {
			handle.abort();
		}

		let flushed = self.flushed_open.min(self.open.len());
		let sent = self.open.get(committed.wrapper..flushed).unwrap_or_default();
		for tag in sent.iter().rev() {
			self.out.push_str("</");
			self.out.push_str(tag);
			self.out.push('>');
		}
		self.open.truncate(committed.wrapper);
		self.flushed_open = self.flushed_open.min(self.open.len());
	}

	/// Closes the wrapper of a boundary that finished after a flush.
	fn close_frame(&mut self, frame: &Frame) {
		if let Some(committed) = &frame.committed {
			self.out.push_str("</div>");
			self.open.truncate(committed.wrapper);
			self.flushed_open = self.flushed_open.min(self.open.len());
		}
		self.forget_spawned();
	}

	fn forget_spawned(&mut self) {
		if self.frames.is_empty() {
			self.spawned.clear();
		}
	}

	/// Sends the fallback of a partly flushed boundary as the late payload
	/// of its wrapper slot.
	async fn send_fallback(&mut self, committed: &Committed, fallback: &Page) -> Result<(), Halt> {
		let Some(env) = self.sink.as_ref().map(|sink| sink.env.clone()) else {
			return Ok(());
		};
		let detached = env
			.detached(fallback, &committed.scope, self.boundary.clone())
			.await?;
		env.deliver(&committed.slot, detached);
		Ok(())
	}

	/// Wraps every open boundary that has not flushed yet in a slot, so
	/// that a later failure can still replace its output.
	fn commit_frames(&mut self) {
		let mut bytes = 0;
		let mut tags = 0;
		for frame in self.frames.iter_mut().filter(|frame| frame.committed.is_none()) {
			let (slot, scope) = frame.scope.allocate();
			let marker = placeholder_open(&slot);
			self.out.insert_str(frame.checkpoint.out + bytes, &marker);
			bytes += marker.len();
			let wrapper = frame.checkpoint.open + tags;
			self.open.insert(wrapper, "div".to_string());
			tags += 1;
			debug!(slot = %slot, "error boundary streams inside a slot");
			frame.committed = Some(Committed {
				slot,
				scope,
				wrapper,
			});
		}
	}

	/// Spawns queued suspense tasks.
	fn release(&mut self) {
		let Some(sink) = &self.sink else {
			return;
		};
		let track = !self.frames.is_empty();
		for deferred in self.deferred.drain(..) {
			let handle = sink.env.spawn(deferred);
			if track {
				self.spawned.push(handle);
			}
		}
	}

	async fn flush(&mut self) -> Result<(), Halt> {
		if self.sink.is_none() {
			return Ok(());
		}
		self.commit_frames();
		self.release();
		self.flushed_open = self.open.len();
		if self.out.is_empty() {
			return Ok(());
		}
		let chunk = Bytes::from(std::mem::take(&mut self.out));
		let Some(sink) = &self.sink else {
			return Ok(());
		};
		sink.tx.send(Ok(chunk)).await.map_err(|_| Halt::Closed)
	}

	fn into_detached(self) -> Detached {
		Detached {
			html: self.out,
			keys: self.keys,
			deferred: self.deferred,
		}
	}
}

impl TaskEnv {
	fn spawn(&self, deferred: Deferred) -> AbortHandle {
		let env = self.clone();
		self.tasks.spawn(env.resolve(deferred))
	}

	/// Sends resolved content for `slot`, then starts the slots it holds.
	fn deliver(&self, slot: &SlotId, detached: Detached) {
		let late = Late {
			html: success_payload(slot, &detached.html),
			keys: detached.keys,
		};
		if self.late.send(Ok(late)).is_ok() {
			for child in detached.deferred {
				self.spawn(child);
			}
		}
	}

	async fn resolve(self, deferred: Deferred) {
		let Deferred {
			slot,
			scope,
			invocation,
			body,
			boundary,
		} = deferred;
		let name = invocation.component.name().to_string();

		let outcome = match body.await {
			Ok(page) => self.detached(&page, &scope, boundary.clone()).await,
			Err(interrupt) => Err(Halt::failed(&name, interrupt)),
		};
		let outcome = match outcome {
			Err(Halt::Failed {
				component,
				interrupt: interrupt @ Interrupt::Error(_),
			}) => {
				self.recover(&slot, &scope, &invocation, boundary, component, interrupt)
					.await
			}
			other => other,
		};

		match outcome {
			Ok(detached) => {
				debug!(component = %name, slot = %slot, "suspense slot resolved");
				self.deliver(&slot, detached);
			}
			Err(Halt::Failed {
				interrupt: Interrupt::Signal(ControlSignal::Navigate(url)),
				..
			}) => {
				debug!(component = %name, slot = %slot, url = %url, "suspense slot navigates");
				let late = Late {
					html: navigate_payload(&slot, &url),
					keys: Vec::new(),
				};
				let _ = self.late.send(Ok(late));
			}
			Err(Halt::Closed) => {}
			Err(halt) => {
				let _ = self.late.send(Err(halt.into_error()));
			}
		}
	}

	async fn detached(
		&self,
		page: &Page,
		scope: &SlotScope,
		boundary: Option<ComponentInvocation>,
	) -> Result<Detached, Halt> {
		let mut pass = Pass::new(self.cx.clone(), None);
		pass.boundary = boundary;
		pass.write(page, scope).await?;
		Ok(pass.into_detached())
	}

	/// Error fallback for a failed slot: the component's own, else the
	/// nearest enclosing boundary's.
	async fn recover(
		&self,
		slot: &SlotId,
		scope: &SlotScope,
		invocation: &ComponentInvocation,
		boundary: Option<ComponentInvocation>,
		component: String,
		interrupt: Interrupt,
	) -> Result<Detached, Halt> {
		let own = invocation
			.component
			.meta()
			.error_boundary
			.then(|| invocation.component.error(&interrupt, &invocation.props, &self.cx))
			.flatten();
		let (fallback, outer) = match own {
			Some(page) => (Some(page), boundary),
			None => (
				boundary.as_ref().and_then(|b| b.component.error(&interrupt, &b.props, &self.cx)),
				None,
			),
		};
		let Some(fallback) = fallback else {
			return Err(Halt::Failed {
				component,
				interrupt,
			});
		};
		warn!(slot = %slot, component = %component, error = %interrupt, "suspense slot rendered an error fallback");
		self.detached(&fallback, scope, outer).await
	}
}

async fn drive(
	root: Page,
	cx: RenderContext,
	options: SsrOptions,
	tx: mpsc::Sender<Result<Bytes, RenderError>>,
	tasks: TaskRegistry,
) {
	let (late_tx, mut late_rx) = mpsc::unbounded_channel();
	let env = TaskEnv {
		cx: cx.clone(),
		late: late_tx,
		tasks: tasks.clone(),
	};
	let mut pass = Pass::new(
		cx.clone(),
		Some(Sink {
			tx: tx.clone(),
			env,
		}),
	);

	if let Some(shell) = &options.shell {
		pass.out.push_str(&shell.open());
	}
	let mut result = pass.write(&root, &SlotScope::root()).await;
	if result.is_ok() {
		if let Some(shell) = &options.shell {
			pass.out.push_str(shell.close_root());
		}
		result = pass.flush().await;
	}
	if let Err(halt) = result {
		fail(&tx, halt.into_error(), &tasks).await;
		return;
	}

	let mut used_keys: IndexSet<String> = pass.keys.drain(..).collect();
	// Releases the driver's handle on the late channel.
	drop(pass);

	loop {
		let late = tokio::select! {
			_ = tx.closed() => {
				debug!("render consumer went away");
				tasks.abort_all();
				return;
			}
			late = late_rx.recv() => late,
		};
		match late {
			None => break,
			Some(Ok(late)) => {
				used_keys.extend(late.keys);
				if tx.send(Ok(Bytes::from(late.html))).await.is_err() {
					tasks.abort_all();
					return;
				}
			}
			Some(Err(error)) => {
				fail(&tx, error, &tasks).await;
				return;
			}
		}
	}

	match options.tail(&used_keys, &cx) {
		Ok(tail) if tail.is_empty() => {}
		Ok(tail) => {
			let _ = tx.send(Ok(Bytes::from(tail))).await;
		}
		Err(error) => fail(&tx, error, &tasks).await,
	}
}

async fn fail(tx: &mpsc::Sender<Result<Bytes, RenderError>>, error: RenderError, tasks: &TaskRegistry) {
	match &error {
		RenderError::Closed => debug!("render consumer went away"),
		RenderError::Signal(signal) => debug!(signal = %signal, "control signal ended the render"),
		other => error!(error = %other, "render failed"),
	}
	if !matches!(error, RenderError::Closed) {
		let _ = tx.send(Err(error)).await;
	}
	tasks.abort_all();
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::actions::binding::ActionBinding;
	use crate::component::{FnComponent, Props};
	use crate::context::RouteMatch;
	use crate::signal::navigate;
	use rstest::{fixture, rstest};
	use std::time::Duration;

	#[fixture]
	fn cx() -> RenderContext {
		RenderContext::builder(RouteMatch::new("/")).build()
	}

	fn delayed(name: &'static str, millis: u64, text: &'static str) -> Page {
		let component = FnComponent::new(name, move |_, _| {
			Rendered::pending(async move {
				tokio::time::sleep(Duration::from_millis(millis)).await;
				Ok(Page::text(text))
			})
		})
		.suspense(|_, _| Page::text("…"));
		Page::component(component, Props::new())
	}

	async fn render(page: Page, cx: RenderContext) -> Result<String, RenderError> {
		StreamingRenderer::default().render_to_string(page, cx).await
	}

	#[rstest]
	#[tokio::test]
	async fn test_static_tree_single_pass(cx: RenderContext) {
		// Arrange
		let page = Page::element("ul")
			.child(Page::element("li").child("a & b"))
			.child(Page::element("input").attr("disabled", "false"))
			.into();

		// Act
		let html = render(page, cx).await.unwrap();

		// Assert
		assert_eq!(html, "<ul><li>a &amp; b</li><input></ul>");
	}

	#[rstest]
	#[tokio::test(start_paused = true)]
	async fn test_placeholder_then_payload(cx: RenderContext) {
		// Arrange
		let page = Page::element("main").child(delayed("Slow", 5, "done")).into();

		// Act
		let html = render(page, cx).await.unwrap();

		// Assert
		assert_eq!(
			html,
			"<main><div id=\"pending:1\">…</div></main><template id=\"success:1\">done</template><script type=\"application/weir-resume\" id=\"resume:1\"></script>"
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_pending_without_fallback_blocks_inline(cx: RenderContext) {
		// Arrange
		let blocking = FnComponent::new("Blocking", |_, _| {
			Rendered::pending(async { Ok(Page::text("inline")) })
		});
		let page = Page::fragment([Page::component(blocking, Props::new()), Page::text("!")]);

		// Act
		let html = render(page, cx).await.unwrap();

		// Assert
		assert_eq!(html, "inline!");
	}

	#[rstest]
	#[tokio::test(start_paused = true)]
	async fn test_nested_slot_ids_follow_tree(cx: RenderContext) {
		// Arrange
		let inner = delayed("Inner", 1, "inner");
		let outer = FnComponent::new("Outer", move |_, _| {
			let inner = inner.clone();
			Rendered::pending(async move { Ok(Page::element("section").child(inner).into()) })
		})
		.suspense(|_, _| Page::text("outer…"));
		let page = Page::fragment([Page::component(outer, Props::new()), delayed("Sibling", 1, "s")]);

		// Act
		let html = render(page, cx).await.unwrap();

		// Assert
		assert!(html.starts_with("<div id=\"pending:1\">outer…</div><div id=\"pending:2\">…</div>"));
		assert!(html.contains("<template id=\"success:1\"><section><div id=\"pending:1.1\">…</div></section></template>"));
		assert!(html.contains("<template id=\"success:1.1\">inner</template>"));
		let parent = html.find("resume:1\"").unwrap();
		let child = html.find("success:1.1").unwrap();
		assert!(parent < child);
	}

	#[rstest]
	#[tokio::test]
	async fn test_error_boundary_discards_partial_output(cx: RenderContext) {
		// Arrange
		let failing = FnComponent::new("Failing", |_, _| Rendered::Failed(Interrupt::error("boom")));
		let boundary = FnComponent::new("Boundary", move |_, _| {
			Page::element("div")
				.child("partial")
				.child(Page::component(failing.clone(), Props::new()))
				.into()
		})
		.on_error(|error, _, _| Page::text(format!("caught: {error}")));
		let page = Page::fragment([Page::text("["), Page::component(boundary, Props::new()), Page::text("]")]);

		// Act
		let html = render(page, cx).await.unwrap();

		// Assert
		assert_eq!(html, "[caught: boom]");
	}

	#[rstest]
	#[tokio::test(start_paused = true)]
	async fn test_boundary_failure_after_flush_replaces_its_slot(cx: RenderContext) {
		// Arrange
		let failing = FnComponent::new("Failing", |_, _| Rendered::Failed(Interrupt::error("boom")));
		let boundary = FnComponent::new("Boundary", move |_, _| {
			Page::element("div")
				.child("partial")
				.child(delayed("Queued", 50, "never"))
				.child(Page::component(failing.clone(), Props::new()))
				.into()
		})
		.on_error(|error, _, _| Page::text(format!("caught: {error}")));
		let page = Page::fragment([Page::text("["), Page::component(boundary, Props::new()), Page::text("]")]);

		// Act
		let html = render(page, cx).await.unwrap();

		// Assert
		assert_eq!(
			html,
			"[<div id=\"pending:2\"><div>partial<div id=\"pending:1\">…</div></div></div>]<template id=\"success:2\">caught: boom</template><script type=\"application/weir-resume\" id=\"resume:2\"></script>"
		);
		let mut dom = crate::client::parse::parse_html(&html).unwrap();
		crate::client::suspense::resolve_suspense(&mut dom);
		assert_eq!(dom.to_html(), "[caught: boom]");
	}

	#[rstest]
	#[tokio::test(start_paused = true)]
	async fn test_sequence_streams_inside_error_boundary(cx: RenderContext) {
		// Arrange
		let feed = FnComponent::new("Feed", |_, _| {
			Rendered::sequence(futures::stream::iter(["A", "B", "C"]).then(|item| async move {
				tokio::time::sleep(Duration::from_millis(100)).await;
				Ok(Page::element("p").child(item).into())
			}))
		});
		let layout = FnComponent::new("Layout", move |_, _| {
			Page::element("main")
				.child(Page::component(feed.clone(), Props::new()))
				.into()
		})
		.on_error(|_, _, _| Page::text("layout failed"));

		// Act
		let mut stream = StreamingRenderer::default().render(Page::component(layout, Props::new()), cx);
		let mut chunks = Vec::new();
		while let Some(chunk) = stream.next().await {
			chunks.push(String::from_utf8(chunk.unwrap().to_vec()).unwrap());
		}

		// Assert
		assert_eq!(
			chunks,
			[
				"<div id=\"pending:1\"><main><div data-weir-stream=\"Feed\">",
				"<p>A</p>",
				"<p>B</p>",
				"<p>C</p>",
				"</div></main></div>"
			]
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_signals_pass_through_boundaries(cx: RenderContext) {
		// Arrange
		let redirecting = FnComponent::new("Redirecting", |_, _| Rendered::Failed(navigate("/login")));
		let boundary = FnComponent::new("Boundary", move |_, _| {
			Page::component(redirecting.clone(), Props::new()).into()
		})
		.on_error(|_, _, _| Page::text("caught"));

		// Act
		let result = render(Page::component(boundary, Props::new()), cx).await;

		// Assert
		assert!(matches!(
			result,
			Err(RenderError::Signal(ControlSignal::Navigate(url))) if url == "/login"
		));
	}

	#[rstest]
	#[tokio::test]
	async fn test_deferred_rejection_uses_own_fallback(cx: RenderContext) {
		// Arrange
		let flaky = FnComponent::new("Flaky", |_, _| {
			Rendered::pending(async { Err(Interrupt::error("timeout")) })
		})
		.suspense(|_, _| Page::text("…"))
		.on_error(|error, _, _| Page::text(format!("failed: {error}")));

		// Act
		let html = render(Page::component(flaky, Props::new()), cx).await.unwrap();

		// Assert
		assert!(html.contains("<template id=\"success:1\">failed: timeout</template>"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_deferred_rejection_inherits_enclosing_boundary(cx: RenderContext) {
		// Arrange
		let flaky = FnComponent::new("Flaky", |_, _| {
			Rendered::pending(async { Err(Interrupt::error("timeout")) })
		})
		.suspense(|_, _| Page::text("…"));
		let boundary = FnComponent::new("Boundary", move |_, _| {
			Page::component(flaky.clone(), Props::new()).into()
		})
		.on_error(|_, _, _| Page::text("section unavailable"));

		// Act
		let html = render(Page::component(boundary, Props::new()), cx).await.unwrap();

		// Assert
		assert!(html.starts_with("<div id=\"pending:2\"><div id=\"pending:1\">…</div></div>"));
		assert!(html.contains("<template id=\"success:1\">section unavailable</template>"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_unhandled_deferred_rejection_fails_stream(cx: RenderContext) {
		// Arrange
		let flaky = FnComponent::new("Flaky", |_, _| {
			Rendered::pending(async { Err(Interrupt::error("boom")) })
		})
		.suspense(|_, _| Page::text("…"));

		// Act
		let mut stream = StreamingRenderer::default().render(Page::component(flaky, Props::new()), cx);
		let first = stream.next().await.unwrap();
		let second = stream.next().await.unwrap();

		// Assert
		assert_eq!(first.unwrap(), Bytes::from_static("<div id=\"pending:1\">…</div>".as_bytes()));
		assert!(matches!(second, Err(RenderError::Component { message, .. }) if message == "boom"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_deferred_navigate_emits_marker(cx: RenderContext) {
		// Arrange
		let guarded = FnComponent::new("Guarded", |_, _| {
			Rendered::pending(async { Err(navigate("/login")) })
		})
		.suspense(|_, _| Page::text("…"));

		// Act
		let html = render(Page::component(guarded, Props::new()), cx).await.unwrap();

		// Assert
		assert!(html.ends_with(
			"<script type=\"application/weir-resume\" id=\"resume:1\" data-navigate=\"/login\"></script>"
		));
	}

	#[rstest]
	#[tokio::test(start_paused = true)]
	async fn test_sequence_items_flushed_in_order(cx: RenderContext) {
		// Arrange
		let feed = FnComponent::new("Feed", |_, _| {
			let delays = [(30u64, "A"), (1, "B"), (10, "C")];
			Rendered::sequence(futures::stream::iter(delays).then(|(millis, item)| async move {
				tokio::time::sleep(Duration::from_millis(millis)).await;
				Ok(Page::element("p").child(item).into())
			}))
		});

		// Act
		let mut stream = StreamingRenderer::default().render(Page::component(feed, Props::new()), cx);
		let mut chunks = Vec::new();
		while let Some(chunk) = stream.next().await {
			chunks.push(String::from_utf8(chunk.unwrap().to_vec()).unwrap());
		}

		// Assert
		assert_eq!(
			chunks,
			[
				"<div data-weir-stream=\"Feed\">",
				"<p>A</p>",
				"<p>B</p>",
				"<p>C</p>",
				"</div>"
			]
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_document_embeds_used_bindings_and_store(cx: RenderContext) {
		// Arrange
		let bindings = BindingTable::new()
			.bind("add", ActionBinding::new("click", "cart.add"))
			.bind("unused", ActionBinding::new("click", "other"));
		let options = SsrOptions::new()
			.document(DocumentShell::new())
			.bindings(Arc::new(bindings));
		cx.set("theme", "dark");
		cx.transfer_to_client(&["theme"]);
		let page = Page::element("button").action("add").child("+").into();

		// Act
		let html = StreamingRenderer::new(options)
			.render_to_string(page, cx)
			.await
			.unwrap();

		// Assert
		assert!(html.contains("<div id=\"app\"><button data-action=\"add\">+</button></div>"));
		assert!(html.contains(r#"id="weir-actions">{"add":[{"event":"click","actionId":"cart.add"}]}</script>"#));
		assert!(html.contains(r#"id="weir-store">[["theme","dark"]]</script>"#));
		assert!(!html.contains("unused"));
		assert!(html.ends_with("</html>"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_dropping_stream_aborts_slow_slot(cx: RenderContext) {
		// Arrange
		let (done_tx, mut done_rx) = mpsc::unbounded_channel::<()>();
		let never = FnComponent::new("Never", move |_, _| {
			let done_tx = done_tx.clone();
			Rendered::pending(async move {
				tokio::time::sleep(Duration::from_secs(30)).await;
				let _ = done_tx.send(());
				Ok(Page::empty())
			})
		})
		.suspense(|_, _| Page::text("…"));
		let mut stream = StreamingRenderer::default().render(Page::component(never, Props::new()), cx);

		// Act
		let first = stream.next().await;
		drop(stream);

		// Assert
		assert!(first.is_some());
		let finished = tokio::time::timeout(Duration::from_millis(50), done_rx.recv()).await;
		assert!(matches!(finished, Ok(None)));
	}
}
