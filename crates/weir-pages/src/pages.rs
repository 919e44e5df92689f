//! Request-level entry points.
//!
//! [`Pages`] turns a page tree into an HTTP reply and an action request
//! into an action reply. This is the only place render and action
//! failures become status codes.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream;
use tracing::{debug, error};
use weir_conf::PagesSettings;
use weir_http::{BoxError, HttpBody, Reply, Request, Response, StreamBody, StreamingResponse};

use crate::actions::binding::BindingTable;
use crate::actions::payload::ActionRequest;
use crate::actions::registry::ActionRegistry;
use crate::actions::resolver::{ActionError, ActionResolver};
use crate::component::Page;
use crate::context::RenderContext;
use crate::signal::{ControlSignal, RenderError};
use crate::ssr::{DocumentShell, SsrOptions, StreamingRenderer};

const HTML: &str = "text/html; charset=utf-8";

/// Renders pages and handles action calls for one application.
#[derive(Debug, Clone)]
pub struct Pages {
	renderer: StreamingRenderer,
	resolver: ActionResolver,
	debug: bool,
	max_action_body_bytes: usize,
}

impl Pages {
	pub fn new(registry: ActionRegistry, settings: &PagesSettings) -> Self {
		Self {
			renderer: StreamingRenderer::new(SsrOptions::from_settings(settings)),
			resolver: ActionResolver::from_settings(Arc::new(registry), settings),
			debug: settings.debug,
			max_action_body_bytes: settings.max_action_body_bytes,
		}
	}

	/// Binding table embedded (by subset) in rendered documents and
	/// re-rendered fragments.
	pub fn bindings(mut self, table: BindingTable) -> Self {
		let table = Arc::new(table);
		self.renderer = StreamingRenderer::new(self.renderer.options().clone().bindings(table.clone()));
		let fragments = self.renderer.options().clone().fragment().bindings(table);
		self.resolver = self.resolver.renderer(StreamingRenderer::new(fragments));
		self
	}

	/// Replaces the document shell, e.g. to set a title or head markup.
	pub fn document(mut self, shell: DocumentShell) -> Self {
		self.renderer = StreamingRenderer::new(self.renderer.options().clone().document(shell));
		self
	}

	pub fn renderer(&self) -> &StreamingRenderer {
		&self.renderer
	}

	pub fn resolver(&self) -> &ActionResolver {
		&self.resolver
	}

	/// Renders `root` as a streamed document.
	///
	/// The reply is decided by the first chunk: a failure or control signal
	/// raised before anything was flushed becomes a plain status reply;
	/// otherwise the document streams, and a later failure aborts the body.
	pub async fn render_page(&self, root: Page, cx: RenderContext) -> Reply {
		let mut stream = self.renderer.render(root, cx);
		let first = match stream.next().await {
			Some(Ok(first)) => first,
			Some(Err(error)) => return self.render_failure(error),
			None => return Reply::Full(Response::ok().with_content_type(HTML)),
		};

		let body: StreamBody = Box::pin(
			stream::once(async move { Ok(first) })
				.chain(stream)
				.map(|chunk| chunk.map_err(|e| -> BoxError { Box::new(e) })),
		);
		Reply::Streaming(StreamingResponse::new(body).media_type(HTML))
	}

	fn render_failure(&self, error: RenderError) -> Reply {
		let response = match error {
			RenderError::Signal(ControlSignal::Navigate(url)) => {
				debug!(url = %url, "page render redirected");
				Response::found(&url)
			}
			RenderError::Signal(ControlSignal::NotFound) => {
				debug!("page render raised not found");
				Response::not_found()
			}
			error => {
				error!(error = %error, "page render failed");
				let response = Response::internal_server_error();
				if self.debug {
					response.with_body(error.to_string())
				} else {
					response
				}
			}
		};
		Reply::Full(response)
	}

	/// Reads an incoming action request and resolves it. The body is read
	/// up to the configured limit; a larger one is refused with 413
	/// without being buffered.
	pub async fn serve_action<B>(&self, request: http::Request<B>, cx: RenderContext) -> Reply
	where
		B: HttpBody,
		B::Error: Into<BoxError>,
	{
		match ActionRequest::read(request, self.max_action_body_bytes).await {
			Ok(action) => self.resolver.handle(action, cx).await,
			Err(error) => self.resolver.reject(&ActionError::Payload(error)),
		}
	}

	/// Resolves an action request whose body is already buffered.
	pub async fn handle_action(&self, request: &Request, cx: RenderContext) -> Reply {
		match ActionRequest::from_request(request, self.max_action_body_bytes) {
			Ok(action) => self.resolver.handle(action, cx).await,
			Err(error) => self.resolver.reject(&ActionError::Payload(error)),
		}
	}
}
