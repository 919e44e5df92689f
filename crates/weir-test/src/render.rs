//! Render helpers.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use weir_pages::client::{MemoryDom, SuspenseReport, parse_html, resolve_suspense};
use weir_pages::component::Page;
use weir_pages::context::RenderContext;
use weir_pages::signal::RenderError;
use weir_pages::ssr::StreamingRenderer;

/// Drains a chunk stream, keeping chunk boundaries.
///
/// Stops at the first error and returns it.
pub async fn collect_stream<S, E>(mut stream: S) -> Result<Vec<String>, E>
where
	S: Stream<Item = Result<Bytes, E>> + Unpin,
{
	let mut chunks = Vec::new();
	while let Some(chunk) = stream.next().await {
		chunks.push(String::from_utf8_lossy(&chunk?).into_owned());
	}
	Ok(chunks)
}

/// Renders `root` to a single string.
pub async fn render_to_string(
	renderer: &StreamingRenderer,
	root: Page,
	cx: RenderContext,
) -> Result<String, RenderError> {
	renderer.render_to_string(root, cx).await
}

/// Renders `root`, parses the output and applies every suspense payload,
/// the way a browser with the client runtime would see it.
///
/// # Panics
///
/// Panics when the render fails or the output is not parseable markup.
pub async fn render_to_dom(
	renderer: &StreamingRenderer,
	root: Page,
	cx: RenderContext,
) -> (MemoryDom, SuspenseReport) {
	let html = renderer
		.render_to_string(root, cx)
		.await
		.unwrap_or_else(|err| panic!("render_to_dom: render failed: {err}"));
	let mut dom =
		parse_html(&html).unwrap_or_else(|err| panic!("render_to_dom: unparseable output: {err}"));
	let report = resolve_suspense(&mut dom);
	(dom, report)
}
