//! Server-side streaming rendering.
//!
//! - [`renderer`]: the streaming render pass and its suspense tasks
//! - [`markers`]: suspense slot ids and their wire markers
//! - [`document`]: the HTML document shell

pub mod document;
pub mod markers;
#[cfg(not(target_arch = "wasm32"))]
pub mod renderer;

pub use document::{DocumentShell, STORE_SCRIPT_ID, escape_json_for_script};
pub use markers::{
	NAVIGATE_ATTR, PENDING_PREFIX, RESUME_PREFIX, RESUME_SCRIPT_TYPE, STREAM_ATTR, SUCCESS_PREFIX,
	SlotId,
};
#[cfg(not(target_arch = "wasm32"))]
pub use renderer::{RenderStream, SsrOptions, StreamingRenderer};
