//! Client runtime.
//!
//! - [`dom`]: the document abstraction and an in-memory document
//! - [`parse`]: markup to in-memory document
//! - [`dispatch`]: action registration, debouncing and dispatch
//! - [`event`]: event argument serialization
//! - [`suspense`]: swapping resolved suspense payloads into place
//! - [`http`]: posting actions and interpreting replies
//! - `web` (wasm32 only): the browser host
//!
//! Everything except `web` runs natively, which is how it is tested.

pub mod dispatch;
pub mod dom;
pub mod event;
pub mod http;
pub mod parse;
pub mod suspense;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use dispatch::{ActionRuntime, DispatchCall, Dispatcher, Scheduler, TimerId, VirtualClock};
pub use dom::{DomHost, Listener, MemoryDom, NodeId, NodeKind};
pub use event::{ArgValue, EventArg, TargetInfo};
pub use http::{ActionClient, ActionOutcome, ClientStore, DEFAULT_ACTION_ENDPOINT, interpret_response};
pub use parse::{ParseError, parse_html, parse_into};
pub use suspense::{SuspenseReport, resolve_suspense, sort_deepest_first};

/// Errors raised by the client runtime.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
	#[error("invalid embedded JSON: {0}")]
	Json(#[from] serde_json::Error),

	#[error("action request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error(transparent)]
	Parse(#[from] ParseError),

	#[error("invalid store manifest: {0}")]
	Store(String),

	#[error("browser call failed: {0}")]
	Js(String),
}
