//! Server actions.
//!
//! An action is a server-side function bound to an element event at
//! compile time ([`binding`]). The client posts a [`DispatchPayload`] for
//! each trigger; the server resolves it with an [`ActionResolver`] and
//! answers with a navigation object, a re-rendered fragment, or a bare
//! status.
//!
//! Actions may call other actions listed in the payload's nested ids.
//! Those calls start when invoked; the caller joins them through
//! [`ActionContext::wait_action_call_promises`].

pub mod binding;
pub mod payload;
pub mod record;
#[cfg(not(target_arch = "wasm32"))]
pub mod registry;
#[cfg(not(target_arch = "wasm32"))]
pub mod resolver;

/// Response header naming the scope of a re-render: `page` or `component`.
pub const RERENDER_HEADER: &str = "x-weir-rerender";
/// Response header naming how a re-render is applied.
pub const RENDER_MODE_HEADER: &str = "x-weir-render-mode";

pub use binding::{ACTION_ATTR, ActionBinding, BINDINGS_SCRIPT_ID, BindingTable};
pub use payload::{
	ACTION_HEADER, DispatchPayload, INDICATOR_HEADER, NESTED_ACTIONS_HEADER, PayloadError,
	form_data_value, submit_event,
};
pub use record::{ActionCallRecord, ActionState};

#[cfg(not(target_arch = "wasm32"))]
pub use payload::ActionRequest;
#[cfg(not(target_arch = "wasm32"))]
pub use registry::{
	ActionDef, ActionFuture, ActionHandler, ActionRegistry, ActionResult, ActionRoute,
};
#[cfg(not(target_arch = "wasm32"))]
pub use resolver::{ActionContext, ActionError, ActionResolver, Resolution, Resolved};
