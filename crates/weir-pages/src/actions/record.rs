//! Per-request bookkeeping of an action call.

use std::fmt;

/// Lifecycle of one inbound action call.
///
/// `Received -> StoreHydrated -> Executing -> (AwaitingNested)* -> Resolved -> Responded`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
	Received,
	StoreHydrated,
	Executing,
	AwaitingNested,
	Resolved,
	Responded,
}

impl ActionState {
	pub fn as_str(self) -> &'static str {
		match self {
			ActionState::Received => "RECEIVED",
			ActionState::StoreHydrated => "STORE_HYDRATED",
			ActionState::Executing => "EXECUTING",
			ActionState::AwaitingNested => "AWAITING_NESTED",
			ActionState::Resolved => "RESOLVED",
			ActionState::Responded => "RESPONDED",
		}
	}

	/// Whether `next` may follow `self`.
	pub fn can_advance_to(self, next: ActionState) -> bool {
		use ActionState::*;
		matches!(
			(self, next),
			(Received, StoreHydrated)
				| (StoreHydrated, Executing)
				| (Executing, AwaitingNested)
				| (AwaitingNested, AwaitingNested)
				| (AwaitingNested, Executing)
				| (AwaitingNested, Resolved)
				| (Executing, Resolved)
				| (Resolved, Responded)
		)
	}
}

impl fmt::Display for ActionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// What the server knows about the call being handled. Lives for one
/// request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCallRecord {
	pub action_id: String,
	/// First action of the chain; equal to `action_id` for the initiator.
	pub original_action_id: String,
	/// Nested actions run so far, each listed once, in first-run order.
	pub awaited: Vec<String>,
	pub is_form_data: bool,
	pub state: ActionState,
	/// Every state entered, in order.
	pub history: Vec<ActionState>,
}

impl ActionCallRecord {
	pub fn new(action_id: impl Into<String>, is_form_data: bool) -> Self {
		let action_id = action_id.into();
		Self {
			original_action_id: action_id.clone(),
			action_id,
			awaited: Vec::new(),
			is_form_data,
			state: ActionState::Received,
			history: vec![ActionState::Received],
		}
	}

	/// Moves to `next`. Returns `false`, leaving the record untouched, when
	/// the transition is not part of the lifecycle.
	pub fn advance(&mut self, next: ActionState) -> bool {
		if !self.state.can_advance_to(next) {
			return false;
		}
		self.state = next;
		self.history.push(next);
		true
	}

	pub(crate) fn note_awaited(&mut self, action_id: &str) {
		if !self.awaited.iter().any(|id| id == action_id) {
			self.awaited.push(action_id.to_string());
		}
	}
}
