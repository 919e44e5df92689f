//! Control signals and render failures.
//!
//! Component and action bodies return `Result<_, Interrupt>`. An
//! [`Interrupt`] is either an expected [`ControlSignal`] (navigate,
//! rerender, not found) or a user error. Signals pass through error
//! boundaries untouched and are converted into responses only at the
//! request boundary; user errors are what error fallbacks catch.
//!
//! ```
//! use weir_pages::signal::{Interrupt, navigate};
//!
//! fn checkout(logged_in: bool) -> Result<(), Interrupt> {
//!     if !logged_in {
//!         return Err(navigate("/login"));
//!     }
//!     Ok(())
//! }
//! assert!(checkout(false).unwrap_err().is_signal());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Part of the page re-rendered after an action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderScope {
	/// The component owning the action.
	#[default]
	Component,
	/// The whole page of the current route.
	Page,
}

/// How the client applies re-rendered markup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
	#[default]
	Reactivity,
	Transition,
}

impl RenderScope {
	pub fn as_str(self) -> &'static str {
		match self {
			RenderScope::Component => "component",
			RenderScope::Page => "page",
		}
	}
}

impl RenderMode {
	pub fn as_str(self) -> &'static str {
		match self {
			RenderMode::Reactivity => "reactivity",
			RenderMode::Transition => "transition",
		}
	}
}

/// Expected, non-failure control flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlSignal {
	Navigate(String),
	Rerender { scope: RenderScope, mode: RenderMode },
	NotFound,
}

impl fmt::Display for ControlSignal {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ControlSignal::Navigate(url) => write!(f, "navigate to {url}"),
			ControlSignal::Rerender { scope, mode } => {
				write!(f, "rerender {} ({})", scope.as_str(), mode.as_str())
			}
			ControlSignal::NotFound => f.write_str("not found"),
		}
	}
}

/// Early exit from a component or action body.
///
/// Deliberately not a `std::error::Error`, so that any error type converts
/// into it through `?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interrupt {
	Signal(ControlSignal),
	Error(String),
}

impl Interrupt {
	pub fn error(message: impl Into<String>) -> Self {
		Self::Error(message.into())
	}

	pub fn is_signal(&self) -> bool {
		matches!(self, Interrupt::Signal(_))
	}

	pub fn signal(&self) -> Option<&ControlSignal> {
		match self {
			Interrupt::Signal(signal) => Some(signal),
			Interrupt::Error(_) => None,
		}
	}
}

impl fmt::Display for Interrupt {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Interrupt::Signal(signal) => signal.fmt(f),
			Interrupt::Error(message) => f.write_str(message),
		}
	}
}

impl<E: std::error::Error> From<E> for Interrupt {
	fn from(error: E) -> Self {
		Interrupt::Error(error.to_string())
	}
}

/// Stops the body and sends the client to `url`.
pub fn navigate(url: impl Into<String>) -> Interrupt {
	Interrupt::Signal(ControlSignal::Navigate(url.into()))
}

/// Stops the body and re-renders `scope`.
pub fn rerender(scope: RenderScope, mode: RenderMode) -> Interrupt {
	Interrupt::Signal(ControlSignal::Rerender { scope, mode })
}

/// Stops the body with a 404.
pub fn not_found() -> Interrupt {
	Interrupt::Signal(ControlSignal::NotFound)
}

/// Failure of a render pass as a whole.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderError {
	/// A component failed and no error boundary caught it.
	#[error("component `{component}` failed: {message}")]
	Component { component: String, message: String },

	/// A control signal reached the top of the render.
	#[error("{0} was raised during rendering")]
	Signal(ControlSignal),

	/// Client store or binding table could not be embedded.
	#[error("could not embed document data: {0}")]
	Embed(String),

	/// The consumer of the stream went away.
	#[error("render output closed")]
	Closed,
}

impl RenderError {
	pub(crate) fn from_interrupt(component: &str, interrupt: Interrupt) -> Self {
		match interrupt {
			Interrupt::Signal(signal) => RenderError::Signal(signal),
			Interrupt::Error(message) => RenderError::Component {
				component: component.to_string(),
				message,
			},
		}
	}
}
