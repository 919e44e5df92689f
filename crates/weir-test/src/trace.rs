//! Ordered event log shared between test code and actions.

use std::sync::Arc;

use parking_lot::Mutex;

/// Append-only log. Clones share the same entries.
///
/// ```
/// use weir_test::TraceLog;
///
/// let trace = TraceLog::new();
/// let inner = trace.clone();
/// inner.push("a:start");
/// trace.push("a:end");
/// assert_eq!(trace.entries(), ["a:start", "a:end"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TraceLog {
	entries: Arc<Mutex<Vec<String>>>,
}

impl TraceLog {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&self, entry: impl Into<String>) {
		self.entries.lock().push(entry.into());
	}

	pub fn entries(&self) -> Vec<String> {
		self.entries.lock().clone()
	}

	/// Position of the first entry equal to `entry`.
	pub fn position(&self, entry: &str) -> Option<usize> {
		self.entries.lock().iter().position(|e| e == entry)
	}

	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}

	pub fn clear(&self) {
		self.entries.lock().clear();
	}
}
