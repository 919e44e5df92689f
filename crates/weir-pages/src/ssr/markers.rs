//! Suspense slot ids and their wire markers.
//!
//! Slot ids are dotted paths assigned in depth-first order: siblings
//! increment the last segment, nesting appends a segment (`1`, `1.1`,
//! `1.2`, `1.2.1`). A boundary's fallback and its deferred content share
//! one child counter, so ids never collide between the two.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::component::html_escape;

/// Prefix of the placeholder element id.
pub const PENDING_PREFIX: &str = "pending:";
/// Prefix of the success payload container id.
pub const SUCCESS_PREFIX: &str = "success:";
/// Prefix of the resume instruction id.
pub const RESUME_PREFIX: &str = "resume:";
/// Script type of resume instructions.
pub const RESUME_SCRIPT_TYPE: &str = "application/weir-resume";
/// Attribute on a resume instruction carrying a navigation target.
pub const NAVIGATE_ATTR: &str = "data-navigate";
/// Attribute marking a streaming-sequence container.
pub const STREAM_ATTR: &str = "data-weir-stream";

/// Dotted-path id of a suspense slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(Vec<u32>);

impl SlotId {
	/// Parses `1.2.3`. Empty or non-numeric segments are rejected.
	pub fn parse(raw: &str) -> Option<Self> {
		let segments = raw
			.split('.')
			.map(|s| s.parse::<u32>().ok())
			.collect::<Option<Vec<_>>>()?;
		(!segments.is_empty()).then_some(Self(segments))
	}

	pub fn depth(&self) -> usize {
		self.0.len()
	}

	pub fn segments(&self) -> &[u32] {
		&self.0
	}

	pub fn pending_id(&self) -> String {
		format!("{PENDING_PREFIX}{self}")
	}

	pub fn success_id(&self) -> String {
		format!("{SUCCESS_PREFIX}{self}")
	}

	pub fn resume_id(&self) -> String {
		format!("{RESUME_PREFIX}{self}")
	}
}

impl fmt::Display for SlotId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, segment) in self.0.iter().enumerate() {
			if i > 0 {
				f.write_str(".")?;
			}
			write!(f, "{segment}")?;
		}
		Ok(())
	}
}

/// Opening tag of the placeholder for `slot`.
pub(crate) fn placeholder_open(slot: &SlotId) -> String {
	format!("<div id=\"{}\">", slot.pending_id())
}

/// Resolved content for `slot` followed by its resume instruction.
pub(crate) fn success_payload(slot: &SlotId, html: &str) -> String {
	format!(
		"<template id=\"{}\">{html}</template><script type=\"{RESUME_SCRIPT_TYPE}\" id=\"{}\"></script>",
		slot.success_id(),
		slot.resume_id()
	)
}

/// Resume instruction asking the client to navigate instead of swapping.
pub(crate) fn navigate_payload(slot: &SlotId, url: &str) -> String {
	format!(
		"<script type=\"{RESUME_SCRIPT_TYPE}\" id=\"{}\" {NAVIGATE_ATTR}=\"{}\"></script>",
		slot.resume_id(),
		html_escape(url)
	)
}

/// Allocates child slot ids under one boundary (or the root).
#[derive(Debug, Clone, Default)]
pub(crate) struct SlotScope {
	path: Vec<u32>,
	next: Arc<AtomicU32>,
}

impl SlotScope {
	pub(crate) fn root() -> Self {
		Self::default()
	}

	/// Next child id, plus the scope its own descendants allocate from.
	pub(crate) fn allocate(&self) -> (SlotId, SlotScope) {
		let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
		let mut path = self.path.clone();
		path.push(n);
		let scope = SlotScope {
			path: path.clone(),
			next: Arc::new(AtomicU32::new(0)),
		};
		(SlotId(path), scope)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_siblings_increment_children_append() {
		// Arrange
		let root = SlotScope::root();

		// Act
		let (first, first_scope) = root.allocate();
		let (nested_a, nested_scope) = first_scope.allocate();
		let (nested_b, _) = first_scope.allocate();
		let (deep, _) = nested_scope.allocate();
		let (second, _) = root.allocate();

		// Assert
		assert_eq!(first.to_string(), "1");
		assert_eq!(nested_a.to_string(), "1.1");
		assert_eq!(nested_b.to_string(), "1.2");
		assert_eq!(deep.to_string(), "1.1.1");
		assert_eq!(second.to_string(), "2");
	}

	#[rstest]
	fn test_clones_share_counter() {
		// Arrange
		let (_, scope) = SlotScope::root().allocate();
		let fallback_side = scope.clone();

		// Act
		let (a, _) = fallback_side.allocate();
		let (b, _) = scope.allocate();

		// Assert
		assert_ne!(a, b);
	}

	#[rstest]
	#[case("1", Some(1))]
	#[case("2.10.3", Some(3))]
	#[case("", None)]
	#[case("1..2", None)]
	#[case("a.1", None)]
	fn test_parse_depth(#[case] raw: &str, #[case] depth: Option<usize>) {
		// Act
		let parsed = SlotId::parse(raw);

		// Assert
		assert_eq!(parsed.as_ref().map(SlotId::depth), depth);
		if let Some(id) = parsed {
			assert_eq!(id.to_string(), raw);
		}
	}

	#[rstest]
	fn test_wire_ids() {
		// Arrange
		let id = SlotId::parse("1.2").unwrap();

		// Assert
		assert_eq!(id.pending_id(), "pending:1.2");
		assert_eq!(id.success_id(), "success:1.2");
		assert_eq!(id.resume_id(), "resume:1.2");
	}

	#[rstest]
	fn test_payload_shapes() {
		// Arrange
		let id = SlotId::parse("3").unwrap();

		// Act
		let success = success_payload(&id, "<b>ok</b>");
		let navigate = navigate_payload(&id, "/login?a=1&b=2");

		// Assert
		assert_eq!(
			success,
			"<template id=\"success:3\"><b>ok</b></template><script type=\"application/weir-resume\" id=\"resume:3\"></script>"
		);
		assert!(navigate.contains("data-navigate=\"/login?a=1&amp;b=2\""));
		assert!(!navigate.contains("<template"));
	}
}
