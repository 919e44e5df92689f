//! Client-side suspense resolution.
//!
//! Every resume instruction present in the document names a slot. Its
//! success template replaces the slot's placeholder, then template and
//! instruction are removed. Instructions are applied deepest slot first:
//! a child placeholder lives inside its parent's content, so swapping the
//! child before the parent moves the resolved child along with it.

use super::dom::DomHost;
use crate::ssr::markers::{NAVIGATE_ATTR, RESUME_PREFIX, RESUME_SCRIPT_TYPE, SlotId};

/// What one resolution pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuspenseReport {
	/// Slots whose content was swapped in, in application order.
	pub applied: Vec<SlotId>,
	/// Slots whose placeholder no longer exists; their payloads were dropped.
	pub discarded: Vec<SlotId>,
	/// Slots that asked for a navigation instead of content.
	pub navigations: Vec<(SlotId, String)>,
}

impl SuspenseReport {
	pub fn is_empty(&self) -> bool {
		self.applied.is_empty() && self.discarded.is_empty() && self.navigations.is_empty()
	}
}

/// Applies every resume instruction currently in `dom`.
pub fn resolve_suspense<D: DomHost>(dom: &mut D) -> SuspenseReport {
	let mut pending: Vec<(SlotId, D::Node)> = dom
		.elements_by_tag("script")
		.into_iter()
		.filter(|script| dom.attr(script, "type").as_deref() == Some(RESUME_SCRIPT_TYPE))
		.filter_map(|script| {
			let id = dom.attr(&script, "id")?;
			let slot = SlotId::parse(id.strip_prefix(RESUME_PREFIX)?)?;
			Some((slot, script))
		})
		.collect();
	sort_deepest_first(&mut pending, |(slot, _)| slot);

	let mut report = SuspenseReport::default();
	for (slot, marker) in pending {
		if let Some(url) = dom.attr(&marker, NAVIGATE_ATTR) {
			dom.remove(&marker);
			report.navigations.push((slot, url));
			continue;
		}

		let template = dom.element_by_id(&slot.success_id());
		let placeholder = dom.element_by_id(&slot.pending_id());
		match (template, placeholder) {
			(Some(template), Some(placeholder)) => {
				let content = dom.take_template_content(&template);
				dom.replace_with(&placeholder, content);
				dom.remove(&template);
				report.applied.push(slot);
			}
			(template, _) => {
				if let Some(template) = template {
					dom.remove(&template);
				}
				report.discarded.push(slot);
			}
		}
		dom.remove(&marker);
	}
	report
}

/// Orders slots so that no slot precedes one of its descendants. Deeper
/// slots come first; slots of equal depth keep tree order.
pub fn sort_deepest_first<T>(items: &mut [T], slot: impl Fn(&T) -> &SlotId) {
	items.sort_by(|a, b| {
		let (a, b) = (slot(a), slot(b));
		b.depth().cmp(&a.depth()).then_with(|| a.cmp(b))
	});
}
