//! Document abstraction for the client runtime.
//!
//! [`DomHost`] is what the dispatch runtime and suspense resolution need
//! from a document. [`MemoryDom`] implements it natively over an arena of
//! nodes; the browser host lives in `client::web`.

use std::rc::Rc;

use serde_json::Value;

use crate::component::{VOID_ELEMENTS, html_escape};

/// Callback attached to an element event. Receives the serialized event.
pub type Listener = Box<dyn Fn(Value)>;

/// The document operations used by the client runtime.
pub trait DomHost {
	type Node: Clone;

	/// Element with the given id, including elements inside `template`
	/// content.
	fn element_by_id(&self, id: &str) -> Option<Self::Node>;

	/// Connected elements carrying `name`, in document order.
	fn elements_with_attr(&self, name: &str) -> Vec<Self::Node>;

	/// Connected elements named `tag`, in document order.
	fn elements_by_tag(&self, tag: &str) -> Vec<Self::Node>;

	fn attr(&self, node: &Self::Node, name: &str) -> Option<String>;

	fn set_attr(&mut self, node: &Self::Node, name: &str, value: &str);

	fn remove_attr(&mut self, node: &Self::Node, name: &str);

	fn text_content(&self, node: &Self::Node) -> String;

	/// Detaches and returns the content of a `template` element.
	fn take_template_content(&mut self, template: &Self::Node) -> Vec<Self::Node>;

	/// Puts `nodes` where `old` is and detaches `old`.
	fn replace_with(&mut self, old: &Self::Node, nodes: Vec<Self::Node>);

	fn remove(&mut self, node: &Self::Node);

	fn add_listener(&mut self, node: &Self::Node, event: &str, listener: Listener);
}

/// Index of a node in a [`MemoryDom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
	Document,
	Doctype(String),
	Element {
		tag: String,
		attrs: Vec<(String, String)>,
	},
	Text(String),
	Comment(String),
}

#[derive(Debug)]
struct NodeData {
	kind: NodeKind,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
}

/// In-memory document tree.
///
/// Detached nodes stay in the arena; they are simply unreachable from
/// the document node.
pub struct MemoryDom {
	nodes: Vec<NodeData>,
	listeners: Vec<(NodeId, String, Rc<dyn Fn(Value)>)>,
}

impl MemoryDom {
	pub fn new() -> Self {
		Self {
			nodes: vec![NodeData {
				kind: NodeKind::Document,
				parent: None,
				children: Vec::new(),
			}],
			listeners: Vec::new(),
		}
	}

	/// The document node.
	pub fn document(&self) -> NodeId {
		NodeId(0)
	}

	fn push(&mut self, kind: NodeKind) -> NodeId {
		self.nodes.push(NodeData {
			kind,
			parent: None,
			children: Vec::new(),
		});
		NodeId(self.nodes.len() - 1)
	}

	pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
		self.push(NodeKind::Element {
			tag: tag.into().to_ascii_lowercase(),
			attrs: Vec::new(),
		})
	}

	pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
		self.push(NodeKind::Text(text.into()))
	}

	pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
		self.push(NodeKind::Comment(text.into()))
	}

	pub fn create_doctype(&mut self, name: impl Into<String>) -> NodeId {
		self.push(NodeKind::Doctype(name.into()))
	}

	pub fn kind(&self, node: NodeId) -> &NodeKind {
		&self.nodes[node.0].kind
	}

	pub fn tag(&self, node: NodeId) -> Option<&str> {
		match &self.nodes[node.0].kind {
			NodeKind::Element { tag, .. } => Some(tag),
			_ => None,
		}
	}

	pub fn parent(&self, node: NodeId) -> Option<NodeId> {
		self.nodes[node.0].parent
	}

	pub fn children(&self, node: NodeId) -> &[NodeId] {
		&self.nodes[node.0].children
	}

	/// Detaches `node` from its parent, if any.
	pub fn detach(&mut self, node: NodeId) {
		if let Some(parent) = self.nodes[node.0].parent.take() {
			self.nodes[parent.0].children.retain(|c| *c != node);
		}
	}

	pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
		self.detach(child);
		self.nodes[child.0].parent = Some(parent);
		self.nodes[parent.0].children.push(child);
	}

	/// Inserts `nodes` into `parent` at child position `index`.
	pub fn insert_children(&mut self, parent: NodeId, index: usize, nodes: &[NodeId]) {
		for node in nodes {
			self.detach(*node);
		}
		let index = index.min(self.nodes[parent.0].children.len());
		for (offset, node) in nodes.iter().enumerate() {
			self.nodes[node.0].parent = Some(parent);
			self.nodes[parent.0].children.insert(index + offset, *node);
		}
	}

	/// Whether `node` is reachable from the document node.
	pub fn is_connected(&self, node: NodeId) -> bool {
		let mut current = Some(node);
		while let Some(n) = current {
			if n == self.document() {
				return true;
			}
			current = self.nodes[n.0].parent;
		}
		false
	}

	/// Connected nodes in document order, the document node first.
	pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
		let mut out = Vec::new();
		let mut stack = vec![root];
		while let Some(node) = stack.pop() {
			out.push(node);
			stack.extend(self.nodes[node.0].children.iter().rev());
		}
		out
	}

	fn elements_where(&self, pred: impl Fn(&str, &[(String, String)]) -> bool) -> Vec<NodeId> {
		self.descendants(self.document())
			.into_iter()
			.filter(|n| match &self.nodes[n.0].kind {
				NodeKind::Element { tag, attrs } => pred(tag, attrs),
				_ => false,
			})
			.collect()
	}

	pub fn get_attr(&self, node: NodeId, name: &str) -> Option<&str> {
		match &self.nodes[node.0].kind {
			NodeKind::Element { attrs, .. } => attrs
				.iter()
				.find(|(n, _)| n == name)
				.map(|(_, v)| v.as_str()),
			_ => None,
		}
	}

	pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
		if let NodeKind::Element { attrs, .. } = &mut self.nodes[node.0].kind {
			match attrs.iter_mut().find(|(n, _)| n == name) {
				Some((_, v)) => *v = value.to_string(),
				None => attrs.push((name.to_string(), value.to_string())),
			}
		}
	}

	pub fn remove_attribute(&mut self, node: NodeId, name: &str) {
		if let NodeKind::Element { attrs, .. } = &mut self.nodes[node.0].kind {
			attrs.retain(|(n, _)| n != name);
		}
	}

	/// Concatenated text of `node` and its descendants.
	pub fn text(&self, node: NodeId) -> String {
		self.descendants(node)
			.into_iter()
			.filter_map(|n| match &self.nodes[n.0].kind {
				NodeKind::Text(t) => Some(t.as_str()),
				_ => None,
			})
			.collect()
	}

	/// Invokes every listener for `event` on `node`. Returns how many ran.
	pub fn dispatch_event(&self, node: NodeId, event: &str, detail: Value) -> usize {
		let matching: Vec<Rc<dyn Fn(Value)>> = self
			.listeners
			.iter()
			.filter(|(n, e, _)| *n == node && e == event)
			.map(|(_, _, l)| l.clone())
			.collect();
		for listener in &matching {
			listener(detail.clone());
		}
		matching.len()
	}

	pub fn listener_count(&self, node: NodeId) -> usize {
		self.listeners.iter().filter(|(n, _, _)| *n == node).count()
	}

	/// Markup of the children of `node`.
	pub fn inner_html(&self, node: NodeId) -> String {
		let mut out = String::new();
		let raw = self
			.tag(node)
			.is_some_and(|t| matches!(t, "script" | "style"));
		for child in self.children(node) {
			self.write(*child, raw, &mut out);
		}
		out
	}

	/// Markup of `node` itself.
	pub fn outer_html(&self, node: NodeId) -> String {
		let mut out = String::new();
		self.write(node, false, &mut out);
		out
	}

	/// Markup of the whole document.
	pub fn to_html(&self) -> String {
		self.inner_html(self.document())
	}

	fn write(&self, node: NodeId, raw_text: bool, out: &mut String) {
		match &self.nodes[node.0].kind {
			NodeKind::Document => {
				for child in self.children(node) {
					self.write(*child, false, out);
				}
			}
			NodeKind::Doctype(name) => {
				out.push_str("<!DOCTYPE ");
				out.push_str(name);
				out.push('>');
			}
			NodeKind::Text(text) if raw_text => out.push_str(text),
			NodeKind::Text(text) => out.push_str(&html_escape(text)),
			NodeKind::Comment(text) => {
				out.push_str("<!--");
				out.push_str(text);
				out.push_str("-->");
			}
			NodeKind::Element { tag, attrs } => {
				out.push('<');
				out.push_str(tag);
				for (name, value) in attrs {
					out.push(' ');
					out.push_str(name);
					out.push_str("=\"");
					out.push_str(&html_escape(value));
					out.push('"');
				}
				out.push('>');
				if VOID_ELEMENTS.contains(&tag.as_str()) {
					return;
				}
				let raw = matches!(tag.as_str(), "script" | "style");
				for child in self.children(node) {
					self.write(*child, raw, out);
				}
				out.push_str("</");
				out.push_str(tag);
				out.push('>');
			}
		}
	}
}

impl Default for MemoryDom {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for MemoryDom {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MemoryDom")
			.field("nodes", &self.nodes.len())
			.field("listeners", &self.listeners.len())
			.finish()
	}
}

impl DomHost for MemoryDom {
	type Node = NodeId;

	fn element_by_id(&self, id: &str) -> Option<NodeId> {
		self.elements_where(|_, attrs| attrs.iter().any(|(n, v)| n == "id" && v == id))
			.into_iter()
			.next()
	}

	fn elements_with_attr(&self, name: &str) -> Vec<NodeId> {
		self.elements_where(|_, attrs| attrs.iter().any(|(n, _)| n == name))
	}

	fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
		self.elements_where(|t, _| t.eq_ignore_ascii_case(tag))
	}

	fn attr(&self, node: &NodeId, name: &str) -> Option<String> {
		self.get_attr(*node, name).map(str::to_string)
	}

	fn set_attr(&mut self, node: &NodeId, name: &str, value: &str) {
		self.set_attribute(*node, name, value);
	}

	fn remove_attr(&mut self, node: &NodeId, name: &str) {
		self.remove_attribute(*node, name);
	}

	fn text_content(&self, node: &NodeId) -> String {
		self.text(*node)
	}

	fn take_template_content(&mut self, template: &NodeId) -> Vec<NodeId> {
		let children = self.nodes[template.0].children.clone();
		for child in &children {
			self.detach(*child);
		}
		children
	}

	fn replace_with(&mut self, old: &NodeId, nodes: Vec<NodeId>) {
		let Some(parent) = self.parent(*old) else {
			return;
		};
		let index = self
			.children(parent)
			.iter()
			.position(|c| c == old)
			.unwrap_or_default();
		self.detach(*old);
		self.insert_children(parent, index, &nodes);
	}

	fn remove(&mut self, node: &NodeId) {
		self.detach(*node);
	}

	fn add_listener(&mut self, node: &NodeId, event: &str, listener: Listener) {
		self.listeners
			.push((*node, event.to_string(), Rc::from(listener)));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::cell::RefCell;

	#[rstest]
	fn test_replace_keeps_position() {
		// Arrange
		let mut dom = MemoryDom::new();
		let body = dom.create_element("body");
		dom.append_child(dom.document(), body);
		let a = dom.create_text("a");
		let old = dom.create_element("div");
		let c = dom.create_text("c");
		for n in [a, old, c] {
			dom.append_child(body, n);
		}
		let b1 = dom.create_element("b");
		let b2 = dom.create_text("!");

		// Act
		dom.replace_with(&old, vec![b1, b2]);

		// Assert
		assert_eq!(dom.inner_html(body), "a<b></b>!c");
		assert!(!dom.is_connected(old));
	}

	#[rstest]
	fn test_listeners_receive_events() {
		// Arrange
		let mut dom = MemoryDom::new();
		let button = dom.create_element("button");
		dom.append_child(dom.document(), button);
		let seen = Rc::new(RefCell::new(Vec::new()));
		let sink = seen.clone();
		dom.add_listener(&button, "click", Box::new(move |v| sink.borrow_mut().push(v)));

		// Act
		let ran = dom.dispatch_event(button, "click", Value::from(1));
		let other = dom.dispatch_event(button, "input", Value::from(2));

		// Assert
		assert_eq!((ran, other), (1, 0));
		assert_eq!(*seen.borrow(), [Value::from(1)]);
	}

	#[rstest]
	fn test_attribute_queries_follow_document_order() {
		// Arrange
		let mut dom = MemoryDom::new();
		let outer = dom.create_element("div");
		let inner = dom.create_element("span");
		dom.append_child(dom.document(), outer);
		dom.append_child(outer, inner);
		dom.set_attr(&outer, "data-action", "k1");
		dom.set_attr(&inner, "data-action", "k2");

		// Act
		let found = dom.elements_with_attr("data-action");
		dom.remove_attr(&outer, "data-action");

		// Assert
		assert_eq!(found, [outer, inner]);
		assert_eq!(dom.elements_with_attr("data-action"), [inner]);
		assert_eq!(dom.outer_html(outer), "<div><span data-action=\"k2\"></span></div>");
	}
}
