//! Node model: the renderable output of components.

use std::borrow::Cow;

use super::{ComponentRef, Props};

/// A unified representation of renderable content.
///
/// Immutable once built; every render pass produces a fresh tree.
#[derive(Debug, Clone)]
pub enum Page {
	/// A DOM element.
	Element(PageElement),
	/// A text node, escaped on output.
	Text(Cow<'static, str>),
	/// Markup written verbatim.
	RawHtml(Cow<'static, str>),
	/// Children without a wrapper element.
	Fragment(Vec<Page>),
	/// Renders nothing.
	Empty,
	/// A component evaluated by the renderer.
	Component(ComponentInvocation),
}

/// Represents a DOM element in the page tree.
#[derive(Debug, Clone)]
pub struct PageElement {
	tag: Cow<'static, str>,
	attrs: Vec<(Cow<'static, str>, Cow<'static, str>)>,
	children: Vec<Page>,
	is_void: bool,
	action: Option<Cow<'static, str>>,
}

/// A component reference paired with the props it is invoked with.
#[derive(Clone)]
pub struct ComponentInvocation {
	pub component: ComponentRef,
	pub props: Props,
}

impl std::fmt::Debug for ComponentInvocation {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ComponentInvocation")
			.field("component", &self.component.name())
			.field("props", &self.props)
			.finish()
	}
}

impl PageElement {
	/// Creates a new element.
	pub fn new(tag: impl Into<Cow<'static, str>>) -> Self {
		let tag = tag.into();
		let is_void = VOID_ELEMENTS.contains(&tag.as_ref());
		Self {
			tag,
			attrs: Vec::new(),
			children: Vec::new(),
			is_void,
			action: None,
		}
	}

	/// Adds an attribute.
	pub fn attr(
		mut self,
		name: impl Into<Cow<'static, str>>,
		value: impl Into<Cow<'static, str>>,
	) -> Self {
		self.attrs.push((name.into(), value.into()));
		self
	}

	/// Adds a boolean attribute, present only when `value` is true.
	pub fn bool_attr(self, name: impl Into<Cow<'static, str>>, value: bool) -> Self {
		self.attr(name, if value { "true" } else { "false" })
	}

	/// Tags the element with an action binding key from the compiled
	/// binding table.
	pub fn action(mut self, key: impl Into<Cow<'static, str>>) -> Self {
		self.action = Some(key.into());
		self
	}

	/// Adds a child.
	pub fn child(mut self, child: impl IntoPage) -> Self {
		self.children.push(child.into_page());
		self
	}

	/// Adds multiple children.
	pub fn children(mut self, children: impl IntoIterator<Item = impl IntoPage>) -> Self {
		self.children
			.extend(children.into_iter().map(|c| c.into_page()));
		self
	}

	pub fn tag_name(&self) -> &str {
		&self.tag
	}

	pub fn attrs(&self) -> &[(Cow<'static, str>, Cow<'static, str>)] {
		&self.attrs
	}

	pub fn child_pages(&self) -> &[Page] {
		&self.children
	}

	pub fn action_key(&self) -> Option<&str> {
		self.action.as_deref()
	}

	pub fn is_void(&self) -> bool {
		self.is_void
	}

	/// Writes the opening tag, attributes included.
	pub(crate) fn write_open(&self, out: &mut String) {
		out.push('<');
		out.push_str(&self.tag);
		for (name, value) in &self.attrs {
			if BOOLEAN_ATTRS.contains(&name.as_ref()) {
				if is_boolean_attr_truthy(value) {
					out.push(' ');
					out.push_str(name);
				}
				continue;
			}
			out.push(' ');
			out.push_str(name);
			out.push_str("=\"");
			out.push_str(&html_escape(value));
			out.push('"');
		}
		if let Some(key) = &self.action {
			out.push_str(" data-action=\"");
			out.push_str(&html_escape(key));
			out.push('"');
		}
		out.push('>');
	}

	/// Writes the closing tag; void elements have none.
	pub(crate) fn write_close(&self, out: &mut String) {
		if !self.is_void {
			out.push_str("</");
			out.push_str(&self.tag);
			out.push('>');
		}
	}
}

impl Page {
	/// Creates an element.
	pub fn element(tag: impl Into<Cow<'static, str>>) -> PageElement {
		PageElement::new(tag)
	}

	/// Creates a text node.
	pub fn text(content: impl Into<Cow<'static, str>>) -> Self {
		Self::Text(content.into())
	}

	/// Creates a raw markup node. The markup is not escaped.
	pub fn raw_html(markup: impl Into<Cow<'static, str>>) -> Self {
		Self::RawHtml(markup.into())
	}

	/// Creates a fragment.
	pub fn fragment(children: impl IntoIterator<Item = impl IntoPage>) -> Self {
		Self::Fragment(children.into_iter().map(|c| c.into_page()).collect())
	}

	/// Creates an empty page.
	pub fn empty() -> Self {
		Self::Empty
	}

	/// Invokes `component` with `props`.
	pub fn component(component: impl Into<ComponentRef>, props: Props) -> Self {
		Self::Component(ComponentInvocation {
			component: component.into(),
			props,
		})
	}

	/// Walks the tree, calling `visitor` for each node in pre-order.
	pub fn accept<V: PageVisitor + ?Sized>(&self, visitor: &mut V) {
		match self {
			Page::Element(el) => {
				if visitor.visit_element(el) {
					for child in &el.children {
						child.accept(visitor);
					}
				}
			}
			Page::Text(text) => visitor.visit_text(text),
			Page::RawHtml(markup) => visitor.visit_raw_html(markup),
			Page::Fragment(children) => {
				for child in children {
					child.accept(visitor);
				}
			}
			Page::Empty => {}
			Page::Component(invocation) => visitor.visit_component(invocation),
		}
	}

	/// True when the tree holds no component invocations and can be
	/// written without evaluating anything.
	pub fn is_static(&self) -> bool {
		let mut finder = ComponentFinder::default();
		self.accept(&mut finder);
		!finder.found
	}

	/// Action binding keys used directly in this tree, in document order.
	pub fn action_keys(&self) -> Vec<String> {
		let mut collector = ActionKeyCollector::default();
		self.accept(&mut collector);
		collector.keys
	}

	/// Serializes a tree synchronously. Component nodes are skipped; use
	/// the streaming renderer for trees that contain them.
	pub fn to_html(&self) -> String {
		let mut out = String::new();
		self.write_static(&mut out);
		out
	}

	fn write_static(&self, out: &mut String) {
		match self {
			Page::Element(el) => {
				el.write_open(out);
				for child in &el.children {
					child.write_static(out);
				}
				el.write_close(out);
			}
			Page::Text(text) => out.push_str(&html_escape(text)),
			Page::RawHtml(markup) => out.push_str(markup),
			Page::Fragment(children) => {
				for child in children {
					child.write_static(out);
				}
			}
			Page::Empty | Page::Component(_) => {}
		}
	}
}

/// Pre-order visitor over a [`Page`] tree.
///
/// Component invocations are leaves: the visitor sees the invocation, not
/// the output the component would produce.
pub trait PageVisitor {
	/// Return `false` to skip the element's children.
	fn visit_element(&mut self, _element: &PageElement) -> bool {
		true
	}
	fn visit_text(&mut self, _text: &str) {}
	fn visit_raw_html(&mut self, _markup: &str) {}
	fn visit_component(&mut self, _invocation: &ComponentInvocation) {}
}

#[derive(Default)]
struct ComponentFinder {
	found: bool,
}

impl PageVisitor for ComponentFinder {
	fn visit_element(&mut self, _element: &PageElement) -> bool {
		!self.found
	}

	fn visit_component(&mut self, _invocation: &ComponentInvocation) {
		self.found = true;
	}
}

#[derive(Default)]
struct ActionKeyCollector {
	keys: Vec<String>,
}

impl PageVisitor for ActionKeyCollector {
	fn visit_element(&mut self, element: &PageElement) -> bool {
		if let Some(key) = element.action_key() {
			self.keys.push(key.to_string());
		}
		true
	}
}

/// Trait for types that can be converted into a Page.
pub trait IntoPage {
	/// Converts self into a Page.
	fn into_page(self) -> Page;
}

impl IntoPage for Page {
	fn into_page(self) -> Page {
		self
	}
}

impl IntoPage for PageElement {
	fn into_page(self) -> Page {
		Page::Element(self)
	}
}

impl From<PageElement> for Page {
	fn from(element: PageElement) -> Self {
		Page::Element(element)
	}
}

impl IntoPage for String {
	fn into_page(self) -> Page {
		Page::Text(Cow::Owned(self))
	}
}

impl IntoPage for &String {
	fn into_page(self) -> Page {
		Page::Text(Cow::Owned(self.clone()))
	}
}

impl IntoPage for &'static str {
	fn into_page(self) -> Page {
		Page::Text(Cow::Borrowed(self))
	}
}

macro_rules! number_into_page {
	($($ty:ty),*) => {
		$(
			impl IntoPage for $ty {
				fn into_page(self) -> Page {
					Page::Text(Cow::Owned(self.to_string()))
				}
			}
		)*
	};
}

number_into_page!(i32, i64, u32, u64, usize, f64);

impl<T: IntoPage> IntoPage for Option<T> {
	fn into_page(self) -> Page {
		match self {
			Some(v) => v.into_page(),
			None => Page::Empty,
		}
	}
}

impl<T: IntoPage> IntoPage for Vec<T> {
	fn into_page(self) -> Page {
		Page::Fragment(self.into_iter().map(|v| v.into_page()).collect())
	}
}

impl IntoPage for () {
	fn into_page(self) -> Page {
		Page::Empty
	}
}

impl<A: IntoPage, B: IntoPage> IntoPage for (A, B) {
	fn into_page(self) -> Page {
		Page::Fragment(vec![self.0.into_page(), self.1.into_page()])
	}
}

impl<A: IntoPage, B: IntoPage, C: IntoPage> IntoPage for (A, B, C) {
	fn into_page(self) -> Page {
		Page::Fragment(vec![
			self.0.into_page(),
			self.1.into_page(),
			self.2.into_page(),
		])
	}
}

pub(crate) const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
	"wbr",
];

/// HTML boolean attributes that are only set when the value is truthy.
pub const BOOLEAN_ATTRS: &[&str] = &[
	"allowfullscreen",
	"async",
	"autofocus",
	"autoplay",
	"checked",
	"controls",
	"default",
	"defer",
	"disabled",
	"formnovalidate",
	"hidden",
	"inert",
	"ismap",
	"itemscope",
	"loop",
	"multiple",
	"muted",
	"nomodule",
	"novalidate",
	"open",
	"playsinline",
	"readonly",
	"required",
	"reversed",
	"selected",
];

/// Falsy values are empty, `"false"` and `"0"`.
pub fn is_boolean_attr_truthy(value: &str) -> bool {
	!value.is_empty() && value != "false" && value != "0"
}

/// Escapes `& < > " '`, borrowing when nothing needs escaping.
pub fn html_escape(s: &str) -> Cow<'_, str> {
	if s.contains(['&', '<', '>', '"', '\'']) {
		let mut escaped = String::with_capacity(s.len() + 8);
		for c in s.chars() {
			match c {
				'&' => escaped.push_str("&amp;"),
				'<' => escaped.push_str("&lt;"),
				'>' => escaped.push_str("&gt;"),
				'"' => escaped.push_str("&quot;"),
				'\'' => escaped.push_str("&#x27;"),
				_ => escaped.push(c),
			}
		}
		Cow::Owned(escaped)
	} else {
		Cow::Borrowed(s)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::component::FnComponent;
	use rstest::rstest;

	fn render(page: &Page) -> String {
		page.to_html()
	}

	#[rstest]
	#[case("true", "<input checked>")]
	#[case("checked", "<input checked>")]
	#[case("false", "<input>")]
	#[case("0", "<input>")]
	#[case("", "<input>")]
	fn test_boolean_attr_bare_or_omitted(#[case] value: &'static str, #[case] expected: &str) {
		// Arrange
		let page = Page::element("input").attr("checked", value).into_page();

		// Act
		let html = render(&page);

		// Assert
		assert_eq!(html, expected);
	}

	#[rstest]
	fn test_text_escaped_raw_verbatim() {
		// Arrange
		let page = Page::fragment(vec![
			Page::text("<b>&</b>"),
			Page::raw_html("<b>raw</b>"),
		]);

		// Act
		let html = render(&page);

		// Assert
		assert_eq!(html, "&lt;b&gt;&amp;&lt;/b&gt;<b>raw</b>");
	}

	#[rstest]
	fn test_attribute_values_escaped() {
		// Arrange
		let page = Page::element("a")
			.attr("title", "say \"hi\"")
			.child("x")
			.into_page();

		// Act
		let html = render(&page);

		// Assert
		assert_eq!(html, "<a title=\"say &quot;hi&quot;\">x</a>");
	}

	#[rstest]
	fn test_action_marker_rendered_last() {
		// Arrange
		let page = Page::element("button")
			.attr("type", "button")
			.action("inc")
			.child("+")
			.into_page();

		// Act
		let html = render(&page);

		// Assert
		assert_eq!(html, "<button type=\"button\" data-action=\"inc\">+</button>");
	}

	#[rstest]
	fn test_numbers_and_tuples_into_page() {
		// Arrange
		let page = Page::element("p").child((1u32, " of ", 2.5f64)).into_page();

		// Act
		let html = render(&page);

		// Assert
		assert_eq!(html, "<p>1 of 2.5</p>");
	}

	#[rstest]
	fn test_visitor_collects_keys_and_detects_components() {
		// Arrange
		let leaf = FnComponent::new("Leaf", |_, _| Page::text("leaf").into());
		let page = Page::element("form")
			.action("save")
			.child(Page::element("button").action("cancel"))
			.child(Page::component(leaf, Props::new()))
			.into_page();
		let plain = Page::element("div").child("static").into_page();

		// Act
		let keys = page.action_keys();

		// Assert
		assert_eq!(keys, vec!["save".to_string(), "cancel".to_string()]);
		assert!(!page.is_static());
		assert!(plain.is_static());
	}
}
