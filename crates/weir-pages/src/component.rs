//! Component System for weir-pages
//!
//! A component turns props and the per-request [`RenderContext`] into a
//! [`Rendered`] outcome, which is one of:
//!
//! - **ready**: a [`Page`] available right away,
//! - **pending**: a future resolving to a single [`Page`],
//! - **sequence**: an ordered, finite stream of [`Page`]s flushed one by one.
//!
//! Two optional side channels shape how the renderer treats a pending or
//! failing body: [`Component::suspense`] supplies the fallback shown while
//! the body is pending, and [`Component::error`] supplies the fallback shown
//! when the body fails.
//!
//! ## Usage
//!
//! ```
//! use weir_pages::component::{FnComponent, Page, Props, Rendered};
//!
//! let greeting = FnComponent::new("Greeting", |props, _cx| {
//!     let name = props.get_str("name").unwrap_or("world").to_string();
//!     Page::element("p").child(format!("Hello, {name}!")).into()
//! });
//! let page = Page::component(greeting, Props::new().with("name", "Ada"));
//! ```

mod page;
mod props;

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{BoxStream, Stream};

pub use page::{
	BOOLEAN_ATTRS, ComponentInvocation, IntoPage, Page, PageElement, PageVisitor, html_escape,
	is_boolean_attr_truthy,
};
pub use props::Props;

pub(crate) use page::VOID_ELEMENTS;

use crate::context::RenderContext;
use crate::signal::Interrupt;

/// Compile-time facts about a component, consumed as-is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComponentMeta {
	/// The component declares a suspense fallback.
	pub uses_suspense: bool,
	/// The component renders elements bound to server actions.
	pub uses_actions: bool,
	/// The component declares an error fallback.
	pub error_boundary: bool,
}

/// Outcome of evaluating a component body.
pub enum Rendered {
	Ready(Page),
	Failed(Interrupt),
	Pending(BoxFuture<'static, Result<Page, Interrupt>>),
	Sequence(BoxStream<'static, Result<Page, Interrupt>>),
}

impl Rendered {
	/// Wraps a future resolving to the component's page.
	pub fn pending<F>(future: F) -> Self
	where
		F: Future<Output = Result<Page, Interrupt>> + Send + 'static,
	{
		Self::Pending(Box::pin(future))
	}

	/// Wraps an ordered sequence of pages, each flushed as it arrives.
	pub fn sequence<S>(stream: S) -> Self
	where
		S: Stream<Item = Result<Page, Interrupt>> + Send + 'static,
	{
		Self::Sequence(Box::pin(stream))
	}
}

impl From<Page> for Rendered {
	fn from(page: Page) -> Self {
		Self::Ready(page)
	}
}

impl From<PageElement> for Rendered {
	fn from(element: PageElement) -> Self {
		Self::Ready(Page::Element(element))
	}
}

impl From<Result<Page, Interrupt>> for Rendered {
	fn from(result: Result<Page, Interrupt>) -> Self {
		match result {
			Ok(page) => Self::Ready(page),
			Err(interrupt) => Self::Failed(interrupt),
		}
	}
}

impl fmt::Debug for Rendered {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Rendered::Ready(page) => f.debug_tuple("Ready").field(page).finish(),
			Rendered::Failed(interrupt) => f.debug_tuple("Failed").field(interrupt).finish(),
			Rendered::Pending(_) => f.write_str("Pending(..)"),
			Rendered::Sequence(_) => f.write_str("Sequence(..)"),
		}
	}
}

/// Trait for reusable UI components.
pub trait Component: Send + Sync + 'static {
	/// Name used in logs and streaming containers.
	fn name(&self) -> &str;

	/// Evaluates the body.
	fn render(&self, props: &Props, cx: &RenderContext) -> Rendered;

	/// Fallback flushed while a pending body resolves. Without one, the
	/// stream waits for the body in place.
	fn suspense(&self, _props: &Props, _cx: &RenderContext) -> Option<Page> {
		None
	}

	/// Fallback rendered when the body fails with a user error.
	///
	/// Only consulted when [`ComponentMeta::error_boundary`] is set.
	fn error(&self, _error: &Interrupt, _props: &Props, _cx: &RenderContext) -> Option<Page> {
		None
	}

	fn meta(&self) -> ComponentMeta {
		ComponentMeta::default()
	}
}

/// Shared handle to a component.
#[derive(Clone)]
pub struct ComponentRef(Arc<dyn Component>);

impl ComponentRef {
	pub fn new(component: impl Component) -> Self {
		Self(Arc::new(component))
	}

	/// True when both handles point at the same component instance.
	pub fn ptr_eq(&self, other: &ComponentRef) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl<C: Component> From<C> for ComponentRef {
	fn from(component: C) -> Self {
		Self::new(component)
	}
}

impl From<Arc<dyn Component>> for ComponentRef {
	fn from(component: Arc<dyn Component>) -> Self {
		Self(component)
	}
}

impl Deref for ComponentRef {
	type Target = dyn Component;

	fn deref(&self) -> &Self::Target {
		self.0.as_ref()
	}
}

impl fmt::Debug for ComponentRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("ComponentRef").field(&self.0.name()).finish()
	}
}

type RenderFn = dyn Fn(&Props, &RenderContext) -> Rendered + Send + Sync;
type FallbackFn = dyn Fn(&Props, &RenderContext) -> Page + Send + Sync;
type ErrorFn = dyn Fn(&Interrupt, &Props, &RenderContext) -> Page + Send + Sync;

/// Component built from closures.
#[derive(Clone)]
pub struct FnComponent {
	name: Cow<'static, str>,
	render: Arc<RenderFn>,
	suspense: Option<Arc<FallbackFn>>,
	error: Option<Arc<ErrorFn>>,
	uses_actions: bool,
}

impl FnComponent {
	pub fn new<F>(name: impl Into<Cow<'static, str>>, render: F) -> Self
	where
		F: Fn(&Props, &RenderContext) -> Rendered + Send + Sync + 'static,
	{
		Self {
			name: name.into(),
			render: Arc::new(render),
			suspense: None,
			error: None,
			uses_actions: false,
		}
	}

	/// Attaches a suspense fallback.
	pub fn suspense<F>(mut self, fallback: F) -> Self
	where
		F: Fn(&Props, &RenderContext) -> Page + Send + Sync + 'static,
	{
		self.suspense = Some(Arc::new(fallback));
		self
	}

	/// Attaches an error fallback, making the component an error boundary.
	pub fn on_error<F>(mut self, fallback: F) -> Self
	where
		F: Fn(&Interrupt, &Props, &RenderContext) -> Page + Send + Sync + 'static,
	{
		self.error = Some(Arc::new(fallback));
		self
	}

	pub fn uses_actions(mut self) -> Self {
		self.uses_actions = true;
		self
	}

	pub fn into_ref(self) -> ComponentRef {
		ComponentRef::new(self)
	}
}

impl Component for FnComponent {
	fn name(&self) -> &str {
		&self.name
	}

	fn render(&self, props: &Props, cx: &RenderContext) -> Rendered {
		(self.render)(props, cx)
	}

	fn suspense(&self, props: &Props, cx: &RenderContext) -> Option<Page> {
		self.suspense.as_ref().map(|f| f(props, cx))
	}

	fn error(&self, error: &Interrupt, props: &Props, cx: &RenderContext) -> Option<Page> {
		self.error.as_ref().map(|f| f(error, props, cx))
	}

	fn meta(&self) -> ComponentMeta {
		ComponentMeta {
			uses_suspense: self.suspense.is_some(),
			uses_actions: self.uses_actions,
			error_boundary: self.error.is_some(),
		}
	}
}

impl fmt::Debug for FnComponent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FnComponent")
			.field("name", &self.name)
			.field("meta", &self.meta())
			.finish()
	}
}
