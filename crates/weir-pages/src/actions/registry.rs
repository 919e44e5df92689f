//! Action registry.
//!
//! Actions are registered explicitly on an [`ActionRegistry`], or
//! submitted at compile time through `inventory` and collected with
//! [`ActionRegistry::with_inventory`].
//!
//! ```
//! use weir_pages::actions::{ActionRegistry, ActionRoute};
//!
//! let registry = ActionRegistry::new().action("cart.clear", |_args, cx| async move {
//!     cx.set("cart", serde_json::json!([]));
//!     Ok(None)
//! });
//! assert!(registry.contains("cart.clear"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use weir_http::Response;

use super::resolver::ActionContext;
use crate::component::ComponentRef;
use crate::signal::Interrupt;

/// What an action body returns: an explicit response, or `None` for an
/// empty 200.
pub type ActionResult = Result<Option<Response>, Interrupt>;

/// Boxed future of an action body.
pub type ActionFuture = BoxFuture<'static, ActionResult>;

/// Type-erased action body.
pub type ActionHandler = Arc<dyn Fn(Vec<Value>, ActionContext) -> ActionFuture + Send + Sync>;

/// Compile-time action registration entry, collected with `inventory`.
pub struct ActionRoute {
	/// Unique action id.
	pub id: &'static str,
	pub handler: fn(Vec<Value>, ActionContext) -> ActionFuture,
	/// Component re-rendered for component-scoped rerenders.
	pub owner: Option<fn() -> ComponentRef>,
}

inventory::collect!(ActionRoute);

/// A registered action.
#[derive(Clone)]
pub struct ActionDef {
	pub id: String,
	pub handler: ActionHandler,
	pub owner: Option<ComponentRef>,
}

impl fmt::Debug for ActionDef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ActionDef")
			.field("id", &self.id)
			.field("owner", &self.owner)
			.finish_non_exhaustive()
	}
}

/// Action id to action.
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
	actions: HashMap<String, ActionDef>,
}

impl ActionRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registry holding every [`ActionRoute`] linked into the binary.
	pub fn with_inventory() -> Self {
		let mut registry = Self::new();
		for route in inventory::iter::<ActionRoute> {
			let handler = route.handler;
			registry.insert(ActionDef {
				id: route.id.to_string(),
				handler: Arc::new(move |args, cx| handler(args, cx)),
				owner: route.owner.map(|owner| owner()),
			});
		}
		registry
	}

	/// Registers `body` under `id`.
	pub fn action<F, Fut>(mut self, id: impl Into<String>, body: F) -> Self
	where
		F: Fn(Vec<Value>, ActionContext) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = ActionResult> + Send + 'static,
	{
		self.insert(ActionDef {
			id: id.into(),
			handler: Arc::new(move |args, cx| Box::pin(body(args, cx))),
			owner: None,
		});
		self
	}

	/// Registers `body` under `id`, owned by `owner` for rerenders.
	pub fn owned_action<F, Fut>(
		mut self,
		id: impl Into<String>,
		owner: impl Into<ComponentRef>,
		body: F,
	) -> Self
	where
		F: Fn(Vec<Value>, ActionContext) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = ActionResult> + Send + 'static,
	{
		self.insert(ActionDef {
			id: id.into(),
			handler: Arc::new(move |args, cx| Box::pin(body(args, cx))),
			owner: Some(owner.into()),
		});
		self
	}

	/// Adds `def`, replacing any action of the same id.
	pub fn insert(&mut self, def: ActionDef) -> Option<ActionDef> {
		self.actions.insert(def.id.clone(), def)
	}

	pub fn get(&self, id: &str) -> Option<&ActionDef> {
		self.actions.get(id)
	}

	pub fn contains(&self, id: &str) -> bool {
		self.actions.contains_key(id)
	}

	/// Registered ids, sorted.
	pub fn ids(&self) -> Vec<&str> {
		let mut ids: Vec<&str> = self.actions.keys().map(String::as_str).collect();
		ids.sort_unstable();
		ids
	}

	pub fn len(&self) -> usize {
		self.actions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.actions.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::component::{FnComponent, Page};
	use rstest::rstest;

	fn submitted(_args: Vec<Value>, _cx: ActionContext) -> ActionFuture {
		Box::pin(async { Ok(None) })
	}

	fn submitted_owner() -> ComponentRef {
		FnComponent::new("Submitted", |_, _| Page::empty().into()).into_ref()
	}

	inventory::submit! {
		ActionRoute {
			id: "registry.test.submitted",
			handler: submitted,
			owner: Some(submitted_owner),
		}
	}

	#[rstest]
	fn test_inventory_routes_collected() {
		// Act
		let registry = ActionRegistry::with_inventory();

		// Assert
		let def = registry.get("registry.test.submitted").unwrap();
		assert_eq!(def.owner.as_ref().map(|o| o.name()), Some("Submitted"));
	}

	#[rstest]
	fn test_later_registration_replaces() {
		// Arrange
		let registry = ActionRegistry::new()
			.action("a", |_, _| async { Ok(None) })
			.action("b", |_, _| async { Ok(None) });

		// Act
		let mut registry = registry;
		let previous = registry.insert(ActionDef {
			id: "a".to_string(),
			handler: Arc::new(submitted),
			owner: None,
		});

		// Assert
		assert!(previous.is_some());
		assert_eq!(registry.ids(), ["a", "b"]);
	}
}
