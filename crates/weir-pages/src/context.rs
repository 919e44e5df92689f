//! Per-request render context.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;
use weir_i18n::{NoTranslations, Params, Translate};

use crate::component::ComponentRef;
use crate::store::{Store, TransferOptions};

/// Why the current render is happening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Initiator {
	#[default]
	InitialRequest,
	SpaNavigation,
	ServerAction,
}

/// Route resolved by the router for this request.
#[derive(Debug, Clone)]
pub struct RouteMatch {
	pub path: String,
	pub params: IndexMap<String, String>,
	/// Page component of the route, re-rendered for page-scoped rerenders.
	pub page: Option<ComponentRef>,
}

impl RouteMatch {
	pub fn new(path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			params: IndexMap::new(),
			page: None,
		}
	}

	pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.params.insert(name.into(), value.into());
		self
	}

	pub fn with_page(mut self, page: impl Into<ComponentRef>) -> Self {
		self.page = Some(page.into());
		self
	}
}

struct ContextInner {
	route: RouteMatch,
	initiator: Initiator,
	i18n: Arc<dyn Translate>,
	store: Mutex<Store>,
}

/// Per-request context handed to every component and action.
///
/// Cloning is cheap; all clones share one store. The store lock is held
/// only for the duration of a single call, so never across an `.await`.
#[derive(Clone)]
pub struct RenderContext {
	inner: Arc<ContextInner>,
}

impl RenderContext {
	pub fn builder(route: RouteMatch) -> RenderContextBuilder {
		RenderContextBuilder {
			route,
			initiator: Initiator::default(),
			i18n: None,
			store: Store::new(),
		}
	}

	pub fn route(&self) -> &RouteMatch {
		&self.inner.route
	}

	pub fn initiator(&self) -> Initiator {
		self.inner.initiator
	}

	pub fn locale(&self) -> &str {
		self.inner.i18n.locale()
	}

	pub fn translate(&self, key: &str, params: &Params) -> String {
		self.inner.i18n.translate(key, params)
	}

	/// Translates without parameters.
	pub fn t(&self, key: &str) -> String {
		self.translate(key, &Params::new())
	}

	pub fn get(&self, key: &str) -> Option<Value> {
		self.inner.store.lock().get(key).cloned()
	}

	pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
		self.inner.store.lock().set(key, value)
	}

	pub fn delete(&self, key: &str) -> Option<Value> {
		self.inner.store.lock().delete(key)
	}

	pub fn transfer_to_client<K: AsRef<str>>(&self, keys: &[K]) {
		self.inner.store.lock().transfer_to_client(keys);
	}

	pub fn transfer_to_client_with<K: AsRef<str>>(&self, keys: &[K], options: TransferOptions) {
		self.inner
			.store
			.lock()
			.transfer_to_client_with(keys, options);
	}

	/// Direct access to the store. Drop the guard before awaiting.
	pub fn store(&self) -> MutexGuard<'_, Store> {
		self.inner.store.lock()
	}

	/// Copy of the store at this moment.
	pub fn store_snapshot(&self) -> Store {
		self.inner.store.lock().clone()
	}
}

impl std::fmt::Debug for RenderContext {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RenderContext")
			.field("route", &self.inner.route)
			.field("initiator", &self.inner.initiator)
			.field("locale", &self.locale())
			.finish_non_exhaustive()
	}
}

/// Builder for [`RenderContext`].
pub struct RenderContextBuilder {
	route: RouteMatch,
	initiator: Initiator,
	i18n: Option<Arc<dyn Translate>>,
	store: Store,
}

impl RenderContextBuilder {
	pub fn initiator(mut self, initiator: Initiator) -> Self {
		self.initiator = initiator;
		self
	}

	pub fn i18n(mut self, i18n: Arc<dyn Translate>) -> Self {
		self.i18n = Some(i18n);
		self
	}

	pub fn store(mut self, store: Store) -> Self {
		self.store = store;
		self
	}

	pub fn build(self) -> RenderContext {
		let i18n = self
			.i18n
			.unwrap_or_else(|| Arc::new(NoTranslations::new("en")));
		RenderContext {
			inner: Arc::new(ContextInner {
				route: self.route,
				initiator: self.initiator,
				i18n,
				store: Mutex::new(self.store),
			}),
		}
	}
}
