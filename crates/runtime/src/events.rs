//! Named push-event registry.
//!
//! [`EventBus`] maps an event kind to an ordered set of handlers
//! ([`IndexMap`] keeps registration order and gives O(1) removal). Handlers
//! are synchronous; anything that needs to await forwards into a channel.
//!
//! [`Subscription`] is the RAII handle returned by [`EventBus::subscribe`]. It
//! only holds a weak reference to the registry, so unsubscribing after the
//! owning transport is gone is a no-op.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;

/// Unique identifier for event handlers.
pub type HandlerId = u64;

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Returns a new globally-unique handler ID.
pub fn next_handler_id() -> HandlerId {
	NEXT_HANDLER_ID.fetch_add(1, Ordering::SeqCst)
}

/// Push-event handler. Receives the event's `data` (or `null`).
pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;

type HandlerMap = HashMap<String, IndexMap<HandlerId, EventHandler>>;
type Registry = Arc<Mutex<HandlerMap>>;

/// In-process publish/subscribe for named push events.
///
/// Cloning is cheap and clones share the same registry.
#[derive(Clone, Default)]
pub struct EventBus {
	handlers: Registry,
}

impl EventBus {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `handler` for `kind`.
	pub fn subscribe<F>(&self, kind: &str, handler: F) -> Subscription
	where
		F: Fn(&Value) + Send + Sync + 'static,
	{
		self.subscribe_arc(kind, Arc::new(handler))
	}

	/// Registers an already shared handler for `kind`.
	pub fn subscribe_arc(&self, kind: &str, handler: EventHandler) -> Subscription {
		let id = next_handler_id();
		self.handlers
			.lock()
			.entry(kind.to_string())
			.or_default()
			.insert(id, handler);

		tracing::trace!(kind, id, "Registered event handler");
		Subscription::from_registry(id, kind, &self.handlers)
	}

	/// Delivers one event occurrence to every handler of `kind`, in
	/// registration order. Returns the number of handlers invoked.
	///
	/// The registry lock is released before handlers run, so a handler may
	/// subscribe or unsubscribe without deadlocking.
	pub fn emit(&self, kind: &str, payload: &Value) -> usize {
		let handlers: Vec<EventHandler> = match self.handlers.lock().get(kind) {
			Some(map) => map.values().cloned().collect(),
			None => Vec::new(),
		};

		if handlers.is_empty() {
			tracing::trace!(kind, "Event with no subscribers");
		}

		for handler in &handlers {
			handler(payload);
		}
		handlers.len()
	}

	/// Returns the number of handlers registered for `kind`.
	pub fn handler_count(&self, kind: &str) -> usize {
		self.handlers.lock().get(kind).map_or(0, IndexMap::len)
	}

	/// Drops every registered handler.
	pub fn clear(&self) {
		self.handlers.lock().clear();
	}
}

impl std::fmt::Debug for EventBus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let kinds: Vec<String> = self.handlers.lock().keys().cloned().collect();
		f.debug_struct("EventBus").field("kinds", &kinds).finish()
	}
}

/// RAII handle that unregisters an event handler on drop.
///
/// [`unsubscribe`](Self::unsubscribe) is idempotent. Holds a weak reference to
/// the registry, so unsubscribing after the bus is dropped is a no-op.
pub struct Subscription {
	id: HandlerId,
	kind: String,
	dropper: Option<Arc<dyn Fn(HandlerId) + Send + Sync>>,
}

impl Subscription {
	/// Creates a subscription with a custom dropper function.
	pub fn new(id: HandlerId, kind: impl Into<String>, dropper: Arc<dyn Fn(HandlerId) + Send + Sync>) -> Self {
		Self {
			id,
			kind: kind.into(),
			dropper: Some(dropper),
		}
	}

	/// Creates a subscription that is already inactive.
	pub fn detached(kind: impl Into<String>) -> Self {
		Self {
			id: 0,
			kind: kind.into(),
			dropper: None,
		}
	}

	fn from_registry(id: HandlerId, kind: &str, registry: &Registry) -> Self {
		let weak: Weak<Mutex<HandlerMap>> = Arc::downgrade(registry);
		let owned_kind = kind.to_string();
		let dropper = Arc::new(move |id: HandlerId| {
			if let Some(registry) = weak.upgrade() {
				let mut map = registry.lock();
				if let Some(handlers) = map.get_mut(&owned_kind) {
					handlers.shift_remove(&id);
					if handlers.is_empty() {
						map.remove(&owned_kind);
					}
				}
			}
		});
		Self::new(id, kind, dropper)
	}

	/// Returns this subscription's handler ID.
	pub fn id(&self) -> HandlerId {
		self.id
	}

	/// Returns the event kind this subscription listens to.
	pub fn kind(&self) -> &str {
		&self.kind
	}

	/// Returns true until the subscription has been cancelled.
	pub fn is_active(&self) -> bool {
		self.dropper.is_some()
	}

	/// Unregisters the handler. Calling this more than once is a no-op.
	pub fn unsubscribe(&mut self) {
		if let Some(dropper) = self.dropper.take() {
			(dropper)(self.id);
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.unsubscribe();
	}
}

impl std::fmt::Debug for Subscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscription")
			.field("id", &self.id)
			.field("kind", &self.kind)
			.field("active", &self.dropper.is_some())
			.finish()
	}
}
