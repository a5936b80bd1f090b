//! In-process event bus.
//!
//! Models publish state changes and views publish user intents on one
//! [`EventBus`]; the presenter subscribes to both. The event set is closed:
//! every event is a variant of [`Event`] carrying its own typed payload, and
//! every variant has a stable name (see [`EventKind::name`]) used for pattern
//! subscriptions and logs.
//!
//! # Dispatch rules
//!
//! - `publish` is synchronous. All matching handlers run to completion, in
//!   global subscription order, before `publish` returns.
//! - The handler list is snapshotted before dispatch, so a handler may
//!   subscribe, unsubscribe or publish while it runs.
//! - There is no re-entrancy guard. A handler that publishes recurses into
//!   `publish` on the same stack; an event cycle between handlers would
//!   overflow it. Handlers must only publish events that lead to a fixpoint
//!   (the checkout flow is covered by tests).
//! - Subscriptions have set semantics per key: the same handler (by pointer
//!   identity) registered twice under one key runs once.
//!
//! The bus is single-threaded (`Rc`/`RefCell`). Components never hold a
//! `RefCell` borrow of their own state across a `publish`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use larek_core::{PaymentMethod, Price, ProductId};
use regex::Regex;

use crate::models::{CartSummary, FormField, Product};

/// A subscribed callback.
pub type Handler = Rc<dyn Fn(&Event)>;

/// Discriminant of an [`Event`], used for exact subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CatalogLoaded,
    PreviewChanged,
    CartChanged,
    OrderChanged,
    CardSelect,
    CartToggle,
    BasketOpen,
    BasketRemove,
    OrderOpen,
    OrderInput,
    OrderSubmit,
    ContactsInput,
    FieldBlur,
    ContactsSubmit,
    OrderPlaced,
    OrderFailed,
    ModalOpen,
    ModalClose,
    SuccessClose,
}

impl EventKind {
    /// Stable event name, matched by [`EventKey::Pattern`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CatalogLoaded => "products:loaded",
            Self::PreviewChanged => "product:preview",
            Self::CartChanged => "cart:changed",
            Self::OrderChanged => "order:changed",
            Self::CardSelect => "card:select",
            Self::CartToggle => "preview:toggle",
            Self::BasketOpen => "basket:open",
            Self::BasketRemove => "basket:remove",
            Self::OrderOpen => "order:open",
            Self::OrderInput => "order:change",
            Self::OrderSubmit => "order:submit",
            Self::ContactsInput => "contacts:change",
            Self::FieldBlur => "form:blur",
            Self::ContactsSubmit => "contacts:submit",
            Self::OrderPlaced => "order:placed",
            Self::OrderFailed => "order:failed",
            Self::ModalOpen => "modal:open",
            Self::ModalClose => "modal:close",
            Self::SuccessClose => "success:close",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Change to the delivery step of the checkout form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryInput {
    Payment(PaymentMethod),
    Address(String),
}

/// Change to the contacts step of the checkout form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactInput {
    Email(String),
    Phone(String),
}

/// Everything that can travel over the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // Model notifications
    /// The catalog was replaced.
    CatalogLoaded(Vec<Product>),
    /// The product under inspection changed.
    PreviewChanged(Option<Product>),
    /// The cart was mutated.
    CartChanged(CartSummary),
    /// A field or error flag of the order draft changed.
    OrderChanged,
    /// An order was accepted by the API; carries the charged total.
    OrderPlaced(Price),
    /// An order submission failed; carries the user-facing message.
    OrderFailed(String),

    // User intents
    CardSelect(ProductId),
    CartToggle(ProductId),
    BasketOpen,
    BasketRemove(ProductId),
    OrderOpen,
    OrderInput(DeliveryInput),
    OrderSubmit,
    ContactsInput(ContactInput),
    FieldBlur(FormField),
    ContactsSubmit,
    ModalOpen,
    ModalClose,
    SuccessClose,
}

impl Event {
    /// The kind of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::CatalogLoaded(_) => EventKind::CatalogLoaded,
            Self::PreviewChanged(_) => EventKind::PreviewChanged,
            Self::CartChanged(_) => EventKind::CartChanged,
            Self::OrderChanged => EventKind::OrderChanged,
            Self::OrderPlaced(_) => EventKind::OrderPlaced,
            Self::OrderFailed(_) => EventKind::OrderFailed,
            Self::CardSelect(_) => EventKind::CardSelect,
            Self::CartToggle(_) => EventKind::CartToggle,
            Self::BasketOpen => EventKind::BasketOpen,
            Self::BasketRemove(_) => EventKind::BasketRemove,
            Self::OrderOpen => EventKind::OrderOpen,
            Self::OrderInput(_) => EventKind::OrderInput,
            Self::OrderSubmit => EventKind::OrderSubmit,
            Self::ContactsInput(_) => EventKind::ContactsInput,
            Self::FieldBlur(_) => EventKind::FieldBlur,
            Self::ContactsSubmit => EventKind::ContactsSubmit,
            Self::ModalOpen => EventKind::ModalOpen,
            Self::ModalClose => EventKind::ModalClose,
            Self::SuccessClose => EventKind::SuccessClose,
        }
    }

    /// The stable name of this event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.kind().name()
    }
}

/// What a subscription listens to.
#[derive(Debug, Clone)]
pub enum EventKey {
    /// Exactly one kind of event.
    Kind(EventKind),
    /// Every event whose name matches the regex.
    Pattern(Regex),
    /// Every event.
    All,
}

impl EventKey {
    /// Build a pattern key.
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regex.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self::Pattern)
    }

    /// Whether an event of `kind` is delivered to this key.
    #[must_use]
    pub fn matches(&self, kind: EventKind) -> bool {
        match self {
            Self::Kind(k) => *k == kind,
            Self::Pattern(re) => re.is_match(kind.name()),
            Self::All => true,
        }
    }
}

impl PartialEq for EventKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Kind(a), Self::Kind(b)) => a == b,
            (Self::Pattern(a), Self::Pattern(b)) => a.as_str() == b.as_str(),
            (Self::All, Self::All) => true,
            _ => false,
        }
    }
}

impl From<EventKind> for EventKey {
    fn from(kind: EventKind) -> Self {
        Self::Kind(kind)
    }
}

struct Subscription {
    key: EventKey,
    handler: Handler,
}

/// Publish/subscribe broker shared by models, views and the presenter.
///
/// Cloning is cheap and yields a handle to the same bus.
#[derive(Clone, Default)]
pub struct EventBus {
    subscriptions: Rc<RefCell<Vec<Subscription>>>,
}

impl EventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `key`.
    ///
    /// Returns `false` when this exact handler is already registered under
    /// the same key (nothing changes in that case).
    pub fn subscribe(&self, key: impl Into<EventKey>, handler: &Handler) -> bool {
        let key = key.into();
        let mut subs = self.subscriptions.borrow_mut();
        if subs
            .iter()
            .any(|s| s.key == key && Rc::ptr_eq(&s.handler, handler))
        {
            return false;
        }
        subs.push(Subscription {
            key,
            handler: Rc::clone(handler),
        });
        true
    }

    /// Remove `handler` from `key`. Returns whether it was registered.
    ///
    /// A key left without handlers is forgotten.
    pub fn unsubscribe(&self, key: impl Into<EventKey>, handler: &Handler) -> bool {
        let key = key.into();
        let mut subs = self.subscriptions.borrow_mut();
        let before = subs.len();
        subs.retain(|s| !(s.key == key && Rc::ptr_eq(&s.handler, handler)));
        subs.len() != before
    }

    /// Subscribe a closure to one kind of event and return its handler,
    /// which can later be passed to [`unsubscribe`](Self::unsubscribe).
    pub fn on(&self, kind: EventKind, f: impl Fn(&Event) + 'static) -> Handler {
        let handler: Handler = Rc::new(f);
        self.subscribe(kind, &handler);
        handler
    }

    /// Subscribe a closure to every event.
    pub fn on_all(&self, f: impl Fn(&Event) + 'static) -> Handler {
        let handler: Handler = Rc::new(f);
        self.subscribe(EventKey::All, &handler);
        handler
    }

    /// Drop every subscription.
    pub fn off_all(&self) {
        self.subscriptions.borrow_mut().clear();
    }

    /// Deliver `event` to every matching handler, in subscription order.
    pub fn publish(&self, event: Event) {
        let kind = event.kind();
        let handlers: Vec<Handler> = self
            .subscriptions
            .borrow()
            .iter()
            .filter(|s| s.key.matches(kind))
            .map(|s| Rc::clone(&s.handler))
            .collect();

        tracing::trace!(event = kind.name(), handlers = handlers.len(), "publish");

        for handler in handlers {
            handler(&event);
        }
    }

    /// Build a callback that publishes a clone of `event` each time it is
    /// invoked. Views use this to wire controls to intents.
    pub fn trigger(&self, event: Event) -> impl Fn() + 'static {
        let bus = self.clone();
        move || bus.publish(event.clone())
    }

    /// Whether any handler is registered under exactly `key`.
    #[must_use]
    pub fn has_subscribers(&self, key: &EventKey) -> bool {
        self.subscriptions.borrow().iter().any(|s| &s.key == key)
    }

    /// Total number of subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.borrow().len()
    }

    /// Whether the bus has no subscriptions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.borrow().is_empty()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;

    fn recorder(log: &Rc<RefCell<Vec<String>>>, tag: &'static str) -> Handler {
        let log = Rc::clone(log);
        Rc::new(move |e: &Event| log.borrow_mut().push(format!("{tag}:{}", e.name())))
    }

    #[test]
    fn test_exact_subscription_receives_only_its_kind() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        bus.subscribe(EventKind::BasketOpen, &recorder(&log, "a"));

        bus.publish(Event::OrderOpen);
        bus.publish(Event::BasketOpen);

        assert_eq!(*log.borrow(), vec!["a:basket:open"]);
    }

    #[test]
    fn test_handlers_run_in_subscription_order() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        bus.subscribe(EventKind::ModalOpen, &recorder(&log, "first"));
        bus.subscribe(EventKey::All, &recorder(&log, "wild"));
        bus.subscribe(EventKind::ModalOpen, &recorder(&log, "second"));

        bus.publish(Event::ModalOpen);

        assert_eq!(
            *log.borrow(),
            vec!["first:modal:open", "wild:modal:open", "second:modal:open"]
        );
    }

    #[test]
    fn test_pattern_subscription() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let key = EventKey::pattern("^order:").unwrap();
        bus.subscribe(key, &recorder(&log, "p"));

        bus.publish(Event::OrderOpen);
        bus.publish(Event::ContactsSubmit);
        bus.publish(Event::OrderSubmit);

        assert_eq!(*log.borrow(), vec!["p:order:open", "p:order:submit"]);
    }

    #[test]
    fn test_wildcard_sees_event_name_and_payload() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.on_all(move |e| sink.borrow_mut().push((e.name(), e.clone())));

        bus.publish(Event::BasketRemove(ProductId::new("a")));

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "basket:remove");
        assert_eq!(seen[0].1, Event::BasketRemove(ProductId::new("a")));
    }

    #[test]
    fn test_duplicate_subscription_runs_once() {
        let bus = EventBus::new();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let handler: Handler = Rc::new(move |_| counter.set(counter.get() + 1));

        assert!(bus.subscribe(EventKind::OrderSubmit, &handler));
        assert!(!bus.subscribe(EventKind::OrderSubmit, &handler));
        bus.publish(Event::OrderSubmit);

        assert_eq!(calls.get(), 1);
        assert_eq!(bus.len(), 1);
    }

    #[test]
    fn test_same_handler_under_two_keys_runs_for_each() {
        let bus = EventBus::new();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let handler: Handler = Rc::new(move |_| counter.set(counter.get() + 1));

        bus.subscribe(EventKind::OrderSubmit, &handler);
        bus.subscribe(EventKey::All, &handler);
        bus.publish(Event::OrderSubmit);

        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_unsubscribe_drops_empty_key() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = recorder(&log, "a");
        let b = recorder(&log, "b");
        bus.subscribe(EventKind::ModalClose, &a);
        bus.subscribe(EventKind::ModalClose, &b);

        assert!(bus.unsubscribe(EventKind::ModalClose, &a));
        assert!(bus.has_subscribers(&EventKey::Kind(EventKind::ModalClose)));
        assert!(bus.unsubscribe(EventKind::ModalClose, &b));
        assert!(!bus.has_subscribers(&EventKey::Kind(EventKind::ModalClose)));
        assert!(!bus.unsubscribe(EventKind::ModalClose, &b));

        bus.publish(Event::ModalClose);
        assert!(log.borrow().is_empty());
        assert!(bus.is_empty());
    }

    #[test]
    fn test_off_all() {
        let bus = EventBus::new();
        bus.on(EventKind::BasketOpen, |_| {});
        bus.on_all(|_| {});
        bus.off_all();
        assert!(bus.is_empty());
    }

    #[test]
    fn test_trigger_publishes_on_each_call() {
        let bus = EventBus::new();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        bus.on(EventKind::SuccessClose, move |_| counter.set(counter.get() + 1));

        let close = bus.trigger(Event::SuccessClose);
        close();
        close();

        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_handler_may_publish_and_subscribe_while_dispatching() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner_bus = bus.clone();
        let inner_log = Rc::clone(&log);
        bus.on(EventKind::OrderSubmit, move |_| {
            inner_log.borrow_mut().push("submit");
            let late_log = Rc::clone(&inner_log);
            inner_bus.on(EventKind::OrderChanged, move |_| late_log.borrow_mut().push("late"));
            inner_bus.publish(Event::OrderChanged);
        });

        bus.publish(Event::OrderSubmit);

        // The nested publish ran synchronously and already saw the new handler.
        assert_eq!(*log.borrow(), vec!["submit", "late"]);
    }

    #[test]
    fn test_unsubscribing_during_dispatch_keeps_snapshot() {
        let bus = EventBus::new();
        let calls = Rc::new(Cell::new(0));

        let counter = Rc::clone(&calls);
        let second: Handler = Rc::new(move |_| counter.set(counter.get() + 1));
        let remover_bus = bus.clone();
        let target = Rc::clone(&second);
        bus.on(EventKind::BasketOpen, move |_| {
            remover_bus.unsubscribe(EventKind::BasketOpen, &target);
        });
        bus.subscribe(EventKind::BasketOpen, &second);

        bus.publish(Event::BasketOpen);
        assert_eq!(calls.get(), 1);
        bus.publish(Event::BasketOpen);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_pattern_keys_compare_by_source() {
        assert_eq!(
            EventKey::pattern("^cart:").unwrap(),
            EventKey::pattern("^cart:").unwrap()
        );
        assert_ne!(EventKey::pattern("^cart:").unwrap(), EventKey::All);
        assert!(EventKey::pattern("(").is_err());
    }
}
