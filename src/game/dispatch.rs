//! # Event Dispatcher
//!
//! Topic/subscriber bus decoupling the simulation from its observers.
//! Two holding policies exist: a volatile dispatcher holds weak
//! references and prunes dead subscribers on publish, which suits
//! per-encounter UI observers; a static dispatcher holds strong
//! references for singletons that outlive any one encounter, like the
//! AI adapter and the occupancy handler.
//!
//! Handlers never receive the dispatcher itself. Follow-up events are
//! returned from the handler and published after the triggering event,
//! so re-entrant publication needs no aliasing of the subscription map.

use crate::{GameEvent, GameState, Topic};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};

/// An observer of published events.
///
/// Handlers run synchronously between event pulls and may mutate the
/// game state; anything they need delivered further goes in the
/// returned follow-ups.
pub trait Subscriber {
    fn handle_event(&mut self, event: &GameEvent, state: &mut GameState) -> Vec<GameEvent>;
}

/// Shared handle to a subscriber, as held by its owner.
pub type SubscriberHandle = Rc<RefCell<dyn Subscriber>>;

/// How a dispatcher holds its subscribers by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldingPolicy {
    /// Weak references; a subscriber lives only while referenced
    /// elsewhere, and publish sweeps the dead.
    Volatile,
    /// Strong references; subscriptions persist until cleared.
    Static,
}

enum SubscriberRef {
    Weak(Weak<RefCell<dyn Subscriber>>),
    Strong(SubscriberHandle),
}

impl SubscriberRef {
    fn upgrade(&self) -> Option<SubscriberHandle> {
        match self {
            SubscriberRef::Weak(weak) => weak.upgrade(),
            SubscriberRef::Strong(strong) => Some(Rc::clone(strong)),
        }
    }
}

struct Subscription {
    id: String,
    subscriber: SubscriberRef,
}

/// Topic-keyed subscriber registry.
///
/// Delivery within a topic follows subscription insertion order.
pub struct Dispatcher {
    policy: HoldingPolicy,
    subscriptions: HashMap<Topic, Vec<Subscription>>,
}

impl Dispatcher {
    pub fn new(policy: HoldingPolicy) -> Self {
        Self {
            policy,
            subscriptions: HashMap::new(),
        }
    }

    /// A dispatcher with weak subscriber references.
    pub fn volatile() -> Self {
        Self::new(HoldingPolicy::Volatile)
    }

    /// A dispatcher with strong subscriber references.
    pub fn persistent() -> Self {
        Self::new(HoldingPolicy::Static)
    }

    /// Registers a subscriber under the dispatcher's holding policy.
    pub fn subscribe(&mut self, topic: Topic, id: impl Into<String>, subscriber: &SubscriberHandle) {
        let keep_ref = self.policy == HoldingPolicy::Static;
        self.subscribe_with(topic, id, subscriber, keep_ref);
    }

    /// Registers a subscriber with an explicit holding override.
    ///
    /// Idempotent on `(topic, id)`: re-subscribing while the existing
    /// reference is live is ignored; a stale slot is replaced.
    pub fn subscribe_with(
        &mut self,
        topic: Topic,
        id: impl Into<String>,
        subscriber: &SubscriberHandle,
        keep_ref: bool,
    ) {
        let id = id.into();
        let entries = self.subscriptions.entry(topic).or_default();

        if let Some(existing) = entries.iter_mut().find(|sub| sub.id == id) {
            if existing.subscriber.upgrade().is_some() {
                return;
            }
            existing.subscriber = Self::hold(subscriber, keep_ref);
            return;
        }

        entries.push(Subscription {
            id,
            subscriber: Self::hold(subscriber, keep_ref),
        });
    }

    fn hold(subscriber: &SubscriberHandle, keep_ref: bool) -> SubscriberRef {
        if keep_ref {
            SubscriberRef::Strong(Rc::clone(subscriber))
        } else {
            SubscriberRef::Weak(Rc::downgrade(subscriber))
        }
    }

    /// Removes the subscription with the given id from a topic.
    pub fn unsubscribe(&mut self, topic: Topic, id: &str) {
        if let Some(entries) = self.subscriptions.get_mut(&topic) {
            entries.retain(|sub| sub.id != id);
        }
    }

    /// Drops every subscription.
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }

    /// Live subscriber count for a topic; prunes nothing.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.subscriptions
            .get(&topic)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|sub| sub.subscriber.upgrade().is_some())
                    .count()
            })
            .unwrap_or(0)
    }

    /// Delivers the event to its topic's subscribers in insertion
    /// order, then any follow-ups the handlers return, breadth-first.
    /// Stale weak references encountered on the way are pruned.
    pub fn publish(&mut self, event: &GameEvent, state: &mut GameState) {
        let mut queue: VecDeque<GameEvent> = VecDeque::new();
        queue.push_back(event.clone());

        while let Some(current) = queue.pop_front() {
            let topic = current.topic();
            let Some(entries) = self.subscriptions.get_mut(&topic) else {
                continue;
            };

            let mut live: Vec<SubscriberHandle> = Vec::with_capacity(entries.len());
            entries.retain(|sub| match sub.subscriber.upgrade() {
                Some(handle) => {
                    live.push(handle);
                    true
                }
                None => false,
            });

            for handle in live {
                let follow_ups = handle.borrow_mut().handle_event(&current, state);
                queue.extend(follow_ups);
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let topics: Vec<(Topic, usize)> = self
            .subscriptions
            .iter()
            .map(|(topic, entries)| (*topic, entries.len()))
            .collect();
        f.debug_struct("Dispatcher")
            .field("policy", &self.policy)
            .field("topics", &topics)
            .finish()
    }
}
