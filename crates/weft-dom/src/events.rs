//! Synthetic Events
//!
//! Events dispatched by automation are recorded, in order, in the tree's
//! [`EventLog`]. There is no listener propagation here; observers read the
//! log or are notified by whoever dispatched.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::NodeId;

/// Event constructor the event was created with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventInterface {
    Event,
    FocusEvent,
    MouseEvent,
    KeyboardEvent,
    InputEvent,
    CustomEvent,
}

/// Event init dictionary
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventInit {
    pub bubbles: bool,
    pub cancelable: bool,
    pub composed: bool,
    pub key: Option<String>,
    pub code: Option<String>,
    pub key_code: Option<u32>,
    pub repeat: Option<u32>,
}

impl EventInit {
    /// Whether the init carries key information
    pub fn has_key(&self) -> bool {
        self.key.is_some() || self.key_code.is_some()
    }
}

/// Who delivered the event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatcher {
    /// `dispatchEvent` on the element
    Native,
    /// jQuery `trigger`, with properties assigned onto the event object
    JQuery { assigned: BTreeMap<String, String> },
    /// Direct call of a framework handler from the element's props object
    Handler { prop_key: String, handler: String },
}

/// A dispatched synthetic event
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticEvent {
    pub event_type: String,
    pub interface: EventInterface,
    pub target: NodeId,
    pub init: EventInit,
    pub dispatcher: Dispatcher,
}

impl SyntheticEvent {
    /// Natively dispatched event
    pub fn native(
        event_type: &str,
        interface: EventInterface,
        target: NodeId,
        init: &EventInit,
    ) -> Self {
        Self {
            event_type: event_type.to_string(),
            interface,
            target,
            init: init.clone(),
            dispatcher: Dispatcher::Native,
        }
    }

    /// Same event, delivered by a different dispatcher
    pub fn via(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }
}

/// Log entry
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchedEvent {
    pub seq: u64,
    pub event: SyntheticEvent,
}

/// Ordered record of dispatched events
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Vec<DispatchedEvent>,
    next_seq: u64,
}

impl EventLog {
    pub(crate) fn record(&mut self, event: SyntheticEvent) {
        self.entries.push(DispatchedEvent { seq: self.next_seq, event });
        self.next_seq += 1;
    }

    /// All entries, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &DispatchedEvent> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Event types dispatched natively on `target`, in order
    pub fn native_types(&self, target: NodeId) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.event.target == target && e.event.dispatcher == Dispatcher::Native)
            .map(|e| e.event.event_type.as_str())
            .collect()
    }

    /// Event types delivered to `target` by any dispatcher, in order
    pub fn types(&self, target: NodeId) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.event.target == target)
            .map(|e| e.event.event_type.as_str())
            .collect()
    }

    /// Framework handlers invoked on `target`, in order
    pub fn handlers(&self, target: NodeId) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.event.target == target)
            .filter_map(|e| match &e.event.dispatcher {
                Dispatcher::Handler { handler, .. } => Some(handler.as_str()),
                _ => None,
            })
            .collect()
    }
}
