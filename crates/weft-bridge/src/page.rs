//! The page the bridge runs in
//!
//! A [`Page`] is a document plus the window-level state scripts would see:
//! which globals exist, what listeners are bound, and the window's message
//! queue that replies are posted to.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::Value;
use smol::channel::{self, Receiver, Sender};
use weft_dom::{Dispatcher, Document, DomTree, EventInit, EventInterface, NodeId, SyntheticEvent};

use crate::message::{Outbound, Reply, WindowId};
use crate::track::Tracker;
use crate::FillError;

pub struct Page {
    document: Document,
    window: WindowId,
    globals: BTreeSet<String>,
    trackers: Vec<Tracker>,
    /// Payloads thrown by jQuery handlers, keyed by element and event type
    jquery_faults: HashMap<(NodeId, String), Value>,
    outbox: Sender<Outbound>,
    inbox: Receiver<Outbound>,
}

impl Page {
    pub fn new(document: Document) -> Self {
        let (outbox, inbox) = channel::unbounded();
        Self {
            document,
            window: WindowId::default(),
            globals: BTreeSet::new(),
            trackers: Vec::new(),
            jquery_faults: HashMap::new(),
            outbox,
            inbox,
        }
    }

    /// Same page, hosted in window `window`
    pub fn with_window(mut self, window: WindowId) -> Self {
        self.window = window;
        self
    }

    pub fn window(&self) -> WindowId {
        self.window
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn tree(&self) -> &DomTree {
        self.document.tree()
    }

    pub fn tree_mut(&mut self) -> &mut DomTree {
        self.document.tree_mut()
    }

    /// Expose a script global such as `jQuery`
    pub fn define_global(&mut self, name: &str) {
        self.globals.insert(name.to_string());
    }

    pub fn has_global(&self, name: &str) -> bool {
        self.globals.contains(name)
    }

    /// Attach a React props object to `node` with the given handlers
    pub fn set_react_props<I, S>(
        &mut self,
        node: NodeId,
        key: &str,
        handlers: I,
    ) -> Result<(), FillError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tree_mut().set_expando(node, key, handlers)?;
        Ok(())
    }

    /// First own property of `node` starting with one of `prefixes`
    pub fn react_props_key(&self, node: NodeId, prefixes: &[String]) -> Option<String> {
        self.tree()
            .expando_keys(node)
            .into_iter()
            .find(|key| prefixes.iter().any(|p| key.starts_with(p.as_str())))
            .map(str::to_string)
    }

    /// Make every jQuery trigger of `event_type` on `node` throw `payload`
    pub fn set_jquery_fault(&mut self, node: NodeId, event_type: &str, payload: Value) {
        self.jquery_faults.insert((node, event_type.to_string()), payload);
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Deliver an event, running any listeners bound to it
    pub fn dispatch(&mut self, event: SyntheticEvent) {
        let target = event.target;
        let is_change = event.event_type == "change";
        self.tree_mut().dispatch(event);

        if is_change {
            let updates: Vec<Outbound> = self
                .trackers
                .iter()
                .filter(|t| t.input == target)
                .map(|t| Outbound {
                    action: t.action.clone(),
                    reply: Reply::TrackUpdate(t.update(self.document.tree())),
                })
                .collect();
            for update in updates {
                self.post(update);
            }
        }
    }

    /// `dispatchEvent` with a fresh event
    pub fn fire(
        &mut self,
        node: NodeId,
        event_type: &str,
        interface: EventInterface,
        init: &EventInit,
    ) {
        self.dispatch(SyntheticEvent::native(event_type, interface, node, init));
    }

    /// `element.focus()`
    pub fn focus(&mut self, node: NodeId, init: &EventInit) {
        self.tree_mut().focus(node);
        self.fire(node, "focus", EventInterface::FocusEvent, init);
    }

    /// `element.blur()`
    pub fn blur(&mut self, node: NodeId, init: &EventInit) {
        self.tree_mut().blur(node);
        self.fire(node, "blur", EventInterface::FocusEvent, init);
    }

    /// `element.click()`
    pub fn click(&mut self, node: NodeId, init: &EventInit) {
        self.fire(node, "click", EventInterface::MouseEvent, init);
    }

    /// Call a handler on the element's React props object
    pub fn invoke_handler(
        &mut self,
        node: NodeId,
        prop_key: &str,
        handler: &str,
        event_type: &str,
        interface: EventInterface,
        init: &EventInit,
    ) {
        let dispatcher = Dispatcher::Handler {
            prop_key: prop_key.to_string(),
            handler: handler.to_string(),
        };
        let event = SyntheticEvent::native(event_type, interface, node, init).via(dispatcher);
        self.tree_mut().dispatch(event);
    }

    /// `jQuery(node).trigger(event)`; fails if a bound handler throws
    pub fn jquery_trigger(
        &mut self,
        node: NodeId,
        event_type: &str,
        init: &EventInit,
        assigned: BTreeMap<String, String>,
    ) -> Result<(), FillError> {
        let event = SyntheticEvent::native(event_type, EventInterface::Event, node, init)
            .via(Dispatcher::JQuery { assigned });
        self.dispatch(event);
        match self.jquery_faults.get(&(node, event_type.to_string())) {
            Some(payload) => Err(FillError::Thrown(payload.clone())),
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Listeners and messages
    // ------------------------------------------------------------------

    /// Bind a change tracker, replacing any bound under the same namespace
    pub fn install_tracker(&mut self, tracker: Tracker) {
        self.trackers
            .retain(|t| !(t.input == tracker.input && t.namespace == tracker.namespace));
        self.trackers.push(tracker);
    }

    pub fn trackers(&self) -> &[Tracker] {
        &self.trackers
    }

    /// `window.postMessage(message, "*")`
    pub fn post(&self, message: Outbound) {
        tracing::debug!(action = %message.action, "post");
        if self.outbox.try_send(message).is_err() {
            tracing::warn!("message queue closed, reply dropped");
        }
    }

    /// Messages posted to this window, oldest first
    pub fn messages(&self) -> Receiver<Outbound> {
        self.inbox.clone()
    }

    /// Drain every message posted so far
    pub fn take_messages(&self) -> Vec<Outbound> {
        let mut out = Vec::new();
        while let Ok(message) = self.inbox.try_recv() {
            out.push(message);
        }
        out
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("url", &self.document.url())
            .field("window", &self.window)
            .field("globals", &self.globals)
            .field("trackers", &self.trackers.len())
            .finish()
    }
}
