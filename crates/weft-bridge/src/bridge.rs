//! Message dispatch
//!
//! [`Bridge`] receives window messages, decodes the ones addressed to it and
//! answers each with at most one reply. Every message is handled as its own
//! task; tasks only meet in the page, which none of them borrows across a
//! suspension point.

use std::cell::RefCell;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use smol::channel::Receiver;
use smol::{LocalExecutor, Task};
use weft_locate::{accept_all, ElementResolver};

use crate::fill::{self, FillContext, FillOutcome};
use crate::message::{
    Envelope, FillReply, FillRequest, FillStatus, Outbound, Reply, RequestKind, TrackReply,
    TrackRequest, TrackStatus, WaitReply, WaitRequest, WaitStatus,
};
use crate::page::Page;
use crate::revive::revive;
use crate::track::{self, TrackMethod};
use crate::wait::{self, WaitMethod};
use crate::{BridgeConfig, BridgeError, ConfigError, FillError};

pub struct Bridge {
    config: BridgeConfig,
    page: Rc<RefCell<Page>>,
    resolver: ElementResolver,
}

impl Bridge {
    /// Bridge for `page`; fails if `config` does not validate
    pub fn new(page: Page, config: BridgeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, page: Rc::new(RefCell::new(page)), resolver: ElementResolver::new() })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn page(&self) -> &Rc<RefCell<Page>> {
        &self.page
    }

    /// Handle every message from `inbound` until the channel closes, each
    /// on its own task. Returns once every task has finished.
    pub async fn serve(&self, inbound: Receiver<Envelope>) {
        let executor = LocalExecutor::new();
        executor
            .run(async {
                let mut tasks = InFlight::new();
                while let Ok(envelope) = inbound.recv().await {
                    tasks.push(executor.spawn(self.handle(envelope)));
                }
                tasks.join().await;
            })
            .await;
    }

    /// Handle one window message
    pub async fn handle(&self, envelope: Envelope) {
        let window = self.page.borrow().window();
        if envelope.source != window {
            tracing::trace!(source = ?envelope.source, "ignoring message from another window");
            return;
        }
        let kind = envelope.action().and_then(|a| RequestKind::from_action(a, &self.config));
        let Some(kind) = kind else {
            tracing::trace!(action = ?envelope.action(), "ignoring message");
            return;
        };

        let data = revive(envelope.data);
        let result = match kind {
            RequestKind::Fill => self.handle_fill(data).await,
            RequestKind::Track => self.handle_track(data),
            RequestKind::WaitFor => self.handle_wait(data).await,
        };
        if let Err(err) = result {
            tracing::warn!(?kind, %err, "dropping undecodable request");
        }
    }

    async fn handle_fill(&self, data: Value) -> Result<(), BridgeError> {
        let request: FillRequest = decode(data)?;
        let (element, value_element) = {
            let page = self.page.borrow();
            let tree = page.tree();
            let element = self
                .resolver
                .locate(tree, &request.found_input.found_element, &accept_all)
                .map(|r| r.node);
            let value_element = request
                .found_value_element
                .as_ref()
                .and_then(|d| self.resolver.locate(tree, d, &accept_all))
                .map(|r| r.node);
            (element, value_element)
        };

        let ctx = FillContext::new(&request, element, value_element);
        let (status, message) = match fill::fill(&self.page, &self.config, &ctx).await {
            Ok(FillOutcome::Filled) => (FillStatus::Filled, None),
            Ok(FillOutcome::Skipped(message)) => (FillStatus::Skipped, Some(message)),
            Ok(FillOutcome::NotConfirmed) => {
                (FillStatus::Error, Some("Fill could not be confirmed".to_string()))
            }
            Err(err) => {
                tracing::warn!(%err, "fill failed");
                (FillStatus::Error, Some(err.to_string()))
            }
        };

        self.reply(
            RequestKind::Fill,
            Reply::Fill(FillReply { key_path: request.found_input.key_path, status, message }),
        );
        Ok(())
    }

    fn handle_track(&self, data: Value) -> Result<(), BridgeError> {
        let request: TrackRequest = decode(data)?;
        let Some(TrackMethod::JQuery) = TrackMethod::parse(request.method.as_deref()) else {
            tracing::debug!(method = ?request.method, "unsupported track method");
            return Ok(());
        };

        let label_text = request.tracked_input.label_text;
        let result = track::track(
            &mut self.page.borrow_mut(),
            &self.resolver,
            &self.config,
            &request.found_tracked_input,
            &label_text,
        );
        let (status, message) = match result {
            Ok(()) => (TrackStatus::Tracking, None),
            Err(err) => {
                tracing::warn!(%err, label = %label_text, "track failed");
                (TrackStatus::Error, Some(err.to_string()))
            }
        };
        self.reply(RequestKind::Track, Reply::Track(TrackReply { label_text, status, message }));
        Ok(())
    }

    async fn handle_wait(&self, data: Value) -> Result<(), BridgeError> {
        let request: WaitRequest = decode(data)?;
        let Some(WaitMethod::React) = WaitMethod::parse(request.method.as_deref()) else {
            tracing::debug!(method = ?request.method, "unsupported wait method");
            return Ok(());
        };

        let element = {
            let page = self.page.borrow();
            self.resolver.locate(page.tree(), &request.found_element, &accept_all).map(|r| r.node)
        };
        let reply = match element {
            Some(element) => {
                wait::wait_for_react(
                    &self.page,
                    element,
                    &self.config.react_marker_prefixes,
                    self.config.poll_interval(),
                    self.config.wait_timeout(request.time),
                )
                .await;
                WaitReply { status: WaitStatus::Success, message: None }
            }
            None => WaitReply {
                status: WaitStatus::Error,
                message: Some(FillError::ElementNotFound.to_string()),
            },
        };
        self.reply(RequestKind::WaitFor, Reply::Wait(reply));
        Ok(())
    }

    fn reply(&self, kind: RequestKind, reply: Reply) {
        let message = Outbound { action: kind.reply_action(&self.config), reply };
        self.page.borrow().post(message);
    }
}

fn decode<T: DeserializeOwned>(data: Value) -> Result<T, BridgeError> {
    Ok(serde_json::from_value(data)?)
}

/// Handles of running tasks. Finished ones are dropped as new ones arrive.
struct InFlight<T> {
    tasks: Vec<Task<T>>,
}

impl<T> InFlight<T> {
    fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    fn push(&mut self, task: Task<T>) {
        self.tasks.retain(|task| !task.is_finished());
        self.tasks.push(task);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.tasks.len()
    }

    async fn join(self) {
        for task in self.tasks {
            task.await;
        }
    }
}
