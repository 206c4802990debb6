//! Waiting for an element to be hydrated

use std::cell::RefCell;
use std::time::Duration;

use smol::Timer;
use weft_dom::NodeId;

use crate::page::Page;

/// Supported wait methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMethod {
    React,
}

impl WaitMethod {
    pub fn parse(name: Option<&str>) -> Option<Self> {
        match name? {
            "react" => Some(Self::React),
            _ => None,
        }
    }
}

/// How a wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Marked,
    TimedOut,
}

/// Poll `element` for a React props marker until it appears or `timeout`
/// passes. Exactly one of the two completes; the other is dropped.
pub async fn wait_for_react(
    page: &RefCell<Page>,
    element: NodeId,
    prefixes: &[String],
    poll_interval: Duration,
    timeout: Duration,
) -> WaitOutcome {
    let poll = async {
        loop {
            Timer::after(poll_interval).await;
            if page.borrow().react_props_key(element, prefixes).is_some() {
                return WaitOutcome::Marked;
            }
        }
    };
    let deadline = async {
        Timer::after(timeout).await;
        WaitOutcome::TimedOut
    };

    let outcome = smol::future::race(poll, deadline).await;
    tracing::debug!(?element, ?outcome, "wait finished");
    outcome
}
