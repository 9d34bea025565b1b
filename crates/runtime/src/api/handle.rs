//! Cloneable façade for issuing commands to a running frame loop.

use std::collections::HashMap;

use tokio::sync::{broadcast, mpsc, oneshot};

use rotation_core::{CascadeSpec, GuardRegistry, RuleCascade};

use super::errors::{Result, RuntimeError};
use crate::events::{Event, EventBus, Topic};
use crate::workers::{Command, FrameStats};

/// Client-facing handle to interact with the frame loop
#[derive(Clone)]
pub struct FrameHandle {
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
}

impl FrameHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<Command>, event_bus: EventBus) -> Self {
        Self {
            command_tx,
            event_bus,
        }
    }

    /// Swap in a validated cascade before the next frame.
    pub async fn replace_cascade(&self, cascade: RuleCascade) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(Command::ReplaceCascade {
                cascade,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Compile `spec` against the active catalog and swap it in.
    ///
    /// On a compile error the active cascade is kept and the error returned.
    pub async fn reload(&self, spec: CascadeSpec, guards: GuardRegistry) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(Command::ReloadSpec {
                spec: Box::new(spec),
                guards,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)?
    }

    /// Frame counters so far.
    pub async fn stats(&self) -> Result<FrameStats> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(Command::QueryStats { reply: reply_tx })
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Decision` - one event per tick
    /// - `Topic::Trace` - rule traces and faults
    /// - `Topic::Execution` - commits and commit-time rejections
    /// - `Topic::Session` - activation, reload, combat start/end
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Subscribe to multiple topics at once
    pub fn subscribe_multiple(&self, topics: &[Topic]) -> HashMap<Topic, broadcast::Receiver<Event>> {
        self.event_bus.subscribe_multiple(topics)
    }

    pub(crate) async fn shutdown(&self) -> Result<()> {
        self.command_tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)
    }

    /// Get a reference to the event bus for advanced usage
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}
