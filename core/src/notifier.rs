//! Change listeners: the presentation side of the engine.
//!
//! RULE: listeners run after commit, outside the slot lock. A failing
//! listener is logged and skipped; it never undoes an allocation.

use crate::event::ChangeEvent;
use std::sync::{Arc, Mutex};

/// The contract every change consumer fulfils.
pub trait ChangeListener: Send {
    /// Unique stable name, used in log lines.
    fn name(&self) -> &'static str;

    fn notify(&mut self, event: &ChangeEvent) -> anyhow::Result<()>;
}

/// Fan-out to registered listeners, in registration order.
#[derive(Default)]
pub struct Notifier {
    listeners: Vec<Box<dyn ChangeListener>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: Box<dyn ChangeListener>) {
        self.listeners.push(listener);
    }

    /// Best-effort delivery of every event to every listener.
    pub fn dispatch(&mut self, events: &[ChangeEvent]) {
        for event in events {
            for listener in &mut self.listeners {
                if let Err(e) = listener.notify(event) {
                    log::warn!(
                        "notify: listener {} failed on {}: {e}",
                        listener.name(),
                        event.kind()
                    );
                }
            }
        }
    }
}

/// Writes each event to the log at info level.
pub struct LogListener;

impl ChangeListener for LogListener {
    fn name(&self) -> &'static str {
        "log"
    }

    fn notify(&mut self, event: &ChangeEvent) -> anyhow::Result<()> {
        let body = serde_json::to_string(event)?;
        match event.slot_id() {
            Some(slot) => log::info!("refresh: {} slot={slot} {body}", event.kind()),
            None => log::info!("refresh: {} {body}", event.kind()),
        }
        Ok(())
    }
}

/// Collects events into a shared buffer; the handle can be read while
/// the engine owns the listener.
#[derive(Clone, Default)]
pub struct RecordingListener {
    events: Arc<Mutex<Vec<ChangeEvent>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl ChangeListener for RecordingListener {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn notify(&mut self, event: &ChangeEvent) -> anyhow::Result<()> {
        self.events
            .lock()
            .map_err(|_| anyhow::anyhow!("recording buffer poisoned"))?
            .push(event.clone());
        Ok(())
    }
}
