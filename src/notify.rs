//! Status message surface provided by the host page.

use std::time::Duration;

use parking_lot::Mutex;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageOptions {
    /// Lets a later `remove` target this message.
    pub id: Option<String>,
    /// Auto-dismiss delay for informational messages.
    pub timeout: Option<Duration>,
}

impl MessageOptions {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            timeout: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            id: None,
            timeout: Some(timeout),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn show(&self, html: &str, options: MessageOptions);
    fn remove(&self, id: &str);
    fn clear(&self);
}

/// Writes messages to the log instead of a page.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn show(&self, html: &str, options: MessageOptions) {
        info!(id = ?options.id, timeout = ?options.timeout, message = %html, "notification");
    }

    fn remove(&self, id: &str) {
        info!(id, "notification removed");
    }

    fn clear(&self) {
        info!("notifications cleared");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub html: String,
    pub options: MessageOptions,
}

/// Keeps visible messages in memory.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    messages: Mutex<Vec<Message>>,
    history: Mutex<Vec<Message>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages currently shown, oldest first.
    pub fn visible(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    /// Every message ever shown, oldest first.
    pub fn history(&self) -> Vec<Message> {
        self.history.lock().clone()
    }
}

impl Notifier for MemoryNotifier {
    fn show(&self, html: &str, options: MessageOptions) {
        let message = Message {
            html: html.to_string(),
            options,
        };
        self.history.lock().push(message.clone());
        self.messages.lock().push(message);
    }

    fn remove(&self, id: &str) {
        self.messages
            .lock()
            .retain(|message| message.options.id.as_deref() != Some(id));
    }

    fn clear(&self) {
        self.messages.lock().clear();
    }
}
