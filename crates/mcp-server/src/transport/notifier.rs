//! Server-initiated messages for a session's notification stream

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use serde_json::{json, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::error::TransportError;
use crate::protocol::{LoggingLevel, LoggingMessageParams, McpMessage};

/// Handle for pushing messages onto the session's open stream
///
/// At most one stream is attached at a time. A stream whose receiver was
/// dropped (the client disconnected) frees the slot.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

struct NotifierInner {
    stream: Mutex<Option<UnboundedSender<McpMessage>>>,
    level: AtomicU8,
}

impl Default for Notifier {
    fn default() -> Self {
        Self {
            inner: Arc::new(NotifierInner {
                stream: Mutex::new(None),
                level: AtomicU8::new(LoggingLevel::Info as u8),
            }),
        }
    }
}

impl Notifier {
    /// Attach a new stream
    pub fn attach(&self) -> Result<UnboundedReceiver<McpMessage>, TransportError> {
        let mut stream = self.inner.stream.lock().unwrap_or_else(PoisonError::into_inner);

        if stream.as_ref().is_some_and(|tx| !tx.is_closed()) {
            return Err(TransportError::StreamConflict);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *stream = Some(tx);
        debug!("Notification stream attached");
        Ok(rx)
    }

    /// Drop the stream sender, ending the stream
    pub fn detach(&self) {
        let mut stream = self.inner.stream.lock().unwrap_or_else(PoisonError::into_inner);
        if stream.take().is_some() {
            debug!("Notification stream detached");
        }
    }

    /// Whether a live stream is attached
    pub fn has_stream(&self) -> bool {
        let stream = self.inner.stream.lock().unwrap_or_else(PoisonError::into_inner);
        stream.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Push a message; returns false when no stream received it
    pub fn send(&self, message: McpMessage) -> bool {
        let stream = self.inner.stream.lock().unwrap_or_else(PoisonError::into_inner);
        match stream.as_ref() {
            Some(tx) => tx.send(message).is_ok(),
            None => false,
        }
    }

    /// Minimum level forwarded by [`Notifier::log`]
    pub fn set_level(&self, level: LoggingLevel) {
        self.inner.level.store(level as u8, Ordering::Relaxed);
    }

    pub fn level(&self) -> LoggingLevel {
        level_from_u8(self.inner.level.load(Ordering::Relaxed))
    }

    /// Send a `notifications/message` if `level` passes the session's filter
    pub fn log(&self, level: LoggingLevel, logger: &str, data: Value) -> bool {
        if level < self.level() {
            return false;
        }

        let params = LoggingMessageParams {
            level,
            logger: Some(logger.to_string()),
            data,
        };
        let params = serde_json::to_value(params).unwrap_or_else(|e| json!({ "error": e.to_string() }));
        self.send(McpMessage::notification("notifications/message", Some(params)))
    }
}

fn level_from_u8(value: u8) -> LoggingLevel {
    match value {
        0 => LoggingLevel::Debug,
        1 => LoggingLevel::Info,
        2 => LoggingLevel::Notice,
        3 => LoggingLevel::Warning,
        4 => LoggingLevel::Error,
        5 => LoggingLevel::Critical,
        6 => LoggingLevel::Alert,
        _ => LoggingLevel::Emergency,
    }
}
