use std::sync::Arc;

use super::Element;

/// Callback invoked when a DOM event reaches the element it was registered on.
pub type DomListener = Arc<dyn Fn(&DomEvent) + Send + Sync>;

/// Payload carried by a DOM event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventDetail {
    /// No payload (clicks, media events, fullscreen changes)
    None,

    /// Keyboard event with the `KeyboardEvent.key` value
    Key(String),

    /// Window message delivered through `postMessage`
    Message {
        /// Origin of the sending frame
        origin: String,
        /// Raw message data
        data: String,
    },
}

/// An event travelling through the headless document.
#[derive(Debug, Clone)]
pub struct DomEvent {
    /// Event type, e.g. `click` or `timeupdate`
    pub kind: String,

    /// Element the event was dispatched on
    pub target: Element,

    /// Event payload
    pub detail: EventDetail,

    /// Whether the event propagates to ancestors
    pub bubbles: bool,
}

impl DomEvent {
    /// Creates a bubbling event without payload.
    pub fn new(kind: impl Into<String>, target: &Element) -> Self {
        Self {
            kind: kind.into(),
            target: target.clone(),
            detail: EventDetail::None,
            bubbles: true,
        }
    }

    /// Attaches a payload.
    #[must_use]
    pub fn with_detail(mut self, detail: EventDetail) -> Self {
        self.detail = detail;
        self
    }

    /// Stops the event from reaching ancestors.
    #[must_use]
    pub fn non_bubbling(mut self) -> Self {
        self.bubbles = false;
        self
    }

    /// Key value of a keyboard event.
    pub fn key(&self) -> Option<&str> {
        match &self.detail {
            EventDetail::Key(key) => Some(key),
            _ => None,
        }
    }
}
