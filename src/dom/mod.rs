//! Headless document model.
//!
//! A minimal in-process stand-in for a browser document: an element tree
//! with classes, attributes and bubbling listeners, media element state for
//! `<audio>`/`<video>`, focus, fullscreen and a window message channel for
//! embedded frames. No layout, styling or HTML parsing.

mod document;
mod element;
mod event;
mod media;
mod selector;

pub use document::{Document, PostedMessage};
pub use element::{Element, ListenerHandle};
pub use event::{DomEvent, DomListener, EventDetail};
pub use media::{MediaElement, ReadyState};
