use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tracing::debug;

use super::{
    element::Element,
    event::{DomEvent, EventDetail},
};
use crate::common::{read, write};

const POSTED_MESSAGE_CAPACITY: usize = 64;

/// A message a page posted into an embedded frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PostedMessage {
    /// Origin the message is addressed to
    pub target_origin: String,
    /// Serialized payload
    pub data: String,
}

struct DocumentInner {
    root: Element,
    body: Element,
    active_element: RwLock<Option<Element>>,
    fullscreen_supported: bool,
    fullscreen_element: RwLock<Option<Element>>,
    posted: broadcast::Sender<PostedMessage>,
}

/// The headless document a player lives in.
///
/// Owns the element tree, focus, the fullscreen capability and the window
/// message channel used by embedded players. Cloning shares the document.
#[derive(Clone)]
pub struct Document {
    inner: Arc<DocumentInner>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates a document whose runtime supports fullscreen.
    pub fn new() -> Self {
        Self::build(true)
    }

    /// Creates a document without fullscreen support.
    pub fn without_fullscreen() -> Self {
        Self::build(false)
    }

    fn build(fullscreen_supported: bool) -> Self {
        let root = Element::document_root();
        let html = Element::new("html");
        let body = Element::new("body");
        html.append_child(&body);
        root.append_child(&html);

        let (posted, _) = broadcast::channel(POSTED_MESSAGE_CAPACITY);

        Self {
            inner: Arc::new(DocumentInner {
                root,
                body,
                active_element: RwLock::new(None),
                fullscreen_supported,
                fullscreen_element: RwLock::new(None),
                posted,
            }),
        }
    }

    /// The document node; target of document-level events.
    pub fn root(&self) -> &Element {
        &self.inner.root
    }

    /// The `<body>` element.
    pub fn body(&self) -> &Element {
        &self.inner.body
    }

    /// First element in the document matching `selector`.
    pub fn query_selector(&self, selector: &str) -> Option<Element> {
        self.inner.root.query_selector(selector)
    }

    /// Currently focused element.
    pub fn active_element(&self) -> Option<Element> {
        read(&self.inner.active_element).clone()
    }

    /// Moves focus to `element`.
    pub fn focus(&self, element: &Element) {
        *write(&self.inner.active_element) = Some(element.clone());
    }

    /// Clears focus.
    pub fn blur(&self) {
        *write(&self.inner.active_element) = None;
    }

    /// Whether the runtime exposes a fullscreen API.
    pub fn fullscreen_supported(&self) -> bool {
        self.inner.fullscreen_supported
    }

    /// Element currently presented fullscreen.
    pub fn fullscreen_element(&self) -> Option<Element> {
        read(&self.inner.fullscreen_element).clone()
    }

    /// Presents `element` fullscreen. Returns `false` when unsupported.
    pub fn request_fullscreen(&self, element: &Element) -> bool {
        if !self.inner.fullscreen_supported {
            return false;
        }

        *write(&self.inner.fullscreen_element) = Some(element.clone());
        self.fire_fullscreen_change();
        true
    }

    /// Leaves fullscreen. Does nothing when no element is fullscreen.
    pub fn exit_fullscreen(&self) {
        let previous = write(&self.inner.fullscreen_element).take();
        if previous.is_some() {
            self.fire_fullscreen_change();
        }
    }

    fn fire_fullscreen_change(&self) {
        debug!(
            fullscreen = self.fullscreen_element().is_some(),
            "fullscreen changed"
        );
        self.inner
            .root
            .dispatch_event(DomEvent::new("fullscreenchange", &self.inner.root));
    }

    /// Simulates a key press.
    ///
    /// Escape leaves fullscreen first, as the platform does, then the
    /// `keydown` event is dispatched on the focused element or the root.
    pub fn key_down(&self, key: &str) {
        if key == "Escape" && self.fullscreen_element().is_some() {
            self.exit_fullscreen();
        }

        let target = self
            .active_element()
            .filter(Element::is_connected)
            .unwrap_or_else(|| self.inner.root.clone());

        target.dispatch_event(
            DomEvent::new("keydown", &target).with_detail(EventDetail::Key(key.to_string())),
        );
    }

    /// Posts `data` towards an embedded frame at `target_origin`.
    pub fn post_message(&self, target_origin: &str, data: String) {
        let message = PostedMessage {
            target_origin: target_origin.to_string(),
            data,
        };

        if self.inner.posted.send(message).is_err() {
            debug!(target_origin, "posted message has no receiver");
        }
    }

    /// Receiver for every message posted into embedded frames.
    pub fn subscribe_posted(&self) -> broadcast::Receiver<PostedMessage> {
        self.inner.posted.subscribe()
    }

    /// Delivers a message from an embedded frame as a window `message` event.
    pub fn receive_message(&self, origin: &str, data: &str) {
        let event = DomEvent::new("message", &self.inner.root)
            .with_detail(EventDetail::Message {
                origin: origin.to_string(),
                data: data.to_string(),
            })
            .non_bubbling();
        self.inner.root.dispatch_event(event);
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("fullscreen_supported", &self.inner.fullscreen_supported)
            .field("fullscreen", &self.fullscreen_element().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn query_selector_searches_body() {
        let document = Document::new();
        let video = Element::new("video").with_attribute("id", "clip");
        document.body().append_child(&video);

        let found = document.query_selector("#clip");

        assert!(found.is_some_and(|found| found.ptr_eq(&video)));
        assert!(video.is_connected());
    }

    #[test]
    fn fullscreen_unsupported_is_refused() {
        let document = Document::without_fullscreen();
        let element = Element::new("div");
        document.body().append_child(&element);

        assert!(!document.request_fullscreen(&element));
        assert!(document.fullscreen_element().is_none());
    }

    #[test]
    fn escape_exits_fullscreen_before_keydown() {
        let document = Document::new();
        let element = Element::new("div");
        document.body().append_child(&element);
        document.request_fullscreen(&element);

        let changes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&changes);
        document.root().add_event_listener("fullscreenchange", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let observer = document.clone();
        let saw_exit = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&saw_exit);
        document.root().add_event_listener("keydown", move |event| {
            if event.key() == Some("Escape") && observer.fullscreen_element().is_none() {
                flag.fetch_add(1, Ordering::SeqCst);
            }
        });

        document.key_down("Escape");

        assert_eq!(changes.load(Ordering::SeqCst), 1);
        assert_eq!(saw_exit.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn keydown_bubbles_from_focused_element() {
        let document = Document::new();
        let container = Element::new("div");
        let button = Element::new("button");
        container.append_child(&button);
        document.body().append_child(&container);
        document.focus(&button);

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        document.root().add_event_listener("keydown", move |event| {
            if event.target.tag() == "button" {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        document.key_down(" ");

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn posted_messages_reach_subscribers() {
        let document = Document::new();
        let mut receiver = document.subscribe_posted();

        document.post_message("https://player.vimeo.com", r#"{"method":"play"}"#.into());

        let message = receiver.recv().await;
        assert_eq!(
            message.ok().map(|m| m.target_origin),
            Some("https://player.vimeo.com".to_string())
        );
    }
}
