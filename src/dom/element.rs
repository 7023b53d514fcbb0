use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, Mutex, RwLock, Weak},
};

use super::{
    event::{DomEvent, DomListener},
    media::MediaState,
    selector::Selector,
};
use crate::common::{lock, read, write};

pub(crate) const DOCUMENT_TAG: &str = "#document";

struct RegisteredListener {
    id: u64,
    kind: String,
    callback: DomListener,
}

struct Node {
    tag: String,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    text: String,
    children: Vec<Element>,
    parent: Weak<RwLock<Node>>,
    listeners: Vec<RegisteredListener>,
    next_listener_id: u64,
    media: Option<Arc<Mutex<MediaState>>>,
}

/// A node of the headless document tree.
///
/// Cloning an `Element` yields another handle to the same node.
#[derive(Clone)]
pub struct Element {
    node: Arc<RwLock<Node>>,
}

/// Registration returned by [`Element::add_event_listener`].
///
/// Dropping the handle keeps the listener registered; call
/// [`ListenerHandle::detach`] to remove it.
#[derive(Clone)]
pub struct ListenerHandle {
    node: Weak<RwLock<Node>>,
    id: u64,
}

impl ListenerHandle {
    /// Removes the listener from its element. Detaching twice is harmless.
    pub fn detach(&self) {
        if let Some(node) = self.node.upgrade() {
            write(&node).listeners.retain(|listener| listener.id != self.id);
        }
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("id", &self.id)
            .field("attached", &(self.node.strong_count() > 0))
            .finish()
    }
}

impl Element {
    /// Creates a detached element. `audio` and `video` elements carry media state.
    pub fn new(tag: &str) -> Self {
        let tag = tag.to_ascii_lowercase();
        let media = matches!(tag.as_str(), "audio" | "video")
            .then(|| Arc::new(Mutex::new(MediaState::default())));

        Self {
            node: Arc::new(RwLock::new(Node {
                tag,
                classes: Vec::new(),
                attributes: BTreeMap::new(),
                text: String::new(),
                children: Vec::new(),
                parent: Weak::new(),
                listeners: Vec::new(),
                next_listener_id: 0,
                media,
            })),
        }
    }

    pub(crate) fn document_root() -> Self {
        Self::new(DOCUMENT_TAG)
    }

    /// Builder variant of [`Element::add_class`]; accepts space separated names.
    #[must_use]
    pub fn with_class(self, classes: &str) -> Self {
        for class in classes.split_whitespace() {
            self.add_class(class);
        }
        self
    }

    /// Builder variant of [`Element::set_attribute`].
    #[must_use]
    pub fn with_attribute(self, name: &str, value: &str) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder variant of [`Element::set_text`].
    #[must_use]
    pub fn with_text(self, text: &str) -> Self {
        self.set_text(text);
        self
    }

    /// Lowercase tag name.
    pub fn tag(&self) -> String {
        read(&self.node).tag.clone()
    }

    /// Class list in insertion order.
    pub fn classes(&self) -> Vec<String> {
        read(&self.node).classes.clone()
    }

    /// Whether the class list contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        read(&self.node).classes.iter().any(|c| c == class)
    }

    /// Adds `class` unless present.
    pub fn add_class(&self, class: &str) {
        let mut node = write(&self.node);
        if !node.classes.iter().any(|c| c == class) {
            node.classes.push(class.to_string());
        }
    }

    /// Removes `class` if present.
    pub fn remove_class(&self, class: &str) {
        write(&self.node).classes.retain(|c| c != class);
    }

    /// Adds or removes `class` depending on `force`.
    pub fn toggle_class(&self, class: &str, force: bool) {
        if force {
            self.add_class(class);
        } else {
            self.remove_class(class);
        }
    }

    /// Swaps `from` for `to` in place. Does nothing when `from` is absent.
    pub fn replace_class(&self, from: &str, to: &str) {
        let mut node = write(&self.node);
        let Some(index) = node.classes.iter().position(|c| c == from) else {
            return;
        };

        if node.classes.iter().any(|c| c == to) {
            node.classes.remove(index);
        } else {
            node.classes[index] = to.to_string();
        }
    }

    /// Attribute value, if set.
    pub fn attribute(&self, name: &str) -> Option<String> {
        read(&self.node).attributes.get(name).cloned()
    }

    /// Whether the attribute is present, regardless of value.
    pub fn has_attribute(&self, name: &str) -> bool {
        read(&self.node).attributes.contains_key(name)
    }

    /// Sets or overwrites an attribute.
    pub fn set_attribute(&self, name: &str, value: &str) {
        write(&self.node)
            .attributes
            .insert(name.to_string(), value.to_string());
    }

    /// Removes an attribute if present.
    pub fn remove_attribute(&self, name: &str) {
        write(&self.node).attributes.remove(name);
    }

    /// Text content of this node (children excluded).
    pub fn text(&self) -> String {
        read(&self.node).text.clone()
    }

    /// Replaces the text content.
    pub fn set_text(&self, text: &str) {
        write(&self.node).text = text.to_string();
    }

    /// Appends `child`, moving it out of its previous parent.
    pub fn append_child(&self, child: &Element) {
        child.remove();
        write(&child.node).parent = Arc::downgrade(&self.node);
        write(&self.node).children.push(child.clone());
    }

    /// Detaches this element from its parent.
    pub fn remove(&self) {
        let Some(parent) = self.parent() else {
            return;
        };

        write(&parent.node)
            .children
            .retain(|child| !child.ptr_eq(self));
        write(&self.node).parent = Weak::new();
    }

    /// Puts `replacement` at this element's position and detaches this element.
    ///
    /// A detached element has no position, so only the replacement is
    /// detached from wherever it was.
    pub fn replace_with(&self, replacement: &Element) {
        replacement.remove();

        let Some(parent) = self.parent() else {
            return;
        };

        {
            let mut parent_node = write(&parent.node);
            let Some(index) = parent_node
                .children
                .iter()
                .position(|child| child.ptr_eq(self))
            else {
                return;
            };
            parent_node.children[index] = replacement.clone();
        }

        write(&replacement.node).parent = Arc::downgrade(&parent.node);
        write(&self.node).parent = Weak::new();
    }

    /// Parent element, if attached.
    pub fn parent(&self) -> Option<Element> {
        read(&self.node)
            .parent
            .upgrade()
            .map(|node| Element { node })
    }

    /// Direct children in document order.
    pub fn children(&self) -> Vec<Element> {
        read(&self.node).children.clone()
    }

    /// Whether `other` is this element or one of its descendants.
    pub fn contains(&self, other: &Element) -> bool {
        let mut current = Some(other.clone());
        while let Some(element) = current {
            if element.ptr_eq(self) {
                return true;
            }
            current = element.parent();
        }
        false
    }

    /// Whether the element is attached to a document root.
    pub fn is_connected(&self) -> bool {
        let mut current = self.clone();
        loop {
            if read(&current.node).tag == DOCUMENT_TAG {
                return true;
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Whether both handles refer to the same node.
    pub fn ptr_eq(&self, other: &Element) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    /// Whether this element matches a compound `tag.class#id` selector.
    pub fn matches(&self, selector: &str) -> bool {
        Selector::parse(selector).is_some_and(|selector| self.matches_parsed(&selector))
    }

    fn matches_parsed(&self, selector: &Selector) -> bool {
        let node = read(&self.node);
        selector.matches(
            &node.tag,
            node.attributes.get("id").map(String::as_str),
            &node.classes,
        )
    }

    /// First descendant matching `selector`, in document order.
    pub fn query_selector(&self, selector: &str) -> Option<Element> {
        let selector = Selector::parse(selector)?;
        self.descendants()
            .into_iter()
            .find(|element| element.matches_parsed(&selector))
    }

    fn descendants(&self) -> Vec<Element> {
        let mut found = Vec::new();
        let mut stack: Vec<Element> = self.children().into_iter().rev().collect();

        while let Some(element) = stack.pop() {
            stack.extend(element.children().into_iter().rev());
            found.push(element);
        }

        found
    }

    /// Registers a listener for events of `kind` reaching this element.
    pub fn add_event_listener<F>(&self, kind: &str, callback: F) -> ListenerHandle
    where
        F: Fn(&DomEvent) + Send + Sync + 'static,
    {
        let mut node = write(&self.node);
        let id = node.next_listener_id;
        node.next_listener_id += 1;
        node.listeners.push(RegisteredListener {
            id,
            kind: kind.to_string(),
            callback: Arc::new(callback),
        });

        ListenerHandle {
            node: Arc::downgrade(&self.node),
            id,
        }
    }

    /// Number of listeners registered for `kind` on this element.
    pub fn listener_count(&self, kind: &str) -> usize {
        read(&self.node)
            .listeners
            .iter()
            .filter(|listener| listener.kind == kind)
            .count()
    }

    /// Delivers `event` to the target, then to each ancestor if it bubbles.
    ///
    /// Listeners are collected before any of them runs, so callbacks may
    /// freely mutate the tree or register further listeners.
    pub fn dispatch_event(&self, event: DomEvent) {
        let mut path = vec![self.clone()];
        if event.bubbles {
            let mut current = self.parent();
            while let Some(element) = current {
                current = element.parent();
                path.push(element);
            }
        }

        for element in path {
            let callbacks: Vec<DomListener> = read(&element.node)
                .listeners
                .iter()
                .filter(|listener| listener.kind == event.kind)
                .map(|listener| Arc::clone(&listener.callback))
                .collect();

            for callback in callbacks {
                callback(&event);
            }
        }
    }

    /// Dispatches a bubbling `click` with this element as target.
    pub fn click(&self) {
        self.dispatch_event(DomEvent::new("click", self));
    }

    pub(crate) fn media_state(&self) -> Option<Arc<Mutex<MediaState>>> {
        read(&self.node).media.clone()
    }

    pub(crate) fn with_media<R>(&self, f: impl FnOnce(&mut MediaState) -> R) -> Option<R> {
        let media = self.media_state()?;
        let mut state = lock(&media);
        Some(f(&mut state))
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = read(&self.node);
        f.debug_struct("Element")
            .field("tag", &node.tag)
            .field("classes", &node.classes)
            .field("attributes", &node.attributes)
            .field("children", &node.children.len())
            .finish()
    }
}
