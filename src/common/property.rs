use std::fmt::Debug;

use futures::stream::{Stream, StreamExt};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// A reactive property that can be watched for changes.
///
/// When the value changes, all watchers are notified automatically.
/// Each watcher gets the current value immediately when subscribing.
#[derive(Clone)]
pub struct Property<T: Clone + Send + Sync + 'static> {
    tx: watch::Sender<T>,
    rx: watch::Receiver<T>,
}

impl<T: Clone + Send + Sync + 'static> Property<T> {
    /// Create a new property with an initial value.
    pub fn new(initial: T) -> Self {
        let (tx, rx) = watch::channel(initial);
        Self { tx, rx }
    }

    /// Set a new value and notify all watchers.
    ///
    /// Only updates if the value is different (requires PartialEq).
    /// Only accessible within the crate to prevent external modification.
    pub(crate) fn set(&self, new_value: T)
    where
        T: PartialEq,
    {
        let _ = self.tx.send_if_modified(|current| {
            if *current != new_value {
                *current = new_value;
                true
            } else {
                false
            }
        });
    }

    /// Get the current value.
    ///
    /// This is a synchronous operation that clones the current value.
    pub fn get(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Watch for changes to this property.
    ///
    /// The stream immediately yields the current value, then yields
    /// whenever the value changes.
    pub fn watch(&self) -> impl Stream<Item = T> + Send {
        WatchStream::new(self.rx.clone())
    }

    /// Wait until the value satisfies `predicate`, returning that value.
    ///
    /// Resolves immediately when the current value already matches.
    pub async fn wait_until(&self, mut predicate: impl FnMut(&T) -> bool + Send) -> T {
        let mut stream = Box::pin(self.watch());
        while let Some(value) = stream.next().await {
            if predicate(&value) {
                return value;
            }
        }
        self.get()
    }
}

impl<T: Clone + Send + Sync + Debug + 'static> Debug for Property<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("value", &self.get())
            .finish()
    }
}
