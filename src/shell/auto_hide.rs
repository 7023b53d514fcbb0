use std::{
    fmt,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{trace, warn};

use crate::{common::lock, dom::Element};

const HIDDEN_CLASS: &str = "v-hidden";

struct TimerInner {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
    target: Mutex<Option<Element>>,
    disposed: Arc<AtomicBool>,
}

/// Single-shot timer hiding the control bar during playback.
///
/// Starting the timer cancels any pending countdown. The countdown never
/// touches a target that was disposed or removed from the document.
#[derive(Clone)]
pub struct AutoHideTimer {
    inner: Arc<TimerInner>,
}

impl AutoHideTimer {
    /// Creates an idle timer.
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: Arc::new(TimerInner {
                delay,
                pending: Mutex::new(None),
                target: Mutex::new(None),
                disposed: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    /// Delay before the target is hidden.
    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    /// Restarts the countdown for `target`.
    pub fn start(&self, target: &Element) {
        if self.inner.disposed.load(Ordering::SeqCst) {
            return;
        }

        let Ok(runtime) = Handle::try_current() else {
            warn!("no tokio runtime available, auto-hide disabled");
            return;
        };

        *lock(&self.inner.target) = Some(target.clone());

        let delay = self.inner.delay;
        let disposed = Arc::clone(&self.inner.disposed);
        let target = target.clone();
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if disposed.load(Ordering::SeqCst) || !target.is_connected() {
                trace!("auto-hide target gone, skipping");
                return;
            }
            target.add_class(HIDDEN_CLASS);
        });

        if let Some(previous) = lock(&self.inner.pending).replace(task) {
            previous.abort();
        }
    }

    /// Cancels the countdown and shows the target again.
    pub fn stop(&self) {
        if let Some(pending) = lock(&self.inner.pending).take() {
            pending.abort();
        }
        if let Some(target) = lock(&self.inner.target).as_ref() {
            target.remove_class(HIDDEN_CLASS);
        }
    }

    /// Whether a countdown is running.
    pub fn is_pending(&self) -> bool {
        lock(&self.inner.pending)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Cancels the countdown for good; later starts do nothing.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        if let Some(pending) = lock(&self.inner.pending).take() {
            pending.abort();
        }
        lock(&self.inner.target).take();
    }
}

impl fmt::Debug for AutoHideTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoHideTimer")
            .field("delay", &self.inner.delay)
            .field("pending", &self.is_pending())
            .field("disposed", &self.inner.disposed.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn connected_bar() -> (Document, Element) {
        let document = Document::new();
        let bar = Element::new("div").with_class("v-controlBar");
        document.body().append_child(&bar);
        (document, bar)
    }

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hides_after_delay() {
        let (_document, bar) = connected_bar();
        let timer = AutoHideTimer::new(Duration::from_millis(3000));

        timer.start(&bar);
        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert!(!bar.has_class(HIDDEN_CLASS));

        tokio::time::sleep(Duration::from_millis(2)).await;
        settle().await;
        assert!(bar.has_class(HIDDEN_CLASS));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_cancels_previous_countdown() {
        let (_document, bar) = connected_bar();
        let timer = AutoHideTimer::new(Duration::from_millis(1000));

        timer.start(&bar);
        tokio::time::sleep(Duration::from_millis(600)).await;
        timer.stop();
        timer.start(&bar);
        tokio::time::sleep(Duration::from_millis(600)).await;
        settle().await;
        assert!(!bar.has_class(HIDDEN_CLASS));

        tokio::time::sleep(Duration::from_millis(500)).await;
        settle().await;
        assert!(bar.has_class(HIDDEN_CLASS));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_shows_bar_again() {
        let (_document, bar) = connected_bar();
        let timer = AutoHideTimer::new(Duration::from_millis(10));

        timer.start(&bar);
        tokio::time::sleep(Duration::from_millis(20)).await;
        settle().await;
        assert!(bar.has_class(HIDDEN_CLASS));

        timer.stop();
        assert!(!bar.has_class(HIDDEN_CLASS));
        assert!(!timer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn removed_target_is_never_touched() {
        let (_document, bar) = connected_bar();
        let timer = AutoHideTimer::new(Duration::from_millis(10));

        timer.start(&bar);
        bar.remove();
        tokio::time::sleep(Duration::from_millis(20)).await;
        settle().await;

        assert!(!bar.has_class(HIDDEN_CLASS));
    }

    #[tokio::test(start_paused = true)]
    async fn disposed_timer_ignores_start() {
        let (_document, bar) = connected_bar();
        let timer = AutoHideTimer::new(Duration::from_millis(10));

        timer.dispose();
        timer.start(&bar);
        tokio::time::sleep(Duration::from_millis(20)).await;
        settle().await;

        assert!(!bar.has_class(HIDDEN_CLASS));
        assert!(!timer.is_pending());
    }
}
