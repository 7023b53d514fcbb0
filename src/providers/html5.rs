//! Local `<audio>`/`<video>` playback.
//!
//! Commands apply to the element immediately, nothing is queued. Queries
//! answer from the element state through the async contract.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use super::{BackendSignal, Provider, ProviderContext, ProviderEntry, ProviderTarget, SignalSender};
use crate::{
    common::lock,
    dom::{ListenerHandle, MediaElement, ReadyState},
    player::{PlayerError, Result},
};

/// Registered name.
pub const NAME: &str = "html5";

/// Registry entry for the local media element provider.
pub fn entry() -> ProviderEntry {
    ProviderEntry::new(NAME, ProviderTarget::MediaElement, |context| {
        Ok(Box::new(Html5Provider::new(context)?))
    })
}

/// Provider driving a media element in the document.
pub struct Html5Provider {
    media: MediaElement,
    signals: SignalSender,
    ready: Arc<watch::Sender<bool>>,
    listeners: Mutex<Vec<ListenerHandle>>,
}

impl Html5Provider {
    /// Wraps the context's target element.
    ///
    /// # Errors
    /// Returns `IncompatibleTarget` when the target is not a media element.
    pub fn new(context: ProviderContext) -> Result<Self> {
        let tag = context.media.tag();
        let media = MediaElement::new(context.media).ok_or(PlayerError::IncompatibleTarget {
            tag,
            provider: NAME.to_string(),
        })?;

        let (ready, _) = watch::channel(media.ready_state() >= ReadyState::HaveMetadata);

        Ok(Self {
            media,
            signals: context.signals,
            ready: Arc::new(ready),
            listeners: Mutex::new(Vec::new()),
        })
    }

    fn forward(&self, kind: &str, signal: BackendSignal) -> ListenerHandle {
        let signals = self.signals.clone();
        self.media
            .element()
            .add_event_listener(kind, move |_| signals.send(signal))
    }
}

#[async_trait]
impl Provider for Html5Provider {
    fn name(&self) -> &str {
        NAME
    }

    fn init(&self) -> Result<()> {
        let ready = Arc::clone(&self.ready);
        let metadata = self
            .media
            .element()
            .add_event_listener("loadedmetadata", move |_| {
                ready.send_replace(true);
            });

        let handles = vec![
            metadata,
            self.forward("timeupdate", BackendSignal::TimeUpdate),
            self.forward("ended", BackendSignal::Ended),
            self.forward("waiting", BackendSignal::Loading(true)),
            self.forward("playing", BackendSignal::Loading(false)),
            self.forward("canplay", BackendSignal::Loading(false)),
        ];

        lock(&self.listeners).extend(handles);
        debug!(tag = %self.media.element().tag(), "html5 provider attached");
        Ok(())
    }

    async fn wait_until_ready(&self) -> Result<()> {
        let mut ready = self.ready.subscribe();
        ready
            .wait_for(|ready| *ready)
            .await
            .map(|_| ())
            .map_err(|_| PlayerError::NotReady)
    }

    async fn current_time(&self) -> Result<f64> {
        Ok(self.media.current_time())
    }

    async fn duration(&self) -> Result<f64> {
        let duration = self.media.duration();
        if duration.is_nan() {
            return Err(PlayerError::NotReady);
        }
        Ok(duration)
    }

    async fn volume(&self) -> Result<f64> {
        Ok(self.media.volume())
    }

    fn play(&self) -> Result<()> {
        self.media.play();
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        self.media.pause();
        Ok(())
    }

    fn seek(&self, time: f64) -> Result<()> {
        self.media.set_current_time(time);
        Ok(())
    }

    fn set_volume(&self, volume: f64) -> Result<()> {
        self.media.set_volume(volume);
        Ok(())
    }

    fn mute(&self) -> Result<()> {
        self.media.set_muted(true);
        Ok(())
    }

    fn unmute(&self) -> Result<()> {
        self.media.set_muted(false);
        Ok(())
    }

    fn destroy(&self) {
        for handle in lock(&self.listeners).drain(..) {
            handle.detach();
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::{
        config::ProvidersConfig,
        dom::{Document, Element},
        player::{PlayerKind, PlayerOptions},
    };

    fn provider(tag: &str) -> (Html5Provider, Element, UnboundedReceiver<BackendSignal>) {
        let element = Element::new(tag);
        let (signals, rx) = SignalSender::channel();
        let kind = PlayerKind::from_tag(tag).unwrap_or_default();
        let context = ProviderContext {
            kind,
            media: element.clone(),
            document: Document::new(),
            options: PlayerOptions::defaults(kind),
            signals,
            config: ProvidersConfig::default(),
        };

        (Html5Provider::new(context).unwrap(), element, rx)
    }

    #[test]
    fn rejects_non_media_targets() {
        let (signals, _rx) = SignalSender::channel();
        let context = ProviderContext {
            kind: PlayerKind::Video,
            media: Element::new("div"),
            document: Document::new(),
            options: PlayerOptions::defaults(PlayerKind::Video),
            signals,
            config: ProvidersConfig::default(),
        };

        assert!(matches!(
            Html5Provider::new(context),
            Err(PlayerError::IncompatibleTarget { .. })
        ));
    }

    #[tokio::test]
    async fn ready_after_metadata() {
        let (provider, element, _rx) = provider("video");
        provider.init().unwrap();
        assert_eq!(provider.duration().await, Err(PlayerError::NotReady));

        MediaElement::new(element).unwrap().load_metadata(30.0);

        provider.wait_until_ready().await.unwrap();
        assert_eq!(provider.duration().await, Ok(30.0));
    }

    #[tokio::test]
    async fn native_events_become_signals() {
        let (provider, element, mut rx) = provider("audio");
        provider.init().unwrap();
        let media = MediaElement::new(element).unwrap();

        media.load_metadata(3.0);
        provider.play().unwrap();
        media.advance(4.0);

        let mut received = Vec::new();
        while let Ok(signal) = rx.try_recv() {
            received.push(signal);
        }

        assert!(received.contains(&BackendSignal::Loading(false)));
        assert!(received.contains(&BackendSignal::TimeUpdate));
        assert_eq!(received.last(), Some(&BackendSignal::Ended));
    }

    #[tokio::test]
    async fn destroy_detaches_listeners() {
        let (provider, element, mut rx) = provider("video");
        provider.init().unwrap();
        provider.destroy();

        let media = MediaElement::new(element.clone()).unwrap();
        media.load_metadata(3.0);
        media.set_current_time(1.0);

        assert!(rx.try_recv().is_err());
        assert_eq!(element.listener_count("timeupdate"), 0);
    }

    #[tokio::test]
    async fn commands_apply_immediately() {
        let (provider, element, _rx) = provider("video");
        let media = MediaElement::new(element).unwrap();
        media.load_metadata(100.0);

        provider.seek(42.0).unwrap();
        provider.set_volume(0.25).unwrap();
        provider.mute().unwrap();

        assert_eq!(provider.current_time().await, Ok(42.0));
        assert_eq!(provider.volume().await, Ok(0.25));
        assert!(media.muted());
    }
}
