//! Vimeo embeds driven over `postMessage`.
//!
//! The target element is replaced by an `<iframe>`. Until the embed reports
//! `ready`, commands and queries are queued and then flushed in order.
//! Getter replies are matched to waiting queries first-in first-out per
//! method name.

mod protocol;

pub use protocol::{Inbound, Outbound};

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, Weak},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{oneshot, watch};
use tracing::{debug, instrument, warn};

use super::{BackendSignal, Provider, ProviderContext, ProviderEntry, ProviderTarget, SignalSender};
use crate::{
    common::lock,
    dom::{Document, Element, EventDetail, ListenerHandle},
    player::{PlayerError, PlayerOptions, Result},
};

/// Registered name.
pub const NAME: &str = "vimeo";

/// Attribute holding the Vimeo video id on the target element.
pub const ID_ATTRIBUTE: &str = "data-vimeo-id";

/// Registry entry for the Vimeo embed provider.
pub fn entry() -> ProviderEntry {
    ProviderEntry::new(NAME, ProviderTarget::Embed, |context| {
        Ok(Box::new(VimeoProvider::new(context)?))
    })
}

type Reply = oneshot::Sender<Result<f64>>;

#[derive(Default)]
struct Outbox {
    ready: bool,
    queued: Vec<Outbound>,
}

struct Shared {
    document: Document,
    origin: String,
    reply_timeout: Duration,
    signals: SignalSender,
    ready: watch::Sender<bool>,
    outbox: Mutex<Outbox>,
    pending: Mutex<HashMap<String, VecDeque<Reply>>>,
}

impl Shared {
    fn post(&self, message: Outbound) {
        let mut outbox = lock(&self.outbox);
        if outbox.ready {
            self.send(&message);
        } else {
            outbox.queued.push(message);
        }
    }

    fn send(&self, message: &Outbound) {
        match serde_json::to_string(message) {
            Ok(data) => self.document.post_message(&self.origin, data),
            Err(error) => warn!(method = %message.method, %error, "cannot encode embed message"),
        }
    }

    fn handle_message(&self, origin: &str, data: &str) {
        if origin != self.origin {
            debug!(origin, "ignoring message from foreign origin");
            return;
        }

        let message: Inbound = match serde_json::from_str(data) {
            Ok(message) => message,
            Err(error) => {
                debug!(%error, "ignoring unrecognized embed message");
                return;
            }
        };

        match message {
            Inbound::Event { event, .. } => self.handle_event(&event),
            Inbound::Reply { method, value } => self.resolve(&method, value),
        }
    }

    fn handle_event(&self, event: &str) {
        match event {
            "ready" => self.on_ready(),
            "timeupdate" => self.signals.send(BackendSignal::TimeUpdate),
            "ended" => self.signals.send(BackendSignal::Ended),
            "bufferstart" => self.signals.send(BackendSignal::Loading(true)),
            "bufferend" => self.signals.send(BackendSignal::Loading(false)),
            other => debug!(event = other, "unhandled embed event"),
        }
    }

    fn on_ready(&self) {
        {
            let mut outbox = lock(&self.outbox);
            if outbox.ready {
                return;
            }
            outbox.ready = true;

            for event in protocol::SUBSCRIBED_EVENTS {
                self.send(&Outbound::with_value(protocol::ADD_EVENT_LISTENER, event));
            }

            let queued = std::mem::take(&mut outbox.queued);
            debug!(flushed = queued.len(), "vimeo embed ready");
            for message in &queued {
                self.send(message);
            }
        }

        self.ready.send_replace(true);
    }

    fn resolve(&self, method: &str, value: Option<Value>) {
        let reply = {
            let mut pending = lock(&self.pending);
            let Some(waiting) = pending.get_mut(method) else {
                debug!(method, "reply without a waiting query");
                return;
            };

            let mut found = None;
            while let Some(sender) = waiting.pop_front() {
                if !sender.is_closed() {
                    found = Some(sender);
                    break;
                }
            }
            found
        };

        let Some(reply) = reply else {
            return;
        };

        let result = value
            .as_ref()
            .and_then(Value::as_f64)
            .ok_or_else(|| PlayerError::Protocol(format!("non-numeric reply to {method}")));
        if reply.send(result).is_err() {
            debug!(method, "query abandoned before its reply");
        }
    }

    async fn query(&self, method: &'static str) -> Result<f64> {
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = lock(&self.pending);
            let waiting = pending.entry(method.to_string()).or_default();
            waiting.retain(|sender| !sender.is_closed());
            waiting.push_back(tx);
        }

        self.post(Outbound::call(method));

        match tokio::time::timeout(self.reply_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(PlayerError::QueryFailed {
                query: method,
                reason: "embed was torn down".to_string(),
            }),
            Err(_) => Err(PlayerError::Timeout {
                query: method,
                timeout: self.reply_timeout,
            }),
        }
    }
}

/// Provider speaking the Vimeo player `postMessage` protocol.
pub struct VimeoProvider {
    shared: Arc<Shared>,
    target: Element,
    video_id: String,
    options: PlayerOptions,
    iframe: Mutex<Option<Element>>,
    listener: Mutex<Option<ListenerHandle>>,
}

impl VimeoProvider {
    /// Reads the video id from the target element.
    ///
    /// # Errors
    /// Returns `MissingAttribute` when the target carries no video id.
    pub fn new(context: ProviderContext) -> Result<Self> {
        let video_id = context
            .media
            .attribute(ID_ATTRIBUTE)
            .filter(|id| !id.trim().is_empty())
            .ok_or(PlayerError::MissingAttribute(ID_ATTRIBUTE))?;

        let (ready, _) = watch::channel(false);
        let vimeo = context.config.vimeo;

        Ok(Self {
            shared: Arc::new(Shared {
                document: context.document,
                origin: vimeo.origin,
                reply_timeout: Duration::from_millis(vimeo.reply_timeout_ms),
                signals: context.signals,
                ready,
                outbox: Mutex::new(Outbox::default()),
                pending: Mutex::new(HashMap::new()),
            }),
            target: context.media,
            video_id,
            options: context.options,
            iframe: Mutex::new(None),
            listener: Mutex::new(None),
        })
    }

    /// Embed URL for the target video.
    pub fn embed_url(&self) -> String {
        let flag = |on: bool| u8::from(on);
        format!(
            "{origin}/video/{id}?autoplay={autoplay}&controls=0&loop={looped}&muted={muted}&playsinline={inline}&dnt=1",
            origin = self.shared.origin,
            id = self.video_id,
            autoplay = flag(self.options.autoplay),
            looped = flag(self.options.loop_playback),
            muted = flag(self.options.muted),
            inline = flag(self.options.playsinline),
        )
    }

    /// The embedded frame, once `init` has run.
    pub fn iframe(&self) -> Option<Element> {
        lock(&self.iframe).clone()
    }

    fn command(&self, message: Outbound) -> Result<()> {
        self.shared.post(message);
        Ok(())
    }
}

#[async_trait]
impl Provider for VimeoProvider {
    fn name(&self) -> &str {
        NAME
    }

    #[instrument(skip(self), fields(video_id = %self.video_id))]
    fn init(&self) -> Result<()> {
        let iframe = Element::new("iframe")
            .with_class("vlite-iframe")
            .with_attribute("src", &self.embed_url())
            .with_attribute("allow", "autoplay; fullscreen")
            .with_attribute("frameborder", "0");
        self.target.replace_with(&iframe);
        *lock(&self.iframe) = Some(iframe);

        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        let handle = self
            .shared
            .document
            .root()
            .add_event_listener("message", move |event| {
                let EventDetail::Message { origin, data } = &event.detail else {
                    return;
                };
                if let Some(shared) = shared.upgrade() {
                    shared.handle_message(origin, data);
                }
            });
        *lock(&self.listener) = Some(handle);

        debug!("vimeo embed created");
        Ok(())
    }

    async fn wait_until_ready(&self) -> Result<()> {
        let mut ready = self.shared.ready.subscribe();
        ready
            .wait_for(|ready| *ready)
            .await
            .map(|_| ())
            .map_err(|_| PlayerError::NotReady)
    }

    async fn current_time(&self) -> Result<f64> {
        self.shared.query(protocol::GET_CURRENT_TIME).await
    }

    async fn duration(&self) -> Result<f64> {
        self.shared.query(protocol::GET_DURATION).await
    }

    async fn volume(&self) -> Result<f64> {
        self.shared.query(protocol::GET_VOLUME).await
    }

    fn play(&self) -> Result<()> {
        self.command(Outbound::call(protocol::PLAY))
    }

    fn pause(&self) -> Result<()> {
        self.command(Outbound::call(protocol::PAUSE))
    }

    fn seek(&self, time: f64) -> Result<()> {
        self.command(Outbound::with_value(protocol::SET_CURRENT_TIME, time))
    }

    fn set_volume(&self, volume: f64) -> Result<()> {
        self.command(Outbound::with_value(protocol::SET_VOLUME, volume))
    }

    fn mute(&self) -> Result<()> {
        self.command(Outbound::with_value(protocol::SET_MUTED, true))
    }

    fn unmute(&self) -> Result<()> {
        self.command(Outbound::with_value(protocol::SET_MUTED, false))
    }

    fn destroy(&self) {
        if let Some(handle) = lock(&self.listener).take() {
            handle.detach();
        }
        lock(&self.shared.pending).clear();
        lock(&self.shared.outbox).queued.clear();
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast;

    use super::*;
    use crate::{
        config::{ProvidersConfig, VimeoConfig},
        player::PlayerKind,
    };

    const ORIGIN: &str = "https://player.vimeo.com";

    struct Fixture {
        provider: VimeoProvider,
        document: Document,
        posted: broadcast::Receiver<crate::dom::PostedMessage>,
        signals: tokio::sync::mpsc::UnboundedReceiver<BackendSignal>,
    }

    fn fixture(reply_timeout_ms: u64) -> Fixture {
        let document = Document::new();
        let target = Element::new("div").with_attribute(ID_ATTRIBUTE, "76979871");
        document.body().append_child(&target);
        let (signals, signal_rx) = SignalSender::channel();
        let posted = document.subscribe_posted();

        let context = ProviderContext {
            kind: PlayerKind::Video,
            media: target,
            document: document.clone(),
            options: PlayerOptions::defaults(PlayerKind::Video),
            signals,
            config: ProvidersConfig {
                vimeo: VimeoConfig {
                    origin: ORIGIN.to_string(),
                    reply_timeout_ms,
                },
            },
        };

        let provider = VimeoProvider::new(context).unwrap();
        provider.init().unwrap();

        Fixture {
            provider,
            document,
            posted,
            signals: signal_rx,
        }
    }

    fn drain(posted: &mut broadcast::Receiver<crate::dom::PostedMessage>) -> Vec<Outbound> {
        let mut messages = Vec::new();
        while let Ok(message) = posted.try_recv() {
            messages.push(serde_json::from_str(&message.data).unwrap());
        }
        messages
    }

    #[test]
    fn missing_video_id_is_rejected() {
        let (signals, _rx) = SignalSender::channel();
        let context = ProviderContext {
            kind: PlayerKind::Video,
            media: Element::new("div"),
            document: Document::new(),
            options: PlayerOptions::defaults(PlayerKind::Video),
            signals,
            config: ProvidersConfig::default(),
        };

        assert_eq!(
            VimeoProvider::new(context).err(),
            Some(PlayerError::MissingAttribute(ID_ATTRIBUTE))
        );
    }

    #[tokio::test]
    async fn init_replaces_target_with_iframe() {
        let fixture = fixture(1000);

        let iframe = fixture.document.query_selector("iframe.vlite-iframe").unwrap();
        let src = iframe.attribute("src").unwrap();
        assert!(src.starts_with("https://player.vimeo.com/video/76979871?"));
        assert!(src.contains("controls=0"));
        assert!(src.contains("playsinline=1"));
        assert!(fixture.document.query_selector("div").is_none());
        assert!(fixture.provider.iframe().is_some());
    }

    #[tokio::test]
    async fn commands_queue_until_ready() {
        let mut fixture = fixture(1000);

        fixture.provider.play().unwrap();
        fixture.provider.seek(30.0).unwrap();
        assert!(drain(&mut fixture.posted).is_empty());

        fixture.document.receive_message(ORIGIN, r#"{"event":"ready"}"#);
        fixture.provider.wait_until_ready().await.unwrap();

        let methods: Vec<String> = drain(&mut fixture.posted)
            .into_iter()
            .map(|message| message.method)
            .collect();
        assert_eq!(
            methods,
            vec![
                "addEventListener",
                "addEventListener",
                "addEventListener",
                "addEventListener",
                "play",
                "setCurrentTime",
            ]
        );
    }

    #[tokio::test]
    async fn foreign_origins_are_ignored() {
        let mut fixture = fixture(1000);

        fixture
            .document
            .receive_message("https://evil.example", r#"{"event":"ready"}"#);
        fixture
            .document
            .receive_message("https://evil.example", r#"{"event":"ended"}"#);

        assert!(drain(&mut fixture.posted).is_empty());
        assert!(fixture.signals.try_recv().is_err());
    }

    #[tokio::test]
    async fn events_become_signals() {
        let mut fixture = fixture(1000);

        fixture.document.receive_message(ORIGIN, r#"{"event":"ready"}"#);
        fixture
            .document
            .receive_message(ORIGIN, r#"{"event":"timeupdate","data":{"seconds":1.0}}"#);
        fixture.document.receive_message(ORIGIN, r#"{"event":"bufferstart"}"#);
        fixture.document.receive_message(ORIGIN, r#"{"event":"ended"}"#);

        assert_eq!(fixture.signals.try_recv().ok(), Some(BackendSignal::TimeUpdate));
        assert_eq!(fixture.signals.try_recv().ok(), Some(BackendSignal::Loading(true)));
        assert_eq!(fixture.signals.try_recv().ok(), Some(BackendSignal::Ended));
    }

    #[tokio::test]
    async fn replies_resolve_queries_in_order() {
        let fixture = fixture(1000);
        fixture.document.receive_message(ORIGIN, r#"{"event":"ready"}"#);

        let document = fixture.document.clone();
        let responder = tokio::spawn(async move {
            tokio::task::yield_now().await;
            document.receive_message(ORIGIN, r#"{"method":"getDuration","value":90}"#);
            document.receive_message(ORIGIN, r#"{"method":"getCurrentTime","value":12.5}"#);
        });

        let (time, duration) =
            tokio::join!(fixture.provider.current_time(), fixture.provider.duration());
        responder.await.unwrap();

        assert_eq!(time, Ok(12.5));
        assert_eq!(duration, Ok(90.0));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_reply_times_out() {
        let fixture = fixture(50);
        fixture.document.receive_message(ORIGIN, r#"{"event":"ready"}"#);

        let result = fixture.provider.volume().await;

        assert_eq!(
            result,
            Err(PlayerError::Timeout {
                query: "getVolume",
                timeout: Duration::from_millis(50),
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn late_reply_is_dropped() {
        let fixture = fixture(50);
        fixture.document.receive_message(ORIGIN, r#"{"event":"ready"}"#);

        assert!(fixture.provider.volume().await.is_err());
        fixture
            .document
            .receive_message(ORIGIN, r#"{"method":"getVolume","value":0.2}"#);

        let document = fixture.document.clone();
        let responder = tokio::spawn(async move {
            tokio::task::yield_now().await;
            document.receive_message(ORIGIN, r#"{"method":"getVolume","value":0.7}"#);
        });

        assert_eq!(fixture.provider.volume().await, Ok(0.7));
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn destroy_stops_listening() {
        let mut fixture = fixture(1000);
        fixture.provider.destroy();

        fixture.document.receive_message(ORIGIN, r#"{"event":"ready"}"#);

        assert!(drain(&mut fixture.posted).is_empty());
        assert_eq!(fixture.document.root().listener_count("message"), 0);
    }
}
