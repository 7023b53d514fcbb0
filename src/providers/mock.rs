use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::watch;

use super::{BackendSignal, Provider, ProviderEntry, ProviderTarget, SignalSender};
use crate::{
    common::lock,
    player::{PlayerError, Result},
};

struct MockInner {
    calls: Mutex<Vec<String>>,
    time: Mutex<f64>,
    time_replies: Mutex<VecDeque<(Result<f64>, Duration)>>,
    duration: Mutex<Result<f64>>,
    volume: Mutex<f64>,
    signals: Mutex<Option<SignalSender>>,
    ready: watch::Sender<bool>,
}

/// Scriptable backend recording every command it receives.
#[derive(Clone)]
pub(crate) struct MockBackend {
    inner: Arc<MockInner>,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            inner: Arc::new(MockInner {
                calls: Mutex::new(Vec::new()),
                time: Mutex::new(0.0),
                time_replies: Mutex::new(VecDeque::new()),
                duration: Mutex::new(Ok(200.0)),
                volume: Mutex::new(1.0),
                signals: Mutex::new(None),
                ready,
            }),
        }
    }

    pub(crate) fn entry(&self) -> ProviderEntry {
        let backend = self.clone();
        ProviderEntry::new("mock", ProviderTarget::MediaElement, move |context| {
            *lock(&backend.inner.signals) = Some(context.signals);
            Ok(Box::new(MockProvider {
                backend: backend.clone(),
            }))
        })
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        lock(&self.inner.calls).clone()
    }

    pub(crate) fn count(&self, call: &str) -> usize {
        lock(&self.inner.calls).iter().filter(|c| *c == call).count()
    }

    pub(crate) fn make_ready(&self) {
        self.inner.ready.send_replace(true);
    }

    pub(crate) fn set_time(&self, time: f64) {
        *lock(&self.inner.time) = time;
    }

    /// Queues a reply for the next `current_time` call, delivered after `delay`.
    pub(crate) fn push_time_reply(&self, reply: Result<f64>, delay: Duration) {
        lock(&self.inner.time_replies).push_back((reply, delay));
    }

    pub(crate) fn set_duration(&self, duration: Result<f64>) {
        *lock(&self.inner.duration) = duration;
    }

    pub(crate) fn signal(&self, signal: BackendSignal) {
        if let Some(signals) = lock(&self.inner.signals).as_ref() {
            signals.send(signal);
        }
    }

    fn record(&self, call: String) {
        lock(&self.inner.calls).push(call);
    }
}

struct MockProvider {
    backend: MockBackend,
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn init(&self) -> Result<()> {
        self.backend.record("init".into());
        Ok(())
    }

    async fn wait_until_ready(&self) -> Result<()> {
        let mut ready = self.backend.inner.ready.subscribe();
        ready
            .wait_for(|ready| *ready)
            .await
            .map(|_| ())
            .map_err(|_| PlayerError::NotReady)
    }

    async fn current_time(&self) -> Result<f64> {
        let scripted = lock(&self.backend.inner.time_replies).pop_front();
        match scripted {
            Some((reply, delay)) => {
                tokio::time::sleep(delay).await;
                reply
            }
            None => Ok(*lock(&self.backend.inner.time)),
        }
    }

    async fn duration(&self) -> Result<f64> {
        lock(&self.backend.inner.duration).clone()
    }

    async fn volume(&self) -> Result<f64> {
        Ok(*lock(&self.backend.inner.volume))
    }

    fn play(&self) -> Result<()> {
        self.backend.record("play".into());
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        self.backend.record("pause".into());
        Ok(())
    }

    fn seek(&self, time: f64) -> Result<()> {
        self.backend.record(format!("seek:{time}"));
        Ok(())
    }

    fn set_volume(&self, volume: f64) -> Result<()> {
        *lock(&self.backend.inner.volume) = volume;
        self.backend.record(format!("set_volume:{volume}"));
        Ok(())
    }

    fn mute(&self) -> Result<()> {
        self.backend.record("mute".into());
        Ok(())
    }

    fn unmute(&self) -> Result<()> {
        self.backend.record("unmute".into());
        Ok(())
    }

    fn destroy(&self) {
        self.backend.record("destroy".into());
    }
}

/// Provider implementing nothing beyond its name.
pub(crate) struct BareProvider;

impl BareProvider {
    pub(crate) fn entry() -> ProviderEntry {
        ProviderEntry::new("bare", ProviderTarget::MediaElement, |_| {
            Ok(Box::new(BareProvider))
        })
    }
}

#[async_trait]
impl Provider for BareProvider {
    fn name(&self) -> &str {
        "bare"
    }
}
