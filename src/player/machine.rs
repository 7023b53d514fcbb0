use std::{
    fmt,
    sync::{
        Arc, Mutex, Weak,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use tokio::{runtime::Handle, sync::mpsc::UnboundedReceiver, task::JoinHandle};
use tracing::{debug, instrument, warn};

use super::{
    PlayerError, Result,
    control_bar::{self, ControlBar, ControlElements},
    events::{EventKind, EventRegistry, PlayerEvent},
    options::{OptionOverrides, PlayerKind, PlayerOptions},
    state::PlaybackState,
    time::format_time,
};
use crate::{
    common::lock,
    config::ProvidersConfig,
    dom::{Document, Element, ListenerHandle},
    providers::{BackendSignal, Provider, ProviderContext, ProviderEntry, SignalSender},
    shell::AutoHideTimer,
};

/// Everything needed to construct a [`Player`].
#[derive(Debug, Clone)]
pub struct PlayerInit {
    /// Document hosting the player
    pub document: Document,
    /// Element the player is built on
    pub target: Element,
    /// Player kind
    pub kind: PlayerKind,
    /// Provider to drive the backend with
    pub provider: ProviderEntry,
    /// Caller option values
    pub overrides: OptionOverrides,
    /// Provider tuning
    pub providers_config: ProvidersConfig,
    /// Auto-hide timer, kept only when auto-hide is granted
    pub auto_hide: Option<AutoHideTimer>,
}

/// Orders concurrent time updates so an older result never overwrites a newer one.
#[derive(Debug, Default)]
struct TimeUpdateGuard {
    issued: AtomicU64,
    applied: AtomicU64,
}

impl TimeUpdateGuard {
    fn issue(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn try_apply(&self, sequence: u64) -> bool {
        self.applied.fetch_max(sequence, Ordering::SeqCst) < sequence
    }

    /// Marks every update issued so far as stale.
    fn supersede(&self) {
        let issued = self.issued.load(Ordering::SeqCst);
        self.applied.fetch_max(issued, Ordering::SeqCst);
    }
}

/// Replaces `from` with `to`, adding `to` when `from` is absent.
fn swap_class(element: &Element, from: &str, to: &str) {
    if element.has_class(from) {
        element.replace_class(from, to);
    } else {
        element.add_class(to);
    }
}

struct PlayerInner {
    kind: PlayerKind,
    options: PlayerOptions,
    document: Document,
    container: Element,
    poster: Option<Element>,
    big_play: Option<Element>,
    provider: Arc<dyn Provider>,
    state: PlaybackState,
    events: EventRegistry,
    control_bar: Option<ControlBar>,
    auto_hide: Option<AutoHideTimer>,
    signals: Mutex<Option<UnboundedReceiver<BackendSignal>>>,
    container_listener: Mutex<Option<ListenerHandle>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    time_guard: TimeUpdateGuard,
    built: AtomicBool,
    destroyed: AtomicBool,
}

/// Backend-agnostic player.
///
/// Owns playback state and the event registry, forwards commands to its
/// provider and keeps the control bar in sync. Cloning yields another handle
/// to the same player.
#[derive(Clone)]
pub struct Player {
    inner: Arc<PlayerInner>,
}

/// Non-owning handle to a [`Player`].
#[derive(Clone, Default)]
pub struct WeakPlayer {
    inner: Weak<PlayerInner>,
}

impl WeakPlayer {
    /// The player, if it is still alive.
    pub fn upgrade(&self) -> Option<Player> {
        self.inner.upgrade().map(|inner| Player { inner })
    }
}

impl fmt::Debug for WeakPlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakPlayer")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl Player {
    /// Validates the target, resolves options, builds the provider and wraps
    /// the target in the player container.
    ///
    /// Nothing is touched in the document when construction fails; option
    /// attributes are written to the target only once the provider exists.
    ///
    /// # Errors
    /// Returns `IncompatibleTarget` when the provider cannot use the target,
    /// or the provider factory's error.
    #[instrument(skip(init), fields(kind = %init.kind, provider = init.provider.name()))]
    pub fn new(init: PlayerInit) -> Result<Self> {
        let PlayerInit {
            document,
            target,
            kind,
            provider,
            overrides,
            providers_config,
            auto_hide,
        } = init;

        provider.validate(&target, kind)?;

        let options = PlayerOptions::resolve(kind, &overrides, &target);
        let (signals, signal_rx) = SignalSender::channel();
        let backend: Arc<dyn Provider> = Arc::from(provider.build(ProviderContext {
            kind,
            media: target.clone(),
            document: document.clone(),
            options: options.clone(),
            signals,
            config: providers_config,
        })?);
        options.write_attributes(kind, &target);

        let container = Element::new("div").with_class(&format!(
            "v-vlite v-{kind} v-firstStart v-paused v-loading"
        ));
        target.replace_with(&container);
        target.add_class("v-media");
        container.append_child(&target);

        let video = kind == PlayerKind::Video;
        let poster = options.poster.as_deref().filter(|_| video).map(|url| {
            let poster = Element::new("div")
                .with_class("v-poster v-active")
                .with_attribute("style", &format!("background-image: url({url})"));
            container.append_child(&poster);
            poster
        });

        let big_play = (video && options.big_play).then(|| {
            let button = Element::new("button")
                .with_class("v-bigPlay")
                .with_attribute("aria-label", control_bar::LABEL_PLAY);
            container.append_child(&button);
            button
        });

        let auto_hide = auto_hide.filter(|_| video && options.auto_hide && options.controls);
        let state = PlaybackState::new(options.muted);
        let controls = options.controls;

        let inner = Arc::new_cyclic(|weak| PlayerInner {
            kind,
            control_bar: controls.then(|| {
                ControlBar::new(
                    WeakPlayer {
                        inner: weak.clone(),
                    },
                    kind,
                )
            }),
            options,
            document,
            container,
            poster,
            big_play,
            provider: backend,
            state,
            events: EventRegistry::default(),
            auto_hide,
            signals: Mutex::new(Some(signal_rx)),
            container_listener: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
            time_guard: TimeUpdateGuard::default(),
            built: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
        });

        debug!("player constructed");
        Ok(Self { inner })
    }

    /// Initializes the control bar and the provider, then starts listening
    /// for backend signals and readiness. Runs once.
    ///
    /// # Errors
    /// Returns `NoRuntime` outside a tokio runtime, `AlreadyBuilt` on a
    /// second call, or the provider's `init` error.
    #[instrument(skip(self), fields(kind = %self.inner.kind, provider = self.provider_name()))]
    pub fn build(&self) -> Result<()> {
        let runtime = Handle::try_current().map_err(|_| PlayerError::NoRuntime)?;
        if self.inner.built.swap(true, Ordering::SeqCst) {
            return Err(PlayerError::AlreadyBuilt);
        }

        if let Some(bar) = &self.inner.control_bar {
            bar.init();
        }

        self.inner.provider.init()?;

        let weak = self.downgrade();
        let listener = self
            .inner
            .container
            .add_event_listener("click", move |event| {
                let Some(player) = weak.upgrade() else {
                    return;
                };
                let hit = [&player.inner.big_play, &player.inner.poster]
                    .into_iter()
                    .flatten()
                    .any(|element| element.contains(&event.target));
                if hit {
                    if let Err(error) = player.play() {
                        warn!(%error, "cannot start playback");
                    }
                }
            });
        *lock(&self.inner.container_listener) = Some(listener);

        let mut tasks = Vec::with_capacity(2);
        if let Some(mut signals) = lock(&self.inner.signals).take() {
            let weak = self.downgrade();
            tasks.push(runtime.spawn(async move {
                while let Some(signal) = signals.recv().await {
                    let Some(player) = weak.upgrade() else {
                        break;
                    };
                    player.handle_signal(signal).await;
                }
                debug!("backend signal stream ended");
            }));
        }

        let provider = Arc::clone(&self.inner.provider);
        let weak = self.downgrade();
        tasks.push(runtime.spawn(async move {
            match provider.wait_until_ready().await {
                Ok(()) => {
                    if let Some(player) = weak.upgrade() {
                        player.on_player_ready().await;
                    }
                }
                Err(error) => warn!(%error, "backend never became ready"),
            }
        }));
        lock(&self.inner.tasks).extend(tasks);

        debug!("player built");
        Ok(())
    }

    /// Non-owning handle for listeners and background tasks.
    pub fn downgrade(&self) -> WeakPlayer {
        WeakPlayer {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Whether both handles refer to the same player.
    pub fn ptr_eq(&self, other: &Player) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    async fn handle_signal(&self, signal: BackendSignal) {
        match signal {
            BackendSignal::TimeUpdate => self.on_time_update().await,
            BackendSignal::Ended => self.on_media_ended(),
            BackendSignal::Loading(loading) => {
                if self.is_loading() != loading {
                    self.set_loading(loading);
                }
            }
        }
    }

    /// Reconciles state once the backend reports readiness.
    ///
    /// A play or pause issued before readiness keeps its state.
    pub async fn on_player_ready(&self) {
        if self.inner.state.paused.get().is_none() {
            self.inner.state.paused.set(Some(true));
        }

        if let Some(bar) = &self.inner.control_bar {
            bar.on_player_ready().await;
        }

        if self.inner.options.muted {
            if let Err(error) = self.mute() {
                warn!(%error, "cannot apply muted option");
            }
        }

        self.set_loading(false);

        if self.inner.options.autoplay {
            if let Err(error) = self.play() {
                warn!(%error, "cannot autoplay");
            }
        }

        debug!("player ready");
    }

    fn command(capability: &'static str, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(error @ PlayerError::NotImplemented { .. }) => Err(error),
            Err(error) => {
                warn!(capability, %error, "backend command failed");
                Ok(())
            }
        }
    }

    fn bar_elements(&self) -> ControlElements {
        self.inner
            .control_bar
            .as_ref()
            .map(ControlBar::elements)
            .unwrap_or_default()
    }

    fn set_play_labels(&self, playing: bool) {
        let label = if playing {
            control_bar::LABEL_PAUSE
        } else {
            control_bar::LABEL_PLAY
        };

        let elements = self.bar_elements();
        for button in [elements.play_pause.as_ref(), self.inner.big_play.as_ref()]
            .into_iter()
            .flatten()
        {
            button.set_attribute("aria-label", label);
        }
    }

    fn after_play_pause(&self, playing: bool) {
        let Some(timer) = &self.inner.auto_hide else {
            return;
        };

        if playing {
            if let Some(bar) = self.bar_elements().bar {
                timer.start(&bar);
            }
        } else {
            timer.stop();
        }
    }

    /// Starts playback.
    ///
    /// # Errors
    /// Returns `NotImplemented` when the provider cannot play.
    pub fn play(&self) -> Result<()> {
        Self::command("play", self.inner.provider.play())?;

        let container = &self.inner.container;
        if container.has_class("v-firstStart") {
            container.remove_class("v-firstStart");
            if let Some(poster) = &self.inner.poster {
                poster.remove_class("v-active");
            }
        }
        swap_class(container, "v-paused", "v-playing");

        self.inner.state.paused.set(Some(false));
        self.set_play_labels(true);
        self.after_play_pause(true);
        debug!("playing");
        self.dispatch_event(EventKind::Play);
        Ok(())
    }

    /// Pauses playback.
    ///
    /// # Errors
    /// Returns `NotImplemented` when the provider cannot pause.
    pub fn pause(&self) -> Result<()> {
        Self::command("pause", self.inner.provider.pause())?;

        swap_class(&self.inner.container, "v-playing", "v-paused");

        self.inner.state.paused.set(Some(true));
        self.set_play_labels(false);
        self.after_play_pause(false);
        debug!("paused");
        self.dispatch_event(EventKind::Pause);
        Ok(())
    }

    /// Refreshes the progress display from the backend.
    ///
    /// Time and duration are fetched together; if either fails the tick is
    /// skipped. A result is applied only if no later call already applied.
    pub async fn on_time_update(&self) {
        if !self.inner.options.time {
            return;
        }

        let sequence = self.inner.time_guard.issue();
        let provider = &self.inner.provider;
        let (time, duration) = tokio::join!(provider.current_time(), provider.duration());

        let (time, duration) = match (time, duration) {
            (Ok(time), Ok(duration)) => (time, duration),
            (Err(error), _) | (_, Err(error)) => {
                debug!(%error, "skipping time update");
                return;
            }
        };

        if !self.inner.time_guard.try_apply(sequence) {
            debug!(sequence, "dropping stale time update");
            return;
        }

        let seconds = time.round();
        let value = if duration.is_finite() && duration > 0.0 {
            seconds * 100.0 / duration
        } else {
            0.0
        };

        let elements = self.bar_elements();
        if let Some(progress) = &elements.progress_bar {
            progress.set_attribute("value", &value.to_string());
            progress.set_attribute("style", &format!("--value: {value}%"));
            progress.set_attribute("aria-valuenow", &seconds.to_string());
        }
        if let Some(label) = &elements.current_time {
            label.set_text(&format_time(seconds));
        }

        self.dispatch_event(EventKind::TimeUpdate);
    }

    /// Handles the backend reaching the end of the media.
    pub fn on_media_ended(&self) {
        if self.inner.options.loop_playback {
            if let Err(error) = self.seek_to(0.0).and_then(|()| self.play()) {
                warn!(%error, "cannot restart looped playback");
            }
            return;
        }

        self.inner.time_guard.supersede();

        let container = &self.inner.container;
        swap_class(container, "v-playing", "v-paused");
        container.add_class("v-firstStart");
        if let Some(poster) = &self.inner.poster {
            poster.add_class("v-active");
        }

        let elements = self.bar_elements();
        if let Some(progress) = &elements.progress_bar {
            progress.set_attribute("value", "0");
            progress.set_attribute("style", "--value: 0%");
            progress.remove_attribute("aria-valuenow");
        }
        if let Some(label) = &elements.current_time {
            label.set_text("00:00");
        }

        self.inner.state.paused.set(Some(true));
        self.set_play_labels(false);
        self.after_play_pause(false);
        debug!("playback ended");
        self.dispatch_event(EventKind::Ended);
    }

    /// Sets the volume and returns the value actually applied.
    ///
    /// Input is clamped to `[0, 1]`; zero, negative and NaN input become
    /// exactly zero and mark the player muted.
    ///
    /// # Errors
    /// Returns `NotImplemented` when the provider cannot set the volume.
    pub fn set_volume(&self, volume: f64) -> Result<f64> {
        let clamped = if volume.is_nan() || volume <= 0.0 {
            0.0
        } else {
            volume.min(1.0)
        };

        Self::command("set_volume", self.inner.provider.set_volume(clamped))?;
        self.apply_muted(clamped == 0.0);
        self.dispatch_event(EventKind::VolumeChange);
        Ok(clamped)
    }

    fn apply_muted(&self, muted: bool) {
        self.inner.state.muted.set(muted);
        if let Some(button) = self.bar_elements().volume {
            button.toggle_class("v-pressed", muted);
            button.set_attribute(
                "aria-label",
                if muted {
                    control_bar::LABEL_UNMUTE
                } else {
                    control_bar::LABEL_MUTE
                },
            );
        }
    }

    /// Mutes output.
    ///
    /// # Errors
    /// Returns `NotImplemented` when the provider cannot mute.
    pub fn mute(&self) -> Result<()> {
        Self::command("mute", self.inner.provider.mute())?;
        self.apply_muted(true);
        self.dispatch_event(EventKind::VolumeChange);
        Ok(())
    }

    /// Unmutes output.
    ///
    /// # Errors
    /// Returns `NotImplemented` when the provider cannot unmute.
    pub fn unmute(&self) -> Result<()> {
        Self::command("unmute", self.inner.provider.unmute())?;
        self.apply_muted(false);
        self.dispatch_event(EventKind::VolumeChange);
        Ok(())
    }

    /// Seeks to `time` seconds. Boundaries are left to the backend.
    ///
    /// # Errors
    /// Returns `NotImplemented` when the provider cannot seek.
    pub fn seek_to(&self, time: f64) -> Result<()> {
        Self::command("seek", self.inner.provider.seek(time))
    }

    /// Presents the player fullscreen. Does nothing when the document has no
    /// fullscreen support.
    pub fn request_fullscreen(&self) {
        let document = &self.inner.document;
        if !document.fullscreen_supported() {
            debug!("fullscreen unsupported");
            return;
        }

        self.inner.state.fullscreen.set(true);
        document.request_fullscreen(&self.inner.container);
        self.inner.container.add_class("v-fullscreenButtonDisplay");
        if let Some(button) = self.bar_elements().fullscreen {
            button.add_class("v-pressed");
            button.set_attribute("aria-label", control_bar::LABEL_EXIT_FULLSCREEN);
        }

        self.dispatch_event(EventKind::EnterFullscreen);
    }

    /// Leaves fullscreen.
    ///
    /// With `esc_key` the platform already left fullscreen, so only the local
    /// state and visuals are reset.
    pub fn exit_fullscreen(&self, esc_key: bool) {
        let document = &self.inner.document;
        if !document.fullscreen_supported() || !self.is_fullscreen() {
            return;
        }

        self.inner.state.fullscreen.set(false);
        if !esc_key {
            document.exit_fullscreen();
        }
        self.inner.container.remove_class("v-fullscreenButtonDisplay");
        if let Some(button) = self.bar_elements().fullscreen {
            button.remove_class("v-pressed");
            button.set_attribute("aria-label", control_bar::LABEL_ENTER_FULLSCREEN);
        }

        self.dispatch_event(EventKind::ExitFullscreen);
    }

    /// Toggles the loading state.
    pub fn set_loading(&self, loading: bool) {
        self.inner.container.toggle_class("v-loading", loading);
        self.inner.state.loading.set(loading);
        self.dispatch_event(EventKind::Progress);
    }

    /// Registers `listener` for `kind`. Listeners run in registration order.
    pub fn on<F>(&self, kind: EventKind, listener: F)
    where
        F: Fn(&PlayerEvent) + Send + Sync + 'static,
    {
        self.inner.events.on(kind, Arc::new(listener));
    }

    /// Invokes every listener registered for `kind`. Without listeners this
    /// does nothing.
    pub fn dispatch_event(&self, kind: EventKind) {
        let listeners = self.inner.events.listeners(kind);
        if listeners.is_empty() {
            return;
        }

        let event = PlayerEvent {
            kind,
            player: self.clone(),
        };
        for listener in listeners {
            listener(&event);
        }
    }

    /// Tears the player down: pauses, removes the control bar, releases the
    /// provider, clears listeners and removes the container. Later calls do
    /// nothing.
    #[instrument(skip(self), fields(kind = %self.inner.kind))]
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Err(error) = self.pause() {
            debug!(%error, "pause during teardown failed");
        }

        if let Some(bar) = &self.inner.control_bar {
            bar.remove_events();
            bar.destroy();
        }

        if let Some(listener) = lock(&self.inner.container_listener).take() {
            listener.detach();
        }

        if let Some(timer) = &self.inner.auto_hide {
            timer.dispose();
        }

        self.inner.provider.destroy();

        for task in lock(&self.inner.tasks).drain(..) {
            task.abort();
        }

        self.inner.events.clear();
        self.inner.container.remove();
        debug!("player destroyed");
    }

    /// Whether playback is paused; `true` before readiness.
    pub fn is_paused(&self) -> bool {
        self.inner.state.paused.get().unwrap_or(true)
    }

    /// Paused state, `None` before readiness.
    pub fn paused_state(&self) -> Option<bool> {
        self.inner.state.paused.get()
    }

    /// Whether output is muted.
    pub fn is_muted(&self) -> bool {
        self.inner.state.muted.get()
    }

    /// Whether the player is fullscreen.
    pub fn is_fullscreen(&self) -> bool {
        self.inner.state.fullscreen.get()
    }

    /// Whether the backend is loading.
    pub fn is_loading(&self) -> bool {
        self.inner.state.loading.get()
    }

    /// Watchable playback state.
    pub fn state(&self) -> &PlaybackState {
        &self.inner.state
    }

    /// Resolved options.
    pub fn options(&self) -> &PlayerOptions {
        &self.inner.options
    }

    /// Player kind.
    pub fn kind(&self) -> PlayerKind {
        self.inner.kind
    }

    /// The `div.v-vlite` container wrapping the target.
    pub fn container(&self) -> &Element {
        &self.inner.container
    }

    /// Document hosting the player.
    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    /// Name of the active provider.
    pub fn provider_name(&self) -> &str {
        self.inner.provider.name()
    }

    /// The control bar, when the `controls` option is on.
    pub fn control_bar(&self) -> Option<&ControlBar> {
        self.inner.control_bar.as_ref()
    }

    /// The auto-hide timer, when auto-hide is granted.
    pub fn auto_hide(&self) -> Option<&AutoHideTimer> {
        self.inner.auto_hide.as_ref()
    }

    /// Whether auto-hide applies to this player.
    pub fn auto_hide_granted(&self) -> bool {
        self.inner.auto_hide.is_some()
    }

    /// Playback position from the backend.
    ///
    /// # Errors
    /// Propagates the provider's query error.
    pub async fn current_time(&self) -> Result<f64> {
        self.inner.provider.current_time().await
    }

    /// Media length from the backend.
    ///
    /// # Errors
    /// Propagates the provider's query error.
    pub async fn duration(&self) -> Result<f64> {
        self.inner.provider.duration().await
    }

    /// Volume from the backend.
    ///
    /// # Errors
    /// Propagates the provider's query error.
    pub async fn volume(&self) -> Result<f64> {
        self.inner.provider.volume().await
    }

    /// Resolves once readiness is known.
    pub async fn wait_until_ready(&self) {
        self.inner.state.paused.wait_until(Option::is_some).await;
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("kind", &self.inner.kind)
            .field("provider", &self.provider_name())
            .field("state", &self.inner.state.snapshot())
            .field("listeners", &self.inner.events)
            .finish()
    }
}
