//! Transport controls bound to one player.
//!
//! The bar renders its markup into the player container, caches the nodes
//! it finds (any of them may be missing) and turns clicks and slider input
//! into player commands.

use std::sync::{Mutex, RwLock};

use tracing::{debug, warn};

use super::{
    machine::{Player, WeakPlayer},
    options::PlayerKind,
    time::format_time,
};
use crate::{
    common::{lock, read, spawn_detached, write},
    dom::{Element, ListenerHandle},
};

pub(crate) const LABEL_PLAY: &str = "Play";
pub(crate) const LABEL_PAUSE: &str = "Pause";
pub(crate) const LABEL_MUTE: &str = "Mute";
pub(crate) const LABEL_UNMUTE: &str = "Unmute";
pub(crate) const LABEL_ENTER_FULLSCREEN: &str = "Enter fullscreen";
pub(crate) const LABEL_EXIT_FULLSCREEN: &str = "Exit fullscreen";

const PLAY_PAUSE_SELECTOR: &str = "button.v-playPauseButton";
const VOLUME_SELECTOR: &str = "button.v-volumeButton";
const FULLSCREEN_SELECTOR: &str = "button.v-fullscreenButton";

/// Cached control nodes. Every consumer checks presence.
#[derive(Debug, Clone, Default)]
pub struct ControlElements {
    /// The bar itself
    pub bar: Option<Element>,
    /// Play/pause button
    pub play_pause: Option<Element>,
    /// Progress slider
    pub progress_bar: Option<Element>,
    /// Current time label
    pub current_time: Option<Element>,
    /// Duration label
    pub duration: Option<Element>,
    /// Volume button
    pub volume: Option<Element>,
    /// Fullscreen button
    pub fullscreen: Option<Element>,
}

/// UI controller for one player.
#[derive(Debug)]
pub struct ControlBar {
    player: WeakPlayer,
    kind: PlayerKind,
    elements: RwLock<ControlElements>,
    listeners: Mutex<Vec<ListenerHandle>>,
}

impl ControlBar {
    pub(crate) fn new(player: WeakPlayer, kind: PlayerKind) -> Self {
        Self {
            player,
            kind,
            elements: RwLock::new(ControlElements::default()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Renders the bar, caches its nodes and attaches its listeners.
    pub fn init(&self) {
        let Some(player) = self.player.upgrade() else {
            return;
        };

        player.container().append_child(&self.render(&player));
        self.cache(player.container());
        self.add_events();
    }

    fn render(&self, player: &Player) -> Element {
        let options = player.options();
        let bar = Element::new("div").with_class("v-controlBar");

        if options.play_pause {
            bar.append_child(
                &Element::new("button")
                    .with_class("v-playPauseButton")
                    .with_attribute("aria-label", LABEL_PLAY),
            );
        }

        if options.time {
            let time = Element::new("div").with_class("v-time");
            time.append_child(&Element::new("span").with_class("v-currentTime").with_text("00:00"));
            time.append_child(&Element::new("span").with_text("/"));
            time.append_child(&Element::new("span").with_class("v-duration").with_text("00:00"));
            bar.append_child(&time);
        }

        if options.progress_bar {
            let wrapper = Element::new("div").with_class("v-progressBarStyle");
            wrapper.append_child(
                &Element::new("input")
                    .with_class("v-progressBar")
                    .with_attribute("type", "range")
                    .with_attribute("min", "0")
                    .with_attribute("max", "100")
                    .with_attribute("step", "0.01")
                    .with_attribute("value", "0")
                    .with_attribute("aria-label", "Seek")
                    .with_attribute("aria-valuemin", "0"),
            );
            bar.append_child(&wrapper);
        }

        if options.volume {
            let button = Element::new("button")
                .with_class("v-volumeButton")
                .with_attribute("aria-label", LABEL_MUTE);
            if player.is_muted() {
                button.add_class("v-pressed");
                button.set_attribute("aria-label", LABEL_UNMUTE);
            }
            bar.append_child(&button);
        }

        if self.kind == PlayerKind::Video && options.fullscreen {
            bar.append_child(
                &Element::new("button")
                    .with_class("v-fullscreenButton")
                    .with_attribute("aria-label", LABEL_ENTER_FULLSCREEN),
            );
        }

        bar
    }

    fn cache(&self, container: &Element) {
        let found = ControlElements {
            bar: container.query_selector(".v-controlBar"),
            play_pause: container.query_selector(".v-playPauseButton"),
            progress_bar: container.query_selector(".v-progressBar"),
            current_time: container.query_selector(".v-currentTime"),
            duration: container.query_selector(".v-duration"),
            volume: container.query_selector(".v-volumeButton"),
            fullscreen: container.query_selector(".v-fullscreenButton"),
        };

        *write(&self.elements) = found;
    }

    fn add_events(&self) {
        let elements = self.elements();
        let mut handles = Vec::new();

        if let Some(bar) = &elements.bar {
            let player = self.player.clone();
            handles.push(bar.add_event_listener("click", move |event| {
                let Some(player) = player.upgrade() else {
                    return;
                };
                if let Some(bar) = player.control_bar() {
                    bar.on_click(&event.target);
                }
            }));
        }

        if let Some(progress) = &elements.progress_bar {
            let player = self.player.clone();
            handles.push(progress.add_event_listener("input", move |event| {
                let Some(value) = event
                    .target
                    .attribute("value")
                    .and_then(|value| value.parse::<f64>().ok())
                else {
                    return;
                };

                let player = player.clone();
                spawn_detached("progress-input", async move {
                    let Some(player) = player.upgrade() else {
                        return;
                    };
                    if let Some(bar) = player.control_bar() {
                        bar.on_input_progress(value).await;
                    }
                });
            }));
        }

        lock(&self.listeners).extend(handles);
    }

    /// Snapshot of the cached nodes.
    pub fn elements(&self) -> ControlElements {
        read(&self.elements).clone()
    }

    /// Routes a click on `target` to the first matching control.
    pub fn on_click(&self, target: &Element) {
        let result = if target.matches(PLAY_PAUSE_SELECTOR) {
            self.toggle_play_pause()
        } else if target.matches(VOLUME_SELECTOR) {
            self.toggle_volume()
        } else if target.matches(FULLSCREEN_SELECTOR) {
            self.toggle_fullscreen();
            Ok(())
        } else {
            return;
        };

        if let Err(error) = result {
            warn!(%error, "control bar command failed");
        }
    }

    /// Reflects the slider position at once, then seeks to the same
    /// fraction of the duration. Skipped if the duration is unavailable.
    pub async fn on_input_progress(&self, value: f64) {
        if let Some(progress) = self.elements().progress_bar {
            progress.set_attribute("style", &format!("--value: {value}%"));
        }

        let Some(player) = self.player.upgrade() else {
            return;
        };

        match player.duration().await {
            Ok(duration) => {
                if let Err(error) = player.seek_to(value / 100.0 * duration) {
                    warn!(%error, "cannot seek");
                }
            }
            Err(error) => debug!(%error, "skipping seek without duration"),
        }
    }

    /// Plays when paused, pauses when playing.
    ///
    /// # Errors
    /// Returns `NotImplemented` when the provider lacks the command.
    pub fn toggle_play_pause(&self) -> super::Result<()> {
        let Some(player) = self.player.upgrade() else {
            return Ok(());
        };

        if player.container().has_class("v-playing") {
            player.pause()
        } else {
            player.play()
        }
    }

    /// Unmutes when muted, mutes otherwise.
    ///
    /// # Errors
    /// Returns `NotImplemented` when the provider lacks the command.
    pub fn toggle_volume(&self) -> super::Result<()> {
        let Some(player) = self.player.upgrade() else {
            return Ok(());
        };

        let pressed = self
            .elements()
            .volume
            .is_some_and(|button| button.has_class("v-pressed"));

        if pressed || player.is_muted() {
            player.unmute()
        } else {
            player.mute()
        }
    }

    /// Leaves fullscreen when fullscreen, enters it otherwise.
    pub fn toggle_fullscreen(&self) {
        let Some(player) = self.player.upgrade() else {
            return;
        };

        if player.is_fullscreen() {
            player.exit_fullscreen(false);
        } else {
            player.request_fullscreen();
        }
    }

    /// Fills in the duration label and slider bound once the backend is ready.
    pub async fn on_player_ready(&self) {
        let Some(player) = self.player.upgrade() else {
            return;
        };
        if !player.options().time {
            return;
        }

        let duration = match player.duration().await {
            Ok(duration) => duration,
            Err(error) => {
                debug!(%error, "duration unavailable at ready");
                return;
            }
        };

        let elements = self.elements();
        if let Some(progress) = &elements.progress_bar {
            progress.set_attribute("aria-valuemax", &duration.round().to_string());
        }
        if let Some(label) = &elements.duration {
            label.set_text(&format_time(duration));
        }
    }

    /// Detaches the click and input listeners.
    pub fn remove_events(&self) {
        for handle in lock(&self.listeners).drain(..) {
            handle.detach();
        }
    }

    /// Removes the bar from the container and forgets the cached nodes.
    pub fn destroy(&self) {
        let elements = std::mem::take(&mut *write(&self.elements));
        if let Some(bar) = elements.bar {
            bar.remove();
        }
    }
}
