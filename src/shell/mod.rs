//! Host shell.
//!
//! Resolves a selector to a target element, picks the provider, builds the
//! player and owns the document-level listeners: keyboard shortcuts while
//! focus is inside the player, mouse movement over the container and
//! fullscreen changes made by the platform.

mod auto_hide;
mod keyboard;

pub use auto_hide::AutoHideTimer;
pub use keyboard::KeyAction;

use std::sync::Mutex;

use tracing::{debug, instrument, warn};

use crate::{
    common::{lock, spawn_detached},
    config::{Config, ShellConfig},
    dom::{Document, ListenerHandle},
    player::{OptionOverrides, Player, PlayerError, PlayerInit, PlayerKind, Result, WeakPlayer},
    providers::{ProviderRegistry, html5},
};

/// What to build on the selected element.
#[derive(Debug, Clone)]
pub struct ShellOptions {
    /// Provider name
    pub provider: String,
    /// Player kind; derived from the element tag when unset
    pub kind: Option<PlayerKind>,
    /// Option values winning over the configured ones
    pub overrides: OptionOverrides,
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self {
            provider: html5::NAME.to_string(),
            kind: None,
            overrides: OptionOverrides::default(),
        }
    }
}

/// Handles shortcut keys for one player.
#[derive(Debug, Clone)]
struct KeyHandler {
    player: WeakPlayer,
    document: Document,
    config: ShellConfig,
}

impl KeyHandler {
    fn focus_inside(&self, player: &Player) -> bool {
        self.document
            .active_element()
            .is_some_and(|focused| player.container().contains(&focused))
    }

    async fn handle(&self, player: &Player, action: KeyAction) -> Result<()> {
        let timer = player.auto_hide();
        if let Some(timer) = timer {
            timer.stop();
        }

        match action {
            KeyAction::TogglePlayPause => {
                if player.is_paused() {
                    player.play()?;
                } else {
                    player.pause()?;
                }
            }
            KeyAction::SeekBackward | KeyAction::SeekForward => {
                match player.current_time().await {
                    Ok(time) => {
                        let step = self.config.seek_step_secs;
                        let target = if action == KeyAction::SeekForward {
                            time + step
                        } else {
                            (time - step).max(0.0)
                        };
                        player.seek_to(target)?;
                    }
                    Err(error) if error.is_transient() => {
                        debug!(%error, "skipping key seek");
                    }
                    Err(error) => return Err(error),
                }
            }
            KeyAction::VolumeUp | KeyAction::VolumeDown => match player.volume().await {
                Ok(volume) => {
                    let step = self.config.volume_step;
                    let target = if action == KeyAction::VolumeUp {
                        volume + step
                    } else {
                        volume - step
                    };
                    player.set_volume(target)?;
                }
                Err(error) if error.is_transient() => {
                    debug!(%error, "skipping key volume change");
                }
                Err(error) => return Err(error),
            },
            KeyAction::ToggleFullscreen => {
                if player.is_fullscreen() {
                    player.exit_fullscreen(false);
                } else {
                    player.request_fullscreen();
                }
            }
        }

        if let Some(timer) = timer {
            if !player.is_paused() {
                if let Some(bar) = player.control_bar().and_then(|bar| bar.elements().bar) {
                    timer.start(&bar);
                }
            }
        }

        Ok(())
    }
}

/// A player built on a document element together with its page-level listeners.
#[derive(Debug)]
pub struct Shell {
    player: Player,
    keys: KeyHandler,
    listeners: Mutex<Vec<ListenerHandle>>,
}

impl Shell {
    /// Builds a player on the first element matching `selector` and attaches
    /// the page-level listeners.
    ///
    /// # Errors
    /// Returns `TargetNotFound`, `UnknownProvider`, `IncompatibleTarget` or a
    /// provider construction error. A player that fails to build is destroyed
    /// again before returning. Returns `NoRuntime` outside a tokio runtime.
    #[instrument(skip(document, options, registry, config), fields(provider = %options.provider))]
    pub fn new(
        document: &Document,
        selector: &str,
        options: ShellOptions,
        registry: &ProviderRegistry,
        config: &Config,
    ) -> Result<Self> {
        let target = document
            .query_selector(selector)
            .ok_or_else(|| PlayerError::TargetNotFound(selector.to_string()))?;
        let provider = registry.get(&options.provider)?;

        let kind = options
            .kind
            .or_else(|| PlayerKind::from_tag(&target.tag()))
            .unwrap_or_default();
        let overrides = config.player.for_kind(kind).layered(&options.overrides);

        let player = Player::new(PlayerInit {
            document: document.clone(),
            target,
            kind,
            provider,
            overrides,
            providers_config: config.providers.clone(),
            auto_hide: Some(AutoHideTimer::new(config.shell.auto_hide_delay())),
        })?;

        if let Err(error) = player.build() {
            player.destroy();
            return Err(error);
        }

        let shell = Self {
            keys: KeyHandler {
                player: player.downgrade(),
                document: document.clone(),
                config: config.shell.clone(),
            },
            player,
            listeners: Mutex::new(Vec::new()),
        };
        shell.attach();

        debug!(kind = %kind, "shell ready");
        Ok(shell)
    }

    /// Registers the keyboard, mouse and fullscreen listeners. Any previous
    /// registration is replaced.
    pub fn attach(&self) {
        self.detach();

        let document = &self.keys.document;
        let mut handles = Vec::with_capacity(3);

        let keys = self.keys.clone();
        handles.push(document.root().add_event_listener("keydown", move |event| {
            let Some(key) = event.key() else {
                return;
            };
            let Some(player) = keys.player.upgrade() else {
                return;
            };
            let Some(action) = KeyAction::from_key(key, player.kind()) else {
                return;
            };
            if !keys.focus_inside(&player) {
                return;
            }

            let keys = keys.clone();
            spawn_detached("shell-key", async move {
                if let Err(error) = keys.handle(&player, action).await {
                    warn!(%error, ?action, "key action failed");
                }
            });
        }));

        let weak = self.player.downgrade();
        handles.push(
            self.player
                .container()
                .add_event_listener("mousemove", move |_| {
                    let Some(player) = weak.upgrade() else {
                        return;
                    };
                    if player.is_paused() {
                        return;
                    }
                    let (Some(timer), Some(bar)) = (
                        player.auto_hide(),
                        player.control_bar().and_then(|bar| bar.elements().bar),
                    ) else {
                        return;
                    };
                    timer.stop();
                    timer.start(&bar);
                }),
        );

        let weak = self.player.downgrade();
        let observed = document.clone();
        handles.push(
            document
                .root()
                .add_event_listener("fullscreenchange", move |_| {
                    let Some(player) = weak.upgrade() else {
                        return;
                    };
                    if observed.fullscreen_element().is_none() && player.is_fullscreen() {
                        player.exit_fullscreen(true);
                    }
                }),
        );

        lock(&self.listeners).extend(handles);
    }

    /// Removes every listener registered by [`Shell::attach`].
    pub fn detach(&self) {
        for handle in lock(&self.listeners).drain(..) {
            handle.detach();
        }
    }

    /// Runs the shortcut bound to `key`, as a key press with focus inside
    /// the player would. Returns whether the key is bound.
    ///
    /// # Errors
    /// Returns `NotImplemented` when the provider lacks the needed capability.
    pub async fn on_key_down(&self, key: &str) -> Result<bool> {
        let Some(action) = KeyAction::from_key(key, self.player.kind()) else {
            return Ok(false);
        };
        self.keys.handle(&self.player, action).await?;
        Ok(true)
    }

    /// The managed player.
    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Detaches listeners, disposes the auto-hide timer and destroys the player.
    pub fn destroy(self) {
        self.detach();
        self.player.destroy();
    }
}

impl Drop for Shell {
    fn drop(&mut self) {
        self.detach();
    }
}
