//! Backend adapters.
//!
//! A [`Provider`] translates the player's uniform commands into calls on one
//! concrete media source and reports what the backend does through
//! [`BackendSignal`]s. Every capability has a default that fails with
//! [`PlayerError::NotImplemented`], so a missing capability surfaces on
//! first use with its name attached.

pub mod html5;
pub mod vimeo;

#[cfg(test)]
pub(crate) mod mock;

use std::{collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::trace;

use crate::{
    config::ProvidersConfig,
    dom::{Document, Element},
    player::{PlayerError, PlayerKind, PlayerOptions, Result},
};

/// Notification a backend sends to its player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackendSignal {
    /// Playback position moved
    TimeUpdate,
    /// Playback reached the end
    Ended,
    /// Backend started (`true`) or stopped (`false`) buffering
    Loading(bool),
}

/// Sending half of a player's backend signal channel.
#[derive(Debug, Clone)]
pub struct SignalSender(mpsc::UnboundedSender<BackendSignal>);

impl SignalSender {
    /// Creates a connected sender and receiver.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<BackendSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }

    /// Sends a signal. Signals sent after the player is gone are dropped.
    pub fn send(&self, signal: BackendSignal) {
        if self.0.send(signal).is_err() {
            trace!(?signal, "player gone, dropping backend signal");
        }
    }
}

/// Everything a provider factory receives.
#[derive(Debug, Clone)]
pub struct ProviderContext {
    /// Kind of the player being built
    pub kind: PlayerKind,
    /// The target element the player was built on
    pub media: Element,
    /// Document hosting the player
    pub document: Document,
    /// Resolved player options
    pub options: PlayerOptions,
    /// Channel for lifecycle notifications
    pub signals: SignalSender,
    /// Provider tuning
    pub config: ProvidersConfig,
}

pub(crate) fn not_implemented(provider: &str, capability: &'static str) -> PlayerError {
    PlayerError::NotImplemented {
        provider: provider.to_string(),
        capability,
    }
}

/// Capability set of a media backend.
///
/// Queries are asynchronous even when the backend could answer at once.
/// Commands are fire-and-forget: `Ok` means the command was accepted, its
/// effect shows up later through backend signals.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Registered provider name.
    fn name(&self) -> &str;

    /// Creates or attaches the backend and wires its native events into
    /// backend signals. Called once per player.
    ///
    /// # Errors
    /// Returns `NotImplemented` unless overridden, or a construction error
    /// from the backend.
    fn init(&self) -> Result<()> {
        Err(not_implemented(self.name(), "init"))
    }

    /// Resolves once the backend accepts commands.
    ///
    /// # Errors
    /// Returns `NotImplemented` unless overridden.
    async fn wait_until_ready(&self) -> Result<()> {
        Err(not_implemented(self.name(), "wait_until_ready"))
    }

    /// Playback position in seconds.
    ///
    /// # Errors
    /// Returns `NotImplemented` unless overridden, or a transient query error.
    async fn current_time(&self) -> Result<f64> {
        Err(not_implemented(self.name(), "current_time"))
    }

    /// Media length in seconds.
    ///
    /// # Errors
    /// Returns `NotImplemented` unless overridden, or a transient query error.
    async fn duration(&self) -> Result<f64> {
        Err(not_implemented(self.name(), "duration"))
    }

    /// Volume in `[0, 1]`.
    ///
    /// # Errors
    /// Returns `NotImplemented` unless overridden, or a transient query error.
    async fn volume(&self) -> Result<f64> {
        Err(not_implemented(self.name(), "volume"))
    }

    /// Starts playback.
    ///
    /// # Errors
    /// Returns `NotImplemented` unless overridden.
    fn play(&self) -> Result<()> {
        Err(not_implemented(self.name(), "play"))
    }

    /// Pauses playback.
    ///
    /// # Errors
    /// Returns `NotImplemented` unless overridden.
    fn pause(&self) -> Result<()> {
        Err(not_implemented(self.name(), "pause"))
    }

    /// Moves to `time` seconds; boundary handling is up to the backend.
    ///
    /// # Errors
    /// Returns `NotImplemented` unless overridden.
    fn seek(&self, _time: f64) -> Result<()> {
        Err(not_implemented(self.name(), "seek"))
    }

    /// Sets the volume; `volume` is already clamped to `[0, 1]`.
    ///
    /// # Errors
    /// Returns `NotImplemented` unless overridden.
    fn set_volume(&self, _volume: f64) -> Result<()> {
        Err(not_implemented(self.name(), "set_volume"))
    }

    /// Mutes output.
    ///
    /// # Errors
    /// Returns `NotImplemented` unless overridden.
    fn mute(&self) -> Result<()> {
        Err(not_implemented(self.name(), "mute"))
    }

    /// Unmutes output.
    ///
    /// # Errors
    /// Returns `NotImplemented` unless overridden.
    fn unmute(&self) -> Result<()> {
        Err(not_implemented(self.name(), "unmute"))
    }

    /// Releases backend resources. Does nothing unless overridden.
    fn destroy(&self) {}
}

/// Kind of element a provider can be built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderTarget {
    /// An `<audio>` or `<video>` element played locally
    MediaElement,
    /// A placeholder element replaced by an embedded frame (video only)
    Embed,
}

/// Builds a provider for one player.
pub type ProviderFactory = Arc<dyn Fn(ProviderContext) -> Result<Box<dyn Provider>> + Send + Sync>;

/// A registered provider: its name, the targets it accepts and its factory.
#[derive(Clone)]
pub struct ProviderEntry {
    name: String,
    target: ProviderTarget,
    factory: ProviderFactory,
}

impl ProviderEntry {
    /// Creates an entry.
    pub fn new<F>(name: &str, target: ProviderTarget, factory: F) -> Self
    where
        F: Fn(ProviderContext) -> Result<Box<dyn Provider>> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            target,
            factory: Arc::new(factory),
        }
    }

    /// Provider name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Accepted target.
    pub fn target(&self) -> ProviderTarget {
        self.target
    }

    /// Checks that `element` can host this provider for a `kind` player.
    ///
    /// # Errors
    /// Returns `IncompatibleTarget` when the element tag or the kind does not fit.
    pub fn validate(&self, element: &Element, kind: PlayerKind) -> Result<()> {
        let tag = element.tag();
        let compatible = match self.target {
            ProviderTarget::MediaElement => PlayerKind::from_tag(&tag).is_some(),
            ProviderTarget::Embed => {
                PlayerKind::from_tag(&tag).is_none() && kind == PlayerKind::Video
            }
        };

        if compatible {
            Ok(())
        } else {
            Err(PlayerError::IncompatibleTarget {
                tag,
                provider: self.name.clone(),
            })
        }
    }

    /// Runs the factory.
    ///
    /// # Errors
    /// Propagates the factory's construction error.
    pub fn build(&self, context: ProviderContext) -> Result<Box<dyn Provider>> {
        (self.factory)(context)
    }
}

impl fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("name", &self.name)
            .field("target", &self.target)
            .finish()
    }
}

/// Provider entries by name.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    entries: HashMap<String, ProviderEntry>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in `html5` and `vimeo` providers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(html5::entry());
        registry.register(vimeo::entry());
        registry
    }

    /// Adds or replaces an entry.
    pub fn register(&mut self, entry: ProviderEntry) {
        self.entries.insert(entry.name.clone(), entry);
    }

    /// Looks up an entry by name.
    ///
    /// # Errors
    /// Returns `UnknownProvider` when nothing is registered under `name`.
    pub fn get(&self, name: &str) -> Result<ProviderEntry> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| PlayerError::UnknownProvider(name.to_string()))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_register_builtin_providers() {
        let registry = ProviderRegistry::with_defaults();

        assert_eq!(registry.names(), vec!["html5", "vimeo"]);
        assert!(registry.get("html5").is_ok());
        assert_eq!(
            registry.get("youtube").err(),
            Some(PlayerError::UnknownProvider("youtube".into()))
        );
    }

    #[test]
    fn media_target_requires_media_tag() {
        let entry = html5::entry();

        assert!(entry.validate(&Element::new("audio"), PlayerKind::Audio).is_ok());
        assert!(matches!(
            entry.validate(&Element::new("div"), PlayerKind::Video),
            Err(PlayerError::IncompatibleTarget { .. })
        ));
    }

    #[test]
    fn embed_target_rejects_media_tags_and_audio() {
        let entry = vimeo::entry();

        assert!(entry.validate(&Element::new("div"), PlayerKind::Video).is_ok());
        assert!(entry.validate(&Element::new("audio"), PlayerKind::Audio).is_err());
        assert!(entry.validate(&Element::new("div"), PlayerKind::Audio).is_err());
    }

    #[tokio::test]
    async fn missing_capabilities_name_themselves() {
        let provider = mock::BareProvider;

        assert_eq!(
            provider.play(),
            Err(PlayerError::NotImplemented {
                provider: "bare".into(),
                capability: "play",
            })
        );
        assert!(matches!(
            provider.duration().await,
            Err(PlayerError::NotImplemented { capability: "duration", .. })
        ));
        provider.destroy();
    }
}
