use super::{element::Element, event::DomEvent};

/// Readiness of a media element, ordered from least to most data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ReadyState {
    /// No information about the resource
    #[default]
    HaveNothing,
    /// Duration and dimensions are known
    HaveMetadata,
    /// Data for the current position only
    HaveCurrentData,
    /// Enough data to advance a little
    HaveFutureData,
    /// Playback can run to the end without stalling
    HaveEnoughData,
}

/// Playback state of an `<audio>` or `<video>` node.
#[derive(Debug, Clone)]
pub(crate) struct MediaState {
    pub(crate) current_time: f64,
    pub(crate) duration: f64,
    pub(crate) volume: f64,
    pub(crate) muted: bool,
    pub(crate) paused: bool,
    pub(crate) ended: bool,
    pub(crate) ready_state: ReadyState,
}

impl Default for MediaState {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            duration: f64::NAN,
            volume: 1.0,
            muted: false,
            paused: true,
            ended: false,
            ready_state: ReadyState::HaveNothing,
        }
    }
}

/// Handle to an element that carries media state.
///
/// Mutators fire the native media events a browser would, always
/// non-bubbling and always after the state lock has been released.
#[derive(Debug, Clone)]
pub struct MediaElement(Element);

impl MediaElement {
    /// Wraps `element` if it is an `<audio>` or `<video>` node.
    pub fn new(element: Element) -> Option<Self> {
        element.media_state().map(|_| Self(element))
    }

    /// The underlying element.
    pub fn element(&self) -> &Element {
        &self.0
    }

    fn state<R>(&self, f: impl FnOnce(&mut MediaState) -> R) -> R
    where
        R: Default,
    {
        self.0.with_media(f).unwrap_or_default()
    }

    fn fire(&self, kind: &str) {
        self.0
            .dispatch_event(DomEvent::new(kind, &self.0).non_bubbling());
    }

    /// Playback position in seconds.
    pub fn current_time(&self) -> f64 {
        self.state(|s| s.current_time)
    }

    /// Moves the playback position, clamped to the known media range.
    pub fn set_current_time(&self, time: f64) {
        let target = if time.is_nan() { 0.0 } else { time.max(0.0) };
        self.state(|s| {
            s.current_time = if s.duration.is_finite() {
                target.min(s.duration)
            } else {
                target
            };
            s.ended = false;
        });

        self.fire("seeking");
        self.fire("timeupdate");
        self.fire("seeked");
    }

    /// Media length in seconds; NaN until metadata is loaded.
    pub fn duration(&self) -> f64 {
        self.0.with_media(|s| s.duration).unwrap_or(f64::NAN)
    }

    /// Volume in `[0, 1]`.
    pub fn volume(&self) -> f64 {
        self.state(|s| s.volume)
    }

    /// Sets the volume, clamped to `[0, 1]`.
    pub fn set_volume(&self, volume: f64) {
        let volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };

        let changed = self.state(|s| {
            let changed = (s.volume - volume).abs() > f64::EPSILON;
            s.volume = volume;
            changed
        });

        if changed {
            self.fire("volumechange");
        }
    }

    /// Whether audio output is muted.
    pub fn muted(&self) -> bool {
        self.state(|s| s.muted)
    }

    /// Mutes or unmutes audio output.
    pub fn set_muted(&self, muted: bool) {
        let changed = self.state(|s| std::mem::replace(&mut s.muted, muted) != muted);
        if changed {
            self.fire("volumechange");
        }
    }

    /// Whether playback is paused.
    pub fn paused(&self) -> bool {
        self.0.with_media(|s| s.paused).unwrap_or(true)
    }

    /// Whether playback reached the end.
    pub fn ended(&self) -> bool {
        self.state(|s| s.ended)
    }

    /// Current readiness.
    pub fn ready_state(&self) -> ReadyState {
        self.state(|s| s.ready_state)
    }

    /// Starts playback, restarting from zero when the media has ended.
    pub fn play(&self) {
        let (started, can_play) = self.state(|s| {
            if !s.paused {
                return (false, false);
            }
            if s.ended {
                s.current_time = 0.0;
                s.ended = false;
            }
            s.paused = false;
            (true, s.ready_state >= ReadyState::HaveFutureData)
        });

        if started {
            self.fire("play");
            self.fire(if can_play { "playing" } else { "waiting" });
        }
    }

    /// Pauses playback.
    pub fn pause(&self) {
        let paused = self.state(|s| !std::mem::replace(&mut s.paused, true));
        if paused {
            self.fire("pause");
        }
    }

    /// Simulates the resource finishing its metadata and buffering.
    pub fn load_metadata(&self, duration: f64) {
        let playing = self.state(|s| {
            s.duration = duration;
            s.ready_state = ReadyState::HaveEnoughData;
            !s.paused
        });

        self.fire("durationchange");
        self.fire("loadedmetadata");
        self.fire("canplay");
        if playing {
            self.fire("playing");
        }
    }

    /// Simulates the network falling behind playback.
    pub fn stall(&self) {
        self.state(|s| s.ready_state = ReadyState::HaveCurrentData);
        self.fire("waiting");
    }

    /// Simulates buffering catching up after [`MediaElement::stall`].
    pub fn resume(&self) {
        let playing = self.state(|s| {
            s.ready_state = ReadyState::HaveEnoughData;
            !s.paused
        });

        self.fire("canplay");
        if playing {
            self.fire("playing");
        }
    }

    /// Advances playback by `seconds` of media time.
    ///
    /// Reaching the end either wraps to zero when the `loop` attribute is
    /// set, or pauses and fires `ended`.
    pub fn advance(&self, seconds: f64) {
        let looping = self.0.has_attribute("loop");

        let outcome = self.state(|s| {
            if s.paused || s.ready_state < ReadyState::HaveFutureData {
                return Advance::Idle;
            }

            s.current_time += seconds.max(0.0);
            if !s.duration.is_finite() || s.current_time < s.duration {
                return Advance::Progressed;
            }

            if looping {
                s.current_time = 0.0;
                Advance::Looped
            } else {
                s.current_time = s.duration;
                s.paused = true;
                s.ended = true;
                Advance::Ended
            }
        });

        match outcome {
            Advance::Idle => {}
            Advance::Progressed => self.fire("timeupdate"),
            Advance::Looped => {
                self.fire("seeking");
                self.fire("timeupdate");
                self.fire("seeked");
            }
            Advance::Ended => {
                self.fire("timeupdate");
                self.fire("pause");
                self.fire("ended");
            }
        }
    }
}

#[derive(Default)]
enum Advance {
    #[default]
    Idle,
    Progressed,
    Looped,
    Ended,
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn record(media: &MediaElement, kinds: &[&str]) -> Arc<Mutex<Vec<String>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        for kind in kinds {
            let log = Arc::clone(&log);
            media.element().add_event_listener(kind, move |event| {
                if let Ok(mut log) = log.lock() {
                    log.push(event.kind.clone());
                }
            });
        }
        log
    }

    fn events(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
        log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    #[test]
    fn only_media_tags_wrap() {
        assert!(MediaElement::new(Element::new("video")).is_some());
        assert!(MediaElement::new(Element::new("audio")).is_some());
        assert!(MediaElement::new(Element::new("div")).is_none());
    }

    #[test]
    fn duration_unknown_until_metadata() {
        let media = MediaElement::new(Element::new("video")).unwrap();
        assert!(media.duration().is_nan());

        media.load_metadata(120.0);

        assert_eq!(media.duration(), 120.0);
        assert_eq!(media.ready_state(), ReadyState::HaveEnoughData);
    }

    #[test]
    fn play_before_data_waits() {
        let media = MediaElement::new(Element::new("audio")).unwrap();
        let log = record(&media, &["play", "playing", "waiting"]);

        media.play();
        media.play();
        media.load_metadata(10.0);

        assert_eq!(events(&log), vec!["play", "waiting", "playing"]);
    }

    #[test]
    fn reaching_the_end_pauses_and_fires_ended() {
        let media = MediaElement::new(Element::new("video")).unwrap();
        media.load_metadata(2.0);
        media.play();
        let log = record(&media, &["timeupdate", "pause", "ended"]);

        media.advance(1.5);
        media.advance(1.5);

        assert_eq!(events(&log), vec!["timeupdate", "timeupdate", "pause", "ended"]);
        assert!(media.paused());
        assert!(media.ended());
        assert_eq!(media.current_time(), 2.0);
    }

    #[test]
    fn loop_attribute_wraps_instead_of_ending() {
        let element = Element::new("video").with_attribute("loop", "");
        let media = MediaElement::new(element).unwrap();
        media.load_metadata(2.0);
        media.play();
        let log = record(&media, &["ended"]);

        media.advance(3.0);

        assert!(events(&log).is_empty());
        assert_eq!(media.current_time(), 0.0);
        assert!(!media.paused());
    }

    #[test]
    fn seeking_clamps_to_range() {
        let media = MediaElement::new(Element::new("video")).unwrap();
        media.load_metadata(50.0);

        media.set_current_time(80.0);
        assert_eq!(media.current_time(), 50.0);

        media.set_current_time(-3.0);
        assert_eq!(media.current_time(), 0.0);
    }

    #[test]
    fn volume_changes_fire_once() {
        let media = MediaElement::new(Element::new("audio")).unwrap();
        let log = record(&media, &["volumechange"]);

        media.set_volume(1.0);
        media.set_volume(4.0);
        media.set_volume(0.5);
        media.set_muted(true);
        media.set_muted(true);

        assert_eq!(events(&log).len(), 2);
        assert_eq!(media.volume(), 0.5);
        assert!(media.muted());
    }
}
