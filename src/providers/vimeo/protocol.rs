use serde::{Deserialize, Serialize};
use serde_json::Value;

pub(crate) const PLAY: &str = "play";
pub(crate) const PAUSE: &str = "pause";
pub(crate) const SET_CURRENT_TIME: &str = "setCurrentTime";
pub(crate) const SET_VOLUME: &str = "setVolume";
pub(crate) const SET_MUTED: &str = "setMuted";
pub(crate) const GET_CURRENT_TIME: &str = "getCurrentTime";
pub(crate) const GET_DURATION: &str = "getDuration";
pub(crate) const GET_VOLUME: &str = "getVolume";
pub(crate) const ADD_EVENT_LISTENER: &str = "addEventListener";

/// Player events the embed is asked to report once ready.
pub(crate) const SUBSCRIBED_EVENTS: [&str; 4] = ["timeupdate", "ended", "bufferstart", "bufferend"];

/// Message posted into the embed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outbound {
    /// Player API method
    pub method: String,
    /// Method argument
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Outbound {
    pub(crate) fn call(method: &str) -> Self {
        Self {
            method: method.to_string(),
            value: None,
        }
    }

    pub(crate) fn with_value(method: &str, value: impl Into<Value>) -> Self {
        Self {
            method: method.to_string(),
            value: Some(value.into()),
        }
    }
}

/// Message received from the embed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Inbound {
    /// Player event such as `ready` or `timeupdate`
    Event {
        /// Event name
        event: String,
        /// Event payload
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    /// Answer to a getter
    Reply {
        /// Method being answered
        method: String,
        /// Returned value
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
    },
}
