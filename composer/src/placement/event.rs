//! Lifecycle and timer events fed to placement criteria

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::component::RawComponent;

/// An isolate disappeared with the components it hosted
pub const EVENT_ISOLATE_LOST: &str = "isolate.lost";

/// Periodic heartbeat: the components are still running together
pub const EVENT_TIMER: &str = "timer";

/// A composition or component event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Name of the isolate the event comes from
    pub source_name: String,
    /// Kind of event, e.g. [`EVENT_ISOLATE_LOST`]
    pub kind: String,
    /// Whether this event reports a betterment
    pub good: bool,
    /// Components involved in the event
    #[serde(default)]
    pub components: Vec<RawComponent>,
    /// Event specific details
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    /// When the event was emitted
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(source_name: impl Into<String>, kind: impl Into<String>, good: bool) -> Self {
        Self {
            source_name: source_name.into(),
            kind: kind.into(),
            good,
            components: Vec::new(),
            data: None,
            timestamp: Utc::now(),
        }
    }

    /// The isolate `source_name` was lost with its components
    pub fn isolate_lost(source_name: impl Into<String>, components: Vec<RawComponent>) -> Self {
        Self::new(source_name, EVENT_ISOLATE_LOST, false).with_components(components)
    }

    /// The components of `source_name` survived another timer period
    pub fn timer(source_name: impl Into<String>, components: Vec<RawComponent>) -> Self {
        Self::new(source_name, EVENT_TIMER, true).with_components(components)
    }

    pub fn with_components(mut self, components: Vec<RawComponent>) -> Self {
        self.components = components;
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Event on {}: {} ({})",
            self.source_name, self.kind, self.good
        )
    }
}
