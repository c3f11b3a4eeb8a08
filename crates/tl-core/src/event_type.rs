//! Timeline event kinds as the single source of truth for their wire names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Semantic kind of a timeline entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Span,
    Trace,
    Log,
    Crash,
    Anr,
    FrozenFrame,
}

impl EventType {
    pub const ALL: [Self; 6] = [
        Self::Span,
        Self::Trace,
        Self::Log,
        Self::Crash,
        Self::Anr,
        Self::FrozenFrame,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Span => "span",
            Self::Trace => "trace",
            Self::Log => "log",
            Self::Crash => "crash",
            Self::Anr => "anr",
            Self::FrozenFrame => "frozen_frame",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "span" => Ok(Self::Span),
            "trace" => Ok(Self::Trace),
            "log" => Ok(Self::Log),
            "crash" => Ok(Self::Crash),
            "anr" => Ok(Self::Anr),
            "frozen_frame" | "frozen-frame" => Ok(Self::FrozenFrame),
            _ => Err(UnknownEventType(s.to_string())),
        }
    }
}

impl Serialize for EventType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unknown event type strings.
#[derive(Debug, Clone)]
pub struct UnknownEventType(String);

impl fmt::Display for UnknownEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event type: {}", self.0)
    }
}

impl std::error::Error for UnknownEventType {}
