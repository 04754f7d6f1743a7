//! Player lifecycle events
//!
//! Broadcast by the player controller and streamed to clients over SSE.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// A player process was spawned for a new queue
    Started {
        session: Uuid,
        pid: Option<u32>,
        queue_len: usize,
        timestamp: DateTime<Utc>,
    },

    /// A player process was terminated on request
    Stopped {
        session: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// The player exited cleanly after working through its queue
    Finished {
        session: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// The player exited on its own with a failure status or signal
    Crashed {
        session: Uuid,
        /// `None` when the process was killed by a signal
        exit_code: Option<i32>,
        timestamp: DateTime<Utc>,
    },
}

impl PlayerEvent {
    /// Event type name, used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            PlayerEvent::Started { .. } => "Started",
            PlayerEvent::Stopped { .. } => "Stopped",
            PlayerEvent::Finished { .. } => "Finished",
            PlayerEvent::Crashed { .. } => "Crashed",
        }
    }

    pub fn session(&self) -> Uuid {
        match self {
            PlayerEvent::Started { session, .. }
            | PlayerEvent::Stopped { session, .. }
            | PlayerEvent::Finished { session, .. }
            | PlayerEvent::Crashed { session, .. } => *session,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_with_type_tag() {
        let event = PlayerEvent::Crashed {
            session: Uuid::nil(),
            exit_code: Some(3),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Crashed");
        assert_eq!(json["exit_code"], 3);
        assert_eq!(event.event_type(), "Crashed");
        assert_eq!(event.session(), Uuid::nil());
    }
}
