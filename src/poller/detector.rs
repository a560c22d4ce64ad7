use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::{OwnerId, WatchEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Increased,
    Decreased,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Increased => f.write_str("increased"),
            Direction::Decreased => f.write_str("decreased"),
        }
    }
}

/// Alert for an owner whose watched count moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub owner_id: OwnerId,
    pub entry: WatchEntry,
    pub direction: Direction,
    pub old_count: u64,
    pub new_count: u64,
    pub observed_at: DateTime<Utc>,
}

impl Notification {
    pub fn message(&self) -> String {
        format!(
            "ALERT! The flatcount for {} {} from {} to {}",
            self.entry.summary(),
            self.direction,
            self.old_count,
            self.new_count
        )
    }
}

/// What a single observation means for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// First count ever seen: store it, stay quiet.
    First(u64),
    Changed {
        old: u64,
        new: u64,
        direction: Direction,
    },
    Unchanged,
}

pub fn observe(last_count: Option<u64>, observed: u64) -> Observation {
    match last_count {
        None => Observation::First(observed),
        Some(old) if old == observed => Observation::Unchanged,
        Some(old) => Observation::Changed {
            old,
            new: observed,
            direction: if observed > old {
                Direction::Increased
            } else {
                Direction::Decreased
            },
        },
    }
}
