//! Free-text filter detection.
//!
//! Patterns are tried in a fixed priority order and the first one that
//! yields a value wins, so a message carrying cues for two filters sets only
//! the higher-priority one.

use std::fmt;

use regex::Regex;

/// Every parameter an intake session can collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Param {
    Location,
    Price,
    Rooms,
    Area,
    Radius,
}

impl Param {
    pub const ALL: [Param; 5] = [
        Param::Location,
        Param::Price,
        Param::Rooms,
        Param::Area,
        Param::Radius,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Param::Location => "location",
            Param::Price => "price",
            Param::Rooms => "rooms",
            Param::Area => "area",
            Param::Radius => "radius",
        }
    }

    /// Value with its unit, as echoed back to the owner.
    pub fn format_value(&self, value: u64) -> String {
        match self {
            Param::Price => format!("{value}€"),
            Param::Area => format!("{value}m²"),
            Param::Radius => format!("{value}km"),
            Param::Rooms | Param::Location => value.to_string(),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterMatch {
    pub param: Param,
    pub value: u64,
}

/// Largest value an SQLite INTEGER column holds.
const MAX_STORABLE: u64 = i64::MAX as u64;

pub struct FilterParser {
    patterns: Vec<(Param, Regex)>,
}

impl FilterParser {
    pub fn new() -> Result<Self, regex::Error> {
        let patterns = vec![
            (Param::Price, Regex::new(r"(\d+)\s*€")?),
            (
                Param::Rooms,
                Regex::new(r"(?i)(\d+)\s+(?:r(?:ä|ae)ume?|raum|rooms?)")?,
            ),
            (
                Param::Area,
                Regex::new(r"(?i)(\d+)\s*(?:qm|m²|m|gr(?:ö|oe|o)(?:ß|ss)e?|fl(?:ä|ae)che)")?,
            ),
            (Param::Radius, Regex::new(r"(?i)(\d+)\s*km")?),
        ];

        Ok(Self { patterns })
    }

    /// First matching filter in priority order. Values are not range-checked
    /// beyond what storage can hold; a digit run above `i64::MAX` is skipped
    /// like a miss.
    pub fn parse(&self, text: &str) -> Option<FilterMatch> {
        self.patterns.iter().find_map(|(param, regex)| {
            let captures = regex.captures(text)?;
            let value = captures.get(1)?.as_str().parse::<u64>().ok()?;
            if value > MAX_STORABLE {
                return None;
            }
            Some(FilterMatch {
                param: *param,
                value,
            })
        })
    }
}
