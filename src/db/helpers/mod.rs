use std::convert::TryFrom;

use anyhow::{anyhow, Result};

/// `last_count` value for an entry that has never been polled.
pub const NEVER_OBSERVED: i64 = -1;

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn optional_to_i64(value: Option<u64>) -> Result<Option<i64>> {
    value.map(to_i64).transpose()
}

pub fn optional_to_u64(value: Option<i64>, field: &str) -> Result<Option<u64>> {
    value.map(|raw| to_u64(raw, field)).transpose()
}

/// Maps the persisted sentinel encoding onto `Option`.
pub fn parse_last_count(value: i64) -> Result<Option<u64>> {
    match value {
        NEVER_OBSERVED => Ok(None),
        other => to_u64(other, "last_count").map(Some),
    }
}
