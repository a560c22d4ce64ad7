use anyhow::Result;
use rusqlite::{params, Row};

use crate::db::{
    helpers::{optional_to_i64, optional_to_u64, parse_last_count, to_i64},
    models::{Location, NewWatch, OwnerId, WatchEntry, WatchFilters, WatchId},
    Database,
};

const SELECT_COLUMNS: &str =
    "SELECT id, owner_id, location, location_id, price, rooms, area, radius, last_count
     FROM watches";

fn row_to_watch(row: &Row) -> Result<WatchEntry> {
    let price: Option<i64> = row.get("price")?;
    let rooms: Option<i64> = row.get("rooms")?;
    let area: Option<i64> = row.get("area")?;
    let radius: Option<i64> = row.get("radius")?;
    let last_count: i64 = row.get("last_count")?;

    Ok(WatchEntry {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        location: Location {
            name: row.get("location")?,
            id: row.get("location_id")?,
        },
        filters: WatchFilters {
            price: optional_to_u64(price, "price")?,
            rooms: optional_to_u64(rooms, "rooms")?,
            area: optional_to_u64(area, "area")?,
            radius: optional_to_u64(radius, "radius")?,
        },
        last_count: parse_last_count(last_count)?,
    })
}

impl Database {
    /// Persist a new entry and return its id. The count starts out as
    /// never observed.
    pub async fn create_watch(&self, watch: NewWatch) -> Result<WatchId> {
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO watches (owner_id, location, location_id, price, rooms, area, radius)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    watch.owner_id,
                    watch.location.name,
                    watch.location.id,
                    optional_to_i64(watch.filters.price)?,
                    optional_to_i64(watch.filters.rooms)?,
                    optional_to_i64(watch.filters.area)?,
                    optional_to_i64(watch.filters.radius)?,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    pub async fn list_watches(&self) -> Result<Vec<WatchEntry>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id ASC"))?;

            let mut rows = stmt.query([])?;
            let mut watches = Vec::new();
            while let Some(row) = rows.next()? {
                watches.push(row_to_watch(row)?);
            }

            Ok(watches)
        })
        .await
    }

    pub async fn list_watches_for_owner(&self, owner_id: OwnerId) -> Result<Vec<WatchEntry>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_COLUMNS} WHERE owner_id = ?1 ORDER BY id ASC"
            ))?;

            let mut rows = stmt.query(params![owner_id])?;
            let mut watches = Vec::new();
            while let Some(row) = rows.next()? {
                watches.push(row_to_watch(row)?);
            }

            Ok(watches)
        })
        .await
    }

    /// Record the latest observed count. Returns `false` if the entry no
    /// longer exists.
    pub async fn update_count(&self, watch_id: WatchId, count: u64) -> Result<bool> {
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE watches SET last_count = ?1 WHERE id = ?2",
                params![to_i64(count)?, watch_id],
            )?;
            Ok(rows_affected > 0)
        })
        .await
    }

    /// Delete one of the owner's entries, or all of them when `watch_id` is
    /// `None`. Returns the number of removed rows.
    pub async fn delete_watches(
        &self,
        owner_id: OwnerId,
        watch_id: Option<WatchId>,
    ) -> Result<usize> {
        self.execute(move |conn| {
            let rows_affected = match watch_id {
                Some(watch_id) => conn.execute(
                    "DELETE FROM watches WHERE owner_id = ?1 AND id = ?2",
                    params![owner_id, watch_id],
                )?,
                None => conn.execute(
                    "DELETE FROM watches WHERE owner_id = ?1",
                    params![owner_id],
                )?,
            };
            Ok(rows_affected)
        })
        .await
    }
}
