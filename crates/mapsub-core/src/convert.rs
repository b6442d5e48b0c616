use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use mapsub_db::models::{AccountRow, MapperRow};
use mapsub_types::{Account, Mapper};

pub(crate) fn account(row: AccountRow) -> Account {
    let created_at = parse_timestamp(&row.created_at).unwrap_or_else(|| {
        warn!(account_id = row.id, "Corrupt created_at '{}'", row.created_at);
        DateTime::default()
    });

    Account {
        id: row.id,
        discord_id: row.discord_id,
        osu_username: row.osu_username,
        secret: row.secret,
        created_at,
    }
}

pub(crate) fn mapper(row: MapperRow) -> Mapper {
    Mapper {
        id: row.id,
        name: row.name,
    }
}

/// SQLite's `datetime('now')` has no timezone; treat it as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}
