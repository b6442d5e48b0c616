use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use mapsub_db::Database;
use mapsub_db::models::MapRecord;
use mapsub_types::{
    Account, Mapper, MapperCount, RankedMapper, SubscribeSummary, UnsubscribeSummary,
};

use crate::convert;
use crate::error::{Error, Result};

/// Longest accepted mapper name (osu! username limit).
pub const MAX_MAPPER_NAME_LEN: usize = 15;

/// Split a raw argument string into mapper names. Whitespace and commas
/// both separate names.
pub fn split_names(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn is_valid_mapper_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().count() <= MAX_MAPPER_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '[' | ']'))
}

/// Trimmed names in request order, dropping case-insensitive repeats.
fn dedupe_names(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| seen.insert(name.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Separate valid from invalid names, dropping case-insensitive repeats.
fn partition_names(names: &[String]) -> (Vec<String>, Vec<String>) {
    dedupe_names(names)
        .into_iter()
        .partition(|name| is_valid_mapper_name(name))
}

/// Subscribe/unsubscribe/list/purge/count/rank over resolved accounts.
#[derive(Clone)]
pub struct SubscriptionEngine {
    db: Arc<Database>,
}

impl SubscriptionEngine {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Subscribe `account` to every valid name, creating mappers on first
    /// reference. Repeat subscriptions are reported, never duplicated.
    pub fn subscribe(&self, account: &Account, names: &[String]) -> Result<SubscribeSummary> {
        let (valid, invalid) = partition_names(names);
        let mut summary = SubscribeSummary {
            invalid,
            ..Default::default()
        };

        if !valid.is_empty() {
            for row in self.db.subscribe(account.id, &valid)? {
                let mapper = convert::mapper(row.mapper);
                if row.inserted {
                    summary.subscribed.push(mapper);
                } else {
                    summary.already_subscribed.push(mapper);
                }
            }
        }

        debug!(
            account_id = account.id,
            added = summary.subscribed.len(),
            existing = summary.already_subscribed.len(),
            invalid = summary.invalid.len(),
            "Subscribe"
        );
        Ok(summary)
    }

    /// Remove subscriptions for every valid name. Pairs that do not exist
    /// are reported as not subscribed.
    pub fn unsubscribe(&self, account: &Account, names: &[String]) -> Result<UnsubscribeSummary> {
        let (valid, invalid) = partition_names(names);
        let mut summary = UnsubscribeSummary {
            invalid,
            ..Default::default()
        };

        if !valid.is_empty() {
            for row in self.db.unsubscribe(account.id, &valid)? {
                match (row.mapper, row.removed) {
                    (Some(mapper), true) => summary.unsubscribed.push(convert::mapper(mapper)),
                    (Some(mapper), false) => summary.not_subscribed.push(mapper.name),
                    (None, _) => summary.not_subscribed.push(row.name),
                }
            }
        }

        debug!(
            account_id = account.id,
            removed = summary.unsubscribed.len(),
            "Unsubscribe"
        );
        Ok(summary)
    }

    /// Drop all of the account's subscriptions. Returns how many were removed.
    pub fn purge(&self, account: &Account) -> Result<usize> {
        let removed = self.db.purge_subscriptions(account.id)?;
        debug!(account_id = account.id, removed, "Purge");
        Ok(removed)
    }

    /// Mappers the account follows. Callers must not rely on the order.
    pub fn list_subscribed(&self, account: &Account) -> Result<Vec<Mapper>> {
        Ok(self
            .db
            .list_subscribed(account.id)?
            .into_iter()
            .map(convert::mapper)
            .collect())
    }

    /// Subscriber count per requested name, in request order. Unknown or
    /// malformed names count 0 instead of failing the batch, and no mapper
    /// is created.
    pub fn count_subscribers(&self, names: &[String]) -> Result<Vec<MapperCount>> {
        let requested = dedupe_names(names);
        let valid: Vec<String> = requested
            .iter()
            .filter(|name| is_valid_mapper_name(name))
            .cloned()
            .collect();

        // The store answers valid names in the order they were asked
        let mut found = self.db.count_subscribers(&valid)?.into_iter();

        let counts = requested
            .into_iter()
            .map(|name| {
                let hit = if is_valid_mapper_name(&name) {
                    found.next().and_then(|(_, hit)| hit)
                } else {
                    None
                };
                match hit {
                    Some((row, subscribers)) => MapperCount {
                        name: row.name.clone(),
                        mapper: Some(convert::mapper(row)),
                        subscribers,
                    },
                    None => MapperCount {
                        name,
                        mapper: None,
                        subscribers: 0,
                    },
                }
            })
            .collect();
        Ok(counts)
    }

    /// The `limit` most-subscribed mappers, ties broken by ascending id.
    pub fn top_mappers(&self, limit: usize) -> Result<Vec<RankedMapper>> {
        if limit == 0 {
            return Ok(vec![]);
        }
        Ok(self
            .db
            .top_mappers(limit)?
            .into_iter()
            .map(|(row, subscribers)| RankedMapper {
                mapper: convert::mapper(row),
                subscribers,
            })
            .collect())
    }

    /// Record that `mapper_name` published map `map_id`. Idempotent; a map
    /// already filed under another mapper is refused.
    pub fn record_map(&self, map_id: i64, mapper_name: &str) -> Result<Mapper> {
        if map_id <= 0 {
            return Err(Error::InvalidArgument(format!("map id {}", map_id)));
        }
        let mapper_name = mapper_name.trim();
        if !is_valid_mapper_name(mapper_name) {
            return Err(Error::InvalidArgument(format!("mapper name '{}'", mapper_name)));
        }

        match self.db.record_map(map_id, mapper_name)? {
            MapRecord::Recorded(row) => {
                debug!(map_id, mapper_id = row.id, "Recorded map");
                Ok(convert::mapper(row))
            }
            MapRecord::Known(row) => Ok(convert::mapper(row)),
            MapRecord::OwnedBy(owner) => Err(Error::InvalidArgument(format!(
                "map {} already belongs to {}",
                map_id, owner.name
            ))),
        }
    }

    /// Accounts to notify when `mapper_name` publishes. Unknown mappers have
    /// no subscribers.
    pub fn subscribers_of(&self, mapper_name: &str) -> Result<Vec<Account>> {
        let Some(mapper) = self.db.get_mapper_by_name(mapper_name.trim())? else {
            return Ok(vec![]);
        };
        Ok(self
            .db
            .subscribers_of(mapper.id)?
            .into_iter()
            .map(convert::account)
            .collect())
    }
}
