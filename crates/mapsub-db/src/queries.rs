use crate::Database;
use crate::models::{
    AccountInsert, AccountRow, IdentityLink, MapRecord, MapperRow, SubscribeRow, UnsubscribeRow,
};
use anyhow::{Result, anyhow};
use mapsub_types::Platform;
use rusqlite::{Connection, TransactionBehavior};

const ACCOUNT_COLUMNS: &str = "id, discord_id, osu_username, secret, created_at";

/// Column holding an account's identity on `platform`.
fn identity_column(platform: Platform) -> &'static str {
    match platform {
        Platform::Discord => "discord_id",
        Platform::Osu => "osu_username",
    }
}

impl Database {
    // -- Accounts --

    pub fn get_account_by_identity(
        &self,
        platform: Platform,
        platform_id: &str,
    ) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account_by_identity(conn, platform, platform_id))
    }

    /// Exact-match lookup. The empty secret never matches.
    pub fn get_account_by_secret(&self, secret: &str) -> Result<Option<AccountRow>> {
        if secret.is_empty() {
            return Ok(None);
        }
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM accounts WHERE secret = ?1", ACCOUNT_COLUMNS);
            conn.query_row(&sql, [secret], account_from_row).optional()
        })
    }

    /// Create an account holding `platform_id` on `platform`, unless one
    /// already does. Check and insert share one transaction.
    pub fn insert_account(
        &self,
        platform: Platform,
        platform_id: &str,
        secret: &str,
    ) -> Result<AccountInsert> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if let Some(existing) = query_account_by_identity(&tx, platform, platform_id)? {
                return Ok(AccountInsert::Existing(existing));
            }

            let secret_taken: Option<i64> = tx
                .query_row("SELECT id FROM accounts WHERE secret = ?1", [secret], |row| row.get(0))
                .optional()?;
            if secret_taken.is_some() {
                return Ok(AccountInsert::SecretTaken);
            }

            let sql = format!(
                "INSERT INTO accounts ({}, secret) VALUES (?1, ?2)",
                identity_column(platform)
            );
            tx.execute(&sql, (platform_id, secret))?;
            let id = tx.last_insert_rowid();

            let row = query_account_by_id(&tx, id)?
                .ok_or_else(|| anyhow!("Account {} missing right after insert", id))?;
            tx.commit()?;
            Ok(AccountInsert::Created(row))
        })
    }

    /// Point the account's `platform` identity at `platform_id`, replacing
    /// whatever it held before.
    pub fn link_identity(
        &self,
        account_id: i64,
        platform: Platform,
        platform_id: &str,
    ) -> Result<IdentityLink> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let Some(account) = query_account_by_id(&tx, account_id)? else {
                return Ok(IdentityLink::MissingAccount);
            };

            let current = match platform {
                Platform::Discord => account.discord_id.as_deref(),
                Platform::Osu => account.osu_username.as_deref(),
            };
            if current == Some(platform_id) {
                return Ok(IdentityLink::Unchanged);
            }

            let column = identity_column(platform);
            let owner: Option<i64> = tx
                .query_row(
                    &format!("SELECT id FROM accounts WHERE {} = ?1 AND id <> ?2", column),
                    rusqlite::params![platform_id, account_id],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(owner) = owner {
                return Ok(IdentityLink::OwnedBy(owner));
            }

            tx.execute(
                &format!("UPDATE accounts SET {} = ?1 WHERE id = ?2", column),
                rusqlite::params![platform_id, account_id],
            )?;

            let row = query_account_by_id(&tx, account_id)?
                .ok_or_else(|| anyhow!("Account {} missing right after update", account_id))?;
            tx.commit()?;
            Ok(IdentityLink::Linked(row))
        })
    }

    // -- Mappers --

    pub fn get_mapper_by_name(&self, name: &str) -> Result<Option<MapperRow>> {
        self.with_conn(|conn| query_mapper_by_name(conn, name))
    }

    // -- Subscriptions --

    /// Subscribe an account to each named mapper, creating mappers as
    /// needed. Existing pairs are left alone (`inserted == false`).
    pub fn subscribe(&self, account_id: i64, names: &[String]) -> Result<Vec<SubscribeRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let mut rows = Vec::with_capacity(names.len());
            for name in names {
                let mapper = ensure_mapper(&tx, name)?;
                let inserted = tx.execute(
                    "INSERT OR IGNORE INTO subscriptions (account_id, mapper_id) VALUES (?1, ?2)",
                    rusqlite::params![account_id, mapper.id],
                )? == 1;
                rows.push(SubscribeRow { mapper, inserted });
            }

            tx.commit()?;
            Ok(rows)
        })
    }

    /// Remove each (account, mapper) pair that exists. Unknown mappers are
    /// never created here.
    pub fn unsubscribe(&self, account_id: i64, names: &[String]) -> Result<Vec<UnsubscribeRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let mut rows = Vec::with_capacity(names.len());
            for name in names {
                let mapper = query_mapper_by_name(&tx, name)?;
                let removed = match &mapper {
                    Some(m) => {
                        tx.execute(
                            "DELETE FROM subscriptions WHERE account_id = ?1 AND mapper_id = ?2",
                            rusqlite::params![account_id, m.id],
                        )? == 1
                    }
                    None => false,
                };
                rows.push(UnsubscribeRow {
                    name: name.clone(),
                    mapper,
                    removed,
                });
            }

            tx.commit()?;
            Ok(rows)
        })
    }

    /// Delete every subscription of an account. Returns the number removed.
    pub fn purge_subscriptions(&self, account_id: i64) -> Result<usize> {
        self.with_conn(|conn| {
            let removed =
                conn.execute("DELETE FROM subscriptions WHERE account_id = ?1", [account_id])?;
            Ok(removed)
        })
    }

    pub fn list_subscribed(&self, account_id: i64) -> Result<Vec<MapperRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.name
                 FROM subscriptions s
                 INNER JOIN mappers m ON s.mapper_id = m.id
                 WHERE s.account_id = ?1
                 ORDER BY m.name, m.id",
            )?;

            let rows = stmt
                .query_map([account_id], mapper_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Subscriber count per requested name, in request order. Names with no
    /// mapper come back as `None`.
    pub fn count_subscribers(&self, names: &[String]) -> Result<Vec<(String, Option<(MapperRow, u64)>)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.name, COUNT(s.account_id)
                 FROM mappers m
                 LEFT JOIN subscriptions s ON s.mapper_id = m.id
                 WHERE m.name = ?1
                 GROUP BY m.id, m.name",
            )?;

            let mut counts = Vec::with_capacity(names.len());
            for name in names {
                let found = stmt
                    .query_row([name], |row| {
                        let count: i64 = row.get(2)?;
                        Ok((mapper_from_row(row)?, count as u64))
                    })
                    .optional()?;
                counts.push((name.clone(), found));
            }

            Ok(counts)
        })
    }

    /// Mappers with at least one subscriber, most popular first. Equal
    /// counts fall back to ascending mapper id.
    pub fn top_mappers(&self, limit: usize) -> Result<Vec<(MapperRow, u64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.name, COUNT(*) AS subscribers
                 FROM subscriptions s
                 INNER JOIN mappers m ON s.mapper_id = m.id
                 GROUP BY m.id, m.name
                 ORDER BY subscribers DESC, m.id ASC
                 LIMIT ?1",
            )?;

            let rows = stmt
                .query_map([limit as i64], |row| {
                    let count: i64 = row.get(2)?;
                    Ok((mapper_from_row(row)?, count as u64))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Accounts subscribed to a mapper, oldest account first.
    pub fn subscribers_of(&self, mapper_id: i64) -> Result<Vec<AccountRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT a.id, a.discord_id, a.osu_username, a.secret, a.created_at
                 FROM subscriptions s
                 INNER JOIN accounts a ON s.account_id = a.id
                 WHERE s.mapper_id = ?1
                 ORDER BY a.id",
            )?;

            let rows = stmt
                .query_map([mapper_id], account_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Maps --

    /// Record a published map under its mapper, creating the mapper if
    /// needed. A map id already filed under another mapper is left alone.
    pub fn record_map(&self, map_id: i64, mapper_name: &str) -> Result<MapRecord> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let owner: Option<MapperRow> = tx
                .query_row(
                    "SELECT m.id, m.name
                     FROM maps p
                     INNER JOIN mappers m ON p.mapper_id = m.id
                     WHERE p.id = ?1",
                    [map_id],
                    mapper_from_row,
                )
                .optional()?;

            let outcome = match owner {
                Some(owner) if owner.name.eq_ignore_ascii_case(mapper_name) => MapRecord::Known(owner),
                Some(owner) => MapRecord::OwnedBy(owner),
                None => {
                    let mapper = ensure_mapper(&tx, mapper_name)?;
                    tx.execute(
                        "INSERT INTO maps (id, mapper_id) VALUES (?1, ?2)",
                        rusqlite::params![map_id, mapper.id],
                    )?;
                    MapRecord::Recorded(mapper)
                }
            };

            tx.commit()?;
            Ok(outcome)
        })
    }
}

fn account_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AccountRow> {
    Ok(AccountRow {
        id: row.get(0)?,
        discord_id: row.get(1)?,
        osu_username: row.get(2)?,
        secret: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn mapper_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MapperRow> {
    Ok(MapperRow {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn query_account_by_identity(
    conn: &Connection,
    platform: Platform,
    platform_id: &str,
) -> Result<Option<AccountRow>> {
    let sql = format!(
        "SELECT {} FROM accounts WHERE {} = ?1",
        ACCOUNT_COLUMNS,
        identity_column(platform)
    );
    conn.query_row(&sql, [platform_id], account_from_row).optional()
}

fn query_account_by_id(conn: &Connection, id: i64) -> Result<Option<AccountRow>> {
    let sql = format!("SELECT {} FROM accounts WHERE id = ?1", ACCOUNT_COLUMNS);
    conn.query_row(&sql, [id], account_from_row).optional()
}

fn query_mapper_by_name(conn: &Connection, name: &str) -> Result<Option<MapperRow>> {
    conn.query_row("SELECT id, name FROM mappers WHERE name = ?1", [name], mapper_from_row)
        .optional()
}

/// Fetch a mapper by name, inserting it first if it does not exist.
fn ensure_mapper(conn: &Connection, name: &str) -> Result<MapperRow> {
    conn.execute("INSERT OR IGNORE INTO mappers (name) VALUES (?1)", [name])?;
    query_mapper_by_name(conn, name)?.ok_or_else(|| anyhow!("Mapper not found after insert: {}", name))
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
