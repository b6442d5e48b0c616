/// Database row types. These map directly to SQLite rows and are kept
/// distinct from the mapsub-types models so the store stays independent.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRow {
    pub id: i64,
    pub discord_id: Option<String>,
    pub osu_username: Option<String>,
    pub secret: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapperRow {
    pub id: i64,
    pub name: String,
}

/// Result of `Database::insert_account`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountInsert {
    Created(AccountRow),
    /// The identity already resolves to this account; nothing was written.
    Existing(AccountRow),
    /// Another account already holds the proposed secret.
    SecretTaken,
}

/// Result of `Database::link_identity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityLink {
    Linked(AccountRow),
    /// The account already holds exactly this identity.
    Unchanged,
    /// A different account owns the identity.
    OwnedBy(i64),
    /// No account with the given id.
    MissingAccount,
}

/// Per-name outcome of `Database::subscribe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeRow {
    pub mapper: MapperRow,
    pub inserted: bool,
}

/// Per-name outcome of `Database::unsubscribe`. `mapper` is `None` when
/// the name matches no known mapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsubscribeRow {
    pub name: String,
    pub mapper: Option<MapperRow>,
    pub removed: bool,
}

/// Result of `Database::record_map`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapRecord {
    Recorded(MapperRow),
    /// The map was already on file under the same mapper.
    Known(MapperRow),
    /// The map id is already on file under a different mapper; nothing
    /// was written.
    OwnedBy(MapperRow),
}
