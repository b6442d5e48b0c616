use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, info};

use mapsub_db::Database;
use mapsub_db::models::{AccountInsert, IdentityLink};
use mapsub_types::{Account, Identity};

use crate::convert;
use crate::error::{Error, Result};
use crate::secret::generate_secret;

/// Draws before giving up on finding an unused secret.
const MAX_SECRET_ATTEMPTS: usize = 5;

/// Maps chat identities and secrets to accounts.
///
/// Trust model: the secret is a permanent bearer capability. Whoever holds
/// it can attach any identity to the account, and it is never rotated.
#[derive(Clone)]
pub struct AccountResolver {
    db: Arc<Database>,
}

impl AccountResolver {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Look up the account holding `identity`.
    pub fn resolve(&self, identity: &Identity) -> Result<Account> {
        let id = platform_id(identity)?;
        self.db
            .get_account_by_identity(identity.platform, id)?
            .map(convert::account)
            .ok_or(Error::NotFound)
    }

    /// Create an account for `identity` with a fresh secret. Fails with
    /// `AlreadyExists` (carrying the existing account) if one resolves.
    pub fn create(&self, identity: &Identity) -> Result<Account> {
        self.create_with(identity, generate_secret)
    }

    /// `create` with the secret source supplied by the caller. A secret
    /// already in use is redrawn, up to `MAX_SECRET_ATTEMPTS` times.
    pub(crate) fn create_with<F>(&self, identity: &Identity, mut next_secret: F) -> Result<Account>
    where
        F: FnMut() -> String,
    {
        let id = platform_id(identity)?;

        for attempt in 1..=MAX_SECRET_ATTEMPTS {
            let secret = next_secret();
            match self.db.insert_account(identity.platform, id, &secret)? {
                AccountInsert::Created(row) => {
                    let account = convert::account(row);
                    info!(
                        account_id = account.id,
                        platform = identity.platform.as_str(),
                        secret_len = account.secret.len(),
                        "Initialized new account"
                    );
                    return Ok(account);
                }
                AccountInsert::Existing(row) => {
                    return Err(Error::AlreadyExists {
                        account: Box::new(convert::account(row)),
                    });
                }
                AccountInsert::SecretTaken => {
                    debug!(attempt, "Generated secret already in use, drawing again");
                }
            }
        }

        Err(Error::StoreUnavailable(anyhow!(
            "no unused secret after {} attempts",
            MAX_SECRET_ATTEMPTS
        )))
    }

    /// Exact-match lookup by secret.
    pub fn resolve_by_secret(&self, secret: &str) -> Result<Account> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(Error::InvalidSecret);
        }
        self.db
            .get_account_by_secret(secret)?
            .map(convert::account)
            .ok_or(Error::InvalidSecret)
    }

    /// Attach `identity` to `account`, overwriting the account's previous
    /// identity on that platform (this is how renames are picked up).
    pub fn link(&self, account: &Account, identity: &Identity) -> Result<Account> {
        let id = platform_id(identity)?;

        match self.db.link_identity(account.id, identity.platform, id)? {
            IdentityLink::Linked(row) => {
                info!(
                    account_id = row.id,
                    platform = identity.platform.as_str(),
                    "Linked identity to account"
                );
                Ok(convert::account(row))
            }
            IdentityLink::Unchanged => Err(Error::AlreadyLinked),
            IdentityLink::OwnedBy(owner) => {
                debug!(
                    account_id = account.id,
                    owner,
                    platform = identity.platform.as_str(),
                    "Refusing to move identity between accounts"
                );
                Err(Error::IdentityTaken {
                    platform: identity.platform,
                })
            }
            IdentityLink::MissingAccount => Err(Error::NotFound),
        }
    }

    /// Resolve by secret and link in one step, as the `register` command does.
    pub fn register(&self, secret: &str, identity: &Identity) -> Result<Account> {
        let account = self.resolve_by_secret(secret)?;
        self.link(&account, identity)
    }
}

/// The account's secret, or `NoSecret` if it was never assigned one.
pub fn secret_of(account: &Account) -> Result<&str> {
    if account.secret.is_empty() {
        Err(Error::NoSecret)
    } else {
        Ok(&account.secret)
    }
}

fn platform_id(identity: &Identity) -> Result<&str> {
    let id = identity.id.trim();
    if id.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "empty {} identity",
            identity.platform.as_str()
        )));
    }
    Ok(id)
}
