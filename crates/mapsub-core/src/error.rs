use mapsub_types::{Account, Platform};

/// Outcomes of core operations that are not a plain success.
///
/// Everything except `StoreUnavailable` is an expected, user-facing outcome.
/// Store failures are propagated as-is; nothing here retries.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no account for this identity")]
    NotFound,

    #[error("account {} already exists for this identity", account.id)]
    AlreadyExists { account: Box<Account> },

    #[error("no account has that secret")]
    InvalidSecret,

    #[error("identity already linked to this account")]
    AlreadyLinked,

    #[error("{platform} identity is owned by another account")]
    IdentityTaken { platform: Platform },

    #[error("account has no secret")]
    NoSecret,

    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("store unavailable: {0:#}")]
    StoreUnavailable(#[from] anyhow::Error),
}

impl Error {
    /// Only store failures are fatal; the rest are answered in chat.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
