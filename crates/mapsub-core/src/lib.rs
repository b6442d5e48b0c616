//! Subscription and identity-linking core.
//!
//! Accounts bind several chat identities (Discord id, osu! username) to one
//! logical user through a per-account secret. Subscriptions join accounts to
//! mappers. Every component holds an explicit `Arc<Database>`; there is no
//! ambient global handle.

pub mod accounts;
pub mod commands;
pub mod error;
pub mod secret;
pub mod subscriptions;

mod convert;

pub use accounts::AccountResolver;
pub use commands::{Command, CommandHandler, CommandOptions, Links};
pub use error::{Error, Result};
pub use subscriptions::SubscriptionEngine;
