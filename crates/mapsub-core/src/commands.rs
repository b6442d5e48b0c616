use std::sync::Arc;

use tracing::{debug, error};

use mapsub_db::Database;
use mapsub_types::{Identity, Platform};

use crate::accounts::{AccountResolver, secret_of};
use crate::error::{Error, Result};
use crate::subscriptions::{SubscriptionEngine, split_names};

pub const COMMAND_PREFIX: char = '.';

/// A parsed chat command. Arguments are kept raw until execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Init,
    Secret,
    Register(Option<String>),
    Sub(Vec<String>),
    Unsub(Vec<String>),
    List,
    Purge,
    Count(Vec<String>),
    Top(Option<String>),
    Server,
    Invite,
    Osu,
    Help,
}

impl Command {
    /// Parse a chat line. Returns `None` for anything that is not one of
    /// our commands, so transports can stay silent.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.trim().splitn(2, char::is_whitespace);
        let keyword = parts.next()?.strip_prefix(COMMAND_PREFIX)?.to_lowercase();
        let rest = parts.next().unwrap_or("").trim();
        let first_arg = rest.split_whitespace().next().map(str::to_string);

        let command = match keyword.as_str() {
            "init" => Self::Init,
            "secret" => Self::Secret,
            "register" => Self::Register(first_arg),
            "sub" => Self::Sub(split_names(rest)),
            "unsub" => Self::Unsub(split_names(rest)),
            "list" => Self::List,
            "purge" => Self::Purge,
            "count" => Self::Count(split_names(rest)),
            "top" => Self::Top(first_arg),
            "server" => Self::Server,
            "invite" => Self::Invite,
            "osu" => Self::Osu,
            "help" => Self::Help,
            _ => return None,
        };
        Some(command)
    }

    /// Keyword for logging. Never includes arguments (secrets travel in them).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Secret => "secret",
            Self::Register(_) => "register",
            Self::Sub(_) => "sub",
            Self::Unsub(_) => "unsub",
            Self::List => "list",
            Self::Purge => "purge",
            Self::Count(_) => "count",
            Self::Top(_) => "top",
            Self::Server => "server",
            Self::Invite => "invite",
            Self::Osu => "osu",
            Self::Help => "help",
        }
    }

    /// Configured links are sent as-is; escaping would corrupt URLs.
    fn replies_verbatim(&self) -> bool {
        matches!(self, Self::Server | Self::Invite | Self::Osu | Self::Help)
    }
}

/// Static links served by `.server`, `.invite`, `.osu` and `.help`.
#[derive(Debug, Clone, Default)]
pub struct Links {
    pub server: Option<String>,
    pub invite: Option<String>,
    pub osu: Option<String>,
    pub help: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CommandOptions {
    pub links: Links,
    pub top_default: usize,
    pub top_max: usize,
    /// Repeat `.init` re-shows the existing secret when set.
    pub reveal_secret_on_init: bool,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            links: Links::default(),
            top_default: 10,
            top_max: 50,
            reveal_secret_on_init: true,
        }
    }
}

/// Turns chat text from any transport into core calls and reply text.
/// Cheap to clone; one clone per in-flight message is fine.
#[derive(Clone)]
pub struct CommandHandler {
    accounts: AccountResolver,
    subscriptions: SubscriptionEngine,
    options: Arc<CommandOptions>,
}

impl CommandHandler {
    pub fn new(db: Arc<Database>, options: CommandOptions) -> Self {
        Self {
            accounts: AccountResolver::new(db.clone()),
            subscriptions: SubscriptionEngine::new(db),
            options: Arc::new(options),
        }
    }

    /// Handle one chat line from `identity`. `None` means "not a command,
    /// don't reply". Errors are already rendered into the reply.
    pub fn handle(&self, identity: &Identity, text: &str) -> Option<String> {
        let command = Command::parse(text)?;
        debug!(identity = %identity, command = command.name(), "Handling command");
        let verbatim = command.replies_verbatim();

        let reply = match self.execute(identity, command) {
            Ok(reply) => reply,
            Err(e) => {
                if e.is_fatal() {
                    error!(identity = %identity, "Command failed: {:#}", e);
                }
                error_reply(&e)
            }
        };
        if verbatim {
            return Some(reply);
        }
        Some(render(identity.platform, &reply))
    }

    pub fn execute(&self, identity: &Identity, command: Command) -> Result<String> {
        match command {
            Command::Init => self.init(identity),
            Command::Secret => {
                let account = self.accounts.resolve(identity)?;
                let secret = secret_of(&account)?;
                debug!(account_id = account.id, secret_len = secret.len(), "Retrieved secret");
                Ok(format!("Your secret is: `{}`.", secret))
            }
            Command::Register(secret) => {
                let secret = secret.ok_or(Error::MissingArgument("secret"))?;
                self.accounts.register(&secret, identity)?;
                Ok(format!("Registered {}.", identity.platform))
            }
            Command::Sub(names) => {
                let account = self.accounts.resolve(identity)?;
                require_names(&names)?;
                Ok(self.subscriptions.subscribe(&account, &names)?.to_string())
            }
            Command::Unsub(names) => {
                let account = self.accounts.resolve(identity)?;
                require_names(&names)?;
                Ok(self.subscriptions.unsubscribe(&account, &names)?.to_string())
            }
            Command::List => {
                let account = self.accounts.resolve(identity)?;
                let mappers = self.subscriptions.list_subscribed(&account)?;
                if mappers.is_empty() {
                    return Ok("You aren't subscribed to anyone.".to_string());
                }
                let names: Vec<&str> = mappers.iter().map(|m| m.name.as_str()).collect();
                Ok(format!(
                    "You're subscribed to {} {}: {}",
                    mappers.len(),
                    plural(mappers.len(), "mapper", "mappers"),
                    names.join(", ")
                ))
            }
            Command::Purge => {
                let account = self.accounts.resolve(identity)?;
                let removed = self.subscriptions.purge(&account)?;
                Ok(format!(
                    "Unsubscribed from {} {}.",
                    removed,
                    plural(removed, "mapper", "mappers")
                ))
            }
            Command::Count(names) => {
                require_names(&names)?;
                let counts = self.subscriptions.count_subscribers(&names)?;
                Ok(counts
                    .iter()
                    .map(|c| format!("{}: {}", c.name, c.subscribers))
                    .collect::<Vec<_>>()
                    .join(", "))
            }
            Command::Top(arg) => {
                let limit = self.top_limit(arg.as_deref())?;
                let ranked = self.subscriptions.top_mappers(limit)?;
                if ranked.is_empty() {
                    return Ok("Nobody has any subscribers yet.".to_string());
                }
                Ok(ranked
                    .iter()
                    .enumerate()
                    .map(|(i, r)| format!("{}. {} ({})", i + 1, r.mapper.name, r.subscribers))
                    .collect::<Vec<_>>()
                    .join(", "))
            }
            Command::Server => Ok(link_reply(&self.options.links.server)),
            Command::Invite => Ok(link_reply(&self.options.links.invite)),
            Command::Osu => Ok(link_reply(&self.options.links.osu)),
            Command::Help => Ok(link_reply(&self.options.links.help)),
        }
    }

    fn init(&self, identity: &Identity) -> Result<String> {
        match self.accounts.create(identity) {
            Ok(account) => Ok(format!("Initialized; your secret is `{}`.", account.secret)),
            Err(Error::AlreadyExists { account }) => {
                if self.options.reveal_secret_on_init && !account.secret.is_empty() {
                    Ok(format!(
                        "You're already initialized; your secret is `{}`.",
                        account.secret
                    ))
                } else {
                    Ok("You're already initialized; use `.secret` to see your secret.".to_string())
                }
            }
            Err(e) => Err(e),
        }
    }

    fn top_limit(&self, arg: Option<&str>) -> Result<usize> {
        let limit = match arg {
            None => self.options.top_default,
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(Error::InvalidArgument(format!(
                        "expected a positive number of mappers, got '{}'",
                        raw
                    )));
                }
            },
        };
        Ok(limit.min(self.options.top_max))
    }
}

fn require_names(names: &[String]) -> Result<()> {
    if names.is_empty() {
        return Err(Error::MissingArgument("mapper names"));
    }
    Ok(())
}

fn plural(n: usize, one: &'static str, many: &'static str) -> &'static str {
    if n == 1 { one } else { many }
}

fn link_reply(link: &Option<String>) -> String {
    link.clone()
        .unwrap_or_else(|| "That link isn't configured.".to_string())
}

/// User-facing text for a failed command.
pub fn error_reply(error: &Error) -> String {
    match error {
        Error::NotFound => "You're not initialized; run `.init` first.".to_string(),
        Error::AlreadyExists { .. } => "You're already initialized.".to_string(),
        Error::InvalidSecret => "Incorrect secret.".to_string(),
        Error::AlreadyLinked => "You're already registered.".to_string(),
        Error::IdentityTaken { platform } => {
            format!("That {} identity is already linked to a different account.", platform)
        }
        Error::NoSecret => "You don't have a secret; run `.init` to get one.".to_string(),
        Error::MissingArgument("secret") => "You need to supply your secret.".to_string(),
        Error::MissingArgument("mapper names") => {
            "You need to supply at least one mapper.".to_string()
        }
        Error::MissingArgument(what) => format!("Missing argument: {}.", what),
        Error::InvalidArgument(detail) => format!("Invalid argument: {}.", detail),
        Error::StoreUnavailable(_) => "Something went wrong; please try again later.".to_string(),
    }
}

/// Apply per-platform formatting. Discord treats `_` as Markdown.
pub fn render(platform: Platform, text: &str) -> String {
    match platform {
        Platform::Discord => text.replace('_', "\\_"),
        Platform::Osu => text.to_string(),
    }
}
