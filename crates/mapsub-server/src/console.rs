use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use mapsub_core::CommandHandler;
use mapsub_types::{Identity, Platform};

/// One chat line as delivered by the console transport:
/// `<platform>:<user id> <message text>`, e.g. `discord:42 .sub Sotarks`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLine {
    pub identity: Identity,
    pub text: String,
}

pub fn parse_line(line: &str) -> Option<ConsoleLine> {
    let line = line.trim();
    let (sender, text) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let (tag, id) = sender.split_once(':')?;
    let platform = Platform::from_tag(tag)?;
    if id.is_empty() {
        return None;
    }

    Some(ConsoleLine {
        identity: Identity::new(platform, id),
        text: text.trim().to_string(),
    })
}

/// Read chat lines from stdin until EOF or shutdown, handling each one on
/// its own task. Replies go to stdout as `<platform>:<id> <reply>`.
pub async fn run<S>(handler: CommandHandler, shutdown: S) -> Result<()>
where
    S: std::future::Future<Output = ()>,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let stdout = Arc::new(Mutex::new(tokio::io::stdout()));
    let mut tasks = JoinSet::new();

    tokio::pin!(shutdown);
    info!("Console transport ready (format: <platform>:<id> <message>)");

    loop {
        let line = tokio::select! {
            _ = &mut shutdown => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            debug!("Console input closed");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let Some(parsed) = parse_line(&line) else {
            warn!("Ignoring malformed console line");
            continue;
        };

        let handler = handler.clone();
        let stdout = stdout.clone();
        tasks.spawn(async move {
            let identity = parsed.identity.clone();
            // The store is synchronous; keep it off the async workers
            let reply = tokio::task::spawn_blocking(move || handler.handle(&parsed.identity, &parsed.text)).await;

            match reply {
                Ok(Some(reply)) => {
                    let mut out = stdout.lock().await;
                    if let Err(e) = write_reply(&mut *out, &identity, &reply).await {
                        error!(identity = %identity, "Failed to write reply: {}", e);
                    }
                }
                Ok(None) => {}
                Err(e) => error!("spawn_blocking join error: {}", e),
            }
        });

        // Reap finished tasks so the set doesn't grow without bound
        while tasks.try_join_next().is_some() {}
    }

    // Let in-flight commands finish before returning
    while tasks.join_next().await.is_some() {}
    Ok(())
}

/// Write one `<platform>:<id> <reply>` line and flush it.
async fn write_reply<W>(out: &mut W, identity: &Identity, reply: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let line = format!("{} {}\n", identity, reply);
    out.write_all(line.as_bytes()).await?;
    out.flush().await
}
