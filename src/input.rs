use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

use logsieve_filter::LogLine;

/// Parse a `PID<TAB>PROCESS<TAB>MESSAGE` line.
///
/// Anything else is taken as a bare message from an unknown process (pid 0).
pub fn parse_line(raw: &str) -> LogLine {
    let raw = raw.strip_suffix('\r').unwrap_or(raw);
    let mut parts = raw.splitn(3, '\t');
    if let (Some(pid), Some(process), Some(message)) = (parts.next(), parts.next(), parts.next()) {
        if let Ok(pid) = pid.trim().parse::<u32>() {
            return LogLine::new(pid, process, message);
        }
    }
    LogLine::new(0, "", raw)
}

/// Read lines from a file (or stdin) and send them down the channel.
///
/// Returns the number of lines read. Stops early once the receiver is gone.
pub fn spawn_reader(
    input: Option<PathBuf>,
    tx: mpsc::UnboundedSender<LogLine>,
) -> tokio::task::JoinHandle<Result<u64>> {
    tokio::spawn(async move {
        match input {
            Some(path) => {
                let file = tokio::fs::File::open(&path)
                    .await
                    .with_context(|| format!("cannot open {}", path.display()))?;
                pump(file, tx).await
            }
            None => pump(tokio::io::stdin(), tx).await,
        }
    })
}

async fn pump<R>(reader: R, tx: mpsc::UnboundedSender<LogLine>) -> Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut count = 0u64;

    while let Some(raw) = lines.next_line().await.context("read error")? {
        count += 1;
        let line = parse_line(&raw).with_timestamp(Utc::now());
        if tx.send(line).is_err() {
            tracing::debug!("line consumer closed after {} lines", count);
            break;
        }
    }

    Ok(count)
}
