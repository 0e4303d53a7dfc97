//! User-facing output, kept apart from `tracing` logs.

use tokio::io::{self, AsyncWriteExt};

pub async fn write_stdout(line: &str) -> io::Result<()> {
    let mut stdout = io::stdout();
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}
