//! Spawning external tools with piped stdio

use smelt_config::CommandConfig;
use std::process::{Output, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Run `program args...`, feed `input` on stdin and collect its output
///
/// Stdin is written from a separate task so a tool that streams output
/// before reading all of its input cannot deadlock against us. A failed
/// write is ignored when the tool exits unsuccessfully, since its stderr
/// is the more useful diagnostic.
pub async fn run_with_stdin(
    command: &CommandConfig,
    args: &[String],
    input: String,
) -> std::io::Result<Output> {
    debug!(program = %command.program, ?args, "spawning tool");

    let mut child = Command::new(&command.program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdin = child.stdin.take();
    let writer = tokio::spawn(async move {
        if let Some(mut stdin) = stdin {
            stdin.write_all(input.as_bytes()).await?;
            stdin.shutdown().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    let output = child.wait_with_output().await?;
    let written = writer.await.map_err(std::io::Error::other)?;
    if output.status.success() {
        written?;
    }
    Ok(output)
}
